//! Escrow amount types
//!
//! Amounts are unsigned integers in the asset's smallest unit. The escrowed
//! asset is either the native asset (9 decimals) or a fungible token whose
//! decimal precision is carried by the token's own metadata.

use crate::{Address, MitamaError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Decimal precision of the native asset
pub const NATIVE_DECIMALS: u8 = 9;

/// One whole native unit in base units
pub const NATIVE_UNIT: u64 = 1_000_000_000;

/// The asset an amount is denominated in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Asset {
    /// The execution environment's native asset
    Native,
    /// A fungible token identified by its mint address
    Token { mint: Address, decimals: u8 },
}

impl Asset {
    /// Decimal precision of this asset
    pub fn decimals(&self) -> u8 {
        match self {
            Self::Native => NATIVE_DECIMALS,
            Self::Token { decimals, .. } => *decimals,
        }
    }
}

impl fmt::Display for Asset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Native => write!(f, "native"),
            Self::Token { mint, .. } => write!(f, "token:{}", mint),
        }
    }
}

/// An amount of a single asset, in base units
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Amount {
    /// Raw value in smallest units
    pub value: u64,
    /// The asset
    pub asset: Asset,
}

impl Amount {
    /// Create a new amount
    pub fn new(value: u64, asset: Asset) -> Self {
        Self { value, asset }
    }

    /// Create a native amount from base units
    pub fn native(value: u64) -> Self {
        Self::new(value, Asset::Native)
    }

    /// Create a zero amount
    pub fn zero(asset: Asset) -> Self {
        Self::new(0, asset)
    }

    /// Check if the amount is zero
    pub fn is_zero(&self) -> bool {
        self.value == 0
    }

    /// Get the human-readable value
    pub fn to_human(&self) -> f64 {
        self.value as f64 / 10u64.pow(self.asset.decimals() as u32) as f64
    }

    /// Checked addition (assets must match)
    pub fn checked_add(self, other: Self) -> Result<Self> {
        self.require_same_asset(&other)?;
        let value = self
            .value
            .checked_add(other.value)
            .ok_or(MitamaError::ArithmeticOverflow)?;
        Ok(Self { value, ..self })
    }

    /// Checked subtraction (assets must match)
    pub fn checked_sub(self, other: Self) -> Result<Self> {
        self.require_same_asset(&other)?;
        let value = self
            .value
            .checked_sub(other.value)
            .ok_or(MitamaError::ArithmeticOverflow)?;
        Ok(Self { value, ..self })
    }

    /// Split into `(refund, payment)` portions for a refund percentage
    ///
    /// `refund = floor(value * pct / 100)`, `payment = value - refund`, so the
    /// two portions always sum exactly to the original amount.
    pub fn split_refund(&self, refund_percentage: u8) -> (Self, Self) {
        debug_assert!(refund_percentage <= 100);
        let refund = (self.value as u128 * refund_percentage.min(100) as u128 / 100) as u64;
        (
            Self::new(refund, self.asset),
            Self::new(self.value - refund, self.asset),
        )
    }

    fn require_same_asset(&self, other: &Self) -> Result<()> {
        if self.asset != other.asset {
            return Err(MitamaError::AssetMismatch {
                expected: self.asset.to_string(),
                actual: other.asset.to_string(),
            });
        }
        Ok(())
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.to_human(), self.asset)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_amount_arithmetic() {
        let a = Amount::native(100);
        let b = Amount::native(40);
        assert_eq!(a.checked_add(b).unwrap().value, 140);
        assert_eq!(a.checked_sub(b).unwrap().value, 60);
        assert!(b.checked_sub(a).is_err());
    }

    #[test]
    fn test_asset_mismatch() {
        let token = Asset::Token {
            mint: Address::new(),
            decimals: 6,
        };
        let a = Amount::native(1);
        let b = Amount::new(1, token);
        assert!(a.checked_add(b).is_err());
    }

    #[test]
    fn test_split_refund_no_leakage() {
        // Awkward divisors must still sum exactly to the locked amount.
        for amount in [1u64, 3, 7, 99, 100, 101, 1_000_003, u64::MAX / 200] {
            for pct in 0..=100u8 {
                let locked = Amount::native(amount);
                let (refund, payment) = locked.split_refund(pct);
                assert_eq!(refund.value + payment.value, amount);
            }
        }
    }

    #[test]
    fn test_split_refund_boundaries() {
        let locked = Amount::native(100_000_000);
        assert_eq!(locked.split_refund(0).0.value, 0);
        assert_eq!(locked.split_refund(100).1.value, 0);
        let (refund, payment) = locked.split_refund(35);
        assert_eq!(refund.value, 35_000_000);
        assert_eq!(payment.value, 65_000_000);
    }
}
