//! Mitama Custody - the balance transfer/custody seam
//!
//! The protocol core moves value only through this trait. Production
//! embedders implement it against their wallet/transaction layer; the
//! in-memory implementation here backs tests and local runs.
//!
//! A transfer either fully applies or fully fails; partial movement is never
//! observable through this interface.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::RwLock;
use tracing::debug;

use mitama_types::{Address, Amount, Asset, MitamaError, Result};

/// Balance custody primitive consumed from the surrounding system
#[async_trait::async_trait]
pub trait Custody: Send + Sync {
    /// Move `amount` from one address to another
    async fn transfer(&self, from: &Address, to: &Address, amount: Amount) -> Result<()>;

    /// Current balance of an address in the given asset
    async fn balance_of(&self, address: &Address, asset: &Asset) -> u64;
}

/// In-memory custody over per-address, per-asset balances
pub struct InMemoryCustody {
    balances: RwLock<HashMap<(Address, Asset), u64>>,
}

impl InMemoryCustody {
    pub fn new() -> Self {
        Self {
            balances: RwLock::new(HashMap::new()),
        }
    }

    /// Shared handle convenience
    pub fn shared() -> Arc<Self> {
        Arc::new(Self::new())
    }

    /// Credit an address (test/bootstrap funding)
    pub async fn deposit(&self, address: &Address, amount: Amount) {
        let mut balances = self.balances.write().await;
        *balances.entry((*address, amount.asset)).or_insert(0) += amount.value;
    }
}

impl Default for InMemoryCustody {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl Custody for InMemoryCustody {
    async fn transfer(&self, from: &Address, to: &Address, amount: Amount) -> Result<()> {
        if amount.is_zero() {
            return Ok(());
        }

        let mut balances = self.balances.write().await;
        let available = balances.get(&(*from, amount.asset)).copied().unwrap_or(0);
        if available < amount.value {
            return Err(MitamaError::InsufficientFunds {
                address: from.to_string(),
                requested: amount.value,
                available,
            });
        }

        *balances.get_mut(&(*from, amount.asset)).unwrap() -= amount.value;
        *balances.entry((*to, amount.asset)).or_insert(0) += amount.value;

        debug!("Custody transfer: {} from {} to {}", amount, from, to);
        Ok(())
    }

    async fn balance_of(&self, address: &Address, asset: &Asset) -> u64 {
        self.balances
            .read()
            .await
            .get(&(*address, *asset))
            .copied()
            .unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_transfer_moves_exact_amount() {
        let custody = InMemoryCustody::new();
        let a = Address::new();
        let b = Address::new();
        custody.deposit(&a, Amount::native(500)).await;

        custody.transfer(&a, &b, Amount::native(120)).await.unwrap();

        assert_eq!(custody.balance_of(&a, &Asset::Native).await, 380);
        assert_eq!(custody.balance_of(&b, &Asset::Native).await, 120);
    }

    #[tokio::test]
    async fn test_transfer_insufficient_funds() {
        let custody = InMemoryCustody::new();
        let a = Address::new();
        let b = Address::new();
        custody.deposit(&a, Amount::native(10)).await;

        let err = custody
            .transfer(&a, &b, Amount::native(11))
            .await
            .unwrap_err();
        assert!(matches!(err, MitamaError::InsufficientFunds { .. }));
        // Nothing moved.
        assert_eq!(custody.balance_of(&a, &Asset::Native).await, 10);
        assert_eq!(custody.balance_of(&b, &Asset::Native).await, 0);
    }

    #[tokio::test]
    async fn test_assets_are_isolated() {
        let custody = InMemoryCustody::new();
        let a = Address::new();
        let token = Asset::Token {
            mint: Address::new(),
            decimals: 6,
        };
        custody.deposit(&a, Amount::new(1_000, token)).await;

        assert_eq!(custody.balance_of(&a, &token).await, 1_000);
        assert_eq!(custody.balance_of(&a, &Asset::Native).await, 0);
    }
}
