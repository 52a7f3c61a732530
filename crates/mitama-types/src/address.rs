//! Address and transaction identifier types
//!
//! Addresses are strongly typed wrappers around UUIDs. The underlying
//! execution environment derives stable storage keys from them; Mitama only
//! requires that they are unique and cheap to compare.

use crate::{MitamaError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Maximum length of an external transaction identifier
pub const MAX_TRANSACTION_ID_LENGTH: usize = 64;

/// A participant address (agent owner, identity, provider, oracle, admin)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Address(pub Uuid);

impl Address {
    /// Create a new random address
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Create from an existing UUID
    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Parse from a string (with or without the `addr_` prefix)
    pub fn parse(s: &str) -> std::result::Result<Self, uuid::Error> {
        let s = s.strip_prefix("addr_").unwrap_or(s);
        Ok(Self(Uuid::parse_str(s)?))
    }

    /// Get the inner UUID
    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for Address {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "addr_{}", self.0)
    }
}

impl From<Uuid> for Address {
    fn from(uuid: Uuid) -> Self {
        Self(uuid)
    }
}

impl AsRef<Uuid> for Address {
    fn as_ref(&self) -> &Uuid {
        &self.0
    }
}

/// External transaction identifier an agreement is keyed by
///
/// Bounded-length, non-empty string. Uniqueness among concurrently-active
/// agreements is enforced by the agreement book at insert time, not here.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TransactionId(String);

impl TransactionId {
    /// Validate and wrap an external transaction identifier
    pub fn new(id: impl Into<String>) -> Result<Self> {
        let id = id.into();
        if id.is_empty() || id.len() > MAX_TRANSACTION_ID_LENGTH {
            return Err(MitamaError::InvalidTransactionId {
                transaction_id: id,
            });
        }
        Ok(Self(id))
    }

    /// Get the raw identifier
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TransactionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ErrorKind;

    #[test]
    fn test_address_roundtrip() {
        let addr = Address::new();
        let s = addr.to_string();
        assert!(s.starts_with("addr_"));
        assert_eq!(Address::parse(&s).unwrap(), addr);
    }

    #[test]
    fn test_transaction_id_bounds() {
        assert!(TransactionId::new("tx-001").is_ok());
        let err = TransactionId::new("").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
        assert!(TransactionId::new("x".repeat(64)).is_ok());
        assert!(TransactionId::new("x".repeat(65)).is_err());
    }
}
