//! Identity records - staked, reputation-tracked participants

use crate::Address;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Minimum stake required to create an identity (0.1 native units)
pub const MIN_STAKE_AMOUNT: u64 = 100_000_000;

/// Maximum display name length
pub const MAX_NAME_LENGTH: usize = 32;

/// Starting reputation for a new identity
pub const INITIAL_REPUTATION: u32 = 500;

/// Upper bound of the reputation range
pub const MAX_REPUTATION: u32 = 1000;

/// Kind of participant an identity represents
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum IdentityKind {
    Trading,
    Service,
    Oracle,
    Custom,
}

/// A staked participant record (agent, or provider acting as counterpart)
///
/// One identity per owning address. Deactivation is irreversible: the stake
/// is returned in full, the record stays for historical accounting, and no
/// operation may reactivate it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Identity {
    /// Stable identity address (distinct from the owner's wallet address)
    pub address: Address,
    /// Owning wallet address
    pub owner: Address,
    /// Display name, non-empty and at most [`MAX_NAME_LENGTH`] characters
    pub name: String,
    /// Participant kind
    pub kind: IdentityKind,
    /// Reputation score, always within `[0, 1000]`
    pub reputation: u32,
    /// Locked stake in native base units; zero iff inactive
    pub stake_amount: u64,
    /// Whether the identity is active
    pub is_active: bool,
    /// When the identity was created
    pub created_at: DateTime<Utc>,
    /// Last time the identity was touched by a resolution or release
    pub last_active: DateTime<Utc>,
    /// Lifetime agreement count
    pub total_agreements: u64,
    /// Agreements released without dispute or resolved favorably
    pub successful_agreements: u64,
    /// Disputes filed by this identity
    pub disputed_agreements: u64,
}

impl Identity {
    /// Create a fresh identity record with default reputation and counters
    pub fn new(owner: Address, name: String, kind: IdentityKind, stake_amount: u64) -> Self {
        let now = Utc::now();
        Self {
            address: Address::new(),
            owner,
            name,
            kind,
            reputation: INITIAL_REPUTATION,
            stake_amount,
            is_active: true,
            created_at: now,
            last_active: now,
            total_agreements: 0,
            successful_agreements: 0,
            disputed_agreements: 0,
        }
    }

    /// Apply a signed reputation delta, clamped to `[0, 1000]`
    pub fn apply_reputation_delta(&mut self, delta: i32) -> u32 {
        let new = if delta >= 0 {
            self.reputation.saturating_add(delta as u32)
        } else {
            self.reputation.saturating_sub(delta.unsigned_abs())
        };
        self.reputation = new.min(MAX_REPUTATION);
        self.reputation
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_identity_defaults() {
        let id = Identity::new(Address::new(), "scout".into(), IdentityKind::Trading, MIN_STAKE_AMOUNT);
        assert_eq!(id.reputation, 500);
        assert!(id.is_active);
        assert_eq!(id.total_agreements, 0);
    }

    #[test]
    fn test_reputation_clamping() {
        let mut id = Identity::new(Address::new(), "s".into(), IdentityKind::Service, MIN_STAKE_AMOUNT);
        id.apply_reputation_delta(5000);
        assert_eq!(id.reputation, 1000);
        id.apply_reputation_delta(-5000);
        assert_eq!(id.reputation, 0);
        id.apply_reputation_delta(-1);
        assert_eq!(id.reputation, 0);
    }
}
