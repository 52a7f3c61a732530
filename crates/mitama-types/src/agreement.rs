//! Agreement types - escrowed payment commitments and their status machine

use crate::{Address, Amount, OracleSubmission, TransactionId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Minimum agreement time-lock (1 hour)
pub const MIN_TIME_LOCK_SECS: i64 = 3_600;

/// Maximum agreement time-lock (30 days)
pub const MAX_TIME_LOCK_SECS: i64 = 2_592_000;

/// Minimum escrowed amount in base units
pub const MIN_ESCROW_AMOUNT: u64 = 1_000_000;

/// Maximum escrowed amount in base units
pub const MAX_ESCROW_AMOUNT: u64 = 1_000_000_000_000;

/// Status of an agreement
///
/// Transitions are strictly forward: `Active -> Released` and
/// `Active -> Disputed -> Resolved`. `Released` and `Resolved` are terminal
/// and accept no further operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AgreementStatus {
    /// Funds locked, service pending or delivered out of band
    Active,
    /// Full amount paid to the provider (terminal)
    Released,
    /// Under oracle arbitration; funds still locked
    Disputed,
    /// Settled by consensus with a refund split (terminal)
    Resolved,
}

impl AgreementStatus {
    /// Check if this is a terminal state
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Released | Self::Resolved)
    }
}

/// An escrowed payment commitment between an agent and a provider
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Agreement {
    /// External transaction identifier (unique among live agreements)
    pub transaction_id: TransactionId,
    /// Agent identity address that created the agreement
    pub agent: Address,
    /// Owning wallet of the agent identity (escrow debit source)
    pub agent_owner: Address,
    /// Provider/counterpart address (escrow payment target)
    pub provider: Address,
    /// Locked amount; immutable after creation
    pub amount: Amount,
    /// Current status
    pub status: AgreementStatus,
    /// When the agreement was created
    pub created_at: DateTime<Utc>,
    /// `created_at` + time-lock; advisory only, no automatic transition
    pub expires_at: DateTime<Utc>,
    /// Consensus quality score; `None` until `Resolved`, immutable after
    pub quality_score: Option<u8>,
    /// Refund percentage applied at resolution; `None` until `Resolved`
    pub refund_percentage: Option<u8>,
    /// Oracle submissions gathered while `Disputed`
    pub submissions: Vec<OracleSubmission>,
}

impl Agreement {
    /// Advisory expiry check against the given clock reading
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }

    /// Advisory expiry check against the current clock
    pub fn is_expired(&self) -> bool {
        self.is_expired_at(Utc::now())
    }

    /// Whether the given oracle already submitted a score
    pub fn has_submission_from(&self, oracle: &Address) -> bool {
        self.submissions.iter().any(|s| &s.oracle == oracle)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Asset;
    use chrono::Duration;

    fn agreement(status: AgreementStatus) -> Agreement {
        let now = Utc::now();
        Agreement {
            transaction_id: TransactionId::new("tx-1").unwrap(),
            agent: Address::new(),
            agent_owner: Address::new(),
            provider: Address::new(),
            amount: Amount::new(MIN_ESCROW_AMOUNT, Asset::Native),
            status,
            created_at: now,
            expires_at: now + Duration::seconds(MIN_TIME_LOCK_SECS),
            quality_score: None,
            refund_percentage: None,
            submissions: Vec::new(),
        }
    }

    #[test]
    fn test_terminal_states() {
        assert!(!AgreementStatus::Active.is_terminal());
        assert!(!AgreementStatus::Disputed.is_terminal());
        assert!(AgreementStatus::Released.is_terminal());
        assert!(AgreementStatus::Resolved.is_terminal());
    }

    #[test]
    fn test_advisory_expiry() {
        let a = agreement(AgreementStatus::Active);
        assert!(!a.is_expired());
        assert!(a.is_expired_at(a.expires_at));
        assert!(a.is_expired_at(a.expires_at + Duration::seconds(1)));
    }

    #[test]
    fn test_submission_lookup() {
        let mut a = agreement(AgreementStatus::Disputed);
        let oracle = Address::new();
        assert!(!a.has_submission_from(&oracle));
        a.submissions.push(OracleSubmission {
            oracle,
            quality_score: 80,
            submitted_at: Utc::now(),
        });
        assert!(a.has_submission_from(&oracle));
    }
}
