//! Protocol events for external subscribers
//!
//! Events carry the entity addresses and resulting numeric fields of each
//! state change. Transport and subscription plumbing are out of scope; the
//! engine broadcasts these best-effort.

use crate::{Address, IdentityKind, OracleKind};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Events emitted during Mitama operations
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum MitamaEvent {
    /// A new agent identity was created
    AgentCreated {
        identity: Address,
        owner: Address,
        name: String,
        kind: IdentityKind,
        stake_amount: u64,
        timestamp: DateTime<Utc>,
    },

    /// An identity was deactivated and its stake refunded
    AgentDeactivated {
        identity: Address,
        owner: Address,
        refunded_stake: u64,
        timestamp: DateTime<Utc>,
    },

    /// An identity's reputation changed after a resolution
    AgentReputationUpdated {
        identity: Address,
        old_reputation: u32,
        new_reputation: u32,
        delta: i32,
        timestamp: DateTime<Utc>,
    },

    /// An agreement was created and funds locked
    AgreementInitialized {
        transaction_id: String,
        agent: Address,
        provider: Address,
        amount: u64,
        expires_at: DateTime<Utc>,
        timestamp: DateTime<Utc>,
    },

    /// An agreement was marked disputed by its agent
    DisputeMarked {
        transaction_id: String,
        agent: Address,
        timestamp: DateTime<Utc>,
    },

    /// A dispute was settled with a refund split
    DisputeResolved {
        transaction_id: String,
        quality_score: u8,
        refund_percentage: u8,
        refund_amount: u64,
        payment_amount: u64,
        timestamp: DateTime<Utc>,
    },

    /// Escrowed funds were released in full to the provider
    FundsReleased {
        transaction_id: String,
        amount: u64,
        provider: Address,
        timestamp: DateTime<Utc>,
    },

    /// The oracle registry was initialized
    OracleRegistryInitialized {
        admin: Address,
        min_consensus: u8,
        max_score_deviation: u8,
        timestamp: DateTime<Utc>,
    },

    /// An oracle was added to the registry
    OracleAdded {
        oracle: Address,
        kind: OracleKind,
        weight: u16,
        timestamp: DateTime<Utc>,
    },

    /// An oracle was removed from the registry
    OracleRemoved {
        oracle: Address,
        timestamp: DateTime<Utc>,
    },

    /// Consensus details for a multi-oracle settlement
    MultiOracleDisputeResolved {
        transaction_id: String,
        oracle_count: u8,
        individual_scores: Vec<u8>,
        oracles: Vec<Address>,
        consensus_score: u8,
        refund_percentage: u8,
        refund_amount: u64,
        payment_amount: u64,
        timestamp: DateTime<Utc>,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_serialization_tag() {
        let event = MitamaEvent::FundsReleased {
            transaction_id: "tx-1".into(),
            amount: 100_000_000,
            provider: Address::new(),
            timestamp: Utc::now(),
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "FundsReleased");
        assert_eq!(json["amount"], 100_000_000u64);
    }
}
