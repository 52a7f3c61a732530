//! Resolution outcomes and the reputation delta policy
//!
//! A resolution is judged per party. The refund percentage measures how much
//! of the escrow went back to the agent: a low refund vindicates the
//! provider, a high refund vindicates the disputing agent.

use mitama_types::{Address, Identity};
use serde::{Deserialize, Serialize};

/// Base cost an agent must be able to cover to file a dispute (0.001 native)
pub const BASE_DISPUTE_COST: u64 = 1_000_000;

/// Refund percentage at or below which the provider is vindicated
pub const FAVORABLE_REFUND_THRESHOLD: u8 = 35;

/// Refund percentage at or above which the disputing agent is vindicated
pub const UNFAVORABLE_REFUND_THRESHOLD: u8 = 75;

/// Bounded reputation delta for a favorable outcome
pub const FAVORABLE_DELTA: i32 = 15;

/// Slightly-negative delta for a partial outcome
pub const PARTIAL_DELTA: i32 = -5;

/// Bounded reputation delta for an unfavorable outcome
pub const UNFAVORABLE_DELTA: i32 = -40;

/// Which side of the agreement an identity was on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PartyRole {
    /// The paying agent that filed the dispute
    Agent,
    /// The service provider whose delivered quality was judged
    Provider,
}

/// How a dispute settled, from one party's perspective
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolutionOutcome {
    /// Consensus quality score
    pub quality_score: u8,
    /// Refund percentage applied to the escrow
    pub refund_percentage: u8,
    /// The party this outcome is applied to
    pub role: PartyRole,
}

impl ResolutionOutcome {
    /// Whether this outcome vindicates the party
    ///
    /// Provider: favorable when the refund is at most 35%. Agent: mirrored,
    /// favorable when the refund is at least 75% (the dispute was won).
    pub fn is_favorable(&self) -> bool {
        match self.role {
            PartyRole::Provider => self.refund_percentage <= FAVORABLE_REFUND_THRESHOLD,
            PartyRole::Agent => self.refund_percentage >= UNFAVORABLE_REFUND_THRESHOLD,
        }
    }

    /// Whether this outcome went against the party
    pub fn is_unfavorable(&self) -> bool {
        match self.role {
            PartyRole::Provider => self.refund_percentage >= UNFAVORABLE_REFUND_THRESHOLD,
            PartyRole::Agent => self.refund_percentage <= FAVORABLE_REFUND_THRESHOLD,
        }
    }

    /// Bounded reputation delta for this outcome
    pub fn reputation_delta(&self) -> i32 {
        if self.is_favorable() {
            FAVORABLE_DELTA
        } else if self.is_unfavorable() {
            UNFAVORABLE_DELTA
        } else {
            PARTIAL_DELTA
        }
    }
}

/// Cost of filing a dispute, scaled by the agent's historical dispute rate
///
/// Habitual disputers pay more: the base cost is multiplied as the share of
/// filed disputes over total agreements crosses 20, 40, and 60 percent. A
/// fresh identity pays the base cost.
pub fn dispute_cost(identity: &Identity) -> u64 {
    if identity.total_agreements == 0 {
        return BASE_DISPUTE_COST;
    }
    let dispute_rate = identity.disputed_agreements * 100 / identity.total_agreements;
    let multiplier = match dispute_rate {
        0..=20 => 1,
        21..=40 => 2,
        41..=60 => 5,
        _ => 10,
    };
    BASE_DISPUTE_COST.saturating_mul(multiplier)
}

/// Result of applying a resolution to one identity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReputationChange {
    pub identity: Address,
    pub old_reputation: u32,
    pub new_reputation: u32,
    pub delta: i32,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn outcome(refund: u8, role: PartyRole) -> ResolutionOutcome {
        ResolutionOutcome {
            quality_score: 50,
            refund_percentage: refund,
            role,
        }
    }

    #[test]
    fn test_provider_policy_boundaries() {
        assert_eq!(outcome(0, PartyRole::Provider).reputation_delta(), FAVORABLE_DELTA);
        assert_eq!(outcome(35, PartyRole::Provider).reputation_delta(), FAVORABLE_DELTA);
        assert_eq!(outcome(36, PartyRole::Provider).reputation_delta(), PARTIAL_DELTA);
        assert_eq!(outcome(74, PartyRole::Provider).reputation_delta(), PARTIAL_DELTA);
        assert_eq!(outcome(75, PartyRole::Provider).reputation_delta(), UNFAVORABLE_DELTA);
        assert_eq!(outcome(100, PartyRole::Provider).reputation_delta(), UNFAVORABLE_DELTA);
    }

    #[test]
    fn test_dispute_cost_scales_with_dispute_rate() {
        use mitama_types::{IdentityKind, MIN_STAKE_AMOUNT};

        let mut identity = Identity::new(
            Address::new(),
            "scout".into(),
            IdentityKind::Trading,
            MIN_STAKE_AMOUNT,
        );
        assert_eq!(dispute_cost(&identity), BASE_DISPUTE_COST);

        identity.total_agreements = 10;
        identity.disputed_agreements = 2; // 20%
        assert_eq!(dispute_cost(&identity), BASE_DISPUTE_COST);

        identity.disputed_agreements = 3; // 30%
        assert_eq!(dispute_cost(&identity), 2 * BASE_DISPUTE_COST);

        identity.disputed_agreements = 5; // 50%
        assert_eq!(dispute_cost(&identity), 5 * BASE_DISPUTE_COST);

        identity.disputed_agreements = 7; // 70%
        assert_eq!(dispute_cost(&identity), 10 * BASE_DISPUTE_COST);
    }

    #[test]
    fn test_agent_policy_is_mirrored() {
        assert!(outcome(100, PartyRole::Agent).is_favorable());
        assert!(outcome(75, PartyRole::Agent).is_favorable());
        assert!(!outcome(74, PartyRole::Agent).is_favorable());
        assert!(outcome(0, PartyRole::Agent).is_unfavorable());
        assert_eq!(outcome(50, PartyRole::Agent).reputation_delta(), PARTIAL_DELTA);
    }
}
