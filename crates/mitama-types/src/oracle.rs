//! Oracle registry types - the authorized set of quality scorers

use crate::Address;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Maximum number of registered oracles
pub const MAX_ORACLES: usize = 5;

/// Minimum allowed consensus quorum
pub const MIN_CONSENSUS_ORACLES: u8 = 2;

/// Upper bound on the configurable score deviation (percentage points)
pub const MAX_SCORE_DEVIATION_LIMIT: u8 = 50;

/// Kind of oracle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OracleKind {
    /// Scores carried by a signed off-chain attestation
    Signature,
    /// Scores read from an external data feed
    Feed,
    Custom,
}

/// How oracle submissions are aggregated into one consensus score
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConsensusMode {
    /// Median with outlier rejection; all oracles weigh equally
    MedianFiltered,
    /// Weight-averaged over all submissions; no outlier rejection
    Weighted,
}

/// One registered oracle
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OracleConfig {
    pub address: Address,
    pub kind: OracleKind,
    /// Relative trust weight, at least 1
    pub weight: u16,
}

/// One oracle's quality assessment for a disputed agreement
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OracleSubmission {
    /// Submitting oracle; must be present in the registry
    pub oracle: Address,
    /// Quality score in `[0, 100]`
    pub quality_score: u8,
    pub submitted_at: DateTime<Utc>,
}

/// The global set of authorized quality scorers
///
/// Created once by an administrator and only mutated by that administrator
/// (or a successor after an explicit admin transfer). Never deleted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OracleRegistry {
    /// Current administrator
    pub admin: Address,
    /// Registered oracles, unique by address, at most [`MAX_ORACLES`]
    pub oracles: Vec<OracleConfig>,
    /// Minimum valid submissions required for consensus, at least 2
    pub min_consensus: u8,
    /// Maximum allowed deviation from the median (percentage points)
    pub max_score_deviation: u8,
    /// Aggregation mode
    pub mode: ConsensusMode,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl OracleRegistry {
    /// Whether the given address is a registered oracle
    pub fn contains(&self, oracle: &Address) -> bool {
        self.oracles.iter().any(|o| &o.address == oracle)
    }

    /// Trust weight of a registered oracle
    pub fn weight_of(&self, oracle: &Address) -> Option<u16> {
        self.oracles
            .iter()
            .find(|o| &o.address == oracle)
            .map(|o| o.weight)
    }

    /// Whether the registry is at capacity
    pub fn is_full(&self) -> bool {
        self.oracles.len() >= MAX_ORACLES
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_registry_lookup() {
        let oracle = Address::new();
        let registry = OracleRegistry {
            admin: Address::new(),
            oracles: vec![OracleConfig {
                address: oracle,
                kind: OracleKind::Signature,
                weight: 3,
            }],
            min_consensus: 2,
            max_score_deviation: 15,
            mode: ConsensusMode::MedianFiltered,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        assert!(registry.contains(&oracle));
        assert_eq!(registry.weight_of(&oracle), Some(3));
        assert_eq!(registry.weight_of(&Address::new()), None);
        assert!(!registry.is_full());
    }
}
