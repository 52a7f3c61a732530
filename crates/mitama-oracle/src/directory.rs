//! Oracle directory - the admin-managed registry of authorized scorers

use chrono::Utc;
use tokio::sync::RwLock;
use tracing::info;

use mitama_types::{
    Address, ConsensusMode, MitamaError, OracleConfig, OracleKind, OracleRegistry,
    OracleSubmission, Result, MAX_ORACLES, MAX_SCORE_DEVIATION_LIMIT, MIN_CONSENSUS_ORACLES,
};

use crate::consensus;

/// The oracle registry with admin-gated mutation and consensus dispatch
pub struct OracleDirectory {
    inner: RwLock<OracleRegistry>,
}

impl OracleDirectory {
    /// Initialize the registry
    ///
    /// Fails with `InvalidConsensusConfig` if `min_consensus < 2` or the
    /// deviation bound exceeds 50 percentage points.
    pub fn new(
        admin: Address,
        min_consensus: u8,
        max_score_deviation: u8,
        mode: ConsensusMode,
    ) -> Result<Self> {
        if min_consensus < MIN_CONSENSUS_ORACLES {
            return Err(MitamaError::InvalidConsensusConfig {
                reason: format!("min_consensus {} is below {}", min_consensus, MIN_CONSENSUS_ORACLES),
            });
        }
        if max_score_deviation > MAX_SCORE_DEVIATION_LIMIT {
            return Err(MitamaError::InvalidConsensusConfig {
                reason: format!(
                    "max_score_deviation {} exceeds {}",
                    max_score_deviation, MAX_SCORE_DEVIATION_LIMIT
                ),
            });
        }

        let now = Utc::now();
        Ok(Self {
            inner: RwLock::new(OracleRegistry {
                admin,
                oracles: Vec::new(),
                min_consensus,
                max_score_deviation,
                mode,
                created_at: now,
                updated_at: now,
            }),
        })
    }

    /// Add an oracle; admin only
    pub async fn add_oracle(
        &self,
        caller: &Address,
        oracle: Address,
        kind: OracleKind,
        weight: u16,
    ) -> Result<OracleConfig> {
        let mut registry = self.inner.write().await;
        if caller != &registry.admin {
            return Err(MitamaError::unauthorized("only the registry admin may add oracles"));
        }
        if registry.is_full() {
            return Err(MitamaError::RegistryFull {
                capacity: MAX_ORACLES,
            });
        }
        if weight == 0 {
            return Err(MitamaError::InvalidOracleWeight { weight });
        }
        if registry.contains(&oracle) {
            return Err(MitamaError::DuplicateOracle {
                oracle: oracle.to_string(),
            });
        }

        let config = OracleConfig {
            address: oracle,
            kind,
            weight,
        };
        registry.oracles.push(config.clone());
        registry.updated_at = Utc::now();

        info!("Oracle added: {} ({:?}) weight={}", oracle, kind, weight);
        Ok(config)
    }

    /// Remove an oracle; admin only
    pub async fn remove_oracle(&self, caller: &Address, oracle: &Address) -> Result<()> {
        let mut registry = self.inner.write().await;
        if caller != &registry.admin {
            return Err(MitamaError::unauthorized("only the registry admin may remove oracles"));
        }

        let initial_len = registry.oracles.len();
        registry.oracles.retain(|o| &o.address != oracle);
        if registry.oracles.len() == initial_len {
            return Err(MitamaError::OracleNotFound {
                oracle: oracle.to_string(),
            });
        }
        registry.updated_at = Utc::now();

        info!("Oracle removed: {}", oracle);
        Ok(())
    }

    /// Hand the registry to a new administrator; admin only
    pub async fn transfer_admin(&self, caller: &Address, new_admin: Address) -> Result<()> {
        let mut registry = self.inner.write().await;
        if caller != &registry.admin {
            return Err(MitamaError::unauthorized("only the registry admin may transfer it"));
        }
        registry.admin = new_admin;
        registry.updated_at = Utc::now();
        info!("Registry admin transferred to {}", new_admin);
        Ok(())
    }

    /// Fail with `UnregisteredOracle` unless the address is registered
    pub async fn require_registered(&self, oracle: &Address) -> Result<()> {
        if !self.inner.read().await.contains(oracle) {
            return Err(MitamaError::UnregisteredOracle {
                oracle: oracle.to_string(),
            });
        }
        Ok(())
    }

    /// Current registry contents
    pub async fn snapshot(&self) -> OracleRegistry {
        self.inner.read().await.clone()
    }

    /// Aggregate submissions into a consensus score per the configured mode
    ///
    /// Submissions from addresses no longer in the registry are ignored.
    pub async fn consensus_score(&self, submissions: &[OracleSubmission]) -> Result<u8> {
        let registry = self.inner.read().await;
        match registry.mode {
            ConsensusMode::MedianFiltered => {
                let scores: Vec<u8> = submissions
                    .iter()
                    .filter(|s| registry.contains(&s.oracle))
                    .map(|s| s.quality_score)
                    .collect();
                consensus::median_filtered(
                    &scores,
                    registry.min_consensus,
                    registry.max_score_deviation,
                )
            }
            ConsensusMode::Weighted => {
                let weighted: Vec<(u8, u16)> = submissions
                    .iter()
                    .filter_map(|s| registry.weight_of(&s.oracle).map(|w| (s.quality_score, w)))
                    .collect();
                // The quorum applies in both modes; weighting only changes
                // the aggregation, not how many oracles must weigh in.
                if !weighted.is_empty() && weighted.len() < registry.min_consensus as usize {
                    return Err(MitamaError::InsufficientConsensus {
                        submissions: weighted.len(),
                        required: registry.min_consensus,
                    });
                }
                consensus::weighted(&weighted)
            }
        }
    }
}
