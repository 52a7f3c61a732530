//! The escrow engine - agreement book, state machine, and settlement

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{Duration, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::{broadcast, RwLock};
use tracing::{debug, info};

use mitama_custody::Custody;
use mitama_identity::{dispute_cost, IdentityLedger, PartyRole, ResolutionOutcome};
use mitama_oracle::{consensus, OracleDirectory};
use mitama_types::{
    Address, Agreement, AgreementStatus, Amount, Asset, Identity, IdentityKind, MitamaError,
    MitamaEvent, OracleKind, OracleRegistry, OracleSubmission, Result, TransactionId,
    MAX_ESCROW_AMOUNT, MAX_TIME_LOCK_SECS, MIN_ESCROW_AMOUNT, MIN_TIME_LOCK_SECS,
};

/// Broadcast capacity for protocol events
const EVENT_CHANNEL_CAPACITY: usize = 256;

/// The final split of a resolved dispute
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Settlement {
    pub transaction_id: TransactionId,
    pub consensus_score: u8,
    pub refund_percentage: u8,
    /// Portion returned to the agent
    pub refund_amount: Amount,
    /// Portion paid to the provider
    pub payment_amount: Amount,
    pub oracle_count: u8,
    pub individual_scores: Vec<u8>,
    pub oracles: Vec<Address>,
}

/// Result of one oracle submission
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum SubmissionOutcome {
    /// Quorum reached; the agreement settled
    Resolved(Settlement),
    /// Recorded, but the agreement stays disputed until more submissions
    /// arrive (or the registry is reconfigured)
    AwaitingConsensus { submissions: usize },
}

/// The protocol engine
pub struct EscrowEngine {
    agreements: RwLock<HashMap<TransactionId, Agreement>>,
    identities: Arc<IdentityLedger>,
    oracles: Arc<OracleDirectory>,
    custody: Arc<dyn Custody>,
    /// Address holding all escrowed funds
    vault: Address,
    events: broadcast::Sender<MitamaEvent>,
}

impl EscrowEngine {
    pub fn new(
        identities: Arc<IdentityLedger>,
        oracles: Arc<OracleDirectory>,
        custody: Arc<dyn Custody>,
    ) -> Self {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            agreements: RwLock::new(HashMap::new()),
            identities,
            oracles,
            custody,
            vault: Address::new(),
            events,
        }
    }

    /// Subscribe to protocol events (best-effort delivery)
    pub fn subscribe(&self) -> broadcast::Receiver<MitamaEvent> {
        self.events.subscribe()
    }

    /// The escrow vault address
    pub fn vault(&self) -> &Address {
        &self.vault
    }

    /// Announce the registry configuration to current subscribers
    pub async fn announce_registry(&self) {
        let registry = self.oracles.snapshot().await;
        self.emit(MitamaEvent::OracleRegistryInitialized {
            admin: registry.admin,
            min_consensus: registry.min_consensus,
            max_score_deviation: registry.max_score_deviation,
            timestamp: Utc::now(),
        });
    }

    // ========================================================================
    // Identity boundary
    // ========================================================================

    /// Create an identity, locking the initial stake
    pub async fn create_identity(
        &self,
        owner: Address,
        name: impl Into<String>,
        kind: IdentityKind,
        initial_stake: u64,
    ) -> Result<Identity> {
        let identity = self.identities.create(owner, name, kind, initial_stake).await?;
        self.emit(MitamaEvent::AgentCreated {
            identity: identity.address,
            owner: identity.owner,
            name: identity.name.clone(),
            kind: identity.kind,
            stake_amount: identity.stake_amount,
            timestamp: Utc::now(),
        });
        Ok(identity)
    }

    /// Deactivate the owner's identity, refunding the stake
    pub async fn deactivate_identity(&self, owner: &Address) -> Result<u64> {
        let (identity, refunded) = self.identities.deactivate(owner).await?;
        self.emit(MitamaEvent::AgentDeactivated {
            identity: identity.address,
            owner: identity.owner,
            refunded_stake: refunded,
            timestamp: Utc::now(),
        });
        Ok(refunded)
    }

    /// Identity record for an owner address
    pub async fn identity_by_owner(&self, owner: &Address) -> Option<Identity> {
        self.identities.get_by_owner(owner).await
    }

    /// Identity record by identity address
    pub async fn identity_by_address(&self, address: &Address) -> Option<Identity> {
        self.identities.get_by_address(address).await
    }

    // ========================================================================
    // Oracle registry boundary
    // ========================================================================

    /// Add an oracle to the registry; admin only
    pub async fn add_oracle(
        &self,
        caller: &Address,
        oracle: Address,
        kind: OracleKind,
        weight: u16,
    ) -> Result<()> {
        let config = self.oracles.add_oracle(caller, oracle, kind, weight).await?;
        self.emit(MitamaEvent::OracleAdded {
            oracle: config.address,
            kind: config.kind,
            weight: config.weight,
            timestamp: Utc::now(),
        });
        Ok(())
    }

    /// Remove an oracle from the registry; admin only
    pub async fn remove_oracle(&self, caller: &Address, oracle: &Address) -> Result<()> {
        self.oracles.remove_oracle(caller, oracle).await?;
        self.emit(MitamaEvent::OracleRemoved {
            oracle: *oracle,
            timestamp: Utc::now(),
        });
        Ok(())
    }

    /// Current registry contents
    pub async fn registry(&self) -> OracleRegistry {
        self.oracles.snapshot().await
    }

    // ========================================================================
    // Agreement state machine
    // ========================================================================

    /// Create an agreement, locking `amount` from the agent's owner balance
    pub async fn create_agreement(
        &self,
        agent_owner: &Address,
        provider: Address,
        amount: Amount,
        time_lock_secs: i64,
        transaction_id: &str,
    ) -> Result<Agreement> {
        if amount.value < MIN_ESCROW_AMOUNT || amount.value > MAX_ESCROW_AMOUNT {
            return Err(MitamaError::InvalidAmount {
                amount: amount.value,
                min: MIN_ESCROW_AMOUNT,
                max: MAX_ESCROW_AMOUNT,
            });
        }
        if !(MIN_TIME_LOCK_SECS..=MAX_TIME_LOCK_SECS).contains(&time_lock_secs) {
            return Err(MitamaError::InvalidTimeLock {
                seconds: time_lock_secs,
            });
        }
        let transaction_id = TransactionId::new(transaction_id)?;

        let agent = self
            .identities
            .get_by_owner(agent_owner)
            .await
            .ok_or_else(|| MitamaError::IdentityNotFound {
                address: agent_owner.to_string(),
            })?;
        if !agent.is_active {
            return Err(MitamaError::IdentityInactive {
                identity: agent.address.to_string(),
            });
        }

        let mut agreements = self.agreements.write().await;
        // A transaction id may be reused once its previous agreement reached
        // a terminal state; live agreements keep it exclusive.
        if let Some(existing) = agreements.get(&transaction_id) {
            if !existing.status.is_terminal() {
                return Err(MitamaError::InvalidTransactionId {
                    transaction_id: transaction_id.to_string(),
                });
            }
        }

        self.custody.transfer(agent_owner, &self.vault, amount).await?;

        let now = Utc::now();
        let agreement = Agreement {
            transaction_id: transaction_id.clone(),
            agent: agent.address,
            agent_owner: *agent_owner,
            provider,
            amount,
            status: AgreementStatus::Active,
            created_at: now,
            expires_at: now + Duration::seconds(time_lock_secs),
            quality_score: None,
            refund_percentage: None,
            submissions: Vec::new(),
        };
        agreements.insert(transaction_id.clone(), agreement.clone());
        drop(agreements);

        info!(
            "Agreement {} created: {} locked for {}",
            transaction_id, amount, provider
        );
        self.emit(MitamaEvent::AgreementInitialized {
            transaction_id: transaction_id.to_string(),
            agent: agreement.agent,
            provider,
            amount: amount.value,
            expires_at: agreement.expires_at,
            timestamp: now,
        });
        Ok(agreement)
    }

    /// Release the full escrowed amount to the provider (trust path)
    ///
    /// Only the agent that created the agreement may call this, and only
    /// while the agreement is `Active`. Both parties' total/successful
    /// counters increment; reputation is untouched.
    pub async fn release(&self, transaction_id: &str, caller: &Address) -> Result<Agreement> {
        let transaction_id = TransactionId::new(transaction_id)?;
        let mut agreements = self.agreements.write().await;
        let agreement = Self::get_mut(&mut agreements, &transaction_id)?;

        if agreement.status != AgreementStatus::Active {
            return Err(Self::invalid_status(agreement));
        }
        if caller != &agreement.agent_owner {
            return Err(MitamaError::unauthorized(
                "only the agreement's agent may release funds",
            ));
        }

        self.custody
            .transfer(&self.vault, &agreement.provider, agreement.amount)
            .await?;
        agreement.status = AgreementStatus::Released;
        let released = agreement.clone();
        drop(agreements);

        self.identities.record_release(&released.agent).await?;
        if let Some(provider_identity) = self.identities.get_by_owner(&released.provider).await {
            self.identities.record_release(&provider_identity.address).await?;
        }

        info!("Agreement {} released: {}", released.transaction_id, released.amount);
        self.emit(MitamaEvent::FundsReleased {
            transaction_id: released.transaction_id.to_string(),
            amount: released.amount.value,
            provider: released.provider,
            timestamp: Utc::now(),
        });
        Ok(released)
    }

    /// Mark an agreement disputed, opening it for oracle submissions
    ///
    /// The agent must be able to cover the dispute cost, which scales with
    /// its historical dispute rate; habitual disputers pay more.
    pub async fn mark_disputed(&self, transaction_id: &str, caller: &Address) -> Result<Agreement> {
        let transaction_id = TransactionId::new(transaction_id)?;
        let mut agreements = self.agreements.write().await;
        let agreement = Self::get_mut(&mut agreements, &transaction_id)?;

        if agreement.status != AgreementStatus::Active {
            return Err(Self::invalid_status(agreement));
        }
        if caller != &agreement.agent_owner {
            return Err(MitamaError::unauthorized(
                "only the agreement's agent may open a dispute",
            ));
        }

        let agent = self
            .identities
            .get_by_address(&agreement.agent)
            .await
            .ok_or_else(|| MitamaError::IdentityNotFound {
                address: agreement.agent.to_string(),
            })?;
        let required = dispute_cost(&agent);
        let available = self.custody.balance_of(caller, &Asset::Native).await;
        if available < required {
            return Err(MitamaError::InsufficientDisputeFunds {
                required,
                available,
            });
        }

        agreement.status = AgreementStatus::Disputed;
        let disputed = agreement.clone();
        drop(agreements);

        self.identities.record_dispute_filed(&disputed.agent).await?;

        info!("Agreement {} disputed", disputed.transaction_id);
        self.emit(MitamaEvent::DisputeMarked {
            transaction_id: disputed.transaction_id.to_string(),
            agent: disputed.agent,
            timestamp: Utc::now(),
        });
        Ok(disputed)
    }

    /// Record one oracle's quality score for a disputed agreement
    ///
    /// The submission window stays open until every registered oracle has
    /// weighed in; only then does the engine attempt consensus. Settling at
    /// bare quorum would let an early pair of agreeing scores lock out a
    /// later dissenting oracle. [`Self::try_resolve`] settles earlier on
    /// request. Consensus shortfalls are not submission failures: the score
    /// is kept and the agreement stays `Disputed`.
    pub async fn submit_score(
        &self,
        transaction_id: &str,
        oracle: &Address,
        score: u8,
    ) -> Result<SubmissionOutcome> {
        if score > 100 {
            return Err(MitamaError::InvalidQualityScore { score });
        }
        self.oracles.require_registered(oracle).await?;

        let transaction_id = TransactionId::new(transaction_id)?;
        let mut agreements = self.agreements.write().await;
        let agreement = Self::get_mut(&mut agreements, &transaction_id)?;

        if agreement.status != AgreementStatus::Disputed {
            return Err(Self::invalid_status(agreement));
        }
        // Check-then-insert happens under the same write lock, so two
        // near-simultaneous submissions from one oracle cannot both land.
        if agreement.has_submission_from(oracle) {
            return Err(MitamaError::DuplicateOracleSubmission {
                oracle: oracle.to_string(),
                transaction_id: transaction_id.to_string(),
            });
        }

        agreement.submissions.push(OracleSubmission {
            oracle: *oracle,
            quality_score: score,
            submitted_at: Utc::now(),
        });
        debug!(
            "Score {} from {} for {} ({} submissions)",
            score,
            oracle,
            transaction_id,
            agreement.submissions.len()
        );

        let registry = self.oracles.snapshot().await;
        let all_submitted = registry
            .oracles
            .iter()
            .all(|o| agreement.has_submission_from(&o.address));
        if !all_submitted {
            return Ok(SubmissionOutcome::AwaitingConsensus {
                submissions: agreement.submissions.len(),
            });
        }

        match self.oracles.consensus_score(&agreement.submissions).await {
            Ok(consensus_score) => {
                let settlement = self.settle(agreement, consensus_score).await?;
                let (agent, provider) = (agreement.agent, agreement.provider);
                drop(agreements);
                self.finish_settlement(&agent, &provider, &settlement).await?;
                Ok(SubmissionOutcome::Resolved(settlement))
            }
            Err(err) if err.is_recoverable() => {
                let submissions = agreement.submissions.len();
                debug!("Agreement {} awaiting consensus: {}", transaction_id, err);
                Ok(SubmissionOutcome::AwaitingConsensus { submissions })
            }
            Err(err) => Err(err),
        }
    }

    /// Re-attempt consensus over the submissions already recorded
    ///
    /// Useful after registry reconfiguration (an outlier oracle removed, or
    /// the quorum lowered). Propagates Consensus-kind errors; the agreement
    /// stays `Disputed` on failure.
    pub async fn try_resolve(&self, transaction_id: &str) -> Result<Settlement> {
        let transaction_id = TransactionId::new(transaction_id)?;
        let mut agreements = self.agreements.write().await;
        let agreement = Self::get_mut(&mut agreements, &transaction_id)?;

        if agreement.status != AgreementStatus::Disputed {
            return Err(Self::invalid_status(agreement));
        }

        let consensus_score = self.oracles.consensus_score(&agreement.submissions).await?;
        let settlement = self.settle(agreement, consensus_score).await?;
        let (agent, provider) = (agreement.agent, agreement.provider);
        drop(agreements);
        self.finish_settlement(&agent, &provider, &settlement).await?;
        Ok(settlement)
    }

    /// Advisory expiry query; no state transition happens on expiry
    pub async fn is_expired(&self, transaction_id: &str) -> Result<bool> {
        let transaction_id = TransactionId::new(transaction_id)?;
        let agreements = self.agreements.read().await;
        let agreement =
            agreements
                .get(&transaction_id)
                .ok_or_else(|| MitamaError::AgreementNotFound {
                    transaction_id: transaction_id.to_string(),
                })?;
        Ok(agreement.is_expired())
    }

    /// Agreement by transaction id
    pub async fn agreement(&self, transaction_id: &str) -> Option<Agreement> {
        let transaction_id = TransactionId::new(transaction_id).ok()?;
        self.agreements.read().await.get(&transaction_id).cloned()
    }

    /// All agreements a given address participates in (as agent owner,
    /// agent identity, or provider)
    pub async fn agreements_for(&self, address: &Address) -> Vec<Agreement> {
        self.agreements
            .read()
            .await
            .values()
            .filter(|a| {
                &a.agent_owner == address || &a.agent == address || &a.provider == address
            })
            .cloned()
            .collect()
    }

    // ========================================================================
    // Settlement internals
    // ========================================================================

    /// Apply a consensus score to a disputed agreement: move both portions
    /// out of the vault and finalize the record. Runs under the agreement
    /// book's write lock.
    async fn settle(&self, agreement: &mut Agreement, consensus_score: u8) -> Result<Settlement> {
        let refund_pct = consensus::refund_percentage(consensus_score);
        let (refund, payment) = agreement.amount.split_refund(refund_pct);

        self.custody
            .transfer(&self.vault, &agreement.agent_owner, refund)
            .await?;
        self.custody
            .transfer(&self.vault, &agreement.provider, payment)
            .await?;

        agreement.status = AgreementStatus::Resolved;
        agreement.quality_score = Some(consensus_score);
        agreement.refund_percentage = Some(refund_pct);

        info!(
            "Agreement {} resolved: score={} refund={}% ({} back, {} paid)",
            agreement.transaction_id, consensus_score, refund_pct, refund, payment
        );

        Ok(Settlement {
            transaction_id: agreement.transaction_id.clone(),
            consensus_score,
            refund_percentage: refund_pct,
            refund_amount: refund,
            payment_amount: payment,
            oracle_count: agreement.submissions.len() as u8,
            individual_scores: agreement.submissions.iter().map(|s| s.quality_score).collect(),
            oracles: agreement.submissions.iter().map(|s| s.oracle).collect(),
        })
    }

    /// Post-settlement accounting: reputation deltas, counters, events
    async fn finish_settlement(
        &self,
        agent: &Address,
        provider: &Address,
        settlement: &Settlement,
    ) -> Result<()> {
        let agent_outcome = ResolutionOutcome {
            quality_score: settlement.consensus_score,
            refund_percentage: settlement.refund_percentage,
            role: PartyRole::Agent,
        };
        let change = self
            .identities
            .apply_resolution(agent, &agent_outcome)
            .await?;
        self.emit(MitamaEvent::AgentReputationUpdated {
            identity: change.identity,
            old_reputation: change.old_reputation,
            new_reputation: change.new_reputation,
            delta: change.delta,
            timestamp: Utc::now(),
        });

        if let Some(provider_identity) = self.identities.get_by_owner(provider).await {
            let provider_outcome = ResolutionOutcome {
                quality_score: settlement.consensus_score,
                refund_percentage: settlement.refund_percentage,
                role: PartyRole::Provider,
            };
            let change = self
                .identities
                .apply_resolution(&provider_identity.address, &provider_outcome)
                .await?;
            self.emit(MitamaEvent::AgentReputationUpdated {
                identity: change.identity,
                old_reputation: change.old_reputation,
                new_reputation: change.new_reputation,
                delta: change.delta,
                timestamp: Utc::now(),
            });
        } else {
            debug!(
                "Provider {} has no identity record; skipping reputation update",
                provider
            );
        }

        self.emit(MitamaEvent::DisputeResolved {
            transaction_id: settlement.transaction_id.to_string(),
            quality_score: settlement.consensus_score,
            refund_percentage: settlement.refund_percentage,
            refund_amount: settlement.refund_amount.value,
            payment_amount: settlement.payment_amount.value,
            timestamp: Utc::now(),
        });
        self.emit(MitamaEvent::MultiOracleDisputeResolved {
            transaction_id: settlement.transaction_id.to_string(),
            oracle_count: settlement.oracle_count,
            individual_scores: settlement.individual_scores.clone(),
            oracles: settlement.oracles.clone(),
            consensus_score: settlement.consensus_score,
            refund_percentage: settlement.refund_percentage,
            refund_amount: settlement.refund_amount.value,
            payment_amount: settlement.payment_amount.value,
            timestamp: Utc::now(),
        });
        Ok(())
    }

    fn get_mut<'a>(
        agreements: &'a mut HashMap<TransactionId, Agreement>,
        transaction_id: &TransactionId,
    ) -> Result<&'a mut Agreement> {
        agreements
            .get_mut(transaction_id)
            .ok_or_else(|| MitamaError::AgreementNotFound {
                transaction_id: transaction_id.to_string(),
            })
    }

    fn invalid_status(agreement: &Agreement) -> MitamaError {
        MitamaError::InvalidStatus {
            transaction_id: agreement.transaction_id.to_string(),
            status: format!("{:?}", agreement.status),
        }
    }

    fn emit(&self, event: MitamaEvent) {
        // Best-effort: a send error only means nobody is subscribed.
        let _ = self.events.send(event);
    }
}
