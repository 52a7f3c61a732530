//! Mitama Identity Ledger - stake and reputation accounting
//!
//! The ledger is:
//! - Keyed by owner address (one identity per owner)
//! - Stake-backed (creation debits the owner's external balance into the
//!   stake vault; deactivation refunds it in full)
//! - Atomic (every mutation happens under a single write lock; reputation
//!   updates are never an unprotected read-then-write)
//!
//! Reputation deltas on resolution are applied to the historical record even
//! if the identity has since been deactivated.

pub mod outcome;

use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use tokio::sync::RwLock;
use tracing::{debug, info};

use mitama_custody::Custody;
use mitama_types::{
    Address, Amount, Identity, IdentityKind, MitamaError, Result, MAX_NAME_LENGTH,
    MIN_STAKE_AMOUNT,
};

pub use outcome::{
    dispute_cost, PartyRole, ReputationChange, ResolutionOutcome, BASE_DISPUTE_COST,
};

struct Inner {
    /// Identity records keyed by owner address
    by_owner: HashMap<Address, Identity>,
    /// Identity address -> owner address index
    by_address: HashMap<Address, Address>,
}

/// The identity ledger
pub struct IdentityLedger {
    inner: RwLock<Inner>,
    custody: Arc<dyn Custody>,
    /// Address holding all locked stakes
    vault: Address,
}

impl IdentityLedger {
    pub fn new(custody: Arc<dyn Custody>) -> Self {
        Self {
            inner: RwLock::new(Inner {
                by_owner: HashMap::new(),
                by_address: HashMap::new(),
            }),
            custody,
            vault: Address::new(),
        }
    }

    /// The stake vault address
    pub fn vault(&self) -> &Address {
        &self.vault
    }

    /// Create a new identity, locking `initial_stake` from the owner
    ///
    /// Fails with `InvalidName`, `InsufficientStake`, or `DuplicateIdentity`.
    pub async fn create(
        &self,
        owner: Address,
        name: impl Into<String>,
        kind: IdentityKind,
        initial_stake: u64,
    ) -> Result<Identity> {
        let name = name.into();
        if name.is_empty() || name.len() > MAX_NAME_LENGTH {
            return Err(MitamaError::InvalidName { name });
        }
        if initial_stake < MIN_STAKE_AMOUNT {
            return Err(MitamaError::InsufficientStake {
                required: MIN_STAKE_AMOUNT,
                provided: initial_stake,
            });
        }

        let mut inner = self.inner.write().await;
        if inner.by_owner.contains_key(&owner) {
            return Err(MitamaError::DuplicateIdentity {
                owner: owner.to_string(),
            });
        }

        // Lock the stake before the record becomes visible.
        self.custody
            .transfer(&owner, &self.vault, Amount::native(initial_stake))
            .await?;

        let identity = Identity::new(owner, name, kind, initial_stake);
        inner.by_address.insert(identity.address, owner);
        inner.by_owner.insert(owner, identity.clone());

        info!(
            "Identity created: {} ({:?}) stake={}",
            identity.address, identity.kind, initial_stake
        );
        Ok(identity)
    }

    /// Deactivate the owner's identity, refunding the full stake
    ///
    /// Irreversible. Fails with `AlreadyInactive` on repeat calls and
    /// `IdentityNotFound` if the owner never created one.
    pub async fn deactivate(&self, owner: &Address) -> Result<(Identity, u64)> {
        let mut inner = self.inner.write().await;
        let identity = inner
            .by_owner
            .get_mut(owner)
            .ok_or_else(|| MitamaError::IdentityNotFound {
                address: owner.to_string(),
            })?;

        if !identity.is_active {
            return Err(MitamaError::AlreadyInactive {
                identity: identity.address.to_string(),
            });
        }

        let refunded = identity.stake_amount;
        self.custody
            .transfer(&self.vault, owner, Amount::native(refunded))
            .await?;

        identity.is_active = false;
        identity.stake_amount = 0;

        info!("Identity deactivated: {} refunded={}", identity.address, refunded);
        Ok((identity.clone(), refunded))
    }

    /// Record a trust-path release for a party: total and successful
    /// counters increment, reputation is untouched
    pub async fn record_release(&self, identity_address: &Address) -> Result<()> {
        self.with_identity_mut(identity_address, |identity| {
            identity.total_agreements += 1;
            identity.successful_agreements += 1;
            identity.last_active = Utc::now();
        })
        .await
    }

    /// Record that this identity filed a dispute
    pub async fn record_dispute_filed(&self, identity_address: &Address) -> Result<()> {
        self.with_identity_mut(identity_address, |identity| {
            identity.disputed_agreements += 1;
            identity.last_active = Utc::now();
        })
        .await
    }

    /// Apply a dispute resolution outcome: reputation delta and counters
    ///
    /// Applied even to deactivated identities (the historical record still
    /// reflects how disputes it was party to were settled).
    pub async fn apply_resolution(
        &self,
        identity_address: &Address,
        outcome: &ResolutionOutcome,
    ) -> Result<ReputationChange> {
        let mut inner = self.inner.write().await;
        let owner = *inner.by_address.get(identity_address).ok_or_else(|| {
            MitamaError::IdentityNotFound {
                address: identity_address.to_string(),
            }
        })?;
        let identity = inner
            .by_owner
            .get_mut(&owner)
            .expect("index entry without record");

        let delta = outcome.reputation_delta();
        let old_reputation = identity.reputation;
        let new_reputation = identity.apply_reputation_delta(delta);

        identity.total_agreements += 1;
        if outcome.is_favorable() {
            identity.successful_agreements += 1;
        }
        identity.last_active = Utc::now();

        debug!(
            "Resolution applied to {}: reputation {} -> {} (delta {})",
            identity_address, old_reputation, new_reputation, delta
        );

        Ok(ReputationChange {
            identity: *identity_address,
            old_reputation,
            new_reputation,
            delta,
        })
    }

    /// Look up an identity by its owner address
    pub async fn get_by_owner(&self, owner: &Address) -> Option<Identity> {
        self.inner.read().await.by_owner.get(owner).cloned()
    }

    /// Look up an identity by its identity address
    pub async fn get_by_address(&self, address: &Address) -> Option<Identity> {
        let inner = self.inner.read().await;
        let owner = inner.by_address.get(address)?;
        inner.by_owner.get(owner).cloned()
    }

    async fn with_identity_mut(
        &self,
        identity_address: &Address,
        f: impl FnOnce(&mut Identity),
    ) -> Result<()> {
        let mut inner = self.inner.write().await;
        let owner = *inner.by_address.get(identity_address).ok_or_else(|| {
            MitamaError::IdentityNotFound {
                address: identity_address.to_string(),
            }
        })?;
        let identity = inner
            .by_owner
            .get_mut(&owner)
            .expect("index entry without record");
        f(identity);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mitama_custody::InMemoryCustody;
    use mitama_types::Asset;

    async fn funded_ledger(owner: &Address, balance: u64) -> (IdentityLedger, Arc<InMemoryCustody>) {
        let custody = InMemoryCustody::shared();
        custody.deposit(owner, Amount::native(balance)).await;
        (IdentityLedger::new(custody.clone()), custody)
    }

    #[tokio::test]
    async fn test_create_locks_stake() {
        let owner = Address::new();
        let (ledger, custody) = funded_ledger(&owner, 500_000_000).await;

        let identity = ledger
            .create(owner, "scout", IdentityKind::Trading, MIN_STAKE_AMOUNT)
            .await
            .unwrap();

        assert_eq!(identity.reputation, 500);
        assert_eq!(identity.stake_amount, MIN_STAKE_AMOUNT);
        assert_eq!(
            custody.balance_of(&owner, &Asset::Native).await,
            400_000_000
        );
        assert_eq!(
            custody.balance_of(ledger.vault(), &Asset::Native).await,
            MIN_STAKE_AMOUNT
        );
    }

    #[tokio::test]
    async fn test_create_validation() {
        let owner = Address::new();
        let (ledger, _custody) = funded_ledger(&owner, 500_000_000).await;

        let err = ledger
            .create(owner, "", IdentityKind::Trading, MIN_STAKE_AMOUNT)
            .await
            .unwrap_err();
        assert!(matches!(err, MitamaError::InvalidName { .. }));

        let err = ledger
            .create(owner, "x".repeat(33), IdentityKind::Trading, MIN_STAKE_AMOUNT)
            .await
            .unwrap_err();
        assert!(matches!(err, MitamaError::InvalidName { .. }));

        let err = ledger
            .create(owner, "scout", IdentityKind::Trading, MIN_STAKE_AMOUNT - 1)
            .await
            .unwrap_err();
        assert!(matches!(err, MitamaError::InsufficientStake { .. }));
    }

    #[tokio::test]
    async fn test_one_identity_per_owner() {
        let owner = Address::new();
        let (ledger, _custody) = funded_ledger(&owner, 500_000_000).await;

        ledger
            .create(owner, "first", IdentityKind::Trading, MIN_STAKE_AMOUNT)
            .await
            .unwrap();
        let err = ledger
            .create(owner, "second", IdentityKind::Service, MIN_STAKE_AMOUNT)
            .await
            .unwrap_err();
        assert!(matches!(err, MitamaError::DuplicateIdentity { .. }));
    }

    #[tokio::test]
    async fn test_deactivation_is_irreversible() {
        let owner = Address::new();
        let (ledger, custody) = funded_ledger(&owner, 500_000_000).await;

        ledger
            .create(owner, "scout", IdentityKind::Trading, 200_000_000)
            .await
            .unwrap();
        let (identity, refunded) = ledger.deactivate(&owner).await.unwrap();

        assert_eq!(refunded, 200_000_000);
        assert!(!identity.is_active);
        assert_eq!(identity.stake_amount, 0);
        assert_eq!(
            custody.balance_of(&owner, &Asset::Native).await,
            500_000_000
        );

        let err = ledger.deactivate(&owner).await.unwrap_err();
        assert!(matches!(err, MitamaError::AlreadyInactive { .. }));
    }

    #[tokio::test]
    async fn test_release_counters_no_reputation_change() {
        let owner = Address::new();
        let (ledger, _custody) = funded_ledger(&owner, 500_000_000).await;
        let identity = ledger
            .create(owner, "scout", IdentityKind::Trading, MIN_STAKE_AMOUNT)
            .await
            .unwrap();

        ledger.record_release(&identity.address).await.unwrap();

        let after = ledger.get_by_address(&identity.address).await.unwrap();
        assert_eq!(after.total_agreements, 1);
        assert_eq!(after.successful_agreements, 1);
        assert_eq!(after.reputation, 500);
    }

    #[tokio::test]
    async fn test_resolution_applies_to_deactivated_identity() {
        let owner = Address::new();
        let (ledger, _custody) = funded_ledger(&owner, 500_000_000).await;
        let identity = ledger
            .create(owner, "scout", IdentityKind::Service, MIN_STAKE_AMOUNT)
            .await
            .unwrap();
        ledger.deactivate(&owner).await.unwrap();

        let outcome = ResolutionOutcome {
            quality_score: 90,
            refund_percentage: 0,
            role: PartyRole::Provider,
        };
        let change = ledger
            .apply_resolution(&identity.address, &outcome)
            .await
            .unwrap();

        assert!(change.delta > 0);
        let after = ledger.get_by_address(&identity.address).await.unwrap();
        assert_eq!(after.total_agreements, 1);
        assert!(!after.is_active);
    }
}
