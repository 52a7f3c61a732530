//! Error types for Mitama
//!
//! Every operation either fully applies or fully fails with one of these
//! errors; nothing is silently swallowed. Errors are classified by
//! [`ErrorKind`] so autonomous callers can decide mechanically whether a
//! retry can ever help (only Consensus-kind errors are recoverable by more
//! input).

use thiserror::Error;

/// Result type for Mitama operations
pub type Result<T> = std::result::Result<T, MitamaError>;

/// Broad classification of an error for automated handling
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Caller-facing input rejection; never retried
    Validation,
    /// Caller is not permitted to perform the operation; never retried
    Authorization,
    /// Definitive rejection by current state; re-check state before retrying
    StateConflict,
    /// Recoverable by more oracle input or registry reconfiguration
    Consensus,
    /// Referenced entity does not exist
    NotFound,
}

/// Mitama error types
#[derive(Debug, Clone, Error)]
pub enum MitamaError {
    // ========================================================================
    // Validation
    // ========================================================================

    /// Escrow amount outside the configured bounds
    #[error("Invalid amount {amount}: must be within [{min}, {max}] base units")]
    InvalidAmount { amount: u64, min: u64, max: u64 },

    /// Time-lock outside 1 hour .. 30 days
    #[error("Invalid time lock {seconds}s: must be between 1 hour and 30 days")]
    InvalidTimeLock { seconds: i64 },

    /// Empty, over-long, or live-duplicate transaction id
    #[error("Invalid transaction id {transaction_id:?}")]
    InvalidTransactionId { transaction_id: String },

    /// Empty or over-long identity name
    #[error("Invalid identity name {name:?}")]
    InvalidName { name: String },

    /// Quality score outside [0, 100]
    #[error("Invalid quality score {score}: must be 0-100")]
    InvalidQualityScore { score: u8 },

    /// Oracle weight must be at least 1
    #[error("Invalid oracle weight {weight}")]
    InvalidOracleWeight { weight: u16 },

    /// Registry consensus parameters out of range
    #[error("Invalid consensus config: {reason}")]
    InvalidConsensusConfig { reason: String },

    /// Mixed-asset arithmetic
    #[error("Asset mismatch: expected {expected}, got {actual}")]
    AssetMismatch { expected: String, actual: String },

    /// Arithmetic overflow
    #[error("Arithmetic overflow")]
    ArithmeticOverflow,

    // ========================================================================
    // Authorization
    // ========================================================================

    /// Caller is not the required party
    #[error("Unauthorized: {reason}")]
    Unauthorized { reason: String },

    // ========================================================================
    // State conflict
    // ========================================================================

    /// Agreement is not in a status that allows the operation
    #[error("Invalid status for {transaction_id}: agreement is {status}")]
    InvalidStatus {
        transaction_id: String,
        status: String,
    },

    /// Identity already deactivated
    #[error("Identity {identity} is already inactive")]
    AlreadyInactive { identity: String },

    /// Identity is inactive and cannot open agreements
    #[error("Identity {identity} is inactive")]
    IdentityInactive { identity: String },

    /// Owner already has an identity
    #[error("Owner {owner} already has an identity")]
    DuplicateIdentity { owner: String },

    /// Oracle already registered
    #[error("Oracle {oracle} is already registered")]
    DuplicateOracle { oracle: String },

    /// Oracle already submitted a score for this agreement
    #[error("Oracle {oracle} already submitted a score for {transaction_id}")]
    DuplicateOracleSubmission {
        oracle: String,
        transaction_id: String,
    },

    /// Registry at capacity
    #[error("Oracle registry is full ({capacity} oracles)")]
    RegistryFull { capacity: usize },

    /// Stake below the minimum threshold
    #[error("Insufficient stake: required {required}, provided {provided}")]
    InsufficientStake { required: u64, provided: u64 },

    /// Agent cannot cover the dispute cost
    #[error("Insufficient dispute funds: required {required}, available {available}")]
    InsufficientDisputeFunds { required: u64, available: u64 },

    /// Custody account cannot cover the transfer
    #[error("Insufficient funds for {address}: requested {requested}, available {available}")]
    InsufficientFunds {
        address: String,
        requested: u64,
        available: u64,
    },

    // ========================================================================
    // Consensus (recoverable by more input)
    // ========================================================================

    /// Fewer submissions than the consensus quorum
    #[error("Insufficient consensus: {submissions} submissions, {required} required")]
    InsufficientConsensus { submissions: usize, required: u8 },

    /// Too many outliers; the agreement remains disputed
    #[error("No consensus reached: only {valid} of {submissions} scores within deviation")]
    NoConsensus { valid: usize, submissions: usize },

    /// Weighted consensus over an empty submission set
    #[error("No oracle submissions")]
    NoSubmissions,

    // ========================================================================
    // Not found
    // ========================================================================

    /// Oracle absent from the registry
    #[error("Oracle {oracle} not found in registry")]
    OracleNotFound { oracle: String },

    /// Submitting oracle is not registered
    #[error("Oracle {oracle} is not registered")]
    UnregisteredOracle { oracle: String },

    /// No identity for the given address
    #[error("Identity {address} not found")]
    IdentityNotFound { address: String },

    /// No agreement for the given transaction id
    #[error("Agreement {transaction_id} not found")]
    AgreementNotFound { transaction_id: String },
}

impl MitamaError {
    /// Classify this error for automated handling
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidAmount { .. }
            | Self::InvalidTimeLock { .. }
            | Self::InvalidTransactionId { .. }
            | Self::InvalidName { .. }
            | Self::InvalidQualityScore { .. }
            | Self::InvalidOracleWeight { .. }
            | Self::InvalidConsensusConfig { .. }
            | Self::AssetMismatch { .. }
            | Self::ArithmeticOverflow => ErrorKind::Validation,

            Self::Unauthorized { .. } => ErrorKind::Authorization,

            Self::InvalidStatus { .. }
            | Self::AlreadyInactive { .. }
            | Self::IdentityInactive { .. }
            | Self::DuplicateIdentity { .. }
            | Self::DuplicateOracle { .. }
            | Self::DuplicateOracleSubmission { .. }
            | Self::RegistryFull { .. }
            | Self::InsufficientStake { .. }
            | Self::InsufficientDisputeFunds { .. }
            | Self::InsufficientFunds { .. } => ErrorKind::StateConflict,

            Self::InsufficientConsensus { .. }
            | Self::NoConsensus { .. }
            | Self::NoSubmissions => ErrorKind::Consensus,

            Self::OracleNotFound { .. }
            | Self::UnregisteredOracle { .. }
            | Self::IdentityNotFound { .. }
            | Self::AgreementNotFound { .. } => ErrorKind::NotFound,
        }
    }

    /// Whether additional oracle input (or registry reconfiguration) may
    /// resolve the condition later
    pub fn is_recoverable(&self) -> bool {
        self.kind() == ErrorKind::Consensus
    }

    /// Get an error code for API responses
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::InvalidAmount { .. } => "INVALID_AMOUNT",
            Self::InvalidTimeLock { .. } => "INVALID_TIME_LOCK",
            Self::InvalidTransactionId { .. } => "INVALID_TRANSACTION_ID",
            Self::InvalidName { .. } => "INVALID_NAME",
            Self::InvalidQualityScore { .. } => "INVALID_QUALITY_SCORE",
            Self::InvalidOracleWeight { .. } => "INVALID_ORACLE_WEIGHT",
            Self::InvalidConsensusConfig { .. } => "INVALID_CONSENSUS_CONFIG",
            Self::AssetMismatch { .. } => "ASSET_MISMATCH",
            Self::ArithmeticOverflow => "ARITHMETIC_OVERFLOW",
            Self::Unauthorized { .. } => "UNAUTHORIZED",
            Self::InvalidStatus { .. } => "INVALID_STATUS",
            Self::AlreadyInactive { .. } => "ALREADY_INACTIVE",
            Self::IdentityInactive { .. } => "IDENTITY_INACTIVE",
            Self::DuplicateIdentity { .. } => "DUPLICATE_IDENTITY",
            Self::DuplicateOracle { .. } => "DUPLICATE_ORACLE",
            Self::DuplicateOracleSubmission { .. } => "DUPLICATE_ORACLE_SUBMISSION",
            Self::RegistryFull { .. } => "REGISTRY_FULL",
            Self::InsufficientStake { .. } => "INSUFFICIENT_STAKE",
            Self::InsufficientDisputeFunds { .. } => "INSUFFICIENT_DISPUTE_FUNDS",
            Self::InsufficientFunds { .. } => "INSUFFICIENT_FUNDS",
            Self::InsufficientConsensus { .. } => "INSUFFICIENT_CONSENSUS",
            Self::NoConsensus { .. } => "NO_CONSENSUS",
            Self::NoSubmissions => "NO_SUBMISSIONS",
            Self::OracleNotFound { .. } => "ORACLE_NOT_FOUND",
            Self::UnregisteredOracle { .. } => "UNREGISTERED_ORACLE",
            Self::IdentityNotFound { .. } => "IDENTITY_NOT_FOUND",
            Self::AgreementNotFound { .. } => "AGREEMENT_NOT_FOUND",
        }
    }

    /// Create an unauthorized error
    pub fn unauthorized(reason: impl Into<String>) -> Self {
        Self::Unauthorized {
            reason: reason.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_kinds() {
        assert_eq!(
            MitamaError::InvalidTimeLock { seconds: 10 }.kind(),
            ErrorKind::Validation
        );
        assert_eq!(
            MitamaError::unauthorized("not the agent").kind(),
            ErrorKind::Authorization
        );
        assert_eq!(
            MitamaError::AlreadyInactive {
                identity: "x".into()
            }
            .kind(),
            ErrorKind::StateConflict
        );
        assert_eq!(MitamaError::NoSubmissions.kind(), ErrorKind::Consensus);
        assert_eq!(
            MitamaError::AgreementNotFound {
                transaction_id: "tx".into()
            }
            .kind(),
            ErrorKind::NotFound
        );
    }

    #[test]
    fn test_only_consensus_errors_recoverable() {
        assert!(MitamaError::InsufficientConsensus {
            submissions: 1,
            required: 2
        }
        .is_recoverable());
        assert!(MitamaError::NoConsensus {
            valid: 1,
            submissions: 4
        }
        .is_recoverable());
        assert!(!MitamaError::unauthorized("nope").is_recoverable());
        assert!(!MitamaError::ArithmeticOverflow.is_recoverable());
    }

    #[test]
    fn test_error_codes() {
        let err = MitamaError::RegistryFull { capacity: 5 };
        assert_eq!(err.error_code(), "REGISTRY_FULL");
    }
}
