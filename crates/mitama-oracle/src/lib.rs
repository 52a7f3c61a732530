//! Mitama Oracle - authorized quality scorers and consensus resolution
//!
//! Two pieces: the pure consensus math ([`consensus`]) that turns a set of
//! oracle scores into one settlement score, and the [`OracleDirectory`] that
//! holds the admin-managed registry and dispatches to the configured
//! aggregation mode.

pub mod consensus;
pub mod directory;

pub use consensus::{median_filtered, refund_percentage, weighted};
pub use directory::OracleDirectory;
