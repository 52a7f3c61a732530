//! Mitama Escrow - the agreement state machine and settlement engine
//!
//! The [`EscrowEngine`] is the boundary the surrounding system (SDK,
//! middleware, CLI) talks to. It owns the agreement book and wires together
//! the identity ledger, the oracle directory, the custody seam, and the
//! event broadcast.
//!
//! # Agreement lifecycle
//!
//! ```text
//! Active ──release──────────▶ Released   (terminal)
//! Active ──mark_disputed──▶ Disputed ──consensus──▶ Resolved (terminal)
//! ```
//!
//! Transitions are strictly forward. Each operation runs under a single
//! write-lock scope, so an agreement either fully transitions or is left
//! untouched; oracle check-then-insert races cannot produce duplicate
//! submissions.

pub mod engine;

pub use engine::{EscrowEngine, Settlement, SubmissionOutcome};
