//! Mitama Types - Canonical domain types for agent dispute resolution
//!
//! This crate contains all foundational types for Mitama with zero dependencies
//! on other mitama crates. It defines the complete type system for:
//!
//! - Addresses and transaction identifiers
//! - Escrowed amounts (native asset or fungible token)
//! - Identity records with stake-backed accountability
//! - Agreements and their status machine
//! - Oracle registry, submissions and consensus configuration
//! - Protocol events and the error taxonomy
//!
//! # Architectural Invariants
//!
//! 1. Agreement status transitions are strictly forward; `Released` and
//!    `Resolved` are terminal.
//! 2. An identity's stake is zero if and only if the identity is inactive.
//! 3. Reputation is always within `[0, 1000]`.
//! 4. Refund and payment portions of a settlement always sum exactly to the
//!    locked amount.

pub mod address;
pub mod amount;
pub mod identity;
pub mod agreement;
pub mod oracle;
pub mod event;
pub mod error;

pub use address::*;
pub use amount::*;
pub use identity::*;
pub use agreement::*;
pub use oracle::*;
pub use event::*;
pub use error::*;

/// Version of the Mitama types schema
pub const TYPES_VERSION: &str = "0.1.0";
