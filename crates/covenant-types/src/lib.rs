//! # covenant-types
//!
//! Shared types, errors, and configuration for the **Covenant** escrow engine.
//!
//! This crate is the leaf dependency of the workspace. Every other crate
//! depends on it. It defines:
//!
//! - **Identifiers**: [`InvoiceId`], [`Principal`], [`EventId`]
//! - **Amounts**: [`Amount`] (6-decimal fixed point)
//! - **Invoice model**: [`Invoice`], [`InvoiceStatus`], [`Role`]
//! - **Lifecycle**: [`Action`] and the transition table in [`lifecycle`]
//! - **Fee engine**: [`calculate_fees`], [`FeeSchedule`], [`FeeBreakdown`]
//! - **Events**: [`EscrowEvent`], [`EventRecord`]
//! - **Configuration**: [`EscrowConfig`]
//! - **Errors**: [`CovenantError`] with `CV_ERR_` prefix codes
//! - **Constants**: system-wide limits and defaults

pub mod amount;
pub mod config;
pub mod constants;
pub mod error;
pub mod event;
pub mod fees;
pub mod ids;
pub mod invoice;
pub mod lifecycle;

// Re-export all primary types at crate root for ergonomic imports:
//   use covenant_types::{Invoice, InvoiceStatus, Amount, Principal, ...};

pub use amount::*;
pub use config::*;
pub use error::*;
pub use event::*;
pub use fees::*;
pub use ids::*;
pub use invoice::*;
pub use lifecycle::Action;

// Constants are accessed via `covenant_types::constants::FOO`
// (not re-exported to avoid name collisions).
