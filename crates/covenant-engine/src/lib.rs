//! # covenant-engine
//!
//! **Lifecycle plane**: the invoice registry, the approval/dispute state
//! machine, and the public [`EscrowService`] API.
//!
//! ## Architecture
//!
//! An [`EscrowService`] owns an asset ledger and drives every invoice
//! through its lifecycle:
//! 1. `create_and_fund` pulls the amount from the payer into custody
//! 2. `approve` from both parties releases to the payee (platform fee only)
//! 3. `dispute` hands the decision to the arbiter
//! 4. `arbitrate_release` / `arbitrate_refund` pay out with the arbiter fee
//!
//! Each mutating call holds the [`ReentrancyGuard`], stages its changes
//! against the [`InvoiceRegistry`], moves value through a write-ahead
//! journal, and commits the record, the custody pool and the
//! [`EventLog`] together. A failure anywhere rolls the journal back.
//!
//! Administrative calls (`update_treasury`, `transfer_ownership`) pass the
//! [`OwnerGate`] first.

pub mod access;
pub mod escrow;
pub mod event_log;
pub mod guard;
pub mod registry;

pub use access::OwnerGate;
pub use escrow::{CustodyReport, EscrowService};
pub use event_log::EventLog;
pub use guard::{GuardToken, ReentrancyGuard};
pub use registry::InvoiceRegistry;
