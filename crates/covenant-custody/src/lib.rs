//! # covenant-custody
//!
//! **Custody Plane**: everything that moves value. The lifecycle engine
//! decides *whether* value moves; this crate decides *how*, and guarantees
//! that an aborted operation moves nothing.
//!
//! ## Architecture
//!
//! 1. **AssetLedger**: boundary trait to the external asset-transfer service
//! 2. **MemoryLedger**: in-process reference ledger (balances, allowances, blocks)
//! 3. **TransferJournal**: per-operation write-ahead log with rollback
//! 4. **PayoutPlan**: fee-split payout legs (treasury, arbiter, destination)
//! 5. **CustodyPool**: held-value accounting and invariant verification
//!
//! ## Payout Flow
//!
//! ```text
//! FeeSchedule.split() → PayoutPlan → execute(ledger, journal)
//!     → Ok:  journal.commit(), pool.record_payout(), status committed
//!     → Err: journal.rollback(ledger), nothing committed
//! ```

pub mod asset;
pub mod journal;
pub mod memory_ledger;
pub mod payout;
pub mod pool;

pub use asset::{AssetLedger, Transfer, TransferKind};
pub use journal::TransferJournal;
pub use memory_ledger::MemoryLedger;
pub use payout::{LegPurpose, PayoutKind, PayoutLeg, PayoutPlan, deposit};
pub use pool::CustodyPool;
