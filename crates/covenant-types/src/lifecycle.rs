//! Invoice lifecycle transition table.
//!
//! ```text
//!   CREATED ──fund──▶ FUNDED ──approve──▶ PENDING_APPROVAL ──approve──▶ RELEASED
//!      │                 │                        │
//!      │ cancel          └──────dispute───────────┤
//!      ▼                                          ▼
//!  CANCELLED                                  DISPUTED ──arbitrate_release──▶ RELEASED
//!                                                 └─────arbitrate_refund───▶ REFUNDED
//! ```
//!
//! Every legal (status, action) pair is listed in [`TRANSITIONS`]; anything
//! not in the table is rejected with `InvalidStatus`.

use serde::{Deserialize, Serialize};

use crate::{CovenantError, InvoiceStatus, Result};

/// A state-changing request against an invoice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Action {
    /// Custody pull completed (internal to `create_and_fund`).
    Fund,
    /// First approval by payer or payee.
    Approve,
    /// Second approval, by the party that has not approved yet.
    CompleteApproval,
    /// Payer or payee raises a dispute.
    Dispute,
    /// Arbiter rules for the payee.
    ArbitrateRelease,
    /// Arbiter rules for the payer.
    ArbitrateRefund,
    /// Payer or payee abandons an unfunded invoice.
    Cancel,
}

impl std::fmt::Display for Action {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Fund => write!(f, "fund"),
            Self::Approve => write!(f, "approve"),
            Self::CompleteApproval => write!(f, "complete_approval"),
            Self::Dispute => write!(f, "dispute"),
            Self::ArbitrateRelease => write!(f, "arbitrate_release"),
            Self::ArbitrateRefund => write!(f, "arbitrate_refund"),
            Self::Cancel => write!(f, "cancel"),
        }
    }
}

/// The complete set of legal transitions: `(from, action, to)`.
///
/// For actions with several source states, the first row is the
/// canonical "expected" status reported by `InvalidStatus`.
pub const TRANSITIONS: &[(InvoiceStatus, Action, InvoiceStatus)] = &[
    (InvoiceStatus::Created, Action::Fund, InvoiceStatus::Funded),
    (
        InvoiceStatus::Funded,
        Action::Approve,
        InvoiceStatus::PendingApproval,
    ),
    (
        InvoiceStatus::PendingApproval,
        Action::CompleteApproval,
        InvoiceStatus::Released,
    ),
    (InvoiceStatus::Funded, Action::Dispute, InvoiceStatus::Disputed),
    (
        InvoiceStatus::PendingApproval,
        Action::Dispute,
        InvoiceStatus::Disputed,
    ),
    (
        InvoiceStatus::Disputed,
        Action::ArbitrateRelease,
        InvoiceStatus::Released,
    ),
    (
        InvoiceStatus::Disputed,
        Action::ArbitrateRefund,
        InvoiceStatus::Refunded,
    ),
    (InvoiceStatus::Created, Action::Cancel, InvoiceStatus::Cancelled),
];

/// Target status of `action` applied in `from`, if legal.
#[must_use]
pub fn next_status(from: InvoiceStatus, action: Action) -> Option<InvoiceStatus> {
    TRANSITIONS
        .iter()
        .find(|(src, act, _)| *src == from && *act == action)
        .map(|(_, _, to)| *to)
}

/// Canonical source status of `action`.
#[must_use]
pub fn expected_source(action: Action) -> InvoiceStatus {
    TRANSITIONS
        .iter()
        .find(|(_, act, _)| *act == action)
        .map_or(InvoiceStatus::Created, |(src, _, _)| *src)
}

/// Resolve `action` in `from` or fail with `InvalidStatus`.
///
/// # Errors
/// Returns `InvalidStatus { expected, actual }` if the pair is not in the table.
pub fn transition(from: InvoiceStatus, action: Action) -> Result<InvoiceStatus> {
    next_status(from, action).ok_or(CovenantError::InvalidStatus {
        expected: expected_source(action),
        actual: from,
    })
}

/// Whether `from` accepts `action` at all.
#[must_use]
pub fn accepts(from: InvoiceStatus, action: Action) -> bool {
    next_status(from, action).is_some()
}
