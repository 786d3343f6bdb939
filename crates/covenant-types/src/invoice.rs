//! # Invoice: the escrow record
//!
//! One invoice is one escrow arrangement between a payer and a payee with a
//! designated arbiter. The record is created and funded in a single atomic
//! step and afterwards only moves forward through the lifecycle graph in
//! [`crate::lifecycle`]. Records are never deleted.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{Amount, InvoiceId, Principal};

/// The lifecycle status of an invoice.
///
/// Transitions are **monotonic** (never go backwards). `Released`,
/// `Refunded` and `Cancelled` are terminal.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum InvoiceStatus {
    /// Record exists, funds not yet in custody.
    #[default]
    Created,
    /// Amount held in custody, no approvals yet.
    Funded,
    /// One of payer / payee has approved.
    PendingApproval,
    /// A party raised a dispute; only the arbiter can resolve it.
    Disputed,
    /// Funds paid out to the payee.
    Released,
    /// Funds returned to the payer.
    Refunded,
    /// Cancelled before funding.
    Cancelled,
}

impl InvoiceStatus {
    /// No further transition is possible.
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Released | Self::Refunded | Self::Cancelled)
    }

    /// The invoice amount is currently held in custody.
    #[must_use]
    pub fn holds_funds(self) -> bool {
        matches!(self, Self::Funded | Self::PendingApproval | Self::Disputed)
    }
}

impl std::fmt::Display for InvoiceStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Created => write!(f, "CREATED"),
            Self::Funded => write!(f, "FUNDED"),
            Self::PendingApproval => write!(f, "PENDING_APPROVAL"),
            Self::Disputed => write!(f, "DISPUTED"),
            Self::Released => write!(f, "RELEASED"),
            Self::Refunded => write!(f, "REFUNDED"),
            Self::Cancelled => write!(f, "CANCELLED"),
        }
    }
}

/// The role a principal plays on a specific invoice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Role {
    Payer,
    Payee,
    Arbiter,
}

/// An escrow invoice.
///
/// `Invoice::default()` is the empty record returned for unknown ids; its
/// `id` is [`InvoiceId::NONE`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Invoice {
    pub id: InvoiceId,
    pub payer: Principal,
    pub payee: Principal,
    pub arbiter: Principal,
    /// Smallest units; fixed at creation.
    pub amount: Amount,
    pub status: InvoiceStatus,
    pub payer_approved: bool,
    pub payee_approved: bool,
    pub title: String,
    /// Set once, on the dispute transition.
    pub dispute_reason: Option<String>,
    pub created_at: Option<DateTime<Utc>>,
    pub funded_at: Option<DateTime<Utc>>,
    pub resolved_at: Option<DateTime<Utc>>,
}

impl Invoice {
    /// A fresh record in `Created` status.
    #[must_use]
    pub fn new(
        id: InvoiceId,
        payer: Principal,
        payee: Principal,
        arbiter: Principal,
        amount: Amount,
        title: String,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            payer,
            payee,
            arbiter,
            amount,
            status: InvoiceStatus::Created,
            payer_approved: false,
            payee_approved: false,
            title,
            dispute_reason: None,
            created_at: Some(created_at),
            funded_at: None,
            resolved_at: None,
        }
    }

    /// Whether this is the empty "not found" record.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.id.is_none()
    }

    /// Payer or payee.
    #[must_use]
    pub fn is_party(&self, principal: &Principal) -> bool {
        *principal == self.payer || *principal == self.payee
    }

    #[must_use]
    pub fn is_arbiter(&self, principal: &Principal) -> bool {
        *principal == self.arbiter
    }

    /// All roles `principal` holds on this invoice. An arbiter may also be
    /// a party; payer and payee never coincide.
    #[must_use]
    pub fn roles_of(&self, principal: &Principal) -> Vec<Role> {
        let mut roles = Vec::with_capacity(2);
        if *principal == self.payer {
            roles.push(Role::Payer);
        }
        if *principal == self.payee {
            roles.push(Role::Payee);
        }
        if *principal == self.arbiter {
            roles.push(Role::Arbiter);
        }
        roles
    }

    /// Whether `principal` has already approved. `None` for non-parties.
    #[must_use]
    pub fn has_approved(&self, principal: &Principal) -> Option<bool> {
        if *principal == self.payer {
            Some(self.payer_approved)
        } else if *principal == self.payee {
            Some(self.payee_approved)
        } else {
            None
        }
    }

    #[must_use]
    pub fn both_approved(&self) -> bool {
        self.payer_approved && self.payee_approved
    }
}

/// Dummy invoice for testing. **Never use in production.**
#[cfg(any(test, feature = "test-helpers"))]
impl Invoice {
    /// A funded invoice between three random principals.
    pub fn dummy_funded(id: InvoiceId, amount: Amount) -> Self {
        let now = Utc::now();
        let mut invoice = Self::new(
            id,
            Principal::random(),
            Principal::random(),
            Principal::random(),
            amount,
            "dummy".to_string(),
            now,
        );
        invoice.status = InvoiceStatus::Funded;
        invoice.funded_at = Some(now);
        invoice
    }
}
