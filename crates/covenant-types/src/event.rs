//! Escrow event records for the audit trail.
//!
//! Every committed transition produces one or more [`EscrowEvent`]s. The
//! engine wraps each in an [`EventRecord`] whose digest chains over the
//! previous record, so an observer can detect a dropped, reordered or
//! altered record.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::{Amount, EventId, InvoiceId, Principal, Result, constants::EVENT_CHAIN_DOMAIN};

/// What happened.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EscrowEvent {
    InvoiceCreated {
        invoice_id: InvoiceId,
        payer: Principal,
        payee: Principal,
        arbiter: Principal,
        amount: Amount,
        title: String,
    },
    FundsDeposited {
        invoice_id: InvoiceId,
        payer: Principal,
        amount: Amount,
    },
    ApprovalGranted {
        invoice_id: InvoiceId,
        approver: Principal,
        is_payer: bool,
    },
    DisputeRaised {
        invoice_id: InvoiceId,
        raised_by: Principal,
        reason: String,
    },
    ArbitrationComplete {
        invoice_id: InvoiceId,
        arbiter: Principal,
        released: bool,
    },
    /// `amount` is the net paid to the payee.
    FundsReleased {
        invoice_id: InvoiceId,
        payee: Principal,
        amount: Amount,
        platform_fee: Amount,
        arbiter_fee: Amount,
    },
    /// `amount` is the net returned to the payer.
    FundsRefunded {
        invoice_id: InvoiceId,
        payer: Principal,
        amount: Amount,
        platform_fee: Amount,
        arbiter_fee: Amount,
    },
    InvoiceCancelled {
        invoice_id: InvoiceId,
        cancelled_by: Principal,
    },
    TreasuryUpdated {
        old: Principal,
        new: Principal,
    },
    OwnershipTransferred {
        old: Principal,
        new: Principal,
    },
}

impl EscrowEvent {
    /// The invoice this event concerns, if any.
    #[must_use]
    pub fn invoice_id(&self) -> Option<InvoiceId> {
        match self {
            Self::InvoiceCreated { invoice_id, .. }
            | Self::FundsDeposited { invoice_id, .. }
            | Self::ApprovalGranted { invoice_id, .. }
            | Self::DisputeRaised { invoice_id, .. }
            | Self::ArbitrationComplete { invoice_id, .. }
            | Self::FundsReleased { invoice_id, .. }
            | Self::FundsRefunded { invoice_id, .. }
            | Self::InvoiceCancelled { invoice_id, .. } => Some(*invoice_id),
            Self::TreasuryUpdated { .. } | Self::OwnershipTransferred { .. } => None,
        }
    }

    /// Stable wire name, as used in the serialized `type` tag.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::InvoiceCreated { .. } => "invoice_created",
            Self::FundsDeposited { .. } => "funds_deposited",
            Self::ApprovalGranted { .. } => "approval_granted",
            Self::DisputeRaised { .. } => "dispute_raised",
            Self::ArbitrationComplete { .. } => "arbitration_complete",
            Self::FundsReleased { .. } => "funds_released",
            Self::FundsRefunded { .. } => "funds_refunded",
            Self::InvoiceCancelled { .. } => "invoice_cancelled",
            Self::TreasuryUpdated { .. } => "treasury_updated",
            Self::OwnershipTransferred { .. } => "ownership_transferred",
        }
    }
}

/// An event as committed to the append-only log.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventRecord {
    pub id: EventId,
    /// Position in the log, starting at 0.
    pub sequence: u64,
    pub event: EscrowEvent,
    /// SHA-256 over `domain || prev_digest || sequence || json(event)`.
    pub digest: [u8; 32],
    pub recorded_at: DateTime<Utc>,
}

impl EventRecord {
    /// Chain `event` after a record whose digest is `prev_digest`
    /// (all zeroes for the first record).
    ///
    /// # Errors
    /// Returns `Serialization` if the event cannot be encoded.
    pub fn chained(prev_digest: &[u8; 32], sequence: u64, event: EscrowEvent) -> Result<Self> {
        let digest = Self::compute_digest(prev_digest, sequence, &event)?;
        Ok(Self {
            id: EventId::new(),
            sequence,
            event,
            digest,
            recorded_at: Utc::now(),
        })
    }

    /// Recompute the digest this record should carry.
    ///
    /// # Errors
    /// Returns `Serialization` if the event cannot be encoded.
    pub fn compute_digest(
        prev_digest: &[u8; 32],
        sequence: u64,
        event: &EscrowEvent,
    ) -> Result<[u8; 32]> {
        let payload = serde_json::to_vec(event)?;
        let mut hasher = Sha256::new();
        hasher.update(EVENT_CHAIN_DOMAIN);
        hasher.update(prev_digest);
        hasher.update(sequence.to_le_bytes());
        hasher.update(&payload);
        Ok(hasher.finalize().into())
    }

    #[must_use]
    pub fn digest_hex(&self) -> String {
        hex::encode(self.digest)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn deposit(id: u64) -> EscrowEvent {
        EscrowEvent::FundsDeposited {
            invoice_id: InvoiceId(id),
            payer: Principal::from_bytes([1; 20]),
            amount: Amount(5),
        }
    }

    #[test]
    fn event_kind_matches_serde_tag() {
        let event = deposit(1);
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], event.kind());
        assert_eq!(event.invoice_id(), Some(InvoiceId(1)));

        let admin = EscrowEvent::TreasuryUpdated {
            old: Principal::NULL,
            new: Principal::from_bytes([2; 20]),
        };
        assert_eq!(admin.invoice_id(), None);
        assert_eq!(serde_json::to_value(&admin).unwrap()["type"], admin.kind());
    }

    #[test]
    fn digest_is_deterministic_and_chained() {
        let genesis = [0u8; 32];
        let a = EventRecord::compute_digest(&genesis, 0, &deposit(1)).unwrap();
        let b = EventRecord::compute_digest(&genesis, 0, &deposit(1)).unwrap();
        assert_eq!(a, b);

        // Different predecessor, sequence or payload all change the digest.
        assert_ne!(a, EventRecord::compute_digest(&[1u8; 32], 0, &deposit(1)).unwrap());
        assert_ne!(a, EventRecord::compute_digest(&genesis, 1, &deposit(1)).unwrap());
        assert_ne!(a, EventRecord::compute_digest(&genesis, 0, &deposit(2)).unwrap());
    }

    #[test]
    fn record_serde_roundtrip() {
        let record = EventRecord::chained(&[0u8; 32], 0, deposit(3)).unwrap();
        let json = serde_json::to_string(&record).unwrap();
        let back: EventRecord = serde_json::from_str(&json).unwrap();
        assert_eq!(back.event, record.event);
        assert_eq!(back.digest, record.digest);
        assert_eq!(record.digest_hex().len(), 64);
    }
}
