//! Error types for the Covenant escrow engine.
//!
//! All errors use the `CV_ERR_` prefix convention for easy grepping in logs.
//! Error codes are grouped by subsystem:
//! - 1xx: Input validation errors
//! - 2xx: Lookup / authorization errors
//! - 3xx: Lifecycle (state machine) errors
//! - 4xx: Custody / transfer errors
//! - 5xx: Concurrency errors
//! - 6xx: Audit trail errors
//! - 9xx: General / internal errors

use thiserror::Error;

use crate::{Amount, InvoiceId, InvoiceStatus, Principal};

/// Central error enum for all Covenant operations.
///
/// Every variant is fatal to the operation that produced it: the operation
/// is aborted as a whole and leaves no partial mutation behind.
#[derive(Debug, Error)]
pub enum CovenantError {
    // =================================================================
    // Validation Errors (1xx)
    // =================================================================
    /// A principal argument was null, or payer and payee coincide.
    #[error("CV_ERR_100: Invalid address for {field}: {principal}")]
    InvalidAddress {
        field: &'static str,
        principal: Principal,
    },

    /// The invoice amount was zero.
    #[error("CV_ERR_101: Invalid amount: {0}")]
    InvalidAmount(Amount),

    /// A text field exceeded its maximum length.
    #[error("CV_ERR_102: Invalid {field}: {len} bytes exceeds maximum of {max}")]
    InvalidText {
        field: &'static str,
        len: usize,
        max: usize,
    },

    // =================================================================
    // Lookup / Authorization Errors (2xx)
    // =================================================================
    /// No invoice with this id exists.
    #[error("CV_ERR_200: Invoice not found: {0}")]
    InvoiceNotFound(InvoiceId),

    /// The caller holds no role permitting this operation.
    #[error("CV_ERR_201: Unauthorized access by {caller}")]
    UnauthorizedAccess { caller: Principal },

    // =================================================================
    // Lifecycle Errors (3xx)
    // =================================================================
    /// The invoice is not in the status this operation requires.
    #[error("CV_ERR_300: Invalid status: expected {expected}, got {actual}")]
    InvalidStatus {
        expected: InvoiceStatus,
        actual: InvoiceStatus,
    },

    /// The caller has already approved this invoice.
    #[error("CV_ERR_301: Already approved by {party}")]
    AlreadyApproved { party: Principal },

    /// Funded invoices can only leave custody through release or refund.
    #[error("CV_ERR_302: Cannot cancel funded invoice {0}")]
    CannotCancelFundedInvoice(InvoiceId),

    // =================================================================
    // Custody Errors (4xx)
    // =================================================================
    /// The asset ledger reported failure for a transfer leg.
    #[error("CV_ERR_400: Transfer failed: {amount} from {from} to {to}")]
    TransferFailed {
        from: Principal,
        to: Principal,
        amount: Amount,
    },

    /// Custody pool accounting diverged from the registry or the ledger.
    #[error("CV_ERR_401: Custody invariant violation: {reason}")]
    CustodyInvariantViolation { reason: String },

    /// An amount computation overflowed `u128`.
    #[error("CV_ERR_402: Arithmetic overflow")]
    ArithmeticOverflow,

    // =================================================================
    // Concurrency Errors (5xx)
    // =================================================================
    /// A guarded operation was entered while another one is in flight
    /// on the same thread.
    #[error("CV_ERR_500: Reentrant call rejected")]
    ReentrantCall,

    // =================================================================
    // Audit Errors (6xx)
    // =================================================================
    /// An event record's digest does not chain from its predecessor.
    #[error("CV_ERR_600: Event chain broken at sequence {sequence}")]
    EventChainBroken { sequence: u64 },

    // =================================================================
    // General / Internal (9xx)
    // =================================================================
    /// Configuration error (invalid config file, bad fee schedule, etc.).
    #[error("CV_ERR_900: Configuration error: {0}")]
    Configuration(String),

    /// Serialization / deserialization error.
    #[error("CV_ERR_901: Serialization error: {0}")]
    Serialization(String),

    /// Unrecoverable internal error.
    #[error("CV_ERR_902: Internal error: {0}")]
    Internal(String),
}

/// Crate-wide `Result` alias.
pub type Result<T> = std::result::Result<T, CovenantError>;

impl From<serde_json::Error> for CovenantError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display_contains_prefix() {
        let err = CovenantError::InvoiceNotFound(InvoiceId(7));
        let msg = format!("{err}");
        assert!(msg.starts_with("CV_ERR_200"), "Got: {msg}");
        assert!(msg.contains("invoice:7"));
    }

    #[test]
    fn invalid_status_display() {
        let err = CovenantError::InvalidStatus {
            expected: InvoiceStatus::Disputed,
            actual: InvoiceStatus::Funded,
        };
        let msg = format!("{err}");
        assert!(msg.contains("CV_ERR_300"));
        assert!(msg.contains("DISPUTED"));
        assert!(msg.contains("FUNDED"));
    }

    #[test]
    fn transfer_failed_display() {
        let err = CovenantError::TransferFailed {
            from: Principal::NULL,
            to: Principal::from_bytes([1; 20]),
            amount: Amount::from_units(1_500_000),
        };
        let msg = format!("{err}");
        assert!(msg.contains("CV_ERR_400"));
        assert!(msg.contains("1.500000"));
    }

    #[test]
    fn all_errors_have_cv_err_prefix() {
        let errors: Vec<Box<dyn std::error::Error>> = vec![
            Box::new(CovenantError::InvalidAmount(Amount::ZERO)),
            Box::new(CovenantError::ReentrantCall),
            Box::new(CovenantError::ArithmeticOverflow),
            Box::new(CovenantError::CannotCancelFundedInvoice(InvoiceId(1))),
            Box::new(CovenantError::Internal("test".into())),
        ];
        for err in errors {
            let msg = format!("{err}");
            assert!(
                msg.starts_with("CV_ERR_"),
                "Error missing CV_ERR_ prefix: {msg}"
            );
        }
    }
}
