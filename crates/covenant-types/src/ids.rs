//! Identifiers used throughout Covenant.
//!
//! Invoices use a dense monotonic counter so that the id doubles as the
//! registry position; principals are opaque 20-byte account keys; event
//! records use UUIDv7 for time-ordered sorting.

use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{CovenantError, constants::PRINCIPAL_LEN};

// ---------------------------------------------------------------------------
// InvoiceId
// ---------------------------------------------------------------------------

/// Monotonically increasing invoice identifier.
///
/// Ids start at 1. `InvoiceId(0)` is the "not found" sentinel and is never
/// assigned to a real invoice.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Ord, PartialOrd, Serialize, Deserialize,
)]
pub struct InvoiceId(pub u64);

impl InvoiceId {
    /// The sentinel id carried by the empty invoice record.
    pub const NONE: Self = Self(0);

    #[must_use]
    pub fn next(self) -> Self {
        Self(self.0 + 1)
    }

    /// Whether this id is the "not found" sentinel.
    #[must_use]
    pub fn is_none(self) -> bool {
        self.0 == 0
    }
}

impl fmt::Display for InvoiceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invoice:{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// Principal
// ---------------------------------------------------------------------------

/// Opaque account key for a payer, payee, arbiter, owner, treasury or the
/// custody account itself.
///
/// Serialized as a `0x`-prefixed hex string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Principal(pub [u8; PRINCIPAL_LEN]);

impl Principal {
    /// The null principal. Never a valid party, treasury or owner.
    pub const NULL: Self = Self([0u8; PRINCIPAL_LEN]);

    #[must_use]
    pub const fn from_bytes(bytes: [u8; PRINCIPAL_LEN]) -> Self {
        Self(bytes)
    }

    #[must_use]
    pub fn as_bytes(&self) -> &[u8; PRINCIPAL_LEN] {
        &self.0
    }

    #[must_use]
    pub fn is_null(&self) -> bool {
        *self == Self::NULL
    }

    /// First four bytes as hex, for compact log fields.
    #[must_use]
    pub fn short(&self) -> String {
        hex::encode(&self.0[..4])
    }
}

impl Default for Principal {
    fn default() -> Self {
        Self::NULL
    }
}

impl fmt::Display for Principal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(self.0))
    }
}

impl FromStr for Principal {
    type Err = CovenantError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let digits = s.strip_prefix("0x").unwrap_or(s);
        let bytes = hex::decode(digits)
            .map_err(|e| CovenantError::Serialization(format!("principal {s:?}: {e}")))?;
        let bytes: [u8; PRINCIPAL_LEN] = bytes.try_into().map_err(|b: Vec<u8>| {
            CovenantError::Serialization(format!(
                "principal {s:?}: expected {PRINCIPAL_LEN} bytes, got {}",
                b.len()
            ))
        })?;
        Ok(Self(bytes))
    }
}

impl TryFrom<String> for Principal {
    type Error = CovenantError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<Principal> for String {
    fn from(p: Principal) -> Self {
        p.to_string()
    }
}

/// Random principals for tests. **Never use in production.**
#[cfg(any(test, feature = "test-helpers"))]
impl Principal {
    #[must_use]
    pub fn random() -> Self {
        let mut bytes: [u8; PRINCIPAL_LEN] = rand::random();
        // Keep clear of the null principal.
        bytes[0] |= 1;
        Self(bytes)
    }
}

// ---------------------------------------------------------------------------
// EventId
// ---------------------------------------------------------------------------

/// Globally unique event record identifier. Uses UUIDv7 for time-ordered sorting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
pub struct EventId(pub Uuid);

impl EventId {
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }
}

impl Default for EventId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for EventId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "evt:{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
