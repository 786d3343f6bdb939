//! Append-only, hash-chained event log.
//!
//! Records are produced in two steps. [`EventLog::prepare`] chains a batch
//! of events onto the current head without touching the log, so encoding
//! failures surface before anything else is committed. [`EventLog::append`]
//! then installs the prepared batch. Both run under the same state lock,
//! which keeps the prepared sequence numbers valid.

use covenant_types::{CovenantError, EscrowEvent, EventRecord, Result};

/// Digest a chain starts from.
pub const GENESIS_DIGEST: [u8; 32] = [0u8; 32];

#[derive(Debug, Default, Clone)]
pub struct EventLog {
    records: Vec<EventRecord>,
}

impl EventLog {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Wrap records exported from another log. Nothing is checked until
    /// [`EventLog::verify_chain`] runs.
    #[must_use]
    pub fn from_records(records: Vec<EventRecord>) -> Self {
        Self { records }
    }

    /// Digest of the newest record, or the genesis digest when empty.
    #[must_use]
    pub fn head_digest(&self) -> [u8; 32] {
        self.records
            .last()
            .map_or(GENESIS_DIGEST, |record| record.digest)
    }

    /// Chain `events` onto the current head.
    ///
    /// # Errors
    /// Returns `Serialization` if an event cannot be encoded.
    pub fn prepare(&self, events: Vec<EscrowEvent>) -> Result<Vec<EventRecord>> {
        let mut prev = self.head_digest();
        let mut sequence = self.len();
        let mut prepared = Vec::with_capacity(events.len());
        for event in events {
            let record = EventRecord::chained(&prev, sequence, event)?;
            prev = record.digest;
            sequence += 1;
            prepared.push(record);
        }
        Ok(prepared)
    }

    /// Install a batch returned by [`EventLog::prepare`] on this same log.
    pub fn append(&mut self, records: Vec<EventRecord>) {
        for record in records {
            tracing::debug!(
                sequence = record.sequence,
                kind = record.event.kind(),
                digest = %record.digest_hex(),
                "Event recorded"
            );
            self.records.push(record);
        }
    }

    #[must_use]
    pub fn records(&self) -> &[EventRecord] {
        &self.records
    }

    /// Records with `sequence >= from`.
    #[must_use]
    pub fn since(&self, from: u64) -> &[EventRecord] {
        let start = usize::try_from(from).map_or(self.records.len(), |n| n.min(self.records.len()));
        &self.records[start..]
    }

    #[must_use]
    pub fn len(&self) -> u64 {
        self.records.len() as u64
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Recompute every digest from the genesis digest forward.
    ///
    /// # Errors
    /// - `EventChainBroken` at the first record whose sequence or digest
    ///   does not follow from its predecessor
    /// - `Serialization` if a stored event cannot be re-encoded
    pub fn verify_chain(&self) -> Result<()> {
        let mut prev = GENESIS_DIGEST;
        for (expected, record) in (0u64..).zip(&self.records) {
            if record.sequence != expected {
                return Err(CovenantError::EventChainBroken { sequence: expected });
            }
            let digest = EventRecord::compute_digest(&prev, record.sequence, &record.event)?;
            if digest != record.digest {
                return Err(CovenantError::EventChainBroken {
                    sequence: record.sequence,
                });
            }
            prev = record.digest;
        }
        Ok(())
    }
}
