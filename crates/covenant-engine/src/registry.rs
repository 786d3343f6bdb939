//! Append-only invoice registry.
//!
//! Invoices are stored in creation order and never removed, so the registry
//! doubles as the audit trail of every invoice the service has seen. Ids are
//! dense: invoice `n` lives at index `n - 1`, and id 0 never exists.

use covenant_types::{Amount, CovenantError, Invoice, InvoiceId, Principal, Result};

/// Creation-ordered store of every invoice.
#[derive(Debug, Default)]
pub struct InvoiceRegistry {
    invoices: Vec<Invoice>,
}

impl InvoiceRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The id the next inserted invoice must carry.
    #[must_use]
    pub fn next_id(&self) -> InvoiceId {
        InvoiceId(self.count()).next()
    }

    /// Number of invoices ever created.
    #[must_use]
    pub fn count(&self) -> u64 {
        self.invoices.len() as u64
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.invoices.is_empty()
    }

    /// Append a new invoice.
    ///
    /// # Errors
    /// Returns `Internal` if `invoice.id` is not [`InvoiceRegistry::next_id`].
    pub fn insert(&mut self, invoice: Invoice) -> Result<InvoiceId> {
        let expected = self.next_id();
        if invoice.id != expected {
            return Err(CovenantError::Internal(format!(
                "registry expected {expected}, got {}",
                invoice.id
            )));
        }
        self.invoices.push(invoice);
        Ok(expected)
    }

    #[must_use]
    pub fn get(&self, id: InvoiceId) -> Option<&Invoice> {
        let index = usize::try_from(id.0).ok()?.checked_sub(1)?;
        self.invoices.get(index)
    }

    /// Like [`InvoiceRegistry::get`] but failing with `InvoiceNotFound`.
    ///
    /// # Errors
    /// Returns `InvoiceNotFound` for unknown ids.
    pub fn lookup(&self, id: InvoiceId) -> Result<&Invoice> {
        self.get(id).ok_or(CovenantError::InvoiceNotFound(id))
    }

    /// Overwrite an existing record.
    ///
    /// # Errors
    /// - `InvoiceNotFound` if no record has this id
    /// - `Internal` if the stored record is already terminal
    pub fn update(&mut self, invoice: Invoice) -> Result<()> {
        let id = invoice.id;
        let slot = usize::try_from(id.0)
            .ok()
            .and_then(|n| n.checked_sub(1))
            .and_then(|index| self.invoices.get_mut(index))
            .ok_or(CovenantError::InvoiceNotFound(id))?;
        if slot.status.is_terminal() {
            return Err(CovenantError::Internal(format!(
                "{id} is {} and can no longer change",
                slot.status
            )));
        }
        *slot = invoice;
        Ok(())
    }

    pub fn iter(&self) -> impl Iterator<Item = &Invoice> {
        self.invoices.iter()
    }

    /// Sum of amounts over invoices whose funds are still in custody.
    ///
    /// # Errors
    /// Returns `ArithmeticOverflow` if the sum exceeds `u128`.
    pub fn open_total(&self) -> Result<Amount> {
        Amount::checked_sum(
            self.invoices
                .iter()
                .filter(|inv| inv.status.holds_funds())
                .map(|inv| inv.amount),
        )
        .ok_or(CovenantError::ArithmeticOverflow)
    }

    /// Every invoice in which `principal` holds any role.
    pub fn by_principal(&self, principal: Principal) -> impl Iterator<Item = &Invoice> {
        self.invoices
            .iter()
            .filter(move |inv| !inv.roles_of(&principal).is_empty())
    }
}
