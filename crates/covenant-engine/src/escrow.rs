//! The escrow service: public lifecycle API.
//!
//! Every mutating call runs in three phases:
//!
//! 1. **Stage** (state lock): look up the invoice, check the caller and the
//!    transition, and build the updated record, its events, and the custody
//!    movement it needs.
//! 2. **Move** (ledger lock): run the transfers through a
//!    [`TransferJournal`].
//! 3. **Commit** (state lock): install the record, the pool change and the
//!    events together. If this or the move phase fails, the journal is
//!    rolled back and the caller sees the error with nothing changed.
//!
//! The two locks are never held at the same time by a mutating call, so a
//! ledger that calls back into read-only methods never deadlocks. Mutating
//! calls are serialized by the [`ReentrancyGuard`].

use chrono::{DateTime, Utc};
use covenant_custody::{AssetLedger, CustodyPool, PayoutKind, PayoutPlan, TransferJournal, deposit};
use covenant_types::{
    Action, Amount, CovenantError, EscrowConfig, EscrowEvent, EventRecord, FeeBreakdown,
    FeeSchedule, Invoice, InvoiceId, InvoiceStatus, Principal, Result,
    constants::{ENGINE_NAME, MAX_DISPUTE_REASON_LEN, MAX_TITLE_LEN, VERSION},
    lifecycle::{accepts, transition},
};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use crate::{
    access::OwnerGate, event_log::EventLog, guard::ReentrancyGuard, registry::InvoiceRegistry,
};

/// Snapshot returned by [`EscrowService::verify_custody`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustodyReport {
    pub held: Amount,
    pub open_invoice_total: Amount,
    pub ledger_balance: Amount,
    pub total_deposited: Amount,
    pub total_paid_out: Amount,
}

/// Mutable service state, guarded by one lock.
#[derive(Debug)]
struct EscrowState {
    registry: InvoiceRegistry,
    pool: CustodyPool,
    access: OwnerGate,
    treasury: Principal,
    events: EventLog,
    /// Latest timestamp handed out; keeps invoice timestamps monotonic.
    clock: Option<DateTime<Utc>>,
}

impl EscrowState {
    fn tick(&mut self) -> DateTime<Utc> {
        let now = Utc::now();
        let now = match self.clock {
            Some(last) if last > now => last,
            _ => now,
        };
        self.clock = Some(now);
        now
    }
}

/// Value movement a staged operation needs.
enum CustodyMove {
    None,
    Deposit { payer: Principal, amount: Amount },
    Payout(PayoutPlan),
}

/// A fully checked operation waiting for its transfers to run.
struct Staged {
    invoice: Invoice,
    /// Insert rather than update.
    created: bool,
    custody: CustodyMove,
    events: Vec<EscrowEvent>,
}

/// Custodial two-party escrow with an arbiter.
///
/// `L` is the asset ledger holding the escrowed value. The service owns it;
/// use [`EscrowService::with_ledger`] and [`EscrowService::with_ledger_mut`]
/// to reach it from outside.
pub struct EscrowService<L: AssetLedger> {
    custody: Principal,
    fees: FeeSchedule,
    guard: ReentrancyGuard,
    state: Mutex<EscrowState>,
    ledger: Mutex<L>,
}

impl<L: AssetLedger> EscrowService<L> {
    /// Build a service from a validated config.
    ///
    /// # Errors
    /// Returns `Configuration` if `config` fails validation.
    pub fn new(config: EscrowConfig, ledger: L) -> Result<Self> {
        config.validate()?;
        tracing::info!(
            engine = ENGINE_NAME,
            version = VERSION,
            owner = %config.owner,
            treasury = %config.treasury,
            custody = %config.custody,
            platform_fee_bps = config.fees.platform_fee_bps(),
            arbiter_fee_bps = config.fees.arbiter_fee_bps(),
            "Escrow service started"
        );
        Ok(Self {
            custody: config.custody,
            fees: config.fees,
            guard: ReentrancyGuard::new(),
            state: Mutex::new(EscrowState {
                registry: InvoiceRegistry::new(),
                pool: CustodyPool::new(),
                access: OwnerGate::new(config.owner),
                treasury: config.treasury,
                events: EventLog::new(),
                clock: None,
            }),
            ledger: Mutex::new(ledger),
        })
    }

    // ── Lifecycle operations ────────────────────────────────────────────

    /// Create an invoice and pull `amount` from the payer into custody.
    ///
    /// The payer must have granted the custody account an allowance of at
    /// least `amount` on the ledger beforehand.
    ///
    /// # Errors
    /// - `InvalidAddress` if a party is null or the custody account, or
    ///   payer equals payee
    /// - `InvalidAmount` if `amount` is zero
    /// - `InvalidText` if the title is too long
    /// - `TransferFailed` if the ledger refuses the pull; no invoice is kept
    pub fn create_and_fund(
        &self,
        payer: Principal,
        payee: Principal,
        arbiter: Principal,
        amount: Amount,
        title: &str,
    ) -> Result<InvoiceId> {
        self.guarded("create_and_fund", || {
            for (field, principal) in [("payer", payer), ("payee", payee), ("arbiter", arbiter)] {
                if principal.is_null() || principal == self.custody {
                    return Err(CovenantError::InvalidAddress { field, principal });
                }
            }
            if payer == payee {
                return Err(CovenantError::InvalidAddress {
                    field: "payee",
                    principal: payee,
                });
            }
            if amount.is_zero() {
                return Err(CovenantError::InvalidAmount(amount));
            }
            check_text("title", title, MAX_TITLE_LEN)?;

            let staged = {
                let mut state = self.state.lock();
                let id = state.registry.next_id();
                let now = state.tick();
                let mut invoice =
                    Invoice::new(id, payer, payee, arbiter, amount, title.to_owned(), now);
                invoice.status = transition(invoice.status, Action::Fund)?;
                invoice.funded_at = Some(now);
                Staged {
                    events: vec![
                        EscrowEvent::InvoiceCreated {
                            invoice_id: id,
                            payer,
                            payee,
                            arbiter,
                            amount,
                            title: invoice.title.clone(),
                        },
                        EscrowEvent::FundsDeposited {
                            invoice_id: id,
                            payer,
                            amount,
                        },
                    ],
                    invoice,
                    created: true,
                    custody: CustodyMove::Deposit { payer, amount },
                }
            };

            let invoice = self.execute(staged)?;
            tracing::info!(
                invoice_id = %invoice.id,
                status = %invoice.status,
                amount = %invoice.amount,
                payer = %invoice.payer.short(),
                payee = %invoice.payee.short(),
                "Invoice created and funded"
            );
            Ok(invoice.id)
        })
    }

    /// Record the caller's approval. The second approval releases the
    /// funds to the payee with no arbiter fee.
    ///
    /// # Errors
    /// - `InvoiceNotFound`, then `UnauthorizedAccess` for non-parties
    /// - `InvalidStatus` unless FUNDED or PENDING_APPROVAL
    /// - `AlreadyApproved` if the caller approved before
    /// - `TransferFailed` / `CustodyInvariantViolation` from the payout
    pub fn approve(&self, caller: Principal, id: InvoiceId) -> Result<()> {
        self.guarded("approve", || {
            let staged = {
                let mut state = self.state.lock();
                let mut invoice = state.registry.lookup(id)?.clone();
                let approved = invoice
                    .has_approved(&caller)
                    .ok_or(CovenantError::UnauthorizedAccess { caller })?;
                let action = if accepts(invoice.status, Action::CompleteApproval) {
                    Action::CompleteApproval
                } else {
                    Action::Approve
                };
                let next = transition(invoice.status, action)?;
                if approved {
                    return Err(CovenantError::AlreadyApproved { party: caller });
                }

                let is_payer = caller == invoice.payer;
                if is_payer {
                    invoice.payer_approved = true;
                } else {
                    invoice.payee_approved = true;
                }
                let mut events = vec![EscrowEvent::ApprovalGranted {
                    invoice_id: id,
                    approver: caller,
                    is_payer,
                }];

                let custody = if next == InvoiceStatus::Released {
                    let plan = PayoutPlan::for_invoice(
                        &invoice,
                        PayoutKind::Release,
                        state.treasury,
                        &self.fees,
                        false,
                    );
                    events.push(payout_event(&invoice, &plan));
                    invoice.resolved_at = Some(state.tick());
                    CustodyMove::Payout(plan)
                } else {
                    CustodyMove::None
                };
                invoice.status = next;

                Staged {
                    invoice,
                    created: false,
                    custody,
                    events,
                }
            };

            let invoice = self.execute(staged)?;
            tracing::info!(
                invoice_id = %invoice.id,
                status = %invoice.status,
                approver = %caller.short(),
                "Approval recorded"
            );
            Ok(())
        })
    }

    /// Freeze the invoice until the arbiter rules.
    ///
    /// # Errors
    /// - `InvoiceNotFound`, then `UnauthorizedAccess` for non-parties
    /// - `InvalidStatus` unless FUNDED or PENDING_APPROVAL
    /// - `InvalidText` if the reason is too long
    pub fn dispute(&self, caller: Principal, id: InvoiceId, reason: &str) -> Result<()> {
        self.guarded("dispute", || {
            let staged = {
                let state = self.state.lock();
                let mut invoice = state.registry.lookup(id)?.clone();
                if !invoice.is_party(&caller) {
                    return Err(CovenantError::UnauthorizedAccess { caller });
                }
                invoice.status = transition(invoice.status, Action::Dispute)?;
                check_text("dispute reason", reason, MAX_DISPUTE_REASON_LEN)?;
                invoice.dispute_reason = Some(reason.to_owned());

                Staged {
                    events: vec![EscrowEvent::DisputeRaised {
                        invoice_id: id,
                        raised_by: caller,
                        reason: reason.to_owned(),
                    }],
                    invoice,
                    created: false,
                    custody: CustodyMove::None,
                }
            };

            let invoice = self.execute(staged)?;
            tracing::info!(
                invoice_id = %invoice.id,
                status = %invoice.status,
                raised_by = %caller.short(),
                "Dispute raised"
            );
            Ok(())
        })
    }

    /// Arbiter rules for the payee: release net of platform and arbiter fees.
    ///
    /// # Errors
    /// - `InvoiceNotFound`, then `UnauthorizedAccess` unless the arbiter
    /// - `InvalidStatus` unless DISPUTED
    /// - `TransferFailed` / `CustodyInvariantViolation` from the payout
    pub fn arbitrate_release(&self, caller: Principal, id: InvoiceId) -> Result<()> {
        self.guarded("arbitrate_release", || {
            self.arbitrate(caller, id, PayoutKind::Release)
        })
    }

    /// Arbiter rules for the payer: refund net of platform and arbiter fees.
    ///
    /// # Errors
    /// Same as [`EscrowService::arbitrate_release`].
    pub fn arbitrate_refund(&self, caller: Principal, id: InvoiceId) -> Result<()> {
        self.guarded("arbitrate_refund", || {
            self.arbitrate(caller, id, PayoutKind::Refund)
        })
    }

    fn arbitrate(&self, caller: Principal, id: InvoiceId, kind: PayoutKind) -> Result<()> {
        let staged = {
            let mut state = self.state.lock();
            let mut invoice = state.registry.lookup(id)?.clone();
            if !invoice.is_arbiter(&caller) {
                return Err(CovenantError::UnauthorizedAccess { caller });
            }
            let action = match kind {
                PayoutKind::Release => Action::ArbitrateRelease,
                PayoutKind::Refund => Action::ArbitrateRefund,
            };
            let next = transition(invoice.status, action)?;

            let plan = PayoutPlan::for_invoice(&invoice, kind, state.treasury, &self.fees, true);
            let events = vec![
                EscrowEvent::ArbitrationComplete {
                    invoice_id: id,
                    arbiter: caller,
                    released: kind == PayoutKind::Release,
                },
                payout_event(&invoice, &plan),
            ];
            invoice.status = next;
            invoice.resolved_at = Some(state.tick());

            Staged {
                invoice,
                created: false,
                custody: CustodyMove::Payout(plan),
                events,
            }
        };

        let invoice = self.execute(staged)?;
        tracing::info!(
            invoice_id = %invoice.id,
            status = %invoice.status,
            arbiter = %caller.short(),
            amount = %invoice.amount,
            "Arbitration complete"
        );
        Ok(())
    }

    /// Abandon an invoice that was never funded.
    ///
    /// # Errors
    /// - `InvoiceNotFound`, then `UnauthorizedAccess` for non-parties
    /// - `CannotCancelFundedInvoice` while funds are in custody
    /// - `InvalidStatus` for any other non-CREATED status
    pub fn cancel(&self, caller: Principal, id: InvoiceId) -> Result<()> {
        self.guarded("cancel", || {
            let staged = {
                let mut state = self.state.lock();
                let mut invoice = state.registry.lookup(id)?.clone();
                if !invoice.is_party(&caller) {
                    return Err(CovenantError::UnauthorizedAccess { caller });
                }
                if invoice.status.holds_funds() {
                    return Err(CovenantError::CannotCancelFundedInvoice(id));
                }
                invoice.status = transition(invoice.status, Action::Cancel)?;
                invoice.resolved_at = Some(state.tick());

                Staged {
                    invoice,
                    created: false,
                    custody: CustodyMove::None,
                    events: vec![EscrowEvent::InvoiceCancelled {
                        invoice_id: id,
                        cancelled_by: caller,
                    }],
                }
            };

            let invoice = self.execute(staged)?;
            tracing::info!(
                invoice_id = %invoice.id,
                status = %invoice.status,
                cancelled_by = %caller.short(),
                "Invoice cancelled"
            );
            Ok(())
        })
    }

    // ── Administration ──────────────────────────────────────────────────

    /// Redirect future platform fees. Payouts already committed are not
    /// affected.
    ///
    /// # Errors
    /// - `UnauthorizedAccess` unless the caller is the owner
    /// - `InvalidAddress` if `new_treasury` is null or the custody account
    pub fn update_treasury(&self, caller: Principal, new_treasury: Principal) -> Result<()> {
        self.guarded("update_treasury", || {
            let mut state = self.state.lock();
            state.access.authorize(caller)?;
            if new_treasury.is_null() || new_treasury == self.custody {
                return Err(CovenantError::InvalidAddress {
                    field: "treasury",
                    principal: new_treasury,
                });
            }
            let old = state.treasury;
            let records = state.events.prepare(vec![EscrowEvent::TreasuryUpdated {
                old,
                new: new_treasury,
            }])?;
            state.treasury = new_treasury;
            state.events.append(records);
            tracing::info!(old = %old, new = %new_treasury, "Treasury updated");
            Ok(())
        })
    }

    /// Hand the owner role to `new_owner`.
    ///
    /// # Errors
    /// - `UnauthorizedAccess` unless the caller is the owner
    /// - `InvalidAddress` if `new_owner` is null
    pub fn transfer_ownership(&self, caller: Principal, new_owner: Principal) -> Result<()> {
        self.guarded("transfer_ownership", || {
            let mut state = self.state.lock();
            state.access.check_handover(caller, new_owner)?;
            let records = state.events.prepare(vec![EscrowEvent::OwnershipTransferred {
                old: state.access.owner(),
                new: new_owner,
            }])?;
            let old = state.access.hand_over(new_owner);
            state.events.append(records);
            tracing::info!(old = %old, new = %new_owner, "Ownership transferred");
            Ok(())
        })
    }

    // ── Read-only surface ───────────────────────────────────────────────

    /// The invoice with this id, or the empty record (id 0) if none.
    pub fn get_invoice(&self, id: InvoiceId) -> Invoice {
        self.find_invoice(id).unwrap_or_default()
    }

    pub fn find_invoice(&self, id: InvoiceId) -> Option<Invoice> {
        self.state.lock().registry.get(id).cloned()
    }

    /// Number of invoices ever created. Equals the newest id.
    pub fn invoice_count(&self) -> u64 {
        self.state.lock().registry.count()
    }

    /// Fee split under this service's schedule.
    pub fn calculate_fees(&self, amount: Amount, is_disputed: bool) -> FeeBreakdown {
        self.fees.split(amount, is_disputed)
    }

    /// Every invoice in which `principal` is payer, payee or arbiter.
    pub fn invoices_by(&self, principal: Principal) -> Vec<Invoice> {
        self.state
            .lock()
            .registry
            .by_principal(principal)
            .cloned()
            .collect()
    }

    /// Value currently owed to open invoices.
    pub fn custody_held(&self) -> Amount {
        self.state.lock().pool.held()
    }

    /// Check the custody pool against the registry and the ledger.
    ///
    /// Waits for any in-flight operation so the snapshot is consistent.
    ///
    /// # Errors
    /// - `CustodyInvariantViolation` on any mismatch
    /// - `ReentrantCall` when called from inside a ledger callback
    pub fn verify_custody(&self) -> Result<CustodyReport> {
        let _token = self.guard.enter()?;
        let (pool, open_invoice_total) = {
            let state = self.state.lock();
            (state.pool.clone(), state.registry.open_total()?)
        };
        let ledger_balance = self.ledger.lock().balance_of(self.custody);
        pool.verify(open_invoice_total, ledger_balance)?;
        Ok(CustodyReport {
            held: pool.held(),
            open_invoice_total,
            ledger_balance,
            total_deposited: pool.total_deposited(),
            total_paid_out: pool.total_paid_out(),
        })
    }

    /// All committed events, oldest first.
    pub fn events(&self) -> Vec<EventRecord> {
        self.state.lock().events.records().to_vec()
    }

    /// Committed events with `sequence >= from`.
    pub fn events_since(&self, from: u64) -> Vec<EventRecord> {
        self.state.lock().events.since(from).to_vec()
    }

    /// # Errors
    /// Returns `EventChainBroken` if the log's digests do not chain.
    pub fn verify_event_chain(&self) -> Result<()> {
        self.state.lock().events.verify_chain()
    }

    pub fn owner(&self) -> Principal {
        self.state.lock().access.owner()
    }

    pub fn treasury(&self) -> Principal {
        self.state.lock().treasury
    }

    pub fn fee_schedule(&self) -> FeeSchedule {
        self.fees
    }

    /// The ledger account holding escrowed value.
    pub fn custody(&self) -> Principal {
        self.custody
    }

    /// Read the ledger. Waits for any in-flight operation.
    ///
    /// # Errors
    /// Returns `ReentrantCall` when called from inside a ledger callback.
    pub fn with_ledger<R>(&self, f: impl FnOnce(&L) -> R) -> Result<R> {
        let _token = self.guard.enter()?;
        Ok(f(&self.ledger.lock()))
    }

    /// Act on the ledger directly, as any ledger user would (mint, approve).
    /// Waits for any in-flight operation.
    ///
    /// # Errors
    /// Returns `ReentrantCall` when called from inside a ledger callback.
    pub fn with_ledger_mut<R>(&self, f: impl FnOnce(&mut L) -> R) -> Result<R> {
        let _token = self.guard.enter()?;
        Ok(f(&mut self.ledger.lock()))
    }

    // ── Internals ───────────────────────────────────────────────────────

    /// Run `op` inside the reentrancy guard, logging any abort.
    fn guarded<T>(&self, op: &'static str, f: impl FnOnce() -> Result<T>) -> Result<T> {
        let _token = self.guard.enter().inspect_err(|_| {
            tracing::warn!(op, "Reentrant call rejected");
        })?;
        f().inspect_err(|err| tracing::warn!(op, error = %err, "Operation aborted"))
    }

    /// Move funds for `staged`, then commit it. Rolls the journal back on
    /// any failure.
    fn execute(&self, staged: Staged) -> Result<Invoice> {
        let mut journal = TransferJournal::new();
        if let Err(err) = self.move_funds(&staged.custody, &mut journal) {
            return Err(self.abort(journal, err));
        }
        match self.commit(staged) {
            Ok(invoice) => {
                let legs = journal.commit();
                tracing::debug!(invoice_id = %invoice.id, legs = legs.len(), "Transfers committed");
                Ok(invoice)
            }
            Err(err) => Err(self.abort(journal, err)),
        }
    }

    fn move_funds(&self, custody: &CustodyMove, journal: &mut TransferJournal) -> Result<()> {
        let mut ledger = self.ledger.lock();
        match custody {
            CustodyMove::None => Ok(()),
            CustodyMove::Deposit { payer, amount } => {
                deposit(&mut *ledger, journal, *payer, self.custody, *amount)
            }
            CustodyMove::Payout(plan) => plan.execute(&mut *ledger, journal, self.custody),
        }
    }

    /// Install `staged` atomically: every fallible step runs before the
    /// first write.
    fn commit(&self, staged: Staged) -> Result<Invoice> {
        let mut state = self.state.lock();
        let mut pool = state.pool.clone();
        match &staged.custody {
            CustodyMove::None => {}
            CustodyMove::Deposit { amount, .. } => pool.record_deposit(*amount)?,
            CustodyMove::Payout(plan) => pool.record_payout(plan.amount)?,
        }
        let records = state.events.prepare(staged.events)?;
        if staged.created {
            state.registry.insert(staged.invoice.clone())?;
        } else {
            state.registry.update(staged.invoice.clone())?;
        }
        state.pool = pool;
        state.events.append(records);
        Ok(staged.invoice)
    }

    /// Undo whatever `journal` recorded. A failed rollback outranks the
    /// original error.
    fn abort(&self, journal: TransferJournal, err: CovenantError) -> CovenantError {
        if journal.is_empty() {
            return err;
        }
        let legs = journal.len();
        match journal.rollback(&mut *self.ledger.lock()) {
            Ok(()) => {
                tracing::warn!(legs, error = %err, "Transfers rolled back");
                err
            }
            Err(rollback_err) => {
                tracing::error!(
                    legs,
                    error = %err,
                    rollback_error = %rollback_err,
                    "Rollback failed; custody may diverge from the ledger"
                );
                rollback_err
            }
        }
    }
}

impl<L: AssetLedger + std::fmt::Debug> std::fmt::Debug for EscrowService<L> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EscrowService")
            .field("custody", &self.custody)
            .field("fees", &self.fees)
            .field("state", &self.state)
            .field("ledger", &self.ledger)
            .finish_non_exhaustive()
    }
}

fn check_text(field: &'static str, text: &str, max: usize) -> Result<()> {
    if text.len() > max {
        return Err(CovenantError::InvalidText {
            field,
            len: text.len(),
            max,
        });
    }
    Ok(())
}

/// The release or refund event describing `plan`.
fn payout_event(invoice: &Invoice, plan: &PayoutPlan) -> EscrowEvent {
    match plan.kind {
        PayoutKind::Release => EscrowEvent::FundsReleased {
            invoice_id: invoice.id,
            payee: invoice.payee,
            amount: plan.fees.net_amount,
            platform_fee: plan.fees.platform_fee,
            arbiter_fee: plan.fees.arbiter_fee,
        },
        PayoutKind::Refund => EscrowEvent::FundsRefunded {
            invoice_id: invoice.id,
            payer: invoice.payer,
            amount: plan.fees.net_amount,
            platform_fee: plan.fees.platform_fee,
            arbiter_fee: plan.fees.arbiter_fee,
        },
    }
}
