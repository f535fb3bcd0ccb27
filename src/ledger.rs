//! Balance ledger: keeps `{total, available, used}` in step with leave requests
use crate::employee::{EmployeeId, LeaveBalance};
use crate::error::LedgerError;
use crate::store::{EmployeeStore, Swap};
use std::sync::Arc;
use tracing::{debug, info, warn};

pub struct Ledger<S> {
    store: Arc<S>,
    retries: u32,
}

impl<S: EmployeeStore> Ledger<S> {
    pub fn new(store: Arc<S>, retries: u32) -> Self {
        Self { store, retries }
    }

    pub fn balance(&self, employee: &EmployeeId) -> Result<LeaveBalance, LedgerError> {
        self.store
            .get_employee(employee)?
            .map(|e| e.leave_balance)
            .ok_or_else(|| LedgerError::UnknownEmployee(employee.clone()))
    }

    /// Take `days` out of available. Done once, when a request is submitted.
    pub fn debit(&self, employee: &EmployeeId, days: u32) -> Result<LeaveBalance, LedgerError> {
        self.apply(employee, "debit", |balance| balance.debit(days))
    }

    /// Give `days` back to available.
    pub fn credit(&self, employee: &EmployeeId, days: u32) -> Result<LeaveBalance, LedgerError> {
        self.apply(employee, "credit", |balance| balance.credit(days))
    }

    /// Apply `new_total_days - old_total_days` after an edit.
    pub fn adjust(&self, employee: &EmployeeId, delta: i64) -> Result<LeaveBalance, LedgerError> {
        if delta == 0 {
            return self.balance(employee);
        }
        self.apply(employee, "adjust", |balance| balance.adjust(delta))
    }

    /// Replace the yearly allowance, keeping the days already used.
    pub fn set_allowance(
        &self,
        employee: &EmployeeId,
        total: u32,
    ) -> Result<LeaveBalance, LedgerError> {
        let balance = self.apply(employee, "set_allowance", |balance| balance.with_total(total))?;
        info!(employee_id = %employee, total, "leave allowance changed");
        Ok(balance)
    }

    // read, compute, compare-and-swap; a lost race re-reads and recomputes
    fn apply(
        &self,
        employee: &EmployeeId,
        operation: &'static str,
        op: impl Fn(&LeaveBalance) -> Result<LeaveBalance, LedgerError>,
    ) -> Result<LeaveBalance, LedgerError> {
        let attempts = self.retries.saturating_add(1);
        for attempt in 1..=attempts {
            let current = self.balance(employee)?;
            let next = op(&current)?;
            match self.store.swap_balance(employee, &current, &next)? {
                Swap::Applied => {
                    debug!(
                        employee_id = %employee,
                        operation,
                        total = next.total(),
                        available = next.available(),
                        used = next.used(),
                        "ledger applied"
                    );
                    return Ok(next);
                }
                Swap::Stale => {
                    warn!(
                        employee_id = %employee,
                        operation,
                        attempt,
                        "balance changed concurrently, retrying"
                    );
                }
            }
        }
        Err(LedgerError::Contended {
            employee: employee.clone(),
            attempts,
        })
    }
}
