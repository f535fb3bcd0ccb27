//! Service layer API for leave workflow operations
use crate::approval::{LedgerEffect, authorize};
use crate::config::LeaveConfig;
use crate::dates::{Clock, SystemClock, TimeStamp};
use crate::employee::{Actor, Employee, EmployeeId, EmployeeProfile, LeaveBalance};
use crate::error::{LedgerError, LeaveError, RollbackError};
use crate::leave::{LeaveId, LeaveRequest, LeaveStatus, Stage, StageStatus};
use crate::ledger::Ledger;
use crate::lifecycle::derive_display_status;
use crate::store::{EmployeeStore, LeaveStore, Swap};
use chrono::Utc;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

pub struct LeaveService<S> {
    pub(crate) store: Arc<S>,
    ledger: Ledger<S>,
    clock: Arc<dyn Clock>,
    config: LeaveConfig,
}

/// Narrows [`LeaveService::list`]. Unset fields match everything.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LeaveFilter {
    pub status: Option<LeaveStatus>,
    pub department: Option<String>,
}

impl LeaveFilter {
    pub fn new() -> Self {
        Self::default()
    }
    pub fn set_status(mut self, status: LeaveStatus) -> Self {
        self.status = Some(status);
        self
    }
    pub fn set_department(mut self, department: &str) -> Self {
        self.department = Some(department.to_string());
        self
    }
}

impl<S: LeaveStore + EmployeeStore> LeaveService<S> {
    pub fn new(store: Arc<S>, config: LeaveConfig) -> Self {
        Self::with_clock(store, config, Arc::new(SystemClock))
    }

    pub fn with_clock(store: Arc<S>, config: LeaveConfig, clock: Arc<dyn Clock>) -> Self {
        let ledger = Ledger::new(store.clone(), config.balance_retries);
        Self {
            store,
            ledger,
            clock,
            config,
        }
    }

    pub(crate) fn timestamp(&self) -> TimeStamp<Utc> {
        TimeStamp::from(self.clock.now())
    }

    pub(crate) fn today(&self) -> chrono::NaiveDate {
        self.clock.today()
    }

    /// Load a leave record as stored, without deriving its display status
    pub(crate) fn load_leave(&self, id: &LeaveId) -> Result<LeaveRequest, LeaveError> {
        self.store
            .get_leave(id)?
            .ok_or_else(|| LeaveError::NotFound(format!("leave request {id}")))
    }

    pub(crate) fn load_employee(&self, id: &EmployeeId) -> Result<Employee, LeaveError> {
        self.store
            .get_employee(id)?
            .ok_or_else(|| LeaveError::NotFound(format!("employee {id}")))
    }

    /// Persist a record change, then apply its ledger effect.
    ///
    /// The record is written first with a compare-and-swap against `before`; losing that
    /// race is a [`LeaveError::Conflict`] and nothing is written. If the ledger then fails,
    /// the record is swapped back to `before`. The caller sees
    /// [`LeaveError::RolledBack`] when that restore worked and
    /// [`LeaveError::Inconsistent`] when it did not.
    pub(crate) fn commit(
        &self,
        operation: &'static str,
        id: &LeaveId,
        before: Option<&LeaveRequest>,
        after: Option<&LeaveRequest>,
        owner: &EmployeeId,
        effect: LedgerEffect,
    ) -> Result<(), LeaveError> {
        if self.store.swap_leave(id, before, after)? == Swap::Stale {
            warn!(leave_id = %id, operation, "leave request changed concurrently");
            return Err(LeaveError::Conflict(format!(
                "leave request {id} was modified concurrently, reload and retry"
            )));
        }

        let Err(cause) = self.settle(owner, effect) else {
            return Ok(());
        };

        // compensate: put the record back the way we found it
        let rollback = match self.store.swap_leave(id, after, before) {
            Ok(Swap::Applied) => None,
            Ok(Swap::Stale) => Some(RollbackError::Superseded),
            Err(e) => Some(RollbackError::Store(e)),
        };
        match rollback {
            None => {
                warn!(
                    leave_id = %id,
                    operation,
                    error = %cause,
                    "ledger update failed, record restored"
                );
                Err(match cause {
                    LedgerError::Insufficient {
                        available,
                        requested,
                    } => LeaveError::InsufficientBalance {
                        available,
                        requested,
                    },
                    cause => LeaveError::RolledBack {
                        operation,
                        leave_id: id.clone(),
                        cause,
                    },
                })
            }
            Some(rollback) => {
                error!(
                    leave_id = %id,
                    employee_id = %owner,
                    operation,
                    error = %cause,
                    rollback_error = %rollback,
                    "ledger update failed and the record could not be restored"
                );
                Err(LeaveError::Inconsistent {
                    operation,
                    leave_id: id.clone(),
                    cause,
                    rollback,
                })
            }
        }
    }

    fn settle(&self, owner: &EmployeeId, effect: LedgerEffect) -> Result<(), LedgerError> {
        match effect {
            LedgerEffect::None => Ok(()),
            LedgerEffect::Debit(days) => self.ledger.debit(owner, days).map(drop),
            LedgerEffect::Credit(days) => self.ledger.credit(owner, days).map(drop),
            LedgerEffect::Adjust(delta) => self.ledger.adjust(owner, delta).map(drop),
        }
    }

    /// Bring the stored status in line with the calendar (Approved -> Active -> Over).
    ///
    /// The derived status is written back so later reads and lifecycle checks see it.
    /// A concurrent writer winning the swap just means we re-read and derive again.
    pub(crate) fn refresh_status(&self, leave: LeaveRequest) -> Result<LeaveRequest, LeaveError> {
        let today = self.today();
        let mut current = leave;
        for _ in 0..=self.config.balance_retries {
            let derived = derive_display_status(&current, today);
            if derived == current.status {
                return Ok(current);
            }
            let mut next = current.clone();
            next.status = derived;
            match self.store.swap_leave(&current.id, Some(&current), Some(&next))? {
                Swap::Applied => {
                    debug!(
                        leave_id = %next.id,
                        from = %current.status,
                        to = %derived,
                        "leave status refreshed"
                    );
                    return Ok(next);
                }
                Swap::Stale => current = self.load_leave(&current.id)?,
            }
        }
        Err(LeaveError::Conflict(format!(
            "leave request {} kept changing while its status was refreshed",
            current.id
        )))
    }

    /// A leave request with its status derived for today
    pub fn leave(&self, id: &LeaveId) -> Result<LeaveRequest, LeaveError> {
        let leave = self.load_leave(id)?;
        self.refresh_status(leave)
    }

    /// An employee's requests, newest first
    pub fn leaves_for(&self, employee_id: &EmployeeId) -> Result<Vec<LeaveRequest>, LeaveError> {
        let mut leaves = self
            .store
            .leaves()?
            .into_iter()
            .filter(|leave| leave.employee_id == *employee_id)
            .map(|leave| self.refresh_status(leave))
            .collect::<Result<Vec<_>, _>>()?;
        leaves.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(leaves)
    }

    /// Every request matching `filter`, newest first
    pub fn list(&self, filter: &LeaveFilter) -> Result<Vec<LeaveRequest>, LeaveError> {
        let departments: HashMap<EmployeeId, String> = match filter.department {
            Some(_) => self
                .store
                .employees()?
                .into_iter()
                .map(|e| (e.id, e.department))
                .collect(),
            None => HashMap::new(),
        };

        let mut leaves = Vec::new();
        for leave in self.store.leaves()? {
            if let Some(department) = &filter.department {
                if departments.get(&leave.employee_id) != Some(department) {
                    continue;
                }
            }
            let leave = self.refresh_status(leave)?;
            if filter.status.is_some_and(|status| status != leave.status) {
                continue;
            }
            leaves.push(leave);
        }
        leaves.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(leaves)
    }

    /// Pending requests whose current stage `actor` may decide, oldest first
    pub fn awaiting_decision(&self, actor: &Actor) -> Result<Vec<LeaveRequest>, LeaveError> {
        let owners: HashMap<EmployeeId, Employee> = self
            .store
            .employees()?
            .into_iter()
            .map(|e| (e.id.clone(), e))
            .collect();

        let mut leaves: Vec<LeaveRequest> = self
            .store
            .leaves()?
            .into_iter()
            .filter(|leave| leave.status == LeaveStatus::Pending)
            .filter(|leave| {
                owners
                    .get(&leave.employee_id)
                    .is_some_and(|owner| authorize(actor, leave.stage, owner).is_ok())
            })
            .collect();
        leaves.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(leaves)
    }

    /// Where a request stands at each approval stage
    pub fn progress(&self, leave_id: &LeaveId) -> Result<[(Stage, StageStatus); 3], LeaveError> {
        Ok(self.load_leave(leave_id)?.progress())
    }

    /// Enroll an employee with the configured default allowance.
    pub fn register_employee(&self, profile: EmployeeProfile) -> Result<Employee, LeaveError> {
        let employee = Employee::new(profile, self.config.default_allowance)?;
        self.store.put_employee(&employee)?;
        info!(
            employee_id = %employee.id,
            department = %employee.department,
            role = %employee.role,
            "employee registered"
        );
        Ok(employee)
    }

    pub fn employee(&self, id: &EmployeeId) -> Result<Employee, LeaveError> {
        self.load_employee(id)
    }

    /// Deactivate or reinstate an employee. Admin only.
    ///
    /// An inactive employee can neither submit leave nor be named as a reliever.
    pub fn set_employee_active(
        &self,
        actor: &Actor,
        employee_id: &EmployeeId,
        active: bool,
    ) -> Result<Employee, LeaveError> {
        if !actor.is_admin() {
            return Err(LeaveError::Unauthorized(
                "only an admin can activate or deactivate employees".into(),
            ));
        }
        let employee = self
            .store
            .set_active(employee_id, active)?
            .ok_or_else(|| LeaveError::NotFound(format!("employee {employee_id}")))?;
        info!(
            employee_id = %employee_id,
            active,
            by = %actor.id,
            "employee activation changed"
        );
        Ok(employee)
    }

    pub fn balance(&self, employee_id: &EmployeeId) -> Result<LeaveBalance, LeaveError> {
        Ok(self.ledger.balance(employee_id)?)
    }

    /// Replace an employee's yearly allowance. Admin only.
    pub fn set_allowance(
        &self,
        actor: &Actor,
        employee_id: &EmployeeId,
        total: u32,
    ) -> Result<LeaveBalance, LeaveError> {
        if !actor.is_admin() {
            return Err(LeaveError::Unauthorized(
                "only an admin can change leave allowances".into(),
            ));
        }
        match self.ledger.set_allowance(employee_id, total) {
            Ok(balance) => Ok(balance),
            Err(LedgerError::Invariant(reason)) => Err(LeaveError::Precondition(reason)),
            Err(e) => Err(e.into()),
        }
    }
}
