//! Create, edit, cancel and delete, plus the calendar driven display status
use crate::approval::{self, LedgerEffect};
use crate::employee::{Actor, EmployeeId};
use crate::error::{LeaveError, ValidationError};
use crate::leave::{LeaveApplication, LeaveId, LeaveRequest, LeaveStatus, ValidApplication};
use crate::service::LeaveService;
use crate::store::{EmployeeStore, LeaveStore};
use chrono::NaiveDate;
use tracing::info;

/// The status a request shows on `today`.
///
/// Approved requests become Active on their first day and Over after their last; Active
/// ones become Over. Nothing else moves, so applying this twice changes nothing.
pub fn derive_display_status(leave: &LeaveRequest, today: NaiveDate) -> LeaveStatus {
    let from = leave.from_date.to_naive();
    let to = leave.to_date.to_naive();
    match leave.status {
        LeaveStatus::Approved | LeaveStatus::Active if today > to => LeaveStatus::Over,
        LeaveStatus::Approved if from <= today => LeaveStatus::Active,
        status => status,
    }
}

impl<S: LeaveStore + EmployeeStore> LeaveService<S> {
    /// Submit a new request for `employee_id`, taking its working days from their balance.
    pub fn create(
        &self,
        employee_id: &EmployeeId,
        application: LeaveApplication,
    ) -> Result<LeaveRequest, LeaveError> {
        let valid = application.validate(self.today())?;

        let owner = self.load_employee(employee_id)?;
        if !owner.is_active {
            return Err(LeaveError::Precondition(format!(
                "employee {employee_id} is not active"
            )));
        }
        self.check_reliever(employee_id, &valid)?;

        // fail fast; the ledger re-checks under its own swap
        let available = owner.leave_balance.available();
        if available < valid.total_days {
            return Err(LeaveError::InsufficientBalance {
                available,
                requested: valid.total_days,
            });
        }

        let leave =
            LeaveRequest::submit(LeaveId::new()?, employee_id.clone(), valid, self.timestamp());
        self.commit(
            "submission",
            &leave.id,
            None,
            Some(&leave),
            employee_id,
            LedgerEffect::Debit(leave.total_days),
        )?;

        info!(
            leave_id = %leave.id,
            employee_id = %employee_id,
            leave_type = %leave.leave_type,
            from = %leave.from_date,
            to = %leave.to_date,
            total_days = leave.total_days,
            "leave request submitted"
        );
        Ok(leave)
    }

    /// Replace a request's details while it still waits on the HOD.
    ///
    /// The owner's balance moves by the difference in working days.
    pub fn edit(
        &self,
        leave_id: &LeaveId,
        actor: &Actor,
        application: LeaveApplication,
    ) -> Result<LeaveRequest, LeaveError> {
        let leave = self.load_leave(leave_id)?;
        authorize_owner(actor, &leave, "edit")?;
        if !leave.is_editable() {
            return Err(LeaveError::Precondition(
                "leave request can no longer be edited, it has entered review".into(),
            ));
        }

        let valid = application.validate(self.today())?;
        self.check_reliever(&leave.employee_id, &valid)?;

        let delta = i64::from(valid.total_days) - i64::from(leave.total_days);
        if delta > 0 {
            let available = self.balance(&leave.employee_id)?.available();
            if i64::from(available) < delta {
                return Err(LeaveError::InsufficientBalance {
                    available,
                    requested: valid.total_days - leave.total_days,
                });
            }
        }

        let revised = leave.revise(valid, self.timestamp());
        self.commit(
            "edit",
            &leave.id,
            Some(&leave),
            Some(&revised),
            &leave.employee_id,
            LedgerEffect::Adjust(delta),
        )?;

        info!(
            leave_id = %revised.id,
            editor = %actor.id,
            total_days = revised.total_days,
            delta,
            "leave request edited"
        );
        Ok(revised)
    }

    /// Withdraw a request that has not run its course, refunding its days.
    pub fn cancel(&self, leave_id: &LeaveId, actor: &Actor) -> Result<LeaveRequest, LeaveError> {
        let leave = self.leave(leave_id)?;
        authorize_owner(actor, &leave, "cancel")?;

        let transition = approval::cancel(&leave, self.timestamp())?;
        self.commit(
            "cancellation",
            &leave.id,
            Some(&leave),
            Some(&transition.leave),
            &leave.employee_id,
            transition.effect,
        )?;

        info!(
            leave_id = %leave.id,
            by = %actor.id,
            refunded = leave.total_days,
            "leave request cancelled"
        );
        Ok(transition.leave)
    }

    /// Remove a request. Only pending ones are refunded; approved or running leave must be
    /// cancelled instead.
    pub fn delete(&self, leave_id: &LeaveId, actor: &Actor) -> Result<(), LeaveError> {
        let leave = self.leave(leave_id)?;
        authorize_owner(actor, &leave, "delete")?;

        let effect = match leave.status {
            LeaveStatus::Approved | LeaveStatus::Active => {
                return Err(LeaveError::Precondition(
                    "cannot delete approved or active leave, cancel it instead".into(),
                ));
            }
            LeaveStatus::Pending => LedgerEffect::Credit(leave.total_days),
            LeaveStatus::Rejected | LeaveStatus::Cancelled | LeaveStatus::Over => {
                LedgerEffect::None
            }
        };
        self.commit(
            "deletion",
            &leave.id,
            Some(&leave),
            None,
            &leave.employee_id,
            effect,
        )?;

        info!(
            leave_id = %leave.id,
            by = %actor.id,
            status = %leave.status,
            "leave request deleted"
        );
        Ok(())
    }

    fn check_reliever(
        &self,
        applicant: &EmployeeId,
        valid: &ValidApplication,
    ) -> Result<(), LeaveError> {
        if valid.reliever_id == *applicant {
            let reason = "you cannot relieve yourself".to_string();
            return Err(ValidationError::InvalidReliever(reason).into());
        }
        match self.store.get_employee(&valid.reliever_id)? {
            Some(reliever) if reliever.is_active => Ok(()),
            Some(_) => Err(ValidationError::InvalidReliever(format!(
                "{} is not an active employee",
                valid.reliever_id
            ))
            .into()),
            None => Err(ValidationError::InvalidReliever(format!(
                "no employee {}",
                valid.reliever_id
            ))
            .into()),
        }
    }
}

fn authorize_owner(actor: &Actor, leave: &LeaveRequest, action: &str) -> Result<(), LeaveError> {
    if actor.id == leave.employee_id || actor.is_admin() {
        Ok(())
    } else {
        Err(LeaveError::Unauthorized(format!(
            "only the requester or an admin can {action} this leave request"
        )))
    }
}
