//! The approval state machine.
//!
//! A request moves `Pending(HOD) -> Pending(HR) -> Pending(GED) -> Approved`, and can be
//! rejected from any pending stage. The approval flow on the record is the single source
//! of truth for who decided what; per-role views are derived from it (see
//! [`LeaveRequest::stage_status`]).
//!
//! Two entry points reach the same machine:
//! - the sequential protocol ([`LeaveService::approve`], [`LeaveService::reject`]) decides
//!   whichever stage the request is at;
//! - the dedicated protocol ([`LeaveService::hod_approve`] and friends) names the stage it
//!   decides, and fails when that stage is not the one awaiting a decision.
use crate::dates::TimeStamp;
use crate::employee::{Actor, Employee, Role};
use crate::error::{LeaveError, ValidationError};
use crate::leave::{
    ApprovalStep, Decision, LeaveId, LeaveRequest, LeaveStatus, Stage, StageStatus,
};
use crate::service::LeaveService;
use crate::store::{EmployeeStore, LeaveStore};
use chrono::Utc;
use tracing::info;

/// What a transition does to the owner's balance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LedgerEffect {
    None,
    Debit(u32),
    Credit(u32),
    Adjust(i64),
}

/// A computed, not yet persisted, state change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transition {
    pub leave: LeaveRequest,
    pub effect: LedgerEffect,
}

/// May `actor` decide `stage` for a request owned by `owner`? Admins may decide any stage.
pub fn authorize(actor: &Actor, stage: Stage, owner: &Employee) -> Result<(), LeaveError> {
    if actor.is_admin() {
        return Ok(());
    }
    match stage {
        Stage::Hod => {
            if !actor.is_hod {
                return Err(LeaveError::Unauthorized(
                    "only a head of department can decide at the HOD stage".into(),
                ));
            }
            if actor.department != owner.department {
                return Err(LeaveError::Unauthorized(format!(
                    "HOD of {} cannot decide requests from {}",
                    actor.department, owner.department
                )));
            }
            Ok(())
        }
        Stage::Hr => require_role(actor, Role::Hr, stage),
        Stage::Ged => require_role(actor, Role::Ged, stage),
    }
}

fn require_role(actor: &Actor, role: Role, stage: Stage) -> Result<(), LeaveError> {
    if actor.role == role {
        Ok(())
    } else {
        Err(LeaveError::Unauthorized(format!(
            "a {} cannot decide at the {stage} stage",
            actor.role
        )))
    }
}

/// Record `decision` on `leave`.
///
/// `expected` is `None` for the sequential protocol (decide the current stage) and the
/// named stage for the dedicated one. Nothing is checked against the store here; the
/// caller persists [`Transition::leave`] with a compare-and-swap on `leave`.
pub fn advance(
    leave: &LeaveRequest,
    actor: &Actor,
    owner: &Employee,
    expected: Option<Stage>,
    decision: Decision,
    comments: Option<&str>,
    at: TimeStamp<Utc>,
) -> Result<Transition, LeaveError> {
    let comments = comments
        .map(str::trim)
        .filter(|c| !c.is_empty())
        .map(str::to_string);
    // only the sequential reject requires a reason
    if expected.is_none() && decision == Decision::Rejected && comments.is_none() {
        return Err(ValidationError::MissingRejectionComment.into());
    }

    let stage = expected.unwrap_or(leave.stage);
    authorize(actor, stage, owner)?;

    if let Some(stage) = expected {
        if let Some(missing) = stage
            .prerequisites()
            .iter()
            .find(|p| leave.stage_status(**p) != StageStatus::Approved)
        {
            return Err(LeaveError::Precondition(format!(
                "leave request must be approved by {missing} first"
            )));
        }
        match leave.stage_status(stage) {
            StageStatus::Approved => {
                return Err(LeaveError::Conflict(format!(
                    "leave request already approved by {stage}"
                )));
            }
            StageStatus::Rejected => {
                return Err(LeaveError::Conflict(format!(
                    "leave request already rejected by {stage}"
                )));
            }
            StageStatus::Pending => {}
        }
    }
    if leave.status != LeaveStatus::Pending {
        return Err(LeaveError::Precondition(format!(
            "leave request is {} and no longer awaiting approval",
            leave.status
        )));
    }
    if leave.stage != stage {
        return Err(LeaveError::Precondition(format!(
            "leave request is waiting on {}, not {stage}",
            leave.stage
        )));
    }

    let mut next = leave.clone();
    next.approval_flow.push(ApprovalStep {
        approver: actor.id.clone(),
        stage,
        decision,
        comments,
        date: at.clone(),
    });
    next.updated_at = at;

    let effect = match decision {
        Decision::Approved => {
            match stage.next() {
                Some(following) => next.stage = following,
                None => next.status = LeaveStatus::Approved,
            }
            // days were taken at submission; final approval takes nothing more
            LedgerEffect::None
        }
        Decision::Rejected => {
            next.status = LeaveStatus::Rejected;
            LedgerEffect::Credit(leave.total_days)
        }
    };

    Ok(Transition { leave: next, effect })
}

/// Withdraw a request. `leave.status` must already be the derived display status.
pub fn cancel(leave: &LeaveRequest, at: TimeStamp<Utc>) -> Result<Transition, LeaveError> {
    match leave.status {
        LeaveStatus::Over | LeaveStatus::Rejected | LeaveStatus::Cancelled => {
            Err(LeaveError::Precondition(format!(
                "cannot cancel a leave request that is {}",
                leave.status
            )))
        }
        LeaveStatus::Pending | LeaveStatus::Approved | LeaveStatus::Active => {
            let mut next = leave.clone();
            next.status = LeaveStatus::Cancelled;
            next.updated_at = at;
            Ok(Transition {
                leave: next,
                effect: LedgerEffect::Credit(leave.total_days),
            })
        }
    }
}

impl<S: LeaveStore + EmployeeStore> LeaveService<S> {
    /// Approve whichever stage the request is waiting on.
    pub fn approve(
        &self,
        leave_id: &LeaveId,
        actor: &Actor,
        comments: Option<&str>,
    ) -> Result<LeaveRequest, LeaveError> {
        self.decide(leave_id, actor, None, Decision::Approved, comments)
    }

    /// Reject at whichever stage the request is waiting on, refunding its days.
    pub fn reject(
        &self,
        leave_id: &LeaveId,
        actor: &Actor,
        comments: &str,
    ) -> Result<LeaveRequest, LeaveError> {
        self.decide(leave_id, actor, None, Decision::Rejected, Some(comments))
    }

    pub fn hod_approve(
        &self,
        leave_id: &LeaveId,
        actor: &Actor,
        comments: Option<&str>,
    ) -> Result<LeaveRequest, LeaveError> {
        self.decide(leave_id, actor, Some(Stage::Hod), Decision::Approved, comments)
    }

    pub fn hod_reject(
        &self,
        leave_id: &LeaveId,
        actor: &Actor,
        comments: Option<&str>,
    ) -> Result<LeaveRequest, LeaveError> {
        self.decide(leave_id, actor, Some(Stage::Hod), Decision::Rejected, comments)
    }

    pub fn hr_approve(
        &self,
        leave_id: &LeaveId,
        actor: &Actor,
        comments: Option<&str>,
    ) -> Result<LeaveRequest, LeaveError> {
        self.decide(leave_id, actor, Some(Stage::Hr), Decision::Approved, comments)
    }

    pub fn hr_reject(
        &self,
        leave_id: &LeaveId,
        actor: &Actor,
        comments: Option<&str>,
    ) -> Result<LeaveRequest, LeaveError> {
        self.decide(leave_id, actor, Some(Stage::Hr), Decision::Rejected, comments)
    }

    /// Final approval. The only call that makes a request Approved.
    pub fn ged_approve(
        &self,
        leave_id: &LeaveId,
        actor: &Actor,
        comments: Option<&str>,
    ) -> Result<LeaveRequest, LeaveError> {
        self.decide(leave_id, actor, Some(Stage::Ged), Decision::Approved, comments)
    }

    pub fn ged_reject(
        &self,
        leave_id: &LeaveId,
        actor: &Actor,
        comments: Option<&str>,
    ) -> Result<LeaveRequest, LeaveError> {
        self.decide(leave_id, actor, Some(Stage::Ged), Decision::Rejected, comments)
    }

    fn decide(
        &self,
        leave_id: &LeaveId,
        actor: &Actor,
        expected: Option<Stage>,
        decision: Decision,
        comments: Option<&str>,
    ) -> Result<LeaveRequest, LeaveError> {
        let leave = self.load_leave(leave_id)?;
        let owner = self.load_employee(&leave.employee_id)?;

        let transition = advance(
            &leave,
            actor,
            &owner,
            expected,
            decision,
            comments,
            self.timestamp(),
        )?;
        let operation = match decision {
            Decision::Approved => "approval",
            Decision::Rejected => "rejection",
        };
        self.commit(
            operation,
            &leave.id,
            Some(&leave),
            Some(&transition.leave),
            &leave.employee_id,
            transition.effect,
        )?;

        info!(
            leave_id = %leave.id,
            approver = %actor.id,
            stage = %leave.stage,
            decision = %decision,
            status = %transition.leave.status,
            "leave request decided"
        );
        Ok(transition.leave)
    }
}
