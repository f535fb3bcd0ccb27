//! Error types for the leave workflow
use crate::employee::EmployeeId;
use crate::leave::LeaveId;
use chrono::NaiveDate;

/// Malformed or unacceptable input. Raised before anything is written.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("invalid {field} '{value}'. Use YYYY-MM-DD")]
    InvalidDate { field: &'static str, value: String },
    #[error("unknown leave type '{0}'. Allowed: Annual Leave, Sick Leave, Casual Leave, Other")]
    UnknownLeaveType(String),
    #[error("leave type 'Other' requires a description")]
    MissingOtherDescription,
    #[error("required field '{0}' is missing")]
    MissingField(&'static str),
    #[error("start date {0} is in the past")]
    StartInPast(NaiveDate),
    #[error("end date {to} is before start date {from}")]
    EndBeforeStart { from: NaiveDate, to: NaiveDate },
    #[error("{from} to {to} contains no working days")]
    NoWorkingDays { from: NaiveDate, to: NaiveDate },
    #[error("invalid reliever: {0}")]
    InvalidReliever(String),
    #[error("invalid {kind} id '{value}'")]
    InvalidId { kind: &'static str, value: String },
    #[error("a comment explaining the rejection is required")]
    MissingRejectionComment,
}

#[derive(thiserror::Error, Debug)]
pub enum StoreError {
    #[error("storage backend failure: {0}")]
    Sled(#[from] sled::Error),
    #[error("failed to encode {what}: {reason}")]
    Encode { what: &'static str, reason: String },
    #[error("failed to decode {what}: {reason}")]
    Decode { what: &'static str, reason: String },
}

#[derive(thiserror::Error, Debug)]
pub enum LedgerError {
    #[error("employee {0} not found")]
    UnknownEmployee(EmployeeId),
    #[error("insufficient leave balance: {available} days available, {requested} requested")]
    Insufficient { available: u32, requested: u32 },
    #[error("balance invariant violated: {0}")]
    Invariant(String),
    #[error("balance of {employee} kept changing, gave up after {attempts} attempts")]
    Contended { employee: EmployeeId, attempts: u32 },
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Why a compensating write could not restore a leave record.
#[derive(thiserror::Error, Debug)]
pub enum RollbackError {
    #[error("the record changed again before it could be restored")]
    Superseded,
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Coarse classification of [`LeaveError`], for callers mapping errors onto a wire protocol.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Validation,
    Authorization,
    Precondition,
    Conflict,
    NotFound,
    InsufficientBalance,
    Integrity,
    Storage,
    Internal,
}

#[derive(thiserror::Error, Debug)]
pub enum LeaveError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("not authorized: {0}")]
    Unauthorized(String),
    #[error("{0}")]
    Precondition(String),
    #[error("{0}")]
    Conflict(String),
    #[error("{0} not found")]
    NotFound(String),
    #[error("insufficient leave balance: {available} days available, {requested} requested")]
    InsufficientBalance { available: u32, requested: u32 },
    /// The ledger write failed after the record write; the record was restored.
    #[error("{operation} of {leave_id} was rolled back: {cause}")]
    RolledBack {
        operation: &'static str,
        leave_id: LeaveId,
        #[source]
        cause: LedgerError,
    },
    /// The ledger write failed and restoring the record failed too.
    #[error("{operation} of {leave_id} left data inconsistent: {cause}, then rollback: {rollback}")]
    Inconsistent {
        operation: &'static str,
        leave_id: LeaveId,
        #[source]
        cause: LedgerError,
        rollback: RollbackError,
    },
    #[error(transparent)]
    Ledger(LedgerError),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl LeaveError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            LeaveError::Validation(_) => ErrorKind::Validation,
            LeaveError::Unauthorized(_) => ErrorKind::Authorization,
            LeaveError::Precondition(_) => ErrorKind::Precondition,
            LeaveError::Conflict(_) => ErrorKind::Conflict,
            LeaveError::NotFound(_) => ErrorKind::NotFound,
            LeaveError::InsufficientBalance { .. } => ErrorKind::InsufficientBalance,
            LeaveError::RolledBack { .. } | LeaveError::Inconsistent { .. } => {
                ErrorKind::Integrity
            }
            LeaveError::Ledger(_) | LeaveError::Store(_) => ErrorKind::Storage,
            LeaveError::Internal(_) => ErrorKind::Internal,
        }
    }
}

impl From<LedgerError> for LeaveError {
    fn from(value: LedgerError) -> Self {
        match value {
            LedgerError::UnknownEmployee(id) => LeaveError::NotFound(format!("employee {id}")),
            LedgerError::Insufficient {
                available,
                requested,
            } => LeaveError::InsufficientBalance {
                available,
                requested,
            },
            other => LeaveError::Ledger(other),
        }
    }
}
