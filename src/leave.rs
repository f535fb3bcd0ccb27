//! Leave requests and the applications they are created from
use crate::dates::{LeaveDate, TimeStamp, count_weekdays};
use crate::employee::EmployeeId;
use crate::error::ValidationError;
use crate::utils;
use chrono::{NaiveDate, Utc};
use std::fmt;

pub const LEAVE_HRP: &str = "leave_";

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, minicbor::Encode, minicbor::Decode)]
pub struct LeaveId(#[n(0)] String);

#[derive(Debug, Clone, PartialEq, Eq, minicbor::Encode, minicbor::Decode)]
pub enum LeaveType {
    #[n(0)]
    Annual,
    #[n(1)]
    Sick,
    #[n(2)]
    Casual,
    #[n(3)]
    Other {
        #[n(0)]
        description: String,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, minicbor::Encode, minicbor::Decode)]
pub enum LeaveStatus {
    #[n(0)]
    Pending,
    #[n(1)]
    Approved,
    #[n(2)]
    Active,
    #[n(3)]
    Over,
    #[n(4)]
    Rejected,
    #[n(5)]
    Cancelled,
}

/// Position in the approval pipeline. Also names the approver role deciding it.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, minicbor::Encode, minicbor::Decode,
)]
pub enum Stage {
    #[n(1)]
    Hod,
    #[n(2)]
    Hr,
    #[n(3)]
    Ged,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, minicbor::Encode, minicbor::Decode)]
pub enum Decision {
    #[n(0)]
    Approved,
    #[n(1)]
    Rejected,
}

/// Per-stage view of the approval flow.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StageStatus {
    Pending,
    Approved,
    Rejected,
}

/// One recorded decision. The flow is append only.
#[derive(Debug, Clone, PartialEq, Eq, minicbor::Encode, minicbor::Decode)]
pub struct ApprovalStep {
    #[n(0)]
    pub approver: EmployeeId,
    #[n(1)]
    pub stage: Stage,
    #[n(2)]
    pub decision: Decision,
    #[n(3)]
    pub comments: Option<String>,
    #[n(4)]
    pub date: TimeStamp<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, minicbor::Encode, minicbor::Decode)]
pub struct LeaveRequest {
    #[n(0)]
    pub id: LeaveId,
    #[n(1)]
    pub employee_id: EmployeeId,
    #[n(2)]
    pub leave_type: LeaveType,
    #[n(3)]
    pub from_date: LeaveDate,
    #[n(4)]
    pub to_date: LeaveDate,
    #[n(5)]
    pub total_days: u32,
    #[n(6)]
    pub reason: String,
    #[n(7)]
    pub reliever_id: EmployeeId,
    #[n(8)]
    pub status: LeaveStatus,
    #[n(9)]
    pub stage: Stage,
    #[n(10)]
    pub approval_flow: Vec<ApprovalStep>,
    #[n(11)]
    pub created_at: TimeStamp<Utc>,
    #[n(12)]
    pub updated_at: TimeStamp<Utc>,
}

/// What an employee submits, in the shape it arrives from a caller.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LeaveApplication {
    leave_type: Option<String>,
    other_leave_type: Option<String>,
    from_date: Option<String>,
    to_date: Option<String>,
    reason: Option<String>,
    reliever: Option<String>,
}

/// An application that passed every check not needing the directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidApplication {
    pub leave_type: LeaveType,
    pub from_date: LeaveDate,
    pub to_date: LeaveDate,
    pub total_days: u32,
    pub reason: String,
    pub reliever_id: EmployeeId,
}

impl LeaveId {
    pub fn new() -> anyhow::Result<Self> {
        Ok(Self(utils::new_uuid_to_bech32(LEAVE_HRP)?))
    }
    pub fn parse(value: &str) -> Result<Self, ValidationError> {
        let value = value.trim();
        if !utils::is_bech32_uuid(value, LEAVE_HRP) {
            return Err(ValidationError::InvalidId {
                kind: "leave",
                value: value.to_string(),
            });
        }
        Ok(Self(value.to_string()))
    }
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for LeaveId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl LeaveType {
    pub const ALLOWED: [&'static str; 4] = ["Annual Leave", "Sick Leave", "Casual Leave", "Other"];

    /// `other` is the free text description, only read for "Other".
    pub fn parse(name: &str, other: Option<&str>) -> Result<Self, ValidationError> {
        match name.trim() {
            "Annual Leave" => Ok(LeaveType::Annual),
            "Sick Leave" => Ok(LeaveType::Sick),
            "Casual Leave" => Ok(LeaveType::Casual),
            "Other" => match other.map(str::trim) {
                Some(description) if !description.is_empty() => Ok(LeaveType::Other {
                    description: description.to_string(),
                }),
                _ => Err(ValidationError::MissingOtherDescription),
            },
            unknown => Err(ValidationError::UnknownLeaveType(unknown.to_string())),
        }
    }
}

impl fmt::Display for LeaveType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LeaveType::Annual => f.write_str("Annual Leave"),
            LeaveType::Sick => f.write_str("Sick Leave"),
            LeaveType::Casual => f.write_str("Casual Leave"),
            LeaveType::Other { description } => write!(f, "Other ({description})"),
        }
    }
}

impl fmt::Display for LeaveStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            LeaveStatus::Pending => "Pending",
            LeaveStatus::Approved => "Approved",
            LeaveStatus::Active => "Active",
            LeaveStatus::Over => "Over",
            LeaveStatus::Rejected => "Rejected",
            LeaveStatus::Cancelled => "Cancelled",
        };
        f.write_str(name)
    }
}

impl Stage {
    pub const ALL: [Stage; 3] = [Stage::Hod, Stage::Hr, Stage::Ged];

    pub fn number(self) -> u8 {
        match self {
            Stage::Hod => 1,
            Stage::Hr => 2,
            Stage::Ged => 3,
        }
    }
    pub fn next(self) -> Option<Stage> {
        match self {
            Stage::Hod => Some(Stage::Hr),
            Stage::Hr => Some(Stage::Ged),
            Stage::Ged => None,
        }
    }
    /// Stages that must be approved before this one may be decided
    pub fn prerequisites(self) -> &'static [Stage] {
        match self {
            Stage::Hod => &[],
            Stage::Hr => &[Stage::Hod],
            Stage::Ged => &[Stage::Hod, Stage::Hr],
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Hod => "HOD",
            Stage::Hr => "HR",
            Stage::Ged => "GED",
        };
        f.write_str(name)
    }
}

impl fmt::Display for Decision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Decision::Approved => f.write_str("Approved"),
            Decision::Rejected => f.write_str("Rejected"),
        }
    }
}

impl LeaveRequest {
    /// A freshly submitted request, waiting on the HOD.
    pub fn submit(
        id: LeaveId,
        employee_id: EmployeeId,
        application: ValidApplication,
        at: TimeStamp<Utc>,
    ) -> Self {
        Self {
            id,
            employee_id,
            leave_type: application.leave_type,
            from_date: application.from_date,
            to_date: application.to_date,
            total_days: application.total_days,
            reason: application.reason,
            reliever_id: application.reliever_id,
            status: LeaveStatus::Pending,
            stage: Stage::Hod,
            approval_flow: vec![],
            created_at: at.clone(),
            updated_at: at,
        }
    }
    pub fn is_editable(&self) -> bool {
        self.status == LeaveStatus::Pending && self.stage < Stage::Hr
    }
    pub fn is_active(&self) -> bool {
        self.status == LeaveStatus::Active
    }
    pub fn is_fully_approved(&self) -> bool {
        matches!(
            self.status,
            LeaveStatus::Approved | LeaveStatus::Active | LeaveStatus::Over
        ) && self.stage_status(Stage::Ged) == StageStatus::Approved
    }
    /// The recorded decision for `stage`, if any
    pub fn approval_for(&self, stage: Stage) -> Option<&ApprovalStep> {
        self.approval_flow.iter().find(|step| step.stage == stage)
    }
    pub fn stage_status(&self, stage: Stage) -> StageStatus {
        match self.approval_for(stage).map(|step| step.decision) {
            Some(Decision::Approved) => StageStatus::Approved,
            Some(Decision::Rejected) => StageStatus::Rejected,
            None => StageStatus::Pending,
        }
    }
    /// The per-stage statuses in pipeline order
    pub fn progress(&self) -> [(Stage, StageStatus); 3] {
        Stage::ALL.map(|stage| (stage, self.stage_status(stage)))
    }
    /// Replace the editable fields, keeping identity, stage and history.
    pub fn revise(&self, application: ValidApplication, at: TimeStamp<Utc>) -> Self {
        Self {
            leave_type: application.leave_type,
            from_date: application.from_date,
            to_date: application.to_date,
            total_days: application.total_days,
            reason: application.reason,
            reliever_id: application.reliever_id,
            updated_at: at,
            ..self.clone()
        }
    }
}

impl LeaveApplication {
    pub fn new() -> Self {
        Self::default()
    }
    pub fn set_leave_type(mut self, leave_type: &str) -> Self {
        self.leave_type = Some(leave_type.to_string());
        self
    }
    pub fn set_other_leave_type(mut self, description: &str) -> Self {
        self.other_leave_type = Some(description.to_string());
        self
    }
    pub fn set_from_date(mut self, date: &str) -> Self {
        self.from_date = Some(date.to_string());
        self
    }
    pub fn set_to_date(mut self, date: &str) -> Self {
        self.to_date = Some(date.to_string());
        self
    }
    pub fn set_reason(mut self, reason: &str) -> Self {
        self.reason = Some(reason.to_string());
        self
    }
    pub fn set_reliever(mut self, reliever: &str) -> Self {
        self.reliever = Some(reliever.to_string());
        self
    }
    /// Checks fields and dates against `today`, and counts the working days requested.
    pub fn validate(&self, today: NaiveDate) -> Result<ValidApplication, ValidationError> {
        let leave_type = self
            .leave_type
            .as_deref()
            .ok_or(ValidationError::MissingField("leaveType"))?;
        let leave_type = LeaveType::parse(leave_type, self.other_leave_type.as_deref())?;

        let from_date = self
            .from_date
            .as_deref()
            .ok_or(ValidationError::MissingField("fromDate"))?;
        let from_date = LeaveDate::parse("fromDate", from_date)?;
        let to_date = self
            .to_date
            .as_deref()
            .ok_or(ValidationError::MissingField("toDate"))?;
        let to_date = LeaveDate::parse("toDate", to_date)?;

        if from_date.to_naive() < today {
            return Err(ValidationError::StartInPast(from_date.to_naive()));
        }
        if to_date < from_date {
            return Err(ValidationError::EndBeforeStart {
                from: from_date.to_naive(),
                to: to_date.to_naive(),
            });
        }
        let total_days = count_weekdays(from_date.to_naive(), to_date.to_naive());
        if total_days == 0 {
            return Err(ValidationError::NoWorkingDays {
                from: from_date.to_naive(),
                to: to_date.to_naive(),
            });
        }

        let reason = self
            .reason
            .as_deref()
            .map(str::trim)
            .filter(|reason| !reason.is_empty())
            .ok_or(ValidationError::MissingField("reason"))?;

        let reliever = self
            .reliever
            .as_deref()
            .ok_or(ValidationError::MissingField("reliever"))?;
        let reliever_id = EmployeeId::parse(reliever)
            .map_err(|_| ValidationError::InvalidReliever(format!("'{reliever}' is not an id")))?;

        Ok(ValidApplication {
            leave_type,
            from_date,
            to_date,
            total_days,
            reason: reason.to_string(),
            reliever_id,
        })
    }
}
