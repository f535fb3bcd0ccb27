//! Employees, roles, and the leave balance arithmetic the ledger applies
use crate::dates::TimeStamp;
use crate::error::{LedgerError, ValidationError};
use crate::utils;
use chrono::Utc;
use std::fmt;

pub const EMPLOYEE_HRP: &str = "emp_";

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, minicbor::Encode, minicbor::Decode)]
pub struct EmployeeId(#[n(0)] String);

#[derive(Debug, Clone, Copy, PartialEq, Eq, minicbor::Encode, minicbor::Decode)]
pub enum Role {
    #[n(0)]
    Employee,
    #[n(1)]
    Hod,
    #[n(2)]
    Hr,
    #[n(3)]
    Ged,
    #[n(4)]
    Admin,
}

/// Leave day counters. `total == available + used` holds for every value of this type
/// produced by its constructors and operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, minicbor::Encode, minicbor::Decode)]
pub struct LeaveBalance {
    #[n(0)]
    total: u32,
    #[n(1)]
    available: u32,
    #[n(2)]
    used: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, minicbor::Encode, minicbor::Decode)]
pub struct Employee {
    #[n(0)]
    pub id: EmployeeId,
    #[n(1)]
    pub first_name: String,
    #[n(2)]
    pub last_name: String,
    #[n(3)]
    pub department: String,
    #[n(4)]
    pub role: Role,
    #[n(5)]
    pub is_hod: bool,
    #[n(6)]
    pub is_active: bool,
    #[n(7)]
    pub leave_balance: LeaveBalance,
    #[n(8)]
    pub created_at: TimeStamp<Utc>,
}

/// Input for enrolling an employee in the directory
#[derive(Debug, Clone)]
pub struct EmployeeProfile {
    pub first_name: String,
    pub last_name: String,
    pub department: String,
    pub role: Role,
    pub is_hod: bool,
}

/// The already authenticated identity performing an operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Actor {
    pub id: EmployeeId,
    pub role: Role,
    pub department: String,
    pub is_hod: bool,
}

impl EmployeeId {
    pub fn new() -> anyhow::Result<Self> {
        Ok(Self(utils::new_uuid_to_bech32(EMPLOYEE_HRP)?))
    }
    /// Accept an id received from a caller
    pub fn parse(value: &str) -> Result<Self, ValidationError> {
        let value = value.trim();
        if !utils::is_bech32_uuid(value, EMPLOYEE_HRP) {
            return Err(ValidationError::InvalidId {
                kind: "employee",
                value: value.to_string(),
            });
        }
        Ok(Self(value.to_string()))
    }
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for EmployeeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Role::Employee => "employee",
            Role::Hod => "hod",
            Role::Hr => "hr",
            Role::Ged => "ged",
            Role::Admin => "admin",
        };
        f.write_str(name)
    }
}

impl std::str::FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "employee" => Ok(Role::Employee),
            "hod" => Ok(Role::Hod),
            "hr" => Ok(Role::Hr),
            "ged" => Ok(Role::Ged),
            "admin" => Ok(Role::Admin),
            _ => Err(format!("Invalid role: {}", s)),
        }
    }
}

impl LeaveBalance {
    /// A fresh allowance with nothing used.
    pub fn new(total: u32) -> Self {
        Self {
            total,
            available: total,
            used: 0,
        }
    }
    pub fn from_parts(total: u32, available: u32, used: u32) -> Result<Self, LedgerError> {
        let balance = Self {
            total,
            available,
            used,
        };
        if !balance.is_consistent() {
            return Err(LedgerError::Invariant(format!(
                "total {total} != available {available} + used {used}"
            )));
        }
        Ok(balance)
    }
    pub fn total(&self) -> u32 {
        self.total
    }
    pub fn available(&self) -> u32 {
        self.available
    }
    pub fn used(&self) -> u32 {
        self.used
    }
    pub fn is_consistent(&self) -> bool {
        self.available.checked_add(self.used) == Some(self.total)
    }
    /// Move `days` from available into used.
    pub fn debit(&self, days: u32) -> Result<Self, LedgerError> {
        let available = self
            .available
            .checked_sub(days)
            .ok_or(LedgerError::Insufficient {
                available: self.available,
                requested: days,
            })?;
        let used = self.used.checked_add(days).ok_or_else(|| {
            LedgerError::Invariant(format!("used {} + {days} overflows", self.used))
        })?;
        Self::from_parts(self.total, available, used)
    }
    /// Move `days` from used back into available.
    pub fn credit(&self, days: u32) -> Result<Self, LedgerError> {
        let used = self.used.checked_sub(days).ok_or_else(|| {
            LedgerError::Invariant(format!(
                "refund of {days} days exceeds the {} days used",
                self.used
            ))
        })?;
        let available = self.available.checked_add(days).ok_or_else(|| {
            LedgerError::Invariant(format!("available {} + {days} overflows", self.available))
        })?;
        Self::from_parts(self.total, available, used)
    }
    /// Positive `delta` debits, negative credits, zero leaves the balance as is.
    pub fn adjust(&self, delta: i64) -> Result<Self, LedgerError> {
        let days = u32::try_from(delta.unsigned_abs()).map_err(|_| {
            LedgerError::Invariant(format!("adjustment of {delta} days is out of range"))
        })?;
        match delta.signum() {
            1 => self.debit(days),
            -1 => self.credit(days),
            _ => Ok(*self),
        }
    }
    /// Replace the allowance, keeping what has been used.
    pub fn with_total(&self, total: u32) -> Result<Self, LedgerError> {
        let available = total.checked_sub(self.used).ok_or_else(|| {
            LedgerError::Invariant(format!(
                "allowance {total} is below the {} days already used",
                self.used
            ))
        })?;
        Self::from_parts(total, available, self.used)
    }
}

impl Employee {
    pub fn new(profile: EmployeeProfile, allowance: u32) -> anyhow::Result<Self> {
        Ok(Self {
            id: EmployeeId::new()?,
            first_name: profile.first_name,
            last_name: profile.last_name,
            department: profile.department,
            role: profile.role,
            is_hod: profile.is_hod,
            is_active: true,
            leave_balance: LeaveBalance::new(allowance),
            created_at: TimeStamp::new(),
        })
    }
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}

impl EmployeeProfile {
    pub fn new(first_name: &str, last_name: &str, department: &str, role: Role) -> Self {
        Self {
            first_name: first_name.to_string(),
            last_name: last_name.to_string(),
            department: department.to_string(),
            role,
            is_hod: role == Role::Hod,
        }
    }
    pub fn set_hod(mut self, is_hod: bool) -> Self {
        self.is_hod = is_hod;
        self
    }
}

impl Actor {
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}

impl From<&Employee> for Actor {
    fn from(value: &Employee) -> Self {
        Self {
            id: value.id.clone(),
            role: value.role,
            department: value.department.clone(),
            is_hod: value.is_hod,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn debit_then_credit_restores_balance() {
        let start = LeaveBalance::new(28);

        let debited = start.debit(5).unwrap();
        assert_eq!((debited.available(), debited.used()), (23, 5));
        assert!(debited.is_consistent());

        assert_eq!(debited.credit(5).unwrap(), start);
    }

    #[test]
    fn debit_beyond_available_is_refused() {
        let err = LeaveBalance::new(3).debit(4).unwrap_err();
        assert!(matches!(
            err,
            LedgerError::Insufficient {
                available: 3,
                requested: 4
            }
        ));
    }

    #[test]
    fn credit_beyond_used_is_an_invariant_violation() {
        let err = LeaveBalance::new(10).credit(1).unwrap_err();
        assert!(matches!(err, LedgerError::Invariant(_)));
    }

    #[test]
    fn adjust_follows_the_sign_of_delta() {
        let balance = LeaveBalance::new(20).debit(4).unwrap();

        assert_eq!(balance.adjust(2).unwrap().used(), 6);
        assert_eq!(balance.adjust(-3).unwrap().used(), 1);
        assert_eq!(balance.adjust(0).unwrap(), balance);
    }

    #[test]
    fn allowance_cannot_drop_below_used() {
        let balance = LeaveBalance::new(28).debit(10).unwrap();

        let raised = balance.with_total(30).unwrap();
        assert_eq!((raised.total(), raised.available(), raised.used()), (30, 20, 10));

        assert!(balance.with_total(9).is_err());
    }

    #[test]
    fn inconsistent_parts_are_rejected() {
        assert!(LeaveBalance::from_parts(28, 20, 5).is_err());
        assert!(LeaveBalance::from_parts(28, 23, 5).is_ok());
    }

    #[test]
    fn employee_encoding() {
        let original = Employee::new(
            EmployeeProfile::new("Ada", "Obi", "NOC", Role::Hod),
            28,
        )
        .unwrap();

        let encoding = minicbor::to_vec(&original).unwrap();
        let decode: Employee = minicbor::decode(&encoding).unwrap();

        assert_eq!(original, decode);
        assert!(decode.is_hod);
    }

    #[test]
    fn role_names_parse_back() {
        for role in [Role::Employee, Role::Hod, Role::Hr, Role::Ged, Role::Admin] {
            assert_eq!(role.to_string().parse::<Role>().unwrap(), role);
        }
        assert!("manager".parse::<Role>().is_err());
    }
}
