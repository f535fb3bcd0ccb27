pub mod approval;
pub mod config;
pub mod dates;
pub mod employee;
pub mod error;
pub mod leave;
pub mod ledger;
pub mod lifecycle;
pub mod service;
pub mod store;
pub mod utils;

pub use config::LeaveConfig;
pub use dates::{Clock, FixedClock, SystemClock};
pub use employee::{Actor, Employee, EmployeeId, EmployeeProfile, LeaveBalance, Role};
pub use error::{ErrorKind, LeaveError, LedgerError, StoreError, ValidationError};
pub use leave::{
    LeaveApplication, LeaveId, LeaveRequest, LeaveStatus, LeaveType, Stage, StageStatus,
};
pub use service::{LeaveFilter, LeaveService};
pub use store::{EmployeeStore, LeaveStore, SledStore, Swap};
