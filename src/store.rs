//! Record stores for leave requests and the employee directory
use crate::config::LeaveConfig;
use crate::employee::{Employee, EmployeeId, LeaveBalance};
use crate::error::StoreError;
use crate::leave::{LeaveId, LeaveRequest};
use std::sync::Arc;
use tracing::debug;

/// Result of a conditional write
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Swap {
    Applied,
    /// The stored value no longer matched the expected one; nothing was written.
    Stale,
}

pub trait LeaveStore: Send + Sync {
    fn get_leave(&self, id: &LeaveId) -> Result<Option<LeaveRequest>, StoreError>;

    /// Replace `expected` with `new` under `id`, only if the stored record still equals
    /// `expected`. `None` on either side means absent, so this also inserts and removes.
    fn swap_leave(
        &self,
        id: &LeaveId,
        expected: Option<&LeaveRequest>,
        new: Option<&LeaveRequest>,
    ) -> Result<Swap, StoreError>;

    fn leaves(&self) -> Result<Vec<LeaveRequest>, StoreError>;
}

pub trait EmployeeStore: Send + Sync {
    fn get_employee(&self, id: &EmployeeId) -> Result<Option<Employee>, StoreError>;

    fn put_employee(&self, employee: &Employee) -> Result<(), StoreError>;

    /// Set the leave balance of `id` to `new` if it currently equals `expected`.
    /// Fails with `Stale` when the balance moved, leaving other fields untouched.
    fn swap_balance(
        &self,
        id: &EmployeeId,
        expected: &LeaveBalance,
        new: &LeaveBalance,
    ) -> Result<Swap, StoreError>;

    /// Set the active flag of `id`, leaving the rest of the record untouched.
    /// `None` when there is no such employee.
    fn set_active(&self, id: &EmployeeId, active: bool) -> Result<Option<Employee>, StoreError>;

    fn employees(&self) -> Result<Vec<Employee>, StoreError>;
}

/// Both stores over one sled database, one tree each.
#[derive(Clone)]
pub struct SledStore {
    employees: sled::Tree,
    leaves: sled::Tree,
}

const EMPLOYEES_TREE: &str = "employees";
const LEAVES_TREE: &str = "leaves";

impl SledStore {
    pub fn new(instance: Arc<sled::Db>) -> Result<Self, StoreError> {
        Ok(Self {
            employees: instance.open_tree(EMPLOYEES_TREE)?,
            leaves: instance.open_tree(LEAVES_TREE)?,
        })
    }
    pub fn open(config: &LeaveConfig) -> Result<Self, StoreError> {
        debug!(path = %config.database_path.display(), "opening leave database");
        let db = sled::open(&config.database_path)?;
        Self::new(Arc::new(db))
    }
    pub fn flush(&self) -> Result<(), StoreError> {
        self.employees.flush()?;
        self.leaves.flush()?;
        Ok(())
    }
}

fn encode<T: minicbor::Encode<()>>(what: &'static str, value: &T) -> Result<Vec<u8>, StoreError> {
    minicbor::to_vec(value).map_err(|e| StoreError::Encode {
        what,
        reason: e.to_string(),
    })
}

fn decode<T>(what: &'static str, bytes: &[u8]) -> Result<T, StoreError>
where
    T: for<'b> minicbor::Decode<'b, ()>,
{
    minicbor::decode(bytes).map_err(|e| StoreError::Decode {
        what,
        reason: e.to_string(),
    })
}

fn swap_raw(
    tree: &sled::Tree,
    key: &[u8],
    expected: Option<Vec<u8>>,
    new: Option<Vec<u8>>,
) -> Result<Swap, StoreError> {
    match tree.compare_and_swap(key, expected, new)? {
        Ok(()) => Ok(Swap::Applied),
        Err(_) => Ok(Swap::Stale),
    }
}

impl LeaveStore for SledStore {
    fn get_leave(&self, id: &LeaveId) -> Result<Option<LeaveRequest>, StoreError> {
        self.leaves
            .get(id.as_str().as_bytes())?
            .map(|bytes| decode("leave", &bytes))
            .transpose()
    }

    fn swap_leave(
        &self,
        id: &LeaveId,
        expected: Option<&LeaveRequest>,
        new: Option<&LeaveRequest>,
    ) -> Result<Swap, StoreError> {
        let expected = expected.map(|leave| encode("leave", leave)).transpose()?;
        let new = new.map(|leave| encode("leave", leave)).transpose()?;
        swap_raw(&self.leaves, id.as_str().as_bytes(), expected, new)
    }

    fn leaves(&self) -> Result<Vec<LeaveRequest>, StoreError> {
        self.leaves
            .iter()
            .values()
            .map(|bytes| decode("leave", &bytes?))
            .collect()
    }
}

impl EmployeeStore for SledStore {
    fn get_employee(&self, id: &EmployeeId) -> Result<Option<Employee>, StoreError> {
        self.employees
            .get(id.as_str().as_bytes())?
            .map(|bytes| decode("employee", &bytes))
            .transpose()
    }

    fn put_employee(&self, employee: &Employee) -> Result<(), StoreError> {
        self.employees
            .insert(employee.id.as_str().as_bytes(), encode("employee", employee)?)?;
        Ok(())
    }

    fn swap_balance(
        &self,
        id: &EmployeeId,
        expected: &LeaveBalance,
        new: &LeaveBalance,
    ) -> Result<Swap, StoreError> {
        let key = id.as_str().as_bytes();
        // retry only when some other field of the record moved underneath us
        loop {
            let Some(current) = self.employees.get(key)? else {
                return Ok(Swap::Stale);
            };
            let mut employee: Employee = decode("employee", &current)?;
            if employee.leave_balance != *expected {
                return Ok(Swap::Stale);
            }
            employee.leave_balance = *new;
            let updated = encode("employee", &employee)?;
            match swap_raw(&self.employees, key, Some(current.to_vec()), Some(updated))? {
                Swap::Applied => return Ok(Swap::Applied),
                Swap::Stale => continue,
            }
        }
    }

    fn set_active(&self, id: &EmployeeId, active: bool) -> Result<Option<Employee>, StoreError> {
        let key = id.as_str().as_bytes();
        loop {
            let Some(current) = self.employees.get(key)? else {
                return Ok(None);
            };
            let mut employee: Employee = decode("employee", &current)?;
            employee.is_active = active;
            let updated = encode("employee", &employee)?;
            if swap_raw(&self.employees, key, Some(current.to_vec()), Some(updated))?
                == Swap::Applied
            {
                return Ok(Some(employee));
            }
        }
    }

    fn employees(&self) -> Result<Vec<Employee>, StoreError> {
        self.employees
            .iter()
            .values()
            .map(|bytes| decode("employee", &bytes?))
            .collect()
    }
}
