#![allow(dead_code)]

use chrono::NaiveDate;
use leave_approval::{
    Actor, Employee, EmployeeProfile, EmployeeStore, FixedClock, LeaveApplication, LeaveConfig,
    LeaveService, LeaveStore, Role, SledStore,
};
use std::sync::Arc;
use tempfile::{TempDir, tempdir};

/// Monday 19 October 2026
pub fn today() -> NaiveDate {
    NaiveDate::from_ymd_opt(2026, 10, 19).expect("valid date")
}

pub fn day(month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2026, month, day).expect("valid date")
}

/// A small organisation: one requester in NOC, a colleague to relieve them,
/// and one approver for every stage.
pub struct Office<S> {
    pub store: Arc<S>,
    pub service: LeaveService<S>,
    pub employee: Employee,
    pub reliever: Employee,
    pub hod: Employee,
    pub other_hod: Employee,
    pub hr: Employee,
    pub ged: Employee,
    pub admin: Employee,
}

impl<S: LeaveStore + EmployeeStore> Office<S> {
    pub fn build(store: Arc<S>) -> anyhow::Result<Self> {
        let service = service_on(store.clone(), today());
        let register = |first: &str, department: &str, role: Role| {
            service.register_employee(EmployeeProfile::new(first, "Test", department, role))
        };

        Ok(Self {
            employee: register("Bola", "NOC", Role::Employee)?,
            reliever: register("Chidi", "NOC", Role::Employee)?,
            hod: register("Dayo", "NOC", Role::Hod)?,
            other_hod: register("Efe", "MARKETING", Role::Hod)?,
            hr: register("Funke", "HUMAN RESOURCES", Role::Hr)?,
            ged: register("Gbenga", "EXECUTIVE", Role::Ged)?,
            admin: register("Halima", "IT", Role::Admin)?,
            store,
            service,
        })
    }

    /// A second view of the same data with the clock set to `on`
    pub fn on(&self, on: NaiveDate) -> LeaveService<S> {
        service_on(self.store.clone(), on)
    }

    pub fn application(&self, from: &str, to: &str) -> LeaveApplication {
        LeaveApplication::new()
            .set_leave_type("Annual Leave")
            .set_from_date(from)
            .set_to_date(to)
            .set_reason("family visit")
            .set_reliever(self.reliever.id.as_str())
    }

    pub fn actor(employee: &Employee) -> Actor {
        Actor::from(employee)
    }
}

pub fn service_on<S: LeaveStore + EmployeeStore>(store: Arc<S>, on: NaiveDate) -> LeaveService<S> {
    LeaveService::with_clock(store, LeaveConfig::default(), Arc::new(FixedClock::on(on)))
}

/// A sled backed office in a fresh temporary directory. Keep the `TempDir` alive.
pub fn sled_office() -> anyhow::Result<(TempDir, Office<SledStore>)> {
    let temp_dir = tempdir()?;
    let db = sled::open(temp_dir.path().join("leave.db"))?;
    let store = Arc::new(SledStore::new(Arc::new(db))?);
    let office = Office::build(store)?;
    Ok((temp_dir, office))
}
