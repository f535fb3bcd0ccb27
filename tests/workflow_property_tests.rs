//! Property-based tests for the approval state machine and display status derivation
//!
//! Random decisions by random actors are thrown at a request. Whatever happens, the
//! stage never moves backwards, the flow only grows, a closed request stays closed,
//! and only a GED (or admin) decision at the last stage can approve it.
//!
//! What these tests DON'T cover: persistence and ledger compensation, which live in
//! the integration tests.

use chrono::{Duration, NaiveDate};
use leave_approval::{
    approval::{LedgerEffect, advance},
    dates::{LeaveDate, TimeStamp},
    employee::{Actor, Employee, EmployeeId, EmployeeProfile, Role},
    leave::{Decision, LeaveId, LeaveRequest, LeaveStatus, LeaveType, Stage, ValidApplication},
    lifecycle::derive_display_status,
};
use proptest::prelude::*;

fn base_day() -> NaiveDate {
    NaiveDate::from_ymd_opt(2026, 11, 2).unwrap_or_default()
}

fn owner() -> Employee {
    Employee::new(EmployeeProfile::new("Uche", "Nwosu", "NOC", Role::Employee), 28).unwrap()
}

fn request(owner: &Employee) -> LeaveRequest {
    LeaveRequest::submit(
        LeaveId::new().unwrap(),
        owner.id.clone(),
        ValidApplication {
            leave_type: LeaveType::Sick,
            from_date: LeaveDate::from(base_day()),
            to_date: LeaveDate::from(base_day() + Duration::days(4)),
            total_days: 5,
            reason: "recovery".into(),
            reliever_id: EmployeeId::new().unwrap(),
        },
        TimeStamp::new(),
    )
}

fn actor_strategy() -> impl Strategy<Value = Actor> {
    (
        prop_oneof![
            Just(Role::Employee),
            Just(Role::Hod),
            Just(Role::Hr),
            Just(Role::Ged),
            Just(Role::Admin),
        ],
        prop_oneof![Just("NOC"), Just("MARKETING")],
    )
        .prop_map(|(role, department)| Actor {
            id: EmployeeId::new().unwrap(),
            role,
            department: department.to_string(),
            is_hod: role == Role::Hod,
        })
}

fn stage_strategy() -> impl Strategy<Value = Option<Stage>> {
    prop_oneof![
        Just(None),
        Just(Some(Stage::Hod)),
        Just(Some(Stage::Hr)),
        Just(Some(Stage::Ged)),
    ]
}

fn decision_strategy() -> impl Strategy<Value = (Decision, Option<&'static str>)> {
    prop_oneof![
        Just((Decision::Approved, None)),
        Just((Decision::Rejected, Some("no cover"))),
        Just((Decision::Rejected, None)),
    ]
}

fn status_strategy() -> impl Strategy<Value = LeaveStatus> {
    prop_oneof![
        Just(LeaveStatus::Pending),
        Just(LeaveStatus::Approved),
        Just(LeaveStatus::Active),
        Just(LeaveStatus::Over),
        Just(LeaveStatus::Rejected),
        Just(LeaveStatus::Cancelled),
    ]
}

fn rank(status: LeaveStatus) -> u8 {
    match status {
        LeaveStatus::Approved => 0,
        LeaveStatus::Active => 1,
        LeaveStatus::Over => 2,
        _ => 0,
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(128))]

    #[test]
    fn prop_decisions_only_move_forward(
        steps in prop::collection::vec(
            (actor_strategy(), stage_strategy(), decision_strategy()),
            0..30,
        ),
    ) {
        let owner = owner();
        let mut leave = request(&owner);
        let mut refunded = 0u32;

        for (actor, expected, (decision, comments)) in steps {
            let before = leave.clone();
            let at = TimeStamp::new();
            match advance(&leave, &actor, &owner, expected, decision, comments, at) {
                Ok(transition) => {
                    let next = transition.leave;
                    prop_assert_eq!(before.status, LeaveStatus::Pending);
                    prop_assert!(next.stage >= before.stage);
                    prop_assert_eq!(next.approval_flow.len(), before.approval_flow.len() + 1);
                    let kept = before.approval_flow.len();
                    prop_assert_eq!(&next.approval_flow[..kept], &before.approval_flow[..]);

                    if next.status == LeaveStatus::Approved {
                        prop_assert_eq!(before.stage, Stage::Ged);
                        prop_assert!(actor.role == Role::Ged || actor.role == Role::Admin);
                    }
                    if let LedgerEffect::Credit(days) = transition.effect {
                        prop_assert_eq!(next.status, LeaveStatus::Rejected);
                        refunded += days;
                    }
                    leave = next;
                }
                Err(_) => continue,
            }
        }

        // a request is refunded at most once
        prop_assert!(refunded <= leave.total_days);
        if leave.status == LeaveStatus::Rejected {
            prop_assert_eq!(refunded, leave.total_days);
        }
    }

    #[test]
    fn prop_display_status_is_idempotent(status in status_strategy(), offset in -10i64..20) {
        let owner = owner();
        let mut leave = request(&owner);
        leave.status = status;
        let today = base_day() + Duration::days(offset);

        let once = derive_display_status(&leave, today);
        leave.status = once;
        prop_assert_eq!(derive_display_status(&leave, today), once);
    }

    #[test]
    fn prop_display_status_never_reverses(
        status in prop_oneof![Just(LeaveStatus::Approved), Just(LeaveStatus::Active)],
        first in -10i64..20,
        later in 0i64..20,
    ) {
        let owner = owner();
        let mut leave = request(&owner);
        leave.status = status;
        let day = base_day() + Duration::days(first);

        let earlier = derive_display_status(&leave, day);
        prop_assert!(rank(earlier) >= rank(status));
        leave.status = earlier;
        let after = derive_display_status(&leave, day + Duration::days(later));
        prop_assert!(rank(after) >= rank(earlier));
    }

    #[test]
    fn prop_undecided_and_closed_statuses_are_fixed(
        status in prop_oneof![
            Just(LeaveStatus::Pending),
            Just(LeaveStatus::Rejected),
            Just(LeaveStatus::Cancelled),
            Just(LeaveStatus::Over),
        ],
        offset in -30i64..60,
    ) {
        let owner = owner();
        let mut leave = request(&owner);
        leave.status = status;
        prop_assert_eq!(derive_display_status(&leave, base_day() + Duration::days(offset)), status);
    }
}
