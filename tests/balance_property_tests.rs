//! Property-based tests for leave balance arithmetic and working day counts
//!
//! Every balance the ledger can produce must satisfy `total == available + used`,
//! whatever sequence of debits, credits, adjustments and allowance changes led to it.
//! Failed operations must leave the balance exactly as it was.

use chrono::{Datelike, Duration, NaiveDate, Weekday};
use leave_approval::{dates::count_weekdays, employee::LeaveBalance};
use proptest::prelude::*;

#[derive(Debug, Clone)]
enum Op {
    Debit(u32),
    Credit(u32),
    Adjust(i64),
    SetTotal(u32),
}

fn op_strategy() -> impl Strategy<Value = Op> {
    prop_oneof![
        (0u32..40).prop_map(Op::Debit),
        (0u32..40).prop_map(Op::Credit),
        (-40i64..40).prop_map(Op::Adjust),
        (0u32..60).prop_map(Op::SetTotal),
    ]
}

fn apply(balance: &LeaveBalance, op: &Op) -> Option<LeaveBalance> {
    match op {
        Op::Debit(days) => balance.debit(*days).ok(),
        Op::Credit(days) => balance.credit(*days).ok(),
        Op::Adjust(delta) => balance.adjust(*delta).ok(),
        Op::SetTotal(total) => balance.with_total(*total).ok(),
    }
}

fn date_strategy() -> impl Strategy<Value = NaiveDate> {
    (0i64..3650).prop_map(|offset| {
        NaiveDate::from_ymd_opt(2025, 1, 1).unwrap_or_default() + Duration::days(offset)
    })
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(256))]

    #[test]
    fn prop_balance_invariant_survives_any_sequence(
        start in 0u32..60,
        ops in prop::collection::vec(op_strategy(), 0..40),
    ) {
        let mut balance = LeaveBalance::new(start);
        for op in &ops {
            if let Some(next) = apply(&balance, op) {
                balance = next;
            }
            prop_assert!(
                balance.is_consistent(),
                "total {} != available {} + used {} after {:?}",
                balance.total(), balance.available(), balance.used(), op
            );
        }
    }

    #[test]
    fn prop_debit_then_credit_is_identity(start in 0u32..60, days in 0u32..60) {
        let balance = LeaveBalance::new(start);
        match balance.debit(days) {
            Ok(debited) => prop_assert_eq!(debited.credit(days).unwrap(), balance),
            Err(_) => prop_assert!(days > start),
        }
    }

    #[test]
    fn prop_adjust_by_difference_matches_fresh_debit(
        start in 10u32..60,
        old_days in 0u32..10,
        new_days in 0u32..10,
    ) {
        // editing a request from old_days to new_days lands where submitting new_days would
        let submitted = LeaveBalance::new(start).debit(old_days).unwrap();
        let edited = submitted.adjust(i64::from(new_days) - i64::from(old_days)).unwrap();
        prop_assert_eq!(edited, LeaveBalance::new(start).debit(new_days).unwrap());
    }

    #[test]
    fn prop_weekday_count_is_bounded_by_span(from in date_strategy(), length in 0i64..60) {
        let to = from + Duration::days(length);
        let count = i64::from(count_weekdays(from, to));
        let span = length + 1;

        prop_assert!(count <= span);
        // any seven consecutive days hold exactly five weekdays
        prop_assert!(count >= span / 7 * 5);
        prop_assert!(count <= (span + 6) / 7 * 5);
    }

    #[test]
    fn prop_single_day_counts_iff_weekday(day in date_strategy()) {
        let expected = u32::from(!matches!(day.weekday(), Weekday::Sat | Weekday::Sun));
        prop_assert_eq!(count_weekdays(day, day), expected);
    }

    #[test]
    fn prop_reversed_range_counts_nothing(from in date_strategy(), back in 1i64..60) {
        prop_assert_eq!(count_weekdays(from, from - Duration::days(back)), 0);
    }
}
