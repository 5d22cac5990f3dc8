use chrono::{Datelike, NaiveDate};
use proptest::prelude::*;
use rent_readjust::domain::{
    Observation, Periodicity, RawObservation, ReadjustmentRequest, SeriesDescriptor, ValueKind,
};
use rent_readjust::engine::{apply_lock, compound, derive_period, readjust};

/// Any calendar date between 1995 and 2035.
fn arb_date() -> impl Strategy<Value = NaiveDate> {
    (1995i32..=2035, 1u32..=12, 1u32..=31).prop_filter_map("valid calendar date", |(y, m, d)| {
        NaiveDate::from_ymd_opt(y, m, d)
    })
}

fn arb_periodicity() -> impl Strategy<Value = Periodicity> {
    prop::sample::select(vec![Periodicity::Monthly, Periodicity::Annual])
}

/// Monthly variation in percent, kept well above -100.
fn arb_percent() -> impl Strategy<Value = f64> {
    -5.0f64..5.0
}

fn month_rows(start: NaiveDate, values: &[f64]) -> Vec<RawObservation> {
    values
        .iter()
        .enumerate()
        .map(|(i, v)| {
            let month = start
                .with_day(1)
                .and_then(|d| d.checked_add_months(chrono::Months::new(i as u32)))
                .unwrap();
            RawObservation::number(&month.format("%d/%m/%Y").to_string(), *v)
        })
        .collect()
}

proptest! {
    // ===================================================================
    // Product identity: the factor equals the product of (1 + v/100)
    // over every covered month.
    // ===================================================================
    #[test]
    fn factor_is_product_of_monthly_variations(
        start in arb_date(),
        values in prop::collection::vec(arb_percent(), 12),
    ) {
        let request = ReadjustmentRequest {
            principal: 1000.0,
            start_date: start,
            periodicity: Periodicity::Annual,
            series: SeriesDescriptor::custom(189, ValueKind::Percentage),
            lock_deflation: false,
        };
        let out = readjust(&request, &month_rows(start, &values)).unwrap();

        let expected: f64 = values.iter().map(|v| 1.0 + v / 100.0).product();
        prop_assert!((out.result.factor - expected).abs() <= 1e-9);
        prop_assert!((out.result.new_principal - 1000.0 * expected).abs() <= 1e-6);
        prop_assert_eq!(out.result.observations_used.len(), 12);
    }

    // ===================================================================
    // Lock: never below 1, idempotent, identity when the raw factor >= 1.
    // ===================================================================
    #[test]
    fn lock_is_idempotent_and_floors_at_one(raw in 0.5f64..1.5) {
        let once = apply_lock(raw, true);
        prop_assert!(once >= 1.0);
        prop_assert_eq!(apply_lock(once, true), once);
        if raw >= 1.0 {
            prop_assert_eq!(once, raw);
        }
        prop_assert_eq!(apply_lock(raw, false), raw);
    }

    #[test]
    fn locked_result_never_lowers_rent(
        start in arb_date(),
        values in prop::collection::vec(arb_percent(), 1),
        principal in 1.0f64..100_000.0,
    ) {
        let request = ReadjustmentRequest {
            principal,
            start_date: start,
            periodicity: Periodicity::Monthly,
            series: SeriesDescriptor::custom(433, ValueKind::Percentage),
            lock_deflation: true,
        };
        let out = readjust(&request, &month_rows(start, &values)).unwrap();
        prop_assert!(out.result.factor >= 1.0);
        prop_assert!(out.result.new_principal >= principal);
        prop_assert!(out.result.variation_percent >= 0.0);
    }

    // ===================================================================
    // Period invariants.
    // ===================================================================
    #[test]
    fn period_invariants(start in arb_date(), periodicity in arb_periodicity()) {
        let period = derive_period(start, periodicity).unwrap();

        prop_assert!(period.effective_date > start);
        prop_assert_eq!(period.start_month.day(), 1);
        prop_assert_eq!(period.end_month.day(), 1);
        prop_assert!(period.start_month <= period.end_month);
        prop_assert!(period.end_month < period.effective_date);

        let expected_months = match periodicity {
            Periodicity::Monthly => 1,
            Periodicity::Annual => 12,
        };
        prop_assert_eq!(period.month_count(), expected_months);
        prop_assert_eq!(period.months().len(), expected_months);
    }

    // ===================================================================
    // Input order never changes the result.
    // ===================================================================
    #[test]
    fn shuffled_rows_give_same_factor(
        start in arb_date(),
        values in prop::collection::vec(arb_percent(), 12),
        rotate in 0usize..12,
    ) {
        let period = derive_period(start, Periodicity::Annual).unwrap();
        let rows = month_rows(start, &values);
        let mut rotated = rows.clone();
        rotated.rotate_left(rotate);

        let a = rent_readjust::engine::normalize(&rows);
        let b = rent_readjust::engine::normalize(&rotated);
        let fa = compound(&a.observations, ValueKind::Percentage, &period).unwrap();
        let fb = compound(&b.observations, ValueKind::Percentage, &period).unwrap();
        prop_assert_eq!(fa.raw_factor, fb.raw_factor);
    }

    // ===================================================================
    // Level series: factor is last / first for any positive levels.
    // ===================================================================
    #[test]
    fn level_factor_is_ratio(first in 1.0f64..10_000.0, last in 1.0f64..10_000.0) {
        let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let period = derive_period(start, Periodicity::Annual).unwrap();
        let observations = vec![
            Observation::new(start, first),
            Observation::new(NaiveDate::from_ymd_opt(2024, 12, 1).unwrap(), last),
        ];
        let out = compound(&observations, ValueKind::Level, &period).unwrap();
        prop_assert!((out.raw_factor - last / first).abs() <= 1e-12 * (last / first).max(1.0));
    }
}
