//! Compounding: fold monthly observations into one multiplicative factor.
//!
//! - percentage series: `Π(1 + v_i / 100)` over every covered month
//! - level series: `last / first` inside the covered months
//!
//! Pure and deterministic: plain f64 arithmetic, no rounding, no I/O.

use std::collections::BTreeMap;

use chrono::NaiveDate;

use crate::domain::{Observation, Period, ValueKind};
use crate::engine::period::first_day_of_month;
use crate::error::ReadjustError;

/// Raw (unlocked) compounding output.
#[derive(Debug, Clone, PartialEq)]
pub struct Compounded {
    pub raw_factor: f64,
    /// Observations that entered the factor, ascending by date.
    pub used: Vec<Observation>,
}

/// Compound `observations` (sorted ascending) over `period` for a series of `kind`.
pub fn compound(
    observations: &[Observation],
    kind: ValueKind,
    period: &Period,
) -> Result<Compounded, ReadjustError> {
    let in_period: Vec<Observation> = observations
        .iter()
        .copied()
        .filter(|o| period.contains(o.date))
        .collect();

    let compounded = match kind {
        ValueKind::Percentage => compound_percentage(&in_period, period)?,
        ValueKind::Level => compound_level(&in_period)?,
    };

    if !(compounded.raw_factor.is_finite() && compounded.raw_factor > 0.0) {
        return Err(ReadjustError::NonPositiveFactor {
            factor: compounded.raw_factor,
        });
    }
    Ok(compounded)
}

fn compound_percentage(in_period: &[Observation], period: &Period) -> Result<Compounded, ReadjustError> {
    let months = period.months();
    if in_period.is_empty() {
        return Err(ReadjustError::InsufficientData {
            required: months.len(),
            found: 0,
        });
    }

    // One observation per month; the first one seen (earliest date) wins.
    let mut by_month: BTreeMap<NaiveDate, Observation> = BTreeMap::new();
    for o in in_period {
        by_month.entry(first_day_of_month(o.date)).or_insert(*o);
    }

    let mut factor = 1.0_f64;
    let mut used = Vec::with_capacity(months.len());
    for month in months {
        let Some(o) = by_month.get(&month) else {
            return Err(ReadjustError::MissingMonth { month });
        };
        factor *= 1.0 + o.value / 100.0;
        used.push(*o);
    }

    Ok(Compounded {
        raw_factor: factor,
        used,
    })
}

fn compound_level(in_period: &[Observation]) -> Result<Compounded, ReadjustError> {
    let (Some(first), Some(last)) = (in_period.first(), in_period.last()) else {
        return Err(ReadjustError::InsufficientData { required: 2, found: 0 });
    };
    if in_period.len() < 2 {
        return Err(ReadjustError::InsufficientData {
            required: 2,
            found: in_period.len(),
        });
    }
    if first.value == 0.0 {
        return Err(ReadjustError::DivisionByZero { date: first.date });
    }

    Ok(Compounded {
        raw_factor: last.value / first.value,
        used: in_period.to_vec(),
    })
}

/// Apply the deflation lock: never let the factor fall below 1.
pub fn apply_lock(raw_factor: f64, lock_deflation: bool) -> f64 {
    if lock_deflation { raw_factor.max(1.0) } else { raw_factor }
}

/// `(factor - 1) * 100`.
pub fn variation_percent(factor: f64) -> f64 {
    (factor - 1.0) * 100.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Periodicity;
    use crate::engine::period::derive_period;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn quarter() -> Period {
        // Jan..Mar 2024 covered.
        Period {
            start_date: d(2024, 1, 15),
            effective_date: d(2024, 4, 15),
            start_month: d(2024, 1, 1),
            end_month: d(2024, 3, 1),
        }
    }

    #[test]
    fn percentage_product() {
        let obs = vec![
            Observation::new(d(2024, 1, 1), 0.42),
            Observation::new(d(2024, 2, 1), 0.83),
            Observation::new(d(2024, 3, 1), 0.16),
        ];
        let out = compound(&obs, ValueKind::Percentage, &quarter()).unwrap();
        let expected = 1.0042 * 1.0083 * 1.0016;
        assert!((out.raw_factor - expected).abs() < 1e-12);
        assert_eq!(out.used.len(), 3);
    }

    #[test]
    fn all_zero_months_give_unit_factor() {
        let obs: Vec<_> = quarter().months().into_iter().map(|m| Observation::new(m, 0.0)).collect();
        let out = compound(&obs, ValueKind::Percentage, &quarter()).unwrap();
        assert_eq!(out.raw_factor, 1.0);
    }

    #[test]
    fn missing_month_names_first_gap() {
        let obs = vec![
            Observation::new(d(2024, 1, 1), 0.42),
            Observation::new(d(2024, 3, 1), 0.16),
        ];
        let err = compound(&obs, ValueKind::Percentage, &quarter()).unwrap_err();
        assert_eq!(err, ReadjustError::MissingMonth { month: d(2024, 2, 1) });
    }

    #[test]
    fn observations_outside_period_are_ignored() {
        let period = derive_period(d(2024, 1, 10), Periodicity::Monthly).unwrap();
        let obs = vec![
            Observation::new(d(2023, 12, 1), 5.0),
            Observation::new(d(2024, 1, 1), 0.5),
            Observation::new(d(2024, 2, 1), 5.0),
        ];
        let out = compound(&obs, ValueKind::Percentage, &period).unwrap();
        assert!((out.raw_factor - 1.005).abs() < 1e-12);
        assert_eq!(out.used, vec![Observation::new(d(2024, 1, 1), 0.5)]);
    }

    #[test]
    fn empty_percentage_is_insufficient() {
        let err = compound(&[], ValueKind::Percentage, &quarter()).unwrap_err();
        assert_eq!(err, ReadjustError::InsufficientData { required: 3, found: 0 });
    }

    #[test]
    fn level_ratio() {
        let obs = vec![
            Observation::new(d(2024, 1, 1), 100.0),
            Observation::new(d(2024, 2, 1), 105.0),
            Observation::new(d(2024, 3, 1), 110.0),
        ];
        let out = compound(&obs, ValueKind::Level, &quarter()).unwrap();
        assert!((out.raw_factor - 1.1).abs() < 1e-12);
    }

    #[test]
    fn level_zero_first_is_division_by_zero() {
        let obs = vec![
            Observation::new(d(2024, 1, 1), 0.0),
            Observation::new(d(2024, 2, 1), 110.0),
        ];
        let err = compound(&obs, ValueKind::Level, &quarter()).unwrap_err();
        assert_eq!(err, ReadjustError::DivisionByZero { date: d(2024, 1, 1) });
    }

    #[test]
    fn level_needs_two_points() {
        let obs = vec![Observation::new(d(2024, 1, 1), 100.0)];
        let err = compound(&obs, ValueKind::Level, &quarter()).unwrap_err();
        assert_eq!(err, ReadjustError::InsufficientData { required: 2, found: 1 });
    }

    #[test]
    fn negative_level_is_rejected() {
        let obs = vec![
            Observation::new(d(2024, 1, 1), -100.0),
            Observation::new(d(2024, 2, 1), 110.0),
        ];
        let err = compound(&obs, ValueKind::Level, &quarter()).unwrap_err();
        assert!(matches!(err, ReadjustError::NonPositiveFactor { .. }));
    }

    #[test]
    fn total_loss_month_is_rejected() {
        let period = derive_period(d(2024, 1, 10), Periodicity::Monthly).unwrap();
        let obs = vec![Observation::new(d(2024, 1, 1), -100.0)];
        let err = compound(&obs, ValueKind::Percentage, &period).unwrap_err();
        assert_eq!(err, ReadjustError::NonPositiveFactor { factor: 0.0 });
    }

    #[test]
    fn lock_is_idempotent() {
        for f in [0.5, 0.9702, 1.0, 1.2] {
            assert_eq!(apply_lock(apply_lock(f, true), true), apply_lock(f, true));
            assert_eq!(apply_lock(f, false), f);
        }
        assert_eq!(apply_lock(0.9702, true), 1.0);
    }
}
