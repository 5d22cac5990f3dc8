use std::cell::Cell;

use approx::assert_relative_eq;
use chrono::NaiveDate;
use rent_readjust::app::pipeline::{fetch_normalized, run_readjustment};
use rent_readjust::data::{CachedSource, SeriesQuery, SeriesSource, StaticSource};
use rent_readjust::domain::{
    IndexKey, Period, Periodicity, RawObservation, ReadjustmentRequest, SeriesCode, SeriesDescriptor, ValueKind,
};
use rent_readjust::engine::{compound, derive_period};
use rent_readjust::error::ReadjustError;

fn d(y: i32, m: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, day).unwrap()
}

fn request(principal: f64, start: NaiveDate, periodicity: Periodicity, series: SeriesDescriptor) -> ReadjustmentRequest {
    ReadjustmentRequest {
        principal,
        start_date: start,
        periodicity,
        series,
        lock_deflation: false,
    }
}

/// Twelve monthly rows for 2024 with the given percentages, zero elsewhere.
fn year_2024(overrides: &[(u32, &str)]) -> Vec<RawObservation> {
    (1..=12)
        .map(|m| {
            let value = overrides.iter().find(|(month, _)| *month == m).map_or("0", |(_, v)| *v);
            RawObservation::text(&format!("01/{m:02}/2024"), value)
        })
        .collect()
}

/// Counts fetches so tests can assert the source was (not) contacted.
struct CountingSource {
    inner: StaticSource,
    calls: Cell<usize>,
}

impl SeriesSource for CountingSource {
    fn fetch(&self, query: &SeriesQuery) -> Result<Vec<RawObservation>, ReadjustError> {
        self.calls.set(self.calls.get() + 1);
        self.inner.fetch(query)
    }

    fn describe(&self) -> String {
        "counting".to_string()
    }
}

/// One covered month at 0,50% turns 1000 into 1005.
#[test]
fn single_month_percentage() {
    let source = StaticSource::new().with_series(
        SeriesCode(433),
        vec![
            RawObservation::text("01/12/2023", "9.99"),
            RawObservation::text("01/01/2024", "0,50"),
            RawObservation::text("01/02/2024", "9.99"),
        ],
    );
    let req = request(1000.0, d(2024, 1, 10), Periodicity::Monthly, IndexKey::Ipca.descriptor());
    let out = run_readjustment(&req, &source).unwrap();

    assert_relative_eq!(out.result.factor, 1.005, max_relative = 1e-12);
    assert_relative_eq!(out.result.variation_percent, 0.5, max_relative = 1e-9);
    assert_relative_eq!(out.result.new_principal, 1005.0, max_relative = 1e-12);
    assert_eq!(out.result.effective_date, d(2024, 2, 10));
    assert_eq!(out.result.observations_used.len(), 1);
}

/// Annual deflation with the lock on keeps the rent unchanged.
#[test]
fn locked_deflation_keeps_rent() {
    let source = StaticSource::new().with_series(SeriesCode(189), year_2024(&[(1, "-1,0"), (2, "-2,0")]));
    let mut req = request(2000.0, d(2024, 1, 15), Periodicity::Annual, IndexKey::Igpm.descriptor());
    req.lock_deflation = true;

    let out = run_readjustment(&req, &source).unwrap();
    assert_relative_eq!(out.diagnostics.raw_factor, 0.99 * 0.98, max_relative = 1e-12);
    assert_eq!(out.result.factor, 1.0);
    assert_eq!(out.result.new_principal, 2000.0);
    assert_eq!(out.result.variation_percent, 0.0);
    assert_eq!(out.result.effective_date, d(2025, 1, 15));
    assert_eq!(out.breakdown.len(), 12);
}

/// Same rows without the lock: the rent goes down.
#[test]
fn unlocked_deflation_lowers_rent() {
    let source = StaticSource::new().with_series(SeriesCode(189), year_2024(&[(1, "-1,0"), (2, "-2,0")]));
    let req = request(2000.0, d(2024, 1, 15), Periodicity::Annual, IndexKey::Igpm.descriptor());

    let out = run_readjustment(&req, &source).unwrap();
    assert_relative_eq!(out.result.factor, 0.9702, max_relative = 1e-12);
    assert_relative_eq!(out.result.new_principal, 1940.4, max_relative = 1e-12);
}

/// Two-month window compounded directly.
#[test]
fn two_month_product() {
    let period = Period {
        start_date: d(2024, 1, 1),
        effective_date: d(2024, 3, 1),
        start_month: d(2024, 1, 1),
        end_month: d(2024, 2, 1),
    };
    let rows = vec![
        RawObservation::text("01/02/2024", "-2.0"),
        RawObservation::text("01/01/2024", "-1.0"),
    ];
    let normalized = rent_readjust::engine::normalize(&rows);
    let out = compound(&normalized.observations, ValueKind::Percentage, &period).unwrap();
    assert_relative_eq!(out.raw_factor, 0.9702, max_relative = 1e-12);
    assert_eq!(out.used[0].date, d(2024, 1, 1));
}

/// Level series: last / first inside the period.
#[test]
fn level_series_ratio() {
    let source = StaticSource::new().with_series(
        SeriesCode(11773),
        vec![
            RawObservation::number("01/01/2024", 100.0),
            RawObservation::number("01/06/2024", 104.0),
            RawObservation::number("01/12/2024", 110.0),
        ],
    );
    let req = request(
        1000.0,
        d(2024, 1, 1),
        Periodicity::Annual,
        SeriesDescriptor::custom(11773, ValueKind::Level),
    );
    let out = run_readjustment(&req, &source).unwrap();

    assert_relative_eq!(out.result.factor, 1.1, max_relative = 1e-12);
    assert_relative_eq!(out.result.variation_percent, 10.0, max_relative = 1e-9);
    assert_relative_eq!(out.breakdown[1].cumulative_factor, 1.04, max_relative = 1e-12);
}

#[test]
fn missing_february_is_reported() {
    let source = StaticSource::new().with_series(
        SeriesCode(189),
        year_2024(&[]).into_iter().filter(|r| r.date != "01/02/2024").collect(),
    );
    let req = request(1000.0, d(2024, 1, 10), Periodicity::Annual, IndexKey::Igpm.descriptor());

    let err = run_readjustment(&req, &source).unwrap_err();
    assert_eq!(err, ReadjustError::MissingMonth { month: d(2024, 2, 1) });
}

#[test]
fn missing_month_in_three_month_window() {
    let period = Period {
        start_date: d(2024, 1, 5),
        effective_date: d(2024, 4, 5),
        start_month: d(2024, 1, 1),
        end_month: d(2024, 3, 1),
    };
    let rows = vec![
        RawObservation::text("01/01/2024", "0.4"),
        RawObservation::text("01/03/2024", "0.3"),
    ];
    let normalized = rent_readjust::engine::normalize(&rows);
    let err = compound(&normalized.observations, ValueKind::Percentage, &period).unwrap_err();
    assert!(err.to_string().contains("02/2024"), "{err}");
}

#[test]
fn empty_answer_is_insufficient_data() {
    let source = StaticSource::new().with_series(SeriesCode(433), Vec::new());
    let req = request(1000.0, d(2024, 1, 10), Periodicity::Annual, IndexKey::Ipca.descriptor());

    let err = run_readjustment(&req, &source).unwrap_err();
    assert_eq!(err, ReadjustError::InsufficientData { required: 12, found: 0 });
}

#[test]
fn invalid_principal_never_fetches() {
    let source = CountingSource {
        inner: StaticSource::new().with_series(SeriesCode(433), year_2024(&[])),
        calls: Cell::new(0),
    };
    for principal in [0.0, -5.0, f64::NAN, f64::INFINITY] {
        let req = request(principal, d(2024, 1, 10), Periodicity::Annual, IndexKey::Ipca.descriptor());
        let err = run_readjustment(&req, &source).unwrap_err();
        assert!(matches!(err, ReadjustError::InvalidInput(_)), "{principal}: {err:?}");
    }
    assert_eq!(source.calls.get(), 0);
}

#[test]
fn unknown_series_is_upstream_error() {
    let source = StaticSource::new();
    let req = request(1000.0, d(2024, 1, 10), Periodicity::Monthly, IndexKey::Ipca.descriptor());
    let err = run_readjustment(&req, &source).unwrap_err();
    assert!(matches!(err, ReadjustError::UpstreamUnavailable { status: Some(404), .. }));
}

#[test]
fn garbage_rows_are_dropped_and_reported() {
    let source = StaticSource::new().with_series(
        SeriesCode(433),
        vec![
            RawObservation::text("01/01/2024", "0.50"),
            RawObservation::text("01/01/2024", "0.70"),
            RawObservation::text("not a date", "1.0"),
            RawObservation::text("01/01/2024", ""),
        ],
    );
    let req = request(1000.0, d(2024, 1, 10), Periodicity::Monthly, IndexKey::Ipca.descriptor());
    let out = run_readjustment(&req, &source).unwrap();

    assert_relative_eq!(out.result.new_principal, 1005.0, max_relative = 1e-12);
    assert_eq!(out.diagnostics.dropped.len(), 2);
    assert_eq!(out.diagnostics.duplicates, 1);
}

#[test]
fn cached_pipeline_fetches_once() {
    let counting = CountingSource {
        inner: StaticSource::new().with_series(SeriesCode(433), year_2024(&[(1, "0.5")])),
        calls: Cell::new(0),
    };
    let cached = CachedSource::new(counting, std::time::Duration::from_secs(60));
    let req = request(1000.0, d(2024, 1, 10), Periodicity::Monthly, IndexKey::Ipca.descriptor());

    let first = run_readjustment(&req, &cached).unwrap();
    let second = run_readjustment(&req, &cached).unwrap();
    assert_eq!(first, second);
    assert_eq!(cached.inner().calls.get(), 1);
}

#[test]
fn fetch_normalized_sorts_rows() {
    let source = StaticSource::new().with_series(
        SeriesCode(433),
        vec![
            RawObservation::text("01/03/2024", "0.3"),
            RawObservation::text("01/01/2024", "0.1"),
            RawObservation::text("01/02/2024", "0.2"),
        ],
    );
    let query = SeriesQuery::new(SeriesCode(433), d(2024, 1, 1), d(2024, 3, 1)).unwrap();
    let normalized = fetch_normalized(&query, &source).unwrap();
    let dates: Vec<NaiveDate> = normalized.observations.iter().map(|o| o.date).collect();
    assert_eq!(dates, vec![d(2024, 1, 1), d(2024, 2, 1), d(2024, 3, 1)]);
}

#[test]
fn end_of_month_start_clamps() {
    let period = derive_period(d(2024, 1, 31), Periodicity::Monthly).unwrap();
    assert_eq!(period.effective_date, d(2024, 2, 29));
    assert_eq!(period.start_month, d(2024, 1, 1));
    assert_eq!(period.end_month, d(2024, 1, 1));

    let period = derive_period(d(2024, 2, 29), Periodicity::Annual).unwrap();
    assert_eq!(period.effective_date, d(2025, 2, 28));
    assert_eq!(period.end_month, d(2025, 1, 1));
}
