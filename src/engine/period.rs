//! Period derivation: `(start_date, periodicity) -> (effective_date, start_month, end_month)`.
//!
//! Calendar arithmetic delegates to chrono's `Months`, which clamps the day of
//! month to the last day of the target month (Jan 31 + 1 month = Feb 28/29).

use chrono::{Datelike, Months, NaiveDate};

use crate::domain::{Period, Periodicity};
use crate::error::ReadjustError;

/// Unit used by [`add_calendar_unit`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CalendarUnit {
    Month,
    Year,
}

impl From<Periodicity> for CalendarUnit {
    fn from(value: Periodicity) -> Self {
        match value {
            Periodicity::Monthly => CalendarUnit::Month,
            Periodicity::Annual => CalendarUnit::Year,
        }
    }
}

/// Shift `date` by `n` months or years, clamping to the end of the target month.
///
/// Returns `None` only when the result falls outside chrono's supported range.
pub fn add_calendar_unit(date: NaiveDate, unit: CalendarUnit, n: i32) -> Option<NaiveDate> {
    let months = match unit {
        CalendarUnit::Month => n.unsigned_abs(),
        CalendarUnit::Year => n.unsigned_abs().checked_mul(12)?,
    };
    if n >= 0 {
        date.checked_add_months(Months::new(months))
    } else {
        date.checked_sub_months(Months::new(months))
    }
}

pub fn first_day_of_month(date: NaiveDate) -> NaiveDate {
    date.with_day(1).unwrap_or(date)
}

pub fn last_day_of_month(date: NaiveDate) -> NaiveDate {
    first_day_of_month(date)
        .checked_add_months(Months::new(1))
        .and_then(|d| d.pred_opt())
        .unwrap_or(date)
}

/// Derive the readjustment window for a contract.
pub fn derive_period(start_date: NaiveDate, periodicity: Periodicity) -> Result<Period, ReadjustError> {
    let effective_date = add_calendar_unit(start_date, periodicity.into(), 1)
        .ok_or_else(|| ReadjustError::invalid_input(format!("Start date {start_date} is out of range.")))?;
    let before_effective = add_calendar_unit(effective_date, CalendarUnit::Month, -1)
        .ok_or_else(|| ReadjustError::invalid_input(format!("Start date {start_date} is out of range.")))?;

    let start_month = first_day_of_month(start_date);
    let end_month = first_day_of_month(before_effective);

    if end_month < start_month {
        return Err(ReadjustError::InvalidPeriod { start_month, end_month });
    }

    Ok(Period {
        start_date,
        effective_date,
        start_month,
        end_month,
    })
}

impl Period {
    /// First day of every month in `[start_month, end_month]`.
    pub fn months(&self) -> Vec<NaiveDate> {
        let mut out = Vec::new();
        let mut cur = self.start_month;
        while cur <= self.end_month {
            out.push(cur);
            match cur.checked_add_months(Months::new(1)) {
                Some(next) => cur = next,
                None => break,
            }
        }
        out
    }

    pub fn month_count(&self) -> usize {
        let span = (self.end_month.year() - self.start_month.year()) * 12
            + (self.end_month.month() as i32 - self.start_month.month() as i32);
        usize::try_from(span + 1).unwrap_or(0)
    }

    /// Whether `date` falls inside the covered months.
    pub fn contains(&self, date: NaiveDate) -> bool {
        let month = first_day_of_month(date);
        month >= self.start_month && month <= self.end_month
    }

    /// Inclusive day range to request from the source (whole months).
    pub fn fetch_range(&self) -> (NaiveDate, NaiveDate) {
        (self.start_month, last_day_of_month(self.end_month))
    }
}
