use crate::error::AnalyticsError;
use chrono::{DateTime, Datelike, Duration, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// An inclusive range of calendar days.
///
/// Both boundaries are inclusive: a row dated anywhere on `end` belongs to the
/// period. The day after `end` is the `start` of the following period.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FiscalPeriod {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl FiscalPeriod {
    /// Midnight UTC at the beginning of the first day.
    pub fn start_instant(&self) -> DateTime<Utc> {
        self.start.and_time(NaiveTime::MIN).and_utc()
    }

    /// The last microsecond of the final day, UTC.
    pub fn end_instant(&self) -> DateTime<Utc> {
        self.end.and_time(NaiveTime::MIN).and_utc() + Duration::days(1) - Duration::microseconds(1)
    }

    pub fn contains(&self, instant: DateTime<Utc>) -> bool {
        self.start_instant() <= instant && instant <= self.end_instant()
    }

    pub fn num_days(&self) -> i64 {
        (self.end - self.start).num_days() + 1
    }
}

impl fmt::Display for FiscalPeriod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}..{}", self.start, self.end)
    }
}

/// A quarter of a fiscal year. `fiscal_year` is the calendar year in which
/// the fiscal year starts; `index` runs from 1 to 4.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FiscalQuarter {
    pub fiscal_year: i32,
    pub index: u8,
}

impl FiscalQuarter {
    pub fn next(&self) -> FiscalQuarter {
        if self.index == 4 {
            FiscalQuarter { fiscal_year: self.fiscal_year + 1, index: 1 }
        } else {
            FiscalQuarter { fiscal_year: self.fiscal_year, index: self.index + 1 }
        }
    }
}

impl fmt::Display for FiscalQuarter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "FY{} Q{}", self.fiscal_year, self.index)
    }
}

/// The quarter containing the reference instant and the quarter it is compared against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuarterWindow {
    pub current_quarter: FiscalQuarter,
    pub current: FiscalPeriod,
    pub prior_quarter: FiscalQuarter,
    pub prior: FiscalPeriod,
}

/// Fiscal calendar whose year begins on the 1st of `start_month`.
///
/// Quarters are fixed three-month buckets anchored at the start month, so
/// with an April start they are Apr-Jun, Jul-Sep, Oct-Dec and Jan-Mar, the
/// last one belonging to the fiscal year that started the previous April.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FiscalCalendar {
    start_month: u32,
}

impl Default for FiscalCalendar {
    fn default() -> Self {
        Self { start_month: 4 }
    }
}

impl FiscalCalendar {
    pub fn new(start_month: u32) -> Result<Self, AnalyticsError> {
        if !(1..=12).contains(&start_month) {
            return Err(AnalyticsError::InvalidStartMonth(start_month));
        }
        Ok(Self { start_month })
    }

    pub fn start_month(&self) -> u32 {
        self.start_month
    }

    /// Returns the fiscal quarter a calendar day falls in.
    pub fn quarter_of(&self, date: NaiveDate) -> FiscalQuarter {
        let fiscal_year = if date.month() >= self.start_month {
            date.year()
        } else {
            date.year() - 1
        };
        let months_into_year = (date.month() + 12 - self.start_month) % 12;
        FiscalQuarter {
            fiscal_year,
            index: (months_into_year / 3 + 1) as u8,
        }
    }

    /// Computes the first and last day of a fiscal quarter.
    pub fn period_of(&self, quarter: FiscalQuarter) -> Result<FiscalPeriod, AnalyticsError> {
        let offset = (self.start_month as i32 - 1) + 3 * (quarter.index as i32 - 1);
        let start = self.first_of_month(quarter.fiscal_year, offset)?;
        // Always step back from a synthesized first-of-month, so month lengths
        // and leap years never matter.
        let end = self
            .first_of_month(quarter.fiscal_year, offset + 3)?
            .pred_opt()
            .ok_or_else(|| AnalyticsError::DateOutOfRange(format!("end of {quarter}")))?;
        Ok(FiscalPeriod { start, end })
    }

    /// The quarter a KPI for `current` is compared against.
    ///
    /// Within a fiscal year this is the preceding quarter. The opening quarter
    /// of a fiscal year is compared against the third quarter of the previous
    /// fiscal year (Oct-Dec for an April start), never against the quarter
    /// that closed the previous fiscal year.
    pub fn comparison_quarter(&self, current: FiscalQuarter) -> FiscalQuarter {
        if current.index == 1 {
            FiscalQuarter { fiscal_year: current.fiscal_year - 1, index: 3 }
        } else {
            FiscalQuarter { fiscal_year: current.fiscal_year, index: current.index - 1 }
        }
    }

    /// Resolves the current and prior quarter for a reference instant.
    pub fn resolve(&self, reference: DateTime<Utc>) -> Result<QuarterWindow, AnalyticsError> {
        let current_quarter = self.quarter_of(reference.date_naive());
        let prior_quarter = self.comparison_quarter(current_quarter);
        let window = QuarterWindow {
            current_quarter,
            current: self.period_of(current_quarter)?,
            prior_quarter,
            prior: self.period_of(prior_quarter)?,
        };
        tracing::debug!(
            %reference,
            current = %window.current,
            prior = %window.prior,
            "Resolved fiscal quarter window."
        );
        Ok(window)
    }

    /// First day of the month `offset` months after January of `fiscal_year`.
    fn first_of_month(&self, fiscal_year: i32, offset: i32) -> Result<NaiveDate, AnalyticsError> {
        let year = fiscal_year + offset.div_euclid(12);
        let month = offset.rem_euclid(12) as u32 + 1;
        NaiveDate::from_ymd_opt(year, month, 1)
            .ok_or_else(|| AnalyticsError::DateOutOfRange(format!("{year}-{month:02}-01")))
    }
}

/// Parses a reference instant supplied by a caller.
///
/// Accepts RFC 3339 timestamps, naive `YYYY-MM-DDTHH:MM:SS` timestamps (taken as UTC)
/// and bare `YYYY-MM-DD` dates (midnight UTC).
pub fn parse_reference_instant(input: &str) -> Result<DateTime<Utc>, AnalyticsError> {
    let trimmed = input.trim();
    if let Ok(instant) = DateTime::parse_from_rfc3339(trimmed) {
        return Ok(instant.with_timezone(&Utc));
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(trimmed, "%Y-%m-%dT%H:%M:%S%.f") {
        return Ok(naive.and_utc());
    }
    if let Ok(date) = NaiveDate::parse_from_str(trimmed, "%Y-%m-%d") {
        return Ok(date.and_time(NaiveTime::MIN).and_utc());
    }
    Err(AnalyticsError::InvalidReferenceInstant(input.to_string()))
}
