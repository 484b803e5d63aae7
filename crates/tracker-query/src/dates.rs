use chrono::{DateTime, Datelike, Duration, Months, NaiveDate, NaiveDateTime, Utc};
use serde::Serialize;

/// Inclusive on both ends. Calendar boundaries are computed in UTC.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DateRange {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl DateRange {
    pub fn contains(&self, at: DateTime<Utc>) -> bool {
        self.start <= at && at <= self.end
    }

    pub fn span(&self) -> Duration {
        self.end - self.start
    }
}

/// Parse a month query value. Anything outside 1..=12 is rejected rather than
/// wrapped into a neighbouring month.
pub fn parse_month(raw: &str) -> Result<u32, String> {
    match raw.trim().parse::<u32>() {
        Ok(month) if (1..=12).contains(&month) => Ok(month),
        _ => Err(format!("Month must be a number between 1 and 12 (got '{}')", raw.trim())),
    }
}

pub fn parse_year(raw: &str) -> Result<i32, String> {
    match raw.trim().parse::<i32>() {
        Ok(year) if (1..=9999).contains(&year) => Ok(year),
        _ => Err(format!("Year must be a four-digit year (got '{}')", raw.trim())),
    }
}

/// First instant of the month through 23:59:59 on its last day.
pub fn month_range(year: i32, month: u32) -> Option<DateRange> {
    let first = NaiveDate::from_ymd_opt(year, month, 1)?;
    let last = first.checked_add_months(Months::new(1))?.pred_opt()?;
    Some(DateRange {
        start: first.and_hms_opt(0, 0, 0)?.and_utc(),
        end: last.and_hms_opt(23, 59, 59)?.and_utc(),
    })
}

pub fn year_range(year: i32) -> Option<DateRange> {
    Some(DateRange {
        start: NaiveDate::from_ymd_opt(year, 1, 1)?.and_hms_opt(0, 0, 0)?.and_utc(),
        end: NaiveDate::from_ymd_opt(year, 12, 31)?.and_hms_opt(23, 59, 59)?.and_utc(),
    })
}

/// Midnight on the 1st of the month `months` before the month of `now`.
pub fn start_of_month_back(now: DateTime<Utc>, months: u32) -> Option<DateTime<Utc>> {
    NaiveDate::from_ymd_opt(now.year(), now.month(), 1)?
        .checked_sub_months(Months::new(months))?
        .and_hms_opt(0, 0, 0)
        .map(|dt| dt.and_utc())
}

/// Accepts RFC 3339 timestamps, `YYYY-MM-DDTHH:MM:SS` (taken as UTC) and
/// plain `YYYY-MM-DD` dates (midnight UTC). The UTC year must fall in
/// 1..=9999 so the stored form stays fixed-width RFC 3339.
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    parse_any(raw.trim()).filter(|dt| (1..=9999).contains(&dt.year()))
}

fn parse_any(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(ndt) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f") {
        return Some(ndt.and_utc());
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|ndt| ndt.and_utc())
}
