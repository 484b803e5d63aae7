//! Post-processing of grouped store rows into the analytics reports.
//!
//! The store answers one generic question: "group this owner's matching
//! records by [`GroupKey`] and give me a [`GroupRow`] per group". Every report
//! (trends, status breakdown, type distribution, top companies, summary) is
//! built from those rows here.

use chrono::{DateTime, Datelike, Duration, Months, Utc};
use serde::Serialize;
use tracker_types::models::ApplicationStatus;

use crate::dates::{DateRange, parse_year, start_of_month_back, year_range};
use crate::error::ValidationError;

pub const DEFAULT_PERIOD: &str = "6months";
pub const DEFAULT_TOP_LIMIT: usize = 10;
/// Rolling window, in months, behind the summary's monthly series.
pub const SUMMARY_MONTHS: u32 = 6;

/// Calendar period used to bucket trend counts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Bucket {
    Day,
    Month,
}

impl Bucket {
    /// Daily buckets for windows of a week or less, monthly otherwise.
    pub fn for_range(range: &DateRange) -> Self {
        if range.span() <= Duration::weeks(1) {
            Bucket::Day
        } else {
            Bucket::Month
        }
    }
}

/// Field selector for the store's grouping query.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GroupKey {
    Status,
    ApplicationType,
    Company,
    Period(Bucket),
}

/// One group as returned by the store. For [`GroupKey::Period`] the key is
/// `YYYY-MM-DD` (day) or `YYYY-MM` (month).
#[derive(Debug, Clone, PartialEq)]
pub struct GroupRow {
    pub key: String,
    pub count: u64,
    pub accepted: u64,
    pub latest: Option<DateTime<Utc>>,
    pub statuses: Vec<String>,
}

// -- Trends --

#[derive(Debug, Clone, PartialEq)]
pub struct TrendWindow {
    pub period: String,
    pub range: DateRange,
    pub bucket: Bucket,
}

/// Resolve the trend window. An explicit year wins over `period`; unknown
/// period tokens fall back to the last six months.
pub fn resolve_window(
    period: Option<&str>,
    year: Option<&str>,
    now: DateTime<Utc>,
) -> Result<TrendWindow, ValidationError> {
    let period = period
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .unwrap_or(DEFAULT_PERIOD)
        .to_string();

    let range = match year.map(str::trim).filter(|y| !y.is_empty()) {
        Some(raw) => {
            let year = parse_year(raw).map_err(ValidationError::new)?;
            year_range(year).ok_or_else(|| ValidationError::new(format!("Year {} is out of range", year)))?
        }
        None => {
            let start = match period.as_str() {
                "week" => Some(now - Duration::days(7)),
                "1month" => start_of_month_back(now, 1),
                "3months" => start_of_month_back(now, 3),
                "1year" => start_of_month_back(now, 12),
                "year" => year_range(now.year() - 1).map(|r| r.start),
                _ => start_of_month_back(now, 6),
            }
            .ok_or_else(|| ValidationError::new("Trend window is out of range"))?;
            DateRange { start, end: now }
        }
    };

    Ok(TrendWindow {
        period,
        bucket: Bucket::for_range(&range),
        range,
    })
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrendPoint {
    pub date: String,
    pub count: u64,
    pub statuses: Vec<String>,
}

/// Chronologically ascending series, one point per non-empty bucket.
pub fn trend_points(mut rows: Vec<GroupRow>, bucket: Bucket) -> Vec<TrendPoint> {
    rows.sort_by(|a, b| a.key.cmp(&b.key));
    rows.into_iter()
        .map(|row| TrendPoint {
            date: match bucket {
                Bucket::Day => row.key,
                Bucket::Month => format!("{}-01", row.key),
            },
            count: row.count,
            statuses: row.statuses,
        })
        .collect()
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategoryCount {
    pub name: String,
    pub count: u64,
}

pub fn category_counts(rows: &[GroupRow]) -> Vec<CategoryCount> {
    rows.iter()
        .map(|row| CategoryCount {
            name: row.key.clone(),
            count: row.count,
        })
        .collect()
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TrendReport {
    pub trends: Vec<TrendPoint>,
    pub status_breakdown: Vec<CategoryCount>,
    pub type_distribution: Vec<CategoryCount>,
    pub period: String,
    pub date_range: DateRange,
}

// -- Top companies --

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CompanyStat {
    pub company: String,
    pub count: u64,
    /// Fraction in `0.0..=1.0` of this company's applications that were accepted.
    pub success_rate: f64,
    pub latest_application: Option<DateTime<Utc>>,
    pub statuses: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TopCompaniesReport {
    pub top_companies: Vec<CompanyStat>,
    pub total_companies: usize,
}

pub fn parse_top_limit(raw: Option<&str>) -> usize {
    raw.and_then(|v| v.trim().parse::<usize>().ok())
        .filter(|v| *v >= 1)
        .unwrap_or(DEFAULT_TOP_LIMIT)
}

pub fn success_rate(accepted: u64, total: u64) -> f64 {
    if total == 0 {
        0.0
    } else {
        accepted as f64 / total as f64
    }
}

/// Rank companies by application count, descending. The sort is stable, so
/// equal counts keep the order the store grouped them in.
pub fn top_companies(mut rows: Vec<GroupRow>, limit: usize) -> TopCompaniesReport {
    rows.sort_by(|a, b| b.count.cmp(&a.count));
    rows.truncate(limit);

    let top_companies: Vec<CompanyStat> = rows
        .into_iter()
        .map(|row| CompanyStat {
            success_rate: success_rate(row.accepted, row.count),
            company: row.key,
            count: row.count,
            latest_application: row.latest,
            statuses: row.statuses,
        })
        .collect();

    TopCompaniesReport {
        total_companies: top_companies.len(),
        top_companies,
    }
}

// -- Summary --

/// Everything the summary needs from the store for one owner.
#[derive(Debug, Clone, Default)]
pub struct SummaryInput {
    pub total: u64,
    pub by_status: Vec<GroupRow>,
    pub by_month: Vec<GroupRow>,
    pub by_type: Vec<GroupRow>,
    pub first_application: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SummaryStats {
    pub total_applications: u64,
    pub status_counts: Vec<CategoryCount>,
    pub monthly_applications: Vec<TrendPoint>,
    pub job_type_distribution: Vec<CategoryCount>,
    /// Accepted share of all applications, as a percentage.
    pub success_rate: f64,
    pub avg_applications_per_month: f64,
}

/// Window for the summary's monthly series: the last six months up to `now`.
pub fn summary_window(now: DateTime<Utc>) -> DateRange {
    DateRange {
        start: now.checked_sub_months(Months::new(SUMMARY_MONTHS)).unwrap_or(now),
        end: now,
    }
}

/// Calendar months from the first application's month through `now`'s,
/// inclusive. A first application in the current month gives 1.
pub fn months_since_first(first: DateTime<Utc>, now: DateTime<Utc>) -> i64 {
    (now.year() as i64 - first.year() as i64) * 12 + (now.month() as i64 - first.month() as i64) + 1
}

pub fn average_per_month(total: u64, first: Option<DateTime<Utc>>, now: DateTime<Utc>) -> f64 {
    match first {
        Some(first) => {
            let months = months_since_first(first, now);
            if months > 0 { total as f64 / months as f64 } else { 0.0 }
        }
        None => 0.0,
    }
}

pub fn summarize(input: SummaryInput, now: DateTime<Utc>) -> SummaryStats {
    let accepted = input
        .by_status
        .iter()
        .find(|row| row.key == ApplicationStatus::Accepted.as_str())
        .map_or(0, |row| row.count);

    SummaryStats {
        total_applications: input.total,
        status_counts: category_counts(&input.by_status),
        monthly_applications: trend_points(input.by_month, Bucket::Month),
        job_type_distribution: category_counts(&input.by_type),
        success_rate: round2(success_rate(accepted, input.total) * 100.0),
        avg_applications_per_month: round2(average_per_month(input.total, input.first_application, now)),
    }
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
