use tracker_types::models::{ApplicationStatus, ApplicationType};
use uuid::Uuid;

use crate::dates::{month_range, parse_month, parse_year, year_range};
use crate::error::ValidationError;
use crate::predicate::{Condition, Predicate, TextField};

/// Raw filter values as they arrive on the query string. Empty strings are
/// treated the same as absent ones.
#[derive(Debug, Clone, Default)]
pub struct FilterParams {
    pub status: Option<String>,
    pub job_type: Option<String>,
    pub location: Option<String>,
    pub month: Option<String>,
    pub year: Option<String>,
    pub company: Option<String>,
    pub position: Option<String>,
    pub keyword: Option<String>,
}

/// Translate filter parameters into an owner-scoped predicate.
///
/// Exact fields compare by equality, text fields by case-insensitive
/// substring, and `keyword` matches if any of company, position, notes or
/// location contains it. Everything is ANDed. A month without a year falls in
/// `current_year`.
pub fn build_predicate(
    owner: Uuid,
    params: &FilterParams,
    current_year: i32,
) -> Result<Predicate, ValidationError> {
    let mut predicate = Predicate::for_owner(owner);
    let mut errors = Vec::new();

    if let Some(raw) = present(&params.status) {
        match raw.parse::<ApplicationStatus>() {
            Ok(status) => predicate.push(Condition::Status(status)),
            Err(e) => errors.push(e.to_string()),
        }
    }

    if let Some(raw) = present(&params.job_type) {
        match raw.parse::<ApplicationType>() {
            Ok(kind) => predicate.push(Condition::Type(kind)),
            Err(e) => errors.push(e.to_string()),
        }
    }

    let month = present(&params.month).map(parse_month);
    let year = present(&params.year).map(parse_year);

    let range = match (month, year) {
        (Some(Ok(m)), Some(Ok(y))) => month_range(y, m),
        (Some(Ok(m)), None) => month_range(current_year, m),
        (None, Some(Ok(y))) => year_range(y),
        (None, None) => None,
        (month, year) => {
            errors.extend(month.and_then(Result::err));
            errors.extend(year.and_then(Result::err));
            None
        }
    };
    if let Some(range) = range {
        predicate.push(Condition::AppliedWithin(range));
    }

    for (field, value) in [
        (TextField::Location, &params.location),
        (TextField::CompanyName, &params.company),
        (TextField::Position, &params.position),
    ] {
        if let Some(needle) = present(value) {
            predicate.push(Condition::Contains(field, needle.to_string()));
        }
    }

    if let Some(keyword) = present(&params.keyword) {
        predicate.push(Condition::AnyContains(TextField::KEYWORD.to_vec(), keyword.to_string()));
    }

    ValidationError::check(errors)?;
    Ok(predicate)
}

fn present(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}
