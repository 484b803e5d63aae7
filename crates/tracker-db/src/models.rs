//! Database row types. These map directly to SQLite rows.
//! Conversion into the API models happens here so corrupt rows surface as errors.

use anyhow::{Context, Result};
use chrono::{DateTime, SecondsFormat, Utc};
use tracker_types::models::{Application, OfferDetails, User};
use uuid::Uuid;

pub struct UserRow {
    pub id: String,
    pub name: String,
    pub email: String,
    pub password: String,
    pub has_application_created: bool,
    pub created_at: String,
}

impl UserRow {
    pub fn into_user(self) -> Result<User> {
        Ok(User {
            id: parse_id(&self.id)?,
            name: self.name,
            email: self.email,
            has_application_created: self.has_application_created,
            created_at: parse_ts(&self.created_at)?,
        })
    }
}

pub struct ApplicationRow {
    pub id: String,
    pub user_id: String,
    pub company_name: String,
    pub position: String,
    pub location: String,
    pub application_date: String,
    pub status: String,
    pub application_type: String,
    pub source: String,
    pub job_link: String,
    pub resume_version: String,
    pub contact_person: String,
    pub contact_email: String,
    pub notes: String,
    pub follow_up_date: Option<String>,
    pub interview_rounds: String,
    pub offer_stipend: String,
    pub offer_duration: String,
    pub offer_start_date: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

impl ApplicationRow {
    pub fn into_application(self) -> Result<Application> {
        Ok(Application {
            id: parse_id(&self.id)?,
            owner: parse_id(&self.user_id)?,
            company_name: self.company_name,
            position: self.position,
            location: self.location,
            application_date: parse_ts(&self.application_date)?,
            status: self.status.parse()?,
            application_type: self.application_type.parse()?,
            source: self.source,
            job_link: self.job_link,
            resume_version: self.resume_version,
            contact_person: self.contact_person,
            contact_email: self.contact_email,
            notes: self.notes,
            follow_up_date: self.follow_up_date.as_deref().map(parse_ts).transpose()?,
            interview_rounds: serde_json::from_str(&self.interview_rounds)
                .with_context(|| format!("Corrupt interview_rounds on application '{}'", self.id))?,
            offer_details: OfferDetails {
                stipend: self.offer_stipend,
                duration: self.offer_duration,
                start_date: self.offer_start_date.as_deref().map(parse_ts).transpose()?,
            },
            created_at: parse_ts(&self.created_at)?,
            updated_at: parse_ts(&self.updated_at)?,
        })
    }
}

/// Stored timestamp form: `2024-03-01T09:30:00.000Z`.
pub fn format_ts(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Millis, true)
}

pub fn parse_ts(raw: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .with_context(|| format!("Corrupt timestamp '{}'", raw))
}

fn parse_id(raw: &str) -> Result<Uuid> {
    raw.parse().with_context(|| format!("Corrupt id '{}'", raw))
}
