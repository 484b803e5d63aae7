//! Boundary validation. Every field is checked and all problems are reported
//! together, before any query is built or any row is written.

use std::str::FromStr;
use std::sync::LazyLock;

use chrono::{DateTime, SubsecRound, Utc};
use regex::Regex;
use tracker_query::dates::parse_timestamp;
use tracker_types::api::{ApplicationRequest, InterviewRoundInput, LoginRequest, OfferDetailsInput, SignupRequest};
use tracker_types::models::{
    Application, ApplicationStatus, ApplicationType, InterviewRound, OfferDetails, RoundResult, UnknownVariant,
};
use uuid::Uuid;

use crate::error::ApiError;

const MAX_TEXT: usize = 100;
const MAX_JOB_LINK: usize = 500;
const MAX_NOTES: usize = 1000;

static EMAIL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("email pattern compiles"));

#[derive(Debug, Default)]
struct Checker {
    errors: Vec<String>,
}

impl Checker {
    /// Trimmed text. Required fields must be present and non-blank.
    fn text(&mut self, label: &str, value: Option<&str>, max: usize, required: bool) -> Option<String> {
        let value = value.map(str::trim);
        match value {
            None | Some("") if required => {
                self.errors.push(format!("{} is required", label));
                None
            }
            Some(v) if v.chars().count() > max => {
                self.errors.push(format!("{} cannot exceed {} characters", label, max));
                None
            }
            other => other.map(str::to_string),
        }
    }

    /// Truncated to milliseconds, the precision the store keeps.
    fn date(&mut self, label: &str, raw: &str) -> Option<DateTime<Utc>> {
        let parsed = parse_timestamp(raw).map(|dt| dt.trunc_subsecs(3));
        if parsed.is_none() {
            self.errors.push(format!("{} must be a valid ISO 8601 date", label));
        }
        parsed
    }

    fn choice<E>(&mut self, raw: &str) -> Option<E>
    where
        E: FromStr<Err = UnknownVariant>,
    {
        raw.trim().parse::<E>().map_err(|e| self.errors.push(e.to_string())).ok()
    }

    fn rounds(&mut self, rounds: &[InterviewRoundInput]) -> Option<Vec<InterviewRound>> {
        let before = self.errors.len();
        let mut out = Vec::with_capacity(rounds.len());
        for (i, input) in rounds.iter().enumerate() {
            let label = format!("Interview round {}", i + 1);
            let round = self.text(&format!("{} name", label), input.round.as_deref(), MAX_TEXT, true);
            let date = match input.date.as_deref() {
                Some(raw) => self.date(&format!("{} date", label), raw),
                None => {
                    self.errors.push(format!("{} date is required", label));
                    None
                }
            };
            let result = match input.result.as_deref() {
                Some(raw) => self.choice::<RoundResult>(raw),
                None => {
                    self.errors.push(format!("{} result is required", label));
                    None
                }
            };
            if let (Some(round), Some(date), Some(result)) = (round, date, result) {
                out.push(InterviewRound { round, date, result });
            }
        }
        (self.errors.len() == before).then_some(out)
    }

    fn offer(&mut self, input: &OfferDetailsInput) -> OfferDetails {
        OfferDetails {
            stipend: self.text("Stipend", input.stipend.as_deref(), MAX_TEXT, false).unwrap_or_default(),
            duration: self.text("Duration", input.duration.as_deref(), MAX_TEXT, false).unwrap_or_default(),
            start_date: input
                .start_date
                .as_deref()
                .filter(|s| !s.trim().is_empty())
                .and_then(|raw| self.date("Offer start date", raw)),
        }
    }

    fn notes(&mut self, value: &str) -> Option<String> {
        if value.chars().count() > MAX_NOTES {
            self.errors.push(format!("Notes cannot exceed {} characters", MAX_NOTES));
            None
        } else {
            Some(value.to_string())
        }
    }

    fn finish(self) -> Result<(), ApiError> {
        if self.errors.is_empty() {
            Ok(())
        } else {
            Err(ApiError::Validation(self.errors))
        }
    }
}

// -- Auth --

#[derive(Debug)]
pub struct NewUser {
    pub name: String,
    pub email: String,
    pub password: String,
}

pub fn signup(req: &SignupRequest) -> Result<NewUser, ApiError> {
    let mut check = Checker::default();

    let name = req.name.as_deref().map(str::trim).unwrap_or_default();
    if name.is_empty() {
        check.errors.push("Name is required and must be a string".into());
    } else if name.chars().count() < 2 {
        check.errors.push("Name must be at least 2 characters long".into());
    } else if name.chars().count() > 50 {
        check.errors.push("Name cannot exceed 50 characters".into());
    }

    let email = normalize_email(req.email.as_deref());
    check_email(&mut check, &email);

    let password = req.password.clone().unwrap_or_default();
    if password.is_empty() {
        check.errors.push("Password is required and must be a string".into());
    } else if password.chars().count() < 6 {
        check.errors.push("Password must be at least 6 characters long".into());
    } else if password.chars().count() > 128 {
        check.errors.push("Password cannot exceed 128 characters".into());
    }

    check.finish()?;
    Ok(NewUser {
        name: name.to_string(),
        email,
        password,
    })
}

/// Returns the normalized email and the password.
pub fn login(req: &LoginRequest) -> Result<(String, String), ApiError> {
    let mut check = Checker::default();
    let email = normalize_email(req.email.as_deref());
    check_email(&mut check, &email);

    let password = req.password.clone().unwrap_or_default();
    if password.is_empty() {
        check.errors.push("Password is required and must be a string".into());
    }

    check.finish()?;
    Ok((email, password))
}

fn normalize_email(raw: Option<&str>) -> String {
    raw.map(|e| e.trim().to_lowercase()).unwrap_or_default()
}

fn check_email(check: &mut Checker, email: &str) {
    if email.is_empty() {
        check.errors.push("Email is required and must be a string".into());
    } else if !EMAIL.is_match(email) {
        check.errors.push("Please provide a valid email address".into());
    }
}

// -- Applications --

/// Build a new application from a create request, filling documented defaults.
pub fn new_application(owner: Uuid, req: &ApplicationRequest, now: DateTime<Utc>) -> Result<Application, ApiError> {
    let mut check = Checker::default();

    let company_name = check.text("Company name", req.company_name.as_deref(), MAX_TEXT, true);
    let position = check.text("Position", req.position.as_deref(), MAX_TEXT, true);
    let location = check.text("Location", req.location.as_deref(), MAX_TEXT, true);
    let source = check.text("Source", req.source.as_deref(), MAX_TEXT, true);

    let application_type = match req.application_type.as_deref().map(str::trim) {
        None | Some("") => {
            check.errors.push("Application type is required".into());
            None
        }
        Some(raw) => check.choice::<ApplicationType>(raw),
    };

    let status = match req.status.as_deref().map(str::trim) {
        None | Some("") => Some(ApplicationStatus::default()),
        Some(raw) => check.choice::<ApplicationStatus>(raw),
    };

    let application_date = match req.application_date.as_deref().filter(|d| !d.trim().is_empty()) {
        Some(raw) => check.date("Application date", raw),
        None => Some(now),
    };
    let follow_up_date = req
        .follow_up_date
        .as_deref()
        .filter(|d| !d.trim().is_empty())
        .and_then(|raw| check.date("Follow-up date", raw));

    let job_link = check.text("Job link", req.job_link.as_deref(), MAX_JOB_LINK, false);
    let resume_version = check.text("Resume version", req.resume_version.as_deref(), MAX_TEXT, false);
    let contact_person = check.text("Contact person", req.contact_person.as_deref(), MAX_TEXT, false);
    let contact_email = check.text("Contact email", req.contact_email.as_deref(), MAX_TEXT, false);
    let notes = req.notes.as_deref().map(|n| check.notes(n)).unwrap_or_default();
    let interview_rounds = match &req.interview_rounds {
        Some(rounds) => check.rounds(rounds),
        None => Some(Vec::new()),
    };
    let offer_details = req.offer_details.as_ref().map(|o| check.offer(o)).unwrap_or_default();

    check.finish()?;

    // Every `None` below was paired with a pushed error, so `finish` has already returned.
    match (company_name, position, location, source, application_type, status, application_date, interview_rounds) {
        (
            Some(company_name),
            Some(position),
            Some(location),
            Some(source),
            Some(application_type),
            Some(status),
            Some(application_date),
            Some(interview_rounds),
        ) => Ok(Application {
            id: Uuid::new_v4(),
            owner,
            company_name,
            position,
            location,
            application_date,
            status,
            application_type,
            source,
            job_link: job_link.unwrap_or_default(),
            resume_version: resume_version.unwrap_or_default(),
            contact_person: contact_person.unwrap_or_default(),
            contact_email: contact_email.unwrap_or_default(),
            notes: notes.unwrap_or_default(),
            follow_up_date,
            interview_rounds,
            offer_details,
            created_at: now,
            updated_at: now,
        }),
        _ => Err(ApiError::Validation(vec!["Invalid application".into()])),
    }
}

/// Replace only the fields present in `req`. Nothing is modified unless the
/// whole update validates.
pub fn apply_update(app: &mut Application, req: &ApplicationRequest, now: DateTime<Utc>) -> Result<(), ApiError> {
    let mut check = Checker::default();
    let mut next = app.clone();

    macro_rules! required_text {
        ($field:ident, $label:literal) => {
            if req.$field.is_some() {
                if let Some(v) = check.text($label, req.$field.as_deref(), MAX_TEXT, true) {
                    next.$field = v;
                }
            }
        };
    }
    macro_rules! optional_text {
        ($field:ident, $label:literal, $max:expr) => {
            if let Some(v) = check.text($label, req.$field.as_deref(), $max, false) {
                next.$field = v;
            }
        };
    }

    required_text!(company_name, "Company name");
    required_text!(position, "Position");
    required_text!(location, "Location");
    required_text!(source, "Source");
    optional_text!(job_link, "Job link", MAX_JOB_LINK);
    optional_text!(resume_version, "Resume version", MAX_TEXT);
    optional_text!(contact_person, "Contact person", MAX_TEXT);
    optional_text!(contact_email, "Contact email", MAX_TEXT);

    if let Some(notes) = req.notes.as_deref().and_then(|n| check.notes(n)) {
        next.notes = notes;
    }
    if let Some(raw) = req.status.as_deref() {
        if let Some(status) = check.choice::<ApplicationStatus>(raw) {
            next.status = status;
        }
    }
    if let Some(raw) = req.application_type.as_deref() {
        if let Some(kind) = check.choice::<ApplicationType>(raw) {
            next.application_type = kind;
        }
    }
    if let Some(raw) = req.application_date.as_deref() {
        if let Some(date) = check.date("Application date", raw) {
            next.application_date = date;
        }
    }
    if let Some(raw) = req.follow_up_date.as_deref() {
        next.follow_up_date = if raw.trim().is_empty() {
            None
        } else {
            check.date("Follow-up date", raw)
        };
    }
    if let Some(rounds) = &req.interview_rounds {
        if let Some(rounds) = check.rounds(rounds) {
            next.interview_rounds = rounds;
        }
    }
    if let Some(offer) = &req.offer_details {
        next.offer_details = check.offer(offer);
    }

    check.finish()?;
    next.updated_at = now;
    *app = next;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap()
    }

    fn minimal() -> ApplicationRequest {
        ApplicationRequest {
            company_name: Some("  Acme  ".into()),
            position: Some("Data Intern".into()),
            location: Some("Austin".into()),
            application_type: Some("Summer".into()),
            source: Some("Handshake".into()),
            ..Default::default()
        }
    }

    fn errors(err: ApiError) -> Vec<String> {
        match err {
            ApiError::Validation(errors) => errors,
            other => panic!("expected validation error, got {:?}", other),
        }
    }

    #[test]
    fn omitted_optionals_get_defaults() {
        let owner = Uuid::new_v4();
        let app = new_application(owner, &minimal(), now()).unwrap();
        assert_eq!(app.owner, owner);
        assert_eq!(app.company_name, "Acme");
        assert_eq!(app.status, ApplicationStatus::Applied);
        assert_eq!(app.application_date, now());
        assert_eq!(app.notes, "");
        assert_eq!(app.job_link, "");
        assert!(app.interview_rounds.is_empty());
        assert_eq!(app.offer_details, OfferDetails::default());
        assert_eq!(app.follow_up_date, None);
        assert_eq!(app.created_at, app.updated_at);
    }

    #[test]
    fn missing_required_fields_are_all_reported() {
        let errs = errors(new_application(Uuid::new_v4(), &ApplicationRequest::default(), now()).unwrap_err());
        assert_eq!(
            errs,
            [
                "Company name is required",
                "Position is required",
                "Location is required",
                "Source is required",
                "Application type is required",
            ]
        );
    }

    #[test]
    fn enums_lengths_and_dates_are_checked() {
        let req = ApplicationRequest {
            status: Some("Ghosted".into()),
            application_type: Some("Contract".into()),
            application_date: Some("31/12/2024".into()),
            job_link: Some("x".repeat(501)),
            notes: Some("n".repeat(1001)),
            ..minimal()
        };
        let errs = errors(new_application(Uuid::new_v4(), &req, now()).unwrap_err());
        assert_eq!(errs.len(), 5);
        assert!(errs.iter().any(|e| e.starts_with("Status must be one of")));
        assert!(errs.iter().any(|e| e == "Job link cannot exceed 500 characters"));
        assert!(errs.iter().any(|e| e == "Notes cannot exceed 1000 characters"));
    }

    #[test]
    fn out_of_range_years_are_invalid_dates() {
        for raw in ["+10000-01-01", "-0001-06-01"] {
            let req = ApplicationRequest {
                application_date: Some(raw.into()),
                ..minimal()
            };
            let errs = errors(new_application(Uuid::new_v4(), &req, now()).unwrap_err());
            assert_eq!(errs, ["Application date must be a valid ISO 8601 date"], "{}", raw);
        }
    }

    #[test]
    fn client_dates_keep_millisecond_precision_only() {
        let req = ApplicationRequest {
            application_date: Some("2024-03-05T10:00:00.123456Z".into()),
            follow_up_date: Some("2024-03-12T09:30:00.999999Z".into()),
            ..minimal()
        };
        let app = new_application(Uuid::new_v4(), &req, now()).unwrap();
        assert_eq!(app.application_date.timestamp_subsec_micros(), 123_000);
        assert_eq!(app.follow_up_date.unwrap().timestamp_subsec_micros(), 999_000);
    }

    #[test]
    fn interview_rounds_are_validated_per_entry() {
        let req = ApplicationRequest {
            interview_rounds: Some(vec![
                InterviewRoundInput {
                    round: Some("Phone screen".into()),
                    date: Some("2024-06-03".into()),
                    result: Some("Passed".into()),
                },
                InterviewRoundInput {
                    round: None,
                    date: Some("soon".into()),
                    result: Some("Maybe".into()),
                },
            ]),
            ..minimal()
        };
        let errs = errors(new_application(Uuid::new_v4(), &req, now()).unwrap_err());
        assert_eq!(errs.len(), 3);
        assert!(errs[0].starts_with("Interview round 2"));
    }

    #[test]
    fn update_replaces_only_supplied_fields() {
        let mut app = new_application(Uuid::new_v4(), &minimal(), now()).unwrap();
        let original = app.clone();
        let later = now() + chrono::Duration::days(2);
        let req = ApplicationRequest {
            status: Some("Interview".into()),
            notes: Some("Recruiter called back".into()),
            ..Default::default()
        };
        apply_update(&mut app, &req, later).unwrap();
        assert_eq!(app.status, ApplicationStatus::Interview);
        assert_eq!(app.notes, "Recruiter called back");
        assert_eq!(app.company_name, original.company_name);
        assert_eq!(app.created_at, original.created_at);
        assert_eq!(app.updated_at, later);
    }

    #[test]
    fn failed_update_leaves_record_untouched() {
        let mut app = new_application(Uuid::new_v4(), &minimal(), now()).unwrap();
        let original = app.clone();
        let req = ApplicationRequest {
            status: Some("Interview".into()),
            company_name: Some("   ".into()),
            ..Default::default()
        };
        let errs = errors(apply_update(&mut app, &req, now()).unwrap_err());
        assert_eq!(errs, ["Company name is required"]);
        assert_eq!(app, original);
    }

    #[test]
    fn signup_rules() {
        let ok = signup(&SignupRequest {
            name: Some(" Ada ".into()),
            email: Some(" Ada@Example.COM ".into()),
            password: Some("hunter22".into()),
        })
        .unwrap();
        assert_eq!(ok.name, "Ada");
        assert_eq!(ok.email, "ada@example.com");

        let errs = errors(
            signup(&SignupRequest {
                name: Some("A".into()),
                email: Some("not-an-email".into()),
                password: Some("123".into()),
            })
            .unwrap_err(),
        );
        assert_eq!(
            errs,
            [
                "Name must be at least 2 characters long",
                "Please provide a valid email address",
                "Password must be at least 6 characters long",
            ]
        );
    }

    #[test]
    fn login_requires_both_fields() {
        let errs = errors(login(&LoginRequest::default()).unwrap_err());
        assert_eq!(errs.len(), 2);
    }
}
