use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Returned when a string does not name a member of one of the closed enumerations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{kind} must be one of: {allowed}")]
pub struct UnknownVariant {
    pub kind: &'static str,
    pub allowed: String,
}

macro_rules! closed_enum {
    (
        $(#[$meta:meta])*
        $name:ident, $kind:literal {
            $($(#[$vmeta:meta])* $variant:ident => $text:literal),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub enum $name {
            $(
                $(#[$vmeta])*
                #[serde(rename = $text)]
                $variant,
            )+
        }

        impl $name {
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            pub fn as_str(&self) -> &'static str {
                match self {
                    $($name::$variant => $text,)+
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $name {
            type Err = UnknownVariant;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($text => Ok($name::$variant),)+
                    _ => Err(UnknownVariant {
                        kind: $kind,
                        allowed: [$($text),+].join(", "),
                    }),
                }
            }
        }
    };
}

closed_enum! {
    /// Where an application currently stands in the hiring pipeline.
    #[derive(Default)]
    ApplicationStatus, "Status" {
        #[default]
        Applied => "Applied",
        UnderReview => "Under Review",
        Interview => "Interview",
        Accepted => "Accepted",
        Rejected => "Rejected",
        Withdrawn => "Withdrawn",
    }
}

closed_enum! {
    ApplicationType, "Application type" {
        Summer => "Summer",
        Winter => "Winter",
        Fall => "Fall",
        Spring => "Spring",
        FullTime => "Full-time",
        PartTime => "Part-time",
    }
}

closed_enum! {
    RoundResult, "Result" {
        Pending => "Pending",
        Completed => "Completed",
        Passed => "Passed",
        Failed => "Failed",
        Cancelled => "Cancelled",
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InterviewRound {
    pub round: String,
    pub date: DateTime<Utc>,
    pub result: RoundResult,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OfferDetails {
    pub stipend: String,
    pub duration: String,
    pub start_date: Option<DateTime<Utc>>,
}

/// One tracked job or internship application. Always owned by exactly one user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Application {
    pub id: Uuid,
    #[serde(rename = "user")]
    pub owner: Uuid,
    pub company_name: String,
    pub position: String,
    pub location: String,
    pub application_date: DateTime<Utc>,
    pub status: ApplicationStatus,
    pub application_type: ApplicationType,
    pub source: String,
    pub job_link: String,
    pub resume_version: String,
    pub contact_person: String,
    pub contact_email: String,
    pub notes: String,
    pub follow_up_date: Option<DateTime<Utc>>,
    pub interview_rounds: Vec<InterviewRound>,
    pub offer_details: OfferDetails,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Public view of a user. The password hash never leaves the store layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub has_application_created: bool,
    pub created_at: DateTime<Utc>,
}
