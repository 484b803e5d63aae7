use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::User;

// -- JWT Claims --

/// JWT claims issued at signup/login and checked by the auth middleware.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Uuid,
    pub exp: usize,
}

// -- Envelope --

/// Every endpoint answers with this shape, success or failure.
#[derive(Debug, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub errors: Option<Vec<String>>,
}

impl<T> ApiResponse<T> {
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            message: None,
            errors: None,
        }
    }

    pub fn ok_with_message(message: impl Into<String>, data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            message: Some(message.into()),
            errors: None,
        }
    }
}

impl ApiResponse<()> {
    pub fn message(message: impl Into<String>) -> Self {
        Self {
            success: true,
            data: None,
            message: Some(message.into()),
            errors: None,
        }
    }

    pub fn failure(message: impl Into<String>, errors: Option<Vec<String>>) -> Self {
        Self {
            success: false,
            data: None,
            message: Some(message.into()),
            errors,
        }
    }
}

// -- Auth --

/// Fields are optional so that missing ones surface as validation messages
/// instead of deserialization failures.
#[derive(Debug, Default, Deserialize)]
pub struct SignupRequest {
    pub name: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct LoginRequest {
    pub email: Option<String>,
    pub password: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct AuthResponse {
    pub user: User,
    pub token: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct UserResponse {
    pub user: User,
}

// -- Applications --

#[derive(Debug, Clone, Default, Deserialize)]
pub struct InterviewRoundInput {
    pub round: Option<String>,
    pub date: Option<String>,
    pub result: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OfferDetailsInput {
    pub stipend: Option<String>,
    pub duration: Option<String>,
    pub start_date: Option<String>,
}

/// Body of both create and update. On create the required fields must be
/// present; on update only the supplied fields are replaced.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApplicationRequest {
    pub company_name: Option<String>,
    pub position: Option<String>,
    pub location: Option<String>,
    pub application_date: Option<String>,
    pub status: Option<String>,
    pub application_type: Option<String>,
    pub source: Option<String>,
    pub job_link: Option<String>,
    pub resume_version: Option<String>,
    pub contact_person: Option<String>,
    pub contact_email: Option<String>,
    pub notes: Option<String>,
    pub follow_up_date: Option<String>,
    pub interview_rounds: Option<Vec<InterviewRoundInput>>,
    pub offer_details: Option<OfferDetailsInput>,
}
