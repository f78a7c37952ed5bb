use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::auth::validation::FieldErrors;

/// Request body for sign-up.
#[derive(Debug, Deserialize)]
pub struct SignUpRequest {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

/// Request body for login.
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// Request body for token refresh.
#[derive(Debug, Deserialize)]
pub struct RefreshRequest {
    pub refresh_token: String,
}

/// Query of a verification link.
#[derive(Debug, Default, Deserialize)]
pub struct VerifyEmailQuery {
    pub email: Option<String>,
    pub token: Option<String>,
}

/// Query bound to the resend action.
#[derive(Debug, Default, Deserialize)]
pub struct ResendQuery {
    pub email: Option<String>,
}

/// Response returned after login or refresh.
#[derive(Debug, Serialize)]
pub struct AuthResponse {
    pub access_token: String,
    pub refresh_token: String,
    pub user: PublicUser,
}

/// Public part of the user returned to the client.
#[derive(Debug, Serialize)]
pub struct PublicUser {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub email_verified: bool,
}

#[derive(Debug, Serialize)]
pub struct SignUpResponse {
    pub user: PublicUser,
    pub redirect: String,
}

#[derive(Debug, Serialize)]
pub struct FormErrorResponse {
    pub errors: FieldErrors,
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub redirect: Option<String>,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            redirect: None,
        }
    }

    pub fn with_redirect(message: impl Into<String>, redirect: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            redirect: Some(redirect.into()),
        }
    }
}

/// Login refused because the address is not verified yet.
#[derive(Debug, Serialize)]
pub struct UnverifiedResponse {
    pub error: &'static str,
    pub message: String,
    pub email: String,
    pub redirect: String,
}
