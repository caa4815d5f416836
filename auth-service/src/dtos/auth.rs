use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

use crate::models::{Role, UserResponse};

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct SignupInitiateRequest {
    #[validate(email(message = "Invalid email format"))]
    #[schema(example = "user@example.com")]
    pub email: String,

    // The minimum-length policy itself is enforced by the orchestrator.
    #[validate(length(min = 1, message = "Password is required"))]
    #[schema(example = "hunter22")]
    pub password: String,

    #[validate(length(min = 1, message = "Name is required"))]
    #[schema(example = "Jane Doe")]
    pub name: String,

    pub role: Option<Role>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct SigninInitiateRequest {
    #[validate(email(message = "Invalid email format"))]
    #[schema(example = "user@example.com")]
    pub email: String,

    #[validate(length(min = 1, message = "Password is required"))]
    #[schema(example = "hunter22")]
    pub password: String,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct OtpVerifyRequest {
    #[validate(email(message = "Invalid email format"))]
    #[schema(example = "user@example.com")]
    pub email: String,

    #[validate(length(min = 1, message = "OTP code is required"))]
    #[schema(example = "042913")]
    pub code: String,
}

/// Response to either initiate step: the OTP has been dispatched (or, for
/// sign-in with a delivery hiccup, generated).
#[derive(Debug, Serialize, ToSchema)]
pub struct InitiateResponse {
    #[schema(example = "user@example.com")]
    pub email: String,
    #[schema(example = "OTP sent to email. Please verify to complete login.")]
    pub message: String,
}

/// Response to either verify step: the sanitized user plus a session token.
#[derive(Debug, Serialize, ToSchema)]
pub struct AuthResponse {
    pub user: UserResponse,
    pub token: String,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct UpdateProfileRequest {
    #[validate(length(min = 1, message = "Name must not be empty"))]
    #[schema(example = "Jane Doe")]
    pub name: Option<String>,

    #[validate(email(message = "Invalid email format"))]
    #[schema(example = "user@example.com")]
    pub email: Option<String>,

    pub profile_picture: Option<String>,
}
