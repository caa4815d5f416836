use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use service_core::error::AppError;

use crate::{
    dtos::{
        auth::{
            AuthResponse, InitiateResponse, OtpVerifyRequest, SigninInitiateRequest,
            SignupInitiateRequest,
        },
        ErrorResponse,
    },
    utils::ValidatedJson,
    AppState,
};

/// Start sign-up: record the pending account and email an OTP.
#[utoipa::path(
    post,
    path = "/auth/signup",
    request_body = SignupInitiateRequest,
    responses(
        (status = 200, description = "OTP sent", body = InitiateResponse),
        (status = 400, description = "Validation error or email already registered", body = ErrorResponse),
        (status = 500, description = "OTP delivery failed", body = ErrorResponse)
    ),
    tag = "Authentication"
)]
pub async fn signup_initiate(
    State(state): State<AppState>,
    ValidatedJson(req): ValidatedJson<SignupInitiateRequest>,
) -> Result<impl IntoResponse, AppError> {
    let res = state.auth_service.signup_initiate(req).await?;
    Ok((StatusCode::OK, Json(res)))
}

/// Finish sign-up: verify the OTP, create the user, return a session token.
#[utoipa::path(
    post,
    path = "/auth/signup/verify",
    request_body = OtpVerifyRequest,
    responses(
        (status = 201, description = "User created", body = AuthResponse),
        (status = 400, description = "Invalid or expired OTP, or signup session expired", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    ),
    tag = "Authentication"
)]
pub async fn signup_verify(
    State(state): State<AppState>,
    ValidatedJson(req): ValidatedJson<OtpVerifyRequest>,
) -> Result<impl IntoResponse, AppError> {
    let res = state.auth_service.signup_complete(req).await?;
    Ok((StatusCode::CREATED, Json(res)))
}

/// Start sign-in: check credentials and email an OTP.
#[utoipa::path(
    post,
    path = "/auth/signin",
    request_body = SigninInitiateRequest,
    responses(
        (status = 200, description = "OTP sent (or generated, if delivery failed)", body = InitiateResponse),
        (status = 401, description = "Invalid email or password", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    ),
    tag = "Authentication"
)]
pub async fn signin_initiate(
    State(state): State<AppState>,
    ValidatedJson(req): ValidatedJson<SigninInitiateRequest>,
) -> Result<impl IntoResponse, AppError> {
    let res = state.auth_service.signin_initiate(req).await?;
    Ok((StatusCode::OK, Json(res)))
}

/// Finish sign-in: verify the OTP and return a session token.
#[utoipa::path(
    post,
    path = "/auth/signin/verify",
    request_body = OtpVerifyRequest,
    responses(
        (status = 200, description = "Signed in", body = AuthResponse),
        (status = 400, description = "Invalid or expired OTP", body = ErrorResponse),
        (status = 404, description = "User not found", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    ),
    tag = "Authentication"
)]
pub async fn signin_verify(
    State(state): State<AppState>,
    ValidatedJson(req): ValidatedJson<OtpVerifyRequest>,
) -> Result<impl IntoResponse, AppError> {
    let res = state.auth_service.signin_complete(req).await?;
    Ok((StatusCode::OK, Json(res)))
}
