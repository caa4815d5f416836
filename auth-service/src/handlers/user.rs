use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use service_core::error::AppError;
use uuid::Uuid;

use crate::{
    dtos::{auth::UpdateProfileRequest, ErrorResponse},
    middleware::AuthUser,
    models::UserResponse,
    utils::ValidatedJson,
    AppState,
};

fn subject_id(claims_sub: &str) -> Result<Uuid, AppError> {
    claims_sub
        .parse()
        .map_err(|_| AppError::Unauthorized(anyhow::anyhow!("Invalid token subject")))
}

/// The authenticated user's own profile.
#[utoipa::path(
    get,
    path = "/auth/me",
    responses(
        (status = 200, description = "Current user", body = UserResponse),
        (status = 401, description = "Missing or invalid token", body = ErrorResponse),
        (status = 404, description = "User not found", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "User"
)]
pub async fn get_me(
    State(state): State<AppState>,
    AuthUser(claims): AuthUser,
) -> Result<impl IntoResponse, AppError> {
    let user_id = subject_id(&claims.sub)?;
    let res = state.auth_service.get_me(user_id).await?;
    Ok((StatusCode::OK, Json(res)))
}

/// Update the authenticated user's profile. Unset fields keep their value.
#[utoipa::path(
    put,
    path = "/auth/profile",
    request_body = UpdateProfileRequest,
    responses(
        (status = 200, description = "Updated user", body = UserResponse),
        (status = 400, description = "Validation error or email already registered", body = ErrorResponse),
        (status = 401, description = "Missing or invalid token", body = ErrorResponse),
        (status = 404, description = "User not found", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "User"
)]
pub async fn update_profile(
    State(state): State<AppState>,
    AuthUser(claims): AuthUser,
    ValidatedJson(req): ValidatedJson<UpdateProfileRequest>,
) -> Result<impl IntoResponse, AppError> {
    let user_id = subject_id(&claims.sub)?;
    let res = state.auth_service.update_profile(user_id, req).await?;
    Ok((StatusCode::OK, Json(res)))
}
