use service_core::error::AppError;
use thiserror::Error;

use crate::stores::StoreError;

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("Storage error: {0}")]
    Storage(anyhow::Error),

    #[error("Invalid email or password")]
    InvalidCredentials,

    #[error("Email already registered")]
    EmailAlreadyRegistered,

    #[error("Invalid or expired OTP")]
    InvalidOtp,

    #[error("Signup session expired. Please start over.")]
    SignupSessionExpired,

    #[error("User not found")]
    UserNotFound,

    #[error("Failed to send verification email: {0}")]
    Delivery(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl From<StoreError> for ServiceError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::DuplicateEmail => ServiceError::EmailAlreadyRegistered,
            StoreError::Backend(e) => ServiceError::Storage(e),
        }
    }
}

impl From<ServiceError> for AppError {
    fn from(err: ServiceError) -> Self {
        match err {
            ServiceError::Storage(e) => AppError::StorageError(e),
            ServiceError::InvalidCredentials => {
                // One generic message for unknown email and wrong password.
                AppError::AuthError(anyhow::anyhow!("Invalid email or password"))
            }
            ServiceError::EmailAlreadyRegistered => {
                AppError::Conflict(anyhow::anyhow!("Email already registered"))
            }
            ServiceError::InvalidOtp => AppError::BadRequest(anyhow::anyhow!("Invalid or expired OTP")),
            ServiceError::SignupSessionExpired => {
                AppError::BadRequest(anyhow::anyhow!("Signup session expired. Please start over."))
            }
            ServiceError::UserNotFound => AppError::NotFound(anyhow::anyhow!("User not found")),
            ServiceError::Delivery(msg) => AppError::DeliveryError(msg),
            ServiceError::Validation(msg) => AppError::BadRequest(anyhow::anyhow!(msg)),
            ServiceError::Internal(e) => AppError::InternalError(e),
        }
    }
}
