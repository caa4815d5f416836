//! Injectable storage abstractions.
//!
//! The orchestration layer only ever talks to these traits, so the backing
//! can be swapped between the in-memory and PostgreSQL implementations
//! without touching flow logic.

pub mod memory;
pub mod postgres;

use async_trait::async_trait;
use thiserror::Error;
use uuid::Uuid;

use crate::models::{OtpCode, PendingSignup, User};

pub use memory::{MemoryOtpStore, MemoryPendingSignupStore, MemoryUserStore};
pub use postgres::{PgOtpStore, PgUserStore};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Storage failure: {0}")]
    Backend(#[from] anyhow::Error),

    #[error("Email already registered")]
    DuplicateEmail,
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        if let sqlx::Error::Database(db) = &err {
            if matches!(db.kind(), sqlx::error::ErrorKind::UniqueViolation) {
                return StoreError::DuplicateEmail;
            }
        }
        StoreError::Backend(anyhow::Error::new(err))
    }
}

/// The credential store: the persisted user directory.
#[async_trait]
pub trait UserStore: Send + Sync {
    /// Look up a user by email. Case-sensitive, as stored.
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, StoreError>;

    async fn find_by_id(&self, user_id: Uuid) -> Result<Option<User>, StoreError>;

    /// Insert a new user. The email uniqueness constraint lives here, so a
    /// concurrent duplicate insert surfaces as [`StoreError::DuplicateEmail`]
    /// rather than a second row.
    async fn insert(&self, user: &User) -> Result<(), StoreError>;

    /// Replace the mutable profile fields of an existing user.
    async fn update_profile(
        &self,
        user_id: Uuid,
        display_name: String,
        email: String,
        profile_picture: Option<String>,
    ) -> Result<User, StoreError>;
}

/// The OTP ledger: exclusive owner of one-time passcode records.
#[async_trait]
pub trait OtpStore: Send + Sync {
    /// Store a new record. Does not deduplicate; multiple live records may
    /// coexist for the same email.
    async fn put(&self, record: OtpCode) -> Result<(), StoreError>;

    /// The most recently created unexpired record for `email`, if any.
    async fn find_active(&self, email: &str) -> Result<Option<OtpCode>, StoreError>;

    /// Delete all records for `email`. Returns the number removed.
    async fn invalidate(&self, email: &str) -> Result<u64, StoreError>;

    /// Delete all expired records. Idempotent; each sweep compares against a
    /// single point in time. Returns the number removed.
    async fn sweep_expired(&self) -> Result<u64, StoreError>;

    /// True iff an active record exists and its code equals `candidate`
    /// exactly. Plain string equality, no normalization; the comparison is
    /// not timing-safe (known weakness, kept as observed behavior).
    async fn verify(&self, email: &str, candidate: &str) -> Result<bool, StoreError> {
        Ok(self
            .find_active(email)
            .await?
            .is_some_and(|otp| otp.code == candidate))
    }
}

/// Holder of registration data between sign-up initiate and verify.
#[async_trait]
pub trait PendingSignupStore: Send + Sync {
    /// Store a pending signup, overwriting any prior record for the email.
    async fn put(&self, pending: PendingSignup) -> Result<(), StoreError>;

    async fn get(&self, email: &str) -> Result<Option<PendingSignup>, StoreError>;

    async fn remove(&self, email: &str) -> Result<(), StoreError>;
}
