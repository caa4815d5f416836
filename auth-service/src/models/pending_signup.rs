//! Pending signup model - registration data awaiting OTP confirmation.

use chrono::{DateTime, Utc};

use crate::models::Role;

/// Transient, not-yet-committed registration data keyed by email.
///
/// Lives only between sign-up initiate and sign-up verify. The password is
/// held as submitted and hashed only when the signup is promoted into a
/// persisted [`crate::models::User`]. A new initiate for the same email
/// supersedes any prior record.
#[derive(Debug, Clone)]
pub struct PendingSignup {
    pub email: String,
    pub password: String,
    pub display_name: String,
    pub role: Role,
    pub created_utc: DateTime<Utc>,
}

impl PendingSignup {
    pub fn new(email: String, password: String, display_name: String, role: Role) -> Self {
        Self {
            email,
            password,
            display_name,
            role,
            created_utc: Utc::now(),
        }
    }
}
