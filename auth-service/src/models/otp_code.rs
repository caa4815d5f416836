//! OTP code model - short-lived one-time passcodes keyed by email.

use chrono::{DateTime, Duration, Utc};
use sqlx::FromRow;
use uuid::Uuid;

/// One-time passcode record.
///
/// The code is a fixed-width 6-digit string; leading zeros are significant.
/// Multiple records may exist for the same email; at verification time the
/// most recently created unexpired record is authoritative.
#[derive(Debug, Clone, FromRow)]
pub struct OtpCode {
    pub otp_id: Uuid,
    pub email: String,
    pub code: String,
    pub expiry_utc: DateTime<Utc>,
    pub created_utc: DateTime<Utc>,
}

impl OtpCode {
    /// Create a new OTP record expiring `ttl` from now.
    pub fn new(email: &str, code: String, ttl: Duration) -> Self {
        let now = Utc::now();
        Self {
            otp_id: Uuid::new_v4(),
            email: email.to_string(),
            code,
            expiry_utc: now + ttl,
            created_utc: now,
        }
    }

    pub fn is_expired(&self) -> bool {
        Utc::now() > self.expiry_utc
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_code_is_not_expired() {
        let otp = OtpCode::new("a@x.com", "042913".to_string(), Duration::minutes(10));
        assert!(!otp.is_expired());
        assert_eq!(otp.code, "042913");
    }

    #[test]
    fn negative_ttl_is_expired() {
        let otp = OtpCode::new("a@x.com", "000000".to_string(), Duration::minutes(-1));
        assert!(otp.is_expired());
    }
}
