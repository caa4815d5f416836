use rand::Rng;
use std::sync::Arc;

use crate::models::OtpCode;
use crate::services::{EmailProvider, ServiceError};
use crate::stores::OtpStore;

/// Generates one-time passcodes, records them in the ledger and hands them
/// to the email provider.
#[derive(Clone)]
pub struct OtpIssuer {
    store: Arc<dyn OtpStore>,
    email: Arc<dyn EmailProvider>,
    ttl: chrono::Duration,
}

impl OtpIssuer {
    pub fn new(store: Arc<dyn OtpStore>, email: Arc<dyn EmailProvider>, ttl_minutes: i64) -> Self {
        Self {
            store,
            email,
            ttl: chrono::Duration::minutes(ttl_minutes),
        }
    }

    /// A code drawn uniformly from `000000`..=`999999`, zero-padded so
    /// leading zeros survive.
    pub fn generate_code() -> String {
        format!("{:06}", rand::thread_rng().gen_range(0..1_000_000))
    }

    /// Generate a code, persist it, then deliver it.
    ///
    /// The ledger write happens before delivery, so on a delivery failure
    /// the code is already stored. Whether that failure is fatal (and the
    /// write rolled back) is the caller's decision; the two flows differ.
    pub async fn issue(&self, email_addr: &str) -> Result<(), ServiceError> {
        let code = Self::generate_code();
        self.store
            .put(OtpCode::new(email_addr, code.clone(), self.ttl))
            .await?;

        self.email
            .send_otp_email(email_addr, &code)
            .await
            .map_err(|e| ServiceError::Delivery(e.to_string()))?;

        tracing::info!(email = %email_addr, "OTP issued");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::MockEmailService;
    use crate::stores::MemoryOtpStore;

    #[test]
    fn generated_codes_are_six_digits() {
        for _ in 0..1000 {
            let code = OtpIssuer::generate_code();
            assert_eq!(code.len(), 6);
            assert!(code.chars().all(|c| c.is_ascii_digit()));
        }
    }

    #[tokio::test]
    async fn issue_stores_the_delivered_code() {
        let store = Arc::new(MemoryOtpStore::new());
        let email = Arc::new(MockEmailService::new());
        let issuer = OtpIssuer::new(store.clone(), email.clone(), 10);

        issuer.issue("a@x.com").await.unwrap();

        let code = email.last_code_for("a@x.com").unwrap();
        assert!(store.verify("a@x.com", &code).await.unwrap());
    }

    #[tokio::test]
    async fn delivery_failure_leaves_code_in_ledger() {
        let store = Arc::new(MemoryOtpStore::new());
        let email = Arc::new(MockEmailService::new());
        email.set_failing(true);
        let issuer = OtpIssuer::new(store.clone(), email, 10);

        let err = issuer.issue("a@x.com").await.unwrap_err();
        assert!(matches!(err, ServiceError::Delivery(_)));
        // Rollback is the caller's call; the issuer itself keeps the record.
        assert!(store.find_active("a@x.com").await.unwrap().is_some());
    }
}
