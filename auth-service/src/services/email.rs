use async_trait::async_trait;
use lettre::{
    message::header::ContentType, transport::smtp::authentication::Credentials, Message,
    SmtpTransport, Transport,
};
use service_core::error::AppError;
use std::time::Duration;

use crate::config::SmtpConfig;

/// Email delivery capability. The OTP issuer only depends on this trait, so
/// SMTP can be swapped for the console provider in dev and mocks in tests.
#[async_trait]
pub trait EmailProvider: Send + Sync {
    async fn send_otp_email(&self, to_email: &str, code: &str) -> Result<(), AppError>;
}

#[derive(Clone)]
pub struct SmtpEmailService {
    mailer: SmtpTransport,
    from_email: String,
}

impl SmtpEmailService {
    pub fn new(config: &SmtpConfig) -> Result<Self, AppError> {
        let creds = Credentials::new(config.user.clone(), config.password.clone());

        let mailer = SmtpTransport::relay(&config.host)
            .map_err(|e| AppError::InternalError(anyhow::anyhow!(e.to_string())))?
            .credentials(creds)
            .port(587)
            .timeout(Some(Duration::from_secs(10)))
            .build();

        tracing::info!(host = %config.host, "Email service initialized with SMTP");

        Ok(Self {
            mailer,
            from_email: config.user.clone(),
        })
    }
}

#[async_trait]
impl EmailProvider for SmtpEmailService {
    async fn send_otp_email(&self, to_email: &str, code: &str) -> Result<(), AppError> {
        let html_body = format!(
            r#"<h2>OTP Verification</h2>
<p>Your one-time password is:</p>
<h1 style="letter-spacing: 5px; font-weight: bold;">{}</h1>
<p>This code will expire in 10 minutes.</p>
<p>Do not share this code with anyone.</p>"#,
            code
        );

        let plain_body = format!(
            "Your one-time password is: {}\n\nThis code will expire in 10 minutes.\nDo not share this code with anyone.",
            code
        );

        let email = Message::builder()
            .from(self.from_email.parse().map_err(
                |e: lettre::address::AddressError| AppError::InternalError(e.into()),
            )?)
            .to(to_email.parse().map_err(
                |e: lettre::address::AddressError| AppError::DeliveryError(e.to_string()),
            )?)
            .subject("Your iReporter OTP Code")
            .multipart(
                lettre::message::MultiPart::alternative()
                    .singlepart(
                        lettre::message::SinglePart::builder()
                            .header(ContentType::TEXT_PLAIN)
                            .body(plain_body),
                    )
                    .singlepart(
                        lettre::message::SinglePart::builder()
                            .header(ContentType::TEXT_HTML)
                            .body(html_body),
                    ),
            )
            .map_err(|e| AppError::InternalError(e.into()))?;

        // Send in the blocking pool to keep the async runtime free.
        let mailer = self.mailer.clone();
        let result = tokio::task::spawn_blocking(move || mailer.send(&email))
            .await
            .map_err(|e| AppError::InternalError(e.into()))?;

        match result {
            Ok(_) => {
                tracing::info!(to = %to_email, "OTP email sent");
                Ok(())
            }
            Err(e) => {
                tracing::error!(error = %e.to_string(), to = %to_email, "Failed to send OTP email");
                Err(AppError::DeliveryError(e.to_string()))
            }
        }
    }
}

/// Dev-only provider: logs the code instead of sending mail.
#[derive(Clone)]
pub struct ConsoleEmailService;

#[async_trait]
impl EmailProvider for ConsoleEmailService {
    async fn send_otp_email(&self, to_email: &str, code: &str) -> Result<(), AppError> {
        tracing::info!(to = %to_email, code = %code, "OTP email (console mode)");
        Ok(())
    }
}

/// Test double: records every send and can be flipped into failure mode.
#[cfg(test)]
#[derive(Default)]
pub struct MockEmailService {
    pub sent: std::sync::Mutex<Vec<(String, String)>>,
    pub fail: std::sync::atomic::AtomicBool,
}

#[cfg(test)]
impl MockEmailService {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_failing(&self, failing: bool) {
        self.fail
            .store(failing, std::sync::atomic::Ordering::SeqCst);
    }

    /// The code most recently sent to `email`, if any.
    pub fn last_code_for(&self, email: &str) -> Option<String> {
        self.sent
            .lock()
            .unwrap()
            .iter()
            .rev()
            .find(|(to, _)| to == email)
            .map(|(_, code)| code.clone())
    }
}

#[cfg(test)]
#[async_trait]
impl EmailProvider for MockEmailService {
    async fn send_otp_email(&self, to_email: &str, code: &str) -> Result<(), AppError> {
        if self.fail.load(std::sync::atomic::Ordering::SeqCst) {
            return Err(AppError::DeliveryError("SMTP connection refused".to_string()));
        }
        self.sent
            .lock()
            .unwrap()
            .push((to_email.to_string(), code.to_string()));
        Ok(())
    }
}
