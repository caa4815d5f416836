pub mod auth;
pub mod email;
pub mod error;
pub mod jwt;
pub mod otp;

pub use auth::AuthService;
pub use email::{ConsoleEmailService, EmailProvider, SmtpEmailService};
#[cfg(test)]
pub use email::MockEmailService;
pub use error::ServiceError;
pub use jwt::{Claims, JwtService};
pub use otp::OtpIssuer;
