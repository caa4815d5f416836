pub mod otp_code;
pub mod pending_signup;
pub mod user;

pub use otp_code::OtpCode;
pub use pending_signup::PendingSignup;
pub use user::{Role, User, UserResponse};
