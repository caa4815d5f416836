use std::sync::Arc;

use uuid::Uuid;

use crate::dtos::auth::{
    AuthResponse, InitiateResponse, OtpVerifyRequest, SigninInitiateRequest,
    SignupInitiateRequest, UpdateProfileRequest,
};
use crate::models::{PendingSignup, User, UserResponse};
use crate::services::{JwtService, OtpIssuer, ServiceError};
use crate::stores::{OtpStore, PendingSignupStore, UserStore};
use crate::utils::{hash_password, verify_password, Password, PasswordHashString};

/// Orchestrates the two two-step authentication flows.
///
/// Sign-up: initiate (credentials -> pending record + OTP) then complete
/// (OTP -> persisted user + session token). Sign-in: initiate (credentials
/// -> OTP) then complete (OTP -> session token). All state lives behind the
/// injected stores.
#[derive(Clone)]
pub struct AuthService {
    users: Arc<dyn UserStore>,
    otps: Arc<dyn OtpStore>,
    pending: Arc<dyn PendingSignupStore>,
    issuer: OtpIssuer,
    jwt: JwtService,
    min_password_length: usize,
}

impl AuthService {
    pub fn new(
        users: Arc<dyn UserStore>,
        otps: Arc<dyn OtpStore>,
        pending: Arc<dyn PendingSignupStore>,
        issuer: OtpIssuer,
        jwt: JwtService,
        min_password_length: usize,
    ) -> Self {
        Self {
            users,
            otps,
            pending,
            issuer,
            jwt,
            min_password_length,
        }
    }

    /// Sign-up step 1: validate, stash the pending signup, dispatch an OTP.
    ///
    /// Delivery failure is fatal here: the pending record and the freshly
    /// written OTP are both discarded so the client has to start over.
    pub async fn signup_initiate(
        &self,
        req: SignupInitiateRequest,
    ) -> Result<InitiateResponse, ServiceError> {
        if self.users.find_by_email(&req.email).await?.is_some() {
            return Err(ServiceError::EmailAlreadyRegistered);
        }

        if req.password.len() < self.min_password_length {
            return Err(ServiceError::Validation(format!(
                "Password must be at least {} characters",
                self.min_password_length
            )));
        }

        self.pending
            .put(PendingSignup::new(
                req.email.clone(),
                req.password,
                req.name,
                req.role.unwrap_or_default(),
            ))
            .await?;

        match self.issuer.issue(&req.email).await {
            Ok(()) => Ok(InitiateResponse {
                email: req.email,
                message: "Verification code sent to your email".to_string(),
            }),
            Err(ServiceError::Delivery(msg)) => {
                self.pending.remove(&req.email).await?;
                self.otps.invalidate(&req.email).await?;
                Err(ServiceError::Delivery(msg))
            }
            Err(e) => Err(e),
        }
    }

    /// Sign-up step 2: verify the OTP and promote the pending signup into a
    /// persisted user.
    pub async fn signup_complete(
        &self,
        req: OtpVerifyRequest,
    ) -> Result<AuthResponse, ServiceError> {
        if !self.otps.verify(&req.email, &req.code).await? {
            return Err(ServiceError::InvalidOtp);
        }

        let pending = self
            .pending
            .get(&req.email)
            .await?
            .ok_or(ServiceError::SignupSessionExpired)?;

        let password_hash = hash_password(&Password::new(pending.password.clone()))
            .map_err(ServiceError::Internal)?;

        let user = User::new(
            pending.email.clone(),
            password_hash.into_string(),
            pending.display_name.clone(),
            pending.role,
        );
        self.users.insert(&user).await?;

        self.otps.invalidate(&req.email).await?;
        self.pending.remove(&req.email).await?;

        let token = self
            .jwt
            .issue(user.user_id, &user.role_code)
            .map_err(ServiceError::Internal)?;

        tracing::info!(user_id = %user.user_id, "User registered");

        Ok(AuthResponse {
            user: user.sanitized(),
            token,
        })
    }

    /// Sign-in step 1: check credentials, dispatch an OTP.
    ///
    /// Unknown email and wrong password produce the identical error.
    /// Delivery failure is non-fatal: the OTP stays valid and the caller
    /// gets the softer "check your spam folder" message.
    pub async fn signin_initiate(
        &self,
        req: SigninInitiateRequest,
    ) -> Result<InitiateResponse, ServiceError> {
        let user = self
            .users
            .find_by_email(&req.email)
            .await?
            .ok_or(ServiceError::InvalidCredentials)?;

        verify_password(
            &Password::new(req.password),
            &PasswordHashString::new(user.password_hash.clone()),
        )
        .map_err(|_| ServiceError::InvalidCredentials)?;

        match self.issuer.issue(&req.email).await {
            Ok(()) => Ok(InitiateResponse {
                email: req.email,
                message: "OTP sent to email. Please verify to complete login.".to_string(),
            }),
            Err(ServiceError::Delivery(msg)) => {
                tracing::warn!(email = %req.email, error = %msg, "OTP email delivery failed; code remains valid");
                Ok(InitiateResponse {
                    email: req.email,
                    message: "OTP generated. Check your email or spam folder.".to_string(),
                })
            }
            Err(e) => Err(e),
        }
    }

    /// Sign-in step 2: verify the OTP and mint a session token.
    pub async fn signin_complete(
        &self,
        req: OtpVerifyRequest,
    ) -> Result<AuthResponse, ServiceError> {
        if !self.otps.verify(&req.email, &req.code).await? {
            return Err(ServiceError::InvalidOtp);
        }

        // The user may have been deleted between the two steps.
        let user = self
            .users
            .find_by_email(&req.email)
            .await?
            .ok_or(ServiceError::UserNotFound)?;

        self.otps.invalidate(&req.email).await?;

        let token = self
            .jwt
            .issue(user.user_id, &user.role_code)
            .map_err(ServiceError::Internal)?;

        tracing::info!(user_id = %user.user_id, "User signed in");

        Ok(AuthResponse {
            user: user.sanitized(),
            token,
        })
    }

    pub async fn get_me(&self, user_id: Uuid) -> Result<UserResponse, ServiceError> {
        let user = self
            .users
            .find_by_id(user_id)
            .await?
            .ok_or(ServiceError::UserNotFound)?;
        Ok(user.sanitized())
    }

    pub async fn update_profile(
        &self,
        user_id: Uuid,
        req: UpdateProfileRequest,
    ) -> Result<UserResponse, ServiceError> {
        let user = self
            .users
            .find_by_id(user_id)
            .await?
            .ok_or(ServiceError::UserNotFound)?;

        if let Some(new_email) = &req.email {
            if new_email != &user.email && self.users.find_by_email(new_email).await?.is_some() {
                return Err(ServiceError::EmailAlreadyRegistered);
            }
        }

        let updated = self
            .users
            .update_profile(
                user_id,
                req.name.unwrap_or(user.display_name),
                req.email.unwrap_or(user.email),
                req.profile_picture.or(user.profile_picture),
            )
            .await?;

        Ok(updated.sanitized())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::JwtConfig;
    use crate::models::OtpCode;
    use crate::services::MockEmailService;
    use crate::stores::{MemoryOtpStore, MemoryPendingSignupStore, MemoryUserStore};

    struct Harness {
        service: AuthService,
        otps: Arc<MemoryOtpStore>,
        pending: Arc<MemoryPendingSignupStore>,
        users: Arc<MemoryUserStore>,
        email: Arc<MockEmailService>,
        jwt: JwtService,
    }

    fn harness() -> Harness {
        let users = Arc::new(MemoryUserStore::new());
        let otps = Arc::new(MemoryOtpStore::new());
        let pending = Arc::new(MemoryPendingSignupStore::new());
        let email = Arc::new(MockEmailService::new());
        let jwt = JwtService::new(&JwtConfig {
            secret: "test-secret-at-least-32-bytes-long!".to_string(),
            token_expiry_hours: 24,
        });
        let issuer = OtpIssuer::new(otps.clone(), email.clone(), 10);
        let service = AuthService::new(
            users.clone(),
            otps.clone(),
            pending.clone(),
            issuer,
            jwt.clone(),
            6,
        );
        Harness {
            service,
            otps,
            pending,
            users,
            email,
            jwt,
        }
    }

    fn signup_req(email: &str, password: &str) -> SignupInitiateRequest {
        SignupInitiateRequest {
            email: email.to_string(),
            password: password.to_string(),
            name: "Jane Doe".to_string(),
            role: None,
        }
    }

    fn verify_req(email: &str, code: &str) -> OtpVerifyRequest {
        OtpVerifyRequest {
            email: email.to_string(),
            code: code.to_string(),
        }
    }

    async fn register(h: &Harness, email: &str, password: &str) -> AuthResponse {
        h.service
            .signup_initiate(signup_req(email, password))
            .await
            .unwrap();
        let code = h.email.last_code_for(email).unwrap();
        h.service
            .signup_complete(verify_req(email, &code))
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn signup_flow_creates_user_and_valid_token() {
        let h = harness();
        let res = register(&h, "jane@x.com", "hunter22").await;

        assert_eq!(res.user.email, "jane@x.com");
        assert_eq!(res.user.role_code, "user");

        let claims = h.jwt.validate(&res.token).unwrap();
        assert_eq!(claims.sub, res.user.user_id.to_string());
        assert_eq!(claims.role, "user");

        // Password is stored hashed, not as submitted.
        let stored = h.users.find_by_email("jane@x.com").await.unwrap().unwrap();
        assert_ne!(stored.password_hash, "hunter22");
        assert!(stored.password_hash.starts_with("$argon2"));
    }

    #[tokio::test]
    async fn signup_rejects_duplicate_email() {
        let h = harness();
        register(&h, "jane@x.com", "hunter22").await;

        let err = h
            .service
            .signup_initiate(signup_req("jane@x.com", "hunter22"))
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::EmailAlreadyRegistered));
    }

    #[tokio::test]
    async fn weak_password_leaves_no_trace() {
        let h = harness();
        let err = h
            .service
            .signup_initiate(signup_req("jane@x.com", "abc"))
            .await
            .unwrap_err();

        assert!(matches!(err, ServiceError::Validation(_)));
        assert!(h.otps.find_active("jane@x.com").await.unwrap().is_none());
        assert!(h.pending.get("jane@x.com").await.unwrap().is_none());
        assert!(h.email.last_code_for("jane@x.com").is_none());
    }

    #[tokio::test]
    async fn signup_complete_without_pending_session_is_rejected() {
        let h = harness();
        // OTP exists but no pending signup was ever created.
        h.otps
            .put(OtpCode::new(
                "jane@x.com",
                "042913".to_string(),
                chrono::Duration::minutes(10),
            ))
            .await
            .unwrap();

        let err = h
            .service
            .signup_complete(verify_req("jane@x.com", "042913"))
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::SignupSessionExpired));
    }

    #[tokio::test]
    async fn signup_delivery_failure_rolls_back() {
        let h = harness();
        h.email.set_failing(true);

        let err = h
            .service
            .signup_initiate(signup_req("jane@x.com", "hunter22"))
            .await
            .unwrap_err();

        assert!(matches!(err, ServiceError::Delivery(_)));
        assert!(h.pending.get("jane@x.com").await.unwrap().is_none());
        assert!(h.otps.find_active("jane@x.com").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn signin_failure_is_identical_for_unknown_email_and_wrong_password() {
        let h = harness();
        register(&h, "jane@x.com", "hunter22").await;

        let unknown = h
            .service
            .signin_initiate(SigninInitiateRequest {
                email: "ghost@x.com".to_string(),
                password: "whatever1".to_string(),
            })
            .await
            .unwrap_err();

        let wrong_password = h
            .service
            .signin_initiate(SigninInitiateRequest {
                email: "jane@x.com".to_string(),
                password: "not-the-password".to_string(),
            })
            .await
            .unwrap_err();

        assert!(matches!(unknown, ServiceError::InvalidCredentials));
        assert!(matches!(wrong_password, ServiceError::InvalidCredentials));
        assert_eq!(unknown.to_string(), wrong_password.to_string());
    }

    #[tokio::test]
    async fn signin_flow_succeeds_and_replay_fails() {
        let h = harness();
        register(&h, "jane@x.com", "hunter22").await;

        h.service
            .signin_initiate(SigninInitiateRequest {
                email: "jane@x.com".to_string(),
                password: "hunter22".to_string(),
            })
            .await
            .unwrap();

        let code = h.email.last_code_for("jane@x.com").unwrap();
        let res = h
            .service
            .signin_complete(verify_req("jane@x.com", &code))
            .await
            .unwrap();
        assert_eq!(res.user.email, "jane@x.com");

        // The code was consumed on success; replay must fail.
        let replay = h
            .service
            .signin_complete(verify_req("jane@x.com", &code))
            .await
            .unwrap_err();
        assert!(matches!(replay, ServiceError::InvalidOtp));
    }

    #[tokio::test]
    async fn signin_delivery_failure_is_soft_and_code_stays_valid() {
        let h = harness();
        register(&h, "jane@x.com", "hunter22").await;
        h.email.set_failing(true);

        let res = h
            .service
            .signin_initiate(SigninInitiateRequest {
                email: "jane@x.com".to_string(),
                password: "hunter22".to_string(),
            })
            .await
            .unwrap();
        assert_eq!(res.message, "OTP generated. Check your email or spam folder.");

        // The undelivered code is still in the ledger and still works.
        let code = h.otps.find_active("jane@x.com").await.unwrap().unwrap().code;
        h.email.set_failing(false);
        let completed = h
            .service
            .signin_complete(verify_req("jane@x.com", &code))
            .await
            .unwrap();
        assert_eq!(completed.user.email, "jane@x.com");
    }

    #[tokio::test]
    async fn second_otp_supersedes_the_first() {
        let h = harness();
        register(&h, "jane@x.com", "hunter22").await;

        let signin = SigninInitiateRequest {
            email: "jane@x.com".to_string(),
            password: "hunter22".to_string(),
        };
        h.service.signin_initiate(signin).await.unwrap();
        let first = h.email.last_code_for("jane@x.com").unwrap();

        tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        h.service
            .signin_initiate(SigninInitiateRequest {
                email: "jane@x.com".to_string(),
                password: "hunter22".to_string(),
            })
            .await
            .unwrap();
        let second = h.email.last_code_for("jane@x.com").unwrap();

        if first != second {
            assert!(!h.otps.verify("jane@x.com", &first).await.unwrap());
        }
        assert!(h.otps.verify("jane@x.com", &second).await.unwrap());
    }

    #[tokio::test]
    async fn seeded_code_verifies_exactly_once() {
        let h = harness();
        register(&h, "a@x.com", "hunter22").await;
        h.otps.invalidate("a@x.com").await.unwrap();

        h.otps
            .put(OtpCode::new(
                "a@x.com",
                "042913".to_string(),
                chrono::Duration::minutes(10),
            ))
            .await
            .unwrap();

        assert!(h
            .service
            .signin_complete(verify_req("a@x.com", "042913"))
            .await
            .is_ok());
        assert!(matches!(
            h.service
                .signin_complete(verify_req("a@x.com", "042913"))
                .await
                .unwrap_err(),
            ServiceError::InvalidOtp
        ));
    }

    #[tokio::test]
    async fn signin_complete_when_user_vanished_is_not_found() {
        let h = harness();
        // Seed an OTP for an email with no user behind it.
        h.otps
            .put(OtpCode::new(
                "gone@x.com",
                "111111".to_string(),
                chrono::Duration::minutes(10),
            ))
            .await
            .unwrap();

        let err = h
            .service
            .signin_complete(verify_req("gone@x.com", "111111"))
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::UserNotFound));
    }

    #[tokio::test]
    async fn profile_update_rejects_taken_email() {
        let h = harness();
        let jane = register(&h, "jane@x.com", "hunter22").await;
        register(&h, "john@x.com", "hunter22").await;

        let err = h
            .service
            .update_profile(
                jane.user.user_id,
                UpdateProfileRequest {
                    name: None,
                    email: Some("john@x.com".to_string()),
                    profile_picture: None,
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::EmailAlreadyRegistered));
    }

    #[tokio::test]
    async fn profile_update_merges_unset_fields() {
        let h = harness();
        let jane = register(&h, "jane@x.com", "hunter22").await;

        let updated = h
            .service
            .update_profile(
                jane.user.user_id,
                UpdateProfileRequest {
                    name: Some("Jane D.".to_string()),
                    email: None,
                    profile_picture: None,
                },
            )
            .await
            .unwrap();

        assert_eq!(updated.display_name, "Jane D.");
        assert_eq!(updated.email, "jane@x.com");
    }
}
