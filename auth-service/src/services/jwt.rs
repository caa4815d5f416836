use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::config::JwtConfig;

/// Session token service.
///
/// Tokens are HS256-signed with a process-wide secret and carry identity and
/// role. Validity is determined purely by signature and expiry at request
/// time; there is no revocation list, so a token stays valid until it
/// expires naturally.
#[derive(Clone)]
pub struct JwtService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    token_expiry_hours: i64,
}

/// Session token claims.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Subject (user ID)
    pub sub: String,
    /// Role code (`user` | `admin`)
    pub role: String,
    /// Expiration time (Unix timestamp)
    pub exp: i64,
    /// Issued at (Unix timestamp)
    pub iat: i64,
    /// JWT ID
    pub jti: String,
}

impl JwtService {
    pub fn new(config: &JwtConfig) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(config.secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(config.secret.as_bytes()),
            token_expiry_hours: config.token_expiry_hours,
        }
    }

    /// Issue a session token for a user.
    pub fn issue(&self, user_id: Uuid, role: &str) -> Result<String, anyhow::Error> {
        let now = Utc::now();
        let exp = now + Duration::hours(self.token_expiry_hours);

        let claims = Claims {
            sub: user_id.to_string(),
            role: role.to_string(),
            exp: exp.timestamp(),
            iat: now.timestamp(),
            jti: Uuid::new_v4().to_string(),
        };

        encode(&Header::default(), &claims, &self.encoding_key)
            .map_err(|e| anyhow::anyhow!("Failed to encode session token: {}", e))
    }

    /// Validate and decode a session token.
    pub fn validate(&self, token: &str) -> Result<Claims, anyhow::Error> {
        let mut validation = Validation::default();
        validation.validate_exp = true;

        let token_data = decode::<Claims>(token, &self.decoding_key, &validation)
            .map_err(|e| anyhow::anyhow!("Invalid session token: {}", e))?;

        Ok(token_data.claims)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn service(expiry_hours: i64) -> JwtService {
        JwtService::new(&JwtConfig {
            secret: "test-secret-at-least-32-bytes-long!".to_string(),
            token_expiry_hours: expiry_hours,
        })
    }

    #[test]
    fn token_round_trips_identity_and_role() {
        let svc = service(24);
        let user_id = Uuid::new_v4();

        let token = svc.issue(user_id, "admin").unwrap();
        let claims = svc.validate(&token).unwrap();

        assert_eq!(claims.sub, user_id.to_string());
        assert_eq!(claims.role, "admin");
    }

    #[test]
    fn expiry_matches_configured_window() {
        let svc = service(24);
        let token = svc.issue(Uuid::new_v4(), "user").unwrap();
        let claims = svc.validate(&token).unwrap();

        let lifetime = claims.exp - claims.iat;
        assert_eq!(lifetime, 24 * 3600);
    }

    #[test]
    fn expired_token_fails_validation() {
        // Issue a token already past its expiry (beyond the default leeway).
        let svc = service(-1);
        let token = svc.issue(Uuid::new_v4(), "user").unwrap();

        assert!(svc.validate(&token).is_err());
    }

    #[test]
    fn wrong_secret_fails_validation() {
        let svc = service(24);
        let other = JwtService::new(&JwtConfig {
            secret: "a-completely-different-secret-value".to_string(),
            token_expiry_hours: 24,
        });

        let token = svc.issue(Uuid::new_v4(), "user").unwrap();
        assert!(other.validate(&token).is_err());
    }

    #[test]
    fn garbage_token_fails_validation() {
        let svc = service(24);
        assert!(svc.validate("not-a-token").is_err());
    }
}
