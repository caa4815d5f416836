//! PostgreSQL store implementations.
//!
//! Runtime-checked sqlx queries; the schema lives in `migrations/`. Email
//! lookups are case-sensitive, matching how emails are stored.

use async_trait::async_trait;
use sqlx::postgres::PgPool;
use uuid::Uuid;

use crate::models::{OtpCode, User};
use crate::stores::{OtpStore, StoreError, UserStore};

#[derive(Clone)]
pub struct PgUserStore {
    pool: PgPool,
}

impl PgUserStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UserStore for PgUserStore {
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE email = $1")
            .bind(email)
            .fetch_optional(&self.pool)
            .await?;
        Ok(user)
    }

    async fn find_by_id(&self, user_id: Uuid) -> Result<Option<User>, StoreError> {
        let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE user_id = $1")
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(user)
    }

    async fn insert(&self, user: &User) -> Result<(), StoreError> {
        // The UNIQUE constraint on email makes this insert-or-conflict; a
        // losing racer gets DuplicateEmail instead of a second row.
        sqlx::query(
            r#"
            INSERT INTO users (user_id, email, password_hash, display_name, role_code, profile_picture, created_utc)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(user.user_id)
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(&user.display_name)
        .bind(&user.role_code)
        .bind(&user.profile_picture)
        .bind(user.created_utc)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn update_profile(
        &self,
        user_id: Uuid,
        display_name: String,
        email: String,
        profile_picture: Option<String>,
    ) -> Result<User, StoreError> {
        let user = sqlx::query_as::<_, User>(
            r#"
            UPDATE users
            SET display_name = $2, email = $3, profile_picture = $4
            WHERE user_id = $1
            RETURNING *
            "#,
        )
        .bind(user_id)
        .bind(display_name)
        .bind(email)
        .bind(profile_picture)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| StoreError::Backend(anyhow::anyhow!("User not found: {}", user_id)))?;
        Ok(user)
    }
}

#[derive(Clone)]
pub struct PgOtpStore {
    pool: PgPool,
}

impl PgOtpStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl OtpStore for PgOtpStore {
    async fn put(&self, record: OtpCode) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO otp_codes (otp_id, email, code, expiry_utc, created_utc)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(record.otp_id)
        .bind(&record.email)
        .bind(&record.code)
        .bind(record.expiry_utc)
        .bind(record.created_utc)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn find_active(&self, email: &str) -> Result<Option<OtpCode>, StoreError> {
        let otp = sqlx::query_as::<_, OtpCode>(
            r#"
            SELECT * FROM otp_codes
            WHERE email = $1 AND expiry_utc > NOW()
            ORDER BY created_utc DESC
            LIMIT 1
            "#,
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;
        Ok(otp)
    }

    async fn invalidate(&self, email: &str) -> Result<u64, StoreError> {
        let result = sqlx::query("DELETE FROM otp_codes WHERE email = $1")
            .bind(email)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }

    async fn sweep_expired(&self) -> Result<u64, StoreError> {
        // NOW() is evaluated once per statement, so the sweep and any
        // concurrent find_active agree on the cutoff.
        let result = sqlx::query("DELETE FROM otp_codes WHERE expiry_utc <= NOW()")
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }
}
