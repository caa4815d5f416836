//! In-memory store implementations backed by `DashMap`.
//!
//! Default backing when no `DATABASE_URL` is configured; also what the
//! service-layer tests run against.

use async_trait::async_trait;
use chrono::Utc;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use uuid::Uuid;

use crate::models::{OtpCode, PendingSignup, User};
use crate::stores::{OtpStore, PendingSignupStore, StoreError, UserStore};

/// User directory keyed by email.
#[derive(Default)]
pub struct MemoryUserStore {
    users: DashMap<String, User>,
}

impl MemoryUserStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl UserStore for MemoryUserStore {
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        Ok(self.users.get(email).map(|u| u.clone()))
    }

    async fn find_by_id(&self, user_id: Uuid) -> Result<Option<User>, StoreError> {
        Ok(self
            .users
            .iter()
            .find(|entry| entry.value().user_id == user_id)
            .map(|entry| entry.value().clone()))
    }

    async fn insert(&self, user: &User) -> Result<(), StoreError> {
        match self.users.entry(user.email.clone()) {
            Entry::Occupied(_) => Err(StoreError::DuplicateEmail),
            Entry::Vacant(slot) => {
                slot.insert(user.clone());
                Ok(())
            }
        }
    }

    async fn update_profile(
        &self,
        user_id: Uuid,
        display_name: String,
        email: String,
        profile_picture: Option<String>,
    ) -> Result<User, StoreError> {
        let current = self
            .find_by_id(user_id)
            .await?
            .ok_or_else(|| StoreError::Backend(anyhow::anyhow!("User not found: {}", user_id)))?;

        // Re-keying on email change must not clobber another account.
        if email != current.email && self.users.contains_key(&email) {
            return Err(StoreError::DuplicateEmail);
        }

        let mut updated = current.clone();
        updated.display_name = display_name;
        updated.email = email.clone();
        updated.profile_picture = profile_picture;

        self.users.remove(&current.email);
        self.users.insert(email, updated.clone());
        Ok(updated)
    }
}

/// OTP ledger holding every live record per email, newest last.
#[derive(Default)]
pub struct MemoryOtpStore {
    codes: DashMap<String, Vec<OtpCode>>,
}

impl MemoryOtpStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl OtpStore for MemoryOtpStore {
    async fn put(&self, record: OtpCode) -> Result<(), StoreError> {
        self.codes
            .entry(record.email.clone())
            .or_default()
            .push(record);
        Ok(())
    }

    async fn find_active(&self, email: &str) -> Result<Option<OtpCode>, StoreError> {
        let now = Utc::now();
        Ok(self.codes.get(email).and_then(|records| {
            records
                .iter()
                .filter(|r| r.expiry_utc > now)
                .max_by_key(|r| r.created_utc)
                .cloned()
        }))
    }

    async fn invalidate(&self, email: &str) -> Result<u64, StoreError> {
        Ok(self
            .codes
            .remove(email)
            .map(|(_, records)| records.len() as u64)
            .unwrap_or(0))
    }

    async fn sweep_expired(&self) -> Result<u64, StoreError> {
        // One `now` for the whole sweep so a concurrent verify cannot see a
        // record this sweep considered live.
        let now = Utc::now();
        let mut removed = 0u64;
        self.codes.retain(|_, records| {
            let before = records.len();
            records.retain(|r| r.expiry_utc > now);
            removed += (before - records.len()) as u64;
            !records.is_empty()
        });
        Ok(removed)
    }
}

/// Pending signup records keyed by email.
#[derive(Default)]
pub struct MemoryPendingSignupStore {
    pending: DashMap<String, PendingSignup>,
}

impl MemoryPendingSignupStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl PendingSignupStore for MemoryPendingSignupStore {
    async fn put(&self, pending: PendingSignup) -> Result<(), StoreError> {
        self.pending.insert(pending.email.clone(), pending);
        Ok(())
    }

    async fn get(&self, email: &str) -> Result<Option<PendingSignup>, StoreError> {
        Ok(self.pending.get(email).map(|p| p.clone()))
    }

    async fn remove(&self, email: &str) -> Result<(), StoreError> {
        self.pending.remove(email);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Role;
    use chrono::Duration;

    fn otp(email: &str, code: &str, ttl_minutes: i64) -> OtpCode {
        OtpCode::new(email, code.to_string(), Duration::minutes(ttl_minutes))
    }

    #[tokio::test]
    async fn verify_succeeds_once_then_fails_after_invalidate() {
        let store = MemoryOtpStore::new();
        store.put(otp("a@x.com", "042913", 10)).await.unwrap();

        assert!(store.verify("a@x.com", "042913").await.unwrap());
        store.invalidate("a@x.com").await.unwrap();
        assert!(!store.verify("a@x.com", "042913").await.unwrap());
    }

    #[tokio::test]
    async fn expired_record_never_verifies() {
        let store = MemoryOtpStore::new();
        store.put(otp("a@x.com", "123456", -1)).await.unwrap();

        assert!(store.find_active("a@x.com").await.unwrap().is_none());
        assert!(!store.verify("a@x.com", "123456").await.unwrap());
    }

    #[tokio::test]
    async fn latest_record_wins() {
        let store = MemoryOtpStore::new();
        store.put(otp("a@x.com", "111111", 10)).await.unwrap();
        // Second record created strictly later.
        tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        store.put(otp("a@x.com", "222222", 10)).await.unwrap();

        assert!(!store.verify("a@x.com", "111111").await.unwrap());
        assert!(store.verify("a@x.com", "222222").await.unwrap());
    }

    #[tokio::test]
    async fn verify_is_exact_string_equality() {
        let store = MemoryOtpStore::new();
        store.put(otp("a@x.com", "042913", 10)).await.unwrap();

        assert!(!store.verify("a@x.com", "42913").await.unwrap());
        assert!(!store.verify("a@x.com", " 042913").await.unwrap());
    }

    #[tokio::test]
    async fn sweep_removes_only_expired_and_is_idempotent() {
        let store = MemoryOtpStore::new();
        store.put(otp("a@x.com", "111111", -5)).await.unwrap();
        store.put(otp("a@x.com", "222222", 10)).await.unwrap();
        store.put(otp("b@x.com", "333333", -1)).await.unwrap();

        assert_eq!(store.sweep_expired().await.unwrap(), 2);
        assert_eq!(store.sweep_expired().await.unwrap(), 0);
        assert!(store.verify("a@x.com", "222222").await.unwrap());
        assert!(store.find_active("b@x.com").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn duplicate_insert_is_rejected() {
        let store = MemoryUserStore::new();
        let user = User::new(
            "a@x.com".to_string(),
            "hash".to_string(),
            "Ada".to_string(),
            Role::User,
        );
        store.insert(&user).await.unwrap();

        let dup = User::new(
            "a@x.com".to_string(),
            "other".to_string(),
            "Eve".to_string(),
            Role::User,
        );
        assert!(matches!(
            store.insert(&dup).await,
            Err(StoreError::DuplicateEmail)
        ));
    }

    #[tokio::test]
    async fn email_lookup_is_case_sensitive() {
        let store = MemoryUserStore::new();
        let user = User::new(
            "Ada@x.com".to_string(),
            "hash".to_string(),
            "Ada".to_string(),
            Role::User,
        );
        store.insert(&user).await.unwrap();

        assert!(store.find_by_email("Ada@x.com").await.unwrap().is_some());
        assert!(store.find_by_email("ada@x.com").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn profile_update_rekeys_email() {
        let store = MemoryUserStore::new();
        let user = User::new(
            "a@x.com".to_string(),
            "hash".to_string(),
            "Ada".to_string(),
            Role::User,
        );
        store.insert(&user).await.unwrap();

        let updated = store
            .update_profile(
                user.user_id,
                "Ada L".to_string(),
                "ada@x.com".to_string(),
                Some("pic.png".to_string()),
            )
            .await
            .unwrap();

        assert_eq!(updated.email, "ada@x.com");
        assert!(store.find_by_email("a@x.com").await.unwrap().is_none());
        let fetched = store.find_by_id(user.user_id).await.unwrap().unwrap();
        assert_eq!(fetched.display_name, "Ada L");
        assert_eq!(fetched.profile_picture.as_deref(), Some("pic.png"));
    }

    #[tokio::test]
    async fn pending_signup_put_overwrites() {
        let store = MemoryPendingSignupStore::new();
        store
            .put(PendingSignup::new(
                "a@x.com".to_string(),
                "first-password".to_string(),
                "Ada".to_string(),
                Role::User,
            ))
            .await
            .unwrap();
        store
            .put(PendingSignup::new(
                "a@x.com".to_string(),
                "second-password".to_string(),
                "Ada".to_string(),
                Role::User,
            ))
            .await
            .unwrap();

        let pending = store.get("a@x.com").await.unwrap().unwrap();
        assert_eq!(pending.password, "second-password");

        store.remove("a@x.com").await.unwrap();
        assert!(store.get("a@x.com").await.unwrap().is_none());
    }
}
