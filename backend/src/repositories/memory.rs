//! In-memory user store
//!
//! Mirrors the PostgreSQL store's uniqueness and not-found semantics. Used by
//! the test suites and handy for running the service without a database.

use super::store::{StoreError, UserStore};
use async_trait::async_trait;
use auth_service_shared::{Identity, NewIdentity, Page};
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use tokio::sync::RwLock;

#[derive(Default)]
struct Inner {
    next_id: i64,
    users: BTreeMap<i64, Identity>,
}

impl Inner {
    fn check_unique(
        &self,
        id: Option<i64>,
        username: &str,
        email: &str,
    ) -> Result<(), StoreError> {
        for user in self.users.values() {
            if Some(user.id) == id {
                continue;
            }
            if user.username == username {
                return Err(StoreError::DuplicateKey("users_username_key".to_string()));
            }
            if user.email == email {
                return Err(StoreError::DuplicateKey("users_email_key".to_string()));
            }
        }
        Ok(())
    }
}

/// User store held in process memory
#[derive(Default)]
pub struct MemoryUserStore {
    inner: RwLock<Inner>,
}

impl MemoryUserStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.inner.read().await.users.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

#[async_trait]
impl UserStore for MemoryUserStore {
    async fn get_by_id(&self, id: i64) -> Result<Identity, StoreError> {
        self.inner
            .read()
            .await
            .users
            .get(&id)
            .cloned()
            .ok_or(StoreError::NotFound)
    }

    async fn get_by_username(&self, username: &str) -> Result<Identity, StoreError> {
        self.inner
            .read()
            .await
            .users
            .values()
            .find(|user| user.username == username)
            .cloned()
            .ok_or(StoreError::NotFound)
    }

    async fn list(&self, page: Page) -> Result<Vec<Identity>, StoreError> {
        let offset = usize::try_from(page.offset).unwrap_or(0);
        let limit = usize::try_from(page.limit).unwrap_or(0);

        Ok(self
            .inner
            .read()
            .await
            .users
            .values()
            .skip(offset)
            .take(limit)
            .cloned()
            .collect())
    }

    async fn create(&self, identity: NewIdentity) -> Result<Identity, StoreError> {
        let mut inner = self.inner.write().await;
        inner.check_unique(None, &identity.username, &identity.email)?;

        inner.next_id += 1;
        let now = Utc::now();
        let created = Identity {
            id: inner.next_id,
            username: identity.username,
            email: identity.email,
            password_hash: identity.password_hash,
            role: identity.role,
            country: identity.country,
            refresh_token: None,
            refresh_expiry: None,
            created_at: now,
            updated_at: now,
        };
        inner.users.insert(created.id, created.clone());

        Ok(created)
    }

    async fn update(&self, identity: &Identity) -> Result<Identity, StoreError> {
        let mut inner = self.inner.write().await;
        inner.check_unique(Some(identity.id), &identity.username, &identity.email)?;

        let stored = inner
            .users
            .get_mut(&identity.id)
            .ok_or(StoreError::NotFound)?;

        *stored = Identity {
            created_at: stored.created_at,
            updated_at: Utc::now(),
            ..identity.clone()
        };

        Ok(stored.clone())
    }

    async fn set_refresh_token(
        &self,
        id: i64,
        token: &str,
        expiry: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        let mut inner = self.inner.write().await;
        let stored = inner.users.get_mut(&id).ok_or(StoreError::NotFound)?;

        stored.refresh_token = Some(token.to_string());
        stored.refresh_expiry = Some(expiry);
        stored.updated_at = Utc::now();
        Ok(())
    }

    async fn delete(&self, id: i64) -> Result<(), StoreError> {
        self.inner
            .write()
            .await
            .users
            .remove(&id)
            .map(|_| ())
            .ok_or(StoreError::NotFound)
    }
}
