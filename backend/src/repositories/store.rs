//! Storage contract consumed by the auth core and the user services

use async_trait::async_trait;
use auth_service_shared::{Identity, NewIdentity, Page};
use chrono::{DateTime, Utc};
use thiserror::Error;

/// Storage failures
///
/// Implementations must report a missing row as `NotFound` and a unique
/// constraint hit as `DuplicateKey`; everything else is `Backend`.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("record not found")]
    NotFound,

    #[error("duplicate key: {0}")]
    DuplicateKey(String),

    #[error("storage backend error")]
    Backend(#[source] anyhow::Error),
}

impl StoreError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, StoreError::NotFound)
    }
}

/// Account persistence
///
/// `update` replaces the whole record and is meant for administrative edits.
/// Session code only ever writes the refresh-token slot through
/// `set_refresh_token`, so a login or rotation racing an edit cannot restore
/// a stale role or password hash. Two writers of the slot race and the last
/// one wins: only the most recently written refresh token stays valid.
#[async_trait]
pub trait UserStore: Send + Sync {
    async fn get_by_id(&self, id: i64) -> Result<Identity, StoreError>;

    async fn get_by_username(&self, username: &str) -> Result<Identity, StoreError>;

    async fn list(&self, page: Page) -> Result<Vec<Identity>, StoreError>;

    async fn create(&self, identity: NewIdentity) -> Result<Identity, StoreError>;

    /// Persist every mutable field of `identity`, returning the stored record
    async fn update(&self, identity: &Identity) -> Result<Identity, StoreError>;

    /// Overwrite only the refresh token and its expiry
    async fn set_refresh_token(
        &self,
        id: i64,
        token: &str,
        expiry: DateTime<Utc>,
    ) -> Result<(), StoreError>;

    async fn delete(&self, id: i64) -> Result<(), StoreError>;

    async fn health_check(&self) -> Result<(), StoreError> {
        Ok(())
    }
}
