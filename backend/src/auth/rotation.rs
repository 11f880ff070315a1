//! Refresh token rotation
//!
//! A presented refresh token moves through
//! `Received -> SignatureVerified -> RecordMatched -> Rotated`, failing at
//! the first stage it cannot pass:
//!
//! 1. the token must parse under the refresh secret and be unexpired;
//! 2. its subject must still exist;
//! 3. it must equal, byte for byte, the refresh token on the account record
//!    (a superseded token is how replay is detected);
//! 4. a new pair is minted and its refresh token written over the old one;
//!    only the refresh-token slot is written, never the rest of the record.
//!
//! The new pair is only handed back once step 4 has been persisted, so a
//! client never holds a refresh token the server did not record.
//!
//! Concurrent rotations of the same token both read the old record, both may
//! pass step 3, and both write. The store keeps whichever write lands last;
//! the other caller's refresh token is dead on arrival and that client must
//! log in again. No extra locking is layered on top of the store.

use super::jwt::TokenError;
use super::session::{SessionIssuer, TokenPair};
use crate::error::ApiError;
use crate::repositories::{StoreError, UserStore};
use chrono::{DateTime, Utc};
use thiserror::Error;
use tracing::{debug, error, info, warn};

/// Progress of a single rotation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RotationStage {
    Received,
    SignatureVerified,
    RecordMatched,
    Rotated,
}

/// Why a rotation stopped
#[derive(Error, Debug)]
pub enum RotationError {
    #[error("refresh token rejected: {0}")]
    Rejected(#[source] TokenError),

    #[error("token subject {0} does not exist")]
    UnknownSubject(i64),

    #[error("failed to load token subject")]
    Lookup(#[source] StoreError),

    #[error("refresh token does not match the stored record")]
    Superseded,

    #[error("failed to issue token pair")]
    Issue(#[source] TokenError),

    #[error("failed to persist rotated refresh token")]
    Persist(#[source] StoreError),
}

impl RotationError {
    /// The last stage reached before failing
    pub fn stage(&self) -> RotationStage {
        match self {
            RotationError::Rejected(_) => RotationStage::Received,
            RotationError::UnknownSubject(_)
            | RotationError::Lookup(_)
            | RotationError::Superseded => RotationStage::SignatureVerified,
            RotationError::Issue(_) | RotationError::Persist(_) => RotationStage::RecordMatched,
        }
    }

    fn is_internal(&self) -> bool {
        matches!(
            self,
            RotationError::Lookup(_) | RotationError::Issue(_) | RotationError::Persist(_)
        )
    }
}

impl From<RotationError> for ApiError {
    fn from(err: RotationError) -> Self {
        match err {
            RotationError::Rejected(_) => {
                ApiError::Unauthorized("Invalid refresh token".to_string())
            }
            RotationError::UnknownSubject(_) => {
                ApiError::Unprocessable("user not found".to_string())
            }
            RotationError::Superseded => ApiError::BadRequest("invalid refresh token".to_string()),
            RotationError::Lookup(e) => ApiError::from(e),
            // Includes NotFound: the record existed when it was matched.
            RotationError::Persist(e) => ApiError::Internal(
                anyhow::Error::new(e).context("could not persist refresh token"),
            ),
            RotationError::Issue(e) => {
                ApiError::Internal(anyhow::anyhow!("could not generate tokens: {}", e))
            }
        }
    }
}

/// Exchanges a valid refresh token for a new pair
pub struct RefreshRotator<'a> {
    store: &'a dyn UserStore,
    issuer: &'a SessionIssuer,
}

impl<'a> RefreshRotator<'a> {
    pub fn new(store: &'a dyn UserStore, issuer: &'a SessionIssuer) -> Self {
        Self { store, issuer }
    }

    #[inline]
    pub async fn rotate(&self, presented: &str) -> Result<TokenPair, RotationError> {
        self.rotate_at(presented, Utc::now()).await
    }

    /// Rotate as if the current time were `now`
    pub async fn rotate_at(
        &self,
        presented: &str,
        now: DateTime<Utc>,
    ) -> Result<TokenPair, RotationError> {
        let result = self.run(presented, now).await;

        if let Err(e) = &result {
            if e.is_internal() {
                error!(stage = ?e.stage(), error = ?e, "Refresh rotation failed");
            } else {
                warn!(stage = ?e.stage(), error = %e, "Refresh token refused");
            }
        }

        result
    }

    async fn run(&self, presented: &str, now: DateTime<Utc>) -> Result<TokenPair, RotationError> {
        let claims = self
            .issuer
            .parse_refresh_at(presented, now)
            .map_err(RotationError::Rejected)?;
        debug!(
            user_id = claims.user_id,
            stage = ?RotationStage::SignatureVerified,
            "Refresh token verified"
        );

        let identity = match self.store.get_by_id(claims.user_id).await {
            Ok(identity) => identity,
            Err(StoreError::NotFound) => {
                return Err(RotationError::UnknownSubject(claims.user_id))
            }
            Err(e) => return Err(RotationError::Lookup(e)),
        };

        if !identity.holds_refresh_token(presented) {
            return Err(RotationError::Superseded);
        }
        debug!(
            user_id = identity.id,
            stage = ?RotationStage::RecordMatched,
            "Refresh token matches record"
        );

        let pair = self
            .issuer
            .issue_at(&identity, now)
            .map_err(RotationError::Issue)?;

        self.store
            .set_refresh_token(
                identity.id,
                &pair.refresh_token,
                self.issuer.refresh_expiry_from(now),
            )
            .await
            .map_err(RotationError::Persist)?;

        info!(user_id = identity.id, stage = ?RotationStage::Rotated, "Refresh token rotated");
        Ok(pair)
    }
}
