//! Access/refresh token pair issuance

use super::jwt::{SessionClaims, TokenCodec, TokenError, TokenKind};
use crate::config::JwtConfig;
use auth_service_shared::{AuthTokens, Identity};
use chrono::{DateTime, Duration, Utc};

/// Freshly minted credentials for one identity
///
/// Returned to the caller, never persisted as a whole: only the refresh
/// token is written back to the identity record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
}

/// Mints token pairs
///
/// Holds both codecs and their lifetimes. Built once from the validated
/// configuration and cloned into request handlers.
#[derive(Clone)]
pub struct SessionIssuer {
    access: TokenCodec,
    refresh: TokenCodec,
    access_ttl: Duration,
    refresh_ttl: Duration,
}

impl SessionIssuer {
    pub fn new(config: &JwtConfig) -> Self {
        Self {
            access: TokenCodec::new(TokenKind::Access, &config.access_secret),
            refresh: TokenCodec::new(TokenKind::Refresh, &config.refresh_secret),
            access_ttl: Duration::seconds(config.access_token_expiry_secs),
            refresh_ttl: Duration::seconds(config.refresh_token_expiry_secs),
        }
    }

    /// Issue a pair for `identity` at the current time
    #[inline]
    pub fn issue(&self, identity: &Identity) -> Result<TokenPair, TokenError> {
        self.issue_at(identity, Utc::now())
    }

    /// Issue a pair as if the current time were `now`
    ///
    /// Both tokens carry the same subject and role. The identity record is
    /// not touched; persisting the refresh token is the caller's job.
    pub fn issue_at(
        &self,
        identity: &Identity,
        now: DateTime<Utc>,
    ) -> Result<TokenPair, TokenError> {
        let role = identity.role.as_str();
        let access_token = self.access.sign_at(identity.id, role, self.access_ttl, now)?;
        let refresh_token = self.refresh.sign_at(identity.id, role, self.refresh_ttl, now)?;

        Ok(TokenPair {
            access_token,
            refresh_token,
        })
    }

    /// When a refresh token issued at `now` stops being valid
    pub fn refresh_expiry_from(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        now + self.refresh_ttl
    }

    pub fn access_codec(&self) -> &TokenCodec {
        &self.access
    }

    pub fn refresh_codec(&self) -> &TokenCodec {
        &self.refresh
    }

    /// Parse a presented refresh token
    #[inline]
    pub fn parse_refresh_at(
        &self,
        token: &str,
        now: DateTime<Utc>,
    ) -> Result<SessionClaims, TokenError> {
        self.refresh.parse_at(token, now)
    }

    /// Get access token expiry in seconds
    #[inline]
    pub fn access_token_expiry_secs(&self) -> i64 {
        self.access_ttl.num_seconds()
    }

    /// Wrap a pair in the response shape sent to clients
    pub fn to_response(&self, pair: TokenPair) -> AuthTokens {
        AuthTokens {
            access_token: pair.access_token,
            refresh_token: pair.refresh_token,
            token_type: "Bearer".to_string(),
            expires_in: self.access_token_expiry_secs(),
        }
    }
}
