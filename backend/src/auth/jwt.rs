//! JWT token signing and parsing
//!
//! A [`TokenCodec`] is bound to one HMAC-SHA256 secret. The service builds
//! two of them, one for access tokens and one for refresh tokens, so a token
//! minted under one secret never parses under the other.

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{
    decode, encode, errors::ErrorKind, Algorithm, DecodingKey, EncodingKey, Header, Validation,
};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use thiserror::Error;
use uuid::Uuid;

/// Claims embedded in every session token
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionClaims {
    /// Subject (account id)
    pub user_id: i64,
    /// Account role at issuance time
    #[serde(default)]
    pub role: String,
    /// Expiration time (Unix timestamp)
    pub exp: i64,
    /// Issued at (Unix timestamp)
    pub iat: i64,
    /// Unique token id
    #[serde(default)]
    pub jti: String,
}

/// Token failures
///
/// These carry internal detail for logs only; the HTTP layer collapses
/// them to a generic message.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TokenError {
    #[error("malformed token: {0}")]
    Malformed(String),

    #[error("invalid signature")]
    InvalidSignature,

    #[error("token expired")]
    Expired,

    #[error("failed to sign token: {0}")]
    Signing(String),
}

/// Which secret a codec is keyed with
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    Access,
    Refresh,
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TokenKind::Access => f.write_str("access"),
            TokenKind::Refresh => f.write_str("refresh"),
        }
    }
}

/// Pre-computed JWT keys for one secret
#[derive(Clone)]
pub struct TokenKeys {
    encoding: Arc<EncodingKey>,
    decoding: Arc<DecodingKey>,
}

impl TokenKeys {
    pub fn new(secret: &str) -> Self {
        Self {
            encoding: Arc::new(EncodingKey::from_secret(secret.as_bytes())),
            decoding: Arc::new(DecodingKey::from_secret(secret.as_bytes())),
        }
    }
}

/// Signs and parses compact HS256 tokens under a single secret
#[derive(Clone)]
pub struct TokenCodec {
    kind: TokenKind,
    keys: TokenKeys,
    validation: Arc<Validation>,
}

impl TokenCodec {
    pub fn new(kind: TokenKind, secret: &str) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        // Expiry is checked against an explicit clock in `parse_at`.
        validation.validate_exp = false;
        validation.leeway = 0;

        Self {
            kind,
            keys: TokenKeys::new(secret),
            validation: Arc::new(validation),
        }
    }

    /// Sign a token for `user_id`/`role` expiring `ttl` from now
    #[inline]
    pub fn sign(&self, user_id: i64, role: &str, ttl: Duration) -> Result<String, TokenError> {
        self.sign_at(user_id, role, ttl, Utc::now())
    }

    /// Sign a token as if the current time were `now`
    pub fn sign_at(
        &self,
        user_id: i64,
        role: &str,
        ttl: Duration,
        now: DateTime<Utc>,
    ) -> Result<String, TokenError> {
        let claims = SessionClaims {
            user_id,
            role: role.to_string(),
            exp: (now + ttl).timestamp(),
            iat: now.timestamp(),
            jti: Uuid::new_v4().to_string(),
        };

        encode(&Header::new(Algorithm::HS256), &claims, &self.keys.encoding)
            .map_err(|e| TokenError::Signing(format!("{} token: {}", self.kind, e)))
    }

    /// Parse and verify a token against the current time
    #[inline]
    pub fn parse(&self, token: &str) -> Result<SessionClaims, TokenError> {
        self.parse_at(token, Utc::now())
    }

    /// Parse and verify a token; it is expired once `now >= exp`
    pub fn parse_at(&self, token: &str, now: DateTime<Utc>) -> Result<SessionClaims, TokenError> {
        let data = decode::<SessionClaims>(token, &self.keys.decoding, &self.validation)
            .map_err(|e| match e.kind() {
                ErrorKind::InvalidSignature | ErrorKind::InvalidAlgorithm => {
                    TokenError::InvalidSignature
                }
                ErrorKind::ExpiredSignature => TokenError::Expired,
                _ => TokenError::Malformed(e.to_string()),
            })?;

        if now.timestamp() >= data.claims.exp {
            return Err(TokenError::Expired);
        }

        Ok(data.claims)
    }
}
