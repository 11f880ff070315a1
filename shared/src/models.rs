//! Domain models for the auth service

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::errors::ModelError;

/// Account role
///
/// Roles are stored and transported as lowercase strings.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    #[default]
    User,
    Creator,
    Combined,
    Admin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Creator => "creator",
            Role::Combined => "combined",
            Role::Admin => "admin",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "user" => Ok(Role::User),
            "creator" => Ok(Role::Creator),
            "combined" => Ok(Role::Combined),
            "admin" => Ok(Role::Admin),
            other => Err(ModelError::UnknownRole(other.to_string())),
        }
    }
}

/// User account as held by the persistence layer
///
/// The credential hash and the refresh-token slot never leave the service:
/// both are skipped on serialization.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Identity {
    pub id: i64,
    pub username: String,
    pub email: String,
    #[serde(skip_serializing, default)]
    pub password_hash: String,
    pub role: Role,
    pub country: String,
    /// The single active refresh token for this account
    #[serde(skip_serializing, default)]
    pub refresh_token: Option<String>,
    #[serde(skip_serializing, default)]
    pub refresh_expiry: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Identity {
    /// Whether `presented` is exactly the refresh token currently on record
    pub fn holds_refresh_token(&self, presented: &str) -> bool {
        self.refresh_token.as_deref() == Some(presented)
    }
}

/// Fields required to create a new account
#[derive(Debug, Clone)]
pub struct NewIdentity {
    pub username: String,
    pub email: String,
    pub password_hash: String,
    pub role: Role,
    pub country: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn sample_identity() -> Identity {
        let now = Utc::now();
        Identity {
            id: 7,
            username: "bob".to_string(),
            email: "bob@example.com".to_string(),
            password_hash: "$argon2id$v=19$m=19456,t=2,p=1$c2FsdA$aGFzaA".to_string(),
            role: Role::Creator,
            country: "NL".to_string(),
            refresh_token: Some("refresh.token.value".to_string()),
            refresh_expiry: Some(now),
            created_at: now,
            updated_at: now,
        }
    }

    #[rstest]
    #[case("user", Role::User)]
    #[case("creator", Role::Creator)]
    #[case("combined", Role::Combined)]
    #[case("admin", Role::Admin)]
    fn test_role_parses_from_lowercase(#[case] input: &str, #[case] expected: Role) {
        assert_eq!(input.parse::<Role>().unwrap(), expected);
        assert_eq!(expected.to_string(), input);
    }

    #[rstest]
    #[case("Admin")]
    #[case("root")]
    #[case("")]
    fn test_unknown_role_rejected(#[case] input: &str) {
        assert!(input.parse::<Role>().is_err());
    }

    #[test]
    fn test_default_role_is_user() {
        assert_eq!(Role::default(), Role::User);
    }

    #[test]
    fn test_identity_serialization_hides_secrets() {
        let json = serde_json::to_value(sample_identity()).unwrap();

        assert_eq!(json["username"], "bob");
        assert_eq!(json["role"], "creator");
        assert!(json.get("password_hash").is_none());
        assert!(json.get("refresh_token").is_none());
        assert!(json.get("refresh_expiry").is_none());
    }

    #[test]
    fn test_holds_refresh_token_requires_exact_match() {
        let identity = sample_identity();
        assert!(identity.holds_refresh_token("refresh.token.value"));
        assert!(!identity.holds_refresh_token("refresh.token.valu"));

        let empty = Identity {
            refresh_token: None,
            ..identity
        };
        assert!(!empty.holds_refresh_token(""));
    }
}
