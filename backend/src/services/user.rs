//! User service for authentication and account management
//!
//! Password hashing and verification run on the blocking thread pool; token
//! signing uses the issuer's pre-computed keys. Every failure is logged with
//! its internal detail before being translated into the client-facing error.

use crate::auth::{HashError, PasswordService, RefreshRotator, SessionIssuer};
use crate::error::ApiError;
use crate::repositories::{StoreError, UserStore};
use auth_service_shared::types::{
    AuthTokens, PageQuery, RegisterRequest, UpdateUserRequest, UserProfile,
};
use auth_service_shared::validation::{validate_password, validate_username};
use auth_service_shared::NewIdentity;
use tracing::{error, info, warn};
use validator::Validate;

/// User service for authentication operations
pub struct UserService;

impl UserService {
    /// Register a new account
    pub async fn register(
        store: &dyn UserStore,
        req: RegisterRequest,
    ) -> Result<UserProfile, ApiError> {
        req.validate()
            .map_err(|e| e.to_string())
            .and_then(|_| validate_username(&req.username))
            .and_then(|_| validate_password(&req.password))
            .map_err(|msg| {
                warn!(reason = %msg, "Registration rejected");
                ApiError::Unprocessable(msg)
            })?;

        let password_hash = PasswordService::hash_async(req.password)
            .await
            .map_err(hash_failure)?;

        let created = store
            .create(NewIdentity {
                username: req.username,
                email: req.email,
                password_hash,
                role: req.role,
                country: req.country,
            })
            .await
            .map_err(|e| {
                warn!(error = %e, "Failed to create user");
                ApiError::from(e)
            })?;

        info!(user_id = created.id, role = %created.role, "User registered");
        Ok(UserProfile::from(&created))
    }

    /// Login with username and password
    ///
    /// On success the new refresh token replaces whatever the account held
    /// before; the pair is only returned once that write has succeeded.
    pub async fn login(
        store: &dyn UserStore,
        issuer: &SessionIssuer,
        username: &str,
        password: &str,
    ) -> Result<AuthTokens, ApiError> {
        let identity = match store.get_by_username(username).await {
            Ok(identity) => identity,
            Err(StoreError::NotFound) => {
                PasswordService::verify_placeholder_async(password.to_string())
                    .await
                    .map_err(hash_failure)?;
                warn!(username, "Login for unknown user");
                return Err(invalid_credentials());
            }
            Err(e) => {
                error!(error = ?e, "User lookup failed during login");
                return Err(e.into());
            }
        };

        let valid =
            PasswordService::verify_async(password.to_string(), identity.password_hash.clone())
                .await
                .map_err(hash_failure)?;
        if !valid {
            warn!(user_id = identity.id, "Login with wrong password");
            return Err(invalid_credentials());
        }

        let now = chrono::Utc::now();
        let pair = issuer.issue_at(&identity, now).map_err(|e| {
            error!(error = %e, "Failed to sign session tokens");
            ApiError::Internal(anyhow::anyhow!(e))
        })?;

        store
            .set_refresh_token(identity.id, &pair.refresh_token, issuer.refresh_expiry_from(now))
            .await
            .map_err(|e| {
                error!(user_id = identity.id, error = ?e, "Failed to persist refresh token");
                ApiError::Internal(anyhow::Error::new(e).context("could not persist refresh token"))
            })?;

        info!(user_id = identity.id, "User logged in");
        Ok(issuer.to_response(pair))
    }

    /// Exchange a refresh token for a new pair
    pub async fn refresh(
        store: &dyn UserStore,
        issuer: &SessionIssuer,
        refresh_token: &str,
    ) -> Result<AuthTokens, ApiError> {
        let pair = RefreshRotator::new(store, issuer).rotate(refresh_token).await?;
        Ok(issuer.to_response(pair))
    }

    /// Get a single account's public profile
    pub async fn get_profile(
        store: &dyn UserStore,
        user_id: i64,
    ) -> Result<UserProfile, ApiError> {
        let identity = store.get_by_id(user_id).await.map_err(|e| {
            warn!(user_id, error = %e, "Failed to load user");
            ApiError::from(e)
        })?;
        Ok(UserProfile::from(&identity))
    }

    /// List accounts in id order
    pub async fn list(
        store: &dyn UserStore,
        query: PageQuery,
    ) -> Result<Vec<UserProfile>, ApiError> {
        let page = query.into_page().map_err(|msg| {
            warn!(reason = %msg, "Rejected paging parameters");
            ApiError::Unprocessable(msg)
        })?;

        let users = store.list(page).await.map_err(|e| {
            error!(error = ?e, "Failed to list users");
            ApiError::from(e)
        })?;
        Ok(users.iter().map(UserProfile::from).collect())
    }

    /// Apply a partial update; a supplied password is re-hashed
    pub async fn update(
        store: &dyn UserStore,
        user_id: i64,
        req: UpdateUserRequest,
    ) -> Result<UserProfile, ApiError> {
        req.validate()
            .map_err(|e| e.to_string())
            .and_then(|_| req.username.as_deref().map_or(Ok(()), validate_username))
            .and_then(|_| req.password.as_deref().map_or(Ok(()), validate_password))
            .map_err(|msg| {
                warn!(user_id, reason = %msg, "Update rejected");
                ApiError::Unprocessable(msg)
            })?;

        let mut identity = store.get_by_id(user_id).await.map_err(|e| {
            warn!(user_id, error = %e, "Failed to load user for update");
            ApiError::from(e)
        })?;

        if let Some(username) = req.username {
            identity.username = username;
        }
        if let Some(email) = req.email {
            identity.email = email;
        }
        if let Some(role) = req.role {
            identity.role = role;
        }
        if let Some(country) = req.country {
            identity.country = country;
        }
        if let Some(password) = req.password {
            identity.password_hash = PasswordService::hash_async(password)
                .await
                .map_err(hash_failure)?;
        }

        let updated = store.update(&identity).await.map_err(|e| {
            warn!(user_id, error = %e, "Failed to update user");
            ApiError::from(e)
        })?;

        info!(user_id, "User updated");
        Ok(UserProfile::from(&updated))
    }

    /// Delete an account
    pub async fn delete(store: &dyn UserStore, user_id: i64) -> Result<(), ApiError> {
        store.delete(user_id).await.map_err(|e| {
            warn!(user_id, error = %e, "Failed to delete user");
            ApiError::from(e)
        })?;

        info!(user_id, "User deleted");
        Ok(())
    }
}

fn invalid_credentials() -> ApiError {
    ApiError::Unauthorized("Invalid credentials".to_string())
}

fn hash_failure(err: HashError) -> ApiError {
    error!(error = %err, "Credential hashing failed");
    ApiError::Internal(anyhow::anyhow!(err))
}
