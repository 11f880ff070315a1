//! Application state management
//!
//! Shared resources handed to every request handler through Axum's state
//! extraction. Everything is built once at startup and is read-only while
//! requests are served.

use crate::auth::{AdminOnly, GatePipeline, SessionIssuer};
use crate::config::AppConfig;
use crate::repositories::UserStore;
use std::sync::Arc;

/// Shared application state
///
/// All fields clone in O(1): the store and config are behind `Arc`, and the
/// issuer and gate pipelines hold their keys in `Arc`s.
#[derive(Clone)]
pub struct AppState {
    /// Account persistence
    pub store: Arc<dyn UserStore>,
    /// Application configuration
    pub config: Arc<AppConfig>,
    /// Token issuance with pre-computed keys
    pub sessions: SessionIssuer,
    /// Verifier → Authenticator
    pub authenticated: GatePipeline,
    /// Verifier → Authenticator → AdminOnly
    pub admin: GatePipeline,
}

impl AppState {
    /// Create a new application state
    ///
    /// Derives the signing keys from the configured secrets, so this should
    /// only be called once at application startup.
    pub fn new(store: Arc<dyn UserStore>, config: AppConfig) -> Self {
        let sessions = SessionIssuer::new(&config.jwt);
        let authenticated = GatePipeline::new(sessions.access_codec().clone());
        let admin = authenticated.clone().with_gate(AdminOnly);

        Self {
            store,
            config: Arc::new(config),
            sessions,
            authenticated,
            admin,
        }
    }

    #[inline]
    pub fn store(&self) -> &dyn UserStore {
        self.store.as_ref()
    }

    #[inline]
    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    #[inline]
    pub fn sessions(&self) -> &SessionIssuer {
        &self.sessions
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repositories::MemoryUserStore;

    fn state() -> AppState {
        AppState::new(Arc::new(MemoryUserStore::new()), AppConfig::default())
    }

    #[test]
    fn test_state_clone_shares_store() {
        let state = state();
        let cloned = state.clone();
        assert!(Arc::ptr_eq(&state.store, &cloned.store));
        assert!(Arc::ptr_eq(&state.config, &cloned.config));
    }

    #[test]
    fn test_pipelines_are_precomputed() {
        let state = state();
        assert!(state.authenticated.gate_names().is_empty());
        assert_eq!(state.admin.gate_names(), vec!["admin_only"]);
    }
}
