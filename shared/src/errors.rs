//! Error types shared between the service and its clients

use thiserror::Error;

/// Errors raised while building domain values
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ModelError {
    #[error("Unknown role: {0}")]
    UnknownRole(String),
}

