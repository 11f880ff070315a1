//! Auth Service Shared Library
//!
//! Domain values, wire types and validation helpers used by the backend
//! and by any client of the account API.

pub mod errors;
pub mod models;
pub mod types;
pub mod validation;

// Re-export commonly used items
pub use errors::*;
pub use models::{Identity, NewIdentity, Role};
pub use types::*;
