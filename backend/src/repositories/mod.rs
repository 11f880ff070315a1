//! Database repositories
//!
//! Provides the storage contract and its implementations.

pub mod memory;
pub mod store;
pub mod user;

pub use memory::MemoryUserStore;
pub use store::{StoreError, UserStore};
pub use user::{PgUserStore, UserRecord};
