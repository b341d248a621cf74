//! newsdesk adapters crate
//!
//! This crate contains infrastructure adapters implementing the domain ports:
//! - `store`: SQLite and in-memory persistence (accounts, news, comments, votes)
//! - `images`: Filesystem object storage for uploaded pictures
//! - `credentials`: Argon2 password hashing and JWT session tokens

pub mod credentials;
mod images_fs;
mod memory;
mod sqlite;

/// Re-exports for persistence adapters
pub mod store {
    pub use crate::memory::InMemoryStore;
    pub use crate::sqlite::SqliteStore;
}

/// Re-exports for image storage adapters
pub mod images {
    pub use crate::images_fs::FsImageStore;
}
