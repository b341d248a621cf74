//! newsdesk domain crate
//!
//! This crate contains the core domain logic following hexagonal architecture:
//! - `model`: Domain entities and value objects
//! - `ports`: Trait definitions for external dependencies (adapters)
//! - `usecases`: Vote toggling, accounts, news and comments
//! - `policy`: Input constraints

pub mod model;
pub mod policy;
pub mod ports;
pub mod usecases;

pub use model::*;
pub use ports::*;

use sha2::{Digest, Sha256};
use time::OffsetDateTime;

/// Build an object storage key for an uploaded image
///
/// Keys look like `{folder}/{owner}_{unix_millis}[_{label}]_{digest}` where
/// `digest` is the first 12 hex characters of the content's SHA-256.
pub fn object_key(
    folder: &str,
    owner: UserId,
    at: OffsetDateTime,
    label: Option<&str>,
    bytes: &[u8],
) -> String {
    let digest = format!("{:x}", Sha256::digest(bytes));
    let millis = at.unix_timestamp_nanos() / 1_000_000;
    match label {
        Some(label) => format!("{}/{}_{}_{}_{}", folder, owner, millis, label, &digest[..12]),
        None => format!("{}/{}_{}_{}", folder, owner, millis, &digest[..12]),
    }
}
