//! Credential persistence
//!
//! Holds the access/refresh token pair behind a small key/value seam so the
//! CLI can persist to disk and tests can keep everything in memory.

pub mod credential;
pub mod store;

pub use credential::{ACCESS_KEY, Credential, CredentialStore, REFRESH_KEY};
pub use store::{FileStore, KeyValueStore, MemoryStore};
