//! Credential refresh coordination
//!
//! Wraps the transport so an expired access token is renewed exactly once no
//! matter how many in-flight calls fail with it.

pub mod coordinator;

pub use coordinator::{DEFAULT_REFRESH_PATH, RefreshCoordinator};
