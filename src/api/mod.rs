//! Dashboard API surface
//!
//! Thin typed clients over the dispatcher: `ScanApi` in the scan namespace,
//! `AccountApi` in the ordinary one.

mod decode;

pub mod account;
pub mod scans;
pub mod types;

pub use account::{AccountApi, DEFAULT_LOGIN_PATH, PROFILE_PATH};
pub use scans::{SCANS_PATH, ScanApi};
pub use types::{CategoryResult, JobId, JobStatus, Profile, ScanJob, running_ids};
