//! auditdash - request execution and state coordination for the accessibility
//! audit dashboard.
//!
//! Every data operation runs through one path: the `Dispatcher` reports its
//! lifecycle to the busy signal and executes it through the
//! `RefreshCoordinator`, which renews an expired access token once for any
//! number of concurrently failing calls. The `PollSupervisor` re-triggers job
//! list and detail fetches while jobs are still running.

pub mod api;
pub mod app;
pub mod credentials;
pub mod error;
pub mod id;
pub mod lifecycle;
pub mod loading;
pub mod poll;
pub mod refresh;
pub mod transport;

pub use app::{App, AppConfig};
pub use error::{AuditdashError, Result};
