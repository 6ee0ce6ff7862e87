//! Job polling
//!
//! Keeps one refetch timer for the job list while any job is running and one
//! for the selected job's detail while that job is running.

pub mod supervisor;

pub use supervisor::{DEFAULT_POLL_INTERVAL, JobFetcher, MIN_POLL_INTERVAL, PollKind, PollStats, PollSupervisor};
