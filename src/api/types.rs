//! Audit API payload types

use std::collections::BTreeSet;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Server-assigned job identifier. The API sends either strings or integers.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(from = "RawJobId", into = "String")]
pub struct JobId(String);

#[derive(Deserialize)]
#[serde(untagged)]
enum RawJobId {
    Text(String),
    Number(u64),
}

impl From<RawJobId> for JobId {
    fn from(raw: RawJobId) -> Self {
        match raw {
            RawJobId::Text(s) => JobId(s),
            RawJobId::Number(n) => JobId(n.to_string()),
        }
    }
}

impl JobId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for JobId {
    fn from(s: &str) -> Self {
        JobId(s.to_string())
    }
}

impl From<String> for JobId {
    fn from(s: String) -> Self {
        JobId(s)
    }
}

impl From<JobId> for String {
    fn from(id: JobId) -> Self {
        id.0
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Status of an audit job
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Pending,
    Processing,
    Completed,
    Failed,
    #[serde(other)]
    Unknown,
}

impl JobStatus {
    /// Still running on the server, so worth polling
    pub fn is_active(&self) -> bool {
        matches!(self, JobStatus::Pending | JobStatus::Processing)
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            JobStatus::Pending => "pending",
            JobStatus::Processing => "processing",
            JobStatus::Completed => "completed",
            JobStatus::Failed => "failed",
            JobStatus::Unknown => "unknown",
        };
        f.write_str(s)
    }
}

/// Result of one audit category
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryResult {
    pub category: String,
    #[serde(default)]
    pub score: Option<f64>,
    #[serde(default)]
    pub violations: u32,
    #[serde(default)]
    pub passes: u32,
}

/// One submitted page audit
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScanJob {
    pub id: JobId,
    pub url: String,
    pub status: JobStatus,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub results: Vec<CategoryResult>,
    #[serde(default)]
    pub error: Option<String>,
}

/// The job list comes back either bare or wrapped in a paginated envelope
#[derive(Deserialize)]
#[serde(untagged)]
pub(crate) enum JobList {
    Page { results: Vec<ScanJob> },
    Bare(Vec<ScanJob>),
}

impl JobList {
    pub(crate) fn into_jobs(self) -> Vec<ScanJob> {
        match self {
            JobList::Page { results } => results,
            JobList::Bare(jobs) => jobs,
        }
    }
}

/// Authenticated user
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
    pub username: String,
    #[serde(default)]
    pub email: Option<String>,
}

/// Ids of jobs still pending or processing
pub fn running_ids(jobs: &[ScanJob]) -> BTreeSet<JobId> {
    jobs.iter()
        .filter(|job| job.status.is_active())
        .map(|job| job.id.clone())
        .collect()
}
