//! Scan operations: job list, job detail, submission.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::json;
use tokio::sync::watch;

use super::decode::decode;
use super::types::{JobId, JobList, ScanJob};
use crate::error::{AuditdashError, Result};
use crate::lifecycle::{Dispatcher, OperationName};
use crate::poll::JobFetcher;
use crate::transport::RequestDescriptor;

/// Collection path for scan jobs
pub const SCANS_PATH: &str = "/scans/";

fn job_path(id: &JobId) -> String {
    format!("{}{}/", SCANS_PATH, id)
}

/// Client for the scan namespace.
///
/// Keeps the latest job list and job detail on watch channels so callers can
/// react to refetches triggered by the poll supervisor.
pub struct ScanApi {
    dispatcher: Arc<Dispatcher>,
    jobs_tx: watch::Sender<Vec<ScanJob>>,
    detail_tx: watch::Sender<Option<ScanJob>>,
}

impl ScanApi {
    pub fn new(dispatcher: Arc<Dispatcher>) -> Self {
        let (jobs_tx, _) = watch::channel(Vec::new());
        let (detail_tx, _) = watch::channel(None);
        Self {
            dispatcher,
            jobs_tx,
            detail_tx,
        }
    }

    /// Fetch all jobs and publish them
    pub async fn list_jobs(&self) -> Result<Vec<ScanJob>> {
        let outcome = self
            .dispatcher
            .run(&OperationName::scan("listJobs"), &RequestDescriptor::get(SCANS_PATH))
            .await;
        let jobs = decode::<JobList>(outcome)?.into_jobs();
        self.jobs_tx.send_replace(jobs.clone());
        Ok(jobs)
    }

    /// Fetch one job and publish it as the current detail
    pub async fn get_job(&self, id: &JobId) -> Result<ScanJob> {
        let outcome = self
            .dispatcher
            .run(&OperationName::scan("getJob"), &RequestDescriptor::get(job_path(id)))
            .await;
        let job: ScanJob = decode(outcome)?;
        self.detail_tx.send_replace(Some(job.clone()));
        Ok(job)
    }

    /// Submit a page for audit
    pub async fn submit_scan(&self, url: &str) -> Result<ScanJob> {
        let url = url.trim();
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            return Err(AuditdashError::InvalidInput(format!(
                "expected an http(s) URL, got '{}'",
                url
            )));
        }

        let outcome = self
            .dispatcher
            .run(
                &OperationName::scan("submitScan"),
                &RequestDescriptor::post(SCANS_PATH, json!({ "url": url })),
            )
            .await;
        let job: ScanJob = decode(outcome)?;
        log::info!("Submitted scan {} for {}", job.id, job.url);
        Ok(job)
    }

    /// Latest published job list
    pub fn jobs(&self) -> Vec<ScanJob> {
        self.jobs_tx.borrow().clone()
    }

    /// Latest published job detail
    pub fn detail(&self) -> Option<ScanJob> {
        self.detail_tx.borrow().clone()
    }

    pub fn subscribe_jobs(&self) -> watch::Receiver<Vec<ScanJob>> {
        self.jobs_tx.subscribe()
    }

    pub fn subscribe_detail(&self) -> watch::Receiver<Option<ScanJob>> {
        self.detail_tx.subscribe()
    }
}

#[async_trait]
impl JobFetcher for ScanApi {
    async fn refetch_list(&self) {
        if let Err(e) = self.list_jobs().await {
            log::warn!("Job list refetch failed: {}", e);
        }
    }

    async fn refetch_detail(&self, id: &JobId) {
        if let Err(e) = self.get_job(id).await {
            log::warn!("Job {} refetch failed: {}", id, e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::JobStatus;
    use crate::credentials::{Credential, CredentialStore, MemoryStore};
    use crate::refresh::RefreshCoordinator;
    use crate::transport::{Method, MockTransport, RequestOutcome};
    use serde_json::Value;

    fn scan_api(mock: Arc<MockTransport>) -> ScanApi {
        let creds = CredentialStore::new(Arc::new(MemoryStore::new()));
        creds.login(&Credential::new("tok1", "ref1")).unwrap();
        let coordinator = Arc::new(RefreshCoordinator::new(mock, creds));
        ScanApi::new(Arc::new(Dispatcher::new(coordinator)))
    }

    fn server(req: &RequestDescriptor) -> RequestOutcome {
        match (req.method, req.target.as_str()) {
            (Method::Get, SCANS_PATH) => RequestOutcome::success(
                200,
                json!([
                    {"id": 1, "url": "https://a.example", "status": "processing"},
                    {"id": 2, "url": "https://b.example", "status": "completed"}
                ]),
            ),
            (Method::Get, "/scans/1/") => RequestOutcome::success(
                200,
                json!({"id": 1, "url": "https://a.example", "status": "processing"}),
            ),
            (Method::Post, SCANS_PATH) => RequestOutcome::success(
                201,
                json!({"id": 3, "url": req.body.as_ref().and_then(|b| b.get("url")).cloned().unwrap_or(Value::Null), "status": "pending"}),
            ),
            _ => RequestOutcome::failure(404, json!({"detail": "Not found."})),
        }
    }

    #[tokio::test]
    async fn test_list_jobs_publishes() {
        let api = scan_api(Arc::new(MockTransport::new(server)));
        let mut rx = api.subscribe_jobs();

        let jobs = api.list_jobs().await.unwrap();
        assert_eq!(jobs.len(), 2);
        assert!(rx.has_changed().unwrap());
        assert_eq!(rx.borrow_and_update().len(), 2);
        assert_eq!(api.jobs()[0].status, JobStatus::Processing);
    }

    #[tokio::test]
    async fn test_get_job_publishes_detail() {
        let api = scan_api(Arc::new(MockTransport::new(server)));

        let job = api.get_job(&JobId::from("1")).await.unwrap();
        assert_eq!(job.id, JobId::from("1"));
        assert_eq!(api.detail(), Some(job));
    }

    #[tokio::test]
    async fn test_get_missing_job_is_error() {
        let api = scan_api(Arc::new(MockTransport::new(server)));

        let err = api.get_job(&JobId::from("99")).await.unwrap_err();
        assert_eq!(err.status(), Some(404));
        assert_eq!(api.detail(), None);
    }

    #[tokio::test]
    async fn test_submit_scan() {
        let mock = Arc::new(MockTransport::new(server));
        let api = scan_api(mock.clone());

        let job = api.submit_scan(" https://example.com ").await.unwrap();
        assert_eq!(job.status, JobStatus::Pending);
        assert_eq!(job.url, "https://example.com");
        assert_eq!(mock.requests()[0].body, Some(json!({"url": "https://example.com"})));
    }

    #[tokio::test]
    async fn test_submit_rejects_non_http_url() {
        let mock = Arc::new(MockTransport::new(server));
        let api = scan_api(mock.clone());

        let result = api.submit_scan("ftp://example.com").await;
        assert!(matches!(result, Err(AuditdashError::InvalidInput(_))));
        assert!(mock.requests().is_empty());
    }

    #[tokio::test]
    async fn test_refetch_swallows_errors() {
        let mock = Arc::new(MockTransport::new(|_| RequestOutcome::fault("connection reset")));
        let api = scan_api(mock.clone());

        api.refetch_list().await;
        api.refetch_detail(&JobId::from("1")).await;
        assert_eq!(mock.requests().len(), 2);
        assert!(api.jobs().is_empty());
    }
}
