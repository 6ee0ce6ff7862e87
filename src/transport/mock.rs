//! Scripted transport for tests

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;

use super::client::Transport;
use super::types::{RequestDescriptor, RequestOutcome};

type Handler = Box<dyn Fn(&RequestDescriptor) -> RequestOutcome + Send + Sync>;

/// Transport that answers from a handler closure and records every request.
///
/// An optional latency makes concurrent calls overlap: every request sleeps
/// on the tokio clock before the handler runs.
pub struct MockTransport {
    handler: Handler,
    latency: Option<Duration>,
    target_latency: HashMap<String, Duration>,
    requests: Mutex<Vec<RequestDescriptor>>,
}

impl MockTransport {
    pub fn new<F>(handler: F) -> Self
    where
        F: Fn(&RequestDescriptor) -> RequestOutcome + Send + Sync + 'static,
    {
        Self {
            handler: Box::new(handler),
            latency: None,
            target_latency: HashMap::new(),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    /// Latency for one target, overriding the default
    pub fn with_target_latency(mut self, target: impl Into<String>, latency: Duration) -> Self {
        self.target_latency.insert(target.into(), latency);
        self
    }

    /// Every request seen so far, in the order they were issued
    pub fn requests(&self) -> Vec<RequestDescriptor> {
        self.requests.lock().map(|r| r.clone()).unwrap_or_default()
    }

    /// Number of requests sent to `target`
    pub fn count(&self, target: &str) -> usize {
        self.requests
            .lock()
            .map(|r| r.iter().filter(|req| req.target == target).count())
            .unwrap_or(0)
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn send(&self, request: &RequestDescriptor) -> RequestOutcome {
        if let Ok(mut requests) = self.requests.lock() {
            requests.push(request.clone());
        }
        let latency = self.target_latency.get(&request.target).copied().or(self.latency);
        if let Some(latency) = latency {
            tokio::time::sleep(latency).await;
        }
        (self.handler)(request)
    }
}
