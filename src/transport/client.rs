//! Transport trait definition

use async_trait::async_trait;

use super::types::{RequestDescriptor, RequestOutcome};

/// Performs exactly one request and normalizes the result.
///
/// Implementations never retry and never return `Err`: server errors and
/// network faults both come back as `RequestOutcome::Failure`.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, request: &RequestDescriptor) -> RequestOutcome;
}
