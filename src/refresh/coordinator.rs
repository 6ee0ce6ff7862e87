//! Single-flight credential refresh around a transport.
//!
//! Every request gets the stored access token attached. When a request comes
//! back 401 the first caller to notice takes the refresh lock, trades the
//! refresh token for a new access token, and retries its request once. Callers
//! that fail while the refresh is running queue on the same lock and retry
//! once after it finishes instead of refreshing again.

use std::sync::Arc;

use serde::Deserialize;
use serde_json::json;
use tokio::sync::{Mutex, MutexGuard};

use crate::credentials::CredentialStore;
use crate::transport::{RequestDescriptor, RequestOutcome, Transport};

/// Path of the token refresh endpoint
pub const DEFAULT_REFRESH_PATH: &str = "/auth/token/refresh/";

/// State guarded by the refresh lock.
///
/// `generation` counts completed refresh attempts. A caller remembers the
/// generation its request was sent under; if it has moved by the time the
/// caller holds the lock, somebody else already refreshed for it.
#[derive(Debug, Default, Clone, Copy)]
struct RefreshEpoch {
    generation: u64,
    last_succeeded: bool,
}

#[derive(Deserialize)]
struct RefreshResponse {
    access: String,
}

/// Wraps a transport with credential injection and refresh-on-401.
pub struct RefreshCoordinator {
    transport: Arc<dyn Transport>,
    credentials: CredentialStore,
    refresh_path: String,
    lock: Mutex<RefreshEpoch>,
}

impl RefreshCoordinator {
    pub fn new(transport: Arc<dyn Transport>, credentials: CredentialStore) -> Self {
        Self {
            transport,
            credentials,
            refresh_path: DEFAULT_REFRESH_PATH.to_string(),
            lock: Mutex::new(RefreshEpoch::default()),
        }
    }

    pub fn with_refresh_path(mut self, path: impl Into<String>) -> Self {
        self.refresh_path = path.into();
        self
    }

    pub fn credentials(&self) -> &CredentialStore {
        &self.credentials
    }

    /// Execute one request, refreshing the access token at most once.
    pub async fn execute(&self, request: &RequestDescriptor) -> RequestOutcome {
        let (sent_under, access_token) = self.wait_for_unlock().await;

        let first = self.send(request, access_token.as_deref()).await;
        if !first.is_unauthorized() {
            return first;
        }

        let mut epoch = self.lock.lock().await;

        if epoch.generation != sent_under {
            let refreshed = epoch.last_succeeded;
            drop(epoch);
            log::debug!(
                "{} {} got 401 after a concurrent refresh (succeeded: {})",
                request.method,
                request.target,
                refreshed
            );
            if !refreshed {
                return first;
            }
            return self.retry(request).await;
        }

        let refreshed = self.refresh(&mut epoch).await;
        drop(epoch);

        if refreshed { self.retry(request).await } else { first }
    }

    /// Suspend while a refresh is running, then snapshot the generation and
    /// the access token the next request will carry.
    async fn wait_for_unlock(&self) -> (u64, Option<String>) {
        let epoch = self.lock.lock().await;
        (epoch.generation, self.current_access_token())
    }

    async fn retry(&self, request: &RequestDescriptor) -> RequestOutcome {
        let token = self.current_access_token();
        // A second 401 here is returned as-is; there is no further refresh.
        self.send(request, token.as_deref()).await
    }

    async fn send(&self, request: &RequestDescriptor, access_token: Option<&str>) -> RequestOutcome {
        match access_token {
            Some(token) => self.transport.send(&request.authorized(token)).await,
            None => self.transport.send(request).await,
        }
    }

    fn current_access_token(&self) -> Option<String> {
        self.credentials.access_token().unwrap_or_else(|e| {
            log::warn!("Failed to read access token: {}", e);
            None
        })
    }

    /// Run the refresh protocol while holding the lock.
    ///
    /// On any failure both stored credentials are cleared.
    async fn refresh(&self, epoch: &mut MutexGuard<'_, RefreshEpoch>) -> bool {
        let generation = epoch.generation + 1;
        let succeeded = match self.request_new_access_token().await {
            Some(access) => match self.credentials.store_access(&access) {
                Ok(()) => true,
                Err(e) => {
                    log::warn!("Failed to store refreshed access token: {}", e);
                    false
                }
            },
            None => false,
        };

        if succeeded {
            tracing::info!(generation, "Access token refreshed");
        } else {
            tracing::warn!(generation, "Token refresh failed, clearing credentials");
            if let Err(e) = self.credentials.clear() {
                log::warn!("Failed to clear credentials: {}", e);
            }
        }

        epoch.generation = generation;
        epoch.last_succeeded = succeeded;
        succeeded
    }

    async fn request_new_access_token(&self) -> Option<String> {
        let refresh_token = match self.credentials.refresh_token() {
            Ok(Some(token)) => token,
            Ok(None) => {
                log::info!("No refresh token stored, cannot refresh");
                return None;
            }
            Err(e) => {
                log::warn!("Failed to read refresh token: {}", e);
                return None;
            }
        };

        let request = RequestDescriptor::post(&self.refresh_path, json!({ "refresh": refresh_token }));
        match self.transport.send(&request).await {
            RequestOutcome::Success(response) => match serde_json::from_value::<RefreshResponse>(response.body) {
                Ok(parsed) => Some(parsed.access),
                Err(e) => {
                    log::warn!("Malformed refresh response: {}", e);
                    None
                }
            },
            RequestOutcome::Failure(failure) => {
                log::warn!(
                    "Refresh endpoint failed (status {:?}): {}",
                    failure.status,
                    failure.message()
                );
                None
            }
        }
    }
}
