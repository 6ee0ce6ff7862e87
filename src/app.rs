//! Application wiring
//!
//! Builds the whole request-execution layer once: credential store, transport,
//! refresh coordinator, dispatcher, busy signal, poll supervisor and the typed
//! API clients on top.

use std::sync::Arc;
use std::time::Duration;

use crate::api::{AccountApi, DEFAULT_LOGIN_PATH, JobId, ScanApi, running_ids};
use crate::credentials::{CredentialStore, KeyValueStore};
use crate::error::Result;
use crate::lifecycle::Dispatcher;
use crate::loading::{DEFAULT_HINT_WINDOW, LoadingAggregator, NavigationSignal, TrackedNamespaces};
use crate::poll::{DEFAULT_POLL_INTERVAL, PollSupervisor};
use crate::refresh::{DEFAULT_REFRESH_PATH, RefreshCoordinator};
use crate::transport::{HttpTransport, HttpTransportConfig, Transport};

/// Settings for building an `App`
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub base_url: String,
    pub timeout: Duration,
    pub refresh_path: String,
    pub login_path: String,
    pub poll_interval: Duration,
    pub hint_window: Duration,
    pub tracked: TrackedNamespaces,
}

impl AppConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            timeout: Duration::from_secs(30),
            refresh_path: DEFAULT_REFRESH_PATH.to_string(),
            login_path: DEFAULT_LOGIN_PATH.to_string(),
            poll_interval: DEFAULT_POLL_INTERVAL,
            hint_window: DEFAULT_HINT_WINDOW,
            tracked: TrackedNamespaces::default(),
        }
    }
}

/// The assembled request-execution and state-coordination layer
pub struct App {
    credentials: CredentialStore,
    aggregator: Arc<LoadingAggregator>,
    navigation: NavigationSignal,
    scans: Arc<ScanApi>,
    account: AccountApi,
    poll: PollSupervisor,
}

impl App {
    /// Build on top of an explicit transport and credential backend.
    pub fn new(config: AppConfig, transport: Arc<dyn Transport>, backend: Arc<dyn KeyValueStore>) -> Self {
        let credentials = CredentialStore::new(backend);
        let coordinator = Arc::new(
            RefreshCoordinator::new(transport, credentials.clone()).with_refresh_path(config.refresh_path.clone()),
        );

        let aggregator = Arc::new(LoadingAggregator::new(config.tracked.clone()));
        let dispatcher = Arc::new(Dispatcher::new(coordinator).with_observer(aggregator.clone()));
        let navigation = NavigationSignal::with_hint_window(aggregator.clone(), config.hint_window);

        let scans = Arc::new(ScanApi::new(dispatcher.clone()));
        let account = AccountApi::new(dispatcher).with_login_path(config.login_path.clone());
        let poll = PollSupervisor::with_interval(scans.clone(), config.poll_interval);

        Self {
            credentials,
            aggregator,
            navigation,
            scans,
            account,
            poll,
        }
    }

    /// Build with the HTTP transport.
    pub fn connect(config: AppConfig, backend: Arc<dyn KeyValueStore>) -> Result<Self> {
        let transport = HttpTransport::new(HttpTransportConfig::new(config.base_url.clone()).with_timeout(config.timeout))?;
        Ok(Self::new(config, Arc::new(transport), backend))
    }

    pub fn credentials(&self) -> &CredentialStore {
        &self.credentials
    }

    pub fn aggregator(&self) -> &Arc<LoadingAggregator> {
        &self.aggregator
    }

    pub fn navigation(&self) -> &NavigationSignal {
        &self.navigation
    }

    pub fn scans(&self) -> &Arc<ScanApi> {
        &self.scans
    }

    pub fn account(&self) -> &AccountApi {
        &self.account
    }

    pub fn poll(&self) -> &PollSupervisor {
        &self.poll
    }

    /// Whether the UI should show a blocking indicator
    pub fn is_busy(&self) -> bool {
        self.aggregator.is_busy()
    }

    /// Report a location change to the navigation busy signal
    pub fn navigate(&self, location: &str) {
        self.navigation.on_location_change(location);
    }

    /// Push the latest published job state into the poll supervisor.
    ///
    /// The selected job's status comes from its detail when that detail is
    /// for the same job, otherwise from its row in the list.
    pub fn reconcile_polling(&mut self, selected: Option<&JobId>) {
        let jobs = self.scans.jobs();
        let running = running_ids(&jobs);

        let status = selected.and_then(|id| {
            self.scans
                .detail()
                .filter(|job| &job.id == id)
                .or_else(|| jobs.iter().find(|job| &job.id == id).cloned())
                .map(|job| job.status)
        });

        self.poll.reconcile(&running, selected, status);
    }

    /// Stop polling and release the navigation hint.
    pub fn shutdown(&mut self) {
        self.poll.shutdown();
        self.navigation.shutdown();
    }
}
