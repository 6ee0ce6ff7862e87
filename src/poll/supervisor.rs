//! Poll supervisor - keeps at most one refetch timer per poll kind.
//!
//! The caller pushes the current state in through `reconcile` whenever it
//! changes. Each kind has a key derived from that state; when the key changes
//! the old timer is cancelled before a new one is (maybe) started.

use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};

use crate::api::{JobId, JobStatus};

/// Default refetch interval for both poll kinds
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(2000);

/// Shortest interval a timer will run with; tokio intervals reject zero
pub const MIN_POLL_INTERVAL: Duration = Duration::from_millis(1);

/// Refetches triggered by poll timers.
///
/// Refetches are idempotent reads; results flow back to the caller through
/// its own channels, not through the supervisor.
#[async_trait]
pub trait JobFetcher: Send + Sync {
    async fn refetch_list(&self);
    async fn refetch_detail(&self, id: &JobId);
}

/// The two independent timer lifecycles
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollKind {
    List,
    Detail,
}

/// Timers started and cancelled since creation
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PollStats {
    pub list_started: u64,
    pub list_cancelled: u64,
    pub detail_started: u64,
    pub detail_cancelled: u64,
}

impl PollStats {
    fn record_start(&mut self, kind: PollKind) {
        match kind {
            PollKind::List => self.list_started += 1,
            PollKind::Detail => self.detail_started += 1,
        }
    }

    fn record_cancel(&mut self, kind: PollKind) {
        match kind {
            PollKind::List => self.list_cancelled += 1,
            PollKind::Detail => self.detail_cancelled += 1,
        }
    }
}

/// Key of the detail timer: which job, polled while in which status
type DetailKey = Option<(JobId, JobStatus)>;

struct PollTimer<K> {
    key: K,
    handle: JoinHandle<()>,
}

/// Owns the list and detail poll timers.
///
/// Must be used from within a tokio runtime. Dropping the supervisor cancels
/// both timers.
pub struct PollSupervisor {
    fetcher: Arc<dyn JobFetcher>,
    interval: Duration,
    list: Option<PollTimer<()>>,
    detail: Option<PollTimer<(JobId, JobStatus)>>,
    stats: PollStats,
}

impl PollSupervisor {
    pub fn new(fetcher: Arc<dyn JobFetcher>) -> Self {
        Self::with_interval(fetcher, DEFAULT_POLL_INTERVAL)
    }

    /// Supervisor with a custom interval, raised to `MIN_POLL_INTERVAL` if shorter.
    pub fn with_interval(fetcher: Arc<dyn JobFetcher>, interval: Duration) -> Self {
        if interval < MIN_POLL_INTERVAL {
            log::warn!("Poll interval {:?} too short, using {:?}", interval, MIN_POLL_INTERVAL);
        }
        Self {
            fetcher,
            interval: interval.max(MIN_POLL_INTERVAL),
            list: None,
            detail: None,
            stats: PollStats::default(),
        }
    }

    /// Re-evaluate both timers against the latest state.
    ///
    /// `running` is the set of jobs still pending or processing. The list timer
    /// runs while it is non-empty. The detail timer runs while `selected` is
    /// set and `selected_status` is pending or processing.
    pub fn reconcile(
        &mut self,
        running: &BTreeSet<JobId>,
        selected: Option<&JobId>,
        selected_status: Option<JobStatus>,
    ) {
        self.reconcile_list(!running.is_empty());

        let detail_key: DetailKey = match (selected, selected_status) {
            (Some(id), Some(status)) if status.is_active() => Some((id.clone(), status)),
            _ => None,
        };
        self.reconcile_detail(detail_key);
    }

    fn reconcile_list(&mut self, wanted: bool) {
        if self.list.is_some() == wanted {
            return;
        }

        self.cancel(PollKind::List);
        if wanted {
            let fetcher = self.fetcher.clone();
            let handle = self.spawn_timer(PollKind::List, move || {
                let fetcher = fetcher.clone();
                tokio::spawn(async move { fetcher.refetch_list().await });
            });
            self.list = Some(PollTimer { key: (), handle });
        }
    }

    fn reconcile_detail(&mut self, key: DetailKey) {
        let current = self.detail.as_ref().map(|t| &t.key);
        if current == key.as_ref() {
            return;
        }

        self.cancel(PollKind::Detail);
        if let Some((id, status)) = key {
            let fetcher = self.fetcher.clone();
            let job = id.clone();
            let handle = self.spawn_timer(PollKind::Detail, move || {
                let fetcher = fetcher.clone();
                let job = job.clone();
                tokio::spawn(async move { fetcher.refetch_detail(&job).await });
            });
            tracing::debug!(job = %id, ?status, "Polling job detail");
            self.detail = Some(PollTimer {
                key: (id, status),
                handle,
            });
        }
    }

    /// Start a recurring timer. The first tick fires one interval from now.
    fn spawn_timer<F>(&mut self, kind: PollKind, mut on_tick: F) -> JoinHandle<()>
    where
        F: FnMut() + Send + 'static,
    {
        self.stats.record_start(kind);
        tracing::debug!(?kind, interval_ms = self.interval.as_millis() as u64, "Poll timer started");

        let interval = self.interval;
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval_at(Instant::now() + interval, interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                on_tick();
            }
        })
    }

    fn cancel(&mut self, kind: PollKind) {
        let handle = match kind {
            PollKind::List => self.list.take().map(|t| t.handle),
            PollKind::Detail => self.detail.take().map(|t| t.handle),
        };
        if let Some(handle) = handle {
            handle.abort();
            self.stats.record_cancel(kind);
            tracing::debug!(?kind, "Poll timer cancelled");
        }
    }

    /// Whether a timer of `kind` is outstanding
    pub fn is_active(&self, kind: PollKind) -> bool {
        match kind {
            PollKind::List => self.list.is_some(),
            PollKind::Detail => self.detail.is_some(),
        }
    }

    /// Job whose detail is being polled
    pub fn detail_target(&self) -> Option<&JobId> {
        self.detail.as_ref().map(|t| &t.key.0)
    }

    pub fn stats(&self) -> PollStats {
        self.stats
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Cancel both timers.
    pub fn shutdown(&mut self) {
        self.cancel(PollKind::List);
        self.cancel(PollKind::Detail);
    }
}

impl Drop for PollSupervisor {
    fn drop(&mut self) {
        self.shutdown();
    }
}
