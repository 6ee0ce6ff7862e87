//! Loading aggregator - folds lifecycle events into one busy flag.

use std::collections::BTreeSet;
use std::sync::{Mutex, MutexGuard, PoisonError};

use tokio::sync::watch;

use crate::lifecycle::{API_NAMESPACE, LifecycleEvent, LifecycleObserver, Phase, SCAN_NAMESPACE};

/// Registry of operation namespaces whose lifecycle counts toward busy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackedNamespaces {
    namespaces: BTreeSet<String>,
}

impl TrackedNamespaces {
    /// Registry tracking nothing
    pub fn empty() -> Self {
        Self {
            namespaces: BTreeSet::new(),
        }
    }

    pub fn register(mut self, namespace: impl Into<String>) -> Self {
        self.namespaces.insert(namespace.into());
        self
    }

    pub fn tracks(&self, namespace: &str) -> bool {
        self.namespaces.contains(namespace)
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.namespaces.iter().map(String::as_str)
    }
}

impl Default for TrackedNamespaces {
    /// The ordinary and scan data namespaces
    fn default() -> Self {
        Self::empty().register(API_NAMESPACE).register(SCAN_NAMESPACE)
    }
}

/// Snapshot of the aggregated loading state
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoadingState {
    /// Tracked operations currently in flight
    pub count: usize,
    /// Set by the navigation busy signal
    pub route_active: bool,
}

impl LoadingState {
    pub fn is_busy(&self) -> bool {
        self.count > 0 || self.route_active
    }
}

/// Maintains the in-flight counter and publishes the derived busy flag.
///
/// Only lifecycle events change `count`; only the navigation busy signal
/// changes `route_active`.
pub struct LoadingAggregator {
    tracked: TrackedNamespaces,
    state: Mutex<LoadingState>,
    busy_tx: watch::Sender<bool>,
}

impl LoadingAggregator {
    pub fn new(tracked: TrackedNamespaces) -> Self {
        let (busy_tx, _) = watch::channel(false);
        Self {
            tracked,
            state: Mutex::new(LoadingState::default()),
            busy_tx,
        }
    }

    pub fn tracked(&self) -> &TrackedNamespaces {
        &self.tracked
    }

    /// Current state
    pub fn snapshot(&self) -> LoadingState {
        *self.lock_state()
    }

    pub fn is_busy(&self) -> bool {
        self.snapshot().is_busy()
    }

    /// Receiver that sees every change of the busy flag
    pub fn subscribe(&self) -> watch::Receiver<bool> {
        self.busy_tx.subscribe()
    }

    /// Apply one lifecycle event. Events from untracked namespaces are ignored.
    pub fn apply(&self, event: &LifecycleEvent) {
        if !self.tracked.tracks(event.namespace()) {
            return;
        }

        let mut state = self.lock_state();
        match event.phase {
            Phase::Pending => state.count += 1,
            Phase::Fulfilled | Phase::Rejected => {
                if state.count == 0 {
                    log::debug!("Ignoring unmatched {} ({})", event.action_type(), event.request_id);
                }
                state.count = state.count.saturating_sub(1);
            }
        }
        self.publish(&state);
    }

    pub(crate) fn set_route_active(&self, active: bool) {
        let mut state = self.lock_state();
        state.route_active = active;
        self.publish(&state);
    }

    fn publish(&self, state: &LoadingState) {
        let busy = state.is_busy();
        self.busy_tx.send_if_modified(|current| {
            if *current == busy {
                false
            } else {
                *current = busy;
                true
            }
        });
    }

    fn lock_state(&self) -> MutexGuard<'_, LoadingState> {
        // Plain counters, still valid after a poisoning panic.
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for LoadingAggregator {
    fn default() -> Self {
        Self::new(TrackedNamespaces::default())
    }
}

impl LifecycleObserver for LoadingAggregator {
    fn observe(&self, event: &LifecycleEvent) {
        self.apply(event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lifecycle::OperationName;

    fn pending(ns: &str, id: &str) -> LifecycleEvent {
        LifecycleEvent::pending(OperationName::new(ns, "query"), id)
    }

    fn fulfilled(ns: &str, id: &str) -> LifecycleEvent {
        LifecycleEvent::fulfilled(OperationName::new(ns, "query"), id)
    }

    fn rejected(ns: &str, id: &str) -> LifecycleEvent {
        LifecycleEvent::rejected(OperationName::new(ns, "query"), id)
    }

    #[test]
    fn test_default_registry_tracks_both_namespaces() {
        let tracked = TrackedNamespaces::default();
        assert!(tracked.tracks("api"));
        assert!(tracked.tracks("scanApi"));
        assert!(!tracked.tracks("router"));
        assert_eq!(tracked.iter().count(), 2);
    }

    #[test]
    fn test_registry_is_extensible() {
        let tracked = TrackedNamespaces::default().register("reportApi");
        assert!(tracked.tracks("reportApi"));
    }

    #[test]
    fn test_initial_state_is_idle() {
        let agg = LoadingAggregator::default();
        assert_eq!(agg.snapshot(), LoadingState::default());
        assert!(!agg.is_busy());
    }

    #[test]
    fn test_pending_and_terminal_events_balance() {
        let agg = LoadingAggregator::default();

        agg.apply(&pending("api", "1"));
        agg.apply(&pending("scanApi", "2"));
        assert_eq!(agg.snapshot().count, 2);
        assert!(agg.is_busy());

        agg.apply(&fulfilled("api", "1"));
        assert_eq!(agg.snapshot().count, 1);

        agg.apply(&rejected("scanApi", "2"));
        assert_eq!(agg.snapshot().count, 0);
        assert!(!agg.is_busy());
    }

    #[test]
    fn test_extra_terminal_events_floor_at_zero() {
        let agg = LoadingAggregator::default();

        agg.apply(&fulfilled("api", "ghost"));
        agg.apply(&rejected("api", "ghost"));
        assert_eq!(agg.snapshot().count, 0);

        agg.apply(&pending("api", "1"));
        agg.apply(&fulfilled("api", "1"));
        agg.apply(&fulfilled("api", "1"));
        assert_eq!(agg.snapshot().count, 0);

        agg.apply(&pending("api", "2"));
        assert_eq!(agg.snapshot().count, 1);
    }

    #[test]
    fn test_untracked_namespace_passes_through() {
        let agg = LoadingAggregator::default();
        agg.apply(&pending("router", "1"));
        assert_eq!(agg.snapshot().count, 0);
    }

    #[test]
    fn test_custom_registry_only_counts_registered() {
        let agg = LoadingAggregator::new(TrackedNamespaces::empty().register("scanApi"));
        agg.apply(&pending("api", "1"));
        agg.apply(&pending("scanApi", "2"));
        assert_eq!(agg.snapshot().count, 1);
    }

    #[test]
    fn test_route_active_alone_is_busy() {
        let agg = LoadingAggregator::default();
        agg.set_route_active(true);
        assert!(agg.is_busy());
        assert_eq!(agg.snapshot().count, 0);

        agg.set_route_active(false);
        assert!(!agg.is_busy());
    }

    #[test]
    fn test_subscriber_sees_busy_transitions() {
        let agg = LoadingAggregator::default();
        let mut rx = agg.subscribe();
        assert!(!*rx.borrow_and_update());

        agg.apply(&pending("api", "1"));
        assert!(rx.has_changed().unwrap());
        assert!(*rx.borrow_and_update());

        // Still busy, no new notification
        agg.apply(&pending("api", "2"));
        assert!(!rx.has_changed().unwrap());

        agg.apply(&fulfilled("api", "1"));
        agg.apply(&fulfilled("api", "2"));
        assert!(rx.has_changed().unwrap());
        assert!(!*rx.borrow_and_update());
    }

    #[test]
    fn test_any_interleaving_never_goes_negative() {
        let agg = LoadingAggregator::default();
        let script = [
            rejected("api", "a"),
            pending("api", "b"),
            fulfilled("scanApi", "c"),
            fulfilled("api", "b"),
            rejected("api", "b"),
            pending("scanApi", "d"),
            pending("scanApi", "e"),
            fulfilled("scanApi", "d"),
        ];
        let mut expected: usize = 0;
        for event in &script {
            agg.apply(event);
            expected = match event.phase {
                Phase::Pending => expected + 1,
                _ => expected.saturating_sub(1),
            };
            assert_eq!(agg.snapshot().count, expected);
        }
        assert_eq!(agg.snapshot().count, 1);
    }
}
