//! Navigation busy signal.
//!
//! Blends two inputs into the aggregator's `route_active` flag:
//! - the authoritative transition state (loading/submitting vs idle)
//! - a short hint raised on every location change and cleared after a window
//!
//! The authoritative state wins: when a transition starts, any pending hint
//! timer is cancelled so it cannot clear the flag underneath it.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use std::time::Duration;

use tokio::task::JoinHandle;

use super::aggregator::LoadingAggregator;

/// How long a location change keeps the route marked active
pub const DEFAULT_HINT_WINDOW: Duration = Duration::from_millis(500);

/// Authoritative navigation state reported by the router
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TransitionState {
    #[default]
    Idle,
    Loading,
    Submitting,
}

impl TransitionState {
    pub fn is_busy(&self) -> bool {
        !matches!(self, TransitionState::Idle)
    }
}

struct HintTimer {
    id: u64,
    handle: JoinHandle<()>,
}

#[derive(Default)]
struct NavState {
    transition: TransitionState,
    location: Option<String>,
    hint: Option<HintTimer>,
    next_hint_id: u64,
}

impl NavState {
    fn cancel_hint(&mut self) -> bool {
        match self.hint.take() {
            Some(timer) => {
                timer.handle.abort();
                true
            }
            None => false,
        }
    }

    fn route_active(&self) -> bool {
        self.transition.is_busy() || self.hint.is_some()
    }
}

struct Inner {
    aggregator: Arc<LoadingAggregator>,
    hint_window: Duration,
    state: Mutex<NavState>,
}

impl Inner {
    fn lock_state(&self) -> MutexGuard<'_, NavState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn expire_hint(&self, id: u64) {
        let mut state = self.lock_state();
        if state.hint.as_ref().map(|t| t.id) != Some(id) {
            return;
        }
        state.hint = None;
        self.aggregator.set_route_active(state.route_active());
    }
}

/// Feeds navigation activity into a `LoadingAggregator`.
///
/// Must be used from within a tokio runtime: location changes spawn the
/// hint timer.
pub struct NavigationSignal {
    inner: Arc<Inner>,
}

impl NavigationSignal {
    pub fn new(aggregator: Arc<LoadingAggregator>) -> Self {
        Self::with_hint_window(aggregator, DEFAULT_HINT_WINDOW)
    }

    pub fn with_hint_window(aggregator: Arc<LoadingAggregator>, hint_window: Duration) -> Self {
        Self {
            inner: Arc::new(Inner {
                aggregator,
                hint_window,
                state: Mutex::new(NavState::default()),
            }),
        }
    }

    /// Report the router's transition state.
    pub fn on_transition(&self, transition: TransitionState) {
        let mut state = self.inner.lock_state();
        state.transition = transition;
        if transition.is_busy() && state.cancel_hint() {
            log::debug!("Navigation {:?} cancelled pending hint", transition);
        }
        self.inner.aggregator.set_route_active(state.route_active());
    }

    /// Report that the visible location changed.
    ///
    /// While a transition is already in progress the hint is redundant and is
    /// not armed.
    pub fn on_location_change(&self, location: &str) {
        let mut state = self.inner.lock_state();
        if state.location.as_deref() == Some(location) {
            return;
        }
        state.location = Some(location.to_string());

        if state.transition.is_busy() {
            return;
        }

        state.cancel_hint();
        let id = state.next_hint_id;
        state.next_hint_id += 1;

        let weak: Weak<Inner> = Arc::downgrade(&self.inner);
        let window = self.inner.hint_window;
        let handle = tokio::spawn(async move {
            tokio::time::sleep(window).await;
            if let Some(inner) = weak.upgrade() {
                inner.expire_hint(id);
            }
        });
        state.hint = Some(HintTimer { id, handle });

        self.inner.aggregator.set_route_active(true);
    }

    /// Last location reported
    pub fn location(&self) -> Option<String> {
        self.inner.lock_state().location.clone()
    }

    /// Whether a hint timer is outstanding
    pub fn hint_pending(&self) -> bool {
        self.inner.lock_state().hint.is_some()
    }

    /// Cancel the hint timer and stop contributing to the busy flag.
    pub fn shutdown(&self) {
        let mut state = self.inner.lock_state();
        state.cancel_hint();
        state.transition = TransitionState::Idle;
        self.inner.aggregator.set_route_active(false);
    }
}

impl Drop for NavigationSignal {
    fn drop(&mut self) {
        self.inner.lock_state().cancel_hint();
    }
}
