//! Busy signal
//!
//! The aggregator counts in-flight tracked operations; the navigation signal
//! marks page transitions. Either one makes the application busy.

pub mod aggregator;
pub mod navigation;

pub use aggregator::{LoadingAggregator, LoadingState, TrackedNamespaces};
pub use navigation::{DEFAULT_HINT_WINDOW, NavigationSignal, TransitionState};
