//! Operation lifecycle
//!
//! Every data operation runs through the `Dispatcher`, which emits one
//! `Pending` and one terminal event per call to its observers.

pub mod dispatch;
pub mod event;

pub use dispatch::Dispatcher;
pub use event::{API_NAMESPACE, LifecycleEvent, LifecycleObserver, OperationName, Phase, SCAN_NAMESPACE};
