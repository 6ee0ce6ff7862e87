//! Dispatcher - runs operations through the refresh coordinator and reports
//! their lifecycle to observers.

use std::sync::Arc;

use super::event::{LifecycleEvent, LifecycleObserver, OperationName, Phase};
use crate::id::generate_request_id;
use crate::refresh::RefreshCoordinator;
use crate::transport::{RequestDescriptor, RequestOutcome};

/// Entry point for every tracked data operation
pub struct Dispatcher {
    coordinator: Arc<RefreshCoordinator>,
    observers: Vec<Arc<dyn LifecycleObserver>>,
}

impl Dispatcher {
    pub fn new(coordinator: Arc<RefreshCoordinator>) -> Self {
        Self {
            coordinator,
            observers: Vec::new(),
        }
    }

    /// Register an observer. Observers see events in registration order.
    pub fn with_observer(mut self, observer: Arc<dyn LifecycleObserver>) -> Self {
        self.observers.push(observer);
        self
    }

    pub fn coordinator(&self) -> &Arc<RefreshCoordinator> {
        &self.coordinator
    }

    /// Run one operation: `Pending`, execute, then `Fulfilled` or `Rejected`.
    pub async fn run(&self, operation: &OperationName, request: &RequestDescriptor) -> RequestOutcome {
        let mut in_flight = InFlight::start(self, operation.clone());
        let outcome = self.coordinator.execute(request).await;
        in_flight.settle(if outcome.is_success() {
            Phase::Fulfilled
        } else {
            Phase::Rejected
        });
        outcome
    }

    fn emit(&self, event: &LifecycleEvent) {
        log::debug!("{} ({})", event.action_type(), event.request_id);
        for observer in &self.observers {
            observer.observe(event);
        }
    }
}

/// Guard for one dispatched call.
///
/// Emits `Pending` on creation. If the call future is dropped before it
/// settles, the guard emits `Rejected` so no pending count is left behind.
struct InFlight<'a> {
    dispatcher: &'a Dispatcher,
    operation: OperationName,
    request_id: String,
    settled: bool,
}

impl<'a> InFlight<'a> {
    fn start(dispatcher: &'a Dispatcher, operation: OperationName) -> Self {
        let request_id = generate_request_id();
        dispatcher.emit(&LifecycleEvent::pending(operation.clone(), request_id.clone()));
        Self {
            dispatcher,
            operation,
            request_id,
            settled: false,
        }
    }

    fn settle(&mut self, phase: Phase) {
        if self.settled {
            return;
        }
        self.settled = true;
        self.dispatcher.emit(&LifecycleEvent::new(
            self.operation.clone(),
            self.request_id.clone(),
            phase,
        ));
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.settle(Phase::Rejected);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::credentials::{CredentialStore, MemoryStore};
    use crate::transport::MockTransport;
    use serde_json::Value;
    use std::sync::Mutex;
    use std::time::Duration;

    #[derive(Default)]
    struct Recorder {
        events: Mutex<Vec<LifecycleEvent>>,
    }

    impl Recorder {
        fn events(&self) -> Vec<LifecycleEvent> {
            self.events.lock().unwrap().clone()
        }
    }

    impl LifecycleObserver for Recorder {
        fn observe(&self, event: &LifecycleEvent) {
            self.events.lock().unwrap().push(event.clone());
        }
    }

    fn dispatcher(mock: MockTransport) -> (Dispatcher, Arc<Recorder>) {
        let creds = CredentialStore::new(Arc::new(MemoryStore::new()));
        let coordinator = Arc::new(RefreshCoordinator::new(Arc::new(mock), creds));
        let recorder = Arc::new(Recorder::default());
        (Dispatcher::new(coordinator).with_observer(recorder.clone()), recorder)
    }

    #[tokio::test]
    async fn test_success_emits_pending_then_fulfilled() {
        let (dispatcher, recorder) = dispatcher(MockTransport::new(|_| RequestOutcome::success(200, Value::Null)));

        let op = OperationName::scan("listJobs");
        let outcome = dispatcher.run(&op, &RequestDescriptor::get("/scans/")).await;
        assert!(outcome.is_success());

        let events = recorder.events();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].phase, Phase::Pending);
        assert_eq!(events[1].phase, Phase::Fulfilled);
        assert_eq!(events[0].request_id, events[1].request_id);
        assert_eq!(events[1].operation, op);
    }

    #[tokio::test]
    async fn test_failure_emits_rejected() {
        let (dispatcher, recorder) = dispatcher(MockTransport::new(|_| RequestOutcome::failure(500, Value::Null)));

        dispatcher
            .run(&OperationName::api("profile"), &RequestDescriptor::get("/auth/me/"))
            .await;

        let phases: Vec<Phase> = recorder.events().into_iter().map(|e| e.phase).collect();
        assert_eq!(phases, vec![Phase::Pending, Phase::Rejected]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_dropped_call_still_emits_terminal_event() {
        let (dispatcher, recorder) = dispatcher(
            MockTransport::new(|_| RequestOutcome::success(200, Value::Null)).with_latency(Duration::from_secs(10)),
        );

        let op = OperationName::scan("getJob");
        let request = RequestDescriptor::get("/scans/1/");
        let result = tokio::time::timeout(Duration::from_millis(10), dispatcher.run(&op, &request)).await;
        assert!(result.is_err());

        let phases: Vec<Phase> = recorder.events().into_iter().map(|e| e.phase).collect();
        assert_eq!(phases, vec![Phase::Pending, Phase::Rejected]);
    }

    #[tokio::test]
    async fn test_each_call_gets_its_own_request_id() {
        let (dispatcher, recorder) = dispatcher(MockTransport::new(|_| RequestOutcome::success(200, Value::Null)));

        let op = OperationName::scan("listJobs");
        dispatcher.run(&op, &RequestDescriptor::get("/scans/")).await;
        dispatcher.run(&op, &RequestDescriptor::get("/scans/")).await;

        let events = recorder.events();
        assert_eq!(events.len(), 4);
        assert_ne!(events[0].request_id, events[2].request_id);
    }
}
