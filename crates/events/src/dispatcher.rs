//! Listener registry and synchronous event fan-out.
//!
//! [`EventDispatcher`] is the central hub for pushed [`QueueEvent`]s.
//! It delivers every event to every registered listener in subscription
//! order, isolating listener failures from each other and from the
//! notification channel: a rendering bug in one feature must not break
//! job-completion tracking in another.

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};

use docq_core::job::QueueEvent;

// ---------------------------------------------------------------------------
// QueueListener
// ---------------------------------------------------------------------------

/// A consumer of pushed queue events.
///
/// Implemented automatically for closures, so simple listeners can be
/// registered as `dispatcher.subscribe(Arc::new(|event| ...))`.
pub trait QueueListener: Send + Sync {
    fn on_event(&self, event: &QueueEvent);
}

impl<F> QueueListener for F
where
    F: Fn(&QueueEvent) + Send + Sync,
{
    fn on_event(&self, event: &QueueEvent) {
        self(event)
    }
}

// ---------------------------------------------------------------------------
// EventDispatcher
// ---------------------------------------------------------------------------

/// Opaque handle returned by [`EventDispatcher::subscribe`], used to
/// unsubscribe the same registration later.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

/// Registry of queue-event listeners with ordered, fault-isolated
/// delivery.
///
/// Insertion order is preserved and duplicates are allowed (registering
/// the same listener twice delivers each event twice: caller's
/// responsibility). Designed to be shared via `Arc<EventDispatcher>`.
pub struct EventDispatcher {
    listeners: RwLock<Vec<(u64, Arc<dyn QueueListener>)>>,
    next_id: AtomicU64,
}

impl EventDispatcher {
    /// Create an empty dispatcher.
    pub fn new() -> Self {
        Self {
            listeners: RwLock::new(Vec::new()),
            next_id: AtomicU64::new(1),
        }
    }

    /// Register a listener. Events dispatched from now on are delivered
    /// to it in subscription order.
    pub fn subscribe(&self, listener: Arc<dyn QueueListener>) -> SubscriptionId {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.listeners
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .push((id, listener));
        SubscriptionId(id)
    }

    /// Remove a previous registration. Returns `false` if the id was
    /// already removed (or never existed).
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut listeners = self.listeners.write().unwrap_or_else(|e| e.into_inner());
        let before = listeners.len();
        listeners.retain(|(listener_id, _)| *listener_id != id.0);
        listeners.len() != before
    }

    /// Number of currently registered listeners.
    pub fn listener_count(&self) -> usize {
        self.listeners
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .len()
    }

    /// Deliver `event` to every registered listener.
    ///
    /// A panicking listener is caught and logged; delivery continues with
    /// the remaining listeners and nothing propagates to the caller. The
    /// registry is snapshotted first, so listeners may subscribe or
    /// unsubscribe re-entrantly without deadlocking.
    pub fn dispatch(&self, event: &QueueEvent) {
        let snapshot: Vec<Arc<dyn QueueListener>> = self
            .listeners
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .iter()
            .map(|(_, listener)| Arc::clone(listener))
            .collect();

        for listener in snapshot {
            if let Err(panic) = catch_unwind(AssertUnwindSafe(|| listener.on_event(event))) {
                let reason = panic
                    .downcast_ref::<&str>()
                    .map(|s| s.to_string())
                    .or_else(|| panic.downcast_ref::<String>().cloned())
                    .unwrap_or_else(|| "<non-string panic payload>".into());
                tracing::error!(
                    job_id = %event.job_id,
                    reason = %reason,
                    "Queue event listener panicked, skipping it for this event",
                );
            }
        }
    }
}

impl Default for EventDispatcher {
    fn default() -> Self {
        Self::new()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use docq_core::job::JobStatus;

    use super::*;

    fn event(job_id: &str) -> QueueEvent {
        QueueEvent {
            job_id: job_id.into(),
            status: JobStatus::Queued,
            position: None,
            eta_ms: None,
            limits: None,
        }
    }

    /// Listener that appends a tag to a shared log on every event.
    struct Recorder {
        tag: &'static str,
        log: Arc<Mutex<Vec<&'static str>>>,
    }

    impl QueueListener for Recorder {
        fn on_event(&self, _event: &QueueEvent) {
            self.log.lock().unwrap().push(self.tag);
        }
    }

    #[test]
    fn delivers_in_subscription_order() {
        let dispatcher = EventDispatcher::new();
        let log = Arc::new(Mutex::new(Vec::new()));

        for tag in ["first", "second", "third"] {
            dispatcher.subscribe(Arc::new(Recorder {
                tag,
                log: Arc::clone(&log),
            }));
        }

        dispatcher.dispatch(&event("J1"));
        assert_eq!(*log.lock().unwrap(), vec!["first", "second", "third"]);
    }

    #[test]
    fn duplicate_listeners_each_receive_the_event() {
        let dispatcher = EventDispatcher::new();
        let log = Arc::new(Mutex::new(Vec::new()));
        let listener: Arc<dyn QueueListener> = Arc::new(Recorder {
            tag: "dup",
            log: Arc::clone(&log),
        });

        dispatcher.subscribe(Arc::clone(&listener));
        dispatcher.subscribe(listener);

        dispatcher.dispatch(&event("J1"));
        assert_eq!(log.lock().unwrap().len(), 2);
    }

    #[test]
    fn panicking_listener_does_not_stop_delivery() {
        let dispatcher = EventDispatcher::new();
        let log = Arc::new(Mutex::new(Vec::new()));

        dispatcher.subscribe(Arc::new(Recorder {
            tag: "before",
            log: Arc::clone(&log),
        }));
        dispatcher.subscribe(Arc::new(|_event: &QueueEvent| {
            panic!("listener bug");
        }));
        dispatcher.subscribe(Arc::new(Recorder {
            tag: "after",
            log: Arc::clone(&log),
        }));

        dispatcher.dispatch(&event("J1"));
        assert_eq!(*log.lock().unwrap(), vec!["before", "after"]);
    }

    #[test]
    fn unsubscribe_removes_exactly_one_registration() {
        let dispatcher = EventDispatcher::new();
        let log = Arc::new(Mutex::new(Vec::new()));
        let listener: Arc<dyn QueueListener> = Arc::new(Recorder {
            tag: "kept",
            log: Arc::clone(&log),
        });

        let to_remove = dispatcher.subscribe(Arc::clone(&listener));
        dispatcher.subscribe(listener);
        assert_eq!(dispatcher.listener_count(), 2);

        assert!(dispatcher.unsubscribe(to_remove));
        assert!(!dispatcher.unsubscribe(to_remove));
        assert_eq!(dispatcher.listener_count(), 1);

        dispatcher.dispatch(&event("J1"));
        assert_eq!(log.lock().unwrap().len(), 1);
    }

    #[test]
    fn listener_may_subscribe_reentrantly_during_dispatch() {
        let dispatcher = Arc::new(EventDispatcher::new());
        let inner = Arc::clone(&dispatcher);

        dispatcher.subscribe(Arc::new(move |_event: &QueueEvent| {
            inner.subscribe(Arc::new(|_event: &QueueEvent| {}));
        }));

        dispatcher.dispatch(&event("J1"));
        assert_eq!(dispatcher.listener_count(), 2);
    }

    #[test]
    fn dispatch_with_no_listeners_is_a_noop() {
        let dispatcher = EventDispatcher::new();
        dispatcher.dispatch(&event("J1"));
    }
}
