//! Lifecycle events.
//!
//! The kernel and its chains emit named events at well-known points of the
//! request lifecycle. Listeners are plain closures registered under an event
//! name; emission is synchronous and in registration order. Each lifecycle
//! event fires exactly once per request, regardless of how many middlewares
//! or backends end up running.

use parking_lot::RwLock;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;

/// Well-known event names emitted by the framework.
pub mod names {
    /// Fired once before the kernel boots its chains for a request.
    pub const KERNEL_PRE_BOOT: &str = "kernel.pre_boot";
    /// Fired once before the middleware chain's request phase.
    pub const MIDDLEWARE_PRE_RUN: &str = "middleware.pre_run";
    /// Fired once after the middleware chain's response phase.
    pub const MIDDLEWARE_POST_RUN: &str = "middleware.post_run";
    /// Fired once before the authentication chain runs.
    pub const AUTH_PRE_RUN: &str = "auth.pre_run";
    /// Fired once after the authentication chain finishes.
    pub const AUTH_POST_RUN: &str = "auth.post_run";
    /// Fired once before the switch dispatches to a service.
    pub const SWITCH_PRE_RUN: &str = "switch.pre_run";
}

type Listener = Arc<dyn Fn(&str, &Value) + Send + Sync>;

/// Registry of event listeners.
///
/// # Example
///
/// ```
/// use pylon_core::Events;
/// use serde_json::json;
///
/// let events = Events::new();
/// events.on("kernel.pre_boot", |name, _payload| {
///     println!("saw {name}");
/// });
/// events.emit("kernel.pre_boot", &json!({"request": "abc"}));
/// ```
#[derive(Default)]
pub struct Events {
    listeners: RwLock<HashMap<String, Vec<Listener>>>,
}

impl Events {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a listener for the named event.
    pub fn on<F>(&self, event: impl Into<String>, listener: F)
    where
        F: Fn(&str, &Value) + Send + Sync + 'static,
    {
        self.listeners
            .write()
            .entry(event.into())
            .or_default()
            .push(Arc::new(listener));
    }

    /// Emits the named event to all its listeners, in registration order.
    ///
    /// Unknown events are a no-op. Listeners run synchronously on the
    /// caller's thread and must not block.
    pub fn emit(&self, event: &str, payload: &Value) {
        let listeners: Vec<Listener> = match self.listeners.read().get(event) {
            Some(registered) => registered.clone(),
            None => return,
        };
        for listener in listeners {
            listener(event, payload);
        }
    }

    /// Number of listeners registered for the named event.
    #[must_use]
    pub fn listener_count(&self, event: &str) -> usize {
        self.listeners.read().get(event).map_or(0, Vec::len)
    }
}

impl std::fmt::Debug for Events {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Events")
            .field("events", &self.listeners.read().len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_emit_in_order() {
        let events = Events::new();
        let order = Arc::new(RwLock::new(Vec::new()));
        for tag in ["first", "second", "third"] {
            let order = Arc::clone(&order);
            events.on(names::AUTH_PRE_RUN, move |_, _| {
                order.write().push(tag);
            });
        }
        events.emit(names::AUTH_PRE_RUN, &Value::Null);
        assert_eq!(*order.read(), vec!["first", "second", "third"]);
    }

    #[test]
    fn test_unknown_event_noop() {
        let events = Events::new();
        events.emit("nobody.listens", &json!({"x": 1}));
        assert_eq!(events.listener_count("nobody.listens"), 0);
    }

    #[test]
    fn test_payload_delivered() {
        let events = Events::new();
        let hits = Arc::new(AtomicUsize::new(0));
        let hits_inner = Arc::clone(&hits);
        events.on(names::SWITCH_PRE_RUN, move |name, payload| {
            assert_eq!(name, names::SWITCH_PRE_RUN);
            assert_eq!(payload["service"], "auth");
            hits_inner.fetch_add(1, Ordering::SeqCst);
        });
        events.emit(names::SWITCH_PRE_RUN, &json!({"service": "auth"}));
        events.emit(names::SWITCH_PRE_RUN, &json!({"service": "auth"}));
        assert_eq!(hits.load(Ordering::SeqCst), 2);
    }
}
