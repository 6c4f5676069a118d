//! Ordered, failure-isolated event dispatch.

use std::any::Any;
use std::collections::HashMap;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock};
use std::time::Instant;

use futures::FutureExt;
use polyedge_core::Result;
use polyedge_observability::StructuredLogger;

use crate::context::EventContext;
use crate::event::Event;
use crate::listener::{EventListener, ListenerId};

#[derive(Clone)]
struct Registration {
    id: ListenerId,
    listener: Arc<dyn EventListener>,
}

/// Summary of one emission.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EmitOutcome {
    pub event: Event,
    /// Listeners that ran.
    pub listeners: usize,
    /// Listeners that returned an error or panicked.
    pub failures: usize,
}

impl EmitOutcome {
    /// Whether every listener succeeded.
    pub fn is_clean(&self) -> bool {
        self.failures == 0
    }
}

/// Process-wide registry of lifecycle listeners.
///
/// Built once at startup and shared through `Arc`. Registration is meant for
/// startup; emission works on a snapshot of the listener list so it never
/// holds the lock across an await.
pub struct EventPipeline {
    listeners: RwLock<HashMap<Event, Vec<Registration>>>,
    next_id: AtomicU64,
    logger: StructuredLogger,
}

impl EventPipeline {
    pub fn new(logger: StructuredLogger) -> Self {
        Self {
            listeners: RwLock::new(HashMap::new()),
            next_id: AtomicU64::new(1),
            logger,
        }
    }

    /// Append `listener` to `event`. Listeners run in registration order.
    pub fn on(&self, event: Event, listener: Arc<dyn EventListener>) -> ListenerId {
        let id = ListenerId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.listeners
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(event)
            .or_default()
            .push(Registration { id, listener });

        self.logger
            .debug_builder("listener registered")
            .field("event", event.as_str())
            .field("listener", id.to_string())
            .emit();
        id
    }

    /// Register by event name.
    ///
    /// Fails with `UnknownEvent` for names outside the event set.
    pub fn on_named(&self, name: &str, listener: Arc<dyn EventListener>) -> Result<ListenerId> {
        let event: Event = name.parse()?;
        Ok(self.on(event, listener))
    }

    /// Remove one listener. Returns whether it was registered.
    pub fn off(&self, event: Event, id: ListenerId) -> bool {
        let mut listeners = self
            .listeners
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        let Some(registered) = listeners.get_mut(&event) else {
            return false;
        };

        let before = registered.len();
        registered.retain(|r| r.id != id);
        let removed = registered.len() != before;
        if registered.is_empty() {
            listeners.remove(&event);
        }
        removed
    }

    pub fn listener_count(&self, event: Event) -> usize {
        self.listeners
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&event)
            .map_or(0, Vec::len)
    }

    /// Whether at least one listener is attached to `event`.
    pub fn is_registered(&self, event: Event) -> bool {
        self.listener_count(event) > 0
    }

    /// Events with at least one listener, in declaration order.
    pub fn registered_events(&self) -> Vec<Event> {
        let listeners = self.listeners.read().unwrap_or_else(PoisonError::into_inner);
        Event::ALL
            .into_iter()
            .filter(|event| listeners.contains_key(event))
            .collect()
    }

    fn snapshot(&self, event: Event) -> Vec<Registration> {
        self.listeners
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&event)
            .cloned()
            .unwrap_or_default()
    }

    /// Run every listener of `event` in order, awaiting each.
    ///
    /// A listener that errors or panics is logged and skipped; the remaining
    /// listeners still run and the emission itself never fails.
    pub async fn emit(&self, event: Event, ctx: &mut EventContext) -> EmitOutcome {
        let registrations = self.snapshot(event);
        let mut outcome = EmitOutcome {
            event,
            listeners: registrations.len(),
            failures: 0,
        };
        if registrations.is_empty() {
            return outcome;
        }

        let start = Instant::now();
        for registration in registrations {
            let result = AssertUnwindSafe(registration.listener.handle(ctx))
                .catch_unwind()
                .await;
            match result {
                Ok(Ok(())) => {}
                Ok(Err(e)) => {
                    outcome.failures += 1;
                    self.logger
                        .warn_builder("event listener failed")
                        .field("event", event.as_str())
                        .field("listener", registration.id.to_string())
                        .field("error", format!("{:#}", e))
                        .emit();
                }
                Err(panic) => {
                    outcome.failures += 1;
                    self.logger
                        .error_builder("event listener panicked")
                        .field("event", event.as_str())
                        .field("listener", registration.id.to_string())
                        .field("panic", panic_message(panic.as_ref()))
                        .emit();
                }
            }
        }

        self.logger
            .debug_builder("event emitted")
            .field("event", event.as_str())
            .field_i64("listeners", outcome.listeners as i64)
            .field_i64("failures", outcome.failures as i64)
            .duration_ms("duration_ms", start.elapsed())
            .emit();
        outcome
    }

    /// Alias of [`EventPipeline::emit`].
    pub async fn trigger(&self, event: Event, ctx: &mut EventContext) -> EmitOutcome {
        self.emit(event, ctx).await
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "non-string panic payload".to_string()
    }
}
