#![forbid(unsafe_code)]

//! Event listeners: registration-order fan-out with failure isolation.
//!
//! Listeners receive the event plus an [`EventCtx`] that buffers state
//! writes; a listener's writes are applied (in call order) only after it
//! returns successfully, so a failing listener changes nothing. Failures
//! are reported and counted but never stop dispatch to later listeners.

use ripple_reactive::Value;

/// An event delivered through `dispatch_event`.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Event {
    pub event_type: String,
    #[cfg_attr(feature = "serde", serde(default))]
    pub payload: Value,
}

impl Event {
    #[must_use]
    pub fn new(event_type: impl Into<String>, payload: Value) -> Self {
        Self {
            event_type: event_type.into(),
            payload,
        }
    }

    /// Event with an empty payload.
    #[must_use]
    pub fn signal(event_type: impl Into<String>) -> Self {
        Self::new(event_type, Value::Null)
    }
}

/// Buffered side effects of one listener invocation.
#[derive(Debug, Default)]
pub struct EventCtx {
    writes: Vec<(String, Value)>,
}

impl EventCtx {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Queue a state write, applied in call order after the listener
    /// returns `Ok`.
    pub fn set_state(&mut self, key: impl Into<String>, value: Value) {
        self.writes.push((key.into(), value));
    }

    pub(crate) fn into_writes(self) -> Vec<(String, Value)> {
        self.writes
    }
}

/// Listener callback. Errors are reported and isolated, not propagated.
pub type ListenerFn = Box<dyn FnMut(&Event, &mut EventCtx) -> Result<(), String>>;

/// Outcome of one `dispatch_event` call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DispatchReport {
    /// Listeners that ran to completion.
    pub delivered: usize,
    /// Listeners that returned an error (their writes were dropped).
    pub failed: usize,
}

#[derive(Default)]
pub(crate) struct EventRegistry {
    /// Flat registration-order list; dispatch filters by type so listeners
    /// for the same type fire in registration order.
    listeners: Vec<(String, ListenerFn)>,
}

impl EventRegistry {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn register(&mut self, event_type: impl Into<String>, listener: ListenerFn) {
        self.listeners.push((event_type.into(), listener));
    }

    pub(crate) fn len(&self) -> usize {
        self.listeners.len()
    }

    /// Take the listener list for a dispatch pass (restored afterwards);
    /// keeps the registry borrow-free while callbacks run.
    pub(crate) fn take(&mut self) -> Vec<(String, ListenerFn)> {
        std::mem::take(&mut self.listeners)
    }

    pub(crate) fn restore(&mut self, mut listeners: Vec<(String, ListenerFn)>) {
        // Listeners registered during dispatch (none today, but cheap to
        // keep correct) stay after the restored ones.
        listeners.append(&mut self.listeners);
        self.listeners = listeners;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ctx_buffers_in_call_order() {
        let mut ctx = EventCtx::new();
        ctx.set_state("a", Value::from(1i64));
        ctx.set_state("b", Value::from(2i64));
        ctx.set_state("a", Value::from(3i64));
        let writes = ctx.into_writes();
        assert_eq!(writes.len(), 3);
        assert_eq!(writes[2], ("a".to_string(), Value::Number(3.0)));
    }

    #[test]
    fn registry_preserves_registration_order() {
        let mut registry = EventRegistry::new();
        registry.register("click", Box::new(|_, _| Ok(())));
        registry.register("key", Box::new(|_, _| Ok(())));
        registry.register("click", Box::new(|_, _| Ok(())));

        let taken = registry.take();
        let types: Vec<&str> = taken.iter().map(|(t, _)| t.as_str()).collect();
        assert_eq!(types, vec!["click", "key", "click"]);
        registry.restore(taken);
        assert_eq!(registry.len(), 3);
    }
}
