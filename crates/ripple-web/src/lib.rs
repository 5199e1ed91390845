#![forbid(unsafe_code)]

//! Host boundary: a deterministic, host-driven step runner over a
//! [`Runtime`].
//!
//! The host owns the loop: it pushes JSON-encoded events, calls [`step`]
//! when it wants a frame, and drains flat patch batches to mirror into its
//! own tree. Nothing here spawns tasks or touches wall-clock scheduling, so
//! a recorded event sequence replays to byte-identical patch batches —
//! verifiable via [`StepRunner::patch_hash`].
//!
//! [`step`]: StepRunner::step

pub mod flat;
pub mod input;

use std::collections::VecDeque;

use tracing::warn;

use ripple_runtime::{Event, Runtime, RuntimeConfig, SchedulerPhase};

pub use flat::{FlatPatchBatch, FlatPatchRow};
pub use input::EncodedInput;

/// Outcome of one [`StepRunner::step`] call.
#[derive(Debug, Clone, Copy, Default, PartialEq, serde::Serialize)]
pub struct StepResult {
    /// Host events consumed from the queue.
    pub events_processed: usize,
    /// Whether a flush ran (a batch was open).
    pub flushed: bool,
    /// Components re-rendered by the flush.
    pub rendered: usize,
    /// Patch operations applied by the flush.
    pub patches_applied: usize,
    /// Whether more work is already pending (deferred or cascaded).
    pub pending: bool,
}

/// Host-driven runner: queued encoded events in, flat patch batches out.
pub struct StepRunner {
    runtime: Runtime,
    queue: VecDeque<EncodedInput>,
    last_batch: Option<FlatPatchBatch>,
    logs: Vec<String>,
}

impl StepRunner {
    #[must_use]
    pub fn new(config: RuntimeConfig) -> Self {
        Self {
            runtime: Runtime::new(config),
            queue: VecDeque::new(),
            last_batch: None,
            logs: Vec::new(),
        }
    }

    /// The wrapped runtime, for host-side setup (components, listeners,
    /// router) before the event loop starts.
    pub fn runtime(&mut self) -> &mut Runtime {
        &mut self.runtime
    }

    /// Queue one JSON-encoded host event. Malformed or unknown events are
    /// rejected with `false` (and a drainable log line); nothing panics.
    pub fn push_encoded_event(&mut self, raw: &str) -> bool {
        match input::decode(raw) {
            Some(event) => {
                self.queue.push_back(event);
                true
            }
            None => {
                warn!(raw, "rejected malformed host event");
                self.logs.push(format!("rejected host event: {raw}"));
                false
            }
        }
    }

    /// Queued, not-yet-processed host events.
    #[must_use]
    pub fn queued_events(&self) -> usize {
        self.queue.len()
    }

    /// Drain the event queue into the runtime, then flush once if any of it
    /// (or earlier API calls) opened a batch.
    pub fn step(&mut self) -> StepResult {
        let mut result = StepResult::default();
        while let Some(event) = self.queue.pop_front() {
            result.events_processed += 1;
            self.apply_input(event);
        }

        if self.runtime.phase() == SchedulerPhase::BatchOpen {
            match self.runtime.update() {
                Ok(report) => {
                    result.flushed = true;
                    result.rendered = report.rendered;
                    result.patches_applied = report.patches_applied;
                    result.pending = self.runtime.phase() != SchedulerPhase::Idle;
                    for failure in &report.failures {
                        self.logs
                            .push(format!("render failed: {}: {}", failure.component, failure.cause));
                    }
                }
                Err(err) => {
                    self.logs.push(format!("flush failed: {err}"));
                }
            }
        }

        self.collect_patches();
        result
    }

    fn apply_input(&mut self, event: EncodedInput) {
        match event {
            EncodedInput::SetState { key, value } => {
                self.runtime.set_state(&key, input::json_to_value(&value));
            }
            EncodedInput::Dispatch { event_type, payload } => {
                let event = Event::new(event_type, input::json_to_value(&payload));
                let report = self.runtime.dispatch_event(&event);
                if report.failed > 0 {
                    self.logs.push(format!(
                        "event {:?}: {} listener(s) failed",
                        event.event_type, report.failed
                    ));
                }
            }
            EncodedInput::Navigate { path } => {
                if !self.runtime.navigate(&path) {
                    self.logs.push(format!("navigate {path:?}: no router installed"));
                }
            }
        }
    }

    /// Fold freshly applied patches into the pending flat batch. Mount-time
    /// patches (applied outside `step`) are picked up here too.
    fn collect_patches(&mut self) {
        let batches = self.runtime.take_patches();
        if batches.is_empty() {
            return;
        }
        let fresh = flat::flatten(&batches);
        match &mut self.last_batch {
            None => self.last_batch = Some(fresh),
            Some(pending) => {
                // Undrained spans shift by the existing row count.
                let offset = pending.rows.len() as u32;
                pending.spans.extend(fresh.spans.iter().map(|s| s + offset));
                pending.components.extend(fresh.components);
                pending.rows.extend(fresh.rows);
            }
        }
    }

    /// Drain the pending flat patch batch, if any.
    pub fn take_patch_batch(&mut self) -> Option<FlatPatchBatch> {
        self.last_batch.take()
    }

    /// Content hash of the pending (undrained) flat batch.
    #[must_use]
    pub fn patch_hash(&self) -> Option<String> {
        self.last_batch.as_ref().map(flat::hash)
    }

    /// Drain accumulated host-facing log lines.
    pub fn take_logs(&mut self) -> Vec<String> {
        std::mem::take(&mut self.logs)
    }
}

impl std::fmt::Debug for StepRunner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StepRunner")
            .field("queued_events", &self.queue.len())
            .field("pending_rows", &self.last_batch.as_ref().map(FlatPatchBatch::row_count))
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use ripple_dom::Node;
    use ripple_reactive::Value;

    fn counter_runner() -> StepRunner {
        let mut runner = StepRunner::new(RuntimeConfig::default());
        let rt = runner.runtime();
        rt.set_state("count", Value::from(0i64));
        let counter = rt.create_component_with("counter", |scope| {
            let count = scope.get_state("count").unwrap_or_default();
            Ok(Node::text(format!("count: {}", count.to_text())))
        });
        rt.mount(counter, None).unwrap();
        runner
    }

    #[test]
    fn step_with_no_events_does_nothing() {
        let mut runner = counter_runner();
        let _ = runner.take_patch_batch(); // drain the mount batch
        let result = runner.step();
        assert_eq!(result.events_processed, 0);
        assert!(!result.flushed);
        assert_eq!(runner.take_patch_batch(), None);
    }

    #[test]
    fn encoded_set_state_flows_to_a_patch() {
        let mut runner = counter_runner();
        let _ = runner.step(); // collect the mount batch
        let _ = runner.take_patch_batch();

        assert!(runner.push_encoded_event(r#"{"kind":"set_state","key":"count","value":1}"#));
        let result = runner.step();
        assert_eq!(result.events_processed, 1);
        assert!(result.flushed);
        assert_eq!(result.rendered, 1);
        assert_eq!(result.patches_applied, 1);

        let batch = runner.take_patch_batch().unwrap();
        assert_eq!(batch.row_count(), 1);
        assert_eq!(batch.rows[0].op, "update_text");
        assert_eq!(batch.rows[0].text.as_deref(), Some("count: 1"));
    }

    #[test]
    fn malformed_input_is_rejected_without_panic() {
        let mut runner = counter_runner();
        assert!(!runner.push_encoded_event("not json"));
        assert!(!runner.push_encoded_event(r#"{"kind":"resize","cols":80}"#));
        assert_eq!(runner.queued_events(), 0);

        let logs = runner.take_logs();
        assert_eq!(logs.len(), 2);
        assert!(logs[0].contains("rejected host event"));
        // Drained is drained.
        assert!(runner.take_logs().is_empty());
    }

    #[test]
    fn mount_batch_is_collected_on_first_step() {
        let mut runner = counter_runner();
        let _ = runner.step();
        let batch = runner.take_patch_batch().unwrap();
        assert_eq!(batch.components.len(), 1);
        assert_eq!(batch.rows[0].op, "replace");
    }

    #[test]
    fn patch_hash_is_prefixed_and_deterministic() {
        let run = || {
            let mut runner = counter_runner();
            runner.push_encoded_event(r#"{"kind":"set_state","key":"count","value":7}"#);
            let _ = runner.step();
            runner.patch_hash().unwrap()
        };
        let first = run();
        let second = run();
        assert!(first.starts_with("fnv1a64:"));
        assert_eq!(first, second);

        // Hash drains with the batch.
        let mut runner = counter_runner();
        let _ = runner.step();
        assert!(runner.patch_hash().is_some());
        let _ = runner.take_patch_batch();
        assert_eq!(runner.patch_hash(), None);
    }

    #[test]
    fn undrained_batches_accumulate_with_shifted_spans() {
        let mut runner = counter_runner();
        let _ = runner.step(); // mount batch pending (1 replace row)

        runner.push_encoded_event(r#"{"kind":"set_state","key":"count","value":1}"#);
        let _ = runner.step(); // update batch folded in

        let batch = runner.take_patch_batch().unwrap();
        assert_eq!(batch.row_count(), 2);
        assert_eq!(batch.spans, vec![0, 1]);
        assert_eq!(batch.rows[1].op, "update_text");
    }

    #[test]
    fn dispatch_event_reaches_listeners() {
        let mut runner = StepRunner::new(RuntimeConfig::default());
        runner.runtime().add_event_listener("click", |event, ctx| {
            ctx.set_state("last_click", event.payload.clone());
            Ok(())
        });

        runner.push_encoded_event(r#"{"kind":"dispatch","event_type":"click","payload":{"x":3}}"#);
        let result = runner.step();
        assert_eq!(result.events_processed, 1);

        let stored = runner.runtime().get_state("last_click").unwrap();
        let record = stored.as_record().unwrap();
        assert_eq!(record.get("x"), Some(&Value::Number(3.0)));
    }

    #[test]
    fn failing_listener_is_logged_and_dispatch_continues() {
        let mut runner = StepRunner::new(RuntimeConfig::default());
        runner
            .runtime()
            .add_event_listener("go", |_, _| Err("nope".to_string()));
        runner.runtime().add_event_listener("go", |_, ctx| {
            ctx.set_state("ok", Value::from(true));
            Ok(())
        });

        runner.push_encoded_event(r#"{"kind":"dispatch","event_type":"go"}"#);
        let _ = runner.step();

        assert_eq!(runner.runtime().get_state("ok"), Some(Value::Bool(true)));
        let logs = runner.take_logs();
        assert!(logs.iter().any(|l| l.contains("listener(s) failed")));
    }

    #[test]
    fn navigate_without_router_logs() {
        let mut runner = StepRunner::new(RuntimeConfig::default());
        runner.push_encoded_event(r#"{"kind":"navigate","path":"/settings"}"#);
        let _ = runner.step();
        let logs = runner.take_logs();
        assert!(logs.iter().any(|l| l.contains("no router installed")));
    }

    #[test]
    fn step_reports_pending_when_work_is_deferred() {
        let mut runner = StepRunner::new(RuntimeConfig::new().with_batch_size(1));
        let rt = runner.runtime();
        rt.set_state("k", Value::from(0i64));
        for i in 0..3 {
            let id = rt.create_component_with(&format!("c{i}"), |scope| {
                Ok(Node::text(scope.get_state("k").unwrap_or_default().to_text()))
            });
            rt.mount(id, None).unwrap();
        }

        runner.push_encoded_event(r#"{"kind":"set_state","key":"k","value":1}"#);
        let first = runner.step();
        assert!(first.flushed);
        assert_eq!(first.rendered, 1);
        assert!(first.pending);

        let second = runner.step();
        assert!(second.flushed);
        let third = runner.step();
        assert!(third.flushed);
        assert!(!third.pending);
    }
}
