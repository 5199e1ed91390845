#![forbid(unsafe_code)]

//! Flush scheduling: batch phases, dirty-set selection, and flush reports.
//!
//! # Phases
//!
//! `Idle → BatchOpen → Flushing → Idle`. The first write while idle opens
//! the batch; all writes until the flush coalesce into it. A flush processes
//! one snapshot of the dirty set: components dirtied *during* the flush wait
//! for the next one, which bounds every flush to a single pass and makes a
//! non-converging cascade an application bug rather than a hang.

use web_time::Duration;

use ripple_reactive::ComponentId;

use crate::error::RuntimeError;

/// Batch state of the update loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SchedulerPhase {
    #[default]
    Idle,
    BatchOpen,
    Flushing,
}

/// One render failure recorded during a flush.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderFailureReport {
    pub component: ComponentId,
    pub cause: String,
}

/// Outcome of one flush.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FlushReport {
    /// Monotonic flush counter (1-based).
    pub flush_seq: u64,
    /// Components re-rendered in this flush.
    pub rendered: usize,
    /// Patch operations applied across all reconciles.
    pub patches_applied: usize,
    /// Components pushed to the next flush by the batch cap.
    pub deferred: usize,
    /// Per-component failures; siblings proceeded.
    pub failures: Vec<RenderFailureReport>,
    /// Wall time of the flush.
    pub render_time: Duration,
}

#[derive(Debug, Default)]
pub(crate) struct Scheduler {
    phase: SchedulerPhase,
    /// Overflow from the batch cap, processed ahead of newly dirty work.
    deferred: Vec<ComponentId>,
    flush_seq: u64,
}

impl Scheduler {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn phase(&self) -> SchedulerPhase {
        self.phase
    }

    /// A state write landed; arm the batch if idle.
    pub(crate) fn note_write(&mut self) {
        if self.phase == SchedulerPhase::Idle {
            self.phase = SchedulerPhase::BatchOpen;
        }
    }

    /// Enter `Flushing`, rejecting re-entry.
    pub(crate) fn begin_flush(&mut self) -> Result<u64, RuntimeError> {
        if self.phase == SchedulerPhase::Flushing {
            return Err(RuntimeError::ReentrantUpdate);
        }
        self.phase = SchedulerPhase::Flushing;
        self.flush_seq += 1;
        Ok(self.flush_seq)
    }

    /// Leave `Flushing`; `pending` re-arms the batch for cascaded work.
    pub(crate) fn end_flush(&mut self, pending: bool) {
        self.phase = if pending {
            SchedulerPhase::BatchOpen
        } else {
            SchedulerPhase::Idle
        };
    }

    pub(crate) fn take_deferred(&mut self) -> Vec<ComponentId> {
        std::mem::take(&mut self.deferred)
    }

    pub(crate) fn push_deferred(&mut self, overflow: Vec<ComponentId>) {
        self.deferred = overflow;
    }

    pub(crate) fn has_deferred(&self) -> bool {
        !self.deferred.is_empty()
    }

    /// Deduplicate and order the dirty snapshot (parents before children:
    /// ascending depth, then creation order), then split off everything past
    /// the batch cap.
    pub(crate) fn select(
        candidates: Vec<ComponentId>,
        batch_size: usize,
        order_key: impl Fn(ComponentId) -> (usize, u64),
    ) -> (Vec<ComponentId>, Vec<ComponentId>) {
        let mut work = candidates;
        work.sort_unstable();
        work.dedup();
        work.sort_by_key(|&id| order_key(id));
        let overflow = if work.len() > batch_size {
            work.split_off(batch_size)
        } else {
            Vec::new()
        };
        (work, overflow)
    }
}
