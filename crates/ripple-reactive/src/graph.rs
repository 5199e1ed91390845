#![forbid(unsafe_code)]

//! The dependency graph: cells, computations, edges, and dirty propagation.
//!
//! # Design
//!
//! The graph owns every cell and computation. Reads performed during an
//! [`Execution`] are recorded as subscriber→source edges for that run only;
//! a successful commit replaces the subscriber's previous edge set wholesale,
//! so a subscriber that stops reading a cell stops being notified about it.
//! Writes made inside an execution are buffered and applied at commit, which
//! makes each run transactional: a failed execution changes nothing.
//!
//! # Invariants
//!
//! 1. A subscriber's edge set reflects exactly the reads of its most recent
//!    successful execution.
//! 2. Committed edges are acyclic: an execution that would write a source it
//!    (transitively) reads fails with [`GraphError::WriteCycle`] at the write
//!    call, and computation evaluation re-entry fails with
//!    [`GraphError::EvalCycle`].
//! 3. A write whose value deep-equals the current value marks nothing dirty.
//! 4. Dirty propagation recurses through computations and stops at
//!    components; dirty components accumulate until drained by the scheduler.

use ahash::{AHashMap, AHashSet};

use crate::id::{CellId, ComputationId, ComponentId, SourceId, SubscriberId};
use crate::logging::{debug, warn};
use crate::value::Value;

/// Compute closure for a derived value. Reads made through the scope become
/// dependencies of the computation.
pub type ComputeFn = Box<dyn Fn(&mut ComputeScope<'_, '_>) -> Result<Value, GraphError>>;

/// Errors surfaced by graph operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GraphError {
    /// The cell id is not (or no longer) registered.
    UnknownCell(CellId),
    /// The computation id is not (or no longer) registered.
    UnknownComputation(ComputationId),
    /// An execution tried to write a cell it (transitively) reads.
    WriteCycle { cell: CellId },
    /// A computation's evaluation (transitively) required its own value.
    EvalCycle { computation: ComputationId },
}

impl GraphError {
    /// Whether this error is a reactive-cycle violation.
    #[must_use]
    pub fn is_cycle(&self) -> bool {
        matches!(
            self,
            GraphError::WriteCycle { .. } | GraphError::EvalCycle { .. }
        )
    }
}

impl std::fmt::Display for GraphError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            GraphError::UnknownCell(id) => write!(f, "unknown cell {id}"),
            GraphError::UnknownComputation(id) => write!(f, "unknown computation {id}"),
            GraphError::WriteCycle { cell } => {
                write!(f, "reactive cycle: execution writes {cell} which it reads")
            }
            GraphError::EvalCycle { computation } => {
                write!(f, "reactive cycle: {computation} depends on its own value")
            }
        }
    }
}

impl std::error::Error for GraphError {}

/// One tracked run of a subscriber (a render pass or a computation).
///
/// Owns the read set and the buffered writes. Dropping an execution without
/// committing discards both, which is exactly the failure path: the previous
/// edges of the subscriber stay intact.
#[derive(Debug)]
pub struct Execution {
    subscriber: SubscriberId,
    reads: AHashSet<SourceId>,
    writes: Vec<(CellId, Value)>,
}

impl Execution {
    #[must_use]
    pub fn new(subscriber: SubscriberId) -> Self {
        Self {
            subscriber,
            reads: AHashSet::new(),
            writes: Vec::new(),
        }
    }

    #[must_use]
    pub fn subscriber(&self) -> SubscriberId {
        self.subscriber
    }

    /// Number of distinct sources read so far.
    #[must_use]
    pub fn read_count(&self) -> usize {
        self.reads.len()
    }

    /// Number of buffered writes so far.
    #[must_use]
    pub fn write_count(&self) -> usize {
        self.writes.len()
    }
}

/// Scope handed to compute closures; bundles the graph with the running
/// execution so reads and writes are tracked.
pub struct ComputeScope<'g, 'e> {
    graph: &'g mut ReactiveGraph,
    exec: &'e mut Execution,
}

impl ComputeScope<'_, '_> {
    /// Tracked cell read.
    pub fn read(&mut self, cell: CellId) -> Result<Value, GraphError> {
        self.graph.read(self.exec, cell)
    }

    /// Tracked read of another computation, evaluating it if stale.
    pub fn read_computation(&mut self, computation: ComputationId) -> Result<Value, GraphError> {
        self.graph.read_computation(self.exec, computation)
    }

    /// Buffered, cycle-checked write.
    pub fn write(&mut self, cell: CellId, value: Value) -> Result<(), GraphError> {
        self.graph.write(self.exec, cell, value)
    }
}

struct Cell {
    value: Value,
    subscribers: AHashSet<SubscriberId>,
}

struct Computation {
    /// Taken while the closure runs so evaluation can borrow the graph.
    compute: Option<ComputeFn>,
    cached: Option<Value>,
    dirty: bool,
    subscribers: AHashSet<SubscriberId>,
}

/// The dependency graph. One per runtime instance; never shared.
#[derive(Default)]
pub struct ReactiveGraph {
    cells: AHashMap<CellId, Cell>,
    computations: AHashMap<ComputationId, Computation>,
    /// Forward edges: subscriber → sources read during its last successful
    /// execution.
    edges: AHashMap<SubscriberId, AHashSet<SourceId>>,
    /// Components whose dependencies changed since the last drain.
    dirty_components: AHashSet<ComponentId>,
    /// Computations currently being evaluated (re-entrancy guard).
    eval_stack: Vec<ComputationId>,
    next_cell: u64,
    next_computation: u64,
}

impl ReactiveGraph {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    // ── Declarations ────────────────────────────────────────────────────

    /// Register a new cell. Allocation only; nothing is marked dirty.
    pub fn declare_cell(&mut self, initial: Value) -> CellId {
        self.next_cell += 1;
        let id = CellId::new(self.next_cell);
        self.cells.insert(
            id,
            Cell {
                value: initial,
                subscribers: AHashSet::new(),
            },
        );
        id
    }

    /// Register a derived computation. Evaluated lazily on first read.
    pub fn declare_computation(&mut self, compute: ComputeFn) -> ComputationId {
        self.next_computation += 1;
        let id = ComputationId::new(self.next_computation);
        self.computations.insert(
            id,
            Computation {
                compute: Some(compute),
                cached: None,
                dirty: true,
                subscribers: AHashSet::new(),
            },
        );
        id
    }

    // ── Untracked access ────────────────────────────────────────────────

    /// Current value of a cell, without creating a dependency edge.
    #[must_use]
    pub fn value(&self, cell: CellId) -> Option<&Value> {
        self.cells.get(&cell).map(|c| &c.value)
    }

    /// External (untracked) write. Returns whether the value changed.
    ///
    /// Unchanged values short-circuit: no dirty marks, no propagation.
    pub fn set(&mut self, cell: CellId, value: Value) -> Result<bool, GraphError> {
        if !self.cells.contains_key(&cell) {
            return Err(GraphError::UnknownCell(cell));
        }
        Ok(self.apply_write(cell, value))
    }

    /// Current value of a computation, evaluating it if stale. Untracked.
    pub fn computation_value(&mut self, computation: ComputationId) -> Result<Value, GraphError> {
        self.evaluate(computation)
    }

    // ── Tracked access (within an execution) ────────────────────────────

    /// Tracked read: records `exec.subscriber → cell` for this run.
    ///
    /// A cell written earlier in the same execution reads back its buffered
    /// value without creating an edge: the value came from this run, not
    /// from an external dependency.
    pub fn read(&mut self, exec: &mut Execution, cell: CellId) -> Result<Value, GraphError> {
        if let Some((_, buffered)) = exec.writes.iter().rev().find(|(c, _)| *c == cell) {
            return Ok(buffered.clone());
        }
        let stored = self
            .cells
            .get(&cell)
            .ok_or(GraphError::UnknownCell(cell))?;
        exec.reads.insert(SourceId::Cell(cell));
        Ok(stored.value.clone())
    }

    /// Tracked read of a computation, evaluating it first if stale.
    pub fn read_computation(
        &mut self,
        exec: &mut Execution,
        computation: ComputationId,
    ) -> Result<Value, GraphError> {
        let value = self.evaluate(computation)?;
        exec.reads.insert(SourceId::Computation(computation));
        Ok(value)
    }

    /// Buffered write. Fails with [`GraphError::WriteCycle`] when the cell is
    /// in the execution's transitive read set; the execution's earlier
    /// buffered writes remain discardable by dropping the execution.
    pub fn write(
        &mut self,
        exec: &mut Execution,
        cell: CellId,
        value: Value,
    ) -> Result<(), GraphError> {
        if !self.cells.contains_key(&cell) {
            return Err(GraphError::UnknownCell(cell));
        }
        if self.reads_transitively(&exec.reads, cell) {
            warn!(%cell, subscriber = %exec.subscriber, "write cycle rejected");
            return Err(GraphError::WriteCycle { cell });
        }
        exec.writes.push((cell, value));
        Ok(())
    }

    /// Commit a successful execution: replace the subscriber's edges with the
    /// reads of this run, then apply the buffered writes in call order.
    pub fn commit(&mut self, exec: Execution) {
        let Execution {
            subscriber,
            reads,
            writes,
        } = exec;

        if let Some(previous) = self.edges.insert(subscriber, reads.clone()) {
            for source in previous.difference(&reads) {
                self.remove_subscription(*source, subscriber);
            }
        }
        for source in &reads {
            self.add_subscription(*source, subscriber);
        }

        for (cell, value) in writes {
            // The cell may have been destroyed between buffer and commit.
            if self.cells.contains_key(&cell) {
                self.apply_write(cell, value);
            }
        }
    }

    // ── Dirty bookkeeping ───────────────────────────────────────────────

    /// Drain the accumulated dirty components, sorted for determinism.
    pub fn take_dirty_components(&mut self) -> Vec<ComponentId> {
        let mut drained: Vec<ComponentId> = self.dirty_components.drain().collect();
        drained.sort_unstable();
        drained
    }

    #[must_use]
    pub fn has_dirty_components(&self) -> bool {
        !self.dirty_components.is_empty()
    }

    /// Force a component dirty (used for explicit re-render requests).
    pub fn mark_component_dirty(&mut self, component: ComponentId) {
        self.dirty_components.insert(component);
    }

    // ── Teardown ────────────────────────────────────────────────────────

    /// Remove a subscriber and every edge in which it participates.
    pub fn remove_subscriber(&mut self, subscriber: SubscriberId) {
        if let Some(sources) = self.edges.remove(&subscriber) {
            for source in sources {
                self.remove_subscription(source, subscriber);
            }
        }
        if let SubscriberId::Computation(id) = subscriber {
            self.computations.remove(&id);
        }
        if let SubscriberId::Component(id) = subscriber {
            self.dirty_components.remove(&id);
        }
    }

    /// Destroy a cell, dropping it from every subscriber's edge set.
    pub fn destroy_cell(&mut self, cell: CellId) {
        if let Some(stored) = self.cells.remove(&cell) {
            for subscriber in stored.subscribers {
                if let Some(sources) = self.edges.get_mut(&subscriber) {
                    sources.remove(&SourceId::Cell(cell));
                }
            }
        }
    }

    // ── Introspection ───────────────────────────────────────────────────

    #[must_use]
    pub fn cell_count(&self) -> usize {
        self.cells.len()
    }

    #[must_use]
    pub fn computation_count(&self) -> usize {
        self.computations.len()
    }

    /// Current subscriber count of a cell (test/diagnostic hook).
    #[must_use]
    pub fn subscriber_count(&self, cell: CellId) -> usize {
        self.cells.get(&cell).map_or(0, |c| c.subscribers.len())
    }

    /// Estimated heap footprint of values and bookkeeping.
    #[must_use]
    pub fn size_bytes(&self) -> usize {
        let cells: usize = self
            .cells
            .values()
            .map(|c| c.value.size_bytes() + c.subscribers.len() * 16)
            .sum();
        let comps: usize = self
            .computations
            .values()
            .map(|c| c.cached.as_ref().map_or(0, Value::size_bytes) + c.subscribers.len() * 16)
            .sum();
        let edges: usize = self.edges.values().map(|s| s.len() * 16).sum();
        cells + comps + edges
    }

    // ── Internals ───────────────────────────────────────────────────────

    fn add_subscription(&mut self, source: SourceId, subscriber: SubscriberId) {
        match source {
            SourceId::Cell(id) => {
                if let Some(cell) = self.cells.get_mut(&id) {
                    cell.subscribers.insert(subscriber);
                }
            }
            SourceId::Computation(id) => {
                if let Some(comp) = self.computations.get_mut(&id) {
                    comp.subscribers.insert(subscriber);
                }
            }
        }
    }

    fn remove_subscription(&mut self, source: SourceId, subscriber: SubscriberId) {
        match source {
            SourceId::Cell(id) => {
                if let Some(cell) = self.cells.get_mut(&id) {
                    cell.subscribers.remove(&subscriber);
                }
            }
            SourceId::Computation(id) => {
                if let Some(comp) = self.computations.get_mut(&id) {
                    comp.subscribers.remove(&subscriber);
                }
            }
        }
    }

    /// Whether `cell` is reachable from `reads`, following computation edges.
    fn reads_transitively(&self, reads: &AHashSet<SourceId>, cell: CellId) -> bool {
        let mut stack: Vec<SourceId> = reads.iter().copied().collect();
        let mut seen: AHashSet<SourceId> = AHashSet::new();
        while let Some(source) = stack.pop() {
            if !seen.insert(source) {
                continue;
            }
            match source {
                SourceId::Cell(c) => {
                    if c == cell {
                        return true;
                    }
                }
                SourceId::Computation(comp) => {
                    if let Some(sources) = self.edges.get(&SubscriberId::Computation(comp)) {
                        stack.extend(sources.iter().copied());
                    }
                }
            }
        }
        false
    }

    /// Store a new value and propagate dirty marks. Returns whether the
    /// value actually changed.
    fn apply_write(&mut self, cell: CellId, value: Value) -> bool {
        let Some(stored) = self.cells.get_mut(&cell) else {
            return false;
        };
        if stored.value == value {
            return false;
        }
        stored.value = value;
        debug!(%cell, "cell changed, propagating dirty marks");
        self.mark_subscribers_dirty(SourceId::Cell(cell));
        true
    }

    /// Recurse through computation subscribers; stop at components, which
    /// accumulate in the drain set for the scheduler.
    fn mark_subscribers_dirty(&mut self, source: SourceId) {
        let subscribers: Vec<SubscriberId> = match source {
            SourceId::Cell(id) => self
                .cells
                .get(&id)
                .map(|c| c.subscribers.iter().copied().collect())
                .unwrap_or_default(),
            SourceId::Computation(id) => self
                .computations
                .get(&id)
                .map(|c| c.subscribers.iter().copied().collect())
                .unwrap_or_default(),
        };
        for subscriber in subscribers {
            match subscriber {
                SubscriberId::Component(id) => {
                    self.dirty_components.insert(id);
                }
                SubscriberId::Computation(id) => {
                    let newly_dirty = match self.computations.get_mut(&id) {
                        Some(comp) if !comp.dirty => {
                            comp.dirty = true;
                            true
                        }
                        _ => false,
                    };
                    // Already-dirty computations were propagated through
                    // before; stopping here keeps the recursion finite.
                    if newly_dirty {
                        self.mark_subscribers_dirty(SourceId::Computation(id));
                    }
                }
            }
        }
    }

    /// Evaluate a computation if stale, committing its execution on success.
    fn evaluate(&mut self, id: ComputationId) -> Result<Value, GraphError> {
        {
            let comp = self
                .computations
                .get(&id)
                .ok_or(GraphError::UnknownComputation(id))?;
            if !comp.dirty
                && let Some(cached) = &comp.cached
            {
                return Ok(cached.clone());
            }
        }
        if self.eval_stack.contains(&id) {
            warn!(computation = %id, "evaluation cycle rejected");
            return Err(GraphError::EvalCycle { computation: id });
        }
        let compute = {
            let comp = self
                .computations
                .get_mut(&id)
                .ok_or(GraphError::UnknownComputation(id))?;
            comp.compute
                .take()
                .ok_or(GraphError::EvalCycle { computation: id })?
        };

        self.eval_stack.push(id);
        let mut exec = Execution::new(SubscriberId::Computation(id));
        let result = {
            let mut scope = ComputeScope {
                graph: self,
                exec: &mut exec,
            };
            compute(&mut scope)
        };
        self.eval_stack.pop();

        // Restore the closure whatever the outcome.
        if let Some(comp) = self.computations.get_mut(&id) {
            comp.compute = Some(compute);
        }

        match result {
            Ok(value) => {
                self.commit(exec);
                if let Some(comp) = self.computations.get_mut(&id) {
                    comp.cached = Some(value.clone());
                    comp.dirty = false;
                }
                Ok(value)
            }
            // Drop the execution: edges and buffered writes are discarded,
            // the computation stays dirty and retries on the next read.
            Err(err) => Err(err),
        }
    }
}

impl std::fmt::Debug for ReactiveGraph {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReactiveGraph")
            .field("cells", &self.cells.len())
            .field("computations", &self.computations.len())
            .field("dirty_components", &self.dirty_components.len())
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
