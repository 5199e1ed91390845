#![forbid(unsafe_code)]

//! The runtime: an explicit owned object tying together the reactive graph,
//! the component registry, the store, the scheduler, and the target tree.
//!
//! # Control flow
//!
//! A `set_state` (or cell write) marks subscribing components dirty and arms
//! the batch. `update()` flushes once: it snapshots the dirty set, orders it
//! parent-before-child, re-renders each component, reconciles against its
//! committed tree, and applies the patch script to the target. Components
//! dirtied *during* the flush wait for the next one.
//!
//! # Isolation
//!
//! One component's render failure keeps its last committed tree and never
//! stops sibling updates. Multiple runtime instances coexist without
//! interference; there is no hidden global state.

use tracing::{debug, warn};
use web_time::{Duration, Instant};

use ripple_dom::{Node, NodePath, OffscreenTree, Patch, TargetTree};
use ripple_reactive::{
    CellId, ComponentId, ComputationId, ComputeFn, Execution, ReactiveGraph, SubscriberId, Value,
};

use crate::component::{ComponentKind, ComponentRegistry, RenderFn, RenderScope};
use crate::config::RuntimeConfig;
use crate::error::RuntimeError;
use crate::events::{DispatchReport, Event, EventCtx, EventRegistry, ListenerFn};
use crate::metrics::Metrics;
use crate::scheduler::{FlushReport, RenderFailureReport, Scheduler, SchedulerPhase};
use crate::store::StateStore;

/// Navigation collaborator. Opaque to the core: the runtime only forwards
/// `navigate` calls and a `tick` at the start of each flush.
pub trait Router {
    fn navigate(&mut self, path: &str);
    fn tick(&mut self) {}
}

/// One reconcile's patch script, journaled for host adapters.
#[derive(Debug, Clone, PartialEq)]
pub struct PatchBatch {
    pub component: ComponentId,
    pub patches: Vec<Patch>,
}

/// A reactive UI runtime instance.
pub struct Runtime {
    config: RuntimeConfig,
    graph: ReactiveGraph,
    components: ComponentRegistry,
    store: StateStore,
    scheduler: Scheduler,
    events: EventRegistry,
    target: Box<dyn TargetTree>,
    router: Option<Box<dyn Router>>,
    roots: Vec<ComponentId>,
    /// Applied patch scripts awaiting a host drain.
    journal: Vec<PatchBatch>,
    last_render_time: Duration,
    flushes: u64,
    patches_total: u64,
    render_failures: u64,
    listener_failures: u64,
}

impl Runtime {
    /// Runtime over the in-memory offscreen target.
    #[must_use]
    pub fn new(config: RuntimeConfig) -> Self {
        Self::with_target(config, Box::new(OffscreenTree::new()))
    }

    /// Runtime over a caller-provided target tree (a browser DOM shim, a
    /// recording target in tests, ...).
    #[must_use]
    pub fn with_target(config: RuntimeConfig, target: Box<dyn TargetTree>) -> Self {
        Self {
            config,
            graph: ReactiveGraph::new(),
            components: ComponentRegistry::new(),
            store: StateStore::new(),
            scheduler: Scheduler::new(),
            events: EventRegistry::new(),
            target,
            router: None,
            roots: Vec::new(),
            journal: Vec::new(),
            last_render_time: Duration::ZERO,
            flushes: 0,
            patches_total: 0,
            render_failures: 0,
            listener_failures: 0,
        }
    }

    #[must_use]
    pub fn config(&self) -> &RuntimeConfig {
        &self.config
    }

    #[must_use]
    pub fn phase(&self) -> SchedulerPhase {
        self.scheduler.phase()
    }

    // ── Components ──────────────────────────────────────────────────────

    /// Create a component of a named kind (`"text"`, `"container"`, or a
    /// custom element tag).
    pub fn create_component(&mut self, name: &str, kind: &str) -> ComponentId {
        self.components
            .create(name, ComponentKind::from(kind), None)
    }

    /// Create a component with an explicit render function.
    pub fn create_component_with(
        &mut self,
        name: &str,
        render: impl Fn(&mut RenderScope<'_>) -> Result<Node, String> + 'static,
    ) -> ComponentId {
        self.components.create(
            name,
            ComponentKind::Custom(name.to_string()),
            Some(Box::new(render) as RenderFn),
        )
    }

    /// Mount a component under `parent` (or as a runtime root) and perform
    /// its first render+reconcile: a pure insertion against an empty tree.
    ///
    /// Children recorded from a previous mount are remounted recursively.
    pub fn mount(
        &mut self,
        id: ComponentId,
        parent: Option<ComponentId>,
    ) -> Result<(), RuntimeError> {
        if self.components.get(id)?.mounted {
            warn!(component = %id, "mount ignored: already mounted");
            return Ok(());
        }
        let depth = match parent {
            None => 1,
            Some(p) => {
                let parent_slot = self.components.get(p)?;
                if !parent_slot.mounted {
                    return Err(RuntimeError::NotMounted(p));
                }
                parent_slot.depth + 1
            }
        };
        // Fail before any attachment so a rejected mount leaves no trace.
        self.check_depth(id, depth)?;

        self.components.get_mut(id)?.parent = parent;
        match parent {
            Some(p) => {
                self.components.get_mut(p)?.children.push(id);
                // The parent's child list changed; its rendered child
                // references are stale.
                self.graph.mark_component_dirty(p);
                self.scheduler.note_write();
            }
            None => self.roots.push(id),
        }
        self.mount_subtree(id, depth)
    }

    /// Deepest depth the subtree at `id` would reach when mounted at
    /// `depth`; errors if it exceeds the configured maximum.
    fn check_depth(&self, id: ComponentId, depth: usize) -> Result<(), RuntimeError> {
        let max = self.config.max_component_depth;
        if depth > max {
            return Err(RuntimeError::DepthExceeded { depth, max });
        }
        let children = &self.components.get(id)?.children;
        for &child in children {
            self.check_depth(child, depth + 1)?;
        }
        Ok(())
    }

    fn mount_subtree(&mut self, id: ComponentId, depth: usize) -> Result<(), RuntimeError> {
        {
            let slot = self.components.get_mut(id)?;
            slot.mounted = true;
            slot.depth = depth;
        }
        self.render_component(id)?;
        let children = self.components.get(id)?.children.clone();
        for child in children {
            self.mount_subtree(child, depth + 1)?;
        }
        Ok(())
    }

    /// Detach a subtree: components stay registered (and remountable), but
    /// stop rendering, lose their graph edges, and leave the target tree.
    pub fn unmount(&mut self, id: ComponentId) -> Result<(), RuntimeError> {
        let slot = self.components.get(id)?;
        if !slot.mounted {
            return Ok(());
        }
        let parent = slot.parent;
        match parent {
            Some(p) => {
                if let Ok(parent_slot) = self.components.get_mut(p) {
                    parent_slot.children.retain(|&c| c != id);
                }
                self.graph.mark_component_dirty(p);
                self.scheduler.note_write();
            }
            None => self.roots.retain(|&r| r != id),
        }
        for member in self.components.subtree(id) {
            if let Ok(slot) = self.components.get_mut(member) {
                slot.mounted = false;
                slot.depth = 0;
                slot.committed = None;
            }
            self.graph
                .remove_subscriber(SubscriberId::Component(member));
            self.target.detach(member);
        }
        self.components.get_mut(id)?.parent = None;
        Ok(())
    }

    /// Unmount and unregister a subtree, destroying its owned cells.
    pub fn destroy_component(&mut self, id: ComponentId) -> Result<(), RuntimeError> {
        self.unmount(id)?;
        for member in self.components.subtree(id) {
            if let Some(cells) = self.components.remove(member) {
                for cell in cells {
                    self.graph.destroy_cell(cell);
                }
            }
        }
        Ok(())
    }

    /// Last committed tree of a component (diagnostic/test hook).
    #[must_use]
    pub fn committed_tree(&self, id: ComponentId) -> Option<&Node> {
        self.components.get(id).ok()?.committed.as_ref()
    }

    /// Currently mounted root components, in mount order.
    #[must_use]
    pub fn roots(&self) -> &[ComponentId] {
        &self.roots
    }

    // ── State ───────────────────────────────────────────────────────────

    /// Write a store key. Redundant writes (deep equality) are inert.
    pub fn set_state(&mut self, key: &str, value: Value) {
        if self.store.set(&mut self.graph, key, value) {
            self.scheduler.note_write();
        }
    }

    /// Read a store key without subscribing.
    #[must_use]
    pub fn get_state(&self, key: &str) -> Option<Value> {
        self.store.get(&self.graph, key)
    }

    /// Remove a store key, destroying its backing cell.
    pub fn remove_state(&mut self, key: &str) -> Result<(), RuntimeError> {
        self.store.remove(&mut self.graph, key)
    }

    /// Declare a runtime-owned cell.
    pub fn declare_cell(&mut self, initial: Value) -> CellId {
        self.graph.declare_cell(initial)
    }

    /// Declare a cell owned by a component; destroyed with it.
    pub fn declare_cell_for(
        &mut self,
        component: ComponentId,
        initial: Value,
    ) -> Result<CellId, RuntimeError> {
        let cell = self.graph.declare_cell(initial);
        self.components.get_mut(component)?.owned_cells.push(cell);
        Ok(cell)
    }

    /// Declare a derived computation.
    pub fn declare_computation(&mut self, compute: ComputeFn) -> ComputationId {
        self.graph.declare_computation(compute)
    }

    /// Evaluate a computation outside any render (untracked).
    pub fn computation_value(&mut self, id: ComputationId) -> Result<Value, RuntimeError> {
        self.graph
            .computation_value(id)
            .map_err(RuntimeError::from_graph)
    }

    /// Untracked cell read.
    #[must_use]
    pub fn cell_value(&self, cell: CellId) -> Option<Value> {
        self.graph.value(cell).cloned()
    }

    /// External cell write; arms the batch when the value changed.
    pub fn set_cell(&mut self, cell: CellId, value: Value) -> Result<bool, RuntimeError> {
        let changed = self
            .graph
            .set(cell, value)
            .map_err(RuntimeError::from_graph)?;
        if changed {
            self.scheduler.note_write();
        }
        Ok(changed)
    }

    // ── Events ──────────────────────────────────────────────────────────

    /// Register a listener; listeners for the same type fire in
    /// registration order.
    pub fn add_event_listener(
        &mut self,
        event_type: &str,
        listener: impl FnMut(&Event, &mut EventCtx) -> Result<(), String> + 'static,
    ) {
        self.events
            .register(event_type, Box::new(listener) as ListenerFn);
    }

    /// Fan an event out to matching listeners. A listener failure is
    /// reported (and its buffered writes dropped) but never stops dispatch.
    pub fn dispatch_event(&mut self, event: &Event) -> DispatchReport {
        let mut report = DispatchReport::default();
        let mut listeners = self.events.take();
        for (event_type, listener) in &mut listeners {
            if event_type != &event.event_type {
                continue;
            }
            let mut ctx = EventCtx::new();
            match listener(event, &mut ctx) {
                Ok(()) => {
                    report.delivered += 1;
                    for (key, value) in ctx.into_writes() {
                        self.set_state(&key, value);
                    }
                }
                Err(cause) => {
                    report.failed += 1;
                    self.listener_failures += 1;
                    warn!(
                        event_type = %event.event_type,
                        %cause,
                        "event listener failed; continuing dispatch"
                    );
                }
            }
        }
        self.events.restore(listeners);
        report
    }

    /// Registered listener count (diagnostic hook).
    #[must_use]
    pub fn listener_count(&self) -> usize {
        self.events.len()
    }

    // ── Router ──────────────────────────────────────────────────────────

    pub fn set_router(&mut self, router: Box<dyn Router>) {
        self.router = Some(router);
    }

    /// Forward a navigation to the installed router. Without one this is a
    /// logged no-op returning `false`.
    pub fn navigate(&mut self, path: &str) -> bool {
        match self.router.as_mut() {
            Some(router) => {
                router.navigate(path);
                true
            }
            None => {
                debug!(%path, "navigate ignored: no router installed");
                false
            }
        }
    }

    // ── The flush ───────────────────────────────────────────────────────

    /// Flush once: snapshot the dirty set, re-render each component in
    /// parent-before-child order (capped at `batch_size`, remainder
    /// deferred), reconcile, and apply patches.
    ///
    /// Re-entrant calls fail with [`RuntimeError::ReentrantUpdate`]. In
    /// development mode a flush that collected failures returns the first
    /// one as a hard error after the whole batch completed.
    pub fn update(&mut self) -> Result<FlushReport, RuntimeError> {
        let flush_seq = self.scheduler.begin_flush()?;
        if let Some(router) = self.router.as_mut() {
            router.tick();
        }
        let start = Instant::now();

        let mut candidates = self.scheduler.take_deferred();
        candidates.extend(self.graph.take_dirty_components());
        let registry = &self.components;
        let (work, overflow) = Scheduler::select(candidates, self.config.batch_size, |id| {
            registry
                .get(id)
                .map(|slot| (slot.depth, id.raw()))
                .unwrap_or((usize::MAX, id.raw()))
        });

        let mut report = FlushReport {
            flush_seq,
            deferred: overflow.len(),
            ..FlushReport::default()
        };
        self.scheduler.push_deferred(overflow);

        for id in work {
            if !self.components.get(id).map(|s| s.mounted).unwrap_or(false) {
                continue;
            }
            if !self.config.wasm_optimized {
                debug!(component = %id, flush_seq, "re-rendering");
            }
            match self.render_component(id) {
                Ok(patches) => {
                    report.rendered += 1;
                    report.patches_applied += patches;
                }
                Err(RuntimeError::RenderFailure { component, cause }) => {
                    self.render_failures += 1;
                    warn!(%component, %cause, "render failed; keeping last committed tree");
                    report
                        .failures
                        .push(RenderFailureReport { component, cause });
                }
                Err(other) => {
                    self.render_failures += 1;
                    warn!(component = %id, error = %other, "component update failed");
                    report.failures.push(RenderFailureReport {
                        component: id,
                        cause: other.to_string(),
                    });
                }
            }
        }

        report.render_time = start.elapsed();
        self.last_render_time = report.render_time;
        self.flushes += 1;
        debug!(
            flush_seq,
            rendered = report.rendered,
            patches = report.patches_applied,
            failures = report.failures.len(),
            "flush complete"
        );

        let pending = self.graph.has_dirty_components() || self.scheduler.has_deferred();
        self.scheduler.end_flush(pending);

        if self.config.development_mode
            && let Some(first) = report.failures.first()
        {
            return Err(RuntimeError::RenderFailure {
                component: first.component,
                cause: first.cause.clone(),
            });
        }
        Ok(report)
    }

    /// Re-render one component and reconcile. On success the committed tree
    /// is replaced; on any failure it is kept as-is.
    fn render_component(&mut self, id: ComponentId) -> Result<usize, RuntimeError> {
        let (kind, name, children) = {
            let slot = self.components.get(id)?;
            if !slot.mounted {
                return Err(RuntimeError::NotMounted(id));
            }
            (slot.kind.clone(), slot.name.clone(), slot.children.clone())
        };
        let render_fn = self.components.get_mut(id)?.render.take();

        let mut exec = Execution::new(SubscriberId::Component(id));
        let result = {
            let mut scope =
                RenderScope::new(&mut self.graph, &mut self.store, &mut exec, &children);
            match &render_fn {
                Some(render) => render(&mut scope),
                None => Ok(builtin_render(&kind, &name, &mut scope)),
            }
        };
        if let Some(render) = render_fn
            && let Ok(slot) = self.components.get_mut(id)
        {
            slot.render = Some(render);
        }

        let tree = match result {
            Ok(tree) => tree,
            // Dropping the execution discards its edges and buffered
            // writes; the previous subscriptions stay live.
            Err(cause) => {
                return Err(RuntimeError::RenderFailure {
                    component: id,
                    cause,
                });
            }
        };
        self.graph.commit(exec);

        let script = {
            let slot = self.components.get(id)?;
            match &slot.committed {
                Some(previous) => ripple_dom::diff(previous, &tree),
                // First render: pure insertion.
                None => vec![Patch::Replace {
                    path: NodePath::root(),
                    node: tree.clone(),
                }],
            }
        };
        let applied = script.len();
        if applied > 0 {
            self.target
                .apply(id, &script)
                .map_err(|cause| RuntimeError::Target {
                    component: id,
                    cause,
                })?;
            self.patches_total += applied as u64;
            self.journal.push(PatchBatch {
                component: id,
                patches: script,
            });
        }
        self.components.get_mut(id)?.committed = Some(tree);
        Ok(applied)
    }

    // ── Host adapters & metrics ─────────────────────────────────────────

    /// Drain the journal of applied patch scripts (for host mirrors).
    pub fn take_patches(&mut self) -> Vec<PatchBatch> {
        std::mem::take(&mut self.journal)
    }

    /// Current metrics snapshot.
    #[must_use]
    pub fn metrics(&self) -> Metrics {
        let memory_usage_bytes = if self.config.wasm_optimized {
            // Shallow estimate: fixed cost per entity.
            self.components.count() * 64
                + self.graph.cell_count() * 48
                + self.graph.computation_count() * 48
        } else {
            self.graph.size_bytes()
                + self.components.size_bytes()
                + self.store.size_bytes()
                + self.target.node_count() * std::mem::size_of::<Node>()
        };
        Metrics {
            render_time_ms: self.last_render_time.as_secs_f64() * 1000.0,
            component_count: self.components.count(),
            dom_node_count: self.target.node_count(),
            memory_usage_bytes,
            flushes: self.flushes,
            patches_applied: self.patches_total,
            render_failures: self.render_failures,
            listener_failures: self.listener_failures,
        }
    }

    /// Mounted component count.
    #[must_use]
    pub fn mounted_count(&self) -> usize {
        self.components.mounted_count()
    }

    /// Live node count in the target tree.
    #[must_use]
    pub fn dom_node_count(&self) -> usize {
        self.target.node_count()
    }
}

impl std::fmt::Debug for Runtime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Runtime")
            .field("components", &self.components.count())
            .field("phase", &self.scheduler.phase())
            .field("flushes", &self.flushes)
            .finish()
    }
}

/// Render for components created without a closure (see [`ComponentKind`]).
fn builtin_render(kind: &ComponentKind, name: &str, scope: &mut RenderScope<'_>) -> Node {
    match kind {
        ComponentKind::Text => Node::text(
            scope
                .get_state(name)
                .map(|value| value.to_text())
                .unwrap_or_default(),
        ),
        ComponentKind::Container => Node::element("container")
            .with_children(scope.child_nodes())
            .into(),
        ComponentKind::Custom(tag) => Node::element(tag.clone())
            .with_children(scope.child_nodes())
            .into(),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
