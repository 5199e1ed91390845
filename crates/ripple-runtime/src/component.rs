#![forbid(unsafe_code)]

//! Components: registry, built-in kinds, and the render scope.
//!
//! # Ownership
//!
//! The registry owns every component. Parent links are non-owning ids;
//! children are ordered id lists. Destroying a component destroys its
//! subtree and frees its owned cells; unmounting merely detaches (the
//! component can be mounted again).
//!
//! # Render scope
//!
//! Render functions receive a [`RenderScope`] wrapping the graph execution
//! for this pass. Reads through the scope become live dependencies; writes
//! are buffered and applied after a successful render, so a render that
//! fails changes nothing.

use ahash::AHashMap;

use ripple_dom::Node;
use ripple_reactive::{
    CellId, ComponentId, ComputationId, Execution, ReactiveGraph, Value,
};

use crate::error::RuntimeError;
use crate::store::StateStore;

/// Built-in and user-defined component kinds.
///
/// - `Text` renders the store key named after the component as a text leaf.
/// - `Container` renders a `container` element with one component-reference
///   child per mounted child.
/// - `Custom(tag)` renders like `Container` but with `tag` as the element
///   name; components created with a render closure use it instead.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ComponentKind {
    Text,
    Container,
    Custom(String),
}

impl From<&str> for ComponentKind {
    fn from(kind: &str) -> Self {
        match kind {
            "text" => ComponentKind::Text,
            "container" => ComponentKind::Container,
            other => ComponentKind::Custom(other.to_string()),
        }
    }
}

/// Render function: produces a fresh node tree from the current state.
/// Failure causes carry as strings into `RenderFailure`.
pub type RenderFn = Box<dyn Fn(&mut RenderScope<'_>) -> Result<Node, String>>;

pub(crate) struct ComponentSlot {
    pub(crate) name: String,
    pub(crate) kind: ComponentKind,
    pub(crate) parent: Option<ComponentId>,
    pub(crate) children: Vec<ComponentId>,
    pub(crate) owned_cells: Vec<CellId>,
    /// Depth within the mounted tree; 0 while unmounted, roots are 1.
    pub(crate) depth: usize,
    pub(crate) mounted: bool,
    /// Taken while the closure runs so the render can borrow the runtime.
    pub(crate) render: Option<RenderFn>,
    /// Last committed tree; replaced only on successful reconcile.
    pub(crate) committed: Option<Node>,
}

/// Arena-style owner of all components in one runtime.
#[derive(Default)]
pub(crate) struct ComponentRegistry {
    slots: AHashMap<ComponentId, ComponentSlot>,
    next: u64,
}

impl ComponentRegistry {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn create(
        &mut self,
        name: impl Into<String>,
        kind: ComponentKind,
        render: Option<RenderFn>,
    ) -> ComponentId {
        self.next += 1;
        let id = ComponentId::new(self.next);
        self.slots.insert(
            id,
            ComponentSlot {
                name: name.into(),
                kind,
                parent: None,
                children: Vec::new(),
                owned_cells: Vec::new(),
                depth: 0,
                mounted: false,
                render,
                committed: None,
            },
        );
        id
    }

    pub(crate) fn get(&self, id: ComponentId) -> Result<&ComponentSlot, RuntimeError> {
        self.slots.get(&id).ok_or(RuntimeError::UnknownComponent(id))
    }

    pub(crate) fn get_mut(&mut self, id: ComponentId) -> Result<&mut ComponentSlot, RuntimeError> {
        self.slots
            .get_mut(&id)
            .ok_or(RuntimeError::UnknownComponent(id))
    }

    pub(crate) fn count(&self) -> usize {
        self.slots.len()
    }

    pub(crate) fn mounted_count(&self) -> usize {
        self.slots.values().filter(|s| s.mounted).count()
    }

    /// Ids of the whole subtree rooted at `id`, parents before children.
    pub(crate) fn subtree(&self, id: ComponentId) -> Vec<ComponentId> {
        let mut acc = Vec::new();
        let mut stack = vec![id];
        while let Some(current) = stack.pop() {
            if let Some(slot) = self.slots.get(&current) {
                acc.push(current);
                stack.extend(slot.children.iter().rev());
            }
        }
        acc
    }

    /// Remove a slot outright, returning its owned cells for destruction.
    pub(crate) fn remove(&mut self, id: ComponentId) -> Option<Vec<CellId>> {
        self.slots.remove(&id).map(|slot| slot.owned_cells)
    }

    pub(crate) fn size_bytes(&self) -> usize {
        self.slots
            .values()
            .map(|slot| {
                slot.name.capacity()
                    + slot.children.len() * 8
                    + slot.owned_cells.len() * 8
                    + slot.committed.as_ref().map_or(0, Node::size_bytes)
            })
            .sum()
    }
}

/// Dependency-tracked view handed to render functions.
pub struct RenderScope<'a> {
    graph: &'a mut ReactiveGraph,
    store: &'a mut StateStore,
    exec: &'a mut Execution,
    children: &'a [ComponentId],
}

impl<'a> RenderScope<'a> {
    pub(crate) fn new(
        graph: &'a mut ReactiveGraph,
        store: &'a mut StateStore,
        exec: &'a mut Execution,
        children: &'a [ComponentId],
    ) -> Self {
        Self {
            graph,
            store,
            exec,
            children,
        }
    }

    /// Tracked store read: the rendering component becomes a subscriber of
    /// this key, even if the key does not exist yet.
    pub fn get_state(&mut self, key: &str) -> Option<Value> {
        self.store.read(self.graph, self.exec, key)
    }

    /// Buffered store write, applied after the render succeeds. Writing a
    /// key this render (transitively) reads is a `ReactiveCycle`.
    pub fn set_state(&mut self, key: &str, value: Value) -> Result<(), RuntimeError> {
        let cell = self.store.cell_or_declare(self.graph, key);
        self.graph
            .write(self.exec, cell, value)
            .map_err(RuntimeError::from_graph)
    }

    /// Tracked read of a plain cell.
    pub fn read(&mut self, cell: CellId) -> Result<Value, RuntimeError> {
        self.graph
            .read(self.exec, cell)
            .map_err(RuntimeError::from_graph)
    }

    /// Buffered, cycle-checked write to a plain cell.
    pub fn write(&mut self, cell: CellId, value: Value) -> Result<(), RuntimeError> {
        self.graph
            .write(self.exec, cell, value)
            .map_err(RuntimeError::from_graph)
    }

    /// Tracked read of a derived computation, evaluating it if stale.
    pub fn read_computation(&mut self, computation: ComputationId) -> Result<Value, RuntimeError> {
        self.graph
            .read_computation(self.exec, computation)
            .map_err(RuntimeError::from_graph)
    }

    /// Mounted children of the rendering component, in order.
    #[must_use]
    pub fn children(&self) -> &[ComponentId] {
        self.children
    }

    /// One component-reference node per mounted child, in order.
    #[must_use]
    pub fn child_nodes(&self) -> Vec<Node> {
        self.children.iter().map(|&id| Node::component(id)).collect()
    }
}
