#![forbid(unsafe_code)]

//! The global state store: string keys over ordinary graph cells.
//!
//! Store entries live in the runtime's reactive graph, so a `get_state` made
//! during a render subscribes the component like any tracked cell read. The
//! store itself only maps names to cell ids.

use ahash::AHashMap;

use ripple_reactive::{CellId, Execution, ReactiveGraph, Value};

use crate::error::RuntimeError;

#[derive(Debug, Default)]
pub(crate) struct StateStore {
    index: AHashMap<String, CellId>,
}

impl StateStore {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn cell(&self, key: &str) -> Option<CellId> {
        self.index.get(key).copied()
    }

    /// Cell backing `key`, declaring a `Null` cell on first use.
    ///
    /// Tracked reads of absent keys also declare, so a component that read a
    /// key before it was first set still re-renders when it appears.
    pub(crate) fn cell_or_declare(&mut self, graph: &mut ReactiveGraph, key: &str) -> CellId {
        if let Some(id) = self.index.get(key) {
            return *id;
        }
        let id = graph.declare_cell(Value::Null);
        self.index.insert(key.to_string(), id);
        id
    }

    /// Untracked write. Returns whether the stored value changed.
    pub(crate) fn set(&mut self, graph: &mut ReactiveGraph, key: &str, value: Value) -> bool {
        let cell = self.cell_or_declare(graph, key);
        // The cell was just ensured; a failure here means it raced a
        // destroy, which the single-threaded model rules out.
        graph.set(cell, value).unwrap_or(false)
    }

    /// Untracked read. A stored `Null` reads as absent, which keeps
    /// declare-on-read invisible to callers.
    pub(crate) fn get(&self, graph: &ReactiveGraph, key: &str) -> Option<Value> {
        let cell = self.cell(key)?;
        match graph.value(cell) {
            Some(Value::Null) | None => None,
            Some(value) => Some(value.clone()),
        }
    }

    /// Tracked read within an execution; declares absent keys (see
    /// [`cell_or_declare`](Self::cell_or_declare)).
    pub(crate) fn read(
        &mut self,
        graph: &mut ReactiveGraph,
        exec: &mut Execution,
        key: &str,
    ) -> Option<Value> {
        let cell = self.cell_or_declare(graph, key);
        match graph.read(exec, cell) {
            Ok(Value::Null) => None,
            Ok(value) => Some(value),
            Err(_) => None,
        }
    }

    /// Remove a key and destroy its backing cell.
    pub(crate) fn remove(
        &mut self,
        graph: &mut ReactiveGraph,
        key: &str,
    ) -> Result<(), RuntimeError> {
        let cell = self
            .index
            .remove(key)
            .ok_or_else(|| RuntimeError::UnknownStateKey(key.to_string()))?;
        graph.destroy_cell(cell);
        Ok(())
    }

    pub(crate) fn size_bytes(&self) -> usize {
        self.index.keys().map(|k| k.capacity() + 16).sum()
    }
}
