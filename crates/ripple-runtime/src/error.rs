#![forbid(unsafe_code)]

//! Runtime-level error taxonomy.
//!
//! Errors from one component's render or reconcile never corrupt sibling
//! subtrees or the failing component's committed tree; runtime-level errors
//! abort only the operation that raised them.

use std::fmt;

use ripple_dom::PatchError;
use ripple_reactive::{ComponentId, GraphError};

/// Errors surfaced by [`Runtime`](crate::Runtime) operations.
#[derive(Debug, Clone, PartialEq)]
pub enum RuntimeError {
    /// An execution read and wrote the same cell (directly or through a
    /// computation). The offending write was rejected; prior state is
    /// retained.
    ReactiveCycle { cause: GraphError },
    /// `update()` was called while a flush was already in progress.
    ReentrantUpdate,
    /// A component's render function failed. Its last committed tree is
    /// kept; sibling updates proceed.
    RenderFailure { component: ComponentId, cause: String },
    /// Mounting would exceed the configured component depth limit.
    DepthExceeded { depth: usize, max: usize },
    /// The component id is not registered in this runtime.
    UnknownComponent(ComponentId),
    /// The component exists but is not mounted (or its parent is not).
    NotMounted(ComponentId),
    /// A store operation addressed a key that does not exist.
    UnknownStateKey(String),
    /// The target tree rejected a patch script.
    Target { component: ComponentId, cause: PatchError },
}

impl RuntimeError {
    /// Lift a graph error, folding both cycle variants into `ReactiveCycle`.
    #[must_use]
    pub fn from_graph(err: GraphError) -> Self {
        RuntimeError::ReactiveCycle { cause: err }
    }
}

impl fmt::Display for RuntimeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RuntimeError::ReactiveCycle { cause } => write!(f, "reactive cycle: {cause}"),
            RuntimeError::ReentrantUpdate => {
                f.write_str("update() called while a flush is in progress")
            }
            RuntimeError::RenderFailure { component, cause } => {
                write!(f, "render of {component} failed: {cause}")
            }
            RuntimeError::DepthExceeded { depth, max } => {
                write!(f, "component depth {depth} exceeds configured maximum {max}")
            }
            RuntimeError::UnknownComponent(id) => write!(f, "unknown component {id}"),
            RuntimeError::NotMounted(id) => write!(f, "component {id} is not mounted"),
            RuntimeError::UnknownStateKey(key) => write!(f, "unknown state key {key:?}"),
            RuntimeError::Target { component, cause } => {
                write!(f, "target rejected patch script for {component}: {cause}")
            }
        }
    }
}

impl std::error::Error for RuntimeError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            RuntimeError::ReactiveCycle { cause } => Some(cause),
            RuntimeError::Target { cause, .. } => Some(cause),
            _ => None,
        }
    }
}

impl From<GraphError> for RuntimeError {
    fn from(err: GraphError) -> Self {
        RuntimeError::from_graph(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ripple_reactive::CellId;

    #[test]
    fn graph_cycles_fold_into_reactive_cycle() {
        let err: RuntimeError = GraphError::WriteCycle {
            cell: CellId::new(1),
        }
        .into();
        assert!(matches!(err, RuntimeError::ReactiveCycle { .. }));
        assert!(err.to_string().contains("reactive cycle"));
    }

    #[test]
    fn source_is_wired() {
        use std::error::Error;
        let err = RuntimeError::Target {
            component: ComponentId::new(2),
            cause: PatchError::EmptyTarget,
        };
        assert!(err.source().is_some());
    }
}
