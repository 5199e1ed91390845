#![forbid(unsafe_code)]

//! Reactive kernel: state cells, derived computations, and the dependency
//! graph that decides what must re-run when a cell changes.
//!
//! The graph never executes anything on its own. Callers open an
//! [`Execution`](graph::Execution) scope around a render or computation run;
//! reads performed through the scope become dependency edges, writes are
//! buffered, and only a successful commit replaces the subscriber's edge set
//! and applies its writes. A failed execution leaves the graph exactly as it
//! was.

pub mod graph;
pub mod id;
pub mod value;

pub use graph::{ComputeFn, ComputeScope, Execution, GraphError, ReactiveGraph};
pub use id::{CellId, ComponentId, ComputationId, SourceId, SubscriberId};
pub use value::Value;

// Tracing macros, no-ops when the `tracing` feature is off.
#[cfg(feature = "tracing")]
pub(crate) mod logging {
    pub(crate) use tracing::{debug, warn};
}

#[cfg(not(feature = "tracing"))]
pub(crate) mod logging {
    macro_rules! debug {
        ($($arg:tt)*) => {};
    }
    macro_rules! warn_ {
        ($($arg:tt)*) => {};
    }
    pub(crate) use debug;
    pub(crate) use warn_ as warn;
}
