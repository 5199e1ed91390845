#![forbid(unsafe_code)]

//! Ripple public facade crate.
//!
//! This crate provides the stable, ergonomic surface area for users:
//! the reactive kernel, the tree kernel, the runtime, and (with the `web`
//! feature) the host-boundary step runner.

pub use ripple_dom::{Element, Node, NodePath, OffscreenTree, Patch, PatchError, TargetTree};
pub use ripple_reactive::{
    CellId, ComponentId, ComputationId, GraphError, ReactiveGraph, Value,
};
pub use ripple_runtime::{
    ComponentKind, DispatchReport, Event, EventCtx, FlushReport, Metrics, PatchBatch,
    RenderScope, Router, Runtime, RuntimeConfig, RuntimeError, SchedulerPhase,
};
#[cfg(feature = "web")]
pub use ripple_web::{FlatPatchBatch, StepRunner, StepResult};

pub mod prelude {
    pub use ripple_dom as dom;
    pub use ripple_reactive as reactive;
    pub use ripple_runtime as runtime;
    #[cfg(feature = "web")]
    pub use ripple_web as web;
}
