#![forbid(unsafe_code)]

//! Runtime layer: components, the state store, the flush scheduler, events,
//! and the [`Runtime`] facade that ties them to the reactive kernel and the
//! tree kernel.
//!
//! Each [`Runtime`] is a self-contained instance: its own graph, its own
//! store, its own target tree. Nothing is global, so runtimes embed cleanly
//! side by side (several islands on one page, or one per test).

pub mod component;
pub mod config;
pub mod error;
pub mod events;
pub mod metrics;
pub mod runtime;
pub mod scheduler;
pub mod store;

pub use component::{ComponentKind, RenderFn, RenderScope};
pub use config::RuntimeConfig;
pub use error::RuntimeError;
pub use events::{DispatchReport, Event, EventCtx, ListenerFn};
pub use metrics::Metrics;
pub use runtime::{PatchBatch, Router, Runtime};
pub use scheduler::{FlushReport, RenderFailureReport, SchedulerPhase};
