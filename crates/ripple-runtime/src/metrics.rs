#![forbid(unsafe_code)]

//! Runtime metrics snapshot.

/// Point-in-time metrics, assembled by `Runtime::metrics()`.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct Metrics {
    /// Wall time of the most recent flush, in milliseconds.
    pub render_time_ms: f64,
    /// Registered components (mounted or not).
    pub component_count: usize,
    /// Live nodes in the target tree across all roots.
    pub dom_node_count: usize,
    /// Estimated heap usage of graph, components, store, and target trees.
    /// A shallow estimate under `wasm_optimized`.
    pub memory_usage_bytes: usize,
    /// Total flushes since runtime creation.
    pub flushes: u64,
    /// Total patch operations applied since runtime creation.
    pub patches_applied: u64,
    /// Render failures observed (components kept their last good tree).
    pub render_failures: u64,
    /// Event listener failures observed (dispatch continued).
    pub listener_failures: u64,
}
