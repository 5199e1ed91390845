#![forbid(unsafe_code)]

//! Runtime configuration.

/// Options recognized at runtime creation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuntimeConfig {
    /// Stricter error surfacing: render failures collected during a flush
    /// are returned as a hard error from `update()` after the whole batch
    /// completes (siblings still render).
    pub development_mode: bool,
    /// Reduced-footprint code path: shallow memory estimates and no
    /// per-component debug logging in the flush loop.
    pub wasm_optimized: bool,
    /// Maximum component tree depth; mounting deeper fails with
    /// `DepthExceeded`.
    pub max_component_depth: usize,
    /// Maximum dirty components processed per flush; the remainder is
    /// deferred to the next flush.
    pub batch_size: usize,
    /// Theme name, forwarded to the styling subsystem; the core does not
    /// interpret it.
    pub theme: String,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            development_mode: false,
            wasm_optimized: false,
            max_component_depth: 256,
            batch_size: 100,
            theme: String::new(),
        }
    }
}

impl RuntimeConfig {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_development_mode(mut self, enabled: bool) -> Self {
        self.development_mode = enabled;
        self
    }

    #[must_use]
    pub fn with_wasm_optimized(mut self, enabled: bool) -> Self {
        self.wasm_optimized = enabled;
        self
    }

    /// Clamped to at least 1.
    #[must_use]
    pub fn with_max_component_depth(mut self, max: usize) -> Self {
        self.max_component_depth = max.max(1);
        self
    }

    /// Clamped to at least 1.
    #[must_use]
    pub fn with_batch_size(mut self, size: usize) -> Self {
        self.batch_size = size.max(1);
        self
    }

    #[must_use]
    pub fn with_theme(mut self, theme: impl Into<String>) -> Self {
        self.theme = theme.into();
        self
    }
}
