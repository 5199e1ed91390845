#![forbid(unsafe_code)]

//! Target-tree adapters: the sink that patch scripts are applied to.
//!
//! The runtime talks to the live output tree only through [`TargetTree`].
//! [`OffscreenTree`] is the in-memory implementation used on the native host
//! and in tests; a browser DOM binding implements the same trait in a host
//! shim.

use ahash::AHashMap;

use ripple_reactive::ComponentId;

use crate::node::Node;
use crate::patch::{Patch, PatchError, apply_script};

/// The seam between the reconciler and a live output tree.
///
/// Scripts are addressed per component root: each mounted component owns one
/// root in the target.
pub trait TargetTree {
    /// Apply an ordered patch script under `component`'s root.
    ///
    /// Must be all-or-nothing: a failing script leaves the target unchanged.
    fn apply(&mut self, component: ComponentId, script: &[Patch]) -> Result<(), PatchError>;

    /// Drop `component`'s root (unmount).
    fn detach(&mut self, component: ComponentId);

    /// Total live node count across all roots, for metrics.
    fn node_count(&self) -> usize;
}

/// In-memory target tree.
#[derive(Debug, Default)]
pub struct OffscreenTree {
    roots: AHashMap<ComponentId, Option<Node>>,
}

impl OffscreenTree {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Current tree under a component root (test/diagnostic hook).
    #[must_use]
    pub fn root(&self, component: ComponentId) -> Option<&Node> {
        self.roots.get(&component).and_then(Option::as_ref)
    }

    #[must_use]
    pub fn root_count(&self) -> usize {
        self.roots.len()
    }

    /// Estimated heap footprint of all live trees.
    #[must_use]
    pub fn size_bytes(&self) -> usize {
        self.roots
            .values()
            .flatten()
            .map(Node::size_bytes)
            .sum()
    }
}

impl TargetTree for OffscreenTree {
    fn apply(&mut self, component: ComponentId, script: &[Patch]) -> Result<(), PatchError> {
        // Clone-and-swap keeps the live tree intact when a script fails.
        let mut staged = self.roots.get(&component).cloned().unwrap_or(None);
        apply_script(&mut staged, script)?;
        self.roots.insert(component, staged);
        Ok(())
    }

    fn detach(&mut self, component: ComponentId) {
        self.roots.remove(&component);
    }

    fn node_count(&self) -> usize {
        self.roots
            .values()
            .flatten()
            .map(Node::node_count)
            .sum()
    }
}
