#![forbid(unsafe_code)]

//! Tree kernel: immutable render-node snapshots, the diff engine that turns
//! two snapshots into a minimal ordered patch script, and target-tree
//! adapters that apply scripts to a live output tree.
//!
//! A render pass produces a [`Node`] tree. The reconciler ([`diff`]) compares
//! it to the previously committed tree and emits [`Patch`] operations whose
//! indices are valid at their position in the script, so applying the script
//! sequentially to the old tree reproduces the new tree exactly.

pub mod diff;
pub mod node;
pub mod path;
pub mod patch;
pub mod target;

pub use diff::{diff, diff_into};
pub use node::{Element, Node};
pub use patch::{Patch, PatchError, apply, apply_script};
pub use path::NodePath;
pub use target::{OffscreenTree, TargetTree};
