#![forbid(unsafe_code)]

//! Patch operations and their structural application.
//!
//! A patch script is an ordered sequence; each operation's path and indices
//! are valid at its position in the script. [`apply_script`] is the
//! reference interpreter: applying `diff(old, new)` to `old` yields `new`
//! (the round-trip law the property tests enforce).

use std::fmt;

use crate::node::Node;
use crate::path::NodePath;

/// One structural change to a rendered tree.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case", tag = "op"))]
pub enum Patch {
    /// Replace the node at `path` with `node`. At the root path this also
    /// serves as the mount operation on an empty target.
    Replace { path: NodePath, node: Node },
    /// Change the payload of the text node at `path`.
    UpdateText { path: NodePath, text: String },
    /// Set (add or overwrite) one attribute of the element at `path`.
    SetAttr {
        path: NodePath,
        name: String,
        value: String,
    },
    /// Remove one attribute of the element at `path`.
    RemoveAttr { path: NodePath, name: String },
    /// Insert `node` as child `index` of the element at `parent`.
    Insert {
        parent: NodePath,
        index: u32,
        node: Node,
    },
    /// Remove child `index` of the element at `parent`.
    Remove { parent: NodePath, index: u32 },
    /// Remove child `from` of the element at `parent` and re-insert it at
    /// `to` (an index into the list *after* the removal).
    Move { parent: NodePath, from: u32, to: u32 },
}

impl Patch {
    /// Short operation name, for logs and flat host encodings.
    #[must_use]
    pub fn op_name(&self) -> &'static str {
        match self {
            Patch::Replace { .. } => "replace",
            Patch::UpdateText { .. } => "update_text",
            Patch::SetAttr { .. } => "set_attr",
            Patch::RemoveAttr { .. } => "remove_attr",
            Patch::Insert { .. } => "insert",
            Patch::Remove { .. } => "remove",
            Patch::Move { .. } => "move",
        }
    }
}

impl fmt::Display for Patch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Patch::Replace { path, node } => write!(f, "replace {path} with {node}"),
            Patch::UpdateText { path, text } => write!(f, "update_text {path} to {text:?}"),
            Patch::SetAttr { path, name, value } => {
                write!(f, "set_attr {path} {name}={value:?}")
            }
            Patch::RemoveAttr { path, name } => write!(f, "remove_attr {path} {name}"),
            Patch::Insert { parent, index, node } => {
                write!(f, "insert {node} at {parent}[{index}]")
            }
            Patch::Remove { parent, index } => write!(f, "remove {parent}[{index}]"),
            Patch::Move { parent, from, to } => write!(f, "move {parent}[{from}] -> [{to}]"),
        }
    }
}

/// Failures while applying a patch to a concrete tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PatchError {
    /// The path does not resolve to a node in the current tree.
    PathNotFound { path: NodePath },
    /// The operation requires an element but found a leaf.
    NotAnElement { path: NodePath },
    /// `UpdateText` addressed a non-text node.
    NotText { path: NodePath },
    /// A child index was outside the current child list.
    IndexOutOfBounds {
        parent: NodePath,
        index: u32,
        len: usize,
    },
    /// A non-root operation was applied to an empty target.
    EmptyTarget,
}

impl fmt::Display for PatchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PatchError::PathNotFound { path } => write!(f, "path {path} not found"),
            PatchError::NotAnElement { path } => write!(f, "node at {path} is not an element"),
            PatchError::NotText { path } => write!(f, "node at {path} is not a text node"),
            PatchError::IndexOutOfBounds { parent, index, len } => {
                write!(f, "index {index} out of bounds at {parent} (len {len})")
            }
            PatchError::EmptyTarget => f.write_str("non-root patch applied to an empty target"),
        }
    }
}

impl std::error::Error for PatchError {}

fn resolve_mut<'t>(root: &'t mut Node, path: &NodePath) -> Result<&'t mut Node, PatchError> {
    let mut current = root;
    for segment in path.segments() {
        let Node::Element(el) = current else {
            return Err(PatchError::NotAnElement { path: path.clone() });
        };
        current = el
            .children
            .get_mut(segment as usize)
            .ok_or_else(|| PatchError::PathNotFound { path: path.clone() })?;
    }
    Ok(current)
}

fn children_mut<'t>(
    root: &'t mut Node,
    parent: &NodePath,
) -> Result<&'t mut Vec<Node>, PatchError> {
    match resolve_mut(root, parent)? {
        Node::Element(el) => Ok(&mut el.children),
        _ => Err(PatchError::NotAnElement {
            path: parent.clone(),
        }),
    }
}

/// Apply one patch to `root`. `Replace` at the root path mounts onto an
/// empty target; every other operation requires a tree to be present.
pub fn apply(root: &mut Option<Node>, patch: &Patch) -> Result<(), PatchError> {
    if let Patch::Replace { path, node } = patch
        && path.is_root()
    {
        *root = Some(node.clone());
        return Ok(());
    }
    let tree = root.as_mut().ok_or(PatchError::EmptyTarget)?;
    match patch {
        Patch::Replace { path, node } => {
            let slot = resolve_mut(tree, path)?;
            *slot = node.clone();
        }
        Patch::UpdateText { path, text } => match resolve_mut(tree, path)? {
            Node::Text(payload) => *payload = text.clone(),
            _ => return Err(PatchError::NotText { path: path.clone() }),
        },
        Patch::SetAttr { path, name, value } => match resolve_mut(tree, path)? {
            Node::Element(el) => {
                el.attrs.insert(name.clone(), value.clone());
            }
            _ => return Err(PatchError::NotAnElement { path: path.clone() }),
        },
        Patch::RemoveAttr { path, name } => match resolve_mut(tree, path)? {
            Node::Element(el) => {
                el.attrs.remove(name);
            }
            _ => return Err(PatchError::NotAnElement { path: path.clone() }),
        },
        Patch::Insert { parent, index, node } => {
            let children = children_mut(tree, parent)?;
            let index = *index as usize;
            if index > children.len() {
                return Err(PatchError::IndexOutOfBounds {
                    parent: parent.clone(),
                    index: index as u32,
                    len: children.len(),
                });
            }
            children.insert(index, node.clone());
        }
        Patch::Remove { parent, index } => {
            let children = children_mut(tree, parent)?;
            let index = *index as usize;
            if index >= children.len() {
                return Err(PatchError::IndexOutOfBounds {
                    parent: parent.clone(),
                    index: index as u32,
                    len: children.len(),
                });
            }
            children.remove(index);
        }
        Patch::Move { parent, from, to } => {
            let children = children_mut(tree, parent)?;
            let from = *from as usize;
            if from >= children.len() {
                return Err(PatchError::IndexOutOfBounds {
                    parent: parent.clone(),
                    index: from as u32,
                    len: children.len(),
                });
            }
            let node = children.remove(from);
            let to = *to as usize;
            if to > children.len() {
                return Err(PatchError::IndexOutOfBounds {
                    parent: parent.clone(),
                    index: to as u32,
                    len: children.len(),
                });
            }
            children.insert(to, node);
        }
    }
    Ok(())
}

/// Apply a whole script in order. Stops at the first failure; callers that
/// need all-or-nothing semantics apply onto a clone and swap (see
/// `OffscreenTree`).
pub fn apply_script(root: &mut Option<Node>, script: &[Patch]) -> Result<(), PatchError> {
    for patch in script {
        apply(root, patch)?;
    }
    Ok(())
}
