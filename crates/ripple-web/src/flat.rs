#![forbid(unsafe_code)]

//! Flat patch batches: a JSON-friendly encoding of applied patch scripts for
//! a host mirror, plus an `fnv1a64:`-prefixed content hash so hosts can
//! verify replay determinism without decoding anything.
//!
//! Layout follows the span convention: `spans[i]` is the row index where
//! component `components[i]`'s script starts; rows are in application order.

use ripple_dom::Patch;
use ripple_runtime::PatchBatch;

/// One patch flattened to scalar fields. Optional fields are present only
/// for the operations that use them.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct FlatPatchRow {
    /// Operation name (`replace`, `update_text`, `set_attr`, `remove_attr`,
    /// `insert`, `remove`, `move`).
    pub op: &'static str,
    /// Slash-joined node path (the parent path for child operations).
    pub path: String,
    /// Attribute name (`set_attr`, `remove_attr`).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Text payload: new text, attribute value, or the JSON of an inserted
    /// or replacing node.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    /// Child index (`insert`, `remove`) or source index (`move`).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub index: Option<u32>,
    /// Move target index.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub to: Option<u32>,
}

/// A drained journal, flattened.
#[derive(Debug, Clone, Default, PartialEq, serde::Serialize)]
pub struct FlatPatchBatch {
    /// Row index where each component's span starts; parallel to
    /// `components`.
    pub spans: Vec<u32>,
    /// Component ids (raw), one per span.
    pub components: Vec<u64>,
    pub rows: Vec<FlatPatchRow>,
}

impl FlatPatchBatch {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    #[must_use]
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }
}

fn flat_row(patch: &Patch) -> FlatPatchRow {
    let mut row = FlatPatchRow {
        op: patch.op_name(),
        path: String::new(),
        name: None,
        text: None,
        index: None,
        to: None,
    };
    match patch {
        Patch::Replace { path, node } => {
            row.path = path.to_string();
            row.text = serde_json::to_string(node).ok();
        }
        Patch::UpdateText { path, text } => {
            row.path = path.to_string();
            row.text = Some(text.clone());
        }
        Patch::SetAttr { path, name, value } => {
            row.path = path.to_string();
            row.name = Some(name.clone());
            row.text = Some(value.clone());
        }
        Patch::RemoveAttr { path, name } => {
            row.path = path.to_string();
            row.name = Some(name.clone());
        }
        Patch::Insert { parent, index, node } => {
            row.path = parent.to_string();
            row.index = Some(*index);
            row.text = serde_json::to_string(node).ok();
        }
        Patch::Remove { parent, index } => {
            row.path = parent.to_string();
            row.index = Some(*index);
        }
        Patch::Move { parent, from, to } => {
            row.path = parent.to_string();
            row.index = Some(*from);
            row.to = Some(*to);
        }
    }
    row
}

/// Flatten drained patch batches in application order.
#[must_use]
pub fn flatten(batches: &[PatchBatch]) -> FlatPatchBatch {
    let mut flat = FlatPatchBatch::default();
    for batch in batches {
        flat.spans.push(flat.rows.len() as u32);
        flat.components.push(batch.component.raw());
        flat.rows.extend(batch.patches.iter().map(flat_row));
    }
    flat
}

/// `fnv1a64:`-prefixed content hash of a flat batch.
#[must_use]
pub fn hash(flat: &FlatPatchBatch) -> String {
    let mut h = FNV_OFFSET_BASIS;
    for (span, component) in flat.spans.iter().zip(&flat.components) {
        h = fnv1a64_u32(h, *span);
        h = fnv1a64_bytes(h, &component.to_le_bytes());
    }
    for row in &flat.rows {
        h = fnv1a64_str(h, row.op);
        h = fnv1a64_str(h, &row.path);
        h = fnv1a64_opt_str(h, row.name.as_deref());
        h = fnv1a64_opt_str(h, row.text.as_deref());
        h = fnv1a64_u32(h, row.index.unwrap_or(u32::MAX));
        h = fnv1a64_u32(h, row.to.unwrap_or(u32::MAX));
    }
    format!("fnv1a64:{h:016x}")
}

const FNV_OFFSET_BASIS: u64 = 0xcbf29ce484222325;
const FNV_PRIME: u64 = 0x100000001b3;

fn fnv1a64_bytes(mut hash: u64, bytes: &[u8]) -> u64 {
    for &b in bytes {
        hash ^= b as u64;
        hash = hash.wrapping_mul(FNV_PRIME);
    }
    hash
}

fn fnv1a64_u32(hash: u64, v: u32) -> u64 {
    fnv1a64_bytes(hash, &v.to_le_bytes())
}

/// Length-prefixed so `("ab","c")` and `("a","bc")` hash differently.
fn fnv1a64_str(hash: u64, s: &str) -> u64 {
    let hash = fnv1a64_u32(hash, s.len() as u32);
    fnv1a64_bytes(hash, s.as_bytes())
}

fn fnv1a64_opt_str(hash: u64, s: Option<&str>) -> u64 {
    match s {
        Some(s) => fnv1a64_str(fnv1a64_bytes(hash, &[1]), s),
        None => fnv1a64_bytes(hash, &[0]),
    }
}
