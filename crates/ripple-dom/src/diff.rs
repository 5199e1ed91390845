#![forbid(unsafe_code)]

//! The reconciler: diff two immutable render trees into a patch script.
//!
//! # Matching rules
//!
//! - Node kind or tag (or key) mismatch emits `Replace`; nothing below a
//!   replaced node is diffed.
//! - Same-tag elements diff attributes in sorted-key order, then children.
//! - Keyed children match by key across positions; a repeated key's nth new
//!   occurrence pairs with its nth old occurrence. Unkeyed children match
//!   positionally within the unkeyed subsequence (the i-th unkeyed new child
//!   pairs with the i-th unkeyed old child). Keyed and unkeyed children
//!   never cross-match.
//!
//! # Emission order
//!
//! Per element: attribute ops, then recursions into matched children
//! (addressed by old index), then removals in descending index order, then
//! moves, then insertions in ascending final index order. Moves relocate
//! only children outside a longest increasing subsequence of the survivors,
//! so a reorder costs the minimum number of `Move` ops; each move is planned
//! against a simulated working list, so every index in the script is valid
//! at its position. The result: applying the script sequentially to the old
//! tree reproduces the new tree.
//!
//! Output is deterministic: a fixed input pair always yields the identical
//! script.

use std::collections::VecDeque;

use ahash::AHashMap;

use crate::node::{Element, Node};
use crate::patch::Patch;
use crate::path::NodePath;

/// Diff `old` against `new`, returning the patch script.
#[must_use]
pub fn diff(old: &Node, new: &Node) -> Vec<Patch> {
    let mut out = Vec::new();
    diff_into(old, new, &mut out);
    out
}

/// Diff into a caller-provided buffer (reused across flushes).
pub fn diff_into(old: &Node, new: &Node, out: &mut Vec<Patch>) {
    diff_at(old, new, &NodePath::root(), out);
}

fn diff_at(old: &Node, new: &Node, path: &NodePath, out: &mut Vec<Patch>) {
    match (old, new) {
        (Node::Text(a), Node::Text(b)) => {
            if a != b {
                out.push(Patch::UpdateText {
                    path: path.clone(),
                    text: b.clone(),
                });
            }
        }
        (Node::Element(a), Node::Element(b)) if a.tag == b.tag && a.key == b.key => {
            diff_attrs(a, b, path, out);
            diff_children(&a.children, &b.children, path, out);
        }
        (Node::Component(a), Node::Component(b)) if a == b => {}
        _ => out.push(Patch::Replace {
            path: path.clone(),
            node: new.clone(),
        }),
    }
}

/// Sorted merge walk over both attribute maps; unchanged keys emit nothing.
fn diff_attrs(old: &Element, new: &Element, path: &NodePath, out: &mut Vec<Patch>) {
    let mut old_iter = old.attrs.iter().peekable();
    let mut new_iter = new.attrs.iter().peekable();
    loop {
        match (old_iter.peek(), new_iter.peek()) {
            (Some((ok, ov)), Some((nk, nv))) => {
                if ok < nk {
                    out.push(Patch::RemoveAttr {
                        path: path.clone(),
                        name: (*ok).clone(),
                    });
                    old_iter.next();
                } else if ok > nk {
                    out.push(Patch::SetAttr {
                        path: path.clone(),
                        name: (*nk).clone(),
                        value: (*nv).clone(),
                    });
                    new_iter.next();
                } else {
                    if ov != nv {
                        out.push(Patch::SetAttr {
                            path: path.clone(),
                            name: (*nk).clone(),
                            value: (*nv).clone(),
                        });
                    }
                    old_iter.next();
                    new_iter.next();
                }
            }
            (Some((ok, _)), None) => {
                out.push(Patch::RemoveAttr {
                    path: path.clone(),
                    name: (*ok).clone(),
                });
                old_iter.next();
            }
            (None, Some((nk, nv))) => {
                out.push(Patch::SetAttr {
                    path: path.clone(),
                    name: (*nk).clone(),
                    value: (*nv).clone(),
                });
                new_iter.next();
            }
            (None, None) => break,
        }
    }
}

fn diff_children(old: &[Node], new: &[Node], path: &NodePath, out: &mut Vec<Patch>) {
    // ── Matching ────────────────────────────────────────────────────────
    // Keyed old children bucketed per key in index order; a repeated key's
    // nth new occurrence pairs with its nth old occurrence, so duplicate
    // keys still diff as matched pairs and an unchanged list stays silent.
    let mut old_keyed: AHashMap<&str, VecDeque<usize>> = AHashMap::new();
    let mut old_unkeyed: Vec<usize> = Vec::new();
    for (i, child) in old.iter().enumerate() {
        match child.key() {
            Some(key) => old_keyed.entry(key).or_default().push_back(i),
            None => old_unkeyed.push(i),
        }
    }

    // matches[k] = (old index, new index), built in new order.
    let mut matches: Vec<(usize, usize)> = Vec::new();
    let mut inserted: Vec<usize> = Vec::new();
    let mut next_unkeyed = 0usize;
    for (j, child) in new.iter().enumerate() {
        let matched = match child.key() {
            Some(key) => old_keyed.get_mut(key).and_then(VecDeque::pop_front),
            None => {
                if next_unkeyed < old_unkeyed.len() {
                    let i = old_unkeyed[next_unkeyed];
                    next_unkeyed += 1;
                    Some(i)
                } else {
                    None
                }
            }
        };
        match matched {
            Some(i) => matches.push((i, j)),
            None => inserted.push(j),
        }
    }

    let mut matched_old: Vec<bool> = vec![false; old.len()];
    for &(i, _) in &matches {
        matched_old[i] = true;
    }

    // ── Recursions, addressed by old index ──────────────────────────────
    let mut by_old = matches.clone();
    by_old.sort_unstable_by_key(|&(i, _)| i);
    for &(i, j) in &by_old {
        diff_at(&old[i], &new[j], &path.child(i as u32), out);
    }

    // ── Removals, descending index ──────────────────────────────────────
    for i in (0..old.len()).rev() {
        if !matched_old[i] {
            out.push(Patch::Remove {
                parent: path.clone(),
                index: i as u32,
            });
        }
    }

    // ── Moves ───────────────────────────────────────────────────────────
    // Survivors sit in old relative order after the removals. Plan moves
    // against that working list; survivors on a longest increasing
    // subsequence of new indices stay put.
    let survivors_old_order: Vec<usize> = by_old.iter().map(|&(_, j)| j).collect();
    if survivors_old_order.len() > 1 {
        let keep = longest_increasing_subsequence(&survivors_old_order);
        let mut working = survivors_old_order.clone();
        let mut target = survivors_old_order.clone();
        target.sort_unstable();

        // Walk the target order back to front, anchoring each mover just
        // before the most recently settled element.
        let mut anchor: Option<usize> = None;
        for t in (0..target.len()).rev() {
            let j = target[t];
            if keep.contains(&j) {
                anchor = Some(j);
                continue;
            }
            let from = working
                .iter()
                .position(|&x| x == j)
                .unwrap_or_default();
            working.remove(from);
            let to = match anchor {
                Some(a) => working.iter().position(|&x| x == a).unwrap_or(working.len()),
                None => working.len(),
            };
            working.insert(to, j);
            if from != to {
                out.push(Patch::Move {
                    parent: path.clone(),
                    from: from as u32,
                    to: to as u32,
                });
            }
            anchor = Some(j);
        }
    }

    // ── Insertions, ascending final index ───────────────────────────────
    for &j in &inserted {
        out.push(Patch::Insert {
            parent: path.clone(),
            index: j as u32,
            node: new[j].clone(),
        });
    }
}

/// Values (not indices) of one longest strictly increasing subsequence of
/// `seq`. Patience algorithm with predecessor links; ties resolve to the
/// leftmost pile, so the choice is deterministic.
fn longest_increasing_subsequence(seq: &[usize]) -> Vec<usize> {
    if seq.is_empty() {
        return Vec::new();
    }
    // tails[k] = index into seq of the smallest tail of an increasing
    // subsequence of length k+1.
    let mut tails: Vec<usize> = Vec::new();
    let mut prev: Vec<Option<usize>> = vec![None; seq.len()];
    for (i, &v) in seq.iter().enumerate() {
        let pos = tails.partition_point(|&t| seq[t] < v);
        if pos > 0 {
            prev[i] = Some(tails[pos - 1]);
        }
        if pos == tails.len() {
            tails.push(i);
        } else {
            tails[pos] = i;
        }
    }
    let mut lis = Vec::with_capacity(tails.len());
    let mut cursor = tails.last().copied();
    while let Some(i) = cursor {
        lis.push(seq[i]);
        cursor = prev[i];
    }
    lis.reverse();
    lis
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
