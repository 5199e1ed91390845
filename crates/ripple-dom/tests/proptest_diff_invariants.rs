//! Property-based invariant tests for the diff engine.
//!
//! These hold for **any** pair of render trees:
//!
//! 1. Round-trip law: applying `diff(old, new)` to `old` yields `new`.
//! 2. Idempotence: `diff(t, t)` is empty.
//! 3. Determinism: the same input pair always yields the identical script.
//! 4. A pure keyed permutation of distinct keys emits only `Move` ops.

use proptest::prelude::*;
use ripple_dom::{Element, Node, Patch, apply_script, diff};

// ── Strategies ──────────────────────────────────────────────────────────

fn text_node() -> impl Strategy<Value = Node> {
    "[a-z]{0,6}".prop_map(Node::text)
}

fn leaf() -> impl Strategy<Value = Node> {
    prop_oneof![
        3 => text_node(),
        1 => (1u64..8).prop_map(|raw| Node::component(ripple_reactive::ComponentId::new(raw))),
    ]
}

/// Arbitrary tree of bounded depth and fan-out, with occasional keys.
fn tree() -> impl Strategy<Value = Node> {
    leaf().prop_recursive(3, 24, 4, |inner| {
        (
            prop_oneof![Just("div"), Just("span"), Just("ul")],
            proptest::option::of("[a-k]"),
            proptest::collection::btree_map("[a-d]", "[0-9]{1,2}", 0..3),
            proptest::collection::vec(inner, 0..4),
        )
            .prop_map(|(tag, key, attrs, children)| {
                let mut el = Element::new(tag).with_children(children);
                if let Some(k) = key {
                    el = el.with_key(k);
                }
                for (name, value) in attrs {
                    el = el.with_attr(name, value);
                }
                el.into()
            })
    })
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(256))]

    #[test]
    fn round_trip_law(old in tree(), new in tree()) {
        let script = diff(&old, &new);
        let mut state = Some(old.clone());
        apply_script(&mut state, &script).expect("diff output applies cleanly");
        prop_assert_eq!(state, Some(new), "script: {:?}", script);
    }

    #[test]
    fn identical_trees_diff_empty(t in tree()) {
        prop_assert!(diff(&t, &t).is_empty());
    }

    #[test]
    fn diff_is_deterministic(old in tree(), new in tree()) {
        prop_assert_eq!(diff(&old, &new), diff(&old, &new));
    }

    #[test]
    fn keyed_permutation_is_moves_only(
        (keys, order) in proptest::sample::subsequence((0u8..8).collect::<Vec<_>>(), 2..8)
            .prop_flat_map(|keys| {
                let n = keys.len();
                (Just(keys), Just((0..n).collect::<Vec<usize>>()).prop_shuffle())
            })
    ) {
        let child = |k: u8| Node::from(Element::new("li").with_key(format!("k{k}")));
        let old: Node = Element::new("ul")
            .with_children(keys.iter().map(|&k| child(k)))
            .into();
        let new: Node = Element::new("ul")
            .with_children(order.iter().map(|&i| child(keys[i])))
            .into();

        let script = diff(&old, &new);
        prop_assert!(
            script.iter().all(|p| matches!(p, Patch::Move { .. })),
            "pure permutation emitted non-moves: {:?}",
            script
        );

        let mut state = Some(old);
        apply_script(&mut state, &script).expect("script applies");
        prop_assert_eq!(state, Some(new));
    }
}
