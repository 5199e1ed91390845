#![forbid(unsafe_code)]

//! Property tests for the flush loop: convergence, write coalescing, and
//! the redundant-write short-circuit, under arbitrary write sequences.

use proptest::prelude::*;

use ripple_dom::Node;
use ripple_reactive::{ComponentId, Value};
use ripple_runtime::{Runtime, RuntimeConfig, SchedulerPhase};

const KEYS: usize = 3;

fn key(i: usize) -> String {
    format!("key{i}")
}

/// Runtime with one text component per key, each rendering that key's value.
fn keyed_runtime(config: RuntimeConfig) -> (Runtime, Vec<ComponentId>) {
    let mut rt = Runtime::new(config);
    let mut ids = Vec::new();
    for i in 0..KEYS {
        rt.set_state(&key(i), Value::from(0i64));
        let id = rt.create_component_with(&format!("view{i}"), move |scope| {
            let v = scope.get_state(&key(i)).unwrap_or_default();
            Ok(Node::text(v.to_text()))
        });
        rt.mount(id, None).expect("mount");
        ids.push(id);
    }
    (rt, ids)
}

/// Flush until idle; panics if the loop fails to converge.
fn settle(rt: &mut Runtime) -> usize {
    let mut total_rendered = 0;
    for _ in 0..64 {
        if rt.phase() == SchedulerPhase::Idle {
            return total_rendered;
        }
        let report = rt.update().expect("flush");
        total_rendered += report.rendered;
    }
    panic!("flush loop did not converge");
}

fn writes() -> impl Strategy<Value = Vec<(usize, i64)>> {
    proptest::collection::vec((0..KEYS, -5i64..5), 0..32)
}

proptest! {
    /// After any write sequence settles, each component shows the last
    /// value written to its key.
    #[test]
    fn settled_trees_match_final_state(writes in writes()) {
        let (mut rt, ids) = keyed_runtime(RuntimeConfig::default());
        let mut expected = [0i64; KEYS];
        for (i, v) in &writes {
            rt.set_state(&key(*i), Value::from(*v));
            expected[*i] = *v;
        }
        settle(&mut rt);
        for (i, id) in ids.iter().enumerate() {
            prop_assert_eq!(
                rt.committed_tree(*id),
                Some(&Node::text(expected[i].to_string()))
            );
        }
    }

    /// Writes coalesce: one settle pass renders each component at most once
    /// per flush, and under the default batch size at most once in total.
    #[test]
    fn coalesced_writes_render_each_component_once(writes in writes()) {
        let (mut rt, _ids) = keyed_runtime(RuntimeConfig::default());
        for (i, v) in &writes {
            rt.set_state(&key(*i), Value::from(*v));
        }
        let rendered = settle(&mut rt);
        prop_assert!(rendered <= KEYS, "rendered {rendered} > {KEYS}");
    }

    /// Re-writing the settled values is inert: the batch never opens.
    #[test]
    fn rewriting_settled_values_is_inert(writes in writes()) {
        let (mut rt, _ids) = keyed_runtime(RuntimeConfig::default());
        let mut finals = [0i64; KEYS];
        for (i, v) in &writes {
            rt.set_state(&key(*i), Value::from(*v));
            finals[*i] = *v;
        }
        settle(&mut rt);

        for (i, v) in finals.iter().enumerate() {
            rt.set_state(&key(i), Value::from(*v));
        }
        prop_assert_eq!(rt.phase(), SchedulerPhase::Idle);
    }

    /// A batch cap of one still converges, one component per flush.
    #[test]
    fn unit_batch_cap_converges(writes in writes()) {
        let (mut rt, _ids) = keyed_runtime(RuntimeConfig::new().with_batch_size(1));
        let mut touched = [false; KEYS];
        for (i, v) in &writes {
            let changed = rt.get_state(&key(*i)) != Some(Value::from(*v));
            rt.set_state(&key(*i), Value::from(*v));
            if changed {
                touched[*i] = true;
            }
        }
        let rendered = settle(&mut rt);
        // No writes land during the settle loop, so the backlog drains one
        // component per flush and every dirtied component renders once.
        let dirtied = touched.iter().filter(|&&t| t).count();
        prop_assert_eq!(rendered, dirtied);
        prop_assert_eq!(rt.phase(), SchedulerPhase::Idle);
    }
}
