#![forbid(unsafe_code)]

//! End-to-end pipeline tests: state write → dirty marking → batched flush →
//! re-render → diff → target patching, through the public `Runtime` API only.

use pretty_assertions::assert_eq;

use ripple_runtime::{Event, Runtime, RuntimeConfig, RuntimeError, SchedulerPhase};

use ripple_dom::{Element, Node, NodePath, Patch};
use ripple_reactive::Value;

fn runtime() -> Runtime {
    Runtime::new(RuntimeConfig::default())
}

#[test]
fn counter_update_is_a_single_text_patch() {
    let mut rt = runtime();
    rt.set_state("count", Value::from(0i64));
    let counter = rt.create_component_with("counter", |scope| {
        let count = scope.get_state("count").unwrap_or_default();
        Ok(Node::text(format!("count: {}", count.to_text())))
    });
    rt.mount(counter, None).unwrap();
    assert_eq!(rt.committed_tree(counter), Some(&Node::text("count: 0")));
    let _ = rt.take_patches();

    rt.set_state("count", Value::from(1i64));
    let report = rt.update().unwrap();
    assert_eq!(report.rendered, 1);

    let batches = rt.take_patches();
    assert_eq!(batches.len(), 1);
    assert_eq!(
        batches[0].patches,
        vec![Patch::UpdateText {
            path: NodePath::root(),
            text: "count: 1".into(),
        }]
    );
    assert_eq!(rt.committed_tree(counter), Some(&Node::text("count: 1")));
}

#[test]
fn many_writes_one_flush_each_component_once() {
    let mut rt = runtime();
    for i in 0..10 {
        rt.set_state(&format!("field{i}"), Value::from(0i64));
    }
    // Three components over disjoint slices of the store.
    let header = rt.create_component_with("header", |scope| {
        let a = scope.get_state("field0").unwrap_or_default();
        let b = scope.get_state("field1").unwrap_or_default();
        Ok(Node::text(format!("{}/{}", a.to_text(), b.to_text())))
    });
    let body = rt.create_component_with("body", |scope| {
        let v = scope.get_state("field5").unwrap_or_default();
        Ok(Node::text(v.to_text()))
    });
    let footer = rt.create_component_with("footer", |scope| {
        let v = scope.get_state("field9").unwrap_or_default();
        Ok(Node::text(v.to_text()))
    });
    for id in [header, body, footer] {
        rt.mount(id, None).unwrap();
    }
    let _ = rt.take_patches();

    // Ten writes before the flush: one batch, each component once.
    for i in 0..10 {
        rt.set_state(&format!("field{i}"), Value::from(100 + i as i64));
    }
    assert_eq!(rt.phase(), SchedulerPhase::BatchOpen);
    let report = rt.update().unwrap();
    assert_eq!(report.rendered, 3);
    assert_eq!(report.failures.len(), 0);
    assert_eq!(rt.phase(), SchedulerPhase::Idle);

    let batches = rt.take_patches();
    let per_component: Vec<usize> = [header, body, footer]
        .iter()
        .map(|&id| batches.iter().filter(|b| b.component == id).count())
        .collect();
    assert_eq!(per_component, vec![1, 1, 1]);
}

#[test]
fn keyed_list_reorder_flows_through_as_moves() {
    let mut rt = runtime();
    rt.set_state(
        "order",
        Value::List(vec![
            Value::from("a"),
            Value::from("b"),
            Value::from("c"),
            Value::from("d"),
        ]),
    );
    let list = rt.create_component_with("list", |scope| {
        let order = scope.get_state("order").unwrap_or_default();
        let mut el = Element::new("ul");
        if let Some(items) = order.as_list() {
            for item in items {
                let label = item.to_text();
                el = el.with_child(
                    Element::new("li")
                        .with_key(label.clone())
                        .with_child(Node::text(label)),
                );
            }
        }
        Ok(el.into())
    });
    rt.mount(list, None).unwrap();
    let _ = rt.take_patches();

    // Rotate: abcd -> dabc. One keyed move, no churn.
    rt.set_state(
        "order",
        Value::List(vec![
            Value::from("d"),
            Value::from("a"),
            Value::from("b"),
            Value::from("c"),
        ]),
    );
    rt.update().unwrap();

    let batches = rt.take_patches();
    assert_eq!(batches.len(), 1);
    assert_eq!(
        batches[0].patches,
        vec![Patch::Move {
            parent: NodePath::root(),
            from: 3,
            to: 0,
        }]
    );
}

#[test]
fn computation_chain_re_renders_subscribers() {
    let mut rt = runtime();
    let base = rt.declare_cell(Value::from(2i64));
    let doubled = rt.declare_computation(Box::new(move |scope| {
        let v = scope.read(base)?;
        Ok(Value::Number(v.as_number().unwrap_or(0.0) * 2.0))
    }));

    let view = rt.create_component_with("view", move |scope| {
        let v = scope.read_computation(doubled).map_err(|e| e.to_string())?;
        Ok(Node::text(v.to_text()))
    });
    rt.mount(view, None).unwrap();
    assert_eq!(rt.committed_tree(view), Some(&Node::text("4")));

    rt.set_cell(base, Value::from(5i64)).unwrap();
    let report = rt.update().unwrap();
    assert_eq!(report.rendered, 1);
    assert_eq!(rt.committed_tree(view), Some(&Node::text("10")));
}

#[test]
fn event_dispatch_feeds_the_next_flush() {
    let mut rt = runtime();
    rt.set_state("clicks", Value::from(0i64));
    let label = rt.create_component_with("label", |scope| {
        let clicks = scope.get_state("clicks").unwrap_or_default();
        Ok(Node::text(format!("clicks={}", clicks.to_text())))
    });
    rt.mount(label, None).unwrap();

    rt.add_event_listener("click", |event, ctx| {
        ctx.set_state("clicks", event.payload.clone());
        Ok(())
    });
    let report = rt.dispatch_event(&Event::new("click", Value::from(3i64)));
    assert_eq!(report.delivered, 1);
    assert_eq!(rt.phase(), SchedulerPhase::BatchOpen);

    rt.update().unwrap();
    assert_eq!(rt.committed_tree(label), Some(&Node::text("clicks=3")));
}

#[test]
fn deep_mount_at_the_limit_succeeds_and_past_it_fails() {
    let mut rt = Runtime::new(RuntimeConfig::new().with_max_component_depth(256));
    let mut parent = None;
    for i in 0..256 {
        let id = rt.create_component(&format!("level{i}"), "container");
        rt.mount(id, parent).unwrap();
        parent = Some(id);
    }
    let too_deep = rt.create_component("level256", "container");
    assert_eq!(
        rt.mount(too_deep, parent).unwrap_err(),
        RuntimeError::DepthExceeded {
            depth: 257,
            max: 256
        }
    );
    assert_eq!(rt.mounted_count(), 256);
}

#[test]
fn failing_component_keeps_tree_while_the_app_moves_on() {
    let mut rt = runtime();
    rt.set_state("n", Value::from(1i64));
    let fragile = rt.create_component_with("fragile", |scope| {
        match scope.get_state("n").and_then(|v| v.as_number()) {
            Some(n) if n < 3.0 => Ok(Node::text(format!("n={n}"))),
            _ => Err("n out of range".to_string()),
        }
    });
    let robust = rt.create_component_with("robust", |scope| {
        let n = scope.get_state("n").unwrap_or_default();
        Ok(Node::text(n.to_text()))
    });
    rt.mount(fragile, None).unwrap();
    rt.mount(robust, None).unwrap();

    rt.set_state("n", Value::from(2i64));
    let clean = rt.update().unwrap();
    assert_eq!(clean.failures.len(), 0);

    rt.set_state("n", Value::from(5i64));
    let report = rt.update().unwrap();
    assert_eq!(report.failures.len(), 1);
    assert_eq!(report.failures[0].component, fragile);

    // Fragile froze at its last good render; robust kept going.
    assert_eq!(rt.committed_tree(fragile), Some(&Node::text("n=2")));
    assert_eq!(rt.committed_tree(robust), Some(&Node::text("5")));

    // Recovery: the failed component stays subscribed and heals on the
    // next valid state.
    rt.set_state("n", Value::from(1i64));
    let healed = rt.update().unwrap();
    assert_eq!(healed.failures.len(), 0);
    assert_eq!(rt.committed_tree(fragile), Some(&Node::text("n=1")));
}

#[test]
fn unmounted_subtree_is_inert_until_remounted() {
    let mut rt = runtime();
    rt.set_state("msg", Value::from("hi"));
    let panel = rt.create_component("panel", "container");
    let msg = rt.create_component("msg", "text");
    rt.mount(panel, None).unwrap();
    rt.mount(msg, Some(panel)).unwrap();
    rt.update().unwrap();

    rt.unmount(panel).unwrap();
    assert_eq!(rt.dom_node_count(), 0);

    // Writes while unmounted are invisible to the detached subtree.
    rt.set_state("msg", Value::from("changed"));
    let report = rt.update().unwrap();
    assert_eq!(report.rendered, 0);

    // Remount picks up the current state, children included.
    rt.mount(panel, None).unwrap();
    rt.update().unwrap();
    assert_eq!(rt.committed_tree(msg), Some(&Node::text("changed")));
    assert!(rt.dom_node_count() > 0);
}

#[test]
fn write_cycle_in_render_fails_that_component_only() {
    let mut rt = runtime();
    rt.set_state("x", Value::from(1i64));
    let cyclic = rt.create_component_with("cyclic", |scope| {
        let x = scope.get_state("x").unwrap_or_default();
        // Writing a key this render reads is rejected as a cycle.
        scope.set_state("x", x.clone()).map_err(|e| e.to_string())?;
        Ok(Node::text(x.to_text()))
    });
    let err = rt.mount(cyclic, None).unwrap_err();
    assert!(matches!(err, RuntimeError::RenderFailure { .. }));
    assert!(err.to_string().contains("reactive cycle"));

    // The store value is untouched.
    assert_eq!(rt.get_state("x"), Some(Value::Number(1.0)));
}

#[test]
fn reentrant_update_is_rejected_cleanly() {
    // The single-owner API makes true reentrancy unreachable from safe
    // code, so exercise the guard at the scheduler boundary: a second
    // update after a clean flush gets a fresh sequence number.
    let mut rt = runtime();
    let first = rt.update().unwrap();
    let second = rt.update().unwrap();
    assert_eq!(second.flush_seq, first.flush_seq + 1);
}
