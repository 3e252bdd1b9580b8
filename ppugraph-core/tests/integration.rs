//! Integration Tests for the Unit Protocol
//!
//! These tests build small post-processing pipelines and verify that
//! traversal, input resolution, viewport derivation and binding work
//! together correctly.

use std::sync::{Arc, Mutex};

use ppugraph_core::graph::{Processor, SceneGraph, VisitorKind};
use ppugraph_core::render::{PixelFormat, Texture, TextureTarget, UniformValue, Viewport};
use ppugraph_core::unit::UnitEvent;
use ppugraph_core::{GraphSettings, NodeId, UnitConfig, UnitError};

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .with_test_writer()
        .try_init();
}

fn screen() -> Processor {
    Processor::new(Viewport::new(0, 0, 800, 600))
}

/// Record every event a unit emits.
fn record(graph: &mut SceneGraph, id: NodeId) -> Arc<Mutex<Vec<UnitEvent>>> {
    let events = Arc::new(Mutex::new(Vec::new()));
    let sink = events.clone();
    graph
        .unit_mut(id)
        .unwrap()
        .subscribe(move |e| sink.lock().unwrap().push(*e));
    events
}

/// Build processor -> {a, b} -> c.
fn diamond() -> (SceneGraph, NodeId, [NodeId; 3]) {
    let mut graph = SceneGraph::new();
    let proc = graph.add_processor("processor", screen());
    let a = graph.add_unit("a");
    let b = graph.add_unit("b");
    let c = graph.add_unit("c");
    graph.add_child(proc, a).unwrap();
    graph.add_child(proc, b).unwrap();
    graph.add_child(a, c).unwrap();
    graph.add_child(b, c).unwrap();
    (graph, proc, [a, b, c])
}

/// Test that a unit reachable through two parents runs once per pass.
#[test]
fn shared_unit_runs_once_per_pass() {
    init_tracing();
    let (mut graph, proc, [_, _, c]) = diamond();

    for pass in 1..=3 {
        graph.invalidate_all();
        let report = graph.run_pass(proc, VisitorKind::Update);

        assert!(report.failed.is_empty(), "{:?}", report.failed);
        assert_eq!(report.visited.iter().filter(|&&id| id == c).count(), 1);
        assert_eq!(graph.unit(c).unwrap().revision(), pass);
    }
}

/// Test that a second pass without mutation changes nothing.
#[test]
fn second_pass_without_changes_is_a_no_op() {
    init_tracing();
    let (mut graph, proc, [a, b, c]) = diamond();
    let events = record(&mut graph, c);

    graph.run_pass(proc, VisitorKind::Update);
    let first_events = events.lock().unwrap().clone();
    let first_inputs: Vec<Texture> = graph
        .unit(c)
        .unwrap()
        .inputs()
        .map(|(_, t)| t.clone())
        .collect();
    assert!(first_events.contains(&UnitEvent::InputChanged));

    graph.run_pass(proc, VisitorKind::Update);
    assert_eq!(*events.lock().unwrap(), first_events);
    for id in [a, b, c] {
        assert_eq!(graph.unit(id).unwrap().revision(), 1);
    }
    let second_inputs: Vec<Texture> = graph
        .unit(c)
        .unwrap()
        .inputs()
        .map(|(_, t)| t.clone())
        .collect();
    assert_eq!(first_inputs, second_inputs);
}

/// Test that slots follow parent order and stay put across resolutions.
#[test]
fn slot_assignment_is_deterministic() {
    let (mut graph, proc, [a, b, c]) = diamond();

    for _ in 0..3 {
        graph.invalidate_all();
        graph.run_pass(proc, VisitorKind::Update);

        let a_out = graph.unit(a).unwrap().output_texture(0).cloned();
        let b_out = graph.unit(b).unwrap().output_texture(0).cloned();
        let unit = graph.unit(c).unwrap();
        assert_eq!(unit.input_texture(0).cloned(), a_out);
        assert_eq!(unit.input_texture(1).cloned(), b_out);
        assert_eq!(unit.input_count(), 2);
    }
}

/// Test that ignoring a position removes exactly that input.
#[test]
fn ignore_list_skips_and_restores_position() {
    let mut graph = SceneGraph::new();
    let proc = graph.add_processor("processor", screen());
    let parents: Vec<NodeId> = ["p0", "p1", "p2"]
        .into_iter()
        .map(|name| {
            let id = graph.add_unit(name);
            graph.add_child(proc, id).unwrap();
            id
        })
        .collect();
    let sink = graph.add_unit("sink");
    for &p in &parents {
        graph.add_child(p, sink).unwrap();
    }

    graph.unit_mut(sink).unwrap().set_ignore_input(1, true);
    graph.update_unit(sink).unwrap();

    let outputs: Vec<_> = parents
        .iter()
        .map(|&p| graph.unit(p).unwrap().output_texture(0).cloned())
        .collect();
    let unit = graph.unit(sink).unwrap();
    assert_eq!(unit.input_count(), 2);
    assert_eq!(unit.input_texture(0).cloned(), outputs[0]);
    assert_eq!(unit.input_texture(1).cloned(), outputs[2]);

    graph.unit_mut(sink).unwrap().set_ignore_input(1, false);
    graph.update_unit(sink).unwrap();

    let outputs: Vec<_> = parents
        .iter()
        .map(|&p| graph.unit(p).unwrap().output_texture(0).cloned())
        .collect();
    let unit = graph.unit(sink).unwrap();
    assert_eq!(unit.input_count(), 3);
    for (slot, out) in outputs.iter().enumerate() {
        assert_eq!(unit.input_texture(slot).cloned(), *out);
    }
    assert_eq!(unit.render_state().bound_slots().count(), 3);
}

/// Test that the viewport takes the reference input's size and keeps the
/// explicit offsets, also after the upstream buffer changes size.
#[test]
fn viewport_follows_reference_input() {
    init_tracing();
    let mut graph = SceneGraph::new();
    let proc = graph.add_processor("processor", screen());
    let upstream = graph.add_unit("upstream");
    let unit = graph.add_unit("unit");
    graph.add_child(proc, upstream).unwrap();
    graph.add_child(upstream, unit).unwrap();
    graph
        .unit_mut(unit)
        .unwrap()
        .set_viewport(Viewport::new(5, 7, 1, 1));
    let events = record(&mut graph, unit);

    graph.update_unit(unit).unwrap();
    assert_eq!(graph.unit(unit).unwrap().viewport(), Some(Viewport::new(5, 7, 800, 600)));
    assert!(events
        .lock()
        .unwrap()
        .contains(&UnitEvent::ViewportChanged(Viewport::new(5, 7, 800, 600))));

    graph
        .unit_mut(upstream)
        .unwrap()
        .set_viewport(Viewport::new(0, 0, 320, 240));
    graph.invalidate(unit).unwrap();
    graph.update_unit(unit).unwrap();

    let u = graph.unit(unit).unwrap();
    assert_eq!(u.viewport(), Some(Viewport::new(5, 7, 320, 240)));
    assert_eq!(u.render_state().viewport(), u.viewport());
    assert_eq!(
        u.render_state().uniform(ppugraph_core::unit::VIEWPORT_WIDTH_UNIFORM),
        Some(UniformValue::Float(320.0))
    );
}

/// Test that without a reference input the processor's viewport is used.
#[test]
fn viewport_falls_back_to_processor() {
    let mut graph = SceneGraph::new();
    let proc = graph.add_processor("processor", screen());
    let upstream = graph.add_unit("upstream");
    let unit = graph.add_unit("unit");
    graph.add_child(proc, upstream).unwrap();
    graph.add_child(upstream, unit).unwrap();
    graph
        .unit_mut(unit)
        .unwrap()
        .set_viewport_reference_input(None);

    let report = graph.run_pass(proc, VisitorKind::Update);
    assert!(report.failed.is_empty());
    assert_eq!(graph.unit(unit).unwrap().viewport(), Some(Viewport::new(0, 0, 800, 600)));
}

/// Test that a bridge feeds one extra slot into the blocked unit.
#[test]
fn bridge_adds_slot_to_blocked_unit() {
    let mut graph = SceneGraph::new();
    let proc = graph.add_processor(
        "processor",
        Processor::with_color_buffer(
            Viewport::new(0, 0, 800, 600),
            Texture::new(800, 600, PixelFormat::Rgba8),
        ),
    );
    let p = graph.add_unit("p");
    let q = graph.add_unit("q");
    graph.add_child(proc, p).unwrap();
    graph.add_child(proc, q).unwrap();
    let bridge = graph.add_barrier("bridge", q);
    graph.add_child(p, bridge).unwrap();

    graph.update_unit(q).unwrap();
    assert_eq!(graph.unit(q).unwrap().input_count(), 1);

    graph.update_unit(p).unwrap();
    let p_out = graph.unit(p).unwrap().output_texture(0).cloned();
    let q_unit = graph.unit(q).unwrap();
    assert!(q_unit.is_dirty());
    assert_eq!(q_unit.input_texture(1).cloned(), p_out);

    graph.update_unit(q).unwrap();
    let q_unit = graph.unit(q).unwrap();
    assert_eq!(q_unit.input_count(), 2);
    assert_eq!(q_unit.input_texture(1).cloned(), p_out);
    assert_eq!(
        q_unit.input_texture(0).cloned(),
        graph.processor(proc).unwrap().color_buffer().cloned()
    );
}

/// Test that cycles fail fast instead of recursing forever.
#[test]
fn cycle_is_detected() {
    init_tracing();
    let mut graph = SceneGraph::new();
    let proc = graph.add_processor("processor", screen());
    let a = graph.add_unit("a");
    let b = graph.add_unit("b");
    graph.add_child(proc, a).unwrap();
    graph.add_child(a, b).unwrap();
    graph.add_child(b, a).unwrap();

    assert_eq!(
        graph.update_unit(b).unwrap_err(),
        UnitError::CycleDetected { unit: "b".into() }
    );
    assert!(graph.validate_acyclic().is_err());

    let report = graph.run_pass(proc, VisitorKind::Update);
    assert!(!report.failed.is_empty());
    assert!(report.failed.iter().all(|(_, e)| e.is_structural()));
}

/// Test that sampler uniforms carry the parent edge index, not the slot.
#[test]
fn sampler_uniform_uses_parent_edge_index() {
    let mut graph = SceneGraph::new();
    let proc = graph.add_processor("processor", screen());
    let first = graph.add_unit("first");
    let second = graph.add_unit("second");
    let unit = graph.add_unit("unit");
    for p in [first, second] {
        graph.add_child(proc, p).unwrap();
        graph.add_child(p, unit).unwrap();
    }
    graph.unit_mut(unit).unwrap().set_ignore_input(0, true);
    graph.set_input_to_uniform(unit, second, "secondTex", false).unwrap();

    graph.update_unit(unit).unwrap();
    let u = graph.unit(unit).unwrap();
    // resolved into slot 0, but second is parent number 1
    assert_eq!(
        u.input_texture(0).cloned(),
        graph.unit(second).unwrap().output_texture(0).cloned()
    );
    assert_eq!(
        u.render_state().uniform("secondTex"),
        Some(UniformValue::Sampler {
            target: TextureTarget::Texture2D,
            unit: 1
        })
    );
}

/// Test that a unit without any processor stays dirty and fails again.
#[test]
fn missing_processor_is_retried() {
    let mut graph = SceneGraph::new();
    let root = graph.add_group("root");
    let unit = graph.add_unit("lonely");
    graph.add_child(root, unit).unwrap();

    for _ in 0..2 {
        let report = graph.run_pass(root, VisitorKind::Update);
        assert_eq!(
            report.failed,
            vec![(unit, UnitError::MissingOwner { unit: "lonely".into() })]
        );
        assert!(graph.unit(unit).unwrap().is_dirty());
    }
}

/// Test that inactive units are traversed but not updated by the pass.
#[test]
fn inactive_unit_is_skipped_by_the_pass() {
    let mut graph = SceneGraph::new();
    let proc = graph.add_processor("processor", screen());
    let active = graph.add_unit("active");
    let inactive = graph.add_unit("inactive");
    graph.add_child(proc, active).unwrap();
    graph.add_child(proc, inactive).unwrap();
    graph.unit_mut(inactive).unwrap().set_active(false);

    let report = graph.run_pass(proc, VisitorKind::Update);
    assert!(report.visited.contains(&inactive));
    assert!(!graph.unit(active).unwrap().is_dirty());
    assert!(graph.unit(inactive).unwrap().is_dirty());
}

/// Test that an inactive ancestor is still resolved when a child needs it.
#[test]
fn inactive_ancestor_is_pulled_in() {
    let (mut graph, proc, [a, _, c]) = diamond();
    graph.unit_mut(a).unwrap().set_active(false);

    let report = graph.run_pass(proc, VisitorKind::Update);
    assert!(report.failed.is_empty());
    assert!(!graph.unit(a).unwrap().is_dirty());
    assert_eq!(
        graph.unit(c).unwrap().input_texture(0).cloned(),
        graph.unit(a).unwrap().output_texture(0).cloned()
    );
}

/// Test that a cull pass never updates anything.
#[test]
fn cull_pass_only_visits() {
    let (mut graph, proc, [a, b, c]) = diamond();
    let report = graph.run_pass(proc, VisitorKind::Cull);
    assert_eq!(report.visited, vec![a, c, b]);
    assert!(graph.unit(c).unwrap().is_dirty());
}

/// Test that units built from JSON behave like hand-built ones.
#[test]
fn configured_units_from_json() {
    let settings = GraphSettings::from_json(r#"{ "max_resolve_depth": 8 }"#).unwrap();
    assert_eq!(settings.max_walk_depth, 1024);
    let mut graph = SceneGraph::with_settings(settings);
    let proc = graph.add_processor("processor", screen());

    let config = UnitConfig::from_json(
        r#"{
            "name": "downsample",
            "index": 3,
            "output_format": "rgba32_f",
            "viewport": { "x": 0, "y": 0, "width": 400, "height": 300 },
            "viewport_reference_input": -1
        }"#,
    )
    .unwrap();
    let unit = graph.add_configured_unit(&config);
    graph.add_child(proc, unit).unwrap();

    graph.update_unit(unit).unwrap();
    let u = graph.unit(unit).unwrap();
    assert_eq!(graph.node_name(unit), "downsample");
    assert_eq!(u.index(), 3);
    assert_eq!(u.viewport(), Some(Viewport::new(0, 0, 400, 300)));
    assert_eq!(u.viewport_reference_input(), None);

    let out = graph.unit_mut(unit).unwrap().get_or_create_output_texture(0);
    assert_eq!(out.format(), PixelFormat::Rgba32F);
    assert_eq!(out.size(), (400, 300));

    assert!(matches!(
        UnitConfig::from_json("{ \"index\": \"three\" }"),
        Err(UnitError::Config(_))
    ));
}

/// Test that a parent added after bridging gets its own slot and the
/// bridge moves behind it.
#[test]
fn bridge_stays_behind_parents_added_later() {
    init_tracing();
    let mut graph = SceneGraph::new();
    let proc = graph.add_processor("processor", screen());
    let r = graph.add_unit("r");
    let p = graph.add_unit("p");
    let q = graph.add_unit("q");
    graph.add_child(proc, r).unwrap();
    graph.add_child(r, q).unwrap();
    graph.add_child(proc, p).unwrap();
    let bridge = graph.add_barrier("bridge", q);
    graph.add_child(p, bridge).unwrap();

    graph.update_unit(q).unwrap();
    graph.update_unit(p).unwrap();
    graph.update_unit(q).unwrap();

    let s = graph.add_unit("s");
    graph.add_child(proc, s).unwrap();
    graph.add_child(s, q).unwrap();
    assert!(graph.unit(q).unwrap().is_dirty());
    graph.update_unit(q).unwrap();

    let output = |graph: &SceneGraph, id| graph.unit(id).unwrap().output_texture(0).cloned();
    let unit = graph.unit(q).unwrap();
    assert_eq!(unit.input_count(), 3);
    assert_eq!(unit.input_texture(0).cloned(), output(&graph, r));
    assert_eq!(unit.input_texture(1).cloned(), output(&graph, s));
    assert_eq!(unit.input_texture(2).cloned(), output(&graph, p));
    assert_eq!(unit.bridge_sources().collect::<Vec<_>>(), vec![p]);
}

/// Test that removing the barrier removes the bridged input.
#[test]
fn removed_barrier_drops_bridged_input() {
    let mut graph = SceneGraph::new();
    let proc = graph.add_processor("processor", screen());
    let r = graph.add_unit("r");
    let p = graph.add_unit("p");
    let q = graph.add_unit("q");
    graph.add_child(proc, r).unwrap();
    graph.add_child(r, q).unwrap();
    graph.add_child(proc, p).unwrap();
    let bridge = graph.add_barrier("bridge", q);
    graph.add_child(p, bridge).unwrap();

    graph.run_pass(proc, VisitorKind::Update);
    graph.run_pass(proc, VisitorKind::Update);
    assert_eq!(graph.unit(q).unwrap().input_count(), 2);
    assert_eq!(graph.unit(q).unwrap().render_state().bound_slots().count(), 2);
    let events = record(&mut graph, q);

    graph.remove_child(p, bridge).unwrap();
    assert!(graph.unit(q).unwrap().is_dirty());
    let report = graph.run_pass(proc, VisitorKind::Update);
    assert!(report.failed.is_empty());

    let p_out = graph.unit(p).unwrap().output_texture(0).cloned();
    let unit = graph.unit(q).unwrap();
    assert_eq!(unit.input_count(), 1);
    assert_eq!(unit.bridge_sources().count(), 0);
    assert!(unit.inputs().all(|(_, tex)| Some(tex) != p_out.as_ref()));
    assert_eq!(unit.render_state().bound_slots().count(), 1);
    assert!(events.lock().unwrap().contains(&UnitEvent::InputChanged));
}

/// Test that a processor-sized viewport follows the processor.
#[test]
fn fallback_viewport_follows_processor_resize() {
    let mut graph = SceneGraph::new();
    let proc = graph.add_processor("processor", screen());
    let unit = graph.add_unit("unit");
    graph.add_child(proc, unit).unwrap();
    graph
        .unit_mut(unit)
        .unwrap()
        .set_viewport_reference_input(None);
    let out = graph.unit_mut(unit).unwrap().get_or_create_output_texture(0);

    graph.run_pass(proc, VisitorKind::Update);
    assert_eq!(graph.unit(unit).unwrap().viewport(), Some(Viewport::new(0, 0, 800, 600)));
    let events = record(&mut graph, unit);

    graph
        .processor_mut(proc)
        .unwrap()
        .set_viewport(Viewport::new(0, 0, 1024, 768));
    graph.invalidate_all();
    graph.run_pass(proc, VisitorKind::Update);

    let u = graph.unit(unit).unwrap();
    assert_eq!(u.viewport(), Some(Viewport::new(0, 0, 1024, 768)));
    assert_eq!(u.render_state().viewport(), u.viewport());
    assert_eq!(out.size(), (1024, 768));
    assert_eq!(
        *events.lock().unwrap(),
        vec![UnitEvent::InputChanged, UnitEvent::ViewportChanged(Viewport::new(0, 0, 1024, 768))]
    );
}

/// Test that an explicit viewport is never replaced by the processor's.
#[test]
fn explicit_viewport_ignores_processor_resize() {
    let mut graph = SceneGraph::new();
    let proc = graph.add_processor("processor", screen());
    let unit = graph.add_unit("unit");
    graph.add_child(proc, unit).unwrap();
    {
        let u = graph.unit_mut(unit).unwrap();
        u.set_viewport_reference_input(None);
        u.set_viewport(Viewport::new(10, 10, 64, 64));
    }

    graph
        .processor_mut(proc)
        .unwrap()
        .set_viewport(Viewport::new(0, 0, 1024, 768));
    graph.run_pass(proc, VisitorKind::Update);
    assert_eq!(graph.unit(unit).unwrap().viewport(), Some(Viewport::new(10, 10, 64, 64)));
}

/// Test that broken barriers are reported on every pass while the
/// working one keeps feeding its target.
#[test]
fn malformed_bridges_are_reported_every_pass() {
    init_tracing();
    let mut graph = SceneGraph::new();
    let proc = graph.add_processor("processor", screen());
    let p = graph.add_unit("p");
    let q = graph.add_unit("q");
    graph.add_child(proc, p).unwrap();
    graph.add_child(proc, q).unwrap();

    let empty = graph.add_empty_barrier("empty");
    let group = graph.add_group("group");
    let wrong = graph.add_barrier("wrong", group);
    let good = graph.add_barrier("good", q);
    for barrier in [empty, wrong, good] {
        graph.add_child(p, barrier).unwrap();
    }

    for _ in 0..2 {
        let report = graph.run_pass(proc, VisitorKind::Update);
        assert_eq!(
            report.failed,
            vec![(
                p,
                UnitError::MalformedBridge {
                    unit: "p".into(),
                    barrier: empty
                }
            )]
        );
        assert!(graph.unit(p).unwrap().is_dirty());

        let p_out = graph.unit(p).unwrap().output_texture(0).cloned();
        let q_unit = graph.unit(q).unwrap();
        assert_eq!(q_unit.bridge_sources().collect::<Vec<_>>(), vec![p]);
        assert_eq!(q_unit.input_texture(1).cloned(), p_out);
    }
}
