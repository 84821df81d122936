use narwhal::config::{ForceKind, ForceSet, InitialPositions, LayoutOptions, PositionCallback};
use narwhal::geometry::{Point, SimBox};
use narwhal::graph::{Graph, LinkSpec, NodeSpec};
use narwhal::integration::Integration;
use narwhal::layout::{
    EVENT_QUEUE_CAPACITY, FALLBACK_IDEAL_LENGTH, Layout, LayoutEvent, LayoutStatus, RestartMode,
    StopReason, unrandom,
};
use narwhal::{Approximation, Error};

fn unit_box() -> SimBox {
    SimBox::new(0.0, 0.0, 100.0, 100.0)
}

fn chain(n: usize) -> Graph {
    Graph {
        nodes: (0..n).map(|i| NodeSpec::new(format!("n{i}"))).collect(),
        links: (1..n)
            .map(|i| LinkSpec::new(format!("n{}", i - 1), format!("n{i}")))
            .collect(),
    }
}

fn static_layout(options: LayoutOptions, area: SimBox, graph: &Graph) -> Layout {
    let mut layout = Layout::new(options).unwrap();
    layout.set_area(area);
    layout.set_graph(graph).unwrap();
    layout
}

#[test]
fn identical_inputs_produce_bit_identical_positions() {
    let mut graph = chain(12);
    graph.links.push(LinkSpec::new("n0", "n7"));
    graph.links.push(LinkSpec::new("n3", "n11"));
    let area = SimBox::new(0.0, 0.0, 640.0, 480.0);

    for (integration, approximation) in [
        (Integration::Euler, Approximation::None),
        (Integration::Verlet, Approximation::BarnesHut),
    ] {
        let options = LayoutOptions {
            max_iterations: 200,
            initial_positions: InitialPositions::Random,
            ..Default::default()
        }
        .with_integration(integration)
        .with_approximation(approximation);

        let a = narwhal::layout(&graph, &options, area).unwrap();
        let b = narwhal::layout(&graph, &options, area).unwrap();
        assert_eq!(a.steps, b.steps);
        for ((ida, pa), (idb, pb)) in a.positions.iter().zip(b.positions.iter()) {
            assert_eq!(ida, idb);
            assert_eq!(pa.x.to_bits(), pb.x.to_bits(), "{integration:?} {ida}");
            assert_eq!(pa.y.to_bits(), pb.y.to_bits(), "{integration:?} {ida}");
        }
    }
}

#[test]
fn linked_pair_moves_together_after_one_step() {
    let graph = Graph {
        nodes: vec![NodeSpec::new("A").at(10.0, 50.0), NodeSpec::new("B").at(90.0, 50.0)],
        links: vec![LinkSpec::new("A", "B")],
    };
    let options = LayoutOptions {
        gravitational_constant: 0.0,
        ..Default::default()
    };
    let mut layout = static_layout(options, unit_box(), &graph);
    layout.start();
    layout.step();

    let a = layout.node("A").unwrap().position;
    let b = layout.node("B").unwrap().position;
    assert!((b - a).norm() < 80.0);
    // Each node moves by at most the start temperature, sqrt(2).
    assert!((a.x - (10.0 + 2f64.sqrt())).abs() < 1e-9, "{a:?}");
    assert!((b.x - (90.0 - 2f64.sqrt())).abs() < 1e-9, "{b:?}");
    for p in [a, b] {
        assert!(unit_box().contains(p));
    }
}

#[test]
fn isolated_node_stays_put_and_has_degree_one() {
    let graph = Graph {
        nodes: vec![NodeSpec::new("solo").at(30.0, 40.0)],
        links: Vec::new(),
    };
    let mut layout = static_layout(LayoutOptions::default(), unit_box(), &graph);
    layout.start();
    let reason = layout.run();

    assert_eq!(reason, StopReason::Stable);
    let node = layout.node("solo").unwrap();
    assert_eq!(node.degree, 1);
    assert_eq!(node.point(), Point::new(30.0, 40.0));
}

#[test]
fn attraction_splits_displacement_by_inverse_mass() {
    let graph = Graph {
        nodes: vec![
            NodeSpec::new("light").with_mass(2.0).at(20.0, 50.0),
            NodeSpec::new("heavy").with_mass(6.0).at(80.0, 30.0),
        ],
        links: vec![LinkSpec::new("light", "heavy")],
    };
    let mut layout = static_layout(LayoutOptions::default(), unit_box(), &graph);
    layout.start();
    layout.attractive_forces();

    let light = layout.node("light").unwrap().displacement.norm();
    let heavy = layout.node("heavy").unwrap().displacement.norm();
    assert!(light > 0.0);
    assert!((light / heavy - 3.0).abs() < 1e-9, "{light} / {heavy}");
}

#[test]
fn verlet_attraction_also_conserves_the_mass_ratio() {
    let graph = Graph {
        nodes: vec![
            NodeSpec::new("a").with_mass(1.5).at(10.0, 10.0),
            NodeSpec::new("b").with_mass(4.5).at(70.0, 90.0),
        ],
        links: vec![LinkSpec::new("a", "b")],
    };
    let options = LayoutOptions::default().with_integration(Integration::Verlet);
    let mut layout = static_layout(options, unit_box(), &graph);
    layout.start();
    let before: Vec<_> = layout.nodes().map(|n| n.position).collect();
    layout.attractive_forces();
    let after: Vec<_> = layout.nodes().map(|n| n.position).collect();

    let moved_a = (after[0] - before[0]).norm();
    let moved_b = (after[1] - before[1]).norm();
    assert!((moved_a / moved_b - 3.0).abs() < 1e-9);
}

#[test]
fn nodes_never_leave_the_box_minus_their_radius() {
    let area = SimBox::new(20.0, 10.0, 200.0, 100.0);
    let mut graph = chain(30);
    for (i, n) in graph.nodes.iter_mut().enumerate() {
        n.marker_radius = Some(2.0 + (i % 4) as f64);
    }
    let options = LayoutOptions {
        max_speed: 50.0,
        max_iterations: 150,
        initial_positions: InitialPositions::Random,
        ..Default::default()
    }
    .with_integration(Integration::Verlet);
    let mut layout = static_layout(options, area, &graph);
    layout.start();

    while !layout.step().is_finished() {
        for n in layout.nodes() {
            let r = n.radius;
            assert!(n.position.x >= area.left + r && n.position.x <= area.right() - r, "{n:?}");
            assert!(n.position.y >= area.top + r && n.position.y <= area.bottom() - r, "{n:?}");
        }
    }
}

#[test]
fn unlinked_barycentered_nodes_reach_stability() {
    let mut nodes = Vec::new();
    for (i, (x, y)) in [(210.0, 330.0), (380.0, 240.0), (260.0, 395.0)].into_iter().enumerate() {
        nodes.push(NodeSpec::new(format!("p{i}")).at(x, y));
        nodes.push(NodeSpec::new(format!("q{i}")).at(1000.0 - x, 1000.0 - y));
    }
    let graph = Graph {
        nodes,
        links: Vec::new(),
    };
    let options = LayoutOptions::default().with_integration(Integration::Verlet);
    let mut layout = static_layout(options, SimBox::new(0.0, 0.0, 1000.0, 1000.0), &graph);
    layout.start();

    assert_eq!(layout.run(), StopReason::Stable);
    assert!(layout.current_step() < 1000);
    assert!(layout.is_stable());
}

#[test]
fn iteration_budget_bounds_the_run() {
    let options = LayoutOptions {
        max_iterations: 5,
        ..Default::default()
    };
    let mut layout = static_layout(options, SimBox::new(0.0, 0.0, 400.0, 400.0), &chain(8));
    layout.start();
    assert_eq!(layout.run(), StopReason::Exhausted);
    assert_eq!(layout.current_step(), 5);
    assert_eq!(layout.status(), LayoutStatus::Finished(StopReason::Exhausted));
}

#[test]
fn empty_layout_finishes_without_stepping() {
    let mut layout = Layout::new(LayoutOptions::default()).unwrap();
    layout.set_area(unit_box());
    layout.start();
    assert_eq!(layout.run(), StopReason::Stable);
    assert_eq!(layout.current_step(), 0);
    assert!(layout.snapshot().positions.is_empty());
}

#[test]
fn static_run_reports_render_steps_and_stability() {
    let options = LayoutOptions {
        max_iterations: 3,
        ..Default::default()
    };
    let mut layout = static_layout(options, unit_box(), &chain(3));
    layout.start();
    layout.run();

    let events = layout.take_events();
    assert_eq!(events.first(), Some(&LayoutEvent::InitialRender));
    let steps: Vec<usize> = events
        .iter()
        .filter_map(|e| match e {
            LayoutEvent::StepCompleted { step } => Some(*step),
            _ => None,
        })
        .collect();
    assert_eq!(steps, vec![1, 2, 3]);
    assert_eq!(
        events.last(),
        Some(&LayoutEvent::StabilityReached {
            reason: StopReason::Exhausted,
            steps: 3
        })
    );
    assert!(layout.take_events().is_empty());
}

#[test]
fn animated_layout_steps_one_frame_at_a_time() {
    let options = LayoutOptions {
        enable_simulation: true,
        max_iterations: 20,
        ..Default::default()
    };
    let mut layout = static_layout(options, unit_box(), &chain(4));
    layout.start();
    assert_eq!(layout.current_step(), 1);

    let mut frames = 0;
    while let Some(frame) = layout.pending_frame() {
        assert!(layout.run_frame(frame));
        frames += 1;
        assert!(frames <= 21);
    }
    assert!(matches!(layout.status(), LayoutStatus::Finished(_)));
    assert!(
        layout
            .take_events()
            .iter()
            .any(|e| matches!(e, LayoutEvent::StabilityReached { .. }))
    );
}

#[test]
fn stop_prevents_the_pending_frame_from_running() {
    let options = LayoutOptions {
        enable_simulation: true,
        ..Default::default()
    };
    let mut layout = static_layout(options, unit_box(), &chain(4));
    layout.start();
    let frame = layout.pending_frame().unwrap();
    let step = layout.current_step();

    layout.stop();
    assert!(layout.pending_frame().is_none());
    assert!(!layout.run_frame(frame));
    assert_eq!(layout.current_step(), step);

    // A frame from before a restart stays stale too.
    layout.start();
    assert!(!layout.run_frame(frame));
}

#[test]
fn restart_while_simulating_only_extends_the_budget() {
    let options = LayoutOptions {
        enable_simulation: true,
        max_iterations: 50,
        ..Default::default()
    };
    let mut layout = static_layout(options, unit_box(), &chain(5));
    layout.start();
    for _ in 0..3 {
        let frame = layout.pending_frame().unwrap();
        layout.run_frame(frame);
    }
    let step = layout.current_step();
    assert!(layout.max_iterations() < 50);

    layout.restart_simulation(narwhal::RestartMode::Full);
    assert_eq!(layout.max_iterations(), 50);
    assert_eq!(layout.current_step(), step);
    assert!(layout.pending_frame().is_some());
}

#[test]
fn circle_placement_walks_from_the_roots() {
    let graph = Graph {
        nodes: vec![
            NodeSpec::new("c"),
            NodeSpec::new("b"),
            NodeSpec::new("a"),
            NodeSpec::new("d"),
        ],
        links: vec![LinkSpec::new("a", "b"), LinkSpec::new("b", "c")],
    };
    let options = LayoutOptions {
        initial_position_radius: 10.0,
        ..Default::default()
    };
    let mut layout = static_layout(options, SimBox::new(100.0, 0.0, 100.0, 100.0), &graph);
    layout.start();

    let angle = 2.0 * std::f64::consts::PI / 5.0;
    let expected = |i: f64| Point::new(150.0 + 10.0 * (angle * i).cos(), 50.0 + 10.0 * (angle * i).sin());
    let snapshot = layout.snapshot();
    for (id, i) in [("a", 0.0), ("b", 1.0), ("c", 2.0), ("d", 3.0)] {
        let p = snapshot.positions[id];
        let e = expected(i);
        assert!((p.x - e.x).abs() < 1e-9 && (p.y - e.y).abs() < 1e-9, "{id}: {p:?} vs {e:?}");
    }
}

#[test]
fn random_placement_uses_the_unrandom_sequence() {
    let options = LayoutOptions {
        initial_positions: InitialPositions::Random,
        ..Default::default()
    };
    let area = SimBox::new(10.0, 20.0, 300.0, 200.0);
    let mut layout = static_layout(options, area, &chain(3));
    layout.start();

    for (i, node) in layout.nodes().enumerate() {
        assert_eq!(node.position.x, 10.0 + 300.0 * unrandom(i));
        assert_eq!(node.position.y, 20.0 + 200.0 * unrandom(3 + 1 + i));
    }
}

#[test]
fn callback_placement_only_touches_unplaced_nodes() {
    let callback = PositionCallback::new(|index, _id, area| {
        Point::new(area.left + 10.0 * index as f64, area.top + 5.0)
    });
    let options = LayoutOptions::default().with_initial_positions(InitialPositions::Callback(callback));
    let graph = Graph {
        nodes: vec![NodeSpec::new("a"), NodeSpec::new("b").at(77.0, 66.0), NodeSpec::new("c")],
        links: Vec::new(),
    };
    let mut layout = static_layout(options, unit_box(), &graph);
    layout.start();

    let p = layout.snapshot().positions;
    assert_eq!(p["a"], Point::new(0.0, 5.0));
    assert_eq!(p["b"], Point::new(77.0, 66.0));
    assert_eq!(p["c"], Point::new(20.0, 5.0));
}

#[test]
fn disabled_forces_are_skipped() {
    let graph = Graph {
        nodes: vec![NodeSpec::new("a").at(40.0, 50.0), NodeSpec::new("b").at(60.0, 50.0)],
        links: Vec::new(),
    };
    let options = LayoutOptions::default().with_forces(ForceSet::only(&[ForceKind::Attractive]));
    let mut layout = static_layout(options, unit_box(), &graph);
    layout.start();
    layout.run();
    assert_eq!(layout.snapshot().positions["a"], Point::new(40.0, 50.0));
    assert_eq!(layout.snapshot().positions["b"], Point::new(60.0, 50.0));
}

#[test]
fn links_to_unknown_nodes_are_deferred_until_the_node_arrives() {
    let mut layout = Layout::new(LayoutOptions::default()).unwrap();
    layout.set_area(unit_box());
    layout.add_node(&NodeSpec::new("a").at(10.0, 10.0)).unwrap();
    layout.add_link(&LinkSpec::new("a", "b"));
    assert!(!layout.links().next().unwrap().is_resolved());

    // Unresolved links are skipped, not an error.
    layout.start();
    layout.attractive_forces();

    layout.add_node(&NodeSpec::new("b").at(90.0, 90.0)).unwrap();
    assert!(layout.links().next().unwrap().is_resolved());
    assert_eq!(layout.node("b").unwrap().links_to().len(), 1);
}

#[test]
fn degree_is_the_larger_of_in_and_out_links() {
    let graph = Graph {
        nodes: ["hub", "x", "y", "z"].into_iter().map(NodeSpec::new).collect(),
        links: vec![
            LinkSpec::new("hub", "x"),
            LinkSpec::new("hub", "y"),
            LinkSpec::new("hub", "z"),
            LinkSpec::new("x", "hub"),
        ],
    };
    let layout = static_layout(LayoutOptions::default(), unit_box(), &graph);
    assert_eq!(layout.node("hub").unwrap().degree, 3);
    assert_eq!(layout.node("x").unwrap().degree, 1);
}

#[test]
fn removing_a_node_drops_its_links_and_stops_the_simulation() {
    let options = LayoutOptions {
        enable_simulation: true,
        ..Default::default()
    };
    let mut layout = static_layout(options, unit_box(), &chain(3));
    layout.start();
    assert!(layout.pending_frame().is_some());

    layout.remove_node("n1").unwrap();
    assert!(layout.pending_frame().is_none());
    assert_eq!(layout.node_count(), 2);
    assert_eq!(layout.link_count(), 0);
    assert_eq!(layout.node("n0").unwrap().degree, 1);
    assert!(matches!(layout.remove_node("n1"), Err(Error::UnknownNode { .. })));
    assert!(layout.remove_link("n0->n1").is_none());
}

#[test]
fn membership_errors_fail_fast() {
    let mut layout = Layout::new(LayoutOptions::default()).unwrap();
    let dangling = Graph {
        nodes: vec![NodeSpec::new("a")],
        links: vec![LinkSpec::new("a", "ghost")],
    };
    assert!(matches!(
        layout.set_graph(&dangling),
        Err(Error::MissingEndpoint { .. })
    ));
    layout.add_node(&NodeSpec::new("a")).unwrap();
    assert!(matches!(
        layout.add_node(&NodeSpec::new("a")),
        Err(Error::DuplicateNode { .. })
    ));
}

#[test]
fn linear_cooling_schedule() {
    assert_eq!(Layout::cool_down(2.0, 0.5, 3), 0.5);

    let options = LayoutOptions {
        max_iterations: 3,
        ..Default::default()
    };
    let layout = static_layout(options, unit_box(), &chain(4));
    assert_eq!(layout.start_temperature(), 2.0);
    assert_eq!(layout.temperature(), 2.0);
    assert_eq!(layout.diff_temperature(), 0.5);
}

#[test]
fn ideal_length_follows_the_integration_scheme() {
    let area = SimBox::new(0.0, 0.0, 200.0, 200.0);
    let mut euler = static_layout(LayoutOptions::default(), area, &chain(4));
    euler.set_k();
    assert!((euler.k() - 10_000f64.powf(0.3)).abs() < 1e-9);

    let options = LayoutOptions::default().with_integration(Integration::Verlet);
    let mut verlet = static_layout(options, area, &chain(4));
    verlet.set_k();
    assert!((verlet.k() - 100.0).abs() < 1e-9);

    let options = LayoutOptions {
        link_length: Some(42.0),
        ..Default::default()
    };
    let mut fixed = static_layout(options, area, &chain(4));
    fixed.set_k();
    assert_eq!(fixed.k(), 42.0);
}

#[test]
fn zero_width_box_keeps_positions_finite_and_inside() {
    let graph = Graph {
        nodes: vec![NodeSpec::new("a"), NodeSpec::new("b")],
        links: vec![LinkSpec::new("a", "b")],
    };
    let area = SimBox::new(0.0, 0.0, 0.0, 100.0);
    for integration in [Integration::Euler, Integration::Verlet] {
        let options = LayoutOptions {
            max_iterations: 5,
            ..Default::default()
        }
        .with_integration(integration);

        let mut layout = static_layout(options.clone(), area, &graph);
        layout.set_k();
        assert_eq!(layout.k(), FALLBACK_IDEAL_LENGTH);

        let result = narwhal::layout(&graph, &options, area).unwrap();
        for (id, p) in &result.positions {
            assert!(p.x.is_finite() && p.y.is_finite(), "{integration:?} {id}: {p:?}");
            assert_eq!(p.x, 0.0, "{integration:?} {id}");
            assert!((0.0..=100.0).contains(&p.y), "{integration:?} {id}: {p:?}");
        }
    }
}

#[test]
fn undrained_events_are_bounded() {
    let mut layout = static_layout(LayoutOptions::default(), unit_box(), &chain(3));
    layout.start();
    layout.run();
    for _ in 0..1000 {
        layout.restart_simulation(RestartMode::Dragging);
    }

    let events = layout.take_events();
    assert_eq!(events.len(), EVENT_QUEUE_CAPACITY);
    assert_eq!(events.last(), Some(&LayoutEvent::RedrawRequested));
    assert!(layout.take_events().is_empty());
}
