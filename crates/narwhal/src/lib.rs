#![forbid(unsafe_code)]

//! Headless force-directed graph layout.
//!
//! A Reingold-Fruchterman simulation with Euler or Verlet integration and an optional
//! Barnes-Hut approximation of the repulsive phase. Layouts can be run to completion in one call
//! ([`layout`]), or stepped frame by frame by a host that renders intermediate positions and lets
//! the user drag nodes around.

pub mod config;
pub mod error;
pub mod forces;
pub mod geometry;
pub mod graph;
pub mod integration;
pub mod interaction;
pub mod layout;
pub mod quadtree;
pub mod registry;

pub use config::{Approximation, ForceKind, ForceSet, InitialPositions, LayoutOptions, PositionCallback};
pub use error::{Error, Result};
pub use geometry::{Point, SimBox, Vec2};
pub use graph::{Graph, LinkSpec, NodeSpec};
pub use integration::{Euler, Integration, Integrator, Verlet};
pub use interaction::{DragController, DragEnd, DragMove};
pub use layout::{Layout, LayoutEvent, LayoutResult, RestartMode, StepOutcome, StopReason};
pub use registry::{GraphLayoutClient, LayoutRegistry};

/// Headless layout entry point: runs a static simulation to completion.
pub fn layout(graph: &Graph, options: &LayoutOptions, area: SimBox) -> Result<LayoutResult> {
    let timing_enabled = std::env::var("NARWHAL_LAYOUT_TIMING").ok().as_deref() == Some("1");
    let total_start = timing_enabled.then(std::time::Instant::now);

    let mut engine = Layout::new(options.clone())?;
    engine.update_simulation(Some(false));
    engine.set_area(area);
    engine.set_graph(graph)?;

    let run_start = timing_enabled.then(std::time::Instant::now);
    engine.start();
    let reason = engine.run();
    let run_time = run_start.map(|s| s.elapsed());

    let result = engine.snapshot();
    if let (Some(s), Some(run_time)) = (total_start, run_time) {
        eprintln!(
            "[narwhal-layout-timing] total={:?} run={:?} nodes={} links={} steps={} reason={:?} integration={} approximation={:?}",
            s.elapsed(),
            run_time,
            engine.node_count(),
            engine.link_count(),
            result.steps,
            reason,
            engine.integration().as_str(),
            options.approximation,
        );
    }
    Ok(result)
}
