//! Reingold-Fruchterman layout state machine.
//!
//! `start()` places nodes and resets the cooling schedule; each `step()` runs the force phases,
//! integrates, clamps to the box and cools down. A static layout is driven to completion with
//! `run()`; an animated one (`enableSimulation`) schedules one step per host frame.

use crate::config::LayoutOptions;
use crate::error::{Error, Result};
use crate::forces::{ForceCurves, ideal_length};
use crate::geometry::{Point, SimBox, Vec2};
use crate::graph::{Arena, Graph, Link, LinkKey, LinkSpec, Node, NodeKey, NodeSpec};
use crate::integration::{Integration, Integrator};
use crate::quadtree::QuadTree;
use indexmap::IndexMap;
use rustc_hash::FxHashMap;
use serde::Serialize;
use std::collections::VecDeque;
use tracing::{debug, trace, warn};

mod forces;
mod positions;
mod schedule;

pub use positions::unrandom;
pub use schedule::{FrameRequest, LayoutEvent, LayoutStatus, RestartMode, StepOutcome, StopReason};

/// Steps whose system temperature changes by less than this are considered stable.
pub const STABILITY_THRESHOLD: f64 = 1e-5;

/// Undrained events kept per layout.
pub const EVENT_QUEUE_CAPACITY: usize = 1024;

/// Ideal edge length used when the box has no usable area.
pub const FALLBACK_IDEAL_LENGTH: f64 = 1.0;

/// Node positions keyed by node id, in node insertion order.
pub type Positions = IndexMap<String, Point>;

#[derive(Debug, Clone, Default, Serialize)]
pub struct LayoutResult {
    pub positions: Positions,
    pub steps: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stop_reason: Option<StopReason>,
}

#[derive(Debug)]
pub struct Layout {
    options: LayoutOptions,
    integration: Integration,
    curves: ForceCurves,
    nodes: Arena<Node>,
    links: Arena<Link>,
    node_lookup: FxHashMap<String, NodeKey>,
    area: SimBox,
    k: f64,
    temperature: f64,
    start_temperature: f64,
    diff_temperature: f64,
    current_step: usize,
    max_iterations: usize,
    system_temperature: f64,
    previous_system_temperature: Option<f64>,
    enable_simulation: bool,
    initial_rendering: bool,
    quad_tree: Option<QuadTree>,
    status: LayoutStatus,
    simulation: Option<FrameRequest>,
    generation: u64,
    events: VecDeque<LayoutEvent>,
}

impl Layout {
    pub fn new(options: LayoutOptions) -> Result<Self> {
        options.validate()?;
        let integration = options.integration;
        let curves = options.curves();
        let mut layout = Self {
            integration,
            curves,
            nodes: Arena::new(),
            links: Arena::new(),
            node_lookup: FxHashMap::default(),
            area: SimBox::default(),
            k: options.link_length.unwrap_or(0.0),
            temperature: 0.0,
            start_temperature: 0.0,
            diff_temperature: 0.0,
            current_step: 0,
            max_iterations: options.max_iterations,
            system_temperature: 0.0,
            previous_system_temperature: None,
            enable_simulation: options.enable_simulation,
            initial_rendering: true,
            quad_tree: None,
            status: LayoutStatus::Idle,
            simulation: None,
            generation: 0,
            events: VecDeque::new(),
            options,
        };
        layout.reset_simulation();
        Ok(layout)
    }

    // ---- membership -------------------------------------------------------------------------

    /// Replaces all nodes and links. Every link endpoint must be present.
    pub fn set_graph(&mut self, graph: &Graph) -> Result<()> {
        graph.validate()?;
        self.clear();
        for n in &graph.nodes {
            self.add_node(n)?;
        }
        for l in &graph.links {
            self.add_link(l);
        }
        debug!(
            nodes = self.nodes.len(),
            links = self.links.len(),
            "layout graph replaced"
        );
        Ok(())
    }

    pub fn add_node(&mut self, spec: &NodeSpec) -> Result<NodeKey> {
        if self.node_lookup.contains_key(&spec.id) {
            return Err(Error::DuplicateNode {
                node_id: spec.id.clone(),
            });
        }
        let mut node = Node::new(
            spec.id.clone(),
            spec.resolve_mass(self.options.marker_radius),
            spec.resolve_radius(self.options.marker_radius),
            spec.position,
        );
        node.fixed = spec.fixed;
        let key = self.nodes.insert(node);
        self.node_lookup.insert(spec.id.clone(), key);

        // Links registered before this node can now be resolved.
        let pending: Vec<LinkKey> = self
            .links
            .iter()
            .filter(|(_, l)| {
                (l.from_node.is_none() && l.from == spec.id) || (l.to_node.is_none() && l.to == spec.id)
            })
            .map(|(k, _)| k)
            .collect();
        for link in pending {
            self.resolve_link(link);
        }

        self.membership_changed();
        Ok(key)
    }

    /// Adds a link. Unknown endpoints are resolved once the node is added; until then the link
    /// takes no part in the simulation.
    pub fn add_link(&mut self, spec: &LinkSpec) -> LinkKey {
        let key = self.links.insert(Link {
            id: spec.id(),
            from: spec.from.clone(),
            to: spec.to.clone(),
            weight: spec.weight,
            from_node: None,
            to_node: None,
        });
        self.resolve_link(key);
        if let Some(l) = self.links.get(key) {
            if !l.is_resolved() {
                warn!(link = %l.id, "link endpoint not registered yet; deferring");
            }
        }
        self.membership_changed();
        key
    }

    fn resolve_link(&mut self, key: LinkKey) {
        let Some(link) = self.links.get_mut(key) else {
            return;
        };
        if link.from_node.is_none() {
            if let Some(&n) = self.node_lookup.get(&link.from) {
                link.from_node = Some(n);
                if let Some(node) = self.nodes.get_mut(n) {
                    node.links_from.push(key);
                    node.refresh_degree();
                }
            }
        }
        if link.to_node.is_none() {
            if let Some(&n) = self.node_lookup.get(&link.to) {
                link.to_node = Some(n);
                if let Some(node) = self.nodes.get_mut(n) {
                    node.links_to.push(key);
                    node.refresh_degree();
                }
            }
        }
    }

    /// Removes a node together with every link touching it.
    pub fn remove_node(&mut self, id: &str) -> Result<Node> {
        let key = self.node_key(id)?;
        let incident: Vec<LinkKey> = self
            .nodes
            .get(key)
            .map(|n| n.links_from.iter().chain(n.links_to.iter()).copied().collect())
            .unwrap_or_default();
        for link in incident {
            self.detach_link(link);
        }
        self.node_lookup.remove(id);
        let node = self.nodes.remove(key).ok_or_else(|| Error::UnknownNode {
            node_id: id.to_string(),
        })?;
        self.membership_changed();
        Ok(node)
    }

    pub fn remove_link(&mut self, id: &str) -> Option<Link> {
        let key = self
            .links
            .iter()
            .find(|(_, l)| l.id == id)
            .map(|(k, _)| k)?;
        let link = self.detach_link(key);
        self.membership_changed();
        link
    }

    fn detach_link(&mut self, key: LinkKey) -> Option<Link> {
        let link = self.links.remove(key)?;
        for (endpoint, outgoing) in [(link.from_node, true), (link.to_node, false)] {
            let Some(node) = endpoint.and_then(|n| self.nodes.get_mut(n)) else {
                continue;
            };
            if outgoing {
                node.links_from.retain(|&l| l != key);
            } else {
                node.links_to.retain(|&l| l != key);
            }
            node.refresh_degree();
        }
        Some(link)
    }

    /// Drops all nodes and links and resets the simulation.
    pub fn clear(&mut self) {
        self.nodes.clear();
        self.links.clear();
        self.node_lookup.clear();
        self.membership_changed();
    }

    fn membership_changed(&mut self) {
        self.stop();
        self.reset_simulation();
    }

    fn node_key(&self, id: &str) -> Result<NodeKey> {
        self.node_lookup
            .get(id)
            .copied()
            .ok_or_else(|| Error::UnknownNode {
                node_id: id.to_string(),
            })
    }

    // ---- lifecycle --------------------------------------------------------------------------

    pub fn set_area(&mut self, area: SimBox) {
        self.area = area;
    }

    /// Initial positions (unless restarting from a drag), ideal length and cooling schedule.
    /// An animated layout performs its first step right away.
    pub fn start(&mut self) {
        self.current_step = 0;
        if self.initial_rendering {
            self.init_positions();
            self.emit(LayoutEvent::InitialRender);
        }
        self.set_k();
        self.reset_simulation();
        self.status = LayoutStatus::Running;
        debug!(
            nodes = self.nodes.len(),
            links = self.links.len(),
            k = self.k,
            integration = self.integration.as_str(),
            animated = self.enable_simulation,
            "layout started"
        );
        if self.enable_simulation {
            self.step();
        }
    }

    /// One simulation step, if the layout may continue. Consumes one unit of the iteration
    /// budget. Animated layouts schedule their next frame.
    pub fn step(&mut self) -> StepOutcome {
        if let Some(reason) = self.check_continuation() {
            self.finish(reason);
            return StepOutcome::Finished(reason);
        }
        self.status = LayoutStatus::Running;
        self.current_step += 1;

        if self.options.approximation == crate::config::Approximation::BarnesHut {
            self.build_quad_tree();
        }
        let forces = self.options.forces;
        if forces.barycenter {
            self.barycenter_forces();
        }
        if forces.repulsive {
            self.repulsive_forces();
        }
        if forces.attractive {
            self.attractive_forces();
        }
        self.apply_limits();
        self.quad_tree = None;

        self.temperature =
            Self::cool_down(self.start_temperature, self.diff_temperature, self.current_step);
        self.previous_system_temperature = Some(self.system_temperature);
        self.system_temperature = self.compute_system_temperature();

        trace!(
            step = self.current_step,
            temperature = self.temperature,
            system_temperature = self.system_temperature,
            "layout step"
        );
        self.emit(LayoutEvent::StepCompleted {
            step: self.current_step,
        });
        if self.enable_simulation {
            self.schedule_frame();
        }
        StepOutcome::Stepped {
            step: self.current_step,
        }
    }

    /// Steps synchronously until the layout finishes.
    pub fn run(&mut self) -> StopReason {
        loop {
            if let StepOutcome::Finished(reason) = self.step() {
                return reason;
            }
        }
    }

    fn check_continuation(&mut self) -> Option<StopReason> {
        if self.nodes.is_empty() {
            return Some(StopReason::Stable);
        }
        if self.max_iterations == 0 {
            return Some(StopReason::Exhausted);
        }
        if !self.temperature.is_finite() {
            warn!(temperature = self.temperature, "layout temperature is not finite; stopping");
            return Some(StopReason::NonFinite);
        }
        if self.is_stable() {
            return Some(StopReason::Stable);
        }
        self.max_iterations -= 1;
        None
    }

    fn finish(&mut self, reason: StopReason) {
        self.simulation = None;
        self.generation += 1;
        if self.status == LayoutStatus::Finished(reason) {
            return;
        }
        self.status = LayoutStatus::Finished(reason);
        debug!(?reason, steps = self.current_step, "layout finished");
        self.emit(LayoutEvent::StabilityReached {
            reason,
            steps: self.current_step,
        });
    }

    pub fn is_stable(&self) -> bool {
        let settled = self
            .previous_system_temperature
            .is_some_and(|prev| (self.system_temperature - prev).abs() < STABILITY_THRESHOLD);
        settled || self.temperature <= 0.0
    }

    /// Cancels the pending frame, if any. No step scheduled before the call will run.
    pub fn stop(&mut self) {
        if self.simulation.take().is_some() {
            debug!(step = self.current_step, "layout stopped");
        }
        self.generation += 1;
        if self.status == LayoutStatus::Running {
            self.status = LayoutStatus::Idle;
        }
    }

    fn schedule_frame(&mut self) {
        self.generation += 1;
        self.simulation = Some(FrameRequest {
            generation: self.generation,
        });
    }

    pub fn pending_frame(&self) -> Option<FrameRequest> {
        self.simulation
    }

    /// Runs the step behind `frame`. Returns `false` for a stale request.
    pub fn run_frame(&mut self, frame: FrameRequest) -> bool {
        if self.simulation != Some(frame) {
            return false;
        }
        self.simulation = None;
        self.step();
        true
    }

    /// Whether an animated simulation has a frame pending.
    pub fn is_simulating(&self) -> bool {
        self.simulation.is_some()
    }

    /// Restarts after a drag or a data change. A running simulation is only extended.
    pub fn restart_simulation(&mut self, mode: RestartMode) {
        self.emit(LayoutEvent::Restarted { mode });
        if self.simulation.is_some() {
            self.reset_simulation();
            return;
        }
        debug!(?mode, "layout restarted");
        if mode == RestartMode::Dragging {
            self.initial_rendering = false;
        }
        if mode == RestartMode::Dragging && !self.enable_simulation {
            // A single iteration is enough visual feedback while dragging.
            self.set_k();
            self.reset_simulation();
            self.max_iterations = 1;
            self.status = LayoutStatus::Running;
            self.run();
        } else {
            self.start();
            if !self.enable_simulation {
                self.run();
            }
        }
        self.emit(LayoutEvent::RedrawRequested);
        self.initial_rendering = true;
    }

    /// Switches between animated and static mode; `None` restores the configured mode.
    pub fn update_simulation(&mut self, enable: Option<bool>) {
        self.enable_simulation = enable.unwrap_or(self.options.enable_simulation);
    }

    pub fn set_initial_rendering(&mut self, enable: bool) {
        self.initial_rendering = enable;
    }

    /// Asks the host for one redraw of the current positions without stepping.
    pub fn request_redraw(&mut self) {
        self.emit(LayoutEvent::RedrawRequested);
    }

    /// Ideal edge length: `linkLength` if set, else derived from the box. A degenerate box (zero
    /// or non-finite area) falls back to [`FALLBACK_IDEAL_LENGTH`].
    pub fn set_k(&mut self) {
        if let Some(length) = self.options.link_length {
            self.k = length;
        } else if !self.nodes.is_empty() {
            let k = ideal_length(&self.area, self.nodes.len(), self.integration.k_exponent());
            self.k = if k.is_finite() && k > 0.0 {
                k
            } else {
                debug!(k, width = self.area.width, height = self.area.height, "degenerate layout box");
                FALLBACK_IDEAL_LENGTH
            };
        }
    }

    pub fn reset_simulation(&mut self) {
        self.system_temperature = 0.0;
        self.previous_system_temperature = None;
        self.max_iterations = self.options.max_iterations;
        self.start_temperature = (self.nodes.len() as f64).sqrt();
        self.temperature = self.start_temperature;
        self.diff_temperature = self.start_temperature / (self.options.max_iterations as f64 + 1.0);
    }

    /// Linear cooling.
    pub fn cool_down(start_temperature: f64, diff_temperature: f64, current_step: usize) -> f64 {
        start_temperature - diff_temperature * current_step as f64
    }

    fn compute_system_temperature(&self) -> f64 {
        self.nodes.iter().map(|(_, n)| n.temperature).sum()
    }

    // ---- interaction surface ----------------------------------------------------------------

    pub fn pin_node(&mut self, id: &str) -> Result<()> {
        let key = self.node_key(id)?;
        if let Some(node) = self.nodes.get_mut(key) {
            node.fixed = true;
        }
        Ok(())
    }

    /// Moves a node directly, bypassing the integrator.
    pub fn move_pinned_node(&mut self, id: &str, x: f64, y: f64) -> Result<()> {
        let key = self.node_key(id)?;
        if let Some(node) = self.nodes.get_mut(key) {
            node.position = Vec2::new(x, y);
            node.previous_position = node.position;
            node.placed = true;
        }
        Ok(())
    }

    pub fn release_node(&mut self, id: &str) -> Result<()> {
        let key = self.node_key(id)?;
        if let Some(node) = self.nodes.get_mut(key) {
            node.fixed = false;
        }
        Ok(())
    }

    // ---- read access ------------------------------------------------------------------------

    pub fn options(&self) -> &LayoutOptions {
        &self.options
    }

    pub fn integration(&self) -> Integration {
        self.integration
    }

    pub fn area(&self) -> SimBox {
        self.area
    }

    pub fn k(&self) -> f64 {
        self.k
    }

    pub fn temperature(&self) -> f64 {
        self.temperature
    }

    pub fn start_temperature(&self) -> f64 {
        self.start_temperature
    }

    pub fn diff_temperature(&self) -> f64 {
        self.diff_temperature
    }

    pub fn current_step(&self) -> usize {
        self.current_step
    }

    pub fn max_iterations(&self) -> usize {
        self.max_iterations
    }

    /// Sum of node temperatures after the last step.
    pub fn system_temperature(&self) -> f64 {
        self.system_temperature
    }

    pub fn previous_system_temperature(&self) -> Option<f64> {
        self.previous_system_temperature
    }

    pub fn simulation_enabled(&self) -> bool {
        self.enable_simulation
    }

    pub fn status(&self) -> LayoutStatus {
        self.status
    }

    pub fn node(&self, id: &str) -> Option<&Node> {
        self.node_lookup.get(id).and_then(|&k| self.nodes.get(k))
    }

    pub fn nodes(&self) -> impl Iterator<Item = &Node> + '_ {
        self.nodes.iter().map(|(_, n)| n)
    }

    pub fn links(&self) -> impl Iterator<Item = &Link> + '_ {
        self.links.iter().map(|(_, l)| l)
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn link_count(&self) -> usize {
        self.links.len()
    }

    /// Drains pending notifications, oldest first.
    pub fn take_events(&mut self) -> Vec<LayoutEvent> {
        self.events.drain(..).collect()
    }

    // Undrained events are bounded; the oldest are dropped first.
    fn emit(&mut self, event: LayoutEvent) {
        if self.events.len() == EVENT_QUEUE_CAPACITY {
            self.events.pop_front();
        }
        self.events.push_back(event);
    }

    /// Current node positions, in node insertion order.
    pub fn snapshot(&self) -> LayoutResult {
        let positions = self
            .nodes
            .iter()
            .map(|(_, n)| (n.id.clone(), n.point()))
            .collect();
        let stop_reason = match self.status {
            LayoutStatus::Finished(reason) => Some(reason),
            _ => None,
        };
        LayoutResult {
            positions,
            steps: self.current_step,
            stop_reason,
        }
    }
}
