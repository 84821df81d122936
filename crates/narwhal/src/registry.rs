//! Layouts shared between graphs, and the per-graph handle into them.
//!
//! Several graphs configured with the same layout `type` contribute their nodes to a single
//! [`Layout`] so they settle together. The registry is owned by the host; nothing here is global.

use crate::config::LayoutOptions;
use crate::error::{Error, Result};
use crate::geometry::{Point, SimBox};
use crate::graph::Graph;
use crate::interaction::{DragController, DragEnd, DragMove};
use crate::layout::{Layout, LayoutEvent};
use indexmap::IndexMap;
use tracing::debug;

#[derive(Debug, Default)]
pub struct LayoutRegistry {
    layouts: IndexMap<String, Layout>,
}

impl LayoutRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// The layout registered under `options.layout_type`, created from `options` on first use.
    pub fn get_or_create(&mut self, options: &LayoutOptions) -> Result<&mut Layout> {
        let key = options.layout_type.clone();
        if !self.layouts.contains_key(&key) {
            debug!(layout_type = %key, "creating layout");
            let layout = Layout::new(options.clone())?;
            self.layouts.insert(key.clone(), layout);
        }
        self.layouts
            .get_mut(&key)
            .ok_or_else(|| Error::InvalidConfig {
                message: format!("layout {key:?} vanished from the registry"),
            })
    }

    pub fn get(&self, layout_type: &str) -> Option<&Layout> {
        self.layouts.get(layout_type)
    }

    pub fn get_mut(&mut self, layout_type: &str) -> Option<&mut Layout> {
        self.layouts.get_mut(layout_type)
    }

    pub fn remove(&mut self, layout_type: &str) -> Option<Layout> {
        self.layouts.shift_remove(layout_type)
    }

    pub fn len(&self) -> usize {
        self.layouts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.layouts.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Layout)> + '_ {
        self.layouts.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Cancels every pending frame (before the host redraws).
    pub fn stop_all(&mut self) {
        for layout in self.layouts.values_mut() {
            layout.stop();
        }
    }

    /// Starts every layout, then steps the static ones round-robin until all have finished.
    /// Animated layouts continue through [`LayoutRegistry::frame`].
    pub fn render(&mut self) {
        for layout in self.layouts.values_mut() {
            layout.start();
        }
        loop {
            let mut active = false;
            for layout in self.layouts.values_mut() {
                if !layout.simulation_enabled() && !layout.step().is_finished() {
                    active = true;
                }
            }
            if !active {
                break;
            }
        }
    }

    /// Runs the pending frame of every animated layout. Returns how many layouts stepped.
    pub fn frame(&mut self) -> usize {
        let mut stepped = 0;
        for layout in self.layouts.values_mut() {
            if let Some(request) = layout.pending_frame() {
                if layout.run_frame(request) {
                    stepped += 1;
                }
            }
        }
        stepped
    }

    pub fn is_animating(&self) -> bool {
        self.layouts.values().any(Layout::is_simulating)
    }

    /// Drains the notifications of every layout, tagged with the layout type, in registry order.
    pub fn take_events(&mut self) -> Vec<(String, LayoutEvent)> {
        let mut events = Vec::new();
        for (key, layout) in self.layouts.iter_mut() {
            events.extend(layout.take_events().into_iter().map(|e| (key.clone(), e)));
        }
        events
    }

    /// Turns animation on or off for every layout (e.g. around printing); `None` restores the
    /// configured mode.
    pub fn set_simulation_enabled(&mut self, enable: Option<bool>) {
        for layout in self.layouts.values_mut() {
            layout.update_simulation(enable);
        }
    }
}

/// A graph's handle into the shared layout: what it contributed, and its drag state.
#[derive(Debug, Clone, Default)]
pub struct GraphLayoutClient {
    layout_type: Option<String>,
    node_ids: Vec<String>,
    link_ids: Vec<String>,
    draggable: bool,
    drag: DragController,
}

impl GraphLayoutClient {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn layout_type(&self) -> Option<&str> {
        self.layout_type.as_deref()
    }

    pub fn is_attached(&self) -> bool {
        self.layout_type.is_some()
    }

    pub fn node_ids(&self) -> &[String] {
        &self.node_ids
    }

    /// Adds the graph's nodes and links to the layout selected by `options`, replacing whatever
    /// this client contributed before. On error nothing of `graph` stays in the layout and the
    /// client is left detached.
    pub fn attach(
        &mut self,
        registry: &mut LayoutRegistry,
        options: &LayoutOptions,
        graph: &Graph,
        area: SimBox,
    ) -> Result<()> {
        graph.validate()?;
        self.detach(registry);

        let layout = registry.get_or_create(options)?;
        layout.set_area(area);
        self.layout_type = Some(options.layout_type.clone());
        self.draggable = options.draggable;
        self.drag = DragController::new(options.fixed_draggable);

        if let Err(err) = self.contribute(layout, graph) {
            self.detach(registry);
            return Err(err);
        }
        debug!(
            layout_type = %options.layout_type,
            nodes = self.node_ids.len(),
            links = self.link_ids.len(),
            "graph attached"
        );
        Ok(())
    }

    fn contribute(&mut self, layout: &mut Layout, graph: &Graph) -> Result<()> {
        for n in &graph.nodes {
            layout.add_node(n)?;
            self.node_ids.push(n.id.clone());
        }
        for l in &graph.links {
            layout.add_link(l);
            self.link_ids.push(l.id());
        }
        Ok(())
    }

    /// Withdraws this client's nodes and links from its layout.
    pub fn detach(&mut self, registry: &mut LayoutRegistry) {
        let Some(key) = self.layout_type.take() else {
            return;
        };
        let links = std::mem::take(&mut self.link_ids);
        let nodes = std::mem::take(&mut self.node_ids);
        let Some(layout) = registry.get_mut(&key) else {
            return;
        };
        for id in &links {
            layout.remove_link(id);
        }
        for id in &nodes {
            // Already gone if another client removed it.
            let _ = layout.remove_node(id);
        }
    }

    /// Positions of this client's nodes, in contribution order.
    pub fn positions(&self, registry: &LayoutRegistry) -> IndexMap<String, Point> {
        let Some(layout) = self.layout_type.as_deref().and_then(|k| registry.get(k)) else {
            return IndexMap::new();
        };
        self.node_ids
            .iter()
            .filter_map(|id| layout.node(id).map(|n| (id.clone(), n.point())))
            .collect()
    }

    fn layout_mut<'r>(&self, registry: &'r mut LayoutRegistry) -> Result<&'r mut Layout> {
        self.layout_type
            .as_deref()
            .and_then(|k| registry.get_mut(k))
            .ok_or(Error::Detached)
    }

    /// Returns `false` when dragging is disabled for this graph.
    pub fn drag_start(
        &mut self,
        registry: &mut LayoutRegistry,
        node_id: &str,
        pointer: Point,
    ) -> Result<bool> {
        if !self.draggable {
            return Ok(false);
        }
        let layout = self.layout_mut(registry)?;
        self.drag.on_drag_start(layout, node_id, pointer)?;
        Ok(true)
    }

    pub fn drag_move(
        &mut self,
        registry: &mut LayoutRegistry,
        node_id: &str,
        pointer: Point,
    ) -> Result<DragMove> {
        let layout = self.layout_mut(registry)?;
        self.drag.on_drag_move(layout, node_id, pointer)
    }

    pub fn drag_end(&mut self, registry: &mut LayoutRegistry, node_id: &str) -> Result<DragEnd> {
        let layout = self.layout_mut(registry)?;
        self.drag.on_drag_end(layout, node_id)
    }
}
