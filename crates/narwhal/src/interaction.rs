//! Node dragging: temporary pinning plus re-simulation bursts.

use crate::error::{Error, Result};
use crate::geometry::{Point, Vec2};
use crate::layout::{Layout, RestartMode};
use rustc_hash::FxHashMap;
use tracing::debug;

/// Pointer travel (per axis, in pixels) below which a drag is still treated as a click.
pub const DRAG_THRESHOLD: f64 = 5.0;

#[derive(Debug, Clone, Copy)]
struct DragAnchor {
    pointer: Point,
    position: Vec2,
    moved: bool,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DragMove {
    /// Inside the dead zone, outside the box, or no drag in progress.
    Ignored,
    Moved { position: Point },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DragEnd {
    NotDragging,
    /// The node never left the dead zone.
    Released,
    /// Animated layout: the simulation was restarted.
    Restarted,
    /// Static layout: a single redraw was requested.
    Redrawn,
}

#[derive(Debug, Clone, Default)]
pub struct DragController {
    fixed_draggable: bool,
    anchors: FxHashMap<String, DragAnchor>,
}

impl DragController {
    pub fn new(fixed_draggable: bool) -> Self {
        Self {
            fixed_draggable,
            anchors: FxHashMap::default(),
        }
    }

    pub fn fixed_draggable(&self) -> bool {
        self.fixed_draggable
    }

    pub fn is_dragging(&self, node_id: &str) -> bool {
        self.anchors.contains_key(node_id)
    }

    /// Records the anchor and pins the node.
    pub fn on_drag_start(&mut self, layout: &mut Layout, node_id: &str, pointer: Point) -> Result<()> {
        let position = layout
            .node(node_id)
            .map(|n| n.position)
            .ok_or_else(|| Error::UnknownNode {
                node_id: node_id.to_string(),
            })?;
        layout.pin_node(node_id)?;
        self.anchors.insert(
            node_id.to_string(),
            DragAnchor {
                pointer,
                position,
                moved: false,
            },
        );
        Ok(())
    }

    pub fn on_drag_move(
        &mut self,
        layout: &mut Layout,
        node_id: &str,
        pointer: Point,
    ) -> Result<DragMove> {
        let Some(anchor) = self.anchors.get_mut(node_id) else {
            return Ok(DragMove::Ignored);
        };
        let delta = Vec2::new(pointer.x - anchor.pointer.x, pointer.y - anchor.pointer.y);
        if delta.x.abs() <= DRAG_THRESHOLD && delta.y.abs() <= DRAG_THRESHOLD {
            return Ok(DragMove::Ignored);
        }
        let target = anchor.position + delta;
        if !layout.area().contains(target) {
            return Ok(DragMove::Ignored);
        }
        anchor.moved = true;
        layout.move_pinned_node(node_id, target.x, target.y)?;
        layout.restart_simulation(RestartMode::Dragging);
        Ok(DragMove::Moved {
            position: target.into(),
        })
    }

    pub fn on_drag_end(&mut self, layout: &mut Layout, node_id: &str) -> Result<DragEnd> {
        let Some(anchor) = self.anchors.remove(node_id) else {
            return Ok(DragEnd::NotDragging);
        };
        let outcome = if !anchor.moved {
            DragEnd::Released
        } else if layout.simulation_enabled() {
            layout.start();
            DragEnd::Restarted
        } else {
            layout.request_redraw();
            DragEnd::Redrawn
        };
        if !self.fixed_draggable {
            layout.release_node(node_id)?;
        }
        debug!(node = node_id, ?outcome, "drag ended");
        Ok(outcome)
    }
}
