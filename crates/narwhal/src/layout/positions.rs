use super::Layout;
use crate::config::{InitialPositions, PositionCallback};
use crate::geometry::Vec2;
use crate::graph::NodeKey;
use rustc_hash::FxHashSet;
use std::f64::consts::PI;

/// Deterministic stand-in for a random number in `[0, 1)`: the fractional part of `n² / π`.
pub fn unrandom(n: usize) -> f64 {
    let v = (n as f64).powi(2) / PI;
    v - v.floor()
}

impl Layout {
    /// Places every node that has no position yet. Nodes that do keep it but lose their momentum.
    pub(crate) fn init_positions(&mut self) {
        for node in self.nodes.values_mut().filter(|n| n.placed) {
            node.place(node.position);
        }
        match self.options.initial_positions.clone() {
            InitialPositions::Circle => self.set_circular_positions(),
            InitialPositions::Random => self.set_random_positions(),
            InitialPositions::Callback(callback) => self.set_callback_positions(&callback),
        }
    }

    /// Nodes go on a circle around the box center. Roots (no incoming links) come first, each
    /// followed by a depth-first walk over its outgoing links, then everything not reached.
    fn set_circular_positions(&mut self) {
        let order = self.circle_order();
        let angle = 2.0 * PI / (order.len() as f64 + 1.0);
        let radius = self.options.initial_position_radius;
        let center = self.area.center();
        for (index, key) in order.into_iter().enumerate() {
            let Some(node) = self.nodes.get_mut(key) else {
                continue;
            };
            if node.placed {
                continue;
            }
            let a = angle * index as f64;
            node.place(center + Vec2::new(a.cos(), a.sin()) * radius);
        }
    }

    fn circle_order(&self) -> Vec<NodeKey> {
        let mut order: Vec<NodeKey> = Vec::with_capacity(self.nodes.len());
        let mut visited: FxHashSet<NodeKey> = FxHashSet::default();
        let roots: Vec<NodeKey> = self
            .nodes
            .iter()
            .filter(|(_, n)| n.links_to.is_empty())
            .map(|(k, _)| k)
            .collect();

        for root in roots {
            if !visited.insert(root) {
                continue;
            }
            order.push(root);
            // (node, next outgoing link to follow)
            let mut stack: Vec<(NodeKey, usize)> = vec![(root, 0)];
            while let Some((key, next)) = stack.pop() {
                let Some(node) = self.nodes.get(key) else {
                    continue;
                };
                let Some(&link) = node.links_from.get(next) else {
                    continue;
                };
                stack.push((key, next + 1));
                let target = self.links.get(link).and_then(|l| l.to_node);
                if let Some(target) = target {
                    if visited.insert(target) {
                        order.push(target);
                        stack.push((target, 0));
                    }
                }
            }
        }

        for &key in self.nodes.keys() {
            if visited.insert(key) {
                order.push(key);
            }
        }
        order
    }

    fn set_random_positions(&mut self) {
        let area = self.area;
        let n = self.nodes.len();
        let keys: Vec<NodeKey> = self.nodes.keys().to_vec();
        for (index, key) in keys.into_iter().enumerate() {
            let Some(node) = self.nodes.get_mut(key) else {
                continue;
            };
            if node.placed {
                continue;
            }
            node.place(Vec2::new(
                area.left + area.width * unrandom(index),
                area.top + area.height * unrandom(n + 1 + index),
            ));
        }
    }

    fn set_callback_positions(&mut self, callback: &PositionCallback) {
        let area = self.area;
        let keys: Vec<NodeKey> = self.nodes.keys().to_vec();
        for (index, key) in keys.into_iter().enumerate() {
            let Some(node) = self.nodes.get_mut(key) else {
                continue;
            };
            if node.placed {
                continue;
            }
            let p = callback.call(index, &node.id, &area);
            node.place(p.to_vec());
        }
    }
}
