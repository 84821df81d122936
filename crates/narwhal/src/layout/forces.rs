use super::Layout;
use crate::config::Approximation;
use crate::forces::ForceCurves;
use crate::geometry::{Vec2, distance_vector, vector_length};
use crate::graph::{Node, NodeKey, mass_fractions};
use crate::integration::{Integration, Integrator, StepParams};
use crate::quadtree::{Body, CellKind, QuadTree};

impl Layout {
    pub(crate) fn step_params(&self) -> StepParams {
        StepParams {
            area: self.area,
            k: self.k,
            temperature: self.temperature,
            diff_temperature: self.diff_temperature,
            friction: self.options.friction,
            max_speed: self.options.max_speed,
            gravitational_constant: self.options.gravitational_constant,
        }
    }

    /// Rebuilds the Barnes-Hut tree from current positions.
    pub fn build_quad_tree(&mut self) {
        let bodies = self.nodes.iter().map(|(index, n)| Body {
            index,
            position: n.position,
            mass: n.mass,
        });
        self.quad_tree = Some(QuadTree::from_bodies(
            self.area,
            self.options.max_depth,
            bodies,
        ));
    }

    pub fn quad_tree(&self) -> Option<&QuadTree> {
        self.quad_tree.as_ref()
    }

    /// Mass-weighted centroid of all nodes.
    pub fn barycenter(&self) -> Option<Vec2> {
        let mut mass = 0.0;
        let mut weighted = Vec2::zeros();
        for (_, n) in self.nodes.iter() {
            mass += n.mass;
            weighted += n.position * n.mass;
        }
        (mass > 0.0).then(|| weighted / mass)
    }

    pub fn barycenter_forces(&mut self) {
        let Some(center) = self.barycenter() else {
            return;
        };
        let params = self.step_params();
        let integration = self.integration;
        for node in self.nodes.values_mut().filter(|n| !n.fixed) {
            integration.barycenter(node, center, &params);
        }
    }

    /// Pairwise repulsion, exact or through the quadtree depending on `approximation`.
    pub fn repulsive_forces(&mut self) {
        match self.options.approximation {
            Approximation::None => self.exact_repulsion(),
            Approximation::BarnesHut => {
                if self.quad_tree.is_none() {
                    self.build_quad_tree();
                }
                if let Some(tree) = self.quad_tree.take() {
                    self.barnes_hut_repulsion(&tree);
                    self.quad_tree = Some(tree);
                }
            }
        }
    }

    fn exact_repulsion(&mut self) {
        let params = self.step_params();
        let (integration, curves) = (self.integration, self.curves);
        let keys: Vec<NodeKey> = self.nodes.keys().to_vec();
        for &i in &keys {
            for &j in &keys {
                if i == j {
                    continue;
                }
                let Some((position, mass)) = self.nodes.get(j).map(|n| (n.position, n.mass)) else {
                    continue;
                };
                let Some(node) = self.nodes.get_mut(i) else {
                    continue;
                };
                if node.fixed {
                    break;
                }
                repel(integration, curves, &params, node, position, mass);
            }
        }
    }

    fn barnes_hut_repulsion(&mut self, tree: &QuadTree) {
        let params = self.step_params();
        let (integration, curves) = (self.integration, self.curves);
        let theta = self.options.theta;
        let keys: Vec<NodeKey> = self.nodes.keys().to_vec();
        for i in keys {
            let Some(node) = self.nodes.get_mut(i) else {
                continue;
            };
            if node.fixed {
                continue;
            }
            tree.visit(
                |_, cell| match &cell.kind {
                    CellKind::Empty => false,
                    CellKind::External { body, .. } => {
                        if body.index != i {
                            repel(integration, curves, &params, node, body.position, body.mass);
                        }
                        true
                    }
                    CellKind::Internal { .. } => {
                        let distance_r = vector_length(distance_vector(node.position, cell.center));
                        // A cell holding the node itself must be opened, whatever its aspect ratio.
                        let far = distance_r > 0.0
                            && !cell.area.contains(node.position)
                            && cell.size / distance_r < theta;
                        if far {
                            repel(integration, curves, &params, node, cell.center, cell.mass);
                        }
                        !far
                    }
                },
                |_, _| {},
            );
        }
    }

    /// Link attraction along every resolved link.
    pub fn attractive_forces(&mut self) {
        let params = self.step_params();
        let (integration, curves) = (self.integration, self.curves);
        for (_, link) in self.links.iter() {
            let Some((a, b)) = link.endpoints() else {
                continue;
            };
            let Some((from, to)) = self.nodes.pair_mut(a, b) else {
                continue;
            };
            let distance = distance_vector(from.position, to.position);
            let distance_r = vector_length(distance);
            if distance_r == 0.0 {
                continue;
            }
            let force = (curves.attractive)(distance_r, params.k);
            let mass = mass_fractions(from.mass, to.mass);
            integration.accumulate_attractive(from, to, mass, force, distance, distance_r, &params);
        }
    }

    /// Integrates accumulated forces, keeps nodes inside the box and clears the accumulators.
    pub fn apply_limits(&mut self) {
        let params = self.step_params();
        let integration = self.integration;
        let area = self.area;
        for node in self.nodes.values_mut().filter(|n| !n.fixed) {
            integration.advance(node, &params);
            node.position = area.clamp(node.position, node.radius);
            node.displacement = Vec2::zeros();
        }
    }
}

fn repel(
    integration: Integration,
    curves: ForceCurves,
    params: &StepParams,
    node: &mut Node,
    source: Vec2,
    source_mass: f64,
) {
    let distance = distance_vector(node.position, source);
    let distance_r = vector_length(distance);
    if distance_r == 0.0 {
        return;
    }
    let force = (curves.repulsive)(distance_r, params.k) * source_mass;
    integration.accumulate_repulsive(node, force, distance, distance_r, params);
}
