use crate::geometry::{Point, Vec2};

pub type NodeKey = usize;
pub type LinkKey = usize;

/// Fallback mass when neither the node nor the series carries one.
pub const DEFAULT_NODE_MASS: f64 = 4.0;
/// Masses are floored here so `1 / mass` terms stay finite.
pub const MIN_NODE_MASS: f64 = 0.01;

/// A node as tracked by the simulation.
#[derive(Debug, Clone)]
pub struct Node {
    pub id: String,
    pub mass: f64,
    /// `max(in, out)` link count, at least 1.
    pub degree: usize,
    /// Rendering radius; only used to keep the node inside the box.
    pub radius: f64,
    pub position: Vec2,
    /// Position after the previous integration (Verlet).
    pub previous_position: Vec2,
    /// Force accumulator for the current step (Euler).
    pub displacement: Vec2,
    /// Length of the last step's movement.
    pub temperature: f64,
    /// Pinned nodes are skipped by every force and by integration.
    pub fixed: bool,
    pub(crate) placed: bool,
    pub(crate) links_from: Vec<LinkKey>,
    pub(crate) links_to: Vec<LinkKey>,
}

impl Node {
    pub(crate) fn new(id: String, mass: f64, radius: f64, position: Option<Point>) -> Self {
        let p = position.map(Point::to_vec).unwrap_or_else(Vec2::zeros);
        Self {
            id,
            mass: sanitize_mass(mass),
            degree: 1,
            radius: if radius.is_finite() { radius.max(0.0) } else { 0.0 },
            position: p,
            previous_position: p,
            displacement: Vec2::zeros(),
            temperature: 0.0,
            fixed: false,
            placed: position.is_some(),
            links_from: Vec::new(),
            links_to: Vec::new(),
        }
    }

    pub fn point(&self) -> Point {
        self.position.into()
    }

    pub fn is_placed(&self) -> bool {
        self.placed
    }

    pub fn links_from(&self) -> &[LinkKey] {
        &self.links_from
    }

    pub fn links_to(&self) -> &[LinkKey] {
        &self.links_to
    }

    pub(crate) fn refresh_degree(&mut self) {
        self.degree = self.links_from.len().max(self.links_to.len()).max(1);
    }

    /// Moves the node to `p` and forgets its momentum.
    pub(crate) fn place(&mut self, p: Vec2) {
        self.position = p;
        self.previous_position = p;
        self.displacement = Vec2::zeros();
        self.placed = true;
    }
}

fn sanitize_mass(mass: f64) -> f64 {
    if mass.is_finite() {
        mass.max(MIN_NODE_MASS)
    } else {
        DEFAULT_NODE_MASS
    }
}

/// A directed, weighted link. Endpoints are resolved lazily: a link may name a node that is not
/// registered yet and is skipped by the attractive phase until it is.
#[derive(Debug, Clone)]
pub struct Link {
    pub id: String,
    pub from: String,
    pub to: String,
    pub weight: f64,
    pub(crate) from_node: Option<NodeKey>,
    pub(crate) to_node: Option<NodeKey>,
}

impl Link {
    pub fn endpoints(&self) -> Option<(NodeKey, NodeKey)> {
        Some((self.from_node?, self.to_node?))
    }

    pub fn is_resolved(&self) -> bool {
        self.endpoints().is_some()
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MassFractions {
    pub from: f64,
    pub to: f64,
}

/// `1 - m / (m_from + m_to)` per endpoint: the lighter node gets the larger share.
pub fn mass_fractions(m_from: f64, m_to: f64) -> MassFractions {
    let sum = m_from + m_to;
    MassFractions {
        from: 1.0 - m_from / sum,
        to: 1.0 - m_to / sum,
    }
}
