use crate::error::{Error, Result};
use crate::geometry::Point;
use serde::{Deserialize, Serialize};

pub mod arena;
mod node;

pub use arena::Arena;
pub use node::{
    DEFAULT_NODE_MASS, Link, LinkKey, MIN_NODE_MASS, MassFractions, Node, NodeKey, mass_fractions,
};

/// Layout input: the node and link lists supplied by the data adapter.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Graph {
    #[serde(default)]
    pub nodes: Vec<NodeSpec>,
    #[serde(default)]
    pub links: Vec<LinkSpec>,
}

impl Graph {
    pub fn validate(&self) -> Result<()> {
        let mut node_exists: std::collections::BTreeSet<&str> = std::collections::BTreeSet::new();
        for n in &self.nodes {
            if !node_exists.insert(n.id.as_str()) {
                return Err(Error::DuplicateNode {
                    node_id: n.id.clone(),
                });
            }
        }
        for l in &self.links {
            if !node_exists.contains(l.from.as_str()) || !node_exists.contains(l.to.as_str()) {
                return Err(Error::MissingEndpoint { link_id: l.id() });
            }
        }
        Ok(())
    }

    /// Adds a bare node for every link endpoint that has no node entry, in link order.
    pub fn with_implicit_nodes(mut self) -> Self {
        let mut known: std::collections::BTreeSet<String> =
            self.nodes.iter().map(|n| n.id.clone()).collect();
        let mut implicit = Vec::new();
        for l in &self.links {
            for id in [&l.from, &l.to] {
                if known.insert(id.clone()) {
                    implicit.push(NodeSpec::new(id.clone()));
                }
            }
        }
        self.nodes.extend(implicit);
        self
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeSpec {
    pub id: String,
    #[serde(default)]
    pub mass: Option<f64>,
    #[serde(default)]
    pub marker_radius: Option<f64>,
    /// Initial position; nodes without one are placed by the initial-positions strategy.
    #[serde(default)]
    pub position: Option<Point>,
    #[serde(default)]
    pub fixed: bool,
}

impl NodeSpec {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            ..Default::default()
        }
    }

    pub fn with_mass(mut self, mass: f64) -> Self {
        self.mass = Some(mass);
        self
    }

    pub fn with_marker_radius(mut self, radius: f64) -> Self {
        self.marker_radius = Some(radius);
        self
    }

    pub fn at(mut self, x: f64, y: f64) -> Self {
        self.position = Some(Point::new(x, y));
        self
    }

    pub fn fixed(mut self) -> Self {
        self.fixed = true;
        self
    }

    /// Node mass, else node marker radius, else the series marker radius, else the default.
    pub fn resolve_mass(&self, series_marker_radius: Option<f64>) -> f64 {
        self.mass
            .or(self.marker_radius)
            .or(series_marker_radius)
            .unwrap_or(DEFAULT_NODE_MASS)
    }

    pub fn resolve_radius(&self, series_marker_radius: Option<f64>) -> f64 {
        self.marker_radius.or(series_marker_radius).unwrap_or(0.0)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LinkSpec {
    #[serde(default)]
    pub id: Option<String>,
    pub from: String,
    pub to: String,
    #[serde(default = "default_weight")]
    pub weight: f64,
}

fn default_weight() -> f64 {
    1.0
}

impl LinkSpec {
    pub fn new(from: impl Into<String>, to: impl Into<String>) -> Self {
        Self {
            id: None,
            from: from.into(),
            to: to.into(),
            weight: default_weight(),
        }
    }

    pub fn with_weight(mut self, weight: f64) -> Self {
        self.weight = weight;
        self
    }

    pub fn id(&self) -> String {
        self.id
            .clone()
            .unwrap_or_else(|| format!("{}->{}", self.from, self.to))
    }
}
