//! Layout options, as found under `layoutAlgorithm` in chart configuration.

use crate::error::{Error, Result};
use crate::forces::ForceCurves;
use crate::geometry::{Point, SimBox};
use crate::integration::Integration;
use crate::quadtree::DEFAULT_MAX_DEPTH;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;

pub const DEFAULT_LAYOUT_TYPE: &str = "reingold-fruchterman";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Approximation {
    #[default]
    None,
    BarnesHut,
}

impl std::str::FromStr for Approximation {
    type Err = Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "none" => Ok(Self::None),
            "barnes-hut" => Ok(Self::BarnesHut),
            _ => Err(Error::UnknownApproximation {
                value: s.to_string(),
            }),
        }
    }
}

/// Places a node that has no position yet: `(node index, node id, simulation box) -> position`.
#[derive(Clone)]
pub struct PositionCallback(Arc<dyn Fn(usize, &str, &SimBox) -> Point + Send + Sync>);

impl PositionCallback {
    pub fn new(f: impl Fn(usize, &str, &SimBox) -> Point + Send + Sync + 'static) -> Self {
        Self(Arc::new(f))
    }

    pub fn call(&self, index: usize, id: &str, area: &SimBox) -> Point {
        (self.0)(index, id, area)
    }
}

impl std::fmt::Debug for PositionCallback {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("PositionCallback(..)")
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InitialPositions {
    /// Small circle around the box center, ordered by a walk from the root nodes.
    #[default]
    Circle,
    /// Deterministic quasi-random spread keyed by node index.
    Random,
    #[serde(skip)]
    Callback(PositionCallback),
}

impl std::str::FromStr for InitialPositions {
    type Err = Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "circle" => Ok(Self::Circle),
            "random" => Ok(Self::Random),
            _ => Err(Error::UnknownInitialPositions {
                value: s.to_string(),
            }),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ForceKind {
    Barycenter,
    Repulsive,
    Attractive,
}

/// Which force phases run. They always run in the order barycenter, repulsive, attractive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Vec<ForceKind>", into = "Vec<ForceKind>")]
pub struct ForceSet {
    pub barycenter: bool,
    pub repulsive: bool,
    pub attractive: bool,
}

impl Default for ForceSet {
    fn default() -> Self {
        Self {
            barycenter: true,
            repulsive: true,
            attractive: true,
        }
    }
}

impl ForceSet {
    pub fn only(kinds: &[ForceKind]) -> Self {
        Self::from(kinds.to_vec())
    }

    pub fn contains(&self, kind: ForceKind) -> bool {
        match kind {
            ForceKind::Barycenter => self.barycenter,
            ForceKind::Repulsive => self.repulsive,
            ForceKind::Attractive => self.attractive,
        }
    }
}

impl From<Vec<ForceKind>> for ForceSet {
    fn from(kinds: Vec<ForceKind>) -> Self {
        Self {
            barycenter: kinds.contains(&ForceKind::Barycenter),
            repulsive: kinds.contains(&ForceKind::Repulsive),
            attractive: kinds.contains(&ForceKind::Attractive),
        }
    }
}

impl From<ForceSet> for Vec<ForceKind> {
    fn from(set: ForceSet) -> Self {
        [ForceKind::Barycenter, ForceKind::Repulsive, ForceKind::Attractive]
            .into_iter()
            .filter(|&k| set.contains(k))
            .collect()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LayoutOptions {
    /// Registry key; series sharing a type share one layout.
    #[serde(rename = "type")]
    pub layout_type: String,
    pub integration: Integration,
    pub approximation: Approximation,
    /// Barnes-Hut opening threshold (cell size / distance).
    pub theta: f64,
    /// Verlet per-axis speed limit.
    pub max_speed: f64,
    /// Negative damping coefficient.
    pub friction: f64,
    pub gravitational_constant: f64,
    pub max_iterations: usize,
    /// Fixed ideal edge length; derived from the box and node count when unset.
    pub link_length: Option<f64>,
    pub initial_positions: InitialPositions,
    pub initial_position_radius: f64,
    /// Animate step by step (frame-paced) instead of running to completion synchronously.
    pub enable_simulation: bool,
    /// Quadtree depth budget.
    pub max_depth: usize,
    /// Series-level marker radius: fallback for node mass and node radius.
    pub marker_radius: Option<f64>,
    pub draggable: bool,
    /// Keep nodes pinned after they are dropped.
    pub fixed_draggable: bool,
    pub forces: ForceSet,
    #[serde(skip)]
    pub force_curves: Option<ForceCurves>,
}

impl Default for LayoutOptions {
    fn default() -> Self {
        Self {
            layout_type: DEFAULT_LAYOUT_TYPE.to_string(),
            integration: Integration::Euler,
            approximation: Approximation::None,
            theta: 0.5,
            max_speed: 10.0,
            friction: -0.981,
            gravitational_constant: 0.0625,
            max_iterations: 1000,
            link_length: None,
            initial_positions: InitialPositions::Circle,
            initial_position_radius: 1.0,
            enable_simulation: false,
            max_depth: DEFAULT_MAX_DEPTH,
            marker_radius: None,
            draggable: true,
            fixed_draggable: false,
            forces: ForceSet::default(),
            force_curves: None,
        }
    }
}

impl LayoutOptions {
    pub fn from_json(text: &str) -> Result<Self> {
        let value: Value = serde_json::from_str(text).map_err(|e| Error::InvalidConfig {
            message: e.to_string(),
        })?;
        Self::from_value(value)
    }

    /// Parses and validates options. Unknown scheme names are reported with their dedicated
    /// error rather than a generic serde message.
    pub fn from_value(value: Value) -> Result<Self> {
        if let Some(v) = value.get("integration").and_then(Value::as_str) {
            v.parse::<Integration>()?;
        }
        if let Some(v) = value.get("approximation").and_then(Value::as_str) {
            v.parse::<Approximation>()?;
        }
        if let Some(v) = value.get("initialPositions").and_then(Value::as_str) {
            v.parse::<InitialPositions>()?;
        }
        let opts: Self = serde_json::from_value(value).map_err(|e| Error::InvalidConfig {
            message: e.to_string(),
        })?;
        opts.validate()?;
        Ok(opts)
    }

    pub fn validate(&self) -> Result<()> {
        check("theta", self.theta, |v| v > 0.0)?;
        check("maxSpeed", self.max_speed, |v| v >= 0.0)?;
        check("friction", self.friction, |_| true)?;
        check("gravitationalConstant", self.gravitational_constant, |_| true)?;
        check("initialPositionRadius", self.initial_position_radius, |v| v >= 0.0)?;
        if let Some(l) = self.link_length {
            check("linkLength", l, |v| v > 0.0)?;
        }
        if let Some(r) = self.marker_radius {
            check("markerRadius", r, |v| v >= 0.0)?;
        }
        Ok(())
    }

    pub fn with_integration(mut self, integration: Integration) -> Self {
        self.integration = integration;
        self
    }

    pub fn with_approximation(mut self, approximation: Approximation) -> Self {
        self.approximation = approximation;
        self
    }

    pub fn with_initial_positions(mut self, initial_positions: InitialPositions) -> Self {
        self.initial_positions = initial_positions;
        self
    }

    pub fn with_force_curves(mut self, curves: ForceCurves) -> Self {
        self.force_curves = Some(curves);
        self
    }

    pub fn with_forces(mut self, forces: ForceSet) -> Self {
        self.forces = forces;
        self
    }

    /// Curves in effect: the override if set, else the integration scheme's own.
    pub fn curves(&self) -> ForceCurves {
        use crate::integration::Integrator;
        self.force_curves
            .unwrap_or_else(|| self.integration.default_curves())
    }
}

fn check(name: &'static str, value: f64, ok: impl Fn(f64) -> bool) -> Result<()> {
    if value.is_finite() && ok(value) {
        Ok(())
    } else {
        Err(Error::InvalidOption { name, value })
    }
}
