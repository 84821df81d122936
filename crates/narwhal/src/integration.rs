//! Numerical integration schemes.
//!
//! An integrator decides how a force is applied to a node (accumulated into `displacement`, or
//! applied straight to `position`) and how the node moves at the end of a step.

use crate::error::Error;
use crate::forces::ForceCurves;
use crate::geometry::{SimBox, Vec2, vector_length};
use crate::graph::{MassFractions, Node};
use serde::{Deserialize, Serialize};

/// Per-step values an integrator reads from the layout.
#[derive(Debug, Clone, Copy)]
pub struct StepParams {
    pub area: SimBox,
    pub k: f64,
    pub temperature: f64,
    pub diff_temperature: f64,
    pub friction: f64,
    pub max_speed: f64,
    pub gravitational_constant: f64,
}

pub trait Integrator {
    /// Exponent `p` in the derived ideal length `(area / n)^p`.
    fn k_exponent(&self) -> f64;

    fn default_curves(&self) -> ForceCurves;

    /// Gravity towards the mass-weighted centroid of all nodes.
    fn barycenter(&self, node: &mut Node, barycenter: Vec2, params: &StepParams);

    /// Repulsion on `node`; `distance` points away from the repelling body.
    fn accumulate_repulsive(
        &self,
        node: &mut Node,
        force: f64,
        distance: Vec2,
        distance_r: f64,
        params: &StepParams,
    );

    /// Link attraction; `distance` points from `to` to `from`.
    #[allow(clippy::too_many_arguments)]
    fn accumulate_attractive(
        &self,
        from: &mut Node,
        to: &mut Node,
        mass: MassFractions,
        force: f64,
        distance: Vec2,
        distance_r: f64,
        params: &StepParams,
    );

    /// Moves the node at the end of a step and updates its temperature.
    fn advance(&self, node: &mut Node, params: &StepParams);
}

/// Displacement accumulation with friction and temperature-limited steps.
#[derive(Debug, Clone, Copy, Default)]
pub struct Euler;

/// Position Verlet: forces move nodes directly, velocity is implied by the previous position.
#[derive(Debug, Clone, Copy, Default)]
pub struct Verlet;

impl Integrator for Euler {
    fn k_exponent(&self) -> f64 {
        0.3
    }

    fn default_curves(&self) -> ForceCurves {
        ForceCurves::euler()
    }

    fn barycenter(&self, node: &mut Node, barycenter: Vec2, params: &StepParams) {
        // Scaled by `degree * (1 + degree / 2)` so well-connected nodes do not drift away.
        let degree = node.degree as f64;
        let phi = degree * (1.0 + degree / 2.0);
        node.displacement += (barycenter - node.position) * params.gravitational_constant * phi / degree;
    }

    fn accumulate_repulsive(
        &self,
        node: &mut Node,
        force: f64,
        distance: Vec2,
        distance_r: f64,
        _params: &StepParams,
    ) {
        node.displacement += distance / distance_r * force / node.degree as f64;
    }

    fn accumulate_attractive(
        &self,
        from: &mut Node,
        to: &mut Node,
        mass: MassFractions,
        force: f64,
        distance: Vec2,
        distance_r: f64,
        _params: &StepParams,
    ) {
        let translated = distance / distance_r * force;
        if !from.fixed {
            from.displacement -= translated * mass.from / from.degree as f64;
        }
        if !to.fixed {
            to.displacement += translated * mass.to / to.degree as f64;
        }
    }

    fn advance(&self, node: &mut Node, params: &StepParams) {
        node.displacement += node.displacement * params.friction;
        let distance_r = vector_length(node.displacement);
        if !distance_r.is_finite() {
            node.temperature = 0.0;
            return;
        }
        node.temperature = distance_r;
        if distance_r == 0.0 {
            return;
        }
        let step = distance_r.min(params.temperature.max(0.0));
        node.position += node.displacement / distance_r * step;
    }
}

impl Integrator for Verlet {
    fn k_exponent(&self) -> f64 {
        0.5
    }

    fn default_curves(&self) -> ForceCurves {
        ForceCurves::verlet()
    }

    fn barycenter(&self, node: &mut Node, barycenter: Vec2, params: &StepParams) {
        // Shifts the whole system so its barycenter drifts towards the box center.
        let offset = (barycenter - params.area.center()) * params.gravitational_constant;
        node.position -= offset / node.mass / node.degree as f64;
    }

    fn accumulate_repulsive(
        &self,
        node: &mut Node,
        force: f64,
        distance: Vec2,
        _distance_r: f64,
        params: &StepParams,
    ) {
        let factor = force * params.diff_temperature / node.mass / node.degree as f64;
        node.position += distance * factor;
    }

    fn accumulate_attractive(
        &self,
        from: &mut Node,
        to: &mut Node,
        mass: MassFractions,
        force: f64,
        distance: Vec2,
        _distance_r: f64,
        params: &StepParams,
    ) {
        let translated = -distance * force * params.diff_temperature;
        if !from.fixed {
            from.position -= translated * mass.from / from.degree as f64;
        }
        if !to.fixed {
            to.position += translated * mass.to / to.degree as f64;
        }
    }

    fn advance(&self, node: &mut Node, params: &StepParams) {
        let friction = -params.friction;
        let current = node.position + node.displacement;
        let raw = (current - node.previous_position) * friction;
        let diff = Vec2::new(
            limit_speed(raw.x, params.max_speed),
            limit_speed(raw.y, params.max_speed),
        );
        node.previous_position = current;
        node.position += diff;
        node.temperature = vector_length(diff);
    }
}

// A zero component keeps a +1 sign so it never turns into NaN.
fn limit_speed(v: f64, max_speed: f64) -> f64 {
    let sign = if v < 0.0 { -1.0 } else { 1.0 };
    sign * v.abs().min(max_speed)
}

/// Integration scheme selected once per layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Integration {
    #[default]
    Euler,
    Verlet,
}

impl Integration {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Euler => "euler",
            Self::Verlet => "verlet",
        }
    }
}

impl std::str::FromStr for Integration {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "euler" => Ok(Self::Euler),
            "verlet" => Ok(Self::Verlet),
            _ => Err(Error::UnknownIntegration {
                value: s.to_string(),
            }),
        }
    }
}

impl Integrator for Integration {
    fn k_exponent(&self) -> f64 {
        match self {
            Self::Euler => Euler.k_exponent(),
            Self::Verlet => Verlet.k_exponent(),
        }
    }

    fn default_curves(&self) -> ForceCurves {
        match self {
            Self::Euler => Euler.default_curves(),
            Self::Verlet => Verlet.default_curves(),
        }
    }

    fn barycenter(&self, node: &mut Node, barycenter: Vec2, params: &StepParams) {
        match self {
            Self::Euler => Euler.barycenter(node, barycenter, params),
            Self::Verlet => Verlet.barycenter(node, barycenter, params),
        }
    }

    fn accumulate_repulsive(
        &self,
        node: &mut Node,
        force: f64,
        distance: Vec2,
        distance_r: f64,
        params: &StepParams,
    ) {
        match self {
            Self::Euler => Euler.accumulate_repulsive(node, force, distance, distance_r, params),
            Self::Verlet => Verlet.accumulate_repulsive(node, force, distance, distance_r, params),
        }
    }

    fn accumulate_attractive(
        &self,
        from: &mut Node,
        to: &mut Node,
        mass: MassFractions,
        force: f64,
        distance: Vec2,
        distance_r: f64,
        params: &StepParams,
    ) {
        match self {
            Self::Euler => {
                Euler.accumulate_attractive(from, to, mass, force, distance, distance_r, params)
            }
            Self::Verlet => {
                Verlet.accumulate_attractive(from, to, mass, force, distance, distance_r, params)
            }
        }
    }

    fn advance(&self, node: &mut Node, params: &StepParams) {
        match self {
            Self::Euler => Euler.advance(node, params),
            Self::Verlet => Verlet.advance(node, params),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Point;

    fn params() -> StepParams {
        StepParams {
            area: SimBox::new(0.0, 0.0, 100.0, 100.0),
            k: 10.0,
            temperature: 2.0,
            diff_temperature: 0.1,
            friction: -0.981,
            max_speed: 10.0,
            gravitational_constant: 0.0625,
        }
    }

    fn node_at(x: f64, y: f64) -> Node {
        Node::new("n".into(), 4.0, 0.0, Some(Point::new(x, y)))
    }

    #[test]
    fn euler_step_is_limited_by_temperature() {
        let mut n = node_at(10.0, 10.0);
        n.displacement = Vec2::new(3000.0, 4000.0);
        Euler.advance(&mut n, &params());

        // Friction keeps 1.9% of the displacement: |(57, 76)| = 95.
        assert!((n.temperature - 95.0).abs() < 1e-9);
        assert!((n.position - Vec2::new(11.2, 11.6)).norm() < 1e-9);
    }

    #[test]
    fn euler_zero_displacement_means_no_movement() {
        let mut n = node_at(10.0, 10.0);
        Euler.advance(&mut n, &params());
        assert_eq!(n.position, Vec2::new(10.0, 10.0));
        assert_eq!(n.temperature, 0.0);
    }

    #[test]
    fn euler_rejects_non_finite_displacement() {
        let mut n = node_at(10.0, 10.0);
        n.displacement = Vec2::new(f64::INFINITY, 3.0);
        Euler.advance(&mut n, &params());
        assert_eq!(n.position, Vec2::new(10.0, 10.0));
        assert_eq!(n.temperature, 0.0);
    }

    #[test]
    fn verlet_clamps_each_component_to_max_speed() {
        let mut n = node_at(50.0, 50.0);
        n.previous_position = Vec2::new(20.0, 50.0);
        Verlet.advance(&mut n, &params());

        assert_eq!(n.previous_position, Vec2::new(50.0, 50.0));
        assert_eq!(n.position, Vec2::new(60.0, 50.0));
        assert_eq!(n.temperature, 10.0);
    }

    #[test]
    fn verlet_with_no_momentum_stays_put() {
        let mut n = node_at(50.0, 50.0);
        Verlet.advance(&mut n, &params());
        assert_eq!(n.position, Vec2::new(50.0, 50.0));
        assert!(n.position.x.is_finite() && n.position.y.is_finite());
    }

    #[test]
    fn integration_parses_case_insensitively_and_rejects_unknown_names() {
        assert_eq!("Verlet".parse::<Integration>().unwrap(), Integration::Verlet);
        assert!(matches!(
            "runge-kutta".parse::<Integration>(),
            Err(Error::UnknownIntegration { .. })
        ));
    }
}
