//! Force curves and the ideal edge length `k`.

use crate::geometry::SimBox;

/// Force magnitude as a function of the distance `d` between two bodies and the ideal length `k`.
pub type ForceFn = fn(d: f64, k: f64) -> f64;

#[derive(Clone, Copy)]
pub struct ForceCurves {
    pub attractive: ForceFn,
    pub repulsive: ForceFn,
}

impl std::fmt::Debug for ForceCurves {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ForceCurves").finish_non_exhaustive()
    }
}

impl ForceCurves {
    /// Fruchterman-Reingold curves: `d²/k` and `k²/d`.
    pub fn euler() -> Self {
        Self {
            attractive: euler_attractive,
            repulsive: euler_repulsive,
        }
    }

    /// Spring-like curves: `(k - d)/d`, with repulsion limited to bodies closer than `k`.
    pub fn verlet() -> Self {
        Self {
            attractive: verlet_attractive,
            repulsive: verlet_repulsive,
        }
    }
}

pub fn euler_attractive(d: f64, k: f64) -> f64 {
    d * d / k
}

pub fn euler_repulsive(d: f64, k: f64) -> f64 {
    k * k / d
}

pub fn verlet_attractive(d: f64, k: f64) -> f64 {
    (k - d) / d
}

pub fn verlet_repulsive(d: f64, k: f64) -> f64 {
    if d < k { (k - d) / d } else { 0.0 }
}

/// `(area / node_count)^exponent`. Callers guarantee `node_count > 0`.
pub fn ideal_length(area: &SimBox, node_count: usize, exponent: f64) -> f64 {
    debug_assert!(node_count > 0);
    (area.area() / node_count as f64).powf(exponent)
}
