//! Planar vector helpers and the bounded simulation area.

use nalgebra as na;
use serde::{Deserialize, Serialize};

pub type Vec2 = na::Vector2<f64>;

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn to_vec(self) -> Vec2 {
        Vec2::new(self.x, self.y)
    }
}

impl From<Vec2> for Point {
    fn from(v: Vec2) -> Self {
        Self { x: v.x, y: v.y }
    }
}

/// `sqrt(x² + y²)`.
pub fn vector_length(v: Vec2) -> f64 {
    (v.x * v.x + v.y * v.y).sqrt()
}

/// Vector pointing from `b` to `a`.
pub fn distance_vector(a: Vec2, b: Vec2) -> Vec2 {
    Vec2::new(a.x - b.x, a.y - b.y)
}

/// Plotting area every node is kept inside.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct SimBox {
    #[serde(default, alias = "x")]
    pub left: f64,
    #[serde(default, alias = "y")]
    pub top: f64,
    pub width: f64,
    pub height: f64,
}

impl SimBox {
    pub fn new(left: f64, top: f64, width: f64, height: f64) -> Self {
        Self {
            left,
            top,
            width,
            height,
        }
    }

    pub fn right(&self) -> f64 {
        self.left + self.width
    }

    pub fn bottom(&self) -> f64 {
        self.top + self.height
    }

    pub fn center(&self) -> Vec2 {
        Vec2::new(self.left + self.width / 2.0, self.top + self.height / 2.0)
    }

    pub fn area(&self) -> f64 {
        self.width * self.height
    }

    pub fn contains(&self, p: Vec2) -> bool {
        p.x >= self.left && p.x <= self.right() && p.y >= self.top && p.y <= self.bottom()
    }

    /// Clamp a node center so that a disc of `radius` stays inside the box.
    pub fn clamp(&self, p: Vec2, radius: f64) -> Vec2 {
        Vec2::new(
            clamp_axis(p.x, self.left + radius, self.right() - radius),
            clamp_axis(p.y, self.top + radius, self.bottom() - radius),
        )
    }
}

// `f64::clamp` panics on `lo > hi`; a box thinner than the node centers it instead. A
// non-finite coordinate is also centered.
fn clamp_axis(v: f64, lo: f64, hi: f64) -> f64 {
    if lo > hi || !v.is_finite() {
        return (lo + hi) / 2.0;
    }
    if v < lo {
        lo
    } else if v > hi {
        hi
    } else {
        v
    }
}
