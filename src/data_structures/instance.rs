//! Instance transformation data for placed blocks and the placement cursor.
//!
//! Positions are in world units, rotations are Euler angles in degrees the
//! way the host scene expresses its `rotation` attribute. Snapping to the
//! placement grid happens here so that every committed transform lands on
//! the same lattice.

use cgmath::{Deg, Euler, One, Quaternion, Vector3};
use serde::Serialize;

/// Snap a scalar to the nearest multiple of `step`.
///
/// Computed as `round(value * (1 / step)) / (1 / step)` in `f64`, ties
/// rounding towards positive infinity like the host's `Math.round`. Exact
/// ties such as `1.25` or `-1.25` match the host. Values that are ties only
/// in decimal (`-0.05`, `-199.55`) resolve by their `f32` representation.
pub fn snap(value: f32, step: f32) -> f32 {
    if step <= 0.0 {
        return value;
    }
    let inv = f64::from(1.0 / step);
    ((f64::from(value) * inv + 0.5).floor() / inv) as f32
}

/// Snap every component of a vector to the grid.
pub fn snap_vec(v: Vector3<f32>, step: f32) -> Vector3<f32> {
    Vector3::new(snap(v.x, step), snap(v.y, step), snap(v.z, step))
}

/// Per-object transformation: position, rotation (Euler degrees) and scale.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Instance {
    pub position: Vector3<f32>,
    pub rotation: Vector3<f32>,
    pub scale: Vector3<f32>,
}

impl Instance {
    /// Create a new instance with identity transformation (no move, rotate, or scale).
    pub fn new() -> Self {
        Self {
            position: Vector3::new(0.0, 0.0, 0.0),
            rotation: Vector3::new(0.0, 0.0, 0.0),
            scale: Vector3::new(1.0, 1.0, 1.0),
        }
    }

    pub fn with_uniform_scale(mut self, scale: f32) -> Self {
        self.scale = Vector3::new(scale, scale, scale);
        self
    }

    pub fn quaternion(&self) -> Quaternion<f32> {
        if self.rotation == Vector3::new(0.0, 0.0, 0.0) {
            return Quaternion::one();
        }
        Quaternion::from(Euler {
            x: Deg(self.rotation.x),
            y: Deg(self.rotation.y),
            z: Deg(self.rotation.z),
        })
    }

    /// Returns a copy with position and rotation snapped to the grid. Scale is kept.
    pub fn snapped(&self, step: f32) -> Self {
        Self {
            position: snap_vec(self.position, step),
            rotation: snap_vec(self.rotation, step),
            scale: self.scale,
        }
    }
}

impl From<Vector3<f32>> for Instance {
    fn from(position: Vector3<f32>) -> Self {
        Instance {
            position,
            ..Default::default()
        }
    }
}

impl Default for Instance {
    fn default() -> Self {
        Self::new()
    }
}
