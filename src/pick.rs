//! Object picking against placed blocks.
//!
//! The raycaster holds a single ray (usually the viewer's gaze or the screen
//! centre, set by the host every frame) and a list of intersections with
//! every block in the scene graph:
//! 1. Transform the ray into the block's local space (undoing rotation and position)
//! 2. Intersect it with the block's axis-aligned box using the slab method
//! 3. Map the local hit distance back to a world-space point
//! 4. Sort all hits so that index 0 is the nearest one

use cgmath::{InnerSpace, Rotation, Vector3};

use crate::data_structures::{block::BlockId, scene_graph::SceneGraph};

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Ray {
    pub origin: Vector3<f32>,
    pub direction: Vector3<f32>,
}

impl Ray {
    /// Creates a ray. The direction is normalized so that hit distances are in world units.
    pub fn new(origin: Vector3<f32>, direction: Vector3<f32>) -> Self {
        let direction = if direction.magnitude2() > 0.0 {
            direction.normalize()
        } else {
            direction
        };
        Self { origin, direction }
    }

    pub fn at(&self, t: f32) -> Vector3<f32> {
        self.origin + self.direction * t
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Intersection {
    pub distance: f32,
    pub point: Vector3<f32>,
    pub block: BlockId,
}

#[derive(Debug, Default)]
pub struct Raycaster {
    ray: Option<Ray>,
    /// Maximum hit distance, `None` means unlimited.
    pub far: Option<f32>,
    intersections: Vec<Intersection>,
}

impl Raycaster {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_ray(&mut self, ray: Ray) {
        self.ray = Some(ray);
    }

    pub fn ray(&self) -> Option<&Ray> {
        self.ray.as_ref()
    }

    /// Recomputes the intersection list against every block in `scene`.
    ///
    /// Without a ray the list is empty.
    pub fn refresh_objects(&mut self, scene: &SceneGraph) {
        self.intersections.clear();
        let Some(ray) = self.ray else {
            return;
        };
        self.intersections.extend(scene.blocks().filter_map(|block| {
            let distance = ray_hits_obb(
                &ray,
                block.instance.position,
                block.instance.quaternion(),
                block.half_extents(),
            )?;
            if self.far.is_some_and(|far| distance > far) {
                return None;
            }
            Some(Intersection {
                distance,
                point: ray.at(distance),
                block: block.id,
            })
        }));
        self.intersections
            .sort_by(|a, b| a.distance.total_cmp(&b.distance));
    }

    /// Intersections ordered nearest-first.
    pub fn intersections(&self) -> &[Intersection] {
        &self.intersections
    }
}

/// Distance along `ray` to an oriented box, or `None` if it misses.
pub fn ray_hits_obb(
    ray: &Ray,
    center: Vector3<f32>,
    rotation: cgmath::Quaternion<f32>,
    half_extents: Vector3<f32>,
) -> Option<f32> {
    let inv = rotation.invert();
    let o_local = inv.rotate_vector(ray.origin - center);
    let d_local = inv.rotate_vector(ray.direction);
    ray_aabb_hit_t(o_local, d_local, -half_extents, half_extents)
}

// Slab-method ray–AABB intersection, returns Some(t) or None
pub fn ray_aabb_hit_t(
    ray_origin: Vector3<f32>,
    ray_direction: Vector3<f32>,
    min: Vector3<f32>,
    max: Vector3<f32>,
) -> Option<f32> {
    let mut tmin = f32::NEG_INFINITY;
    let mut tmax = f32::INFINITY;
    for axis in 0..3 {
        let (o, d) = (ray_origin[axis], ray_direction[axis]);
        if d == 0.0 {
            // parallel to the slab: must already be inside it
            if o < min[axis] || o > max[axis] {
                return None;
            }
            continue;
        }
        let inv = 1.0 / d;
        let mut t0 = (min[axis] - o) * inv;
        let mut t1 = (max[axis] - o) * inv;
        if t0 > t1 {
            std::mem::swap(&mut t0, &mut t1);
        }
        tmin = tmin.max(t0);
        tmax = tmax.min(t1);
        if tmin > tmax {
            return None;
        }
    }
    if tmax < 0.0 {
        return None;
    }
    Some(if tmin >= 0.0 { tmin } else { tmax })
}
