//! Per-frame placement cursor arbitration.
//!
//! Every frame the cursor either follows the nearest block under the ray
//! (and that block becomes the delete candidate) or the first real-world
//! surface hit of the AR session. A block hit always wins: distances to the
//! block and to the surface are not compared.

use cgmath::Vector3;

use crate::{
    context::Context,
    data_structures::{
        block::BlockId,
        instance::{Instance, snap, snap_vec},
        scene_graph::SceneGraph,
    },
    pick::{Intersection, Raycaster},
    session::ArSession,
    xr::XrFrame,
};

/// What drove the cursor in a frame.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Tick {
    /// No render frame was available, nothing happened.
    NoFrame,
    /// The ray hit a block. Surface hit-testing was skipped.
    Block {
        target: BlockId,
        position: Vector3<f32>,
    },
    /// The cursor moved onto a detected surface.
    Surface { position: Vector3<f32> },
    /// Neither a block nor a surface was hit; the cursor stayed where it was.
    Idle,
}

#[derive(Debug, Default)]
pub struct PlacementController {
    cursor: Instance,
    delete_target: Option<BlockId>,
    raycaster: Raycaster,
}

impl PlacementController {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cursor(&self) -> &Instance {
        &self.cursor
    }

    pub fn cursor_mut(&mut self) -> &mut Instance {
        &mut self.cursor
    }

    pub fn delete_target(&self) -> Option<BlockId> {
        self.delete_target
    }

    pub fn raycaster(&self) -> &Raycaster {
        &self.raycaster
    }

    pub fn raycaster_mut(&mut self) -> &mut Raycaster {
        &mut self.raycaster
    }

    /// Forgets the delete candidate without touching its opacity.
    ///
    /// Used after the candidate itself was deleted.
    pub fn forget_delete_target(&mut self, id: BlockId) {
        if self.delete_target == Some(id) {
            self.delete_target = None;
        }
    }

    pub fn tick(
        &mut self,
        ctx: &Context,
        scene: &mut SceneGraph,
        session: &ArSession,
        frame: Option<&dyn XrFrame>,
    ) -> Tick {
        let Some(frame) = frame else {
            return Tick::NoFrame;
        };

        self.raycaster.refresh_objects(scene);
        if let Some(&nearest) = self.raycaster.intersections().first() {
            return self.follow_block(ctx, scene, nearest);
        }

        self.clear_delete_target(scene);

        let Some(source) = session.hit_test_source() else {
            return Tick::Idle;
        };
        let base_space = frame.base_space();
        let pose = frame
            .hit_test_results(source)
            .first()
            .and_then(|result| result.pose(base_space));
        match pose {
            Some(pose) => {
                let p = pose.position;
                let position = Vector3::new(
                    snap(p.x, ctx.grid_step),
                    snap(p.y + ctx.surface_lift, ctx.grid_step),
                    snap(p.z, ctx.grid_step),
                );
                // TODO: align the cursor with pose.orientation once tilted surfaces are supported
                self.cursor.position = position;
                Tick::Surface { position }
            }
            None => Tick::Idle,
        }
    }

    fn follow_block(
        &mut self,
        ctx: &Context,
        scene: &mut SceneGraph,
        nearest: Intersection,
    ) -> Tick {
        let position = snap_vec(nearest.point, ctx.grid_step);
        self.cursor.position = position;

        let target = nearest.block;
        if self.delete_target != Some(target) {
            if let Some(previous) = self.delete_target {
                scene.set_opacity(previous, 1.0);
            }
            scene.set_opacity(target, ctx.highlight_opacity);
            log::debug!("Delete candidate is now {}", target);
            self.delete_target = Some(target);
        }
        Tick::Block { target, position }
    }

    fn clear_delete_target(&mut self, scene: &mut SceneGraph) {
        if let Some(previous) = self.delete_target.take() {
            scene.set_opacity(previous, 1.0);
            log::debug!("Delete candidate {} cleared", previous);
        }
    }
}
