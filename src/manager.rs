//! Block creation and removal.
//!
//! The [`BlockManager`] owns the appearance selection (texture picker and
//! colour picker) and turns placement requests into blocks in the scene
//! graph.

use cgmath::Vector3;

use crate::{
    context::Context,
    data_structures::{
        block::{Appearance, Block, BlockId, Rgb},
        instance::Instance,
        scene_graph::SceneGraph,
    },
};

/// State of the texture picker and the colour picker.
///
/// The two pickers are mutually exclusive: picking a colour switches the
/// texture picker to the colour sentinel texture.
#[derive(Clone, Debug, PartialEq)]
pub struct AppearanceSelection {
    texture: String,
    color: Rgb,
}

impl AppearanceSelection {
    pub fn new(texture: impl Into<String>, color: Rgb) -> Self {
        Self {
            texture: texture.into(),
            color,
        }
    }

    pub fn texture(&self) -> &str {
        &self.texture
    }

    pub fn color(&self) -> Rgb {
        self.color
    }

    pub fn select_texture(&mut self, texture: impl Into<String>) {
        self.texture = texture.into();
    }

    pub fn select_color(&mut self, ctx: &Context, color: Rgb) {
        self.color = color;
        self.texture = ctx.color_block_texture.clone();
    }

    /// The appearance a block created right now would get.
    pub fn current(&self, ctx: &Context) -> Appearance {
        if self.texture == ctx.color_block_texture {
            Appearance::Color(self.color)
        } else {
            Appearance::Texture(self.texture.clone())
        }
    }

    /// CSS background of the texture picker for the current selection.
    pub fn picker_background(&self, ctx: &Context) -> String {
        format!("url({}{})", ctx.image_dir, self.texture)
    }
}

#[derive(Debug)]
pub struct BlockManager {
    selection: AppearanceSelection,
}

impl BlockManager {
    pub fn new(selection: AppearanceSelection) -> Self {
        Self { selection }
    }

    pub fn selection(&self) -> &AppearanceSelection {
        &self.selection
    }

    pub fn selection_mut(&mut self) -> &mut AppearanceSelection {
        &mut self.selection
    }

    /// Places a new block at the given position and rotation (Euler degrees).
    ///
    /// Both are snapped to the grid before the block is committed.
    pub fn put_block(
        &self,
        ctx: &Context,
        scene: &mut SceneGraph,
        position: Vector3<f32>,
        rotation: Vector3<f32>,
    ) -> BlockId {
        let instance = Instance {
            position,
            rotation,
            ..Default::default()
        }
        .snapped(ctx.grid_step)
        .with_uniform_scale(ctx.block_scale);
        let block = Block::new(instance, self.selection.current(ctx));
        log::info!(
            "Placing block {} at ({:.1}, {:.1}, {:.1}) with {:?}",
            block.id,
            block.instance.position.x,
            block.instance.position.y,
            block.instance.position.z,
            block.appearance
        );
        scene.insert(block)
    }

    /// Removes `target` from the scene. `None` and unknown blocks are a no-op.
    pub fn delete_block(&self, scene: &mut SceneGraph, target: Option<BlockId>) -> Option<Block> {
        let target = target?;
        let removed = scene.remove(target);
        match &removed {
            Some(_) => log::info!("Deleted block {}", target),
            None => log::warn!("Cannot delete block {}, it is not in the scene.", target),
        }
        removed
    }
}

impl Default for BlockManager {
    fn default() -> Self {
        let ctx = Context::default();
        Self::new(AppearanceSelection::new(ctx.color_block_texture, Rgb::WHITE))
    }
}
