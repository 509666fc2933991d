//! Runtime configuration of the sandbox.
//!
//! The context is owned by the [`crate::flow::Sandbox`] and can be modified
//! at runtime via [`crate::flow::Out::Configure`].

/// Tunables shared by the placement controller and the block manager.
#[derive(Clone, Debug, PartialEq)]
pub struct Context {
    /// Size of one grid cell in world units. Cursor and blocks snap to it.
    pub grid_step: f32,
    /// Vertical lift applied to surface hits so the cursor floats above the surface.
    pub surface_lift: f32,
    /// Uniform block scale, a hair above `grid_step`.
    pub block_scale: f32,
    /// Opacity of the delete candidate.
    pub highlight_opacity: f32,
    /// Texture picker value that means "use the colour picker instead".
    pub color_block_texture: String,
    /// Where the host serves texture previews from.
    pub image_dir: String,
}

impl Default for Context {
    fn default() -> Self {
        Self {
            grid_step: 0.1,
            surface_lift: 0.05,
            block_scale: 0.101,
            highlight_opacity: 0.8,
            color_block_texture: "colorSelector.png".to_string(),
            image_dir: "./images/".to_string(),
        }
    }
}
