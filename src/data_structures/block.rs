use std::fmt;

use anyhow::{Context as _, bail};
use serde::Serialize;
use uuid::Uuid;

use crate::data_structures::instance::Instance;

/// Identifier of a placed block. Stable for the lifetime of the block.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct BlockId(Uuid);

impl BlockId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for BlockId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for BlockId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// 8-bit RGB colour as used by the host's colour picker (`#rrggbb`).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub const WHITE: Rgb = Rgb::new(0xff, 0xff, 0xff);

    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Parses `#rrggbb` or the short form `#rgb`. The leading `#` is optional.
    pub fn from_hex(hex: &str) -> anyhow::Result<Self> {
        let digits = hex.trim().trim_start_matches('#');
        if !digits.chars().all(|c| c.is_ascii_hexdigit()) {
            bail!("invalid colour {:?}: expected hex digits", hex);
        }
        let channel = |s: &str| {
            u8::from_str_radix(s, 16).with_context(|| format!("invalid colour channel in {:?}", hex))
        };
        match digits.len() {
            6 => Ok(Self::new(
                channel(&digits[0..2])?,
                channel(&digits[2..4])?,
                channel(&digits[4..6])?,
            )),
            3 => {
                // #abc is shorthand for #aabbcc
                let r = channel(&digits[0..1])?;
                let g = channel(&digits[1..2])?;
                let b = channel(&digits[2..3])?;
                Ok(Self::new(r * 17, g * 17, b * 17))
            }
            n => bail!("invalid colour {:?}: expected 3 or 6 hex digits, got {}", hex, n),
        }
    }
}

impl fmt::Display for Rgb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }
}

/// What a block looks like: a named texture or a flat colour.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "value", rename_all = "lowercase")]
pub enum Appearance {
    Texture(String),
    Color(Rgb),
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Shader {
    #[default]
    Standard,
}

/// Material description handed to the host renderer.
///
/// `src` is a selector for an asset the host preloaded (`#brick.png`).
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct Material {
    pub shader: Shader,
    pub src: Option<String>,
    pub color: Option<Rgb>,
}

impl From<&Appearance> for Material {
    fn from(appearance: &Appearance) -> Self {
        match appearance {
            Appearance::Texture(name) => Material {
                shader: Shader::Standard,
                src: Some(format!("#{}", name)),
                color: None,
            },
            Appearance::Color(rgb) => Material {
                shader: Shader::Standard,
                src: None,
                color: Some(*rgb),
            },
        }
    }
}

/**
 * A `Block` is a single placed cube in the scene.
 *
 * Blocks are owned by the scene graph registry. Everything else refers to
 * them by `BlockId` only.
 */
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Block {
    pub id: BlockId,
    pub instance: Instance,
    pub appearance: Appearance,
    pub material: Material,
    pub opacity: f32,
}

impl Block {
    pub fn new(instance: Instance, appearance: Appearance) -> Self {
        let material = Material::from(&appearance);
        Self {
            id: BlockId::new(),
            instance,
            appearance,
            material,
            opacity: 1.0,
        }
    }

    /// Half extents of the block's unit cube after scaling.
    pub fn half_extents(&self) -> cgmath::Vector3<f32> {
        self.instance.scale * 0.5
    }
}
