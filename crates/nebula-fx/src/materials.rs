//! Material factories
//!
//! Each effect builds its materials from its own configuration at
//! construction. Equal descriptors can be deduplicated by the renderer.

use crate::config::{CometConfig, MeteorConfig, SmokeConfig};
use nebula_core::{Color, Material, TextureDesc};

/// Soft falloff sprite used for meteor tips
pub const GLOW_TEXTURE: TextureDesc = TextureDesc::SoftCircle {
    size: 128,
    inner: 1.0,
    mid: 0.6,
};

/// Wider, softer falloff used for smoke puffs
pub const SMOKE_TEXTURE: TextureDesc = TextureDesc::SoftCircle {
    size: 256,
    inner: 1.0,
    mid: 0.35,
};

pub fn meteor_material(config: &MeteorConfig) -> Material {
    Material::additive(config.color, config.opacity, None)
}

pub fn glow_material(config: &MeteorConfig) -> Material {
    Material::additive(config.glow_color, config.glow_opacity, Some(GLOW_TEXTURE))
}

pub fn smoke_material(config: &SmokeConfig) -> Material {
    Material::additive(config.color, config.opacity_start, Some(SMOKE_TEXTURE))
}

pub fn comet_material(config: &CometConfig) -> Material {
    Material::additive(config.color, 1.0, Some(GLOW_TEXTURE))
}

/// Window into the video for tile `(ix, iy)` of a `grid_x × grid_y` grid.
/// Row 0 is the bottom row; texture V runs top-down.
pub fn tile_material(ix: u32, iy: u32, grid_x: u32, grid_y: u32) -> Material {
    let (gx, gy) = (grid_x as f32, grid_y as f32);
    Material {
        texture: Some(TextureDesc::VideoWindow {
            offset: [ix as f32 / gx, 1.0 - (iy as f32 + 1.0) / gy],
            repeat: [1.0 / gx, 1.0 / gy],
        }),
        ..Material::solid(Color::WHITE)
    }
}

/// The unbroken video surface
pub fn video_material() -> Material {
    Material {
        texture: Some(TextureDesc::FULL_VIDEO),
        ..Material::solid(Color::WHITE)
    }
}
