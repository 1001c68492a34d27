//! Material and texture descriptors handed to an external renderer

use crate::types::Color;
use serde::Serialize;

/// Blend mode for rendering a node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum BlendMode {
    Alpha,
    Additive,
}

/// Describes a texture the renderer should realise.
///
/// Nothing here owns GPU memory; two nodes with equal descriptors may share
/// one texture on the renderer side.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub enum TextureDesc {
    /// Procedural radial falloff sprite (`inner` opacity at the centre,
    /// `mid` at half radius, transparent at the edge)
    SoftCircle { size: u32, inner: f32, mid: f32 },
    /// A window into the shared video frame in UV space
    VideoWindow { offset: [f32; 2], repeat: [f32; 2] },
}

impl TextureDesc {
    /// The whole video frame
    pub const FULL_VIDEO: Self = TextureDesc::VideoWindow {
        offset: [0.0, 0.0],
        repeat: [1.0, 1.0],
    };
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Material {
    pub color: Color,
    pub opacity: f32,
    pub blend: BlendMode,
    pub texture: Option<TextureDesc>,
    pub depth_test: bool,
    pub depth_write: bool,
}

impl Default for Material {
    fn default() -> Self {
        Self {
            color: Color::WHITE,
            opacity: 1.0,
            blend: BlendMode::Alpha,
            texture: None,
            depth_test: true,
            depth_write: true,
        }
    }
}

impl Material {
    /// Unlit solid colour
    pub fn solid(color: Color) -> Self {
        Self {
            color,
            ..Default::default()
        }
    }

    /// Additive, depth-ignoring glow as used by sprites and streaks
    pub fn additive(color: Color, opacity: f32, texture: Option<TextureDesc>) -> Self {
        Self {
            color,
            opacity,
            blend: BlendMode::Additive,
            texture,
            depth_test: false,
            depth_write: false,
        }
    }
}
