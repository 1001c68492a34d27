//! Nebula Core - Foundational types for the Nebula effects engine
//!
//! This crate provides the types that all other Nebula crates depend on:
//! - `Scene`, `Node`, `NodeHandle` - Retained node store effects attach to
//! - `Material`, `TextureDesc` - Renderer-agnostic surface descriptions
//! - `Transform`, `Color` - Spatial types
//! - Error types and Result alias

mod error;
mod material;
mod scene;
mod types;

pub use error::{NebulaError, Result};
pub use material::{BlendMode, Material, TextureDesc};
pub use scene::{Node, NodeHandle, NodeKind, Scene, SpriteInstance};
pub use types::{Color, Transform};

pub use glam::{Quat, Vec2, Vec3};
