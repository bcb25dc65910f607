#![allow(
    clippy::doc_markdown,
    reason = "These rules should not apply to the readme."
)]
#![doc = include_str!("../README.md")]

pub mod config;
pub mod destructible;
pub mod error;
pub mod geometry;
pub mod ground;
pub mod mesh;
pub mod trigger;

pub use config::{DestructibleConfig, GroundConfig};
pub use destructible::{DestructibleTerrain, EdgeColliders, PostRebuild};
pub use error::{TerrainError, TerrainResult};
pub use geometry::{Aabb, Hole};
pub use ground::GroundTerrain;
pub use mesh::MeshBuffer;
pub use trigger::{Deformable, HoleTrigger, HoleUpdate};
