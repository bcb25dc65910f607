//! Tunable constants and the construction parameters of both terrain engines.
//!
//! Everything here is supplied once, when a terrain is built, and never changes afterwards.

use serde::{Deserialize, Serialize};

use crate::error::{TerrainError, TerrainResult};

/// Relative tolerance used when two coordinates should be treated as the same value.
///
/// See [`approx_eq`](crate::geometry::approx_eq) for exactly how it is applied.
pub const APPROX_EPSILON: f32 = 1e-5;

/// The absolute floor of [`APPROX_EPSILON`], so values near zero still get some slack.
pub const APPROX_EPSILON_FLOOR: f32 = 1e-6;

/// Added to `region_size / cell_size` before flooring it into a cell count.
/// Without it, `2.0 / 0.2` lands on `9.9999...` in `f32` and a whole row of cells goes missing.
pub const GRID_SNAP_EPSILON: f32 = 1e-4;

/// How many fixed-point units make up one world unit in the 2D engine.
pub const DEFAULT_PRECISION: f64 = 100_000.0;

/// The largest fixed-point coordinate magnitude the 2D engine accepts, 2^50.
/// Anything beyond it is no longer exact once handed to `geo` as `f64`.
pub const MAX_FIXED_COORDINATE: f64 = (1u64 << 50) as f64;

/// The most vertices a dense grid covering the whole ground may have.
/// Keeps every mesh index, and every quad added around the grids, well inside `u32`.
pub const MAX_GRID_VERTICES: f64 = (1u32 << 26) as f64;

/// Snap radius handed to the constrained triangulator, in fixed-point units.
pub const TRIANGULATION_SNAP_RADIUS: f64 = 1.0;

/// Default terrain width in local units.
pub const DEFAULT_WIDTH: f32 = 10.0;

/// Default terrain height (length along local z, or y for the 2D engine) in local units.
pub const DEFAULT_HEIGHT: f32 = 10.0;

/// Default edge length of a dense grid cell.
pub const DEFAULT_CELL_SIZE: f32 = 0.2;

/// Default radius of a circle cut by [`remove_circle`](crate::destructible::DestructibleTerrain::remove_circle).
pub const DEFAULT_CIRCLE_RADIUS: f32 = 1.0;

/// Default number of vertices approximating a cut circle.
pub const DEFAULT_CIRCLE_VERTEX_COUNT: usize = 30;

/// The fewest vertices a circle approximation may have.
pub const MIN_CIRCLE_VERTEX_COUNT: usize = 3;

/// Parameters of the 3D [`GroundTerrain`](crate::ground::GroundTerrain).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GroundConfig {
    /// Extent of the terrain along local x.
    pub width: f32,
    /// Extent of the terrain along local z.
    pub height: f32,
    /// Nominal edge length of a cell in the dense grid around holes.
    /// The real cell size is stretched slightly so a whole number of cells fits each region.
    pub cell_size: f32,
}

impl Default for GroundConfig {
    fn default() -> Self {
        Self {
            width: DEFAULT_WIDTH,
            height: DEFAULT_HEIGHT,
            cell_size: DEFAULT_CELL_SIZE,
        }
    }
}

impl GroundConfig {
    /// Checks that every size is finite and positive, and that the densest possible grid fits the mesh index range.
    pub fn validate(&self) -> TerrainResult<()> {
        positive("width", self.width)?;
        positive("height", self.height)?;
        positive("cell_size", self.cell_size)?;
        if self.cell_size > self.width.min(self.height) {
            return Err(TerrainError::Config(format!(
                "cell_size {} does not fit in a {}x{} terrain",
                self.cell_size, self.width, self.height
            )));
        }
        // Every dense region is at most the whole terrain, and regions never overlap.
        let columns = f64::from(self.width) / f64::from(self.cell_size) + 1.0;
        let rows = f64::from(self.height) / f64::from(self.cell_size) + 1.0;
        if columns * rows > MAX_GRID_VERTICES {
            return Err(TerrainError::Config(format!(
                "cell_size {} makes a {}x{} terrain need more than {MAX_GRID_VERTICES} grid vertices",
                self.cell_size, self.width, self.height
            )));
        }
        Ok(())
    }
}

/// Parameters of the 2D [`DestructibleTerrain`](crate::destructible::DestructibleTerrain).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DestructibleConfig {
    /// Extent of the initial rectangle along local x.
    pub width: f32,
    /// Extent of the initial rectangle along local y.
    pub height: f32,
    /// Radius used by [`remove_circle`](crate::destructible::DestructibleTerrain::remove_circle).
    pub circle_radius: f32,
    /// Vertex count used when approximating cut circles.
    pub circle_vertex_count: usize,
    /// Fixed-point units per world unit. Larger is more exact, up to the range of `i64`.
    pub precision: f64,
}

impl Default for DestructibleConfig {
    fn default() -> Self {
        Self {
            width: DEFAULT_WIDTH,
            height: DEFAULT_HEIGHT,
            circle_radius: DEFAULT_CIRCLE_RADIUS,
            circle_vertex_count: DEFAULT_CIRCLE_VERTEX_COUNT,
            precision: DEFAULT_PRECISION,
        }
    }
}

impl DestructibleConfig {
    /// Checks sizes, the circle approximation and the fixed-point scale.
    pub fn validate(&self) -> TerrainResult<()> {
        positive("width", self.width)?;
        positive("height", self.height)?;
        positive("circle_radius", self.circle_radius)?;
        if self.circle_vertex_count < MIN_CIRCLE_VERTEX_COUNT {
            return Err(TerrainError::Config(format!(
                "circle_vertex_count must be at least {MIN_CIRCLE_VERTEX_COUNT}, got {}",
                self.circle_vertex_count
            )));
        }
        if !self.precision.is_finite() || self.precision < 1.0 {
            return Err(TerrainError::Config(format!(
                "precision must be a finite scale of at least 1, got {}",
                self.precision
            )));
        }
        // Keep coordinates well inside the range f64 represents exactly.
        let largest = f64::from(self.width.max(self.height)) * self.precision;
        if largest > MAX_FIXED_COORDINATE {
            return Err(TerrainError::Config(format!(
                "a {}x{} terrain at precision {} overflows fixed-point space",
                self.width, self.height, self.precision
            )));
        }
        Ok(())
    }
}

fn positive(name: &str, value: f32) -> TerrainResult<()> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(TerrainError::Config(format!(
            "{name} must be finite and positive, got {value}"
        )))
    }
}
