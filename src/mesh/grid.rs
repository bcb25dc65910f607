//! Builds the two kinds of terrain patches: a flat coarse quad and a dense regular grid.
//!
//! Both take a region of the normalized [0, 1] x [0, 1] footprint and scale it to the terrain's size.
//! Regions that cover no area produce nothing.

use bevy_math::{Vec2, Vec3};
use log::warn;

use crate::{config::GRID_SNAP_EPSILON, geometry::Aabb, mesh::MeshBatch};

/// The footprint of a terrain in local units.
/// Normalized coordinates are scaled by this, `x` by [`width`](Self::width) and `y` onto local `z` by [`height`](Self::height).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Footprint {
    /// Local extent along x.
    pub width: f32,
    /// Local extent along z.
    pub height: f32,
}

impl Footprint {
    /// Maps a normalized point onto the flat terrain surface.
    #[inline]
    pub fn local(&self, normalized: Vec2) -> Vec3 {
        Vec3::new(self.width * normalized.x, 0.0, self.height * normalized.y)
    }

    /// Returns the clamped region, or `None` (with a warning) if it covers no area.
    fn accept(&self, region: Aabb, what: &str) -> Option<Aabb> {
        if region.is_degenerate() {
            warn!("skipping {what} over degenerate region {region:?}");
            return None;
        }
        let region = region.clamped_to_unit();
        if region.is_degenerate() {
            warn!("skipping {what} over region {region:?} outside the terrain");
            return None;
        }
        Some(region)
    }

    /// Builds one flat quad over the normalized `region`.
    pub fn quad(&self, region: Aabb) -> Option<MeshBatch> {
        let region = self.accept(region, "quad")?;
        let (start, end) = (region.start(), region.end());
        let corners = [
            start,
            Vec2::new(start.x, end.y),
            end,
            Vec2::new(end.x, start.y),
        ];
        Some(MeshBatch {
            positions: corners.iter().map(|c| self.local(*c)).collect(),
            uvs: corners.to_vec(),
            indices: vec![0, 1, 2, 0, 2, 3],
        })
    }

    /// Builds a flat grid over the normalized `region` with cells as close to `cell_size` local units as fit evenly.
    ///
    /// Vertices are laid out row by row from the bottom left.
    /// Each cell is split along its bottom left to top right diagonal, with the same winding as [`quad`](Self::quad).
    pub fn grid(&self, region: Aabb, cell_size: f32) -> Option<MeshBatch> {
        let region = self.accept(region, "grid")?;
        let origin = self.local(region.start());
        let size = Vec2::new(self.width * region.width(), self.height * region.height());
        let columns = cell_count(size.x, cell_size);
        let rows = cell_count(size.y, cell_size);
        let cell = size / Vec2::new(columns as f32, rows as f32);

        let counts = (columns.checked_add(1), rows.checked_add(1));
        let (Some(vertex_count), Some(index_count)) = (
            counts.0.zip(counts.1).and_then(|(c, r)| c.checked_mul(r)),
            columns.checked_mul(rows).and_then(|cells| cells.checked_mul(6)),
        ) else {
            warn!("skipping a {columns}x{rows} grid: too many cells to index");
            return None;
        };
        let mut positions = Vec::with_capacity(vertex_count as usize);
        let mut uvs = Vec::with_capacity(vertex_count as usize);
        for row in 0..=rows {
            for col in 0..=columns {
                let position = origin + Vec3::new(col as f32 * cell.x, 0.0, row as f32 * cell.y);
                uvs.push(Vec2::new(position.x / self.width, position.z / self.height));
                positions.push(position);
            }
        }

        let mut indices = Vec::with_capacity(index_count as usize);
        for row in 0..rows {
            for col in 0..columns {
                let bottom_left = row * (columns + 1) + col;
                let bottom_right = bottom_left + 1;
                let top_left = bottom_left + columns + 1;
                let top_right = top_left + 1;
                indices.extend([
                    bottom_left,
                    top_left,
                    top_right,
                    bottom_left,
                    top_right,
                    bottom_right,
                ]);
            }
        }

        Some(MeshBatch {
            positions,
            uvs,
            indices,
        })
    }
}

/// How many whole cells of `cell_size` fit in `length`, but at least one.
#[inline]
pub fn cell_count(length: f32, cell_size: f32) -> u32 {
    ((length / cell_size + GRID_SNAP_EPSILON).floor() as u32).max(1)
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;

    use super::*;

    const TERRAIN: Footprint = Footprint {
        width: 10.0,
        height: 10.0,
    };

    #[test]
    fn cell_counts() {
        assert_eq!(cell_count(2.0, 0.2), 10);
        assert_eq!(cell_count(2.1, 0.2), 10);
        assert_eq!(cell_count(0.1, 0.2), 1);
        assert_eq!(cell_count(10.0, 0.2), 50);
    }

    #[test]
    fn quad_covers_region() {
        let quad = TERRAIN.quad(Aabb::new(0.0, 0.4, 0.0, 1.0)).unwrap();
        assert_eq!(quad.positions.len(), 4);
        assert_eq!(quad.uvs.len(), 4);
        assert_eq!(quad.positions[0], Vec3::ZERO);
        assert_relative_eq!(quad.positions[2].x, 10.0);
        assert_relative_eq!(quad.positions[2].z, 4.0);
        assert_eq!(quad.uvs[2], Vec2::new(1.0, 0.4));
    }

    #[test]
    fn degenerate_regions_are_skipped() {
        assert!(TERRAIN.quad(Aabb::new(0.4, 0.4, 0.0, 1.0)).is_none());
        assert!(TERRAIN.quad(Aabb::new(0.0, 1.0, 0.6, 0.4)).is_none());
        assert!(TERRAIN.grid(Aabb::new(0.5, 0.2, 0.0, 1.0), 0.2).is_none());
        // Entirely off the terrain.
        assert!(TERRAIN.quad(Aabb::new(1.2, 1.5, 0.0, 1.0)).is_none());
    }

    #[test]
    fn regions_are_clamped() {
        let quad = TERRAIN.quad(Aabb::new(-0.1, 0.1, 0.9, 1.1)).unwrap();
        assert_eq!(quad.uvs[0], Vec2::new(0.9, 0.0));
        assert_eq!(quad.uvs[2], Vec2::new(1.0, 0.1));
    }

    #[test]
    fn grid_stretches_to_fit() {
        // 2.1 units wide fits 10 cells of 0.21.
        let grid = TERRAIN.grid(Aabb::new(0.4, 0.6, 0.4, 0.61), 0.2).unwrap();
        assert_eq!(grid.positions.len(), 11 * 11);
        assert_eq!(grid.indices.len(), 10 * 10 * 6);
        let last = grid.positions[grid.positions.len() - 1];
        assert_relative_eq!(last.x, 6.1, epsilon = 1e-4);
        assert_relative_eq!(last.z, 6.0, epsilon = 1e-4);
        assert_relative_eq!(grid.positions[1].x - grid.positions[0].x, 0.21, epsilon = 1e-4);
        assert!(grid.indices.iter().all(|&i| (i as usize) < grid.positions.len()));
    }

    #[test]
    fn unindexable_grids_are_skipped() {
        // A million cells a side is more vertices than u32 indices reach.
        assert!(TERRAIN.grid(Aabb::UNIT, 1e-5).is_none());
    }

    #[test]
    fn grid_faces_up() {
        let grid = TERRAIN.grid(Aabb::new(0.0, 0.1, 0.0, 0.1), 0.5).unwrap();
        for tri in grid.indices.chunks_exact(3) {
            let [a, b, c] = [0, 1, 2].map(|k| grid.positions[tri[k] as usize]);
            assert!((b - a).cross(c - a).y > 0.0);
        }
    }
}
