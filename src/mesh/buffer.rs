//! Contains [`MeshBuffer`], the growing vertex/uv/index store both terrains render and collide with.

use bevy_asset::RenderAssetUsages;
use bevy_math::{Vec2, Vec3, bounding::Aabb3d};
use bevy_mesh::{Indices, Mesh};
use wgpu_types::PrimitiveTopology;

use crate::{
    error::{TerrainError, TerrainResult},
    geometry::Hole,
};

/// A self contained piece of geometry, ex: one quad or one dense grid patch.
///
/// Its indices refer to its own vertices, starting at 0.
/// [`MeshBuffer::append`] rebases them when the batch is added.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MeshBatch {
    /// Vertex positions.
    pub positions: Vec<Vec3>,
    /// One uv per position.
    pub uvs: Vec<Vec2>,
    /// Triangle list into [`positions`](Self::positions).
    pub indices: Vec<u32>,
}

impl MeshBatch {
    /// Returns true if this has no triangles.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    /// Sinks every vertex of this batch by each of `holes` in turn.
    pub fn carve<'a>(&mut self, holes: impl IntoIterator<Item = &'a Hole>) {
        carve(&mut self.positions, holes);
    }
}

/// Sinks `positions` under each hole in turn.
///
/// Each hole reads the heights the previous ones left behind,
/// so overlapping craters stack rather than taking the deepest bowl.
pub fn carve<'a>(positions: &mut [Vec3], holes: impl IntoIterator<Item = &'a Hole>) {
    for hole in holes {
        for position in positions.iter_mut() {
            position.y -= hole.sink_at(*position);
        }
    }
}

/// Accumulates [`MeshBatch`]es into one triangle list.
///
/// Positions and uvs are always the same length,
/// and every index is a valid position index, as long as only [`append`](Self::append) adds geometry.
/// [`normals`](Self::normals) are only current after [`recompute_normals`](Self::recompute_normals).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MeshBuffer {
    positions: Vec<Vec3>,
    uvs: Vec<Vec2>,
    indices: Vec<u32>,
    normals: Vec<Vec3>,
}

impl MeshBuffer {
    /// Constructs an empty buffer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Removes all geometry.
    pub fn clear(&mut self) {
        self.positions.clear();
        self.uvs.clear();
        self.indices.clear();
        self.normals.clear();
    }

    /// Returns true if there are no triangles.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    /// The number of vertices.
    #[inline]
    pub fn vertex_count(&self) -> usize {
        self.positions.len()
    }

    /// The number of triangles.
    #[inline]
    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    /// Vertex positions.
    #[inline]
    pub fn positions(&self) -> &[Vec3] {
        &self.positions
    }

    /// Vertex positions, for edits that keep the topology.
    #[inline]
    pub fn positions_mut(&mut self) -> &mut [Vec3] {
        &mut self.positions
    }

    /// Vertex uvs, paired with [`positions`](Self::positions).
    #[inline]
    pub fn uvs(&self) -> &[Vec2] {
        &self.uvs
    }

    /// The triangle list.
    #[inline]
    pub fn indices(&self) -> &[u32] {
        &self.indices
    }

    /// Vertex normals as of the last [`recompute_normals`](Self::recompute_normals).
    #[inline]
    pub fn normals(&self) -> &[Vec3] {
        &self.normals
    }

    /// Iterates the corner positions of every triangle.
    pub fn triangles(&self) -> impl Iterator<Item = [Vec3; 3]> + '_ {
        self.indices.chunks_exact(3).map(|tri| {
            [
                self.positions[tri[0] as usize],
                self.positions[tri[1] as usize],
                self.positions[tri[2] as usize],
            ]
        })
    }

    /// Adds `batch` after the existing geometry, rebasing its indices.
    ///
    /// Fails, leaving the buffer unchanged, if the combined vertices could no longer be indexed by `u32`.
    pub fn append(&mut self, batch: MeshBatch) -> TerrainResult<()> {
        debug_assert_eq!(batch.positions.len(), batch.uvs.len());
        debug_assert_eq!(batch.indices.len() % 3, 0);
        let total = self.positions.len() + batch.positions.len();
        if u32::try_from(total).is_err() {
            return Err(TerrainError::geometry(
                "append mesh",
                format!("{total} vertices do not fit u32 indices"),
            ));
        }
        let base = self.positions.len() as u32;
        self.positions.extend(batch.positions);
        self.uvs.extend(batch.uvs);
        self.indices.extend(batch.indices.into_iter().map(|i| i + base));
        Ok(())
    }

    /// Recomputes smooth vertex normals, weighting each face by its area.
    /// Vertices used by no triangle get [`Vec3::Y`].
    pub fn recompute_normals(&mut self) {
        self.normals.clear();
        self.normals.resize(self.positions.len(), Vec3::ZERO);
        for tri in self.indices.chunks_exact(3) {
            let [a, b, c] = [tri[0] as usize, tri[1] as usize, tri[2] as usize];
            // Not normalized so larger faces count for more.
            let face = (self.positions[b] - self.positions[a])
                .cross(self.positions[c] - self.positions[a]);
            self.normals[a] += face;
            self.normals[b] += face;
            self.normals[c] += face;
        }
        for normal in &mut self.normals {
            *normal = normal.try_normalize().unwrap_or(Vec3::Y);
        }
    }

    /// The bounding box of every vertex, or `None` if there are none.
    pub fn bounds(&self) -> Option<Aabb3d> {
        let (first, rest) = self.positions.split_first()?;
        let (min, max) = rest
            .iter()
            .fold((*first, *first), |(min, max), p| (min.min(*p), max.max(*p)));
        Some(Aabb3d {
            min: min.into(),
            max: max.into(),
        })
    }

    /// Checks the buffer invariants:
    /// paired positions and uvs, whole triangles, in-bounds indices and finite positions.
    pub fn validate(&self) -> TerrainResult<()> {
        if self.positions.len() != self.uvs.len() {
            return Err(TerrainError::geometry(
                "validate mesh",
                format!(
                    "{} positions but {} uvs",
                    self.positions.len(),
                    self.uvs.len()
                ),
            ));
        }
        if self.indices.len() % 3 != 0 {
            return Err(TerrainError::geometry(
                "validate mesh",
                format!("{} indices is not a whole number of triangles", self.indices.len()),
            ));
        }
        if let Some(bad) = self
            .indices
            .iter()
            .find(|&&i| i as usize >= self.positions.len())
        {
            return Err(TerrainError::geometry(
                "validate mesh",
                format!("index {bad} is out of {} vertices", self.positions.len()),
            ));
        }
        if !self.positions.iter().all(|p| p.is_finite()) {
            return Err(TerrainError::geometry(
                "validate mesh",
                "a vertex position is not finite",
            ));
        }
        Ok(())
    }

    /// Builds a renderable triangle list [`Mesh`] from this buffer.
    /// Normals are included only if they are current.
    pub fn to_mesh(&self) -> Mesh {
        let mut mesh = Mesh::new(PrimitiveTopology::TriangleList, RenderAssetUsages::default());
        mesh.insert_attribute(
            Mesh::ATTRIBUTE_POSITION,
            self.positions.iter().map(|p| p.to_array()).collect::<Vec<_>>(),
        );
        if self.normals.len() == self.positions.len() {
            mesh.insert_attribute(
                Mesh::ATTRIBUTE_NORMAL,
                self.normals.iter().map(|n| n.to_array()).collect::<Vec<_>>(),
            );
        }
        mesh.insert_attribute(
            Mesh::ATTRIBUTE_UV_0,
            self.uvs.iter().map(|uv| uv.to_array()).collect::<Vec<_>>(),
        );
        mesh.insert_indices(Indices::U32(self.indices.clone()));
        mesh
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn triangle(offset: f32) -> MeshBatch {
        MeshBatch {
            positions: vec![
                Vec3::new(offset, 0.0, 0.0),
                Vec3::new(offset, 0.0, 1.0),
                Vec3::new(offset + 1.0, 0.0, 1.0),
            ],
            uvs: vec![Vec2::ZERO, Vec2::Y, Vec2::ONE],
            indices: vec![0, 1, 2],
        }
    }

    #[test]
    fn append_rebases_indices() {
        let mut buffer = MeshBuffer::new();
        buffer.append(triangle(0.0)).unwrap();
        buffer.append(triangle(2.0)).unwrap();
        assert_eq!(buffer.vertex_count(), 6);
        assert_eq!(buffer.triangle_count(), 2);
        assert_eq!(buffer.indices(), &[0, 1, 2, 3, 4, 5]);
        buffer.validate().unwrap();

        buffer.clear();
        assert!(buffer.is_empty());
        assert_eq!(buffer.vertex_count(), 0);
        assert!(buffer.bounds().is_none());
    }

    #[test]
    fn normals_face_up() {
        let mut buffer = MeshBuffer::new();
        buffer.append(triangle(0.0)).unwrap();
        buffer.recompute_normals();
        assert_eq!(buffer.normals().len(), 3);
        for normal in buffer.normals() {
            assert!(normal.abs_diff_eq(Vec3::Y, 1e-6));
        }
    }

    #[test]
    fn bounds_cover_every_vertex() {
        let mut buffer = MeshBuffer::new();
        buffer.append(triangle(0.0)).unwrap();
        buffer.append(triangle(-3.0)).unwrap();
        buffer.positions_mut()[0].y = -2.0;
        let bounds = buffer.bounds().unwrap();
        assert_eq!(Vec3::from(bounds.min), Vec3::new(-3.0, -2.0, 0.0));
        assert_eq!(Vec3::from(bounds.max), Vec3::new(1.0, 0.0, 1.0));
    }

    #[test]
    fn validation_catches_broken_buffers() {
        let mut buffer = MeshBuffer::new();
        buffer.append(triangle(0.0)).unwrap();
        buffer.indices.push(7);
        assert!(matches!(
            buffer.validate(),
            Err(TerrainError::Geometry { .. })
        ));

        let mut buffer = MeshBuffer::new();
        buffer.append(triangle(0.0)).unwrap();
        buffer.uvs.pop();
        assert!(buffer.validate().is_err());

        let mut buffer = MeshBuffer::new();
        buffer.append(triangle(0.0)).unwrap();
        buffer.positions_mut()[1].x = f32::NAN;
        assert!(buffer.validate().is_err());
    }

    #[test]
    fn carving_stacks_overlapping_holes() {
        let hole = Hole::new(Vec3::ZERO, 1.0).unwrap();
        let mut positions = [Vec3::ZERO, Vec3::new(0.5, 0.0, 0.0), Vec3::new(2.0, 0.0, 0.0)];
        carve(&mut positions, [&hole, &hole]);
        // The center sinks fully once, then sits exactly on the second rim.
        assert!((positions[0].y + 1.0).abs() < 1e-6);
        // 0.75 from the first pass, then the second pass sees it further away.
        let after_first = 0.75f32;
        let sqr = 0.25 + after_first * after_first;
        let expected = after_first + (1.0 - sqr);
        assert!((positions[1].y + expected).abs() < 1e-5);
        assert_eq!(positions[2].y, 0.0);
    }

    #[test]
    fn exports_bevy_mesh() {
        let mut buffer = MeshBuffer::new();
        buffer.append(triangle(0.0)).unwrap();
        buffer.recompute_normals();
        let mesh = buffer.to_mesh();
        assert_eq!(mesh.count_vertices(), 3);
        assert!(mesh.attribute(Mesh::ATTRIBUTE_NORMAL).is_some());
        assert!(mesh.attribute(Mesh::ATTRIBUTE_UV_0).is_some());
        assert_eq!(mesh.indices().map(Indices::len), Some(3));
    }
}
