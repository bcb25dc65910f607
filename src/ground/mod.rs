//! Contains [`GroundTerrain`], a rectangular 3D ground that craters are punched into.
//!
//! Untouched ground is a handful of flat quads.
//! Wherever there are holes, the ground is a dense grid whose vertices sink into smooth bowls.
//! Which areas are dense is decided by [`scan_holes`].

mod scan;

pub use scan::{ScanGroup, scan_holes};

use bevy_math::{Affine3A, Vec3};
use log::{debug, warn};

use crate::{
    config::GroundConfig,
    error::{TerrainError, TerrainResult},
    geometry::{Aabb, Hole},
    mesh::{Footprint, MeshBatch, MeshBuffer, carve},
    trigger::{Deformable, HoleUpdate},
};

/// A rectangular ground mesh that holes can be punched into.
///
/// The ground lies on its local xz plane, spanning `0..width` along x and `0..height` along z, facing +y.
///
/// Each new hole either:
///
/// - falls entirely inside an area that is already dense, and just sinks the existing vertices (cheap), or
/// - triggers a re-tile: every hole so far is merged into dense regions again and the whole mosaic is rebuilt.
///
/// A re-tile stacks bands from south (low z) to north:
/// a full width quad under the first band, then per band each dense patch flanked by quads on every side, and a full width quad on top.
#[derive(Debug, Clone)]
pub struct GroundTerrain {
    config: GroundConfig,
    footprint: Footprint,
    local_to_world: Affine3A,
    world_to_local: Affine3A,
    holes: Vec<Hole>,
    /// Every region currently meshed as a dense grid, in local units.
    /// No two overlap or touch.
    dense_regions: Vec<Aabb>,
    mesh: MeshBuffer,
}

impl GroundTerrain {
    /// Constructs flat ground at the world origin.
    pub fn new(config: GroundConfig) -> TerrainResult<Self> {
        Self::with_transform(config, Affine3A::IDENTITY)
    }

    /// Constructs flat ground placed in the world by `local_to_world`.
    pub fn with_transform(config: GroundConfig, local_to_world: Affine3A) -> TerrainResult<Self> {
        config.validate()?;
        let determinant = local_to_world.matrix3.determinant();
        if !determinant.is_finite() || determinant == 0.0 || !local_to_world.is_finite() {
            return Err(TerrainError::Config(format!(
                "ground transform {local_to_world:?} is not invertible"
            )));
        }
        let footprint = Footprint {
            width: config.width,
            height: config.height,
        };
        let mut ground = Self {
            config,
            footprint,
            local_to_world,
            world_to_local: local_to_world.inverse(),
            holes: Vec::new(),
            dense_regions: Vec::new(),
            mesh: MeshBuffer::new(),
        };
        ground.mesh = ground.flat_mesh()?;
        Ok(ground)
    }

    /// The parameters this was built with.
    #[inline]
    pub fn config(&self) -> &GroundConfig {
        &self.config
    }

    /// Where this ground sits in the world.
    #[inline]
    pub fn transform(&self) -> Affine3A {
        self.local_to_world
    }

    /// Every hole punched so far.
    /// The order is not meaningful; it changes whenever the ground is re-tiled.
    #[inline]
    pub fn holes(&self) -> &[Hole] {
        &self.holes
    }

    /// The regions currently meshed densely, in local units.
    #[inline]
    pub fn dense_regions(&self) -> &[Aabb] {
        &self.dense_regions
    }

    /// The current surface.
    #[inline]
    pub fn mesh(&self) -> &MeshBuffer {
        &self.mesh
    }

    /// Maps a world position into local space.
    #[inline]
    pub fn to_local(&self, world_position: Vec3) -> Vec3 {
        self.world_to_local.transform_point3(world_position)
    }

    /// Punches a hole of `radius` at the local `position`.
    pub fn create_hole_local(&mut self, position: Vec3, radius: f32) -> TerrainResult<HoleUpdate> {
        let Some(hole) = Hole::new(position, radius) else {
            warn!("ignoring hole at {position} with radius {radius}");
            return Ok(HoleUpdate::Ignored);
        };

        let footprint = hole.aabb();
        if self.dense_regions.iter().any(|r| r.contains(&footprint)) {
            debug!("hole {hole:?} is inside a dense region; sinking in place");
            carve(self.mesh.positions_mut(), [&hole]);
            self.mesh.recompute_normals();
            self.holes.push(hole);
            return Ok(HoleUpdate::Displaced);
        }

        let mut holes = Vec::with_capacity(self.holes.len() + 1);
        holes.extend_from_slice(&self.holes);
        holes.push(hole);
        let (mesh, dense_regions) = self.tile(&mut holes)?;
        mesh.validate()?;
        debug!(
            "re-tiled ground around {} holes: {} dense regions, {} vertices, {} triangles",
            holes.len(),
            dense_regions.len(),
            mesh.vertex_count(),
            mesh.triangle_count()
        );

        self.holes = holes;
        self.dense_regions = dense_regions;
        self.mesh = mesh;
        Ok(HoleUpdate::Rebuilt)
    }

    /// Forgets every hole and restores the flat ground.
    pub fn clear_holes(&mut self) -> TerrainResult<()> {
        self.mesh = self.flat_mesh()?;
        self.holes.clear();
        self.dense_regions.clear();
        Ok(())
    }

    /// One quad over the whole footprint.
    fn flat_mesh(&self) -> TerrainResult<MeshBuffer> {
        let mut mesh = MeshBuffer::new();
        push(&mut mesh, self.footprint.quad(Aabb::UNIT))?;
        mesh.recompute_normals();
        Ok(mesh)
    }

    /// Merges `holes` into dense regions and builds the full mosaic around them.
    /// Returns the mesh and the dense regions it contains.
    fn tile(&self, holes: &mut [Hole]) -> TerrainResult<(MeshBuffer, Vec<Aabb>)> {
        let groups = scan_holes(holes);
        let Footprint { width, height } = self.footprint;
        let mut mesh = MeshBuffer::new();
        let mut dense_regions = Vec::new();

        let mut south = 0.0;
        for group in &groups {
            let band = group.total.normalized(width, height);
            push(&mut mesh, self.footprint.quad(Aabb::new(south, band.bottom, 0.0, 1.0)))?;

            let mut west = 0.0;
            for region in &group.regions {
                let patch = region.normalized(width, height);
                if let Some(mut grid) = self.footprint.grid(patch, self.config.cell_size) {
                    grid.carve(holes.iter().filter(|h| h.aabb().intersects(region)));
                    mesh.append(grid)?;
                }
                let flanks = [
                    // Below and above the patch, within the band.
                    Aabb::new(band.bottom, patch.bottom, patch.left, patch.right),
                    Aabb::new(patch.top, band.top, patch.left, patch.right),
                    // Between the previous patch, or the west edge, and this one.
                    Aabb::new(band.bottom, band.top, west, patch.left),
                ];
                for flank in flanks {
                    push(&mut mesh, self.footprint.quad(flank))?;
                }
                west = patch.right;
            }
            push(&mut mesh, self.footprint.quad(Aabb::new(band.bottom, band.top, west, 1.0)))?;

            dense_regions.extend_from_slice(&group.regions);
            south = band.top;
        }
        push(&mut mesh, self.footprint.quad(Aabb::new(south, 1.0, 0.0, 1.0)))?;

        mesh.recompute_normals();
        Ok((mesh, dense_regions))
    }
}

impl Deformable for GroundTerrain {
    fn request_hole(&mut self, world_position: Vec3, radius: f32) -> TerrainResult<HoleUpdate> {
        self.create_hole_local(self.to_local(world_position), radius)
    }
}

#[inline]
fn push(mesh: &mut MeshBuffer, batch: Option<MeshBatch>) -> TerrainResult<()> {
    match batch {
        Some(batch) => mesh.append(batch),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use approx::{assert_abs_diff_eq, assert_relative_eq};
    use bevy_math::Quat;

    use super::*;
    use crate::trigger::HoleTrigger;

    fn ground() -> GroundTerrain {
        GroundTerrain::new(GroundConfig {
            width: 10.0,
            height: 10.0,
            cell_size: 0.2,
        })
        .unwrap()
    }

    fn lowest(mesh: &MeshBuffer) -> f32 {
        mesh.positions().iter().map(|p| p.y).fold(f32::INFINITY, f32::min)
    }

    /// Sums the xz area of every triangle.
    fn covered_area(mesh: &MeshBuffer) -> f32 {
        mesh.triangles()
            .map(|[a, b, c]| {
                let (a, b, c) = (a.with_y(0.0), b.with_y(0.0), c.with_y(0.0));
                (b - a).cross(c - a).length() * 0.5
            })
            .sum()
    }

    #[test]
    fn starts_flat() {
        let ground = ground();
        assert_eq!(ground.mesh().vertex_count(), 4);
        assert_eq!(ground.mesh().triangle_count(), 2);
        assert!(ground.dense_regions().is_empty());
        ground.mesh().validate().unwrap();
    }

    #[test]
    fn single_hole_scenario() {
        let mut ground = ground();
        let update = ground.create_hole_local(Vec3::new(5.0, 0.0, 5.0), 1.0).unwrap();
        assert_eq!(update, HoleUpdate::Rebuilt);

        assert_eq!(ground.dense_regions().len(), 1);
        let region = ground.dense_regions()[0];
        assert_relative_eq!(region.bottom, 4.0);
        assert_relative_eq!(region.top, 6.0);
        assert_relative_eq!(region.left, 4.0);
        assert_relative_eq!(region.right, 6.0);
        let normalized = region.normalized(10.0, 10.0);
        assert_relative_eq!(normalized.bottom, 0.4);
        assert_relative_eq!(normalized.right, 0.6);

        // One 10x10 dense patch plus four flanking quads: south, west, east and north of it.
        // The patch fills its band, so the flanks directly above and below it have zero height and are skipped.
        let mesh = ground.mesh();
        assert_eq!(mesh.vertex_count(), 11 * 11 + 4 * 4);
        assert_eq!(mesh.triangle_count(), 10 * 10 * 2 + 4 * 2);
        mesh.validate().unwrap();
        assert_eq!(mesh.normals().len(), mesh.vertex_count());

        assert_abs_diff_eq!(lowest(mesh), -1.0, epsilon = 1e-4);
        assert_abs_diff_eq!(covered_area(mesh), 100.0, epsilon = 1e-2);
    }

    #[test]
    fn contained_hole_only_sinks() {
        let mut ground = ground();
        ground.create_hole_local(Vec3::new(5.0, 0.0, 5.0), 1.0).unwrap();
        let regions = ground.dense_regions().to_vec();
        let vertex_count = ground.mesh().vertex_count();
        let indices = ground.mesh().indices().to_vec();

        // Deeper in the crater, where the first hole's center vertices now sit.
        let update = ground.create_hole_local(Vec3::new(5.0, -1.0, 5.0), 0.5).unwrap();
        assert_eq!(update, HoleUpdate::Displaced);
        assert_eq!(ground.dense_regions(), regions.as_slice());
        assert_eq!(ground.mesh().vertex_count(), vertex_count);
        assert_eq!(ground.mesh().indices(), indices.as_slice());
        assert_eq!(ground.holes().len(), 2);
        assert_abs_diff_eq!(lowest(ground.mesh()), -1.5, epsilon = 1e-3);
    }

    #[test]
    fn sinking_matches_the_falloff() {
        let mut ground = ground();
        ground.create_hole_local(Vec3::new(5.0, 0.0, 5.0), 1.0).unwrap();
        for p in ground.mesh().positions() {
            let d2 = (p.x - 5.0).powi(2) + (p.z - 5.0).powi(2);
            let expected = if d2 <= 1.0 { 1.0 - d2 } else { 0.0 };
            assert_abs_diff_eq!(p.y, -expected, epsilon = 1e-4);
        }
    }

    #[test]
    fn escaping_hole_retiles() {
        let mut ground = ground();
        ground.create_hole_local(Vec3::new(5.0, 0.0, 5.0), 1.0).unwrap();
        let update = ground.create_hole_local(Vec3::new(6.5, 0.0, 5.0), 1.0).unwrap();
        assert_eq!(update, HoleUpdate::Rebuilt);
        assert_eq!(ground.dense_regions(), &[Aabb::new(4.0, 6.0, 4.0, 7.5)]);

        ground.create_hole_local(Vec3::new(2.0, 0.0, 9.0), 0.5).unwrap();
        assert_eq!(ground.dense_regions().len(), 2);
        ground.mesh().validate().unwrap();
        assert_abs_diff_eq!(covered_area(ground.mesh()), 100.0, epsilon = 1e-2);
    }

    #[test]
    fn many_holes_keep_regions_disjoint() {
        let mut ground = ground();
        let spots = [
            (1.0, 1.0, 0.5),
            (3.0, 1.5, 0.7),
            (8.0, 2.0, 1.0),
            (5.0, 5.0, 0.3),
            (5.5, 5.2, 0.3),
            (9.5, 9.5, 1.0),
            (0.2, 6.0, 0.6),
        ];
        for (x, z, r) in spots {
            ground.create_hole_local(Vec3::new(x, 0.0, z), r).unwrap();
            ground.mesh().validate().unwrap();
        }
        let regions = ground.dense_regions();
        for (i, a) in regions.iter().enumerate() {
            for b in &regions[i + 1..] {
                assert!(!a.intersects(b));
            }
        }
        for hole in ground.holes() {
            assert_eq!(
                regions.iter().filter(|r| r.contains(&hole.aabb())).count(),
                1
            );
        }
        // Holes hanging off the edges are clamped, so the surface still covers exactly the footprint.
        assert_abs_diff_eq!(covered_area(ground.mesh()), 100.0, epsilon = 5e-2);
    }

    #[test]
    fn malformed_requests_are_ignored() {
        let mut ground = ground();
        let before = ground.mesh().clone();
        assert_eq!(ground.create_hole_local(Vec3::ZERO, 0.0).unwrap(), HoleUpdate::Ignored);
        assert_eq!(ground.create_hole_local(Vec3::ZERO, -2.0).unwrap(), HoleUpdate::Ignored);
        assert_eq!(
            ground.create_hole_local(Vec3::new(f32::NAN, 0.0, 0.0), 1.0).unwrap(),
            HoleUpdate::Ignored
        );
        assert!(ground.holes().is_empty());
        assert_eq!(ground.mesh(), &before);
    }

    #[test]
    fn clearing_restores_flat_ground() {
        let mut ground = ground();
        ground.create_hole_local(Vec3::new(5.0, 0.0, 5.0), 1.0).unwrap();
        ground.clear_holes().unwrap();
        assert!(ground.holes().is_empty());
        assert!(ground.dense_regions().is_empty());
        assert_eq!(ground.mesh().vertex_count(), 4);
        assert_eq!(lowest(ground.mesh()), 0.0);

        // A hole in the old region must re-tile, not sink the flat quad.
        let update = ground.create_hole_local(Vec3::new(5.0, 0.0, 5.0), 0.5).unwrap();
        assert_eq!(update, HoleUpdate::Rebuilt);
    }

    #[test]
    fn world_requests_are_mapped_to_local_space() {
        let transform = Affine3A::from_rotation_translation(
            Quat::from_rotation_y(core::f32::consts::FRAC_PI_2),
            Vec3::new(100.0, 2.0, -50.0),
        );
        let mut ground = GroundTerrain::with_transform(GroundConfig::default(), transform).unwrap();
        let local = Vec3::new(3.0, 0.0, 7.0);
        let world = transform.transform_point3(local);
        assert!(ground.to_local(world).abs_diff_eq(local, 1e-4));

        let mut trigger = HoleTrigger::new(1.0);
        assert_eq!(trigger.on_collision(world, &mut ground).unwrap(), HoleUpdate::Rebuilt);
        assert_eq!(trigger.on_collision(world, &mut ground).unwrap(), HoleUpdate::Ignored);
        let region = ground.dense_regions()[0];
        assert_abs_diff_eq!(region.left, 2.0, epsilon = 1e-4);
        assert_abs_diff_eq!(region.bottom, 6.0, epsilon = 1e-4);
    }

    #[test]
    fn rejects_singular_transforms() {
        let flat = Affine3A::from_scale(Vec3::new(1.0, 0.0, 1.0));
        assert!(matches!(
            GroundTerrain::with_transform(GroundConfig::default(), flat),
            Err(TerrainError::Config(_))
        ));
    }

    #[test]
    fn rejects_grids_too_dense_to_index() {
        let config = GroundConfig {
            cell_size: 1e-4,
            ..Default::default()
        };
        assert!(matches!(GroundTerrain::new(config), Err(TerrainError::Config(_))));

        // The densest accepted grid still meshes a hole covering the whole terrain.
        let mut ground = GroundTerrain::new(GroundConfig {
            cell_size: 0.05,
            ..Default::default()
        })
        .unwrap();
        let update = ground.create_hole_local(Vec3::new(5.0, 0.0, 5.0), 100.0).unwrap();
        assert_eq!(update, HoleUpdate::Rebuilt);
        assert_eq!(ground.mesh().vertex_count(), 201 * 201);
        ground.mesh().validate().unwrap();
    }
}
