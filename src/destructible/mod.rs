//! Contains [`DestructibleTerrain`], a flat 2D surface that circles are cut out of.
//!
//! The surface is a set of polygons with holes in fixed-point units.
//! Every cut subtracts a circle with an exact boolean difference and then rebuilds the mesh from scratch,
//! since a single cut may split, merge or reshape contours arbitrarily.

mod clip;
mod colliders;
mod fixed;

pub use clip::{circle_loop, difference, triangulate};
pub use colliders::{EdgeColliders, PostRebuild};
pub use fixed::{Contour, FixedScale, PolygonTree};

use bevy_math::{Affine3A, Vec2, Vec3};
use log::{debug, warn};

use crate::{
    config::{DestructibleConfig, MAX_FIXED_COORDINATE, MIN_CIRCLE_VERTEX_COUNT},
    error::{TerrainError, TerrainResult},
    mesh::{MeshBatch, MeshBuffer},
    trigger::{Deformable, HoleUpdate},
};

/// Triangulates `polygons` into a fresh mesh on the local xy plane, facing +z.
///
/// Every triangle gets its own three vertices.
/// Uvs map the `width` by `height` rectangle onto [0, 1] x [0, 1].
pub fn build_mesh(
    polygons: &PolygonTree,
    scale: FixedScale,
    width: f32,
    height: f32,
) -> TerrainResult<MeshBuffer> {
    let triangles = triangulate(polygons)?;
    let mut batch = MeshBatch {
        positions: Vec::with_capacity(triangles.len() * 3),
        uvs: Vec::with_capacity(triangles.len() * 3),
        indices: Vec::with_capacity(triangles.len() * 3),
    };
    let size = Vec2::new(width, height);
    if u32::try_from(triangles.len() * 3).is_err() {
        return Err(TerrainError::geometry(
            "build mesh",
            format!("{} triangles do not fit u32 indices", triangles.len()),
        ));
    }
    for corner in triangles.iter().flatten() {
        let local = scale.to_world_f64(*corner);
        batch.indices.push(batch.positions.len() as u32);
        batch.positions.push(local.extend(0.0));
        batch.uvs.push(local / size);
    }

    let mut mesh = MeshBuffer::new();
    mesh.append(batch)?;
    mesh.validate()?;
    mesh.recompute_normals();
    Ok(mesh)
}

/// A flat, destructible 2D surface.
///
/// It starts as a `width` by `height` rectangle from the local origin and only ever loses area.
/// After every rebuild, the post step `P` sees the new state, ex: [`EdgeColliders`] regenerates boundary loops.
#[derive(Debug, Clone)]
pub struct DestructibleTerrain<P = ()> {
    config: DestructibleConfig,
    scale: FixedScale,
    local_to_world: Affine3A,
    world_to_local: Affine3A,
    polygons: PolygonTree,
    mesh: MeshBuffer,
    post: P,
}

impl DestructibleTerrain {
    /// Constructs the full rectangle at the world origin, with no post step.
    pub fn new(config: DestructibleConfig) -> TerrainResult<Self> {
        Self::with_post(config, ())
    }
}

impl<P: PostRebuild> DestructibleTerrain<P> {
    /// Constructs the full rectangle at the world origin, running `post` after every rebuild.
    pub fn with_post(config: DestructibleConfig, post: P) -> TerrainResult<Self> {
        Self::with_transform(config, Affine3A::IDENTITY, post)
    }

    /// Constructs the full rectangle placed in the world by `local_to_world`, running `post` after every rebuild.
    pub fn with_transform(
        config: DestructibleConfig,
        local_to_world: Affine3A,
        mut post: P,
    ) -> TerrainResult<Self> {
        config.validate()?;
        let determinant = local_to_world.matrix3.determinant();
        if !determinant.is_finite() || determinant == 0.0 || !local_to_world.is_finite() {
            return Err(TerrainError::Config(format!(
                "terrain transform {local_to_world:?} is not invertible"
            )));
        }

        let scale = FixedScale::new(config.precision);
        let polygons = PolygonTree::rectangle(
            scale.to_fixed(Vec2::ZERO),
            scale.to_fixed(Vec2::new(config.width, config.height)),
        );
        let mesh = build_mesh(&polygons, scale, config.width, config.height)?;
        post.after_rebuild(&polygons, scale, &mesh);

        Ok(Self {
            config,
            scale,
            local_to_world,
            world_to_local: local_to_world.inverse(),
            polygons,
            mesh,
            post,
        })
    }

    /// The parameters this was built with.
    #[inline]
    pub fn config(&self) -> &DestructibleConfig {
        &self.config
    }

    /// Where this terrain sits in the world.
    #[inline]
    pub fn transform(&self) -> Affine3A {
        self.local_to_world
    }

    /// The fixed-point scale of [`polygons`](Self::polygons).
    #[inline]
    pub fn scale(&self) -> FixedScale {
        self.scale
    }

    /// The current surface outline.
    #[inline]
    pub fn polygons(&self) -> &PolygonTree {
        &self.polygons
    }

    /// The current triangulated surface.
    #[inline]
    pub fn mesh(&self) -> &MeshBuffer {
        &self.mesh
    }

    /// The post step, ex: to read [`EdgeColliders::loops`].
    #[inline]
    pub fn post(&self) -> &P {
        &self.post
    }

    /// Maps a world position onto the terrain's local plane.
    #[inline]
    pub fn to_local(&self, world_position: Vec3) -> Vec2 {
        self.world_to_local.transform_point3(world_position).truncate()
    }

    /// Cuts a circle of the configured radius and vertex count at the local `center`.
    pub fn remove_circle(&mut self, center: Vec2) -> TerrainResult<HoleUpdate> {
        self.subtract_circle(center, self.config.circle_radius, self.config.circle_vertex_count)
    }

    /// Cuts a circle of `radius`, approximated by `vertex_count` points, at the local `center`.
    ///
    /// Cuts that can not remove anything, because they have no area or miss the surface entirely,
    /// leave the terrain untouched and return [`HoleUpdate::Ignored`].
    /// So do cuts reaching past [`MAX_FIXED_COORDINATE`] in fixed-point units.
    pub fn subtract_circle(
        &mut self,
        center: Vec2,
        radius: f32,
        vertex_count: usize,
    ) -> TerrainResult<HoleUpdate> {
        if !center.is_finite() || !radius.is_finite() || radius < 0.0 {
            warn!("ignoring circle cut at {center} with radius {radius}");
            return Ok(HoleUpdate::Ignored);
        }
        if vertex_count < MIN_CIRCLE_VERTEX_COUNT {
            warn!("ignoring circle cut with only {vertex_count} vertices");
            return Ok(HoleUpdate::Ignored);
        }
        let reach =
            (f64::from(center.abs().max_element()) + f64::from(radius)) * self.scale.units();
        if reach > MAX_FIXED_COORDINATE {
            warn!("ignoring circle cut at {center} with radius {radius}: out of fixed-point range");
            return Ok(HoleUpdate::Ignored);
        }

        let cutter = circle_loop(
            self.scale.to_fixed(center).as_dvec2(),
            f64::from(radius) * self.scale.units(),
            vertex_count,
        );
        let Some(cutter) = fixed::simplify_loop(cutter) else {
            debug!("circle cut at {center} with radius {radius} has no area");
            return Ok(HoleUpdate::Ignored);
        };
        if !clip::touches(&self.polygons, &cutter) {
            debug!("circle cut at {center} misses the surface");
            return Ok(HoleUpdate::Ignored);
        }

        let polygons = difference(&self.polygons, &cutter)?;
        let mesh = build_mesh(&polygons, self.scale, self.config.width, self.config.height)?;
        debug!(
            "cut circle at {center}: {} outer contours, {} holes, {} triangles",
            polygons.outer_count(),
            polygons.hole_count(),
            mesh.triangle_count()
        );

        self.post.after_rebuild(&polygons, self.scale, &mesh);
        self.polygons = polygons;
        self.mesh = mesh;
        Ok(HoleUpdate::Rebuilt)
    }
}

impl<P: PostRebuild> Deformable for DestructibleTerrain<P> {
    fn request_hole(&mut self, world_position: Vec3, radius: f32) -> TerrainResult<HoleUpdate> {
        let center = self.to_local(world_position);
        self.subtract_circle(center, radius, self.config.circle_vertex_count)
    }
}
