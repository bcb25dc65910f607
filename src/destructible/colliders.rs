//! Post-rebuild steps for [`DestructibleTerrain`](super::DestructibleTerrain), most notably boundary colliders.

use bevy_math::Vec2;

use crate::{
    destructible::fixed::{FixedScale, PolygonTree},
    mesh::MeshBuffer,
};

/// Runs after every successful rebuild of a [`DestructibleTerrain`](super::DestructibleTerrain).
///
/// The terrain calls this with its fresh polygons and mesh, so anything derived from them can be regenerated.
pub trait PostRebuild {
    /// Called with the state the terrain just committed.
    fn after_rebuild(&mut self, polygons: &PolygonTree, scale: FixedScale, mesh: &MeshBuffer);
}

impl PostRebuild for () {
    fn after_rebuild(&mut self, _: &PolygonTree, _: FixedScale, _: &MeshBuffer) {}
}

/// Keeps one closed edge loop per contour, for edge based 2D physics colliders.
///
/// Outer boundaries and hole boundaries both become loops.
/// Each loop repeats its first point at the end.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EdgeColliders {
    loops: Vec<Vec<Vec2>>,
}

impl EdgeColliders {
    /// Constructs an empty set of colliders. It fills in on the first rebuild.
    pub fn new() -> Self {
        Self::default()
    }

    /// The current loops, in local world units.
    #[inline]
    pub fn loops(&self) -> &[Vec<Vec2>] {
        &self.loops
    }
}

impl PostRebuild for EdgeColliders {
    fn after_rebuild(&mut self, polygons: &PolygonTree, scale: FixedScale, _: &MeshBuffer) {
        self.loops.clear();
        for contour in polygons.contours() {
            let mut edge: Vec<Vec2> = contour.points.iter().map(|p| scale.to_world(*p)).collect();
            if let Some(&first) = edge.first() {
                edge.push(first);
            }
            self.loops.push(edge);
        }
    }
}

#[cfg(test)]
mod tests {
    use bevy_math::I64Vec2;

    use super::*;

    #[test]
    fn one_closed_loop_per_contour() {
        let scale = FixedScale::new(10.0);
        let mut polygons = PolygonTree::rectangle(I64Vec2::ZERO, I64Vec2::splat(100));
        polygons.push_hole(
            0,
            vec![I64Vec2::new(40, 40), I64Vec2::new(40, 60), I64Vec2::new(60, 50)],
        );

        let mut colliders = EdgeColliders::new();
        colliders.after_rebuild(&polygons, scale, &MeshBuffer::new());
        assert_eq!(colliders.loops().len(), 2);
        assert_eq!(colliders.loops()[0].len(), 5);
        assert_eq!(colliders.loops()[1].len(), 4);
        for edge in colliders.loops() {
            assert_eq!(edge.first(), edge.last());
        }
        assert_eq!(colliders.loops()[0][2], Vec2::new(10.0, 10.0));

        // Regenerated wholesale, not appended.
        colliders.after_rebuild(&PolygonTree::new(), scale, &MeshBuffer::new());
        assert!(colliders.loops().is_empty());
    }
}
