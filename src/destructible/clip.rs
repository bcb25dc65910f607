//! Adapts [`PolygonTree`] to `geo`'s boolean operations and constrained Delaunay triangulation.
//!
//! `geo` works in `f64`, so contours are handed over as integer valued coordinates
//! and every result is rounded back onto the fixed-point lattice.

use bevy_math::{DVec2, I64Vec2};
use geo::{
    BooleanOps, Coord, Intersects, LineString, MultiPolygon, Polygon, TriangulateSpade,
    triangulate_spade::SpadeTriangulationConfig,
};

use crate::{
    config::TRIANGULATION_SNAP_RADIUS,
    destructible::fixed::{PolygonTree, simplify_loop},
    error::{TerrainError, TerrainResult},
};

/// Approximates a circle of `radius` around `center` with `vertex_count` points, counter-clockwise from +x.
/// Everything is in fixed-point units.
pub fn circle_loop(center: DVec2, radius: f64, vertex_count: usize) -> Vec<I64Vec2> {
    let delta = core::f64::consts::TAU / vertex_count as f64;
    (0..vertex_count)
        .map(|i| {
            let (sin, cos) = (delta * i as f64).sin_cos();
            let point = center + DVec2::new(cos, sin) * radius;
            I64Vec2::new(point.x.round() as i64, point.y.round() as i64)
        })
        .collect()
}

fn to_line_string(points: &[I64Vec2]) -> LineString<f64> {
    LineString::new(
        points
            .iter()
            .map(|p| Coord {
                x: p.x as f64,
                y: p.y as f64,
            })
            .collect(),
    )
}

fn from_line_string(ring: &LineString<f64>) -> TerrainResult<Vec<I64Vec2>> {
    ring.coords()
        .map(|c| {
            if c.x.is_finite() && c.y.is_finite() {
                Ok(I64Vec2::new(c.x.round() as i64, c.y.round() as i64))
            } else {
                Err(TerrainError::geometry(
                    "difference",
                    format!("produced a non-finite point {c:?}"),
                ))
            }
        })
        .collect()
}

/// Builds the `geo` polygon of the outer contour at `outer` and its holes.
fn to_polygon(tree: &PolygonTree, outer: usize) -> Polygon<f64> {
    Polygon::new(
        to_line_string(&tree.contours()[outer].points),
        tree.holes_of(outer)
            .map(|hole| to_line_string(&hole.points))
            .collect(),
    )
}

/// Builds the `geo` view of the whole tree.
pub fn to_multi_polygon(tree: &PolygonTree) -> MultiPolygon<f64> {
    MultiPolygon::new(tree.outers().map(|(i, _)| to_polygon(tree, i)).collect())
}

/// Rebuilds a tree from `geo` output, snapping to the lattice and dropping loops that collapse.
pub fn from_multi_polygon(polygons: &MultiPolygon<f64>) -> TerrainResult<PolygonTree> {
    let mut tree = PolygonTree::new();
    for polygon in polygons {
        let Some(exterior) = simplify_loop(from_line_string(polygon.exterior())?) else {
            continue;
        };
        let parent = tree.push_outer(exterior);
        for interior in polygon.interiors() {
            if let Some(hole) = simplify_loop(from_line_string(interior)?) {
                tree.push_hole(parent, hole);
            }
        }
    }
    Ok(tree)
}

/// Returns true if the closed loop `cutter` overlaps or touches anything in `tree`.
pub fn touches(tree: &PolygonTree, cutter: &[I64Vec2]) -> bool {
    let cutter = Polygon::new(to_line_string(cutter), Vec::new());
    to_multi_polygon(tree).intersects(&cutter)
}

/// Computes `tree` minus the closed loop `cutter`.
pub fn difference(tree: &PolygonTree, cutter: &[I64Vec2]) -> TerrainResult<PolygonTree> {
    let cutter = MultiPolygon::new(vec![Polygon::new(to_line_string(cutter), Vec::new())]);
    let result = to_multi_polygon(tree).difference(&cutter);
    from_multi_polygon(&result)
}

/// Triangulates every outer contour of `tree` around its holes.
///
/// Corners are in fixed-point units and every triangle is counter-clockwise.
/// Triangles with no area are dropped.
pub fn triangulate(tree: &PolygonTree) -> TerrainResult<Vec<[DVec2; 3]>> {
    let mut triangles = Vec::new();
    for (outer, _) in tree.outers() {
        let polygon = to_polygon(tree, outer);
        let config = SpadeTriangulationConfig {
            snap_radius: TRIANGULATION_SNAP_RADIUS,
        };
        let found = polygon.constrained_triangulation(config).map_err(|err| {
            TerrainError::geometry("triangulate", format!("contour {outer}: {err:?}"))
        })?;
        for triangle in found {
            let [a, b, c] = triangle.to_array().map(|c| DVec2::new(c.x, c.y));
            let doubled_area = (b - a).perp_dot(c - a);
            if doubled_area > 0.0 {
                triangles.push([a, b, c]);
            } else if doubled_area < 0.0 {
                triangles.push([a, c, b]);
            }
        }
    }
    Ok(triangles)
}
