//! Contains the fixed-point polygon storage of the 2D terrain.
//!
//! Coordinates are scaled integers so repeated boolean operations never accumulate floating point drift.

use bevy_math::{DVec2, I64Vec2, Vec2};

/// Converts between world units and fixed-point units.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FixedScale(f64);

impl FixedScale {
    /// Constructs a scale of `units_per_world_unit` fixed-point units per world unit.
    pub const fn new(units_per_world_unit: f64) -> Self {
        Self(units_per_world_unit)
    }

    /// Fixed-point units per world unit.
    #[inline]
    pub const fn units(self) -> f64 {
        self.0
    }

    /// Rounds a world point to the nearest fixed-point point.
    #[inline]
    pub fn to_fixed(self, world: Vec2) -> I64Vec2 {
        let scaled = world.as_dvec2() * self.0;
        I64Vec2::new(scaled.x.round() as i64, scaled.y.round() as i64)
    }

    /// Maps a fixed-point point back to world units.
    #[inline]
    pub fn to_world(self, fixed: I64Vec2) -> Vec2 {
        self.to_world_f64(fixed.as_dvec2())
    }

    /// Maps a point in fixed-point space, that may not be on the integer lattice, back to world units.
    #[inline]
    pub fn to_world_f64(self, fixed: DVec2) -> Vec2 {
        (fixed / self.0).as_vec2()
    }
}

/// One closed loop of a [`PolygonTree`]. The closing edge from the last point back to the first is implied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Contour {
    /// The loop's points in fixed-point units.
    pub points: Vec<I64Vec2>,
    /// True if this loop cuts a hole out of its [`parent`](Self::parent).
    pub is_hole: bool,
    /// For holes, the index of the outer contour the hole is cut from. `None` for outer contours.
    pub parent: Option<usize>,
}

impl Contour {
    /// Twice the signed area. Positive for counter-clockwise loops.
    /// `None` if it does not fit in an `i128`.
    pub fn doubled_area(&self) -> Option<i128> {
        doubled_area(&self.points)
    }
}

/// Twice the signed area of the closed loop `points`. Positive for counter-clockwise loops.
/// `None` if the sum overflows, which only happens for points far outside any valid terrain.
pub fn doubled_area(points: &[I64Vec2]) -> Option<i128> {
    let Some(&last) = points.last() else {
        return Some(0);
    };
    let mut previous = last;
    let mut sum = 0i128;
    for &point in points {
        let cross = (previous.x as i128)
            .checked_mul(point.y as i128)?
            .checked_sub((point.x as i128).checked_mul(previous.y as i128)?)?;
        sum = sum.checked_add(cross)?;
        previous = point;
    }
    Some(sum)
}

/// Removes consecutive repeats, including between the last and first point,
/// returning `None` if fewer than 3 points or no measurable area remain.
pub fn simplify_loop(mut points: Vec<I64Vec2>) -> Option<Vec<I64Vec2>> {
    points.dedup();
    while points.len() > 1 && points.first() == points.last() {
        points.pop();
    }
    let has_area = points.len() >= 3 && doubled_area(&points).is_some_and(|area| area != 0);
    has_area.then_some(points)
}

/// A set of polygons with holes, stored as a flat list of contours.
///
/// Every hole points at the outer contour it belongs to, and always comes after it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PolygonTree {
    contours: Vec<Contour>,
}

impl PolygonTree {
    /// Constructs an empty tree.
    pub fn new() -> Self {
        Self::default()
    }

    /// Constructs a tree holding a single axis aligned rectangle from `min` to `max`, wound counter-clockwise.
    pub fn rectangle(min: I64Vec2, max: I64Vec2) -> Self {
        let mut tree = Self::new();
        tree.push_outer(vec![
            min,
            I64Vec2::new(max.x, min.y),
            max,
            I64Vec2::new(min.x, max.y),
        ]);
        tree
    }

    /// Adds an outer contour, returning its index.
    pub fn push_outer(&mut self, points: Vec<I64Vec2>) -> usize {
        self.contours.push(Contour {
            points,
            is_hole: false,
            parent: None,
        });
        self.contours.len() - 1
    }

    /// Adds a hole cut from the outer contour at `parent`.
    pub fn push_hole(&mut self, parent: usize, points: Vec<I64Vec2>) {
        debug_assert!(!self.contours[parent].is_hole);
        self.contours.push(Contour {
            points,
            is_hole: true,
            parent: Some(parent),
        });
    }

    /// Returns true if there are no contours.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.contours.is_empty()
    }

    /// Every contour, outer and hole.
    #[inline]
    pub fn contours(&self) -> &[Contour] {
        &self.contours
    }

    /// Iterates the outer contours with their indices.
    pub fn outers(&self) -> impl Iterator<Item = (usize, &Contour)> + '_ {
        self.contours.iter().enumerate().filter(|(_, c)| !c.is_hole)
    }

    /// Iterates the holes cut from the outer contour at `parent`.
    pub fn holes_of(&self, parent: usize) -> impl Iterator<Item = &Contour> + '_ {
        self.contours
            .iter()
            .filter(move |c| c.is_hole && c.parent == Some(parent))
    }

    /// The number of outer contours.
    pub fn outer_count(&self) -> usize {
        self.outers().count()
    }

    /// The number of holes.
    pub fn hole_count(&self) -> usize {
        self.contours.len() - self.outer_count()
    }

    /// Twice the area covered, holes subtracted. `None` on overflow.
    pub fn doubled_area(&self) -> Option<i128> {
        self.contours.iter().try_fold(0i128, |total, c| {
            let area = c.doubled_area()?.abs();
            if c.is_hole {
                total.checked_sub(area)
            } else {
                total.checked_add(area)
            }
        })
    }
}
