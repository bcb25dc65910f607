//! Contains the plain value types the terrain engines reason with: [`Hole`] and [`Aabb`].

use core::cmp::Ordering;

use bevy_math::{FloatExt, Vec2, Vec3};

use crate::config::{APPROX_EPSILON, APPROX_EPSILON_FLOOR};

/// Returns true if `a` and `b` are within [`APPROX_EPSILON`] of eachother, relative to the larger magnitude.
/// Near zero the tolerance bottoms out at [`APPROX_EPSILON_FLOOR`].
#[inline]
pub fn approx_eq(a: f32, b: f32) -> bool {
    let tolerance = (APPROX_EPSILON * a.abs().max(b.abs())).max(APPROX_EPSILON_FLOOR);
    (a - b).abs() <= tolerance
}

/// Returns true if `low <= high`, treating values that are [`approx_eq`] as equal.
#[inline]
pub fn approx_le(low: f32, high: f32) -> bool {
    low <= high || approx_eq(low, high)
}

/// A circular crater punched into a terrain.
///
/// The position is in the terrain's local space.
/// Only `x` and `z` decide which part of the surface the hole covers,
/// but `y` still matters for how deep the crater sinks vertices, see [`Hole::sink_at`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Hole {
    position: Vec3,
    radius: f32,
}

impl Hole {
    /// Constructs a hole if `position` is finite and `radius` is finite and positive.
    pub fn new(position: Vec3, radius: f32) -> Option<Self> {
        (position.is_finite() && radius.is_finite() && radius > 0.0)
            .then_some(Self { position, radius })
    }

    /// The center of the hole in local space.
    #[inline]
    pub fn position(&self) -> Vec3 {
        self.position
    }

    /// The radius of influence of the hole.
    #[inline]
    pub fn radius(&self) -> f32 {
        self.radius
    }

    /// The footprint of the hole on the xz plane.
    #[inline]
    pub fn aabb(&self) -> Aabb {
        let Vec3 { x, z, .. } = self.position;
        let r = self.radius;
        Aabb::new(z - r, z + r, x - r, x + r)
    }

    /// How far a vertex at `point` sinks because of this hole.
    ///
    /// This is a smooth bowl, not a sphere cut:
    /// the full radius at the center, fading to nothing at the rim, and zero beyond it.
    /// Distance is measured in 3D to the point as it is now, so a vertex that already sank moves away from the center.
    #[inline]
    pub fn sink_at(&self, point: Vec3) -> f32 {
        let sqr_radius = self.radius * self.radius;
        let sqr_distance = point.distance_squared(self.position);
        if sqr_distance > sqr_radius {
            return 0.0;
        }
        let percent = (sqr_radius - sqr_distance) / sqr_radius;
        FloatExt::lerp(0.0_f32, self.radius, percent)
    }
}

/// An axis aligned rectangle on the terrain's xz plane.
/// `bottom` and `top` bound z, `left` and `right` bound x.
///
/// Every constructor keeps `bottom <= top` and `left <= right`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Aabb {
    /// The lowest z.
    pub bottom: f32,
    /// The highest z.
    pub top: f32,
    /// The lowest x.
    pub left: f32,
    /// The highest x.
    pub right: f32,
}

impl Aabb {
    /// The whole normalized terrain footprint.
    pub const UNIT: Self = Self::new(0.0, 1.0, 0.0, 1.0);

    /// Constructs the [`Aabb`] from its bounds.
    #[inline]
    pub const fn new(bottom: f32, top: f32, left: f32, right: f32) -> Self {
        Self {
            bottom,
            top,
            left,
            right,
        }
    }

    /// Constructs the [`Aabb`] spanning `start` (bottom left) to `end` (top right), where `x` is horizontal and `y` is vertical.
    #[inline]
    pub fn from_corners(start: Vec2, end: Vec2) -> Self {
        Self::new(start.y, end.y, start.x, end.x)
    }

    /// The bottom left corner.
    #[inline]
    pub fn start(&self) -> Vec2 {
        Vec2::new(self.left, self.bottom)
    }

    /// The top right corner.
    #[inline]
    pub fn end(&self) -> Vec2 {
        Vec2::new(self.right, self.top)
    }

    /// The horizontal extent.
    #[inline]
    pub fn width(&self) -> f32 {
        self.right - self.left
    }

    /// The vertical extent.
    #[inline]
    pub fn height(&self) -> f32 {
        self.top - self.bottom
    }

    /// Returns true if this covers no area, which includes inverted bounds.
    #[inline]
    pub fn is_degenerate(&self) -> bool {
        !(self.right > self.left && self.top > self.bottom)
    }

    /// Grows this to also cover `other`.
    #[inline]
    pub fn union_with(&mut self, other: &Aabb) {
        self.bottom = self.bottom.min(other.bottom);
        self.top = self.top.max(other.top);
        self.left = self.left.min(other.left);
        self.right = self.right.max(other.right);
    }

    /// Returns the smallest [`Aabb`] covering both.
    #[inline]
    pub fn union(mut self, other: &Aabb) -> Self {
        self.union_with(other);
        self
    }

    /// Returns true if `other` lies entirely within this. Shared edges count as inside.
    #[inline]
    pub fn contains(&self, other: &Aabb) -> bool {
        self.bottom <= other.bottom
            && self.top >= other.top
            && self.left <= other.left
            && self.right >= other.right
    }

    /// Returns true if the two overlap or share an edge.
    #[inline]
    pub fn intersects(&self, other: &Aabb) -> bool {
        self.left <= other.right
            && other.left <= self.right
            && self.bottom <= other.top
            && other.bottom <= self.top
    }

    /// Returns true if `next`, which starts no lower than this, overlaps or touches this vertically.
    /// Coordinates that are [`approx_eq`] count as touching.
    #[inline]
    pub fn reaches_up_to(&self, next: &Aabb) -> bool {
        approx_le(next.bottom, self.top)
    }

    /// Returns true if `next`, which starts no further left than this, overlaps or touches this horizontally.
    /// Coordinates that are [`approx_eq`] count as touching.
    #[inline]
    pub fn reaches_right_to(&self, next: &Aabb) -> bool {
        approx_le(next.left, self.right)
    }

    /// Orders by [`left`](Self::left), the order of the horizontal merge pass.
    #[inline]
    pub fn cmp_left(&self, other: &Aabb) -> Ordering {
        self.left.total_cmp(&other.left)
    }

    /// Maps this from local units into the normalized footprint of a `width` by `height` terrain.
    #[inline]
    pub fn normalized(&self, width: f32, height: f32) -> Self {
        Self::new(
            self.bottom / height,
            self.top / height,
            self.left / width,
            self.right / width,
        )
    }

    /// Clamps every bound into [0, 1].
    #[inline]
    pub fn clamped_to_unit(&self) -> Self {
        Self::new(
            self.bottom.clamp(0.0, 1.0),
            self.top.clamp(0.0, 1.0),
            self.left.clamp(0.0, 1.0),
            self.right.clamp(0.0, 1.0),
        )
    }
}
