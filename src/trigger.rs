//! The inbound side of the terrains: the [`Deformable`] request API and the one-shot [`HoleTrigger`].

use bevy_math::Vec3;

use crate::error::TerrainResult;

/// What a hole request ended up doing to a terrain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HoleUpdate {
    /// The request was malformed or could not change the surface, so nothing happened.
    Ignored,
    /// Existing vertices were sunk in place. The topology is unchanged.
    Displaced,
    /// The whole surface was rebuilt.
    Rebuilt,
}

/// A surface holes can be punched into.
///
/// Hosts hand a `&mut` to whatever detects impacts, instead of the terrain being looked up globally.
pub trait Deformable {
    /// Punches a hole of `radius` at `world_position`.
    /// The position is mapped into the terrain's local space first.
    ///
    /// Malformed requests are skipped and reported as [`HoleUpdate::Ignored`].
    /// An error means the geometry machinery failed and the terrain kept its previous state.
    fn request_hole(&mut self, world_position: Vec3, radius: f32) -> TerrainResult<HoleUpdate>;
}

/// Fires a single hole into a [`Deformable`] the first time it collides, then disarms.
///
/// This lets a projectile that keeps touching the ground punch only one crater.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HoleTrigger {
    radius: f32,
    armed: bool,
}

impl HoleTrigger {
    /// Constructs an armed trigger that punches holes of `radius`.
    pub const fn new(radius: f32) -> Self {
        Self {
            radius,
            armed: true,
        }
    }

    /// The radius this punches.
    #[inline]
    pub const fn radius(&self) -> f32 {
        self.radius
    }

    /// Returns true if the next collision will punch a hole.
    #[inline]
    pub const fn is_armed(&self) -> bool {
        self.armed
    }

    /// Re-arms the trigger so the next collision punches another hole.
    #[inline]
    pub fn rearm(&mut self) {
        self.armed = true;
    }

    /// Reports a collision at `world_position`.
    /// The first call punches a hole into `target`, later ones are [`HoleUpdate::Ignored`] until [`rearm`](Self::rearm).
    pub fn on_collision(
        &mut self,
        world_position: Vec3,
        target: &mut impl Deformable,
    ) -> TerrainResult<HoleUpdate> {
        if !self.armed {
            return Ok(HoleUpdate::Ignored);
        }
        self.armed = false;
        target.request_hole(world_position, self.radius)
    }
}
