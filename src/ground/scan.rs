//! Contains the scan-line merge that decides which parts of the ground need dense geometry.
//!
//! Holes are first swept bottom to top, clustering every hole whose footprint reaches the cluster so far into one horizontal band.
//! Within each band the footprints are then swept left to right the same way.
//! The result is a set of bands, each holding side by side regions, where no two regions overlap or touch
//! and every hole footprint lies inside exactly one region.

use core::iter::Peekable;

use crate::geometry::{Aabb, Hole};

/// One horizontal band of holes.
#[derive(Debug, Clone, PartialEq)]
pub struct ScanGroup {
    /// The union of every hole footprint in the band.
    pub total: Aabb,
    /// The merged regions of the band, ordered left to right.
    pub regions: Vec<Aabb>,
}

/// Sorts `holes` bottom to top and merges their footprints into [`ScanGroup`]s, ordered bottom to top.
///
/// Holes are ordered by the bottom of their footprint, so the vertical sweep stays correct when radii differ.
/// Footprints that touch, within [`APPROX_EPSILON`](crate::config::APPROX_EPSILON), are merged rather than left as neighbours,
/// so dense regions never share a seam.
pub fn scan_holes(holes: &mut [Hole]) -> Vec<ScanGroup> {
    holes.sort_by(|a, b| {
        a.aabb()
            .bottom
            .total_cmp(&b.aabb().bottom)
            .then(a.position().z.total_cmp(&b.position().z))
    });

    let mut groups = Vec::new();
    let mut footprints = holes.iter().map(Hole::aabb).peekable();
    while let Some((total, members)) = sweep(&mut footprints, Aabb::reaches_up_to) {
        groups.push(ScanGroup {
            total,
            regions: merge_horizontally(members),
        });
    }
    groups
}

/// Merges `footprints` of one band into left to right regions.
fn merge_horizontally(mut footprints: Vec<Aabb>) -> Vec<Aabb> {
    footprints.sort_by(Aabb::cmp_left);
    let mut regions = Vec::new();
    let mut footprints = footprints.into_iter().peekable();
    while let Some((region, _)) = sweep(&mut footprints, Aabb::reaches_right_to) {
        regions.push(region);
    }
    regions
}

/// Pulls the next cluster off the sorted `footprints`.
/// A footprint joins while `reaches(cluster, footprint)` holds for the union so far.
///
/// Returns the union and the members, or `None` when there is nothing left.
fn sweep(
    footprints: &mut Peekable<impl Iterator<Item = Aabb>>,
    reaches: impl Fn(&Aabb, &Aabb) -> bool,
) -> Option<(Aabb, Vec<Aabb>)> {
    let first = footprints.next()?;
    let mut total = first;
    let mut members = vec![first];
    while let Some(next) = footprints.next_if(|next| reaches(&total, next)) {
        total.union_with(&next);
        members.push(next);
    }
    Some((total, members))
}
