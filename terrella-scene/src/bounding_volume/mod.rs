mod bounding_box;
mod bounding_sphere;

pub use bounding_box::*;
pub use bounding_sphere::*;

use bevy::math::DVec3;

use crate::{math::Cartesian3, Ellipsoid, Extent, Plane};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Intersect {
    Outside,
    Intersecting,
    Inside,
}

pub trait BoundingVolume {
    fn intersect_plane(&self, plane: &Plane) -> Intersect;
}

/// `[xmin, ymin, zmin, xmax, ymax, zmax]` of the four extent corners projected
/// onto the ellipsoid.
///
/// Only the corners are sampled. Extents that reach a pole or wrap the
/// antimeridian bulge outside these bounds.
pub fn bounds_from_extent(ellipsoid: &Ellipsoid, extent: &Extent) -> [f64; 6] {
    let corners = extent.corners().map(|c| ellipsoid.lon_lat_to_cartesian(&c));
    let mut min = corners[0];
    let mut max = corners[0];
    for c in corners.iter().skip(1) {
        min = min.minimum_by_component(*c);
        max = max.maximum_by_component(*c);
    }
    [min.x, min.y, min.z, max.x, max.y, max.z]
}

pub(crate) fn bounds_min_max(bounds: &[f64; 6]) -> (DVec3, DVec3) {
    (
        DVec3::new(bounds[0], bounds[1], bounds[2]),
        DVec3::new(bounds[3], bounds[4], bounds[5]),
    )
}
