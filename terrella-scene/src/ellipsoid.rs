use bevy::math::DVec3;
use serde::{Deserialize, Serialize};

use crate::LonLatHeight;

/// Oblate ellipsoid of revolution given by its semi-major (equatorial) and
/// semi-minor (polar) axes. Cartesian output is earth-centered, Z through the
/// north pole, X through lon 0.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Ellipsoid {
    pub a: f64,
    pub b: f64,
}
impl Default for Ellipsoid {
    fn default() -> Self {
        Self::WGS84
    }
}
impl Ellipsoid {
    pub const WGS84: Ellipsoid = Ellipsoid {
        a: 6378137.0,
        b: 6356752.3142451793,
    };
    pub const CGCS2000: Ellipsoid = Ellipsoid {
        a: 6378137.0,
        b: 6356752.314140356,
    };
    pub const UNIT_SPHERE: Ellipsoid = Ellipsoid { a: 1.0, b: 1.0 };

    pub fn new(a: f64, b: f64) -> Self {
        Self { a, b }
    }
    pub fn flattening(&self) -> f64 {
        return (self.a - self.b) / self.a;
    }
    pub fn eccentricity_squared(&self) -> f64 {
        return 1.0 - (self.b * self.b) / (self.a * self.a);
    }
    pub fn maximum_radius(&self) -> f64 {
        return self.a.max(self.b);
    }
    pub fn minimum_radius(&self) -> f64 {
        return self.a.min(self.b);
    }
    /// Prime vertical radius of curvature at the given latitude (radians).
    fn prime_vertical_radius(&self, latitude: f64) -> f64 {
        let sin_lat = latitude.sin();
        return self.a / (1.0 - self.eccentricity_squared() * sin_lat * sin_lat).sqrt();
    }
    pub fn geodetic_surface_normal(&self, lon_lat: &LonLatHeight) -> DVec3 {
        let r = lon_lat.to_radians();
        let cos_lat = r.y.cos();
        return DVec3::new(cos_lat * r.x.cos(), cos_lat * r.x.sin(), r.y.sin()).normalize();
    }
    pub fn lon_lat_to_cartesian(&self, lon_lat: &LonLatHeight) -> DVec3 {
        let r = lon_lat.to_radians();
        let (longitude, latitude) = (r.x, r.y);
        let n = self.prime_vertical_radius(latitude);
        let h = lon_lat.height;
        let cos_lat = latitude.cos();
        return DVec3::new(
            (n + h) * cos_lat * longitude.cos(),
            (n + h) * cos_lat * longitude.sin(),
            (n * (1.0 - self.eccentricity_squared()) + h) * latitude.sin(),
        );
    }
    /// Bowring's closed-form inverse, accurate to well under a millimetre for
    /// heights within a few thousand kilometres of the surface.
    pub fn cartesian_to_lon_lat(&self, cartesian: &DVec3) -> LonLatHeight {
        let a = self.a;
        let b = self.b;
        let e2 = self.eccentricity_squared();
        let ep2 = (a * a - b * b) / (b * b);
        let p = (cartesian.x * cartesian.x + cartesian.y * cartesian.y).sqrt();
        let longitude = cartesian.y.atan2(cartesian.x);
        if p < 1e-9 {
            let latitude = if cartesian.z >= 0.0 { 90.0 } else { -90.0 };
            return LonLatHeight::new(longitude.to_degrees(), latitude, cartesian.z.abs() - b);
        }
        let theta = (cartesian.z * a).atan2(p * b);
        let (sin_t, cos_t) = theta.sin_cos();
        let latitude = (cartesian.z + ep2 * b * sin_t * sin_t * sin_t)
            .atan2(p - e2 * a * cos_t * cos_t * cos_t);
        let height = p / latitude.cos() - self.prime_vertical_radius(latitude);
        return LonLatHeight::new(longitude.to_degrees(), latitude.to_degrees(), height);
    }
}
