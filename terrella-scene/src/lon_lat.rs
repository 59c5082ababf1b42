use std::f64::consts::PI;

use bevy::math::{DVec2, DVec3};
use serde::{Deserialize, Serialize};

use crate::Ellipsoid;

/// Geodetic position in degrees and metres.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct LonLatHeight {
    pub lon: f64,
    pub lat: f64,
    #[serde(default)]
    pub height: f64,
}
impl LonLatHeight {
    /// Half the circumference of the spherical mercator world, metres.
    pub const POLE: f64 = 20037508.34;
    pub const MAX_MERCATOR_LAT: f64 = 85.0511287798;

    pub fn new(lon: f64, lat: f64, height: f64) -> Self {
        Self { lon, lat, height }
    }
    pub fn from_lon_lat(lon: f64, lat: f64) -> Self {
        Self::new(lon, lat, 0.0)
    }
    /// Loose equality: the height is only compared when `other.height` is
    /// non-zero. This is asymmetric on purpose, callers rely on comparing a
    /// located point against a bare lon/lat.
    pub fn equal(&self, other: &LonLatHeight) -> bool {
        let height_ignored = other.height == 0.0 || other.height.is_nan();
        return self.lon == other.lon
            && self.lat == other.lat
            && (height_ignored || self.height == other.height);
    }
    pub fn to_radians(&self) -> DVec2 {
        return DVec2::new(self.lon.to_radians(), self.lat.to_radians());
    }
    pub fn to_cartesian(&self, ellipsoid: &Ellipsoid) -> DVec3 {
        return ellipsoid.lon_lat_to_cartesian(self);
    }
    /// Spherical (EPSG:3857) mercator metres. Latitudes beyond
    /// [`Self::MAX_MERCATOR_LAT`] are not clamped.
    pub fn forward_mercator(&self) -> DVec2 {
        let x = self.lon * Self::POLE / 180.0;
        let y = ((90.0 + self.lat) * PI / 360.0).tan().ln() / (PI / 180.0) * Self::POLE / 180.0;
        return DVec2::new(x, y);
    }
    pub fn inverse_mercator(x: f64, y: f64, height: f64) -> Self {
        let lon = 180.0 * x / Self::POLE;
        let lat = 180.0 / PI * (2.0 * (y / Self::POLE * PI).exp().atan() - PI / 2.0);
        return Self::new(lon, lat, height);
    }
    pub fn is_in_mercator_range(&self) -> bool {
        return self.lat.abs() <= Self::MAX_MERCATOR_LAT;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn equal_ignores_absent_height() {
        assert!(LonLatHeight::new(1.0, 2.0, 0.0).equal(&LonLatHeight::from_lon_lat(1.0, 2.0)));
        assert!(LonLatHeight::new(1.0, 2.0, 100.0).equal(&LonLatHeight::from_lon_lat(1.0, 2.0)));
        assert!(!LonLatHeight::from_lon_lat(1.0, 2.0).equal(&LonLatHeight::new(1.0, 2.0, 100.0)));
        assert!(!LonLatHeight::from_lon_lat(1.0, 2.5).equal(&LonLatHeight::from_lon_lat(1.0, 2.0)));
    }
    #[test]
    fn structural_eq_is_strict() {
        assert_ne!(
            LonLatHeight::new(1.0, 2.0, 100.0),
            LonLatHeight::from_lon_lat(1.0, 2.0)
        );
    }
    #[test]
    fn mercator_round_trip() {
        let p = LonLatHeight::new(37.6, 55.75, 12.0);
        let m = p.forward_mercator();
        let back = LonLatHeight::inverse_mercator(m.x, m.y, p.height);
        assert!((back.lon - p.lon).abs() < 1e-9);
        assert!((back.lat - p.lat).abs() < 1e-9);
        assert_eq!(back.height, 12.0);
    }
    #[test]
    fn mercator_edges() {
        let m = LonLatHeight::from_lon_lat(180.0, LonLatHeight::MAX_MERCATOR_LAT).forward_mercator();
        assert!((m.x - LonLatHeight::POLE).abs() < 1e-6);
        assert!((m.y - LonLatHeight::POLE).abs() < 1.0);
        assert!(!LonLatHeight::from_lon_lat(0.0, 89.0).is_in_mercator_range());
    }
    #[test]
    fn height_defaults_to_zero_when_deserialized() {
        let p: LonLatHeight = serde_json::from_str(r#"{"lon": 10.0, "lat": 20.0}"#).unwrap();
        assert_eq!(p.height, 0.0);
    }
}
