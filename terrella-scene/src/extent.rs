use serde::{Deserialize, Serialize};

use crate::LonLatHeight;

/// Axis-aligned geodetic rectangle in degrees.
///
/// `new` does not reorder its corners; use [`Extent::create_by_coordinates`]
/// when the input order is not known to be south-west/north-east.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Extent {
    pub south_west: LonLatHeight,
    pub north_east: LonLatHeight,
}
impl Extent {
    pub const FULL: Extent = Extent {
        south_west: LonLatHeight {
            lon: -180.0,
            lat: -90.0,
            height: 0.0,
        },
        north_east: LonLatHeight {
            lon: 180.0,
            lat: 90.0,
            height: 0.0,
        },
    };
    pub fn new(south_west: LonLatHeight, north_east: LonLatHeight) -> Self {
        Self {
            south_west,
            north_east,
        }
    }
    pub fn from_degrees(west: f64, south: f64, east: f64, north: f64) -> Self {
        Self::new(
            LonLatHeight::from_lon_lat(west, south),
            LonLatHeight::from_lon_lat(east, north),
        )
    }
    /// Smallest extent covering every coordinate. An empty slice gives the
    /// default (degenerate) extent.
    pub fn create_by_coordinates(coordinates: &[LonLatHeight]) -> Self {
        let Some(first) = coordinates.first() else {
            return Self::default();
        };
        let mut west = first.lon;
        let mut east = first.lon;
        let mut south = first.lat;
        let mut north = first.lat;
        for c in coordinates.iter().skip(1) {
            west = west.min(c.lon);
            east = east.max(c.lon);
            south = south.min(c.lat);
            north = north.max(c.lat);
        }
        return Self::from_degrees(west, south, east, north);
    }
    pub fn west(&self) -> f64 {
        self.south_west.lon
    }
    pub fn south(&self) -> f64 {
        self.south_west.lat
    }
    pub fn east(&self) -> f64 {
        self.north_east.lon
    }
    pub fn north(&self) -> f64 {
        self.north_east.lat
    }
    pub fn width(&self) -> f64 {
        return self.east() - self.west();
    }
    pub fn height(&self) -> f64 {
        return self.north() - self.south();
    }
    pub fn is_well_formed(&self) -> bool {
        return self.west() <= self.east() && self.south() <= self.north();
    }
    pub fn center(&self) -> LonLatHeight {
        return LonLatHeight::from_lon_lat(
            (self.west() + self.east()) * 0.5,
            (self.south() + self.north()) * 0.5,
        );
    }
    pub fn north_west(&self) -> LonLatHeight {
        return LonLatHeight::from_lon_lat(self.west(), self.north());
    }
    pub fn south_east(&self) -> LonLatHeight {
        return LonLatHeight::from_lon_lat(self.east(), self.south());
    }
    /// Corners in counter-clockwise order starting at south-west.
    pub fn corners(&self) -> [LonLatHeight; 4] {
        [
            LonLatHeight::from_lon_lat(self.west(), self.south()),
            self.south_east(),
            LonLatHeight::from_lon_lat(self.east(), self.north()),
            self.north_west(),
        ]
    }
    pub fn contains_lon_lat(&self, lon_lat: &LonLatHeight) -> bool {
        return lon_lat.lon >= self.west()
            && lon_lat.lon <= self.east()
            && lon_lat.lat >= self.south()
            && lon_lat.lat <= self.north();
    }
    pub fn contains_extent(&self, other: &Extent) -> bool {
        return self.contains_lon_lat(&other.south_west) && self.contains_lon_lat(&other.north_east);
    }
    pub fn overlaps(&self, other: &Extent) -> bool {
        return self.west() < other.east()
            && other.west() < self.east()
            && self.south() < other.north()
            && other.south() < self.north();
    }
    /// Splits into `[north_west, north_east, south_west, south_east]`, the
    /// child order of [`crate::TileKey::children`].
    pub fn quadrants(&self) -> [Extent; 4] {
        let c = self.center();
        [
            Extent::from_degrees(self.west(), c.lat, c.lon, self.north()),
            Extent::from_degrees(c.lon, c.lat, self.east(), self.north()),
            Extent::from_degrees(self.west(), self.south(), c.lon, c.lat),
            Extent::from_degrees(c.lon, self.south(), self.east(), c.lat),
        ]
    }
    /// Sub-rectangle `[offset_x, offset_y, scale_x, scale_y]` that this extent
    /// occupies inside `parent`, in texture space (v grows southwards).
    pub fn texture_offset_within(&self, parent: &Extent) -> [f64; 4] {
        let parent_width = parent.width();
        let parent_height = parent.height();
        return [
            (self.west() - parent.west()) / parent_width,
            (parent.north() - self.north()) / parent_height,
            self.width() / parent_width,
            self.height() / parent_height,
        ];
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_by_coordinates_orders_corners() {
        let e = Extent::create_by_coordinates(&[
            LonLatHeight::from_lon_lat(10.0, -5.0),
            LonLatHeight::from_lon_lat(-20.0, 30.0),
            LonLatHeight::from_lon_lat(5.0, 0.0),
        ]);
        assert_eq!(e, Extent::from_degrees(-20.0, -5.0, 10.0, 30.0));
        assert!(e.is_well_formed());
        assert!(!Extent::from_degrees(10.0, 0.0, -10.0, 5.0).is_well_formed());
    }
    #[test]
    fn quadrants_tile_the_parent() {
        let e = Extent::from_degrees(0.0, 0.0, 90.0, 90.0);
        let [nw, ne, sw, se] = e.quadrants();
        assert_eq!(nw, Extent::from_degrees(0.0, 45.0, 45.0, 90.0));
        assert_eq!(ne, Extent::from_degrees(45.0, 45.0, 90.0, 90.0));
        assert_eq!(sw, Extent::from_degrees(0.0, 0.0, 45.0, 45.0));
        assert_eq!(se, Extent::from_degrees(45.0, 0.0, 90.0, 45.0));
        for q in e.quadrants() {
            assert!(e.contains_extent(&q));
        }
    }
    #[test]
    fn offset_within_parent() {
        let parent = Extent::from_degrees(0.0, 0.0, 90.0, 90.0);
        let [_, ne, sw, _] = parent.quadrants();
        assert_eq!(ne.texture_offset_within(&parent), [0.5, 0.0, 0.5, 0.5]);
        assert_eq!(sw.texture_offset_within(&parent), [0.0, 0.5, 0.5, 0.5]);
        assert_eq!(parent.texture_offset_within(&parent), [0.0, 0.0, 1.0, 1.0]);
    }
    #[test]
    fn overlap_excludes_shared_edges() {
        let a = Extent::from_degrees(0.0, 0.0, 10.0, 10.0);
        assert!(a.overlaps(&Extent::from_degrees(5.0, 5.0, 15.0, 15.0)));
        assert!(!a.overlaps(&Extent::from_degrees(10.0, 0.0, 20.0, 10.0)));
    }
}
