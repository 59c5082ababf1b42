use serde::{Deserialize, Serialize};

use crate::{Ellipsoid, Extent};

#[derive(Default, Clone, Copy, Debug, Hash, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TileKey {
    pub x: u32,
    pub y: u32,
    pub level: u32,
}
impl TileKey {
    pub fn new(x: u32, y: u32, level: u32) -> Self {
        Self { x, y, level }
    }
    pub fn northwest(&self) -> TileKey {
        TileKey::new(self.x * 2, self.y * 2, self.level + 1)
    }
    pub fn northeast(&self) -> TileKey {
        TileKey::new(self.x * 2 + 1, self.y * 2, self.level + 1)
    }
    pub fn southwest(&self) -> TileKey {
        TileKey::new(self.x * 2, self.y * 2 + 1, self.level + 1)
    }
    pub fn southeast(&self) -> TileKey {
        TileKey::new(self.x * 2 + 1, self.y * 2 + 1, self.level + 1)
    }
    pub fn children(&self) -> [TileKey; 4] {
        [
            self.northwest(),
            self.northeast(),
            self.southwest(),
            self.southeast(),
        ]
    }
    pub fn parent(&self) -> Option<TileKey> {
        if self.level == 0 {
            return None;
        }
        Some(TileKey::new(self.x / 2, self.y / 2, self.level - 1))
    }
}

/// Equirectangular tiling: two level-zero tiles side by side, row 0 at the
/// north edge.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeographicTilingScheme {
    pub ellipsoid: Ellipsoid,
    pub extent: Extent,
    pub number_of_level_zero_tiles_x: u32,
    pub number_of_level_zero_tiles_y: u32,
}
impl Default for GeographicTilingScheme {
    fn default() -> Self {
        Self {
            ellipsoid: Ellipsoid::WGS84,
            extent: Extent::FULL,
            number_of_level_zero_tiles_x: 2,
            number_of_level_zero_tiles_y: 1,
        }
    }
}
impl GeographicTilingScheme {
    pub fn get_number_of_x_tiles_at_level(&self, level: u32) -> u32 {
        return self.number_of_level_zero_tiles_x << level;
    }
    pub fn get_number_of_y_tiles_at_level(&self, level: u32) -> u32 {
        return self.number_of_level_zero_tiles_y << level;
    }
    pub fn root_keys(&self) -> Vec<TileKey> {
        let mut keys = Vec::new();
        for y in 0..self.number_of_level_zero_tiles_y {
            for x in 0..self.number_of_level_zero_tiles_x {
                keys.push(TileKey::new(x, y, 0));
            }
        }
        keys
    }
    pub fn tile_key_to_extent(&self, key: &TileKey) -> Extent {
        let x_tiles = self.get_number_of_x_tiles_at_level(key.level) as f64;
        let y_tiles = self.get_number_of_y_tiles_at_level(key.level) as f64;
        let tile_width = self.extent.width() / x_tiles;
        let tile_height = self.extent.height() / y_tiles;
        let west = self.extent.west() + key.x as f64 * tile_width;
        let north = self.extent.north() - key.y as f64 * tile_height;
        return Extent::from_degrees(west, north - tile_height, west + tile_width, north);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parent_of_children() {
        let key = TileKey::new(3, 1, 2);
        for child in key.children() {
            assert_eq!(child.parent(), Some(key));
        }
        assert_eq!(TileKey::new(1, 0, 0).parent(), None);
    }
    #[test]
    fn level_zero_extents() {
        let scheme = GeographicTilingScheme::default();
        let roots = scheme.root_keys();
        assert_eq!(roots.len(), 2);
        assert_eq!(
            scheme.tile_key_to_extent(&roots[0]),
            Extent::from_degrees(-180.0, -90.0, 0.0, 90.0)
        );
        assert_eq!(
            scheme.tile_key_to_extent(&roots[1]),
            Extent::from_degrees(0.0, -90.0, 180.0, 90.0)
        );
    }
    #[test]
    fn child_extents_match_quadrants() {
        let scheme = GeographicTilingScheme::default();
        let key = TileKey::new(1, 0, 0);
        let quadrants = scheme.tile_key_to_extent(&key).quadrants();
        for (child, quadrant) in key.children().iter().zip(quadrants.iter()) {
            assert_eq!(scheme.tile_key_to_extent(child), *quadrant);
        }
    }
}
