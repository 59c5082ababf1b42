use bevy::math::Vec3;

/// Largest identity a 24-bit RGB picking colour can carry.
pub const MAX_PICKING_ID: u32 = 0x00ff_ffff;

/// Packs an object identity into an RGB triple, red being the most
/// significant byte. Identities above [`MAX_PICKING_ID`] wrap.
pub fn encode_picking_color(id: u32) -> [u8; 3] {
    let id = id & MAX_PICKING_ID;
    [(id >> 16) as u8, (id >> 8) as u8, id as u8]
}

pub fn decode_picking_color(rgb: &[u8]) -> u32 {
    if rgb.len() < 3 {
        return 0;
    }
    return (rgb[0] as u32) << 16 | (rgb[1] as u32) << 8 | rgb[2] as u32;
}

/// Normalized form used as a shader uniform.
pub fn picking_color_to_vec3(rgb: [u8; 3]) -> Vec3 {
    Vec3::new(rgb[0] as f32, rgb[1] as f32, rgb[2] as f32) / 255.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encode_decode() {
        for id in [0, 1, 255, 256, 65_535, 123_456, MAX_PICKING_ID] {
            assert_eq!(decode_picking_color(&encode_picking_color(id)), id);
        }
        assert_eq!(encode_picking_color(0x0102_03), [1, 2, 3]);
        assert_eq!(decode_picking_color(&[1, 2]), 0);
    }
    #[test]
    fn normalized() {
        assert_eq!(picking_color_to_vec3([255, 0, 0]), Vec3::X);
    }
}
