use bevy::math::{DVec3, Vec3};

const SPLIT: f64 = 65536.0;

/// Splits a double into a high part that is a multiple of 65536 and the f32
/// remainder, so `high + low` reproduces the value to sub-centimetre at
/// planetary distances when both halves are subtracted on the GPU.
pub fn split_double(value: f64) -> (f32, f32) {
    if value >= 0.0 {
        let double_high = (value / SPLIT).floor() * SPLIT;
        return (double_high as f32, (value - double_high) as f32);
    }
    let double_high = (-value / SPLIT).floor() * SPLIT;
    return ((-double_high) as f32, (value + double_high) as f32);
}

/// A world position kept in f64 plus its relative-to-eye render encoding.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct EyePosition {
    pub world: DVec3,
    pub high: Vec3,
    pub low: Vec3,
}
impl EyePosition {
    pub fn from_world(world: DVec3) -> Self {
        let (hx, lx) = split_double(world.x);
        let (hy, ly) = split_double(world.y);
        let (hz, lz) = split_double(world.z);
        Self {
            world,
            high: Vec3::new(hx, hy, hz),
            low: Vec3::new(lx, ly, lz),
        }
    }
    /// Recombines both halves in f64.
    pub fn recombine(&self) -> DVec3 {
        return self.high.as_dvec3() + self.low.as_dvec3();
    }
}
