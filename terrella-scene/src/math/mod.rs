mod cartesian3;
mod matrix4;
mod split_double;

pub use cartesian3::*;
pub use matrix4::*;
pub use split_double::*;

pub const EPSILON1: f64 = 0.1;
pub const EPSILON2: f64 = 0.01;
pub const EPSILON3: f64 = 0.001;
pub const EPSILON6: f64 = 0.000001;
pub const EPSILON7: f64 = 0.0000001;
pub const EPSILON10: f64 = 0.0000000001;
pub const EPSILON12: f64 = 0.000000000001;
pub const EPSILON14: f64 = 0.00000000000001;
pub const EPSILON15: f64 = 0.000000000000001;

pub const RADIANS_PER_DEGREE: f64 = std::f64::consts::PI / 180.0;

/// Relative comparison with an absolute floor, the same rule the matrix and
/// vector helpers use.
pub fn equals_epsilon(
    left: f64,
    right: f64,
    relative_epsilon: Option<f64>,
    absolute_epsilon: Option<f64>,
) -> bool {
    let relative_epsilon = relative_epsilon.unwrap_or(0.0);
    let absolute_epsilon = absolute_epsilon.unwrap_or(relative_epsilon);
    let absolute_diff = (left - right).abs();
    return absolute_diff <= absolute_epsilon
        || absolute_diff <= relative_epsilon * left.abs().max(right.abs());
}
