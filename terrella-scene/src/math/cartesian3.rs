use bevy::math::DVec3;

use super::equals_epsilon;

pub trait Cartesian3 {
    fn multiply_by_scalar(&self, scalar: f64) -> DVec3;
    fn magnitude(&self) -> f64;
    fn negate(&self) -> DVec3;
    fn midpoint(&self, right: DVec3) -> DVec3;
    fn minimum_by_component(&self, other: DVec3) -> DVec3;
    fn maximum_by_component(&self, other: DVec3) -> DVec3;
    fn equals_epsilon(
        &self,
        right: DVec3,
        relative_epsilon: Option<f64>,
        absolute_epsilon: Option<f64>,
    ) -> bool;
}
impl Cartesian3 for DVec3 {
    fn multiply_by_scalar(&self, scalar: f64) -> DVec3 {
        return DVec3::new(self.x * scalar, self.y * scalar, self.z * scalar);
    }
    fn magnitude(&self) -> f64 {
        return self.length();
    }
    fn negate(&self) -> DVec3 {
        return DVec3::new(-self.x, -self.y, -self.z);
    }
    fn midpoint(&self, right: DVec3) -> DVec3 {
        return (*self + right).multiply_by_scalar(0.5);
    }
    fn minimum_by_component(&self, other: DVec3) -> DVec3 {
        return DVec3::new(
            self.x.min(other.x),
            self.y.min(other.y),
            self.z.min(other.z),
        );
    }
    fn maximum_by_component(&self, other: DVec3) -> DVec3 {
        return DVec3::new(
            self.x.max(other.x),
            self.y.max(other.y),
            self.z.max(other.z),
        );
    }
    fn equals_epsilon(
        &self,
        right: DVec3,
        relative_epsilon: Option<f64>,
        absolute_epsilon: Option<f64>,
    ) -> bool {
        return *self == right
            || equals_epsilon(self.x, right.x, relative_epsilon, absolute_epsilon)
                && equals_epsilon(self.y, right.y, relative_epsilon, absolute_epsilon)
                && equals_epsilon(self.z, right.z, relative_epsilon, absolute_epsilon);
    }
}
