mod bounding_volume;
mod camera;
mod culling_volume;
mod ellipsoid;
mod error;
mod event;
mod extent;
mod frustum;
mod lon_lat;
pub mod math;
mod picking;
mod plane;
mod tiling;

pub use bounding_volume::*;
pub use camera::*;
pub use culling_volume::*;
pub use ellipsoid::*;
pub use error::*;
pub use event::*;
pub use extent::*;
pub use frustum::*;
pub use lon_lat::*;
pub use math::*;
pub use picking::*;
pub use plane::*;
pub use tiling::*;
