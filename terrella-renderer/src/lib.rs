mod context;
mod device;
mod error;
mod layer;
mod material;
mod plugin;
mod render_target;
mod settings;
mod tile_tree;

pub use context::*;
pub use device::*;
pub use error::*;
pub use layer::*;
pub use material::*;
pub use plugin::*;
pub use render_target::*;
pub use settings::*;
pub use tile_tree::*;
