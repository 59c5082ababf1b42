mod imagery;

pub use imagery::*;

use std::sync::atomic::{AtomicU64, Ordering};

use bevy::prelude::Resource;
use terrella_scene::{Extent, TileKey};

use crate::{GpuDevice, Material, TextureFilter, TileTree};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LayerId(u64);

static NEXT_LAYER_ID: AtomicU64 = AtomicU64::new(0);

impl LayerId {
    pub fn new() -> Self {
        Self(NEXT_LAYER_ID.fetch_add(1, Ordering::Relaxed))
    }
}
impl Default for LayerId {
    fn default() -> Self {
        Self::new()
    }
}

/// Supplies imagery to the materials of one layer.
///
/// The layer decides how and when to fetch and how many attempts a tile gets;
/// it answers each attempt with `apply_image`, `apply_texture` or
/// `texture_not_exists` on the material.
pub trait Layer: Send + Sync + 'static {
    fn id(&self) -> LayerId;
    fn name(&self) -> &str;
    fn is_visible(&self) -> bool {
        true
    }
    fn texture_filter(&self) -> TextureFilter {
        TextureFilter::Linear
    }
    /// Starts a request for `material` unless one is in flight or the
    /// material is ready.
    fn load_material(&mut self, material: &mut Material, key: &TileKey, extent: &Extent);
    /// Cancels the in-flight request of `material`, if any.
    fn abort_material_loading(&mut self, material: &mut Material);
    /// Aborts any request and releases the material's GPU resources.
    fn clear_material(&mut self, material: &mut Material, device: &mut dyn GpuDevice);
    /// Applies finished requests to the tree. Called once per frame.
    fn update(&mut self, tree: &mut TileTree, device: &mut dyn GpuDevice);
}

/// Layers in draw order, bottom first.
#[derive(Resource, Default)]
pub struct Layers {
    layers: Vec<Box<dyn Layer>>,
}

impl Layers {
    pub fn add(&mut self, layer: impl Layer) -> LayerId {
        let id = layer.id();
        bevy::log::info!("adding layer '{}' ({:?})", layer.name(), id);
        self.layers.push(Box::new(layer));
        id
    }
    /// Removes a layer and clears its materials on every tile.
    pub fn remove(
        &mut self,
        id: LayerId,
        tree: &mut TileTree,
        device: &mut dyn GpuDevice,
    ) -> Option<Box<dyn Layer>> {
        let index = self.layers.iter().position(|l| l.id() == id)?;
        let mut layer = self.layers.remove(index);
        tree.clear_layer(layer.as_mut(), device);
        Some(layer)
    }
    pub fn get(&self, id: LayerId) -> Option<&(dyn Layer + 'static)> {
        self.layers.iter().find(|l| l.id() == id).map(|l| l.as_ref())
    }
    pub fn get_mut(&mut self, id: LayerId) -> Option<&mut (dyn Layer + 'static)> {
        self.layers
            .iter_mut()
            .find(|l| l.id() == id)
            .map(|l| l.as_mut())
    }
    pub fn iter(&self) -> impl Iterator<Item = &(dyn Layer + 'static)> {
        self.layers.iter().map(|l| l.as_ref())
    }
    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut (dyn Layer + 'static)> {
        self.layers.iter_mut().map(|l| l.as_mut())
    }
    pub fn len(&self) -> usize {
        self.layers.len()
    }
    pub fn is_empty(&self) -> bool {
        self.layers.is_empty()
    }
}
