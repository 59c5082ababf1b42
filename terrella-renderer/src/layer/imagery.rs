use std::sync::Arc;

use bevy::utils::HashMap;
use terrella_jobs::{AsyncReturn, Context, Job, JobId, JobQueue};
use terrella_scene::{Extent, TileKey};

use super::{Layer, LayerId};
use crate::{
    GpuDevice, ImageryError, Material, NodeId, RendererSettings, TextureFilter, TextureFormat,
    TileTree,
};

/// Decoded pixels, rows from the top.
#[derive(Debug, Clone, PartialEq)]
pub struct ImageData {
    pub width: u32,
    pub height: u32,
    pub format: TextureFormat,
    pub pixels: Vec<u8>,
}
impl ImageData {
    pub fn new(width: u32, height: u32, pixels: Vec<u8>) -> Result<Self, ImageryError> {
        let expected = width as usize * height as usize * TextureFormat::Rgba8Unorm.bytes_per_pixel();
        if pixels.len() != expected {
            return Err(ImageryError::Decode(format!(
                "{}x{} image needs {} bytes, got {}",
                width,
                height,
                expected,
                pixels.len()
            )));
        }
        Ok(Self {
            width,
            height,
            format: TextureFormat::Rgba8Unorm,
            pixels,
        })
    }
    pub fn solid(width: u32, height: u32, rgba: [u8; 4]) -> Self {
        Self {
            width,
            height,
            format: TextureFormat::Rgba8Unorm,
            pixels: rgba.repeat(width as usize * height as usize),
        }
    }
}

/// Source of tile imagery. Requests run off the main thread.
pub trait ImageryProvider: Send + Sync + 'static {
    fn request_image(
        &self,
        key: &TileKey,
        extent: &Extent,
    ) -> AsyncReturn<Result<ImageData, ImageryError>>;
    /// Deepest level with data; deeper tiles keep showing an ancestor.
    fn maximum_level(&self) -> u32;
}

/// Fills every tile with one colour.
#[derive(Debug, Clone)]
pub struct SolidColorImageryProvider {
    pub color: [u8; 4],
    pub tile_size: u32,
    pub maximum_level: u32,
}
impl SolidColorImageryProvider {
    pub fn new(color: [u8; 4]) -> Self {
        Self {
            color,
            tile_size: 256,
            maximum_level: 22,
        }
    }
}
impl ImageryProvider for SolidColorImageryProvider {
    fn request_image(&self, _: &TileKey, _: &Extent) -> AsyncReturn<Result<ImageData, ImageryError>> {
        let image = ImageData::solid(self.tile_size, self.tile_size, self.color);
        Box::pin(async move { Ok(image) })
    }
    fn maximum_level(&self) -> u32 {
        self.maximum_level
    }
}

pub struct FetchImageryJob {
    pub provider: Arc<dyn ImageryProvider>,
    pub node_id: NodeId,
    pub key: TileKey,
    pub extent: Extent,
}

pub struct FetchedImagery {
    pub node_id: NodeId,
    pub key: TileKey,
    pub result: Result<ImageData, ImageryError>,
}

impl Job for FetchImageryJob {
    type Outcome = FetchedImagery;

    fn name(&self) -> String {
        format!("imagery {}/{}/{}", self.key.level, self.key.x, self.key.y)
    }

    fn perform(self, _: Context) -> AsyncReturn<Self::Outcome> {
        Box::pin(async move {
            let result = self.provider.request_image(&self.key, &self.extent).await;
            FetchedImagery {
                node_id: self.node_id,
                key: self.key,
                result,
            }
        })
    }
}

struct PendingRequest {
    job_id: JobId,
    requested_at: instant::Instant,
}

/// A layer fed by an [`ImageryProvider`], one job per tile request.
pub struct ImageryLayer {
    id: LayerId,
    name: String,
    provider: Arc<dyn ImageryProvider>,
    max_loading_attempts: u32,
    filter: TextureFilter,
    show: bool,
    jobs: JobQueue,
    pending: HashMap<NodeId, PendingRequest>,
}

impl ImageryLayer {
    pub fn new(
        name: impl Into<String>,
        provider: impl ImageryProvider,
        settings: &RendererSettings,
    ) -> Self {
        Self {
            id: LayerId::new(),
            name: name.into(),
            provider: Arc::new(provider),
            max_loading_attempts: settings.max_loading_attempts,
            filter: settings.texture_filter,
            show: true,
            jobs: JobQueue::default(),
            pending: HashMap::default(),
        }
    }
    pub fn max_loading_attempts(&self) -> u32 {
        self.max_loading_attempts
    }
    pub fn set_show(&mut self, show: bool) {
        self.show = show;
    }
    pub fn pending_requests(&self) -> usize {
        self.pending.len()
    }

    /// Hands a finished request to the tile's material. Responses for tiles
    /// that no longer exist are dropped.
    pub fn apply_response(
        &mut self,
        tree: &mut TileTree,
        device: &mut dyn GpuDevice,
        node_id: NodeId,
        result: Result<ImageData, ImageryError>,
    ) {
        let Some(material) = tree.material_mut(node_id, self.id) else {
            bevy::log::debug!("imagery for removed tile {:?} dropped", node_id);
            return;
        };
        let failure = match result {
            Ok(image) => match material.apply_image(device, &image) {
                Ok(_) => return,
                Err(e) => {
                    bevy::log::error!("failed to upload imagery for {:?}: {}", node_id, e);
                    e.to_string()
                }
            },
            Err(ImageryError::NotFound) => {
                material.texture_not_exists();
                return;
            }
            Err(e) => e.to_string(),
        };
        if material.loading_attempts() >= self.max_loading_attempts {
            bevy::log::warn!(
                "layer '{}' gives up on tile {:?} after {} attempts: {}",
                self.name,
                node_id,
                material.loading_attempts(),
                failure
            );
            material.texture_not_exists();
        } else {
            bevy::log::debug!("tile {:?} will be requested again: {}", node_id, failure);
            material.cancel_loading();
        }
    }
}

impl Layer for ImageryLayer {
    fn id(&self) -> LayerId {
        self.id
    }
    fn name(&self) -> &str {
        &self.name
    }
    fn is_visible(&self) -> bool {
        self.show
    }
    fn texture_filter(&self) -> TextureFilter {
        self.filter
    }

    fn load_material(&mut self, material: &mut Material, key: &TileKey, extent: &Extent) {
        if material.is_ready() || material.is_loading() {
            return;
        }
        if key.level > self.provider.maximum_level() {
            return;
        }
        material.begin_loading();
        let node_id = material.node_id();
        let job_id = self.jobs.spawn(FetchImageryJob {
            provider: self.provider.clone(),
            node_id,
            key: *key,
            extent: *extent,
        });
        let request = PendingRequest {
            job_id,
            requested_at: instant::Instant::now(),
        };
        if let Some(previous) = self.pending.insert(node_id, request) {
            self.jobs.abort(previous.job_id);
        }
    }

    fn abort_material_loading(&mut self, material: &mut Material) {
        if let Some(request) = self.pending.remove(&material.node_id()) {
            self.jobs.abort(request.job_id);
        }
        material.cancel_loading();
    }

    fn clear_material(&mut self, material: &mut Material, device: &mut dyn GpuDevice) {
        self.abort_material_loading(material);
        material.release(device);
    }

    fn update(&mut self, tree: &mut TileTree, device: &mut dyn GpuDevice) {
        self.jobs.poll();
        for (job_id, fetched) in self.jobs.take_all::<FetchImageryJob>() {
            match self.pending.get(&fetched.node_id) {
                Some(request) if request.job_id == job_id => {
                    bevy::log::debug!(
                        "imagery {:?} arrived after {:?}",
                        fetched.key,
                        request.requested_at.elapsed()
                    );
                    self.pending.remove(&fetched.node_id);
                }
                _ => {
                    bevy::log::debug!("superseded imagery {:?} dropped", fetched.key);
                    continue;
                }
            }
            self.apply_response(tree, device, fetched.node_id, fetched.result);
        }
    }
}
