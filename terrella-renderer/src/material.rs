use crate::{
    DeviceError, GpuDevice, ImageData, Layer, LayerId, NodeId, SegmentLink, TextureDescriptor,
    TextureFilter, TextureHandle,
};

/// Sub-rectangle `[offset_x, offset_y, scale_x, scale_y]` selecting the whole
/// texture.
pub const IDENTITY_TEX_OFFSET: [f64; 4] = [0.0, 0.0, 1.0, 1.0];

/// What a material currently draws with.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum MaterialTexture {
    #[default]
    None,
    /// A texture this material owns and deletes on clear.
    Own(TextureHandle),
    /// An ancestor's texture, borrowed as a placeholder and never deleted
    /// here.
    Inherited {
        texture: TextureHandle,
        offset: [f64; 4],
        from: NodeId,
    },
}

/// Imagery state of one layer on one tile.
///
/// `Empty -> Loading -> Ready` with or without a texture; `clear` returns to
/// `Empty` from anywhere.
#[derive(Debug)]
pub struct Material {
    node_id: NodeId,
    layer_id: LayerId,
    segment: SegmentLink,
    filter: TextureFilter,
    texture: MaterialTexture,
    picking_mask: Option<TextureHandle>,
    is_loading: bool,
    is_ready: bool,
    texture_exists: bool,
    picking_ready: bool,
    loading_attempts: u32,
    applied_node_id: Option<NodeId>,
}

impl Material {
    pub fn new(node_id: NodeId, layer_id: LayerId, segment: SegmentLink, filter: TextureFilter) -> Self {
        Self {
            node_id,
            layer_id,
            segment,
            filter,
            texture: MaterialTexture::None,
            picking_mask: None,
            is_loading: false,
            is_ready: false,
            texture_exists: false,
            picking_ready: false,
            loading_attempts: 0,
            applied_node_id: None,
        }
    }

    /// Marks a request in flight. Called by the layer once per attempt.
    pub fn begin_loading(&mut self) {
        self.is_loading = true;
        self.loading_attempts += 1;
    }

    /// Uploads `image` and becomes ready with a texture. An already ready
    /// material rewrites its own texture in place. Returns `Ok(false)` without
    /// touching anything when the owning segment is gone.
    pub fn apply_image(
        &mut self,
        device: &mut dyn GpuDevice,
        image: &ImageData,
    ) -> Result<bool, DeviceError> {
        if !self.segment.is_initialized() {
            bevy::log::debug!("dropping image for removed tile {:?}", self.node_id);
            return Ok(false);
        }
        let descriptor = TextureDescriptor::new(image.width, image.height, image.format, self.filter);
        let texture = match self.texture {
            MaterialTexture::Own(texture)
                if self.is_ready
                    && device.texture_descriptor(texture) == Some(descriptor) =>
            {
                device.update_texture(texture, &image.pixels)?;
                texture
            }
            _ => {
                let texture = device.create_texture(&descriptor, Some(&image.pixels))?;
                if let MaterialTexture::Own(old) = self.texture {
                    device.delete_texture(old);
                }
                texture
            }
        };
        if let Some(mask) = self.picking_mask.take() {
            device.delete_texture(mask);
        }
        self.set_ready_with(texture);
        self.picking_ready = true;
        Ok(true)
    }

    /// Takes ownership of an uploaded texture and an optional picking mask.
    /// Returns `false` when the segment is gone; the caller keeps ownership.
    pub fn apply_texture(
        &mut self,
        device: &mut dyn GpuDevice,
        texture: TextureHandle,
        picking_mask: Option<TextureHandle>,
    ) -> bool {
        if !self.segment.is_initialized() {
            bevy::log::debug!("dropping texture for removed tile {:?}", self.node_id);
            return false;
        }
        if let MaterialTexture::Own(old) = self.texture {
            if old != texture {
                device.delete_texture(old);
            }
        }
        if let Some(old) = self.picking_mask.take() {
            if Some(old) != picking_mask {
                device.delete_texture(old);
            }
        }
        self.set_ready_with(texture);
        self.picking_mask = picking_mask;
        self.picking_ready = picking_mask.is_some();
        true
    }

    fn set_ready_with(&mut self, texture: TextureHandle) {
        self.texture = MaterialTexture::Own(texture);
        self.is_ready = true;
        self.is_loading = false;
        self.texture_exists = true;
        self.applied_node_id = Some(self.node_id);
    }

    /// Imagery is confirmed absent for this tile; becomes ready without a
    /// texture and is never requested again.
    pub fn texture_not_exists(&mut self) {
        if !self.segment.is_initialized() {
            return;
        }
        if let MaterialTexture::Own(_) = self.texture {
            bevy::log::warn!("material {:?} marked absent while holding a texture", self.node_id);
            return;
        }
        self.texture = MaterialTexture::None;
        self.is_loading = false;
        self.is_ready = true;
        self.texture_exists = false;
    }

    /// Shows an ancestor's texture until this material's own image arrives.
    /// Ignored once the material is ready.
    pub fn inherit_from(&mut self, texture: TextureHandle, offset: [f64; 4], from: NodeId) {
        if self.is_ready {
            return;
        }
        self.texture = MaterialTexture::Inherited {
            texture,
            offset,
            from,
        };
        self.applied_node_id = Some(from);
    }

    pub fn abort_loading(&mut self, layer: &mut dyn Layer) {
        layer.abort_material_loading(self);
    }

    /// Resets the attempt counter and lets the layer release the texture.
    pub fn clear(&mut self, layer: &mut dyn Layer, device: &mut dyn GpuDevice) {
        self.loading_attempts = 0;
        layer.clear_material(self, device);
    }

    /// Deletes owned textures and returns to `Empty`. Inherited textures are
    /// only forgotten.
    pub fn release(&mut self, device: &mut dyn GpuDevice) {
        if let MaterialTexture::Own(texture) = self.texture {
            device.delete_texture(texture);
        }
        if let Some(mask) = self.picking_mask.take() {
            device.delete_texture(mask);
        }
        self.texture = MaterialTexture::None;
        self.is_loading = false;
        self.is_ready = false;
        self.texture_exists = false;
        self.picking_ready = false;
        self.applied_node_id = None;
    }

    /// Drops the in-flight flag so the next traversal can request again.
    pub fn cancel_loading(&mut self) {
        self.is_loading = false;
    }

    pub fn node_id(&self) -> NodeId {
        self.node_id
    }
    pub fn layer_id(&self) -> LayerId {
        self.layer_id
    }
    pub fn is_loading(&self) -> bool {
        self.is_loading
    }
    pub fn is_ready(&self) -> bool {
        self.is_ready
    }
    pub fn texture_exists(&self) -> bool {
        self.texture_exists
    }
    pub fn picking_ready(&self) -> bool {
        self.picking_ready
    }
    pub fn loading_attempts(&self) -> u32 {
        self.loading_attempts
    }
    pub fn applied_node_id(&self) -> Option<NodeId> {
        self.applied_node_id
    }
    pub fn texture(&self) -> &MaterialTexture {
        &self.texture
    }
    pub fn picking_mask(&self) -> Option<TextureHandle> {
        self.picking_mask
    }
    /// Handle to draw with, owned or inherited.
    pub fn texture_handle(&self) -> Option<TextureHandle> {
        match self.texture {
            MaterialTexture::None => None,
            MaterialTexture::Own(texture) => Some(texture),
            MaterialTexture::Inherited { texture, .. } => Some(texture),
        }
    }
    pub fn own_texture(&self) -> Option<TextureHandle> {
        match self.texture {
            MaterialTexture::Own(texture) => Some(texture),
            _ => None,
        }
    }
    pub fn tex_offset(&self) -> [f64; 4] {
        match self.texture {
            MaterialTexture::Inherited { offset, .. } => offset,
            _ => IDENTITY_TEX_OFFSET,
        }
    }
    pub fn segment(&self) -> &SegmentLink {
        &self.segment
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{HeadlessDevice, Segment};
    use terrella_scene::{Ellipsoid, Extent};

    /// Layer that releases on clear and records aborts.
    #[derive(Default)]
    struct RecordingLayer {
        id: LayerId,
        aborted: Vec<NodeId>,
        cleared: usize,
    }
    impl Layer for RecordingLayer {
        fn id(&self) -> LayerId {
            self.id
        }
        fn name(&self) -> &str {
            "recording"
        }
        fn load_material(&mut self, material: &mut Material, _: &terrella_scene::TileKey, _: &Extent) {
            material.begin_loading();
        }
        fn abort_material_loading(&mut self, material: &mut Material) {
            self.aborted.push(material.node_id());
            material.cancel_loading();
        }
        fn clear_material(&mut self, material: &mut Material, device: &mut dyn GpuDevice) {
            self.cleared += 1;
            material.release(device);
        }
        fn update(&mut self, _: &mut crate::TileTree, _: &mut dyn GpuDevice) {}
    }

    fn setup() -> (Segment, Material, HeadlessDevice, RecordingLayer) {
        let segment = Segment::new(&Ellipsoid::WGS84, Extent::from_degrees(0.0, 0.0, 10.0, 10.0));
        let layer = RecordingLayer::default();
        let material = Material::new(NodeId(7), layer.id(), segment.link(), TextureFilter::Linear);
        (segment, material, HeadlessDevice::new(), layer)
    }

    #[test]
    fn apply_then_clear() {
        let (_segment, mut material, mut device, mut layer) = setup();
        layer.load_material(&mut material, &Default::default(), &Extent::FULL);
        assert!(material.is_loading());
        assert_eq!(material.loading_attempts(), 1);

        let image = ImageData::solid(4, 4, [10, 20, 30, 255]);
        assert!(material.apply_image(&mut device, &image).unwrap());
        assert!(material.is_ready());
        assert!(material.texture_exists());
        assert!(!material.is_loading());
        assert!(material.picking_ready());
        assert_eq!(material.tex_offset(), IDENTITY_TEX_OFFSET);
        assert_eq!(material.applied_node_id(), Some(NodeId(7)));
        assert_eq!(device.texture_count(), 1);

        material.clear(&mut layer, &mut device);
        assert_eq!(material.loading_attempts(), 0);
        assert!(!material.is_ready());
        assert!(!material.texture_exists());
        assert_eq!(material.texture_handle(), None);
        assert_eq!(device.texture_count(), 0);

        material.clear(&mut layer, &mut device);
        assert_eq!(layer.cleared, 2);
        assert_eq!(device.texture_count(), 0);
    }

    #[test]
    fn ready_material_updates_in_place() {
        let (_segment, mut material, mut device, _) = setup();
        material
            .apply_image(&mut device, &ImageData::solid(2, 2, [1, 1, 1, 255]))
            .unwrap();
        let first = material.own_texture();
        material
            .apply_image(&mut device, &ImageData::solid(2, 2, [9, 9, 9, 255]))
            .unwrap();
        assert_eq!(material.own_texture(), first);
        assert_eq!(device.texture_count(), 1);
        let data = device.texture_data(first.unwrap()).unwrap();
        assert_eq!(&data[..4], &[9, 9, 9, 255]);

        // a different size needs a fresh texture
        material
            .apply_image(&mut device, &ImageData::solid(4, 4, [9, 9, 9, 255]))
            .unwrap();
        assert_ne!(material.own_texture(), first);
        assert_eq!(device.texture_count(), 1);
    }

    #[test]
    fn late_image_after_segment_destroyed_is_ignored() {
        let (mut segment, mut material, mut device, mut layer) = setup();
        layer.load_material(&mut material, &Default::default(), &Extent::FULL);
        segment.destroy();
        let image = ImageData::solid(4, 4, [0, 0, 0, 255]);
        assert!(!material.apply_image(&mut device, &image).unwrap());
        assert!(!material.is_ready());
        assert!(!material.texture_exists());
        assert!(material.is_loading());
        assert_eq!(device.texture_count(), 0);

        let texture = device
            .create_texture(&TextureDescriptor::new(1, 1, Default::default(), TextureFilter::Linear), None)
            .unwrap();
        assert!(!material.apply_texture(&mut device, texture, None));
        assert_eq!(material.texture_handle(), None);
    }

    #[test]
    fn texture_not_exists_is_ready_without_texture() {
        let (_segment, mut material, _device, mut layer) = setup();
        layer.load_material(&mut material, &Default::default(), &Extent::FULL);
        material.texture_not_exists();
        assert!(material.is_ready());
        assert!(!material.is_loading());
        assert!(!material.texture_exists());
        assert_eq!(material.texture_handle(), None);
    }

    #[test]
    fn inherited_texture_is_never_deleted() {
        let (_segment, mut material, mut device, mut layer) = setup();
        let ancestor = device
            .create_texture(&TextureDescriptor::new(8, 8, Default::default(), TextureFilter::Linear), None)
            .unwrap();
        material.inherit_from(ancestor, [0.5, 0.0, 0.5, 0.5], NodeId(1));
        assert_eq!(material.texture_handle(), Some(ancestor));
        assert_eq!(material.tex_offset(), [0.5, 0.0, 0.5, 0.5]);
        assert_eq!(material.applied_node_id(), Some(NodeId(1)));
        assert!(!material.texture_exists());

        material.clear(&mut layer, &mut device);
        assert_eq!(device.texture_count(), 1);
        assert_eq!(material.texture_handle(), None);
    }

    #[test]
    fn own_texture_replaces_placeholder() {
        let (_segment, mut material, mut device, _) = setup();
        let ancestor = device
            .create_texture(&TextureDescriptor::new(8, 8, Default::default(), TextureFilter::Linear), None)
            .unwrap();
        material.inherit_from(ancestor, [0.0, 0.0, 0.5, 0.5], NodeId(1));
        material
            .apply_image(&mut device, &ImageData::solid(2, 2, [1, 2, 3, 4]))
            .unwrap();
        assert_eq!(material.tex_offset(), IDENTITY_TEX_OFFSET);
        assert_ne!(material.texture_handle(), Some(ancestor));
        assert_eq!(device.texture_count(), 2);

        // ready materials no longer take placeholders
        material.inherit_from(ancestor, [0.0, 0.0, 0.5, 0.5], NodeId(1));
        assert_ne!(material.texture_handle(), Some(ancestor));
    }

    #[test]
    fn abort_delegates_to_layer() {
        let (_segment, mut material, _device, mut layer) = setup();
        layer.load_material(&mut material, &Default::default(), &Extent::FULL);
        material.abort_loading(&mut layer);
        assert_eq!(layer.aborted, vec![NodeId(7)]);
        assert!(!material.is_loading());
    }

    #[test]
    fn apply_texture_takes_mask() {
        let (_segment, mut material, mut device, mut layer) = setup();
        let d = TextureDescriptor::new(2, 2, Default::default(), TextureFilter::Linear);
        let texture = device.create_texture(&d, None).unwrap();
        let mask = device.create_texture(&d, None).unwrap();
        assert!(material.apply_texture(&mut device, texture, Some(mask)));
        assert!(material.picking_ready());
        assert_eq!(material.picking_mask(), Some(mask));
        material.clear(&mut layer, &mut device);
        assert_eq!(device.texture_count(), 0);
    }

    #[test]
    fn new_image_drops_stale_mask() {
        let (_segment, mut material, mut device, _) = setup();
        let d = TextureDescriptor::new(2, 2, Default::default(), TextureFilter::Linear);
        let texture = device.create_texture(&d, None).unwrap();
        let mask = device.create_texture(&d, None).unwrap();
        material.apply_texture(&mut device, texture, Some(mask));
        material
            .apply_image(&mut device, &ImageData::solid(2, 2, [4; 4]))
            .unwrap();
        assert_eq!(material.picking_mask(), None);
        assert!(device.texture_data(mask).is_none());
        assert_eq!(device.texture_count(), 1);
    }
}
