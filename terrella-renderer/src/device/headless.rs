use bevy::utils::HashMap;

use super::*;

struct HeadlessTexture {
    descriptor: TextureDescriptor,
    data: Vec<u8>,
}

struct HeadlessFramebuffer {
    color_attachments: Vec<TextureHandle>,
    depth: Option<RenderbufferHandle>,
}

/// A device keeping every resource in CPU memory. Used by tests and by tools
/// running without an adapter.
#[derive(Default)]
pub struct HeadlessDevice {
    textures: HashMap<u64, HeadlessTexture>,
    buffers: HashMap<u64, (BufferUsage, Vec<u8>)>,
    renderbuffers: HashMap<u64, (u32, u32)>,
    framebuffers: HashMap<u64, HeadlessFramebuffer>,
    bound: Option<FramebufferHandle>,
    viewport: Viewport,
    next_id: u64,
}

impl HeadlessDevice {
    pub fn new() -> Self {
        Self::default()
    }
    fn next_id(&mut self) -> u64 {
        self.next_id += 1;
        self.next_id
    }
    pub fn texture_data(&self, texture: TextureHandle) -> Option<&[u8]> {
        self.textures.get(&texture.0).map(|t| t.data.as_slice())
    }
    pub fn buffer_count(&self) -> usize {
        self.buffers.len()
    }
    pub fn framebuffer_count(&self) -> usize {
        self.framebuffers.len()
    }
    pub fn renderbuffer_count(&self) -> usize {
        self.renderbuffers.len()
    }
}

fn texel_bytes(format: TextureFormat, color: [f32; 4]) -> Vec<u8> {
    match format {
        TextureFormat::Rgba8Unorm => color
            .iter()
            .map(|c| (c.clamp(0.0, 1.0) * 255.0).round() as u8)
            .collect(),
        TextureFormat::Rgba32Float => bytemuck::cast_slice(&color).to_vec(),
    }
}

impl GpuDevice for HeadlessDevice {
    fn create_texture(
        &mut self,
        descriptor: &TextureDescriptor,
        data: Option<&[u8]>,
    ) -> Result<TextureHandle, DeviceError> {
        let expected = descriptor.byte_len();
        let data = match data {
            Some(bytes) if bytes.len() != expected => {
                return Err(DeviceError::SizeMismatch {
                    expected,
                    actual: bytes.len(),
                })
            }
            Some(bytes) => bytes.to_vec(),
            None => vec![0; expected],
        };
        let id = self.next_id();
        self.textures.insert(
            id,
            HeadlessTexture {
                descriptor: *descriptor,
                data,
            },
        );
        Ok(TextureHandle(id))
    }
    fn update_texture(&mut self, texture: TextureHandle, data: &[u8]) -> Result<(), DeviceError> {
        let t = self
            .textures
            .get_mut(&texture.0)
            .ok_or(DeviceError::UnknownHandle {
                kind: "texture",
                id: texture.0,
            })?;
        if t.data.len() != data.len() {
            return Err(DeviceError::SizeMismatch {
                expected: t.data.len(),
                actual: data.len(),
            });
        }
        t.data.copy_from_slice(data);
        Ok(())
    }
    fn delete_texture(&mut self, texture: TextureHandle) {
        self.textures.remove(&texture.0);
    }
    fn texture_descriptor(&self, texture: TextureHandle) -> Option<TextureDescriptor> {
        self.textures.get(&texture.0).map(|t| t.descriptor)
    }

    fn create_buffer(&mut self, usage: BufferUsage, data: &[u8]) -> Result<BufferHandle, DeviceError> {
        let id = self.next_id();
        self.buffers.insert(id, (usage, data.to_vec()));
        Ok(BufferHandle(id))
    }
    fn delete_buffer(&mut self, buffer: BufferHandle) {
        self.buffers.remove(&buffer.0);
    }

    fn create_renderbuffer(
        &mut self,
        width: u32,
        height: u32,
    ) -> Result<RenderbufferHandle, DeviceError> {
        let id = self.next_id();
        self.renderbuffers.insert(id, (width, height));
        Ok(RenderbufferHandle(id))
    }
    fn delete_renderbuffer(&mut self, renderbuffer: RenderbufferHandle) {
        self.renderbuffers.remove(&renderbuffer.0);
    }

    fn create_framebuffer(
        &mut self,
        color_attachments: &[TextureHandle],
        depth: Option<RenderbufferHandle>,
    ) -> Result<FramebufferHandle, DeviceError> {
        let id = self.next_id();
        self.framebuffers.insert(
            id,
            HeadlessFramebuffer {
                color_attachments: color_attachments.to_vec(),
                depth,
            },
        );
        Ok(FramebufferHandle(id))
    }
    fn delete_framebuffer(&mut self, framebuffer: FramebufferHandle) {
        self.framebuffers.remove(&framebuffer.0);
        if self.bound == Some(framebuffer) {
            self.bound = None;
        }
    }
    fn is_framebuffer_complete(&self, framebuffer: FramebufferHandle) -> bool {
        let Some(fb) = self.framebuffers.get(&framebuffer.0) else {
            return false;
        };
        let mut size = None;
        for texture in fb.color_attachments.iter() {
            let Some(t) = self.textures.get(&texture.0) else {
                return false;
            };
            let dims = (t.descriptor.width, t.descriptor.height);
            if *size.get_or_insert(dims) != dims {
                return false;
            }
        }
        match (fb.depth, size) {
            (Some(depth), Some(dims)) => self.renderbuffers.get(&depth.0) == Some(&dims),
            (Some(depth), None) => self.renderbuffers.contains_key(&depth.0),
            (None, _) => true,
        }
    }

    fn bind_framebuffer(&mut self, framebuffer: Option<FramebufferHandle>) {
        self.bound = framebuffer;
    }
    fn bound_framebuffer(&self) -> Option<FramebufferHandle> {
        self.bound
    }
    fn set_viewport(&mut self, viewport: Viewport) {
        self.viewport = viewport;
    }
    fn viewport(&self) -> Viewport {
        self.viewport
    }

    fn clear(&mut self, color: [f32; 4]) -> Result<(), DeviceError> {
        // the canvas has no backing store here
        let Some(bound) = self.bound else {
            return Ok(());
        };
        let attachments = self
            .framebuffers
            .get(&bound.0)
            .ok_or(DeviceError::UnknownHandle {
                kind: "framebuffer",
                id: bound.0,
            })?
            .color_attachments
            .clone();
        for texture in attachments {
            if let Some(t) = self.textures.get_mut(&texture.0) {
                let texel = texel_bytes(t.descriptor.format, color);
                for chunk in t.data.chunks_exact_mut(texel.len()) {
                    chunk.copy_from_slice(&texel);
                }
            }
        }
        Ok(())
    }

    fn read_pixels(
        &mut self,
        framebuffer: FramebufferHandle,
        attachment: usize,
        x: u32,
        y: u32,
        width: u32,
        height: u32,
    ) -> Result<Vec<u8>, DeviceError> {
        let fb = self
            .framebuffers
            .get(&framebuffer.0)
            .ok_or(DeviceError::UnknownHandle {
                kind: "framebuffer",
                id: framebuffer.0,
            })?;
        let texture = fb
            .color_attachments
            .get(attachment)
            .ok_or(DeviceError::AttachmentOutOfRange {
                index: attachment,
                count: fb.color_attachments.len(),
            })?;
        let t = self
            .textures
            .get(&texture.0)
            .ok_or(DeviceError::UnknownHandle {
                kind: "texture",
                id: texture.0,
            })?;
        let d = t.descriptor;
        if x as u64 + width as u64 > d.width as u64 || y as u64 + height as u64 > d.height as u64 {
            return Err(DeviceError::ReadOutOfBounds {
                x,
                y,
                width,
                height,
            });
        }
        let bpp = d.format.bytes_per_pixel();
        let row_len = d.width as usize * bpp;
        let mut out = Vec::with_capacity(width as usize * height as usize * bpp);
        for row in y..y + height {
            let start = row as usize * row_len + x as usize * bpp;
            out.extend_from_slice(&t.data[start..start + width as usize * bpp]);
        }
        Ok(out)
    }

    fn texture_count(&self) -> usize {
        self.textures.len()
    }
}
