use bevy::utils::HashMap;
use pollster::FutureExt;
use wgpu::util::DeviceExt;

use super::*;

struct WgpuTexture {
    texture: wgpu::Texture,
    view: wgpu::TextureView,
    descriptor: TextureDescriptor,
}

struct WgpuRenderbuffer {
    view: wgpu::TextureView,
    width: u32,
    height: u32,
    // keeps the texture behind `view` alive
    _texture: wgpu::Texture,
}

struct WgpuFramebuffer {
    color_attachments: Vec<TextureHandle>,
    depth: Option<RenderbufferHandle>,
}

/// [`GpuDevice`] over a real adapter. Framebuffers are attachment lists; a
/// clear is recorded as its own render pass.
pub struct WgpuDevice {
    device: wgpu::Device,
    queue: wgpu::Queue,
    textures: HashMap<u64, WgpuTexture>,
    buffers: HashMap<u64, wgpu::Buffer>,
    renderbuffers: HashMap<u64, WgpuRenderbuffer>,
    framebuffers: HashMap<u64, WgpuFramebuffer>,
    bound: Option<FramebufferHandle>,
    viewport: Viewport,
    next_id: u64,
}

fn wgpu_format(format: TextureFormat) -> wgpu::TextureFormat {
    match format {
        TextureFormat::Rgba8Unorm => wgpu::TextureFormat::Rgba8Unorm,
        TextureFormat::Rgba32Float => wgpu::TextureFormat::Rgba32Float,
    }
}

fn backend_error(e: impl std::fmt::Display) -> DeviceError {
    DeviceError::Backend(e.to_string())
}

impl WgpuDevice {
    /// Requests the default adapter and blocks until the device is ready.
    pub fn new() -> Result<Self, DeviceError> {
        let instance = wgpu::Instance::default();
        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions::default())
            .block_on()
            .ok_or_else(|| DeviceError::Backend("no suitable adapter".to_string()))?;
        let (device, queue) = adapter
            .request_device(
                &wgpu::DeviceDescriptor {
                    label: Some("terrella"),
                    features: wgpu::Features::empty(),
                    limits: wgpu::Limits::downlevel_defaults(),
                },
                None,
            )
            .block_on()
            .map_err(backend_error)?;
        Ok(Self::from_parts(device, queue))
    }
    pub fn from_parts(device: wgpu::Device, queue: wgpu::Queue) -> Self {
        Self {
            device,
            queue,
            textures: HashMap::default(),
            buffers: HashMap::default(),
            renderbuffers: HashMap::default(),
            framebuffers: HashMap::default(),
            bound: None,
            viewport: Viewport::default(),
            next_id: 0,
        }
    }
    fn next_id(&mut self) -> u64 {
        self.next_id += 1;
        self.next_id
    }
    pub fn texture_view(&self, texture: TextureHandle) -> Option<&wgpu::TextureView> {
        self.textures.get(&texture.0).map(|t| &t.view)
    }
    pub fn buffer(&self, buffer: BufferHandle) -> Option<&wgpu::Buffer> {
        self.buffers.get(&buffer.0)
    }
    fn write_texture(&self, texture: &wgpu::Texture, descriptor: &TextureDescriptor, data: &[u8]) {
        let bytes_per_pixel = descriptor.format.bytes_per_pixel() as u32;
        self.queue.write_texture(
            wgpu::ImageCopyTexture {
                texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            data,
            wgpu::ImageDataLayout {
                offset: 0,
                bytes_per_row: Some(bytes_per_pixel * descriptor.width),
                rows_per_image: Some(descriptor.height),
            },
            wgpu::Extent3d {
                width: descriptor.width,
                height: descriptor.height,
                depth_or_array_layers: 1,
            },
        );
    }
}

impl GpuDevice for WgpuDevice {
    fn create_texture(
        &mut self,
        descriptor: &TextureDescriptor,
        data: Option<&[u8]>,
    ) -> Result<TextureHandle, DeviceError> {
        if let Some(bytes) = data {
            if bytes.len() != descriptor.byte_len() {
                return Err(DeviceError::SizeMismatch {
                    expected: descriptor.byte_len(),
                    actual: bytes.len(),
                });
            }
        }
        let texture = self.device.create_texture(&wgpu::TextureDescriptor {
            label: None,
            size: wgpu::Extent3d {
                width: descriptor.width,
                height: descriptor.height,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: wgpu_format(descriptor.format),
            usage: wgpu::TextureUsages::TEXTURE_BINDING
                | wgpu::TextureUsages::COPY_DST
                | wgpu::TextureUsages::COPY_SRC
                | wgpu::TextureUsages::RENDER_ATTACHMENT,
            view_formats: &[],
        });
        if let Some(bytes) = data {
            self.write_texture(&texture, descriptor, bytes);
        }
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        let id = self.next_id();
        self.textures.insert(
            id,
            WgpuTexture {
                texture,
                view,
                descriptor: *descriptor,
            },
        );
        Ok(TextureHandle(id))
    }
    fn update_texture(&mut self, texture: TextureHandle, data: &[u8]) -> Result<(), DeviceError> {
        let t = self.textures.get(&texture.0).ok_or(DeviceError::UnknownHandle {
            kind: "texture",
            id: texture.0,
        })?;
        if data.len() != t.descriptor.byte_len() {
            return Err(DeviceError::SizeMismatch {
                expected: t.descriptor.byte_len(),
                actual: data.len(),
            });
        }
        self.write_texture(&t.texture, &t.descriptor, data);
        Ok(())
    }
    fn delete_texture(&mut self, texture: TextureHandle) {
        if let Some(t) = self.textures.remove(&texture.0) {
            t.texture.destroy();
        }
    }
    fn texture_descriptor(&self, texture: TextureHandle) -> Option<TextureDescriptor> {
        self.textures.get(&texture.0).map(|t| t.descriptor)
    }

    fn create_buffer(&mut self, usage: BufferUsage, data: &[u8]) -> Result<BufferHandle, DeviceError> {
        let usage = match usage {
            BufferUsage::Vertex => wgpu::BufferUsages::VERTEX,
            BufferUsage::Index => wgpu::BufferUsages::INDEX,
            BufferUsage::Uniform => wgpu::BufferUsages::UNIFORM,
        } | wgpu::BufferUsages::COPY_DST;
        let buffer = self
            .device
            .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: None,
                contents: data,
                usage,
            });
        let id = self.next_id();
        self.buffers.insert(id, buffer);
        Ok(BufferHandle(id))
    }
    fn delete_buffer(&mut self, buffer: BufferHandle) {
        if let Some(b) = self.buffers.remove(&buffer.0) {
            b.destroy();
        }
    }

    fn create_renderbuffer(
        &mut self,
        width: u32,
        height: u32,
    ) -> Result<RenderbufferHandle, DeviceError> {
        let texture = self.device.create_texture(&wgpu::TextureDescriptor {
            label: Some("depth"),
            size: wgpu::Extent3d {
                width,
                height,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: wgpu::TextureFormat::Depth24Plus,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            view_formats: &[],
        });
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        let id = self.next_id();
        self.renderbuffers.insert(
            id,
            WgpuRenderbuffer {
                view,
                width,
                height,
                _texture: texture,
            },
        );
        Ok(RenderbufferHandle(id))
    }
    fn delete_renderbuffer(&mut self, renderbuffer: RenderbufferHandle) {
        if let Some(rb) = self.renderbuffers.remove(&renderbuffer.0) {
            rb._texture.destroy();
        }
    }

    fn create_framebuffer(
        &mut self,
        color_attachments: &[TextureHandle],
        depth: Option<RenderbufferHandle>,
    ) -> Result<FramebufferHandle, DeviceError> {
        let id = self.next_id();
        self.framebuffers.insert(
            id,
            WgpuFramebuffer {
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
        match fb.depth.map(|d| self.renderbuffers.get(&d.0)) {
            Some(None) => false,
            Some(Some(rb)) => size.map_or(true, |dims| dims == (rb.width, rb.height)),
            None => true,
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
        // the surface is cleared by whoever presents it
        let Some(bound) = self.bound else {
            return Ok(());
        };
        let fb = self
            .framebuffers
            .get(&bound.0)
            .ok_or(DeviceError::UnknownHandle {
                kind: "framebuffer",
                id: bound.0,
            })?;
        let mut views = Vec::with_capacity(fb.color_attachments.len());
        for texture in fb.color_attachments.iter() {
            let t = self.textures.get(&texture.0).ok_or(DeviceError::UnknownHandle {
                kind: "texture",
                id: texture.0,
            })?;
            views.push(&t.view);
        }
        let depth_view = match fb.depth {
            Some(depth) => Some(
                &self
                    .renderbuffers
                    .get(&depth.0)
                    .ok_or(DeviceError::UnknownHandle {
                        kind: "renderbuffer",
                        id: depth.0,
                    })?
                    .view,
            ),
            None => None,
        };
        let clear_color = wgpu::Color {
            r: color[0] as f64,
            g: color[1] as f64,
            b: color[2] as f64,
            a: color[3] as f64,
        };
        let color_attachments: Vec<Option<wgpu::RenderPassColorAttachment>> = views
            .iter()
            .map(|&view| {
                Some(wgpu::RenderPassColorAttachment {
                    view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(clear_color),
                        store: true,
                    },
                })
            })
            .collect();
        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("clear"),
            });
        {
            let _pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("clear_pass"),
                color_attachments: &color_attachments,
                depth_stencil_attachment: depth_view.map(|view| {
                    wgpu::RenderPassDepthStencilAttachment {
                        view,
                        depth_ops: Some(wgpu::Operations {
                            load: wgpu::LoadOp::Clear(1.0),
                            store: true,
                        }),
                        stencil_ops: None,
                    }
                }),
            });
        }
        self.queue.submit(Some(encoder.finish()));
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
        let t = self.textures.get(&texture.0).ok_or(DeviceError::UnknownHandle {
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

        let unpadded_bytes_per_row = d.format.bytes_per_pixel() as u32 * width;
        let align = wgpu::COPY_BYTES_PER_ROW_ALIGNMENT;
        let padded_bytes_per_row = (unpadded_bytes_per_row + align - 1) / align * align;
        let output_buffer = self.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("readback"),
            size: padded_bytes_per_row as u64 * height as u64,
            usage: wgpu::BufferUsages::COPY_DST | wgpu::BufferUsages::MAP_READ,
            mapped_at_creation: false,
        });
        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("readback"),
            });
        encoder.copy_texture_to_buffer(
            wgpu::ImageCopyTexture {
                texture: &t.texture,
                mip_level: 0,
                origin: wgpu::Origin3d { x, y, z: 0 },
                aspect: wgpu::TextureAspect::All,
            },
            wgpu::ImageCopyBuffer {
                buffer: &output_buffer,
                layout: wgpu::ImageDataLayout {
                    offset: 0,
                    bytes_per_row: Some(padded_bytes_per_row),
                    rows_per_image: Some(height),
                },
            },
            wgpu::Extent3d {
                width,
                height,
                depth_or_array_layers: 1,
            },
        );
        self.queue.submit(Some(encoder.finish()));

        let buffer_slice = output_buffer.slice(..);
        // map first, then poll, then wait, or the readback never resolves
        let (tx, rx) = futures_intrusive::channel::shared::oneshot_channel();
        buffer_slice.map_async(wgpu::MapMode::Read, move |result| {
            let _ = tx.send(result);
        });
        self.device.poll(wgpu::Maintain::Wait);
        match rx.receive().block_on() {
            Some(Ok(())) => {}
            Some(Err(e)) => return Err(backend_error(e)),
            None => return Err(DeviceError::Backend("readback was dropped".to_string())),
        }
        let mut pixels = Vec::with_capacity((unpadded_bytes_per_row * height) as usize);
        {
            let mapped = buffer_slice.get_mapped_range();
            for row in mapped.chunks(padded_bytes_per_row as usize) {
                pixels.extend_from_slice(&row[..unpadded_bytes_per_row as usize]);
            }
        }
        output_buffer.unmap();
        Ok(pixels)
    }

    fn texture_count(&self) -> usize {
        self.textures.len()
    }
}
