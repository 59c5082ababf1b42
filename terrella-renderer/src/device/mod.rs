mod headless;
#[cfg(feature = "wgpu")]
mod wgpu_device;

pub use headless::*;
#[cfg(feature = "wgpu")]
pub use wgpu_device::*;

use serde::{Deserialize, Serialize};

use crate::DeviceError;

macro_rules! gpu_handle {
    ($name:ident) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub struct $name(pub(crate) u64);
        impl $name {
            pub fn id(&self) -> u64 {
                self.0
            }
        }
    };
}
gpu_handle!(TextureHandle);
gpu_handle!(BufferHandle);
gpu_handle!(FramebufferHandle);
gpu_handle!(RenderbufferHandle);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum TextureFormat {
    #[default]
    Rgba8Unorm,
    Rgba32Float,
}
impl TextureFormat {
    pub fn bytes_per_pixel(&self) -> usize {
        match self {
            TextureFormat::Rgba8Unorm => 4,
            TextureFormat::Rgba32Float => 16,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TextureFilter {
    Nearest,
    #[default]
    Linear,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct TextureDescriptor {
    pub width: u32,
    pub height: u32,
    pub format: TextureFormat,
    pub filter: TextureFilter,
}
impl TextureDescriptor {
    pub fn new(width: u32, height: u32, format: TextureFormat, filter: TextureFilter) -> Self {
        Self {
            width,
            height,
            format,
            filter,
        }
    }
    pub fn byte_len(&self) -> usize {
        self.width as usize * self.height as usize * self.format.bytes_per_pixel()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BufferUsage {
    Vertex,
    Index,
    Uniform,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Viewport {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}
impl Viewport {
    pub fn new(x: u32, y: u32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }
    pub fn from_size(width: u32, height: u32) -> Self {
        Self::new(0, 0, width, height)
    }
}

/// The slice of a GPU API the globe core drives. Framebuffer binding and the
/// viewport are device state, so a render target only has to record what it
/// needs restored.
pub trait GpuDevice {
    /// Allocates a texture, optionally uploading `data` laid out row by row
    /// from the top.
    fn create_texture(
        &mut self,
        descriptor: &TextureDescriptor,
        data: Option<&[u8]>,
    ) -> Result<TextureHandle, DeviceError>;
    /// Replaces the contents of a texture. The size must match.
    fn update_texture(&mut self, texture: TextureHandle, data: &[u8]) -> Result<(), DeviceError>;
    fn delete_texture(&mut self, texture: TextureHandle);
    fn texture_descriptor(&self, texture: TextureHandle) -> Option<TextureDescriptor>;

    fn create_buffer(&mut self, usage: BufferUsage, data: &[u8]) -> Result<BufferHandle, DeviceError>;
    fn delete_buffer(&mut self, buffer: BufferHandle);

    fn create_renderbuffer(&mut self, width: u32, height: u32)
        -> Result<RenderbufferHandle, DeviceError>;
    fn delete_renderbuffer(&mut self, renderbuffer: RenderbufferHandle);

    fn create_framebuffer(
        &mut self,
        color_attachments: &[TextureHandle],
        depth: Option<RenderbufferHandle>,
    ) -> Result<FramebufferHandle, DeviceError>;
    fn delete_framebuffer(&mut self, framebuffer: FramebufferHandle);
    fn is_framebuffer_complete(&self, framebuffer: FramebufferHandle) -> bool;

    /// `None` binds the canvas.
    fn bind_framebuffer(&mut self, framebuffer: Option<FramebufferHandle>);
    fn bound_framebuffer(&self) -> Option<FramebufferHandle>;
    fn set_viewport(&mut self, viewport: Viewport);
    fn viewport(&self) -> Viewport;

    /// Clears every attachment of the bound framebuffer.
    fn clear(&mut self, color: [f32; 4]) -> Result<(), DeviceError>;
    /// Synchronous readback of a rectangle of one colour attachment; `(x, y)`
    /// is measured from the top-left texel.
    fn read_pixels(
        &mut self,
        framebuffer: FramebufferHandle,
        attachment: usize,
        x: u32,
        y: u32,
        width: u32,
        height: u32,
    ) -> Result<Vec<u8>, DeviceError>;

    fn texture_count(&self) -> usize;
}
