use std::sync::atomic::{AtomicU64, Ordering};

use crate::{
    context::ActiveTarget, DeviceError, FramebufferHandle, RenderContext, RenderbufferHandle,
    TextureDescriptor, TextureFilter, TextureFormat, TextureHandle, Viewport,
};

static NEXT_RENDER_TARGET_ID: AtomicU64 = AtomicU64::new(0);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RenderTargetId(u64);

#[derive(Debug, Clone, PartialEq)]
pub struct RenderTargetOptions {
    pub width: u32,
    pub height: u32,
    /// One colour attachment per entry.
    pub formats: Vec<TextureFormat>,
    pub filter: TextureFilter,
    pub use_depth: bool,
    /// Attach caller-owned textures instead of allocating.
    pub is_bare: bool,
    pub textures: Vec<TextureHandle>,
}
impl Default for RenderTargetOptions {
    fn default() -> Self {
        Self {
            width: 256,
            height: 256,
            formats: vec![TextureFormat::Rgba8Unorm],
            filter: TextureFilter::Nearest,
            use_depth: false,
            is_bare: false,
            textures: vec![],
        }
    }
}

/// An off-screen surface: framebuffer, colour attachments and an optional
/// depth renderbuffer.
#[derive(Debug)]
pub struct RenderTarget {
    id: RenderTargetId,
    width: u32,
    height: u32,
    formats: Vec<TextureFormat>,
    filter: TextureFilter,
    use_depth: bool,
    is_bare: bool,
    framebuffer: Option<FramebufferHandle>,
    textures: Vec<TextureHandle>,
    depth: Option<RenderbufferHandle>,
}

impl RenderTarget {
    pub fn new(options: RenderTargetOptions) -> Self {
        Self {
            id: RenderTargetId(NEXT_RENDER_TARGET_ID.fetch_add(1, Ordering::Relaxed)),
            width: options.width,
            height: options.height,
            formats: options.formats,
            filter: options.filter,
            use_depth: options.use_depth,
            is_bare: options.is_bare,
            framebuffer: None,
            textures: if options.is_bare {
                options.textures
            } else {
                vec![]
            },
            depth: None,
        }
    }

    pub fn init(&mut self, ctx: &mut RenderContext) -> Result<(), DeviceError> {
        let allocated = !self.is_bare && !self.textures.is_empty();
        if self.framebuffer.is_some() || self.depth.is_some() || allocated {
            self.destroy(ctx);
        }
        let device = ctx.device_mut();
        if !self.is_bare {
            for format in self.formats.iter() {
                let descriptor = TextureDescriptor::new(self.width, self.height, *format, self.filter);
                self.textures.push(device.create_texture(&descriptor, None)?);
            }
        }
        if self.use_depth {
            self.depth = Some(device.create_renderbuffer(self.width, self.height)?);
        }
        let framebuffer = device.create_framebuffer(&self.textures, self.depth)?;
        self.framebuffer = Some(framebuffer);
        if !device.is_framebuffer_complete(framebuffer) {
            bevy::log::error!("render target {:?} is incomplete", self.id);
            return Err(DeviceError::IncompleteFramebuffer);
        }
        Ok(())
    }

    /// Releases the framebuffer, owned attachments and depth buffer. Textures
    /// supplied to a bare target stay with the caller.
    pub fn destroy(&mut self, ctx: &mut RenderContext) {
        let device = ctx.device_mut();
        if let Some(framebuffer) = self.framebuffer.take() {
            device.delete_framebuffer(framebuffer);
        }
        if !self.is_bare {
            for texture in self.textures.drain(..) {
                device.delete_texture(texture);
            }
        }
        if let Some(depth) = self.depth.take() {
            device.delete_renderbuffer(depth);
        }
    }

    /// Binds this target, sets the viewport to its size and pushes it onto
    /// the context's stack. The previous top becomes inactive.
    pub fn activate(&self, ctx: &mut RenderContext) -> Result<(), DeviceError> {
        let framebuffer = self.framebuffer.ok_or(DeviceError::NotInitialized)?;
        ctx.push(ActiveTarget {
            id: self.id,
            framebuffer,
            viewport: self.viewport(),
        });
        Ok(())
    }

    /// Pops this target and restores the binding and viewport of the target
    /// below it, or of the canvas. Calls must nest with [`Self::activate`].
    pub fn deactivate(&self, ctx: &mut RenderContext) {
        debug_assert_eq!(
            ctx.active_target(),
            Some(self.id),
            "render target deactivated out of order"
        );
        ctx.pop();
    }

    pub fn is_active(&self, ctx: &RenderContext) -> bool {
        ctx.active_target() == Some(self.id)
    }

    /// Resizes the target. Attachments are reallocated when depth is in use
    /// or `force_destroy` is set; otherwise only the stored size changes.
    pub fn set_size(
        &mut self,
        ctx: &mut RenderContext,
        width: u32,
        height: u32,
        force_destroy: bool,
    ) -> Result<(), DeviceError> {
        self.width = width;
        self.height = height;
        let was_active = self.is_active(ctx);
        if self.use_depth || force_destroy {
            if self.is_bare {
                bevy::log::warn!("resizing bare render target {:?} keeps its textures", self.id);
            }
            self.init(ctx)?;
        }
        if was_active {
            if let Some(framebuffer) = self.framebuffer {
                ctx.replace_top(ActiveTarget {
                    id: self.id,
                    framebuffer,
                    viewport: self.viewport(),
                });
            }
        }
        Ok(())
    }

    /// Reads a `width` x `height` block (default 1x1) at the normalized
    /// position `(nx, ny)`.
    pub fn read_pixels(
        &self,
        ctx: &mut RenderContext,
        nx: f64,
        ny: f64,
        attachment: usize,
        width: Option<u32>,
        height: Option<u32>,
    ) -> Result<Vec<u8>, DeviceError> {
        let framebuffer = self.framebuffer.ok_or(DeviceError::NotInitialized)?;
        let x = (nx * self.width.saturating_sub(1) as f64).floor() as u32;
        let y = (ny * self.height.saturating_sub(1) as f64).floor() as u32;
        ctx.device_mut().read_pixels(
            framebuffer,
            attachment,
            x,
            y,
            width.unwrap_or(1),
            height.unwrap_or(1),
        )
    }

    pub fn read_all_pixels(
        &self,
        ctx: &mut RenderContext,
        attachment: usize,
    ) -> Result<Vec<u8>, DeviceError> {
        let framebuffer = self.framebuffer.ok_or(DeviceError::NotInitialized)?;
        ctx.device_mut()
            .read_pixels(framebuffer, attachment, 0, 0, self.width, self.height)
    }

    /// Clears every attachment, activating the target for the duration.
    pub fn clear(&self, ctx: &mut RenderContext, color: [f32; 4]) -> Result<(), DeviceError> {
        self.activate(ctx)?;
        let result = ctx.clear(color);
        self.deactivate(ctx);
        result
    }

    pub fn is_complete(&self, ctx: &RenderContext) -> bool {
        self.framebuffer
            .map_or(false, |fb| ctx.device().is_framebuffer_complete(fb))
    }

    pub fn id(&self) -> RenderTargetId {
        self.id
    }
    pub fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }
    pub fn viewport(&self) -> Viewport {
        Viewport::from_size(self.width, self.height)
    }
    pub fn textures(&self) -> &[TextureHandle] {
        &self.textures
    }
    pub fn texture(&self, attachment: usize) -> Option<TextureHandle> {
        self.textures.get(attachment).copied()
    }
    pub fn framebuffer(&self) -> Option<FramebufferHandle> {
        self.framebuffer
    }
    pub fn filter(&self) -> TextureFilter {
        self.filter
    }
    pub fn set_filter(&mut self, filter: TextureFilter) {
        self.filter = filter;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use terrella_scene::{decode_picking_color, encode_picking_color, picking_color_to_vec3};
    use crate::GpuDevice;

    fn target(ctx: &mut RenderContext, width: u32, height: u32, use_depth: bool) -> RenderTarget {
        let mut t = RenderTarget::new(RenderTargetOptions {
            width,
            height,
            use_depth,
            ..Default::default()
        });
        t.init(ctx).unwrap();
        t
    }

    #[test]
    fn nested_targets_restore_viewports_in_order() {
        let mut ctx = RenderContext::headless(1024, 768);
        let a = target(&mut ctx, 256, 256, false);
        let b = target(&mut ctx, 512, 512, true);

        a.activate(&mut ctx).unwrap();
        assert!(a.is_active(&ctx));
        b.activate(&mut ctx).unwrap();
        assert!(!a.is_active(&ctx));
        assert_eq!(ctx.device().viewport(), Viewport::new(0, 0, 512, 512));

        b.deactivate(&mut ctx);
        assert_eq!(ctx.device().viewport(), Viewport::new(0, 0, 256, 256));
        assert_eq!(ctx.device().bound_framebuffer(), a.framebuffer());
        assert!(a.is_active(&ctx));

        a.deactivate(&mut ctx);
        assert_eq!(ctx.device().viewport(), Viewport::new(0, 0, 1024, 768));
        assert_eq!(ctx.device().bound_framebuffer(), None);
        assert_eq!(ctx.stack_depth(), 0);
    }

    #[test]
    fn init_and_destroy_release_everything() {
        let mut ctx = RenderContext::headless(100, 100);
        let mut t = RenderTarget::new(RenderTargetOptions {
            formats: vec![TextureFormat::Rgba8Unorm, TextureFormat::Rgba32Float],
            use_depth: true,
            ..Default::default()
        });
        assert!(t.activate(&mut ctx).is_err());
        t.init(&mut ctx).unwrap();
        assert!(t.is_complete(&ctx));
        assert_eq!(t.textures().len(), 2);
        assert_eq!(ctx.device().texture_count(), 2);
        t.destroy(&mut ctx);
        assert_eq!(ctx.device().texture_count(), 0);
        assert!(!t.is_complete(&ctx));
    }

    #[test]
    fn bare_target_keeps_caller_textures() {
        let mut ctx = RenderContext::headless(100, 100);
        let descriptor =
            TextureDescriptor::new(64, 64, TextureFormat::Rgba8Unorm, TextureFilter::Linear);
        let texture = ctx.device_mut().create_texture(&descriptor, None).unwrap();
        let mut t = RenderTarget::new(RenderTargetOptions {
            width: 64,
            height: 64,
            is_bare: true,
            textures: vec![texture],
            ..Default::default()
        });
        t.init(&mut ctx).unwrap();
        assert_eq!(ctx.device().texture_count(), 1);
        t.destroy(&mut ctx);
        assert_eq!(ctx.device().texture_count(), 1);
    }

    #[test]
    fn resize() {
        let mut ctx = RenderContext::headless(800, 600);
        let mut plain = target(&mut ctx, 32, 32, false);
        let old_texture = plain.texture(0);
        plain.set_size(&mut ctx, 16, 16, false).unwrap();
        assert_eq!(plain.texture(0), old_texture);
        assert_eq!(plain.size(), (16, 16));

        let mut deep = target(&mut ctx, 32, 32, true);
        deep.activate(&mut ctx).unwrap();
        deep.set_size(&mut ctx, 64, 48, false).unwrap();
        assert!(deep.is_complete(&ctx));
        assert_eq!(ctx.device().viewport(), Viewport::new(0, 0, 64, 48));
        assert_eq!(ctx.device().bound_framebuffer(), deep.framebuffer());
        let texture = deep.texture(0).unwrap();
        assert_eq!(ctx.device().texture_descriptor(texture).unwrap().width, 64);
        deep.deactivate(&mut ctx);
        assert_eq!(ctx.device().viewport(), Viewport::new(0, 0, 800, 600));

        plain.set_size(&mut ctx, 8, 8, true).unwrap();
        assert_ne!(plain.texture(0), old_texture);
        // plain(16x16 gone) + deep + plain(8x8)
        assert_eq!(ctx.device().texture_count(), 2);
    }

    #[test]
    fn picking_color_survives_readback() {
        let mut ctx = RenderContext::headless(640, 480);
        let picking = target(&mut ctx, 16, 16, true);
        for id in [1u32, 300, 70_000, 0x00ab_cdef] {
            let rgb = encode_picking_color(id);
            let c = picking_color_to_vec3(rgb);
            picking.clear(&mut ctx, [c.x, c.y, c.z, 1.0]).unwrap();
            let px = picking.read_pixels(&mut ctx, 0.5, 0.5, 0, None, None).unwrap();
            assert_eq!(decode_picking_color(&px), id);
        }
        let all = picking.read_all_pixels(&mut ctx, 0).unwrap();
        assert_eq!(all.len(), 16 * 16 * 4);
        assert_eq!(ctx.device().viewport(), Viewport::new(0, 0, 640, 480));
    }

    /// Headless device whose depth buffers can be made to fail.
    struct FlakyDepthDevice {
        inner: crate::HeadlessDevice,
        refuse_depth: std::sync::Arc<std::sync::atomic::AtomicBool>,
    }
    impl crate::GpuDevice for FlakyDepthDevice {
        fn create_texture(
            &mut self,
            descriptor: &TextureDescriptor,
            data: Option<&[u8]>,
        ) -> Result<TextureHandle, DeviceError> {
            self.inner.create_texture(descriptor, data)
        }
        fn update_texture(&mut self, texture: TextureHandle, data: &[u8]) -> Result<(), DeviceError> {
            self.inner.update_texture(texture, data)
        }
        fn delete_texture(&mut self, texture: TextureHandle) {
            self.inner.delete_texture(texture)
        }
        fn texture_descriptor(&self, texture: TextureHandle) -> Option<TextureDescriptor> {
            self.inner.texture_descriptor(texture)
        }
        fn create_buffer(
            &mut self,
            usage: crate::BufferUsage,
            data: &[u8],
        ) -> Result<crate::BufferHandle, DeviceError> {
            self.inner.create_buffer(usage, data)
        }
        fn delete_buffer(&mut self, buffer: crate::BufferHandle) {
            self.inner.delete_buffer(buffer)
        }
        fn create_renderbuffer(&mut self, width: u32, height: u32) -> Result<RenderbufferHandle, DeviceError> {
            if self.refuse_depth.load(std::sync::atomic::Ordering::SeqCst) {
                return Err(DeviceError::Backend("out of memory".to_string()));
            }
            self.inner.create_renderbuffer(width, height)
        }
        fn delete_renderbuffer(&mut self, renderbuffer: RenderbufferHandle) {
            self.inner.delete_renderbuffer(renderbuffer)
        }
        fn create_framebuffer(
            &mut self,
            color_attachments: &[TextureHandle],
            depth: Option<RenderbufferHandle>,
        ) -> Result<FramebufferHandle, DeviceError> {
            self.inner.create_framebuffer(color_attachments, depth)
        }
        fn delete_framebuffer(&mut self, framebuffer: FramebufferHandle) {
            self.inner.delete_framebuffer(framebuffer)
        }
        fn is_framebuffer_complete(&self, framebuffer: FramebufferHandle) -> bool {
            self.inner.is_framebuffer_complete(framebuffer)
        }
        fn bind_framebuffer(&mut self, framebuffer: Option<FramebufferHandle>) {
            self.inner.bind_framebuffer(framebuffer)
        }
        fn bound_framebuffer(&self) -> Option<FramebufferHandle> {
            self.inner.bound_framebuffer()
        }
        fn set_viewport(&mut self, viewport: Viewport) {
            self.inner.set_viewport(viewport)
        }
        fn viewport(&self) -> Viewport {
            self.inner.viewport()
        }
        fn clear(&mut self, color: [f32; 4]) -> Result<(), DeviceError> {
            self.inner.clear(color)
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
            self.inner.read_pixels(framebuffer, attachment, x, y, width, height)
        }
        fn texture_count(&self) -> usize {
            self.inner.texture_count()
        }
    }

    #[test]
    fn init_after_partial_failure_does_not_stack_attachments() {
        use std::sync::atomic::{AtomicBool, Ordering};
        use std::sync::Arc;

        let refuse_depth = Arc::new(AtomicBool::new(true));
        let device = FlakyDepthDevice {
            inner: crate::HeadlessDevice::new(),
            refuse_depth: refuse_depth.clone(),
        };
        let mut ctx = RenderContext::new(Box::new(device), 100, 100);
        let mut t = RenderTarget::new(RenderTargetOptions {
            use_depth: true,
            ..Default::default()
        });
        assert!(matches!(t.init(&mut ctx), Err(DeviceError::Backend(_))));
        assert!(t.framebuffer().is_none());

        refuse_depth.store(false, Ordering::SeqCst);
        t.init(&mut ctx).unwrap();
        assert_eq!(t.textures().len(), 1);
        assert_eq!(ctx.device().texture_count(), 1);
        assert!(t.is_complete(&ctx));
    }
}
