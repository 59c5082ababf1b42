use bevy::prelude::Resource;

use crate::{DeviceError, FramebufferHandle, GpuDevice, HeadlessDevice, RenderTargetId, Viewport};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct ActiveTarget {
    pub id: RenderTargetId,
    pub framebuffer: FramebufferHandle,
    pub viewport: Viewport,
}

/// The device plus the stack of active off-screen targets. One per renderer;
/// every component needing the GPU receives it explicitly.
#[derive(Resource)]
pub struct RenderContext {
    device: Box<dyn GpuDevice + Send + Sync>,
    stack: Vec<ActiveTarget>,
    canvas_width: u32,
    canvas_height: u32,
}

impl RenderContext {
    pub fn new(device: Box<dyn GpuDevice + Send + Sync>, canvas_width: u32, canvas_height: u32) -> Self {
        let mut me = Self {
            device,
            stack: vec![],
            canvas_width,
            canvas_height,
        };
        me.restore_canvas();
        me
    }
    pub fn headless(canvas_width: u32, canvas_height: u32) -> Self {
        Self::new(Box::new(HeadlessDevice::new()), canvas_width, canvas_height)
    }
    pub fn device(&self) -> &dyn GpuDevice {
        self.device.as_ref()
    }
    pub fn device_mut(&mut self) -> &mut dyn GpuDevice {
        self.device.as_mut()
    }
    pub fn canvas_size(&self) -> (u32, u32) {
        (self.canvas_width, self.canvas_height)
    }
    pub fn canvas_viewport(&self) -> Viewport {
        Viewport::from_size(self.canvas_width, self.canvas_height)
    }
    /// Resizes the canvas; the viewport follows only when no off-screen
    /// target is active.
    pub fn set_canvas_size(&mut self, width: u32, height: u32) {
        self.canvas_width = width;
        self.canvas_height = height;
        if self.stack.is_empty() {
            self.restore_canvas();
        }
    }
    pub fn active_target(&self) -> Option<RenderTargetId> {
        self.stack.last().map(|t| t.id)
    }
    pub fn stack_depth(&self) -> usize {
        self.stack.len()
    }
    /// Clears whatever is bound: the top of the stack or the canvas.
    pub fn clear(&mut self, color: [f32; 4]) -> Result<(), DeviceError> {
        self.device.clear(color)
    }

    pub(crate) fn push(&mut self, target: ActiveTarget) {
        self.device.bind_framebuffer(Some(target.framebuffer));
        self.device.set_viewport(target.viewport);
        self.stack.push(target);
    }
    /// Pops the top and rebinds whatever is below it.
    pub(crate) fn pop(&mut self) -> Option<ActiveTarget> {
        let popped = self.stack.pop();
        match self.stack.last().copied() {
            Some(top) => {
                self.device.bind_framebuffer(Some(top.framebuffer));
                self.device.set_viewport(top.viewport);
            }
            None => self.restore_canvas(),
        }
        popped
    }
    /// Replaces the top entry if it belongs to `id`, rebinding it.
    pub(crate) fn replace_top(&mut self, target: ActiveTarget) {
        if let Some(top) = self.stack.last_mut() {
            if top.id == target.id {
                *top = target;
                self.device.bind_framebuffer(Some(target.framebuffer));
                self.device.set_viewport(target.viewport);
            }
        }
    }
    fn restore_canvas(&mut self) {
        self.device.bind_framebuffer(None);
        let viewport = self.canvas_viewport();
        self.device.set_viewport(viewport);
    }
}
