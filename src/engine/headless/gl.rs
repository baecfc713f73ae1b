//! ### English
//! Per-context binding state over a shared [`HeadlessDevice`].
//!
//! ### 中文
//! 基于共享 [`HeadlessDevice`] 的每上下文绑定状态。

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use dpi::PhysicalSize;

use super::device::{Attachment, HeadlessDevice, ObjectKind, RenderbufferObject, TextureObject};
use crate::engine::error::GlResult;
use crate::engine::gl::GlApi;
use crate::engine::objects::texture_binding_for;

const MAX_DIMENSION: i32 = 16_384;

const TEXTURE_TARGETS: [u32; 7] = [
    glow::TEXTURE_1D,
    glow::TEXTURE_2D,
    glow::TEXTURE_2D_ARRAY,
    glow::TEXTURE_3D,
    glow::TEXTURE_CUBE_MAP,
    glow::TEXTURE_RECTANGLE,
    glow::TEXTURE_2D_MULTISAMPLE,
];

#[derive(Debug, Default)]
struct BindingState {
    read_framebuffer: u32,
    draw_framebuffer: u32,
    renderbuffer: u32,
    textures: HashMap<u32, u32>,
    viewport: [i32; 4],
    scissor_box: [i32; 4],
    enabled: HashSet<u32>,
    clear_color: [f32; 4],
    error: u32,
}

impl BindingState {
    /// ### English
    /// Records an error unless one is already pending (`glGetError` semantics).
    ///
    /// ### 中文
    /// 记录错误，除非已有待处理错误（`glGetError` 语义）。
    fn raise(&mut self, code: u32) {
        if self.error == glow::NO_ERROR {
            self.error = code;
        }
    }

    fn framebuffer_for(&self, target: u32) -> u32 {
        match target {
            glow::READ_FRAMEBUFFER => self.read_framebuffer,
            _ => self.draw_framebuffer,
        }
    }
}

/// ### English
/// Software GL context: binding state is private, objects live in the shared device.
///
/// ### 中文
/// 软件 GL 上下文：绑定状态私有，对象存放于共享设备中。
#[derive(Debug)]
pub struct HeadlessGl {
    device: Arc<HeadlessDevice>,
    state: Mutex<BindingState>,
    flushes: AtomicUsize,
}

impl HeadlessGl {
    pub fn new(device: Arc<HeadlessDevice>) -> Self {
        Self {
            device,
            state: Mutex::new(BindingState::default()),
            flushes: AtomicUsize::new(0),
        }
    }

    #[inline]
    pub fn device(&self) -> &Arc<HeadlessDevice> {
        &self.device
    }

    #[inline]
    fn state(&self) -> MutexGuard<'_, BindingState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// ### English
    /// Number of `glFlush` / `glFinish` calls on this context.
    ///
    /// ### 中文
    /// 本上下文上 `glFlush` / `glFinish` 的调用次数。
    #[inline]
    pub fn flushes(&self) -> usize {
        self.flushes.load(Ordering::Relaxed)
    }

    fn valid_dimensions(width: i32, height: i32) -> Option<PhysicalSize<u32>> {
        ((1..=MAX_DIMENSION).contains(&width) && (1..=MAX_DIMENSION).contains(&height))
            .then(|| PhysicalSize::new(width as u32, height as u32))
    }
}

impl GlApi for HeadlessGl {
    fn create_texture(&self) -> GlResult<u32> {
        let id = self.device.allocate_name(ObjectKind::Texture);
        let mut objects = self.device.objects();
        objects.textures.insert(id, TextureObject::default());
        self.device.record_live(ObjectKind::Texture, objects.textures.len());
        Ok(id)
    }

    fn delete_texture(&self, texture: u32) {
        if texture == 0 {
            return;
        }
        self.device.record_delete(ObjectKind::Texture);
        self.device.objects().textures.remove(&texture);
        self.state().textures.retain(|_, bound| *bound != texture);
    }

    fn bind_texture(&self, target: u32, texture: u32) {
        let mut state = self.state();
        if texture_binding_for(target).is_none() {
            state.raise(glow::INVALID_ENUM);
            return;
        }
        if texture != 0 && !self.device.objects().textures.contains_key(&texture) {
            state.raise(glow::INVALID_OPERATION);
            return;
        }
        state.textures.insert(target, texture);
    }

    fn tex_image_2d(
        &self,
        target: u32,
        internal_format: u32,
        width: i32,
        height: i32,
        _format: u32,
        _ty: u32,
    ) {
        let mut state = self.state();
        let bound = state.textures.get(&target).copied().unwrap_or(0);
        let Some(size) = Self::valid_dimensions(width, height) else {
            state.raise(glow::INVALID_VALUE);
            return;
        };
        if self.device.allocations_fail() {
            state.raise(glow::OUT_OF_MEMORY);
            return;
        }
        match self.device.objects().textures.get_mut(&bound) {
            Some(texture) => {
                texture.size = Some(size);
                texture.internal_format = internal_format;
            }
            None => state.raise(glow::INVALID_OPERATION),
        }
    }

    fn tex_parameter_i32(&self, target: u32, _parameter: u32, _value: i32) {
        let mut state = self.state();
        if state.textures.get(&target).copied().unwrap_or(0) == 0 {
            state.raise(glow::INVALID_OPERATION);
        }
    }

    fn create_renderbuffer(&self) -> GlResult<u32> {
        let id = self.device.allocate_name(ObjectKind::Renderbuffer);
        let mut objects = self.device.objects();
        objects.renderbuffers.insert(id, RenderbufferObject::default());
        self.device.record_live(ObjectKind::Renderbuffer, objects.renderbuffers.len());
        Ok(id)
    }

    fn delete_renderbuffer(&self, renderbuffer: u32) {
        if renderbuffer == 0 {
            return;
        }
        self.device.record_delete(ObjectKind::Renderbuffer);
        self.device.objects().renderbuffers.remove(&renderbuffer);
        let mut state = self.state();
        if state.renderbuffer == renderbuffer {
            state.renderbuffer = 0;
        }
    }

    fn bind_renderbuffer(&self, renderbuffer: u32) {
        let mut state = self.state();
        if renderbuffer != 0 && !self.device.objects().renderbuffers.contains_key(&renderbuffer) {
            state.raise(glow::INVALID_OPERATION);
            return;
        }
        state.renderbuffer = renderbuffer;
    }

    fn renderbuffer_storage(&self, internal_format: u32, width: i32, height: i32) {
        let mut state = self.state();
        let Some(size) = Self::valid_dimensions(width, height) else {
            state.raise(glow::INVALID_VALUE);
            return;
        };
        if self.device.allocations_fail() {
            state.raise(glow::OUT_OF_MEMORY);
            return;
        }
        match self.device.objects().renderbuffers.get_mut(&state.renderbuffer) {
            Some(renderbuffer) => {
                renderbuffer.size = Some(size);
                renderbuffer.internal_format = internal_format;
            }
            None => state.raise(glow::INVALID_OPERATION),
        }
    }

    fn create_framebuffer(&self) -> GlResult<u32> {
        let id = self.device.allocate_name(ObjectKind::Framebuffer);
        let mut objects = self.device.objects();
        objects.framebuffers.insert(id, Default::default());
        self.device.record_live(ObjectKind::Framebuffer, objects.framebuffers.len());
        Ok(id)
    }

    fn delete_framebuffer(&self, framebuffer: u32) {
        if framebuffer == 0 {
            return;
        }
        self.device.delay_delete();
        self.device.record_delete(ObjectKind::Framebuffer);
        self.device.objects().framebuffers.remove(&framebuffer);
        let mut state = self.state();
        if state.read_framebuffer == framebuffer {
            state.read_framebuffer = 0;
        }
        if state.draw_framebuffer == framebuffer {
            state.draw_framebuffer = 0;
        }
    }

    fn bind_framebuffer(&self, target: u32, framebuffer: u32) {
        let mut state = self.state();
        if framebuffer != 0 && !self.device.objects().framebuffers.contains_key(&framebuffer) {
            state.raise(glow::INVALID_OPERATION);
            return;
        }
        match target {
            glow::FRAMEBUFFER => {
                state.read_framebuffer = framebuffer;
                state.draw_framebuffer = framebuffer;
            }
            glow::READ_FRAMEBUFFER => state.read_framebuffer = framebuffer,
            glow::DRAW_FRAMEBUFFER => state.draw_framebuffer = framebuffer,
            _ => state.raise(glow::INVALID_ENUM),
        }
    }

    fn framebuffer_texture_2d(&self, target: u32, attachment: u32, _texture_target: u32, texture: u32) {
        self.attach(target, attachment, (texture != 0).then_some(Attachment::Texture(texture)));
    }

    fn framebuffer_renderbuffer(&self, target: u32, attachment: u32, renderbuffer: u32) {
        self.attach(
            target,
            attachment,
            (renderbuffer != 0).then_some(Attachment::Renderbuffer(renderbuffer)),
        );
    }

    fn check_framebuffer_status(&self, target: u32) -> u32 {
        let bound = self.state().framebuffer_for(target);
        if bound == 0 {
            return glow::FRAMEBUFFER_COMPLETE;
        }
        if let Some(status) = self.device.forced_status() {
            return status;
        }
        self.device.objects().framebuffer_status(bound)
    }

    fn get_integer(&self, parameter: u32) -> i32 {
        let state = self.state();
        let value = match parameter {
            glow::READ_FRAMEBUFFER_BINDING => state.read_framebuffer,
            glow::DRAW_FRAMEBUFFER_BINDING => state.draw_framebuffer,
            glow::RENDERBUFFER_BINDING => state.renderbuffer,
            _ => TEXTURE_TARGETS
                .iter()
                .find(|&&target| texture_binding_for(target) == Some(parameter))
                .and_then(|target| state.textures.get(target).copied())
                .unwrap_or(0),
        };
        value as i32
    }

    fn get_integer_v(&self, parameter: u32, out: &mut [i32]) {
        let values = {
            let state = self.state();
            match parameter {
                glow::VIEWPORT => Some(state.viewport),
                glow::SCISSOR_BOX => Some(state.scissor_box),
                _ => None,
            }
        };
        match values {
            Some(values) => {
                for (slot, value) in out.iter_mut().zip(values) {
                    *slot = value;
                }
            }
            None => {
                if let Some(first) = out.first_mut() {
                    *first = self.get_integer(parameter);
                }
            }
        }
    }

    fn is_enabled(&self, capability: u32) -> bool {
        self.state().enabled.contains(&capability)
    }

    fn set_enabled(&self, capability: u32, enabled: bool) {
        let mut state = self.state();
        if enabled {
            state.enabled.insert(capability);
        } else {
            state.enabled.remove(&capability);
        }
    }

    fn viewport(&self, x: i32, y: i32, width: i32, height: i32) {
        self.state().viewport = [x, y, width, height];
    }

    fn scissor(&self, x: i32, y: i32, width: i32, height: i32) {
        self.state().scissor_box = [x, y, width, height];
    }

    fn clear_color(&self, red: f32, green: f32, blue: f32, alpha: f32) {
        self.state().clear_color = [red, green, blue, alpha];
    }

    /// ### English
    /// Fills the color texture of the bound draw framebuffer with the clear color.
    ///
    /// ### 中文
    /// 用清除颜色填充当前 draw framebuffer 的颜色纹理。
    fn clear(&self, mask: u32) {
        if mask & glow::COLOR_BUFFER_BIT == 0 {
            return;
        }
        let (framebuffer, color) = {
            let state = self.state();
            (state.draw_framebuffer, state.clear_color)
        };
        if framebuffer == 0 {
            return;
        }
        let fill = color.map(|c| (c.clamp(0.0, 1.0) * 255.0).round() as u8);
        let mut objects = self.device.objects();
        if let Some(texture) = objects.color_texture(framebuffer) {
            if let Some(texture) = objects.textures.get_mut(&texture) {
                texture.fill = fill;
            }
        }
    }

    fn read_pixels(&self, _x: i32, _y: i32, width: i32, height: i32, out: &mut [u8]) {
        let mut state = self.state();
        let required = width.max(0) as usize * height.max(0) as usize * 4;
        if out.len() < required {
            state.raise(glow::INVALID_OPERATION);
            return;
        }
        let objects = self.device.objects();
        let fill = objects
            .color_texture(state.read_framebuffer)
            .and_then(|texture| objects.textures.get(&texture))
            .map(|texture| texture.fill);
        match fill {
            Some(fill) => {
                for pixel in out[..required].chunks_exact_mut(4) {
                    pixel.copy_from_slice(&fill);
                }
            }
            None => state.raise(glow::INVALID_OPERATION),
        }
    }

    fn flush(&self) {
        self.flushes.fetch_add(1, Ordering::Relaxed);
    }

    fn finish(&self) {
        self.flushes.fetch_add(1, Ordering::Relaxed);
    }

    fn get_error(&self) -> u32 {
        std::mem::replace(&mut self.state().error, glow::NO_ERROR)
    }

    fn version_string(&self) -> String {
        "3.3.0 headless".to_string()
    }
}

impl HeadlessGl {
    fn attach(&self, target: u32, attachment: u32, object: Option<Attachment>) {
        let mut state = self.state();
        let framebuffer = state.framebuffer_for(target);
        let mut objects = self.device.objects();
        let Some(record) = objects.framebuffers.get_mut(&framebuffer) else {
            state.raise(glow::INVALID_OPERATION);
            return;
        };
        match attachment {
            glow::COLOR_ATTACHMENT0 => record.color = object,
            glow::DEPTH_STENCIL_ATTACHMENT => record.depth_stencil = object,
            _ => state.raise(glow::INVALID_ENUM),
        }
    }
}
