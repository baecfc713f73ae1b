//! ### English
//! [`GlApi`] implementation backed by a `glow::Context` loaded from a native context.
//!
//! ### 中文
//! 基于从原生上下文加载的 `glow::Context` 的 [`GlApi`] 实现。

use std::num::NonZeroU32;
use std::sync::Arc;

use glow::HasContext as _;

use super::GlApi;
use crate::engine::error::{GlError, GlResult};

/// ### English
/// glow-backed function table. Cloning shares the loaded function pointers.
///
/// ### 中文
/// 基于 glow 的函数表。克隆时共享已加载的函数指针。
#[derive(Clone)]
pub struct GlowApi {
    glow: Arc<glow::Context>,
}

impl GlowApi {
    #[inline]
    pub fn new(glow: glow::Context) -> Self {
        Self {
            glow: Arc::new(glow),
        }
    }

    /// ### English
    /// Returns the underlying glow context (cheap clone of an `Arc`).
    ///
    /// ### 中文
    /// 返回底层 glow 上下文（`Arc` 的低成本 clone）。
    #[inline]
    pub fn glow(&self) -> Arc<glow::Context> {
        self.glow.clone()
    }
}

#[inline]
fn texture(id: u32) -> Option<glow::NativeTexture> {
    NonZeroU32::new(id).map(glow::NativeTexture)
}

#[inline]
fn renderbuffer(id: u32) -> Option<glow::NativeRenderbuffer> {
    NonZeroU32::new(id).map(glow::NativeRenderbuffer)
}

#[inline]
fn framebuffer(id: u32) -> Option<glow::NativeFramebuffer> {
    NonZeroU32::new(id).map(glow::NativeFramebuffer)
}

impl GlApi for GlowApi {
    fn create_texture(&self) -> GlResult<u32> {
        unsafe { self.glow.create_texture() }
            .map(|t| t.0.get())
            .map_err(|reason| GlError::Allocation {
                kind: "texture",
                reason,
            })
    }

    fn delete_texture(&self, id: u32) {
        if let Some(t) = texture(id) {
            unsafe { self.glow.delete_texture(t) };
        }
    }

    fn bind_texture(&self, target: u32, id: u32) {
        unsafe { self.glow.bind_texture(target, texture(id)) };
    }

    fn tex_image_2d(
        &self,
        target: u32,
        internal_format: u32,
        width: i32,
        height: i32,
        format: u32,
        ty: u32,
    ) {
        unsafe {
            self.glow.tex_image_2d(
                target,
                0,
                internal_format as i32,
                width,
                height,
                0,
                format,
                ty,
                glow::PixelUnpackData::Slice(None),
            )
        };
    }

    fn tex_parameter_i32(&self, target: u32, parameter: u32, value: i32) {
        unsafe { self.glow.tex_parameter_i32(target, parameter, value) };
    }

    fn create_renderbuffer(&self) -> GlResult<u32> {
        unsafe { self.glow.create_renderbuffer() }
            .map(|r| r.0.get())
            .map_err(|reason| GlError::Allocation {
                kind: "renderbuffer",
                reason,
            })
    }

    fn delete_renderbuffer(&self, id: u32) {
        if let Some(r) = renderbuffer(id) {
            unsafe { self.glow.delete_renderbuffer(r) };
        }
    }

    fn bind_renderbuffer(&self, id: u32) {
        unsafe { self.glow.bind_renderbuffer(glow::RENDERBUFFER, renderbuffer(id)) };
    }

    fn renderbuffer_storage(&self, internal_format: u32, width: i32, height: i32) {
        unsafe {
            self.glow
                .renderbuffer_storage(glow::RENDERBUFFER, internal_format, width, height)
        };
    }

    fn create_framebuffer(&self) -> GlResult<u32> {
        unsafe { self.glow.create_framebuffer() }
            .map(|f| f.0.get())
            .map_err(|reason| GlError::Allocation {
                kind: "framebuffer",
                reason,
            })
    }

    fn delete_framebuffer(&self, id: u32) {
        if let Some(f) = framebuffer(id) {
            unsafe { self.glow.delete_framebuffer(f) };
        }
    }

    fn bind_framebuffer(&self, target: u32, id: u32) {
        unsafe { self.glow.bind_framebuffer(target, framebuffer(id)) };
    }

    fn framebuffer_texture_2d(&self, target: u32, attachment: u32, texture_target: u32, id: u32) {
        unsafe {
            self.glow
                .framebuffer_texture_2d(target, attachment, texture_target, texture(id), 0)
        };
    }

    fn framebuffer_renderbuffer(&self, target: u32, attachment: u32, id: u32) {
        unsafe {
            self.glow.framebuffer_renderbuffer(
                target,
                attachment,
                glow::RENDERBUFFER,
                renderbuffer(id),
            )
        };
    }

    fn check_framebuffer_status(&self, target: u32) -> u32 {
        unsafe { self.glow.check_framebuffer_status(target) }
    }

    fn get_integer(&self, parameter: u32) -> i32 {
        unsafe { self.glow.get_parameter_i32(parameter) }
    }

    fn get_integer_v(&self, parameter: u32, out: &mut [i32]) {
        unsafe { self.glow.get_parameter_i32_slice(parameter, out) };
    }

    fn is_enabled(&self, capability: u32) -> bool {
        unsafe { self.glow.is_enabled(capability) }
    }

    fn set_enabled(&self, capability: u32, enabled: bool) {
        unsafe {
            if enabled {
                self.glow.enable(capability);
            } else {
                self.glow.disable(capability);
            }
        }
    }

    fn viewport(&self, x: i32, y: i32, width: i32, height: i32) {
        unsafe { self.glow.viewport(x, y, width, height) };
    }

    fn scissor(&self, x: i32, y: i32, width: i32, height: i32) {
        unsafe { self.glow.scissor(x, y, width, height) };
    }

    fn clear_color(&self, red: f32, green: f32, blue: f32, alpha: f32) {
        unsafe { self.glow.clear_color(red, green, blue, alpha) };
    }

    fn clear(&self, mask: u32) {
        unsafe { self.glow.clear(mask) };
    }

    fn read_pixels(&self, x: i32, y: i32, width: i32, height: i32, out: &mut [u8]) {
        unsafe {
            self.glow.read_pixels(
                x,
                y,
                width,
                height,
                glow::RGBA,
                glow::UNSIGNED_BYTE,
                glow::PixelPackData::Slice(Some(out)),
            )
        };
    }

    fn flush(&self) {
        unsafe { self.glow.flush() };
    }

    fn finish(&self) {
        unsafe { self.glow.finish() };
    }

    fn get_error(&self) -> u32 {
        unsafe { self.glow.get_error() }
    }

    fn version_string(&self) -> String {
        unsafe { self.glow.get_parameter_string(glow::VERSION) }
    }
}
