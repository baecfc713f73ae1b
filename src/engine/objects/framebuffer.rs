//! ### English
//! Framebuffer object composed of one color attachment and one depth/stencil attachment.
//!
//! ### 中文
//! 由一个颜色附件与一个深度/模板附件组成的 framebuffer 对象。

use std::sync::atomic::{AtomicU8, Ordering};

use dpi::PhysicalSize;

use super::{DestroyFlag, Surface, SurfaceKind};
use crate::engine::error::{GlError, GlResult};
use crate::engine::gl::{GlApi, check_gl_error};

const LEASE_NONE: u8 = 0;
const LEASE_RENDER: u8 = 1;
const LEASE_DISPLAY: u8 = 2;

/// ### English
/// Which side of the swap chain currently uses a framebuffer.
///
/// ### 中文
/// 当前使用某个 framebuffer 的交换链一侧。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FramebufferRole {
    Render,
    Display,
}

impl FramebufferRole {
    #[inline]
    fn bits(self) -> u8 {
        match self {
            Self::Render => LEASE_RENDER,
            Self::Display => LEASE_DISPLAY,
        }
    }

    #[inline]
    fn from_bits(bits: u8) -> Option<Self> {
        match bits {
            LEASE_RENDER => Some(Self::Render),
            LEASE_DISPLAY => Some(Self::Display),
            _ => None,
        }
    }

    #[inline]
    pub fn name(self) -> &'static str {
        match self {
            Self::Render => "render",
            Self::Display => "display",
        }
    }
}

/// ### English
/// Render target with equal-sized attachments. Never resized in place.
///
/// ### 中文
/// 附件尺寸一致的渲染目标。不会原地改变尺寸。
#[derive(Debug)]
pub struct Framebuffer {
    id: u32,
    size: PhysicalSize<u32>,
    color: Surface,
    depth_stencil: Surface,
    destroyed: DestroyFlag,
    /// ### English
    /// In-use marker (`LEASE_*`), set while a render or display callback holds the framebuffer.
    ///
    /// ### 中文
    /// 使用中标记（`LEASE_*`），在渲染或显示回调持有该 framebuffer 期间被设置。
    lease: AtomicU8,
}

impl Framebuffer {
    /// ### English
    /// Creates a framebuffer from two attachments and validates completeness.
    ///
    /// The attachments are consumed: on failure they are destroyed. The previous read/draw
    /// framebuffer bindings are restored before returning.
    ///
    /// #### Parameters
    /// - `gl`: Function table of the current context.
    /// - `color`: Color attachment (`COLOR_ATTACHMENT0`).
    /// - `depth_stencil`: Depth/stencil attachment (`DEPTH_STENCIL_ATTACHMENT`).
    ///
    /// ### 中文
    /// 由两个附件创建 framebuffer 并校验完整性。
    ///
    /// 附件所有权被转移：失败时会被销毁。返回前会恢复之前的 read/draw framebuffer 绑定。
    ///
    /// #### 参数
    /// - `gl`：当前上下文的函数表。
    /// - `color`：颜色附件（`COLOR_ATTACHMENT0`）。
    /// - `depth_stencil`：深度/模板附件（`DEPTH_STENCIL_ATTACHMENT`）。
    pub fn create(gl: &dyn GlApi, color: Surface, depth_stencil: Surface) -> GlResult<Self> {
        if color.size() != depth_stencil.size() {
            let err = GlError::AttachmentSizeMismatch {
                color: color.size(),
                depth_stencil: depth_stencil.size(),
            };
            color.destroy(gl);
            depth_stencil.destroy(gl);
            return Err(err);
        }

        let id = match gl.create_framebuffer() {
            Ok(id) => id,
            Err(err) => {
                color.destroy(gl);
                depth_stencil.destroy(gl);
                return Err(err);
            }
        };

        let previous_read = gl.get_integer(glow::READ_FRAMEBUFFER_BINDING) as u32;
        let previous_draw = gl.get_integer(glow::DRAW_FRAMEBUFFER_BINDING) as u32;

        gl.bind_framebuffer(glow::FRAMEBUFFER, id);
        attach(gl, glow::COLOR_ATTACHMENT0, &color);
        attach(gl, glow::DEPTH_STENCIL_ATTACHMENT, &depth_stencil);
        let attached = check_gl_error(gl, "glFramebufferTexture2D");
        let status = gl.check_framebuffer_status(glow::FRAMEBUFFER);

        gl.bind_framebuffer(glow::READ_FRAMEBUFFER, previous_read);
        gl.bind_framebuffer(glow::DRAW_FRAMEBUFFER, previous_draw);

        let result = attached.and_then(|()| {
            if status == glow::FRAMEBUFFER_COMPLETE {
                Ok(())
            } else {
                Err(GlError::IncompleteFramebuffer { status })
            }
        });
        if let Err(err) = result {
            gl.delete_framebuffer(id);
            color.destroy(gl);
            depth_stencil.destroy(gl);
            return Err(err);
        }

        Ok(Self {
            id,
            size: color.size(),
            color,
            depth_stencil,
            destroyed: DestroyFlag::new(),
            lease: AtomicU8::new(LEASE_NONE),
        })
    }

    #[inline]
    pub fn id(&self) -> u32 {
        self.id
    }

    #[inline]
    pub fn size(&self) -> PhysicalSize<u32> {
        self.size
    }

    #[inline]
    pub fn color_attachment(&self) -> &Surface {
        &self.color
    }

    #[inline]
    pub fn depth_stencil_attachment(&self) -> &Surface {
        &self.depth_stencil
    }

    #[inline]
    pub fn is_destroyed(&self) -> bool {
        self.destroyed.is_set()
    }

    /// ### English
    /// Binds as `FRAMEBUFFER` and sets the viewport to the full framebuffer.
    ///
    /// ### 中文
    /// 绑定为 `FRAMEBUFFER`，并将视口设为整个 framebuffer。
    pub fn bind(&self, gl: &dyn GlApi) -> GlResult<()> {
        if self.is_destroyed() {
            return Err(GlError::Destroyed {
                kind: "framebuffer",
                id: self.id,
            });
        }
        gl.bind_framebuffer(glow::FRAMEBUFFER, self.id);
        gl.viewport(0, 0, self.size.width as i32, self.size.height as i32);
        Ok(())
    }

    #[inline]
    pub fn unbind(&self, gl: &dyn GlApi) {
        gl.bind_framebuffer(glow::FRAMEBUFFER, 0);
    }

    /// ### English
    /// Deletes the framebuffer and both attachments. Only the first call has an effect.
    ///
    /// ### 中文
    /// 删除 framebuffer 及其两个附件。只有第一次调用生效。
    pub fn destroy(&self, gl: &dyn GlApi) -> bool {
        if !self.destroyed.mark("framebuffer", self.id) {
            return false;
        }
        gl.delete_framebuffer(self.id);
        self.color.destroy(gl);
        self.depth_stencil.destroy(gl);
        true
    }

    /// ### English
    /// Marks the framebuffer as in use by `role` until the returned guard is dropped.
    ///
    /// ### 中文
    /// 将 framebuffer 标记为被 `role` 使用，直到返回的守卫被 drop。
    pub fn lease(&self, role: FramebufferRole) -> GlResult<FramebufferLease<'_>> {
        match self.lease.compare_exchange(
            LEASE_NONE,
            role.bits(),
            Ordering::AcqRel,
            Ordering::Acquire,
        ) {
            Ok(_) => Ok(FramebufferLease { framebuffer: self }),
            Err(held) => Err(GlError::FramebufferInUse {
                id: self.id,
                held_by: FramebufferRole::from_bits(held).map_or("unknown", FramebufferRole::name),
            }),
        }
    }

    #[inline]
    pub fn leased_by(&self) -> Option<FramebufferRole> {
        FramebufferRole::from_bits(self.lease.load(Ordering::Acquire))
    }

    /// ### English
    /// Reads back an `RGBA8` region of the color attachment.
    ///
    /// The previous read framebuffer binding is restored.
    ///
    /// ### 中文
    /// 回读颜色附件中一块 `RGBA8` 区域。
    ///
    /// 会恢复之前的 read framebuffer 绑定。
    pub fn read_pixels(
        &self,
        gl: &dyn GlApi,
        x: u32,
        y: u32,
        width: u32,
        height: u32,
    ) -> GlResult<Vec<u8>> {
        if self.is_destroyed() {
            return Err(GlError::Destroyed {
                kind: "framebuffer",
                id: self.id,
            });
        }
        let previous_read = gl.get_integer(glow::READ_FRAMEBUFFER_BINDING) as u32;
        gl.bind_framebuffer(glow::READ_FRAMEBUFFER, self.id);
        let mut pixels = vec![0u8; width as usize * height as usize * 4];
        gl.read_pixels(x as i32, y as i32, width as i32, height as i32, &mut pixels);
        let result = check_gl_error(gl, "glReadPixels");
        gl.bind_framebuffer(glow::READ_FRAMEBUFFER, previous_read);
        result.map(|()| pixels)
    }

    /// ### English
    /// Reads back the whole color attachment.
    ///
    /// ### 中文
    /// 回读整个颜色附件。
    #[inline]
    pub fn snapshot(&self, gl: &dyn GlApi) -> GlResult<Vec<u8>> {
        self.read_pixels(gl, 0, 0, self.size.width, self.size.height)
    }
}

fn attach(gl: &dyn GlApi, attachment: u32, surface: &Surface) {
    match surface.kind() {
        SurfaceKind::Texture { target } => {
            gl.framebuffer_texture_2d(glow::FRAMEBUFFER, attachment, target, surface.id())
        }
        SurfaceKind::Renderbuffer => {
            gl.framebuffer_renderbuffer(glow::FRAMEBUFFER, attachment, surface.id())
        }
    }
}

impl Drop for Framebuffer {
    fn drop(&mut self) {
        if !self.destroyed.is_set() {
            log::warn!("framebuffer {} dropped without destroy; GL object leaked", self.id);
        }
    }
}

/// ### English
/// Clears the in-use marker on drop.
///
/// ### 中文
/// Drop 时清除使用中标记。
#[derive(Debug)]
pub struct FramebufferLease<'a> {
    framebuffer: &'a Framebuffer,
}

impl Drop for FramebufferLease<'_> {
    fn drop(&mut self) {
        self.framebuffer.lease.store(LEASE_NONE, Ordering::Release);
    }
}
