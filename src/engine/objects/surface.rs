//! ### English
//! A single renderable attachment: a color texture or a depth/stencil renderbuffer.
//!
//! ### 中文
//! 单个可渲染附件：颜色纹理或深度/模板 renderbuffer。

use dpi::PhysicalSize;

use super::DestroyFlag;
use crate::engine::config::SamplingParams;
use crate::engine::error::{GlError, GlResult};
use crate::engine::gl::{GlApi, check_gl_error};

/// ### English
/// What kind of native object backs a [`Surface`].
///
/// ### 中文
/// [`Surface`] 背后的原生对象类型。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SurfaceKind {
    Texture { target: u32 },
    Renderbuffer,
}

impl SurfaceKind {
    #[inline]
    pub fn name(self) -> &'static str {
        match self {
            Self::Texture { .. } => "texture",
            Self::Renderbuffer => "renderbuffer",
        }
    }
}

/// ### English
/// Maps a texture target to the `glGet` parameter that reports its current binding.
///
/// ### 中文
/// 将纹理目标映射到报告其当前绑定的 `glGet` 参数。
pub fn texture_binding_for(target: u32) -> Option<u32> {
    match target {
        glow::TEXTURE_1D => Some(glow::TEXTURE_BINDING_1D),
        glow::TEXTURE_2D => Some(glow::TEXTURE_BINDING_2D),
        glow::TEXTURE_2D_ARRAY => Some(glow::TEXTURE_BINDING_2D_ARRAY),
        glow::TEXTURE_3D => Some(glow::TEXTURE_BINDING_3D),
        glow::TEXTURE_CUBE_MAP => Some(glow::TEXTURE_BINDING_CUBE_MAP),
        glow::TEXTURE_RECTANGLE => Some(glow::TEXTURE_BINDING_RECTANGLE),
        glow::TEXTURE_2D_MULTISAMPLE => Some(glow::TEXTURE_BINDING_2D_MULTISAMPLE),
        _ => None,
    }
}

/// ### English
/// One GPU attachment with its size and internal format. Owns the native name.
///
/// ### 中文
/// 一个 GPU 附件，包含尺寸与内部格式。持有原生对象名。
#[derive(Debug)]
pub struct Surface {
    id: u32,
    kind: SurfaceKind,
    size: PhysicalSize<u32>,
    internal_format: u32,
    destroyed: DestroyFlag,
}

impl Surface {
    /// ### English
    /// Allocates a texture with level-0 storage and applies `sampling`.
    ///
    /// The previous binding of `target` is restored before returning.
    ///
    /// #### Parameters
    /// - `gl`: Function table of the current context.
    /// - `target`: `TEXTURE_2D` or `TEXTURE_RECTANGLE`.
    /// - `size`: Storage size in pixels.
    /// - `internal_format`: Sized internal format, e.g. `RGBA8`.
    /// - `sampling`: Filter and wrap modes.
    ///
    /// ### 中文
    /// 分配带第 0 级存储的纹理，并应用 `sampling`。
    ///
    /// 返回前会恢复 `target` 之前的绑定。
    ///
    /// #### 参数
    /// - `gl`：当前上下文的函数表。
    /// - `target`：`TEXTURE_2D` 或 `TEXTURE_RECTANGLE`。
    /// - `size`：以像素为单位的存储尺寸。
    /// - `internal_format`：带尺寸的内部格式，例如 `RGBA8`。
    /// - `sampling`：过滤与环绕模式。
    pub fn create_texture(
        gl: &dyn GlApi,
        target: u32,
        size: PhysicalSize<u32>,
        internal_format: u32,
        sampling: SamplingParams,
    ) -> GlResult<Self> {
        let Some(binding) = texture_binding_for(target) else {
            return Err(GlError::UnsupportedTextureTarget { target });
        };
        if !matches!(target, glow::TEXTURE_2D | glow::TEXTURE_RECTANGLE) {
            return Err(GlError::UnsupportedTextureTarget { target });
        }

        let previous = gl.get_integer(binding) as u32;
        let id = gl.create_texture()?;
        gl.bind_texture(target, id);
        gl.tex_image_2d(
            target,
            internal_format,
            size.width as i32,
            size.height as i32,
            glow::RGBA,
            glow::UNSIGNED_BYTE,
        );
        let mut result = check_gl_error(gl, "glTexImage2D");
        if result.is_ok() {
            gl.tex_parameter_i32(target, glow::TEXTURE_MIN_FILTER, sampling.min_filter as i32);
            gl.tex_parameter_i32(target, glow::TEXTURE_MAG_FILTER, sampling.mag_filter as i32);
            gl.tex_parameter_i32(target, glow::TEXTURE_WRAP_S, sampling.wrap_s as i32);
            gl.tex_parameter_i32(target, glow::TEXTURE_WRAP_T, sampling.wrap_t as i32);
            result = check_gl_error(gl, "glTexParameteri");
        }
        gl.bind_texture(target, previous);

        if let Err(err) = result {
            gl.delete_texture(id);
            return Err(err);
        }

        Ok(Self {
            id,
            kind: SurfaceKind::Texture { target },
            size,
            internal_format,
            destroyed: DestroyFlag::new(),
        })
    }

    /// ### English
    /// Allocates a renderbuffer, restoring the previous renderbuffer binding.
    ///
    /// ### 中文
    /// 分配 renderbuffer，并恢复之前的 renderbuffer 绑定。
    pub fn create_renderbuffer(
        gl: &dyn GlApi,
        size: PhysicalSize<u32>,
        internal_format: u32,
    ) -> GlResult<Self> {
        let previous = gl.get_integer(glow::RENDERBUFFER_BINDING) as u32;
        let id = gl.create_renderbuffer()?;
        gl.bind_renderbuffer(id);
        gl.renderbuffer_storage(internal_format, size.width as i32, size.height as i32);
        let result = check_gl_error(gl, "glRenderbufferStorage");
        gl.bind_renderbuffer(previous);

        if let Err(err) = result {
            gl.delete_renderbuffer(id);
            return Err(err);
        }

        Ok(Self {
            id,
            kind: SurfaceKind::Renderbuffer,
            size,
            internal_format,
            destroyed: DestroyFlag::new(),
        })
    }

    #[inline]
    pub fn id(&self) -> u32 {
        self.id
    }

    #[inline]
    pub fn kind(&self) -> SurfaceKind {
        self.kind
    }

    #[inline]
    pub fn size(&self) -> PhysicalSize<u32> {
        self.size
    }

    #[inline]
    pub fn internal_format(&self) -> u32 {
        self.internal_format
    }

    #[inline]
    pub fn is_destroyed(&self) -> bool {
        self.destroyed.is_set()
    }

    /// ### English
    /// Binds the surface to its target. Fails once the surface is destroyed.
    ///
    /// ### 中文
    /// 将 surface 绑定到其目标。销毁后调用会失败。
    pub fn bind(&self, gl: &dyn GlApi) -> GlResult<()> {
        if self.is_destroyed() {
            return Err(GlError::Destroyed {
                kind: self.kind.name(),
                id: self.id,
            });
        }
        match self.kind {
            SurfaceKind::Texture { target } => gl.bind_texture(target, self.id),
            SurfaceKind::Renderbuffer => gl.bind_renderbuffer(self.id),
        }
        Ok(())
    }

    pub fn unbind(&self, gl: &dyn GlApi) {
        match self.kind {
            SurfaceKind::Texture { target } => gl.bind_texture(target, 0),
            SurfaceKind::Renderbuffer => gl.bind_renderbuffer(0),
        }
    }

    /// ### English
    /// Deletes the native object. Returns `true` if this call performed the deletion.
    ///
    /// ### 中文
    /// 删除原生对象。若本次调用执行了删除则返回 `true`。
    pub fn destroy(&self, gl: &dyn GlApi) -> bool {
        if !self.destroyed.mark(self.kind.name(), self.id) {
            return false;
        }
        match self.kind {
            SurfaceKind::Texture { .. } => gl.delete_texture(self.id),
            SurfaceKind::Renderbuffer => gl.delete_renderbuffer(self.id),
        }
        true
    }
}

impl Drop for Surface {
    fn drop(&mut self) {
        if !self.destroyed.is_set() {
            log::warn!(
                "{} {} dropped without destroy; GL object leaked",
                self.kind.name(),
                self.id
            );
        }
    }
}
