//! ### English
//! The GL function table used by the pool, plus the error-check helper.
//!
//! Object ids are plain `u32` names with `0` meaning "none", exactly as the native API uses them.
//! Backends either forward to `glow` ([`GlowApi`]) or emulate the calls in software
//! (the headless backend).
//!
//! ### 中文
//! 池使用的 GL 函数表以及错误检查辅助函数。
//!
//! 对象 id 为普通的 `u32` 名称，`0` 表示“无”，与原生 API 一致。
//! 后端要么转发给 `glow`（[`GlowApi`]），要么在软件中模拟这些调用（headless 后端）。

mod glow_api;
mod state;

pub use glow_api::GlowApi;
pub use state::AmbientState;

use std::sync::Arc;

use super::error::{GlError, GlResult};

/// ### English
/// Shared handle to a context's GL function table.
///
/// ### 中文
/// 指向某个上下文 GL 函数表的共享句柄。
pub type SharedGl = Arc<dyn GlApi>;

/// ### English
/// Minimal GL surface needed to allocate, bind, draw into, read back, and delete framebuffers.
///
/// Every call applies to the context current on the calling thread.
///
/// ### 中文
/// 分配、绑定、绘制、回读与删除 framebuffer 所需的最小 GL 接口。
///
/// 所有调用都作用于调用线程上的 current 上下文。
pub trait GlApi: Send + Sync {
    fn create_texture(&self) -> GlResult<u32>;
    fn delete_texture(&self, texture: u32);
    fn bind_texture(&self, target: u32, texture: u32);
    /// ### English
    /// Allocates level-0 storage without initial data.
    ///
    /// ### 中文
    /// 分配第 0 级存储，不上传初始数据。
    fn tex_image_2d(
        &self,
        target: u32,
        internal_format: u32,
        width: i32,
        height: i32,
        format: u32,
        ty: u32,
    );
    fn tex_parameter_i32(&self, target: u32, parameter: u32, value: i32);

    fn create_renderbuffer(&self) -> GlResult<u32>;
    fn delete_renderbuffer(&self, renderbuffer: u32);
    fn bind_renderbuffer(&self, renderbuffer: u32);
    fn renderbuffer_storage(&self, internal_format: u32, width: i32, height: i32);

    fn create_framebuffer(&self) -> GlResult<u32>;
    fn delete_framebuffer(&self, framebuffer: u32);
    fn bind_framebuffer(&self, target: u32, framebuffer: u32);
    fn framebuffer_texture_2d(&self, target: u32, attachment: u32, texture_target: u32, texture: u32);
    fn framebuffer_renderbuffer(&self, target: u32, attachment: u32, renderbuffer: u32);
    fn check_framebuffer_status(&self, target: u32) -> u32;

    fn get_integer(&self, parameter: u32) -> i32;
    fn get_integer_v(&self, parameter: u32, out: &mut [i32]);
    fn is_enabled(&self, capability: u32) -> bool;
    fn set_enabled(&self, capability: u32, enabled: bool);
    fn viewport(&self, x: i32, y: i32, width: i32, height: i32);
    fn scissor(&self, x: i32, y: i32, width: i32, height: i32);

    fn clear_color(&self, red: f32, green: f32, blue: f32, alpha: f32);
    fn clear(&self, mask: u32);
    /// ### English
    /// Reads `RGBA` / `UNSIGNED_BYTE` pixels from the bound read framebuffer into `out`.
    ///
    /// ### 中文
    /// 从当前绑定的 read framebuffer 读取 `RGBA` / `UNSIGNED_BYTE` 像素到 `out`。
    fn read_pixels(&self, x: i32, y: i32, width: i32, height: i32, out: &mut [u8]);

    fn flush(&self);
    fn finish(&self);
    fn get_error(&self) -> u32;
    fn version_string(&self) -> String;
}

/// ### English
/// Converts a pending `glGetError` code into [`GlError::Call`].
///
/// #### Parameters
/// - `gl`: Function table of the current context.
/// - `operation`: Name of the call that was just issued, used in the message.
///
/// ### 中文
/// 将待处理的 `glGetError` 错误码转换为 [`GlError::Call`]。
///
/// #### 参数
/// - `gl`：当前上下文的函数表。
/// - `operation`：刚刚发出的调用名，用于错误信息。
#[inline]
pub fn check_gl_error(gl: &dyn GlApi, operation: &'static str) -> GlResult<()> {
    match gl.get_error() {
        glow::NO_ERROR => Ok(()),
        code => Err(GlError::Call { operation, code }),
    }
}

/// ### English
/// Parsed `GL_VERSION` of a context.
///
/// ### 中文
/// 解析后的上下文 `GL_VERSION`。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GlVersion {
    pub major: u32,
    pub minor: u32,
    pub is_gles: bool,
    pub raw: String,
}

impl GlVersion {
    /// ### English
    /// Expected forms: `"4.6.0 ..."` or `"OpenGL ES 3.2 ..."`.
    ///
    /// ### 中文
    /// 期望的版本字符串形式：`"4.6.0 ..."` 或 `"OpenGL ES 3.2 ..."`。
    pub fn parse(version: &str) -> Self {
        let mut major = 0u32;
        let mut minor = 0u32;
        let number_token = version
            .split_whitespace()
            .find(|t| t.chars().next().is_some_and(|c| c.is_ascii_digit()));
        if let Some(token) = number_token {
            let mut parts = token.split('.');
            if let Some(m) = parts.next().and_then(|s| s.parse::<u32>().ok()) {
                major = m;
            }
            if let Some(n) = parts.next().and_then(|s| s.parse::<u32>().ok()) {
                minor = n;
            }
        }
        Self {
            major,
            minor,
            is_gles: version.starts_with("OpenGL ES"),
            raw: version.to_string(),
        }
    }

    /// ### English
    /// Whether sRGB color formats are core (desktop GL 2.1+/3.0, GLES 3.0+).
    ///
    /// ### 中文
    /// sRGB 颜色格式是否为核心特性（桌面 GL 2.1+/3.0，GLES 3.0+）。
    pub fn supports_srgb(&self) -> bool {
        if self.is_gles {
            self.major >= 3
        } else {
            self.major >= 3 || (self.major == 2 && self.minor >= 1)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::GlVersion;

    #[test]
    fn parses_desktop_and_es_versions() {
        let desktop = GlVersion::parse("4.6.0 NVIDIA 551.23");
        assert_eq!((desktop.major, desktop.minor, desktop.is_gles), (4, 6, false));
        assert!(desktop.supports_srgb());

        let es = GlVersion::parse("OpenGL ES 3.2 Mesa 23.0");
        assert_eq!((es.major, es.minor, es.is_gles), (3, 2, true));

        let old_es = GlVersion::parse("OpenGL ES 2.0");
        assert!(!old_es.supports_srgb());
    }

    #[test]
    fn garbage_version_is_zero() {
        let version = GlVersion::parse("unknown");
        assert_eq!((version.major, version.minor), (0, 0));
    }
}
