//! ### English
//! Scopes handed to draw and display callbacks.
//!
//! ### 中文
//! 传给绘制与显示回调的作用域对象。

use std::time::Duration;

use dpi::PhysicalSize;

use crate::engine::gl::GlApi;
use crate::engine::objects::Framebuffer;

/// ### English
/// When the render loop should run the next frame.
///
/// ### 中文
/// 渲染循环何时运行下一帧。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Redraw {
    /// ### English
    /// After this delay (a hint, measured from the start of the frame), or earlier on request.
    ///
    /// ### 中文
    /// 在该延迟之后（提示值，从帧开始计时），或收到请求时提前。
    After(Duration),
    /// ### English
    /// Only when a redraw is explicitly requested.
    ///
    /// ### 中文
    /// 仅在显式请求重绘时。
    OnRequest,
}

/// ### English
/// Result of one [`FramebufferPool::render`](super::FramebufferPool::render) call.
///
/// ### 中文
/// 一次 [`FramebufferPool::render`](super::FramebufferPool::render) 调用的结果。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderOutcome {
    Rendered(Redraw),
    /// ### English
    /// Every framebuffer is in use; retry shortly. Not an error.
    ///
    /// ### 中文
    /// 所有 framebuffer 都在使用中；稍后重试。不是错误。
    NoFramebufferAvailable,
    /// ### English
    /// The draw callback asked the loop to stop.
    ///
    /// ### 中文
    /// 绘制回调请求停止循环。
    Terminated,
}

/// ### English
/// What a draw callback sees: the bound framebuffer, the render context's GL, and the frame delta.
///
/// ### 中文
/// 绘制回调可见的内容：已绑定的 framebuffer、渲染上下文的 GL 以及帧间隔。
pub struct DrawScope<'a> {
    framebuffer: &'a Framebuffer,
    gl: &'a dyn GlApi,
    delta_time: Duration,
    redraw: Redraw,
    terminate: bool,
}

impl<'a> DrawScope<'a> {
    pub(super) fn new(
        framebuffer: &'a Framebuffer,
        gl: &'a dyn GlApi,
        delta_time: Duration,
        default_redraw: Duration,
    ) -> Self {
        Self {
            framebuffer,
            gl,
            delta_time,
            redraw: Redraw::After(default_redraw),
            terminate: false,
        }
    }

    #[inline]
    pub fn framebuffer(&self) -> &Framebuffer {
        self.framebuffer
    }

    #[inline]
    pub fn gl(&self) -> &dyn GlApi {
        self.gl
    }

    #[inline]
    pub fn size(&self) -> PhysicalSize<u32> {
        self.framebuffer.size()
    }

    /// ### English
    /// Time elapsed since the previous frame started.
    ///
    /// ### 中文
    /// 距上一帧开始经过的时间。
    #[inline]
    pub fn delta_time(&self) -> Duration {
        self.delta_time
    }

    /// ### English
    /// Requests the next frame after `delay`; `None` waits for an explicit redraw request.
    ///
    /// ### 中文
    /// 请求在 `delay` 之后渲染下一帧；`None` 表示等待显式重绘请求。
    #[inline]
    pub fn redraw_after(&mut self, delay: Option<Duration>) {
        self.redraw = delay.map_or(Redraw::OnRequest, Redraw::After);
    }

    /// ### English
    /// Asks the render loop to stop after this frame.
    ///
    /// ### 中文
    /// 请求渲染循环在本帧之后停止。
    #[inline]
    pub fn terminate(&mut self) {
        self.terminate = true;
    }

    pub(super) fn outcome(&self) -> RenderOutcome {
        if self.terminate {
            RenderOutcome::Terminated
        } else {
            RenderOutcome::Rendered(self.redraw)
        }
    }
}

/// ### English
/// What a display callback sees: the framebuffer on screen and the display context's GL.
///
/// ### 中文
/// 显示回调可见的内容：正在显示的 framebuffer 以及显示上下文的 GL。
pub struct DisplayScope<'a> {
    framebuffer: &'a Framebuffer,
    gl: &'a dyn GlApi,
}

impl<'a> DisplayScope<'a> {
    pub(super) fn new(framebuffer: &'a Framebuffer, gl: &'a dyn GlApi) -> Self {
        Self { framebuffer, gl }
    }

    #[inline]
    pub fn framebuffer(&self) -> &Framebuffer {
        self.framebuffer
    }

    #[inline]
    pub fn gl(&self) -> &dyn GlApi {
        self.gl
    }

    #[inline]
    pub fn size(&self) -> PhysicalSize<u32> {
        self.framebuffer.size()
    }

    /// ### English
    /// Color texture name, for wrapping the frame as a compositor image.
    ///
    /// ### 中文
    /// 颜色纹理名，用于将该帧包装为合成器图像。
    #[inline]
    pub fn texture(&self) -> u32 {
        self.framebuffer.color_attachment().id()
    }
}
