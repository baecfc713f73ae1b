//! ### English
//! Save/restore of the ambient GL state the host renderer may depend on.
//!
//! The host toolkit shares the object namespace with our contexts, so anything we bind while
//! allocating or drawing must be put back before control returns to it.
//!
//! ### 中文
//! 保存/恢复宿主渲染器可能依赖的环境 GL 状态。
//!
//! 宿主工具包与我们的上下文共享对象命名空间，因此在分配或绘制期间绑定的任何对象，
//! 都必须在控制权交还之前恢复。

use super::GlApi;

/// ### English
/// Snapshot of framebuffer/renderbuffer/texture bindings, viewport, scissor box, and
/// depth/stencil/scissor test enables. Restored on drop.
///
/// ### 中文
/// framebuffer/renderbuffer/纹理绑定、视口、裁剪框以及深度/模板/裁剪测试开关的快照。
/// Drop 时恢复。
pub struct AmbientState<'a> {
    gl: &'a dyn GlApi,
    read_framebuffer: u32,
    draw_framebuffer: u32,
    renderbuffer: u32,
    texture_2d: u32,
    viewport: [i32; 4],
    scissor_box: [i32; 4],
    depth_test: bool,
    stencil_test: bool,
    scissor_test: bool,
}

impl<'a> AmbientState<'a> {
    /// ### English
    /// Captures the state of the context current on the calling thread.
    ///
    /// ### 中文
    /// 捕获调用线程上 current 上下文的状态。
    pub fn capture(gl: &'a dyn GlApi) -> Self {
        let mut viewport = [0; 4];
        gl.get_integer_v(glow::VIEWPORT, &mut viewport);
        let mut scissor_box = [0; 4];
        gl.get_integer_v(glow::SCISSOR_BOX, &mut scissor_box);

        Self {
            gl,
            read_framebuffer: gl.get_integer(glow::READ_FRAMEBUFFER_BINDING) as u32,
            draw_framebuffer: gl.get_integer(glow::DRAW_FRAMEBUFFER_BINDING) as u32,
            renderbuffer: gl.get_integer(glow::RENDERBUFFER_BINDING) as u32,
            texture_2d: gl.get_integer(glow::TEXTURE_BINDING_2D) as u32,
            viewport,
            scissor_box,
            depth_test: gl.is_enabled(glow::DEPTH_TEST),
            stencil_test: gl.is_enabled(glow::STENCIL_TEST),
            scissor_test: gl.is_enabled(glow::SCISSOR_TEST),
        }
    }

    fn restore(&self) {
        let gl = self.gl;
        gl.bind_framebuffer(glow::READ_FRAMEBUFFER, self.read_framebuffer);
        gl.bind_framebuffer(glow::DRAW_FRAMEBUFFER, self.draw_framebuffer);
        gl.bind_renderbuffer(self.renderbuffer);
        gl.bind_texture(glow::TEXTURE_2D, self.texture_2d);
        let [x, y, w, h] = self.viewport;
        gl.viewport(x, y, w, h);
        let [x, y, w, h] = self.scissor_box;
        gl.scissor(x, y, w, h);
        gl.set_enabled(glow::DEPTH_TEST, self.depth_test);
        gl.set_enabled(glow::STENCIL_TEST, self.stencil_test);
        gl.set_enabled(glow::SCISSOR_TEST, self.scissor_test);
    }
}

impl Drop for AmbientState<'_> {
    fn drop(&mut self) {
        self.restore();
    }
}
