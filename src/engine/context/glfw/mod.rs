//! ### English
//! GLFW context backend: each native context is a GLFW window, offscreen children are invisible
//! 1x1 windows sharing the parent's objects.
//!
//! ### 中文
//! GLFW 上下文后端：每个原生上下文是一个 GLFW window，离屏子上下文是与父上下文共享对象的
//! 不可见 1x1 window。

mod loader;

use std::ffi::CString;
use std::sync::Arc;

use loader::{GLFWwindow, GlfwApi};

use super::{HostContextAdapter, HostWindow, NativeBackend};
use crate::engine::error::{ContextError, ContextResult};
use crate::engine::gl::{GlowApi, SharedGl};

/// ### English
/// Function pointer table for GLFW symbols provided by the embedder (e.g., Java/LWJGL).
///
/// All fields are raw addresses (`usize`) and must be non-zero when installing.
///
/// ### 中文
/// 由宿主（例如 Java/LWJGL）提供的 GLFW 符号函数指针表。
///
/// 所有字段都是原始地址（`usize`），安装时必须全部为非 0。
#[repr(C)]
#[derive(Debug, Clone, Copy, Default)]
pub struct EmbedderGlfwApi {
    pub glfw_get_proc_address: usize,
    pub glfw_make_context_current: usize,
    pub glfw_get_current_context: usize,
    pub glfw_default_window_hints: usize,
    pub glfw_window_hint: usize,
    pub glfw_get_window_attrib: usize,
    pub glfw_create_window: usize,
    pub glfw_destroy_window: usize,
}

/// ### English
/// Installs the embedder-provided GLFW function table. Must run before any GLFW backend is loaded.
///
/// ### 中文
/// 安装由宿主提供的 GLFW 函数表。必须在加载任何 GLFW 后端之前调用。
pub fn install_embedder_glfw_api(api: EmbedderGlfwApi) -> ContextResult<()> {
    loader::install(api)
}

/// ### English
/// A GLFW window address used as context identity.
///
/// ### 中文
/// 作为上下文标识的 GLFW window 地址。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct GlfwWindow(pub usize);

impl GlfwWindow {
    #[inline]
    fn as_ptr(self) -> *mut GLFWwindow {
        self.0 as *mut GLFWwindow
    }
}

pub struct GlfwBackend {
    api: GlfwApi,
}

impl GlfwBackend {
    /// ### English
    /// Loads the installed embedder table.
    ///
    /// ### 中文
    /// 加载已安装的宿主函数表。
    pub fn load() -> ContextResult<Self> {
        Ok(Self {
            api: GlfwApi::load()?,
        })
    }

    /// ### English
    /// Whether the table is installed and a GLFW context is current on this thread.
    ///
    /// ### 中文
    /// 函数表是否已安装，且当前线程上存在 current 的 GLFW 上下文。
    pub fn probe() -> bool {
        Self::load().is_ok_and(|backend| backend.current().is_some())
    }
}

impl NativeBackend for GlfwBackend {
    type Handle = GlfwWindow;

    fn name(&self) -> &'static str {
        "glfw"
    }

    fn current(&self) -> Option<GlfwWindow> {
        let window = unsafe { self.api.current() };
        (!window.is_null()).then(|| GlfwWindow(window as usize))
    }

    fn make_current(&self, handle: GlfwWindow) -> ContextResult<()> {
        if handle.0 == 0 {
            return Err(ContextError::MakeCurrent {
                backend: self.name(),
                reason: "window handle is NULL".to_string(),
            });
        }
        unsafe { self.api.make_current(handle.as_ptr()) };
        Ok(())
    }

    fn release_current(&self) -> ContextResult<()> {
        unsafe { self.api.make_current(std::ptr::null_mut()) };
        Ok(())
    }

    fn load_gl(&self, _handle: GlfwWindow) -> ContextResult<SharedGl> {
        let api = self.api;
        let glow = unsafe {
            glow::Context::from_loader_function(|name| match CString::new(name) {
                Ok(name) => api.get_proc_address(&name),
                Err(_) => std::ptr::null(),
            })
        };
        Ok(Arc::new(GlowApi::new(glow)))
    }

    fn create_offscreen(&self, parent: GlfwWindow) -> ContextResult<GlfwWindow> {
        let window = unsafe { self.api.create_shared_offscreen_window(parent.as_ptr()) }.map_err(
            |reason| ContextError::Creation {
                backend: self.name(),
                reason,
            },
        )?;
        Ok(GlfwWindow(window as usize))
    }

    fn destroy(&self, handle: GlfwWindow) -> ContextResult<()> {
        unsafe { self.api.destroy_window(handle.as_ptr()) };
        Ok(())
    }
}

/// ### English
/// Host adapter for GLFW hosts: the window handle is the context identity.
///
/// ### 中文
/// GLFW 宿主适配器：window 句柄即为上下文标识。
#[derive(Debug, Clone, Copy, Default)]
pub struct GlfwWindowAdapter;

impl HostContextAdapter<GlfwBackend> for GlfwWindowAdapter {
    fn host_version(&self) -> &str {
        "glfw-3"
    }

    fn bound_context(&self, _backend: &GlfwBackend, window: HostWindow) -> Option<GlfwWindow> {
        (window.0 != 0).then_some(GlfwWindow(window.0))
    }
}
