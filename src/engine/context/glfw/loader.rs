//! ### English
//! GLFW symbol table supplied by the embedder (e.g. LWJGL) instead of dynamic library lookup.
//!
//! ### 中文
//! 由宿主（例如 LWJGL）提供的 GLFW 符号表，不做动态库按名查找。

use std::ffi::{CStr, c_char, c_int, c_void};
use std::sync::OnceLock;

use super::EmbedderGlfwApi;
use crate::engine::error::{ContextError, ContextResult};

/// ### English
/// Opaque GLFW window type (`GLFWwindow`).
///
/// ### 中文
/// 不透明 GLFW window 类型（`GLFWwindow`）。
#[repr(C)]
pub struct GLFWwindow {
    _private: [u8; 0],
}

/// ### English
/// Opaque GLFW monitor type (`GLFWmonitor`).
///
/// ### 中文
/// 不透明 GLFW monitor 类型（`GLFWmonitor`）。
#[repr(C)]
pub struct GLFWmonitor {
    _private: [u8; 0],
}

type GLFWglproc = *const c_void;
type GlfwGetProcAddress = unsafe extern "C" fn(*const c_char) -> GLFWglproc;
type GlfwMakeContextCurrent = unsafe extern "C" fn(*mut GLFWwindow);
type GlfwGetCurrentContext = unsafe extern "C" fn() -> *mut GLFWwindow;
type GlfwDefaultWindowHints = unsafe extern "C" fn();
type GlfwWindowHint = unsafe extern "C" fn(c_int, c_int);
type GlfwGetWindowAttrib = unsafe extern "C" fn(*mut GLFWwindow, c_int) -> c_int;
type GlfwCreateWindow = unsafe extern "C" fn(
    c_int,
    c_int,
    *const c_char,
    *mut GLFWmonitor,
    *mut GLFWwindow,
) -> *mut GLFWwindow;
type GlfwDestroyWindow = unsafe extern "C" fn(*mut GLFWwindow);

static EMBEDDER_GLFW_API: OnceLock<GlfwApi> = OnceLock::new();

fn require(address: usize, symbol: &str) -> ContextResult<()> {
    if address == 0 {
        return Err(ContextError::Unsupported(format!(
            "EmbedderGlfwApi.{symbol} is NULL"
        )));
    }
    Ok(())
}

/// ### English
/// One-time installation of the embedder table; repeated calls fail.
///
/// ### 中文
/// 一次性安装宿主函数表；重复调用会失败。
pub(super) fn install(api: EmbedderGlfwApi) -> ContextResult<()> {
    require(api.glfw_get_proc_address, "glfw_get_proc_address")?;
    require(api.glfw_make_context_current, "glfw_make_context_current")?;
    require(api.glfw_get_current_context, "glfw_get_current_context")?;
    require(api.glfw_default_window_hints, "glfw_default_window_hints")?;
    require(api.glfw_window_hint, "glfw_window_hint")?;
    require(api.glfw_get_window_attrib, "glfw_get_window_attrib")?;
    require(api.glfw_create_window, "glfw_create_window")?;
    require(api.glfw_destroy_window, "glfw_destroy_window")?;

    /* ### English
    Addresses were checked non-zero above; the embedder guarantees the signatures.
    ### 中文
    上面已检查地址非 0；函数签名由宿主保证。 */
    let table = unsafe {
        GlfwApi {
            get_proc_address: std::mem::transmute::<usize, GlfwGetProcAddress>(
                api.glfw_get_proc_address,
            ),
            make_context_current: std::mem::transmute::<usize, GlfwMakeContextCurrent>(
                api.glfw_make_context_current,
            ),
            get_current_context: std::mem::transmute::<usize, GlfwGetCurrentContext>(
                api.glfw_get_current_context,
            ),
            default_window_hints: std::mem::transmute::<usize, GlfwDefaultWindowHints>(
                api.glfw_default_window_hints,
            ),
            window_hint: std::mem::transmute::<usize, GlfwWindowHint>(api.glfw_window_hint),
            get_window_attrib: std::mem::transmute::<usize, GlfwGetWindowAttrib>(
                api.glfw_get_window_attrib,
            ),
            create_window: std::mem::transmute::<usize, GlfwCreateWindow>(api.glfw_create_window),
            destroy_window: std::mem::transmute::<usize, GlfwDestroyWindow>(
                api.glfw_destroy_window,
            ),
        }
    };

    EMBEDDER_GLFW_API.set(table).map_err(|_| {
        ContextError::Unsupported("embedder GLFW API is already installed".to_string())
    })
}

/// ### English
/// Loaded minimal GLFW API (context control, proc loading, offscreen window creation).
///
/// ### 中文
/// 已加载的最小 GLFW API（上下文控制、函数指针加载、离屏 window 创建）。
#[derive(Clone, Copy)]
pub(super) struct GlfwApi {
    get_proc_address: GlfwGetProcAddress,
    make_context_current: GlfwMakeContextCurrent,
    get_current_context: GlfwGetCurrentContext,
    default_window_hints: GlfwDefaultWindowHints,
    window_hint: GlfwWindowHint,
    get_window_attrib: GlfwGetWindowAttrib,
    create_window: GlfwCreateWindow,
    destroy_window: GlfwDestroyWindow,
}

impl GlfwApi {
    #[inline]
    pub(super) fn load() -> ContextResult<Self> {
        EMBEDDER_GLFW_API.get().copied().ok_or_else(|| {
            ContextError::Unsupported(
                "embedder GLFW API is not installed; call install_embedder_glfw_api first"
                    .to_string(),
            )
        })
    }

    #[inline]
    pub(super) unsafe fn make_current(&self, window: *mut GLFWwindow) {
        unsafe { (self.make_context_current)(window) };
    }

    #[inline]
    pub(super) unsafe fn current(&self) -> *mut GLFWwindow {
        unsafe { (self.get_current_context)() }
    }

    #[inline]
    pub(super) unsafe fn get_proc_address(&self, name: &CStr) -> *const c_void {
        unsafe { (self.get_proc_address)(name.as_ptr()) }
    }

    #[inline]
    pub(super) unsafe fn destroy_window(&self, window: *mut GLFWwindow) {
        unsafe { (self.destroy_window)(window) };
    }

    /// ### English
    /// Creates an invisible 1x1 window whose context shares objects with `share`, copying the
    /// client API, version, profile, and creation API of the shared window.
    ///
    /// ### 中文
    /// 创建一个不可见的 1x1 window，其上下文与 `share` 共享对象，并复制共享 window 的
    /// 客户端 API、版本、profile 与创建 API。
    pub(super) unsafe fn create_shared_offscreen_window(
        &self,
        share: *mut GLFWwindow,
    ) -> Result<*mut GLFWwindow, String> {
        const GLFW_FALSE: c_int = 0;

        const GLFW_VISIBLE: c_int = 0x0002_0004;
        const GLFW_FOCUSED: c_int = 0x0002_0001;
        const GLFW_RESIZABLE: c_int = 0x0002_0003;

        const GLFW_CLIENT_API: c_int = 0x0002_2001;
        const GLFW_CONTEXT_VERSION_MAJOR: c_int = 0x0002_2002;
        const GLFW_CONTEXT_VERSION_MINOR: c_int = 0x0002_2003;
        const GLFW_OPENGL_FORWARD_COMPAT: c_int = 0x0002_2006;
        const GLFW_OPENGL_DEBUG_CONTEXT: c_int = 0x0002_2007;
        const GLFW_OPENGL_PROFILE: c_int = 0x0002_2008;
        const GLFW_CONTEXT_CREATION_API: c_int = 0x0002_200B;

        let attrib = |attribute| unsafe { (self.get_window_attrib)(share, attribute) };
        let client_api = attrib(GLFW_CLIENT_API);
        let major = attrib(GLFW_CONTEXT_VERSION_MAJOR);
        let minor = attrib(GLFW_CONTEXT_VERSION_MINOR);
        let profile = attrib(GLFW_OPENGL_PROFILE);
        let forward = attrib(GLFW_OPENGL_FORWARD_COMPAT);
        let debug = attrib(GLFW_OPENGL_DEBUG_CONTEXT);
        let creation_api = attrib(GLFW_CONTEXT_CREATION_API);

        let hint = |name, value| unsafe { (self.window_hint)(name, value) };
        unsafe { (self.default_window_hints)() };
        hint(GLFW_VISIBLE, GLFW_FALSE);
        hint(GLFW_FOCUSED, GLFW_FALSE);
        hint(GLFW_RESIZABLE, GLFW_FALSE);
        if client_api != 0 {
            hint(GLFW_CLIENT_API, client_api);
        }
        if major > 0 {
            hint(GLFW_CONTEXT_VERSION_MAJOR, major);
        }
        if minor > 0 {
            hint(GLFW_CONTEXT_VERSION_MINOR, minor);
        }
        if profile != 0 {
            hint(GLFW_OPENGL_PROFILE, profile);
        }
        hint(GLFW_OPENGL_FORWARD_COMPAT, forward);
        hint(GLFW_OPENGL_DEBUG_CONTEXT, debug);
        if creation_api != 0 {
            hint(GLFW_CONTEXT_CREATION_API, creation_api);
        }

        let title = c"xian_gl_surface-offscreen";
        let window =
            unsafe { (self.create_window)(1, 1, title.as_ptr(), std::ptr::null_mut(), share) };
        unsafe { (self.default_window_hints)() };

        if window.is_null() {
            return Err(
                "glfwCreateWindow failed; ensure the shared window's context is valid".to_string(),
            );
        }
        Ok(window)
    }
}
