//! ### English
//! Backend-agnostic GPU context layer.
//!
//! A [`NativeBackend`] implements only the native calls. The reference-counted capability
//! registry ([`ContextProvider`]) and the logical wrapper ([`GlContext`]) are written once on top
//! of it.
//!
//! ### 中文
//! 与后端无关的 GPU 上下文层。
//!
//! [`NativeBackend`] 只实现原生调用。引用计数的能力注册表（[`ContextProvider`]）与逻辑封装
//! （[`GlContext`]）在其之上只实现一次。

mod detect;
pub mod glfw;
mod handle;
mod host;
mod provider;

pub use detect::{BackendKind, CONTEXT_BACKEND_ENV, backend_override, detect_backend, platform_order};
pub use handle::GlContext;
pub use host::{CurrentContextAdapter, HostContextAdapter, HostWindow};
pub use provider::ContextProvider;

use std::fmt;
use std::hash::Hash;

use super::error::ContextResult;
use super::gl::{GlApi, GlVersion, SharedGl};

/// ### English
/// Native context operations of one platform backend.
///
/// ### 中文
/// 某个平台后端的原生上下文操作。
pub trait NativeBackend: Send + Sync + 'static {
    /// ### English
    /// Native context identity; equal handles name the same native context.
    ///
    /// ### 中文
    /// 原生上下文标识；相等的句柄表示同一个原生上下文。
    type Handle: Copy + Eq + Hash + fmt::Debug + Send + Sync + 'static;

    fn name(&self) -> &'static str;

    /// ### English
    /// Context current on the calling thread, if any.
    ///
    /// ### 中文
    /// 调用线程上的 current 上下文（如有）。
    fn current(&self) -> Option<Self::Handle>;

    fn make_current(&self, handle: Self::Handle) -> ContextResult<()>;

    fn release_current(&self) -> ContextResult<()>;

    /// ### English
    /// Loads the GL function table. `handle` is current on the calling thread.
    ///
    /// ### 中文
    /// 加载 GL 函数表。调用时 `handle` 已在调用线程上 current。
    fn load_gl(&self, handle: Self::Handle) -> ContextResult<SharedGl>;

    /// ### English
    /// Creates a context sharing the object namespace of `parent`.
    ///
    /// ### 中文
    /// 创建一个与 `parent` 共享对象命名空间的上下文。
    fn create_offscreen(&self, parent: Self::Handle) -> ContextResult<Self::Handle>;

    fn destroy(&self, handle: Self::Handle) -> ContextResult<()>;
}

/// ### English
/// Resolved capability set of one native context, shared by all wrappers of that context.
///
/// ### 中文
/// 某个原生上下文解析后的能力集，由该上下文的所有封装共享。
pub struct Capabilities {
    gl: SharedGl,
    version: GlVersion,
}

impl Capabilities {
    pub(crate) fn resolve(gl: SharedGl) -> Self {
        let version = GlVersion::parse(&gl.version_string());
        Self { gl, version }
    }

    #[inline]
    pub fn gl(&self) -> &dyn GlApi {
        &*self.gl
    }

    #[inline]
    pub fn shared_gl(&self) -> SharedGl {
        self.gl.clone()
    }

    #[inline]
    pub fn version(&self) -> &GlVersion {
        &self.version
    }
}

impl fmt::Debug for Capabilities {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Capabilities")
            .field("version", &self.version)
            .finish_non_exhaustive()
    }
}
