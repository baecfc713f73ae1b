//! ### English
//! Boundary to the host toolkit: "which context does the host renderer have bound for this window".
//!
//! One adapter implementation exists per supported host toolkit version; the embedder picks one
//! explicitly at startup.
//!
//! ### 中文
//! 与宿主工具包的边界：“宿主渲染器为该窗口绑定了哪个上下文”。
//!
//! 每个受支持的宿主工具包版本对应一个适配器实现；由宿主在启动时显式选择。

use super::NativeBackend;

/// ### English
/// Opaque native window handle supplied by the host (e.g. a `GLFWwindow*` address).
///
/// ### 中文
/// 宿主提供的不透明原生窗口句柄（例如 `GLFWwindow*` 地址）。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct HostWindow(pub usize);

/// ### English
/// Versioned adapter resolving the host renderer's context for a window.
///
/// ### 中文
/// 为窗口解析宿主渲染器上下文的版本化适配器。
pub trait HostContextAdapter<B: NativeBackend>: Send + Sync {
    /// ### English
    /// Identifier of the host toolkit version this adapter understands.
    ///
    /// ### 中文
    /// 该适配器所支持的宿主工具包版本标识。
    fn host_version(&self) -> &str;

    fn bound_context(&self, backend: &B, window: HostWindow) -> Option<B::Handle>;
}

/// ### English
/// Adapter for hosts that keep their context current on the calling (UI) thread.
///
/// ### 中文
/// 适用于在调用（UI）线程上保持其上下文为 current 的宿主的适配器。
#[derive(Debug, Clone, Copy, Default)]
pub struct CurrentContextAdapter;

impl<B: NativeBackend> HostContextAdapter<B> for CurrentContextAdapter {
    fn host_version(&self) -> &str {
        "current-thread"
    }

    fn bound_context(&self, backend: &B, _window: HostWindow) -> Option<B::Handle> {
        backend.current()
    }
}
