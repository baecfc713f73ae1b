//! ### English
//! `xian_gl_surface` crate root.
//! Off-thread OpenGL rendering into a pool of framebuffers, presented on a host context through
//! FIFO or mailbox swap chains. Core implementation lives under `engine`.
//!
//! ### 中文
//! `xian_gl_surface` 的 crate 根。
//! 在独立线程上向 framebuffer 池进行 OpenGL 渲染，并通过 FIFO 或 mailbox 交换链在宿主上下文上呈现。
//! 核心实现位于 `engine` 模块。
mod engine;

pub use engine::config::{
    DEFAULT_SWAP_CHAIN_CAPACITY, FramebufferFormat, MIN_SWAP_CHAIN_CAPACITY, PRESENT_MODE_ENV,
    ParsePresentModeError, PresentMode, SWAP_CHAIN_SIZE_ENV, SamplingParams, SurfaceConfig,
    SwapChainConfig,
};
pub use engine::context::{
    BackendKind, CONTEXT_BACKEND_ENV, Capabilities, ContextProvider, CurrentContextAdapter,
    GlContext, HostContextAdapter, HostWindow, NativeBackend, backend_override, detect_backend,
    glfw, platform_order,
};
pub use engine::error::{
    ContextError, ContextResult, DrawError, GlError, GlResult, PoolError, PoolResult,
};
pub use engine::gl::{AmbientState, GlApi, GlVersion, GlowApi, SharedGl, check_gl_error};
#[cfg(feature = "headless")]
pub use engine::headless;
pub use engine::objects::{
    DestroyFlag, Framebuffer, FramebufferLease, FramebufferRole, Surface, SurfaceKind,
    texture_binding_for,
};
pub use engine::pool::{
    DEFAULT_REDRAW_AFTER, DisplayScope, DrawScope, FramebufferPool, Redraw, RenderOutcome,
};
pub use engine::size::{AtomicSize, is_empty};
pub use engine::surface::{
    DurationStats, GlSurface, Percentile, RateStats, RedrawRequester, RollingWindowStatistics,
    Sample, Stats,
};
pub use engine::swap_chain::{FifoSwapChain, FramebufferFactory, MailboxSwapChain, SwapChain};
