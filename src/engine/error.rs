//! ### English
//! Error types shared by the GL object model, the context registry, and the framebuffer pool.
//!
//! ### 中文
//! GL 对象模型、上下文注册表与 framebuffer 池共用的错误类型。

use std::error::Error as StdError;

use dpi::PhysicalSize;

/// ### English
/// Boxed error returned by user draw callbacks.
///
/// ### 中文
/// 用户绘制回调返回的装箱错误。
pub type DrawError = Box<dyn StdError + Send + Sync + 'static>;

/// ### English
/// Native GL failures raised while creating, binding, or destroying GPU objects.
///
/// ### 中文
/// 创建、绑定或销毁 GPU 对象时产生的原生 GL 错误。
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GlError {
    #[error("{operation} failed with GL error 0x{code:04X}")]
    Call { operation: &'static str, code: u32 },
    #[error("failed to allocate {kind}: {reason}")]
    Allocation { kind: &'static str, reason: String },
    #[error("Framebuffer is not complete: 0x{status:04X}")]
    IncompleteFramebuffer { status: u32 },
    #[error(
        "attachment sizes differ: color {}x{}, depth/stencil {}x{}",
        .color.width,
        .color.height,
        .depth_stencil.width,
        .depth_stencil.height
    )]
    AttachmentSizeMismatch {
        color: PhysicalSize<u32>,
        depth_stencil: PhysicalSize<u32>,
    },
    #[error("texture target 0x{target:04X} is not supported")]
    UnsupportedTextureTarget { target: u32 },
    #[error("{kind} {id} is already destroyed")]
    Destroyed { kind: &'static str, id: u32 },
    #[error("framebuffer {id} is already leased for {held_by}")]
    FramebufferInUse { id: u32, held_by: &'static str },
}

/// ### English
/// Failures reported by a native context backend or the context registry.
///
/// ### 中文
/// 原生上下文后端或上下文注册表报告的错误。
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ContextError {
    #[error("[{backend}] failed to make context current: {reason}")]
    MakeCurrent { backend: &'static str, reason: String },
    #[error("[{backend}] failed to release the current context: {reason}")]
    Release { backend: &'static str, reason: String },
    #[error("[{backend}] failed to create offscreen context: {reason}")]
    Creation { backend: &'static str, reason: String },
    #[error("[{backend}] failed to load GL capabilities: {reason}")]
    CapabilityLoad { backend: &'static str, reason: String },
    #[error("[{backend}] failed to destroy context: {reason}")]
    Destruction { backend: &'static str, reason: String },
    #[error("context backend `{0}` is not available")]
    Unsupported(String),
    #[error("context wrapper was already destroyed")]
    Destroyed,
}

/// ### English
/// Errors surfaced by the framebuffer pool and the render loop.
///
/// ### 中文
/// framebuffer 池与渲染循环对外暴露的错误。
#[derive(Debug, thiserror::Error)]
pub enum PoolError {
    #[error(transparent)]
    Gl(#[from] GlError),
    #[error(transparent)]
    Context(#[from] ContextError),
    #[error("draw callback failed: {0}")]
    Draw(#[source] DrawError),
    #[error("framebuffer pool is not initialized")]
    NotInitialized,
    #[error("framebuffer pool is destroyed")]
    Destroyed,
    #[error("swap chain capacity must be at least {minimum}, got {requested}")]
    InvalidCapacity { requested: usize, minimum: usize },
    #[error("failed to spawn render thread: {0}")]
    ThreadSpawn(#[source] std::io::Error),
    #[error("render thread panicked")]
    RenderThreadPanicked,
}

/// ### English
/// Result alias for GL object operations.
///
/// ### 中文
/// GL 对象操作的 Result 别名。
pub type GlResult<T> = Result<T, GlError>;

/// ### English
/// Result alias for context operations.
///
/// ### 中文
/// 上下文操作的 Result 别名。
pub type ContextResult<T> = Result<T, ContextError>;

/// ### English
/// Result alias for pool and render-loop operations.
///
/// ### 中文
/// 池与渲染循环操作的 Result 别名。
pub type PoolResult<T> = Result<T, PoolError>;
