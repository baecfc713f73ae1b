//! ### English
//! Framebuffer pool: owns the swap chain and switches between the render and display contexts.
//!
//! ### 中文
//! framebuffer 池：持有交换链，并在渲染与显示上下文之间切换。

mod scope;

pub use scope::{DisplayScope, DrawScope, Redraw, RenderOutcome};

use std::sync::atomic::{AtomicU8, Ordering};
use std::time::Duration;

use dpi::PhysicalSize;

use super::config::SwapChainConfig;
use super::context::{GlContext, NativeBackend};
use super::error::{DrawError, PoolError};
use super::gl::{AmbientState, GlApi};
use super::size::{AtomicSize, is_empty};
use super::swap_chain::SwapChain;

const STATE_UNINITIALIZED: u8 = 0;
const STATE_INITIALIZED: u8 = 1;
const STATE_DESTROYED: u8 = 2;

/// ### English
/// Default redraw delay (60 Hz).
///
/// ### 中文
/// 默认重绘间隔（60 Hz）。
pub const DEFAULT_REDRAW_AFTER: Duration = Duration::from_nanos(1_000_000_000 / 60);

/// ### English
/// Produces frames on a render context and presents them on a display context.
///
/// Lifecycle: `Uninitialized -> Initialized -> Destroyed`. Every entry point saves the context
/// current on the calling thread and restores it before returning.
///
/// ### 中文
/// 在渲染上下文上生产帧，并在显示上下文上呈现。
///
/// 生命周期：`Uninitialized -> Initialized -> Destroyed`。每个入口都会保存调用线程上的
/// current 上下文，并在返回前恢复。
pub struct FramebufferPool<B: NativeBackend> {
    render_context: GlContext<B>,
    display_context: GlContext<B>,
    size: AtomicSize,
    swap_chain: SwapChain,
    state: AtomicU8,
    default_redraw: Duration,
}

impl<B: NativeBackend> FramebufferPool<B> {
    /// ### English
    /// Creates an uninitialized pool.
    ///
    /// #### Parameters
    /// - `render_context`: Context the producer draws with (usually an offscreen child).
    /// - `display_context`: Context the consumer presents with (shares objects with the render one).
    /// - `size`: Initial framebuffer size.
    /// - `config`: Present mode, capacity, and attachment formats.
    ///
    /// ### 中文
    /// 创建一个未初始化的池。
    ///
    /// #### 参数
    /// - `render_context`：生产者绘制所用的上下文（通常为离屏子上下文）。
    /// - `display_context`：消费者呈现所用的上下文（与渲染上下文共享对象）。
    /// - `size`：初始 framebuffer 尺寸。
    /// - `config`：呈现模式、容量与附件格式。
    pub fn new(
        render_context: GlContext<B>,
        display_context: GlContext<B>,
        size: PhysicalSize<u32>,
        config: &SwapChainConfig,
    ) -> Result<Self, PoolError> {
        Ok(Self {
            render_context,
            display_context,
            size: AtomicSize::new(size),
            swap_chain: SwapChain::new(config)?,
            state: AtomicU8::new(STATE_UNINITIALIZED),
            default_redraw: DEFAULT_REDRAW_AFTER,
        })
    }

    /// ### English
    /// Sets the redraw delay used when a draw callback does not request one.
    ///
    /// ### 中文
    /// 设置绘制回调未指定时使用的重绘间隔。
    #[inline]
    pub fn with_default_redraw(mut self, delay: Duration) -> Self {
        self.default_redraw = delay;
        self
    }

    #[inline]
    pub fn render_context(&self) -> &GlContext<B> {
        &self.render_context
    }

    #[inline]
    pub fn display_context(&self) -> &GlContext<B> {
        &self.display_context
    }

    #[inline]
    pub fn swap_chain(&self) -> &SwapChain {
        &self.swap_chain
    }

    /// ### English
    /// Target size; the swap chain catches up on the next render.
    ///
    /// ### 中文
    /// 目标尺寸；交换链会在下一次渲染时跟进。
    #[inline]
    pub fn size(&self) -> PhysicalSize<u32> {
        self.size.load()
    }

    #[inline]
    pub fn is_initialized(&self) -> bool {
        self.state.load(Ordering::Acquire) == STATE_INITIALIZED
    }

    #[inline]
    pub fn is_destroyed(&self) -> bool {
        self.state.load(Ordering::Acquire) == STATE_DESTROYED
    }

    fn ensure_initialized(&self) -> Result<(), PoolError> {
        match self.state.load(Ordering::Acquire) {
            STATE_INITIALIZED => Ok(()),
            STATE_DESTROYED => Err(PoolError::Destroyed),
            _ => Err(PoolError::NotInitialized),
        }
    }

    /// ### English
    /// Records a new target size. Returns `false` when unchanged or empty (an empty size is
    /// ignored and the previous frames stay valid).
    ///
    /// ### 中文
    /// 记录新的目标尺寸。未变化或为空时返回 `false`（空尺寸会被忽略，之前的帧仍然有效）。
    pub fn resize(&self, size: PhysicalSize<u32>) -> bool {
        if is_empty(size) {
            log::debug!("ignoring empty pool size {}x{}", size.width, size.height);
            return false;
        }
        self.size.replace(size)
    }

    /// ### English
    /// Runs `f` with `context` current, then restores whatever was current before.
    ///
    /// ### 中文
    /// 在 `context` 为 current 的情况下执行 `f`，随后恢复之前的 current 上下文。
    fn with_context<R>(
        &self,
        context: &GlContext<B>,
        f: impl FnOnce(&dyn GlApi) -> Result<R, PoolError>,
    ) -> Result<R, PoolError> {
        let provider = context.provider();
        let previous = provider.current_handle();
        let switched = previous != Some(context.handle());
        if switched {
            context.make_current()?;
        }

        let result = f(context.gl());

        if switched {
            if let Err(err) = provider.restore_previous(previous) {
                if result.is_ok() {
                    return Err(err.into());
                }
                log::warn!("failed to restore previous context: {err}");
            }
        }
        result
    }

    /// ### English
    /// Allocates the swap chain at the current size on the render context.
    ///
    /// ### 中文
    /// 在渲染上下文上按当前尺寸分配交换链。
    pub fn initialize(&self) -> Result<(), PoolError> {
        match self.state.load(Ordering::Acquire) {
            STATE_INITIALIZED => return Ok(()),
            STATE_DESTROYED => return Err(PoolError::Destroyed),
            _ => {}
        }
        let size = self.size.load();
        self.with_context(&self.render_context, |gl| self.swap_chain.resize(gl, size))?;
        self.state
            .compare_exchange(
                STATE_UNINITIALIZED,
                STATE_INITIALIZED,
                Ordering::AcqRel,
                Ordering::Acquire,
            )
            .map_err(|_| PoolError::Destroyed)?;
        log::debug!(
            "framebuffer pool initialized: {} x{} at {}x{}",
            self.swap_chain.present_mode(),
            self.swap_chain.capacity(),
            size.width,
            size.height
        );
        Ok(())
    }

    /// ### English
    /// Draws one frame on the render context.
    ///
    /// Resizes the swap chain first if the target size changed, binds the next framebuffer,
    /// runs `draw`, waits for the GPU, and restores ambient GL state.
    ///
    /// #### Parameters
    /// - `delta_time`: Time since the previous frame.
    /// - `draw`: Issues the draw calls; may set the redraw delay or request termination.
    ///
    /// ### 中文
    /// 在渲染上下文上绘制一帧。
    ///
    /// 若目标尺寸变化则先调整交换链，绑定下一个 framebuffer，执行 `draw`，等待 GPU 完成，
    /// 并恢复环境 GL 状态。
    ///
    /// #### 参数
    /// - `delta_time`：距上一帧的时间。
    /// - `draw`：发出绘制调用；可设置重绘间隔或请求终止。
    pub fn render<F>(&self, delta_time: Duration, draw: F) -> Result<RenderOutcome, PoolError>
    where
        F: FnOnce(&mut DrawScope<'_>) -> Result<(), DrawError>,
    {
        self.ensure_initialized()?;
        self.with_context(&self.render_context, |gl| {
            let target = self.size.load();
            if target != self.swap_chain.size() {
                self.swap_chain.resize(gl, target)?;
            }

            let rendered = self.swap_chain.render(gl, |framebuffer| {
                let _ambient = AmbientState::capture(gl);
                framebuffer.bind(gl)?;
                let mut scope = DrawScope::new(framebuffer, gl, delta_time, self.default_redraw);
                let drawn = draw(&mut scope);
                gl.finish();
                framebuffer.unbind(gl);
                drawn.map_err(PoolError::Draw)?;
                Ok(scope.outcome())
            })?;

            Ok(rendered.unwrap_or(RenderOutcome::NoFramebufferAvailable))
        })
    }

    /// ### English
    /// Presents the current frame on the display context. Returns `Ok(None)` before the first
    /// frame is available.
    ///
    /// ### 中文
    /// 在显示上下文上呈现当前帧。第一帧可用之前返回 `Ok(None)`。
    pub fn display<R>(&self, f: impl FnOnce(&DisplayScope<'_>) -> R) -> Result<Option<R>, PoolError> {
        self.ensure_initialized()?;
        self.with_context(&self.display_context, |gl| {
            Ok(self
                .swap_chain
                .display(gl, |framebuffer| f(&DisplayScope::new(framebuffer, gl))))
        })
    }

    /// ### English
    /// Destroys every framebuffer on the render context. Later calls are no-ops.
    ///
    /// ### 中文
    /// 在渲染上下文上销毁所有 framebuffer。之后的调用为 no-op。
    pub fn destroy(&self) -> Result<(), PoolError> {
        let previous = self.state.swap(STATE_DESTROYED, Ordering::AcqRel);
        if previous == STATE_DESTROYED {
            log::trace!("framebuffer pool already destroyed");
            return Ok(());
        }
        self.with_context(&self.render_context, |gl| {
            self.swap_chain.destroy_all(gl);
            Ok(())
        })?;
        log::debug!("framebuffer pool destroyed");
        Ok(())
    }
}

impl<B: NativeBackend> Drop for FramebufferPool<B> {
    fn drop(&mut self) {
        if let Err(err) = self.destroy() {
            log::warn!("failed to destroy framebuffer pool on drop: {err}");
        }
    }
}
