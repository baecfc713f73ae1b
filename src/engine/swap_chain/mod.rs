//! ### English
//! Swap chains: bounded sets of framebuffers handed between one producer (render) and one
//! consumer (display).
//!
//! Both strategies share the render queue ([`RenderQueue`]): framebuffers ready to be drawn into,
//! all of the chain's current size. They differ in how finished frames reach the display side.
//!
//! ### 中文
//! 交换链：在一个生产者（渲染）与一个消费者（显示）之间传递的有界 framebuffer 集合。
//!
//! 两种策略共用渲染队列（[`RenderQueue`]）：可供绘制、且尺寸与交换链当前尺寸一致的
//! framebuffer。区别在于完成的帧如何到达显示侧。

mod fifo;
mod mailbox;

pub use fifo::FifoSwapChain;
pub use mailbox::MailboxSwapChain;

use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard, PoisonError};

use dpi::PhysicalSize;

use super::config::{FramebufferFormat, PresentMode, SwapChainConfig};
use super::error::{GlResult, PoolError};
use super::gl::{AmbientState, GlApi};
use super::objects::{Framebuffer, FramebufferRole, Surface};
use super::size::AtomicSize;

/// ### English
/// Locks `mutex`, recovering the data if a panicking callback poisoned it.
///
/// Queue contents stay consistent across a panic: framebuffers are only moved while locked.
///
/// ### 中文
/// 锁定 `mutex`；若 panic 的回调使其中毒，则恢复数据。
///
/// 队列内容在 panic 后仍保持一致：framebuffer 只在持锁期间移动。
#[inline]
pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// ### English
/// Allocates framebuffers (`color texture + depth/stencil renderbuffer`) without disturbing
/// ambient GL state.
///
/// ### 中文
/// 分配 framebuffer（颜色纹理 + 深度/模板 renderbuffer），且不扰动环境 GL 状态。
#[derive(Debug, Clone, Copy)]
pub struct FramebufferFactory {
    format: FramebufferFormat,
}

impl FramebufferFactory {
    #[inline]
    pub fn new(format: FramebufferFormat) -> Self {
        Self { format }
    }

    pub fn create(&self, gl: &dyn GlApi, size: PhysicalSize<u32>) -> GlResult<Framebuffer> {
        let _ambient = AmbientState::capture(gl);
        let color = Surface::create_texture(
            gl,
            self.format.color_target,
            size,
            self.format.color_internal_format,
            self.format.sampling,
        )?;
        let depth_stencil =
            match Surface::create_renderbuffer(gl, size, self.format.depth_stencil_internal_format) {
                Ok(surface) => surface,
                Err(err) => {
                    color.destroy(gl);
                    return Err(err);
                }
            };
        Framebuffer::create(gl, color, depth_stencil)
    }
}

/// ### English
/// Framebuffers available to the producer, plus the chain's target size and capacity.
///
/// The target size only changes while the queue lock is held, so "stale" checks made under the
/// lock agree with [`RenderQueue::refill`].
///
/// ### 中文
/// 可供生产者使用的 framebuffer，以及交换链的目标尺寸与容量。
///
/// 目标尺寸只在持有队列锁时改变，因此持锁进行的“过期”检查与 [`RenderQueue::refill`] 一致。
pub(crate) struct RenderQueue {
    capacity: usize,
    factory: FramebufferFactory,
    size: AtomicSize,
    queue: Mutex<VecDeque<Framebuffer>>,
}

impl RenderQueue {
    fn new(config: &SwapChainConfig) -> Self {
        Self {
            capacity: config.capacity,
            factory: FramebufferFactory::new(config.format),
            size: AtomicSize::default(),
            queue: Mutex::new(VecDeque::with_capacity(config.capacity)),
        }
    }

    #[inline]
    pub(crate) fn size(&self) -> PhysicalSize<u32> {
        self.size.load()
    }

    #[inline]
    pub(crate) fn capacity(&self) -> usize {
        self.capacity
    }

    #[inline]
    pub(crate) fn len(&self) -> usize {
        lock(&self.queue).len()
    }

    /// ### English
    /// Pops the next framebuffer. A stale-sized one is destroyed and `None` is returned.
    ///
    /// ### 中文
    /// 弹出下一个 framebuffer。若尺寸已过期则销毁并返回 `None`。
    fn acquire(&self, gl: &dyn GlApi) -> Option<Framebuffer> {
        let (framebuffer, stale) = {
            let mut queue = lock(&self.queue);
            let framebuffer = queue.pop_front()?;
            let stale = framebuffer.size() != self.size.load();
            (framebuffer, stale)
        };
        if stale {
            log::trace!("discarding stale framebuffer {}", framebuffer.id());
            framebuffer.destroy(gl);
            return None;
        }
        Some(framebuffer)
    }

    /// ### English
    /// Returns a framebuffer whose draw failed; it goes back to the front, undisplayed.
    ///
    /// ### 中文
    /// 归还绘制失败的 framebuffer；它回到队首，不会被显示。
    fn give_back(&self, framebuffer: Framebuffer) {
        lock(&self.queue).push_front(framebuffer);
    }

    /// ### English
    /// Retires a framebuffer from the display side: re-queued if still current-sized and there is
    /// room, destroyed otherwise.
    ///
    /// ### 中文
    /// 回收来自显示侧的 framebuffer：尺寸仍有效且有空位时重新入队，否则销毁。
    fn recycle(&self, gl: &dyn GlApi, framebuffer: Framebuffer) {
        let rejected = {
            let mut queue = lock(&self.queue);
            if framebuffer.size() == self.size.load() && queue.len() < self.capacity {
                queue.push_back(framebuffer);
                None
            } else {
                Some(framebuffer)
            }
        };
        if let Some(framebuffer) = rejected {
            framebuffer.destroy(gl);
        }
    }

    /// ### English
    /// Sets the target size, destroys every queued framebuffer, and allocates `capacity` new ones.
    ///
    /// ### 中文
    /// 设置目标尺寸，销毁所有排队的 framebuffer，并分配 `capacity` 个新的。
    fn refill(&self, gl: &dyn GlApi, size: PhysicalSize<u32>) -> GlResult<()> {
        let mut queue = lock(&self.queue);
        self.size.store(size);
        for framebuffer in queue.drain(..) {
            framebuffer.destroy(gl);
        }
        for _ in 0..self.capacity {
            queue.push_back(self.factory.create(gl, size)?);
        }
        Ok(())
    }

    fn destroy_all(&self, gl: &dyn GlApi) {
        let drained: Vec<_> = lock(&self.queue).drain(..).collect();
        for framebuffer in drained {
            framebuffer.destroy(gl);
        }
    }

    /// ### English
    /// Acquires a framebuffer and runs `f` on it under a render lease.
    ///
    /// On error the framebuffer is given back and the error propagates.
    ///
    /// ### 中文
    /// 获取一个 framebuffer，并在渲染租约下对其执行 `f`。
    ///
    /// 出错时归还 framebuffer 并向上传播错误。
    fn draw<R>(
        &self,
        gl: &dyn GlApi,
        f: impl FnOnce(&Framebuffer) -> Result<R, PoolError>,
    ) -> Result<Option<(Framebuffer, R)>, PoolError> {
        let Some(framebuffer) = self.acquire(gl) else {
            return Ok(None);
        };
        let outcome = match framebuffer.lease(FramebufferRole::Render) {
            Ok(_lease) => f(&framebuffer),
            Err(err) => Err(err.into()),
        };
        match outcome {
            Ok(value) => Ok(Some((framebuffer, value))),
            Err(err) => {
                self.give_back(framebuffer);
                Err(err)
            }
        }
    }
}

/// ### English
/// Runs `f` on the displayed framebuffer under a display lease.
///
/// ### 中文
/// 在显示租约下对正在显示的 framebuffer 执行 `f`。
fn show<R>(current: Option<&Framebuffer>, f: impl FnOnce(&Framebuffer) -> R) -> Option<R> {
    let framebuffer = current?;
    match framebuffer.lease(FramebufferRole::Display) {
        Ok(_lease) => Some(f(framebuffer)),
        Err(err) => {
            log::error!("display skipped: {err}");
            None
        }
    }
}

/// ### English
/// Presentation policy chosen at construction.
///
/// ### 中文
/// 构造时选定的呈现策略。
pub enum SwapChain {
    Fifo(FifoSwapChain),
    Mailbox(MailboxSwapChain),
}

impl SwapChain {
    /// ### English
    /// Creates an empty chain; [`SwapChain::resize`] allocates the framebuffers.
    ///
    /// ### 中文
    /// 创建空的交换链；由 [`SwapChain::resize`] 分配 framebuffer。
    pub fn new(config: &SwapChainConfig) -> Result<Self, PoolError> {
        config.validate()?;
        Ok(match config.present_mode {
            PresentMode::Fifo => Self::Fifo(FifoSwapChain::new(config)),
            PresentMode::Mailbox => Self::Mailbox(MailboxSwapChain::new(config)),
        })
    }

    #[inline]
    fn queue(&self) -> &RenderQueue {
        match self {
            Self::Fifo(chain) => chain.render_queue(),
            Self::Mailbox(chain) => chain.render_queue(),
        }
    }

    #[inline]
    pub fn present_mode(&self) -> PresentMode {
        match self {
            Self::Fifo(_) => PresentMode::Fifo,
            Self::Mailbox(_) => PresentMode::Mailbox,
        }
    }

    #[inline]
    pub fn size(&self) -> PhysicalSize<u32> {
        self.queue().size()
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.queue().capacity()
    }

    /// ### English
    /// Framebuffers currently owned by the chain (queued, pending, or on screen); excludes one
    /// that is being drawn into.
    ///
    /// ### 中文
    /// 交换链当前持有的 framebuffer 数量（排队、待显示或正在显示）；不含正在绘制的那个。
    pub fn held_framebuffers(&self) -> usize {
        match self {
            Self::Fifo(chain) => chain.held_framebuffers(),
            Self::Mailbox(chain) => chain.held_framebuffers(),
        }
    }

    pub fn resize(&self, gl: &dyn GlApi, size: PhysicalSize<u32>) -> Result<(), PoolError> {
        log::debug!(
            "{} swap chain resize to {}x{}",
            self.present_mode(),
            size.width,
            size.height
        );
        match self {
            Self::Fifo(chain) => chain.resize(gl, size),
            Self::Mailbox(chain) => chain.resize(gl, size),
        }
    }

    /// ### English
    /// Producer side: draws into the next framebuffer and hands it to the display side.
    ///
    /// Returns `Ok(None)` when no framebuffer is available this tick.
    ///
    /// ### 中文
    /// 生产者侧：绘制到下一个 framebuffer，并将其交给显示侧。
    ///
    /// 本轮没有可用 framebuffer 时返回 `Ok(None)`。
    pub fn render<R>(
        &self,
        gl: &dyn GlApi,
        f: impl FnOnce(&Framebuffer) -> Result<R, PoolError>,
    ) -> Result<Option<R>, PoolError> {
        match self {
            Self::Fifo(chain) => chain.render(gl, f),
            Self::Mailbox(chain) => chain.render(gl, f),
        }
    }

    /// ### English
    /// Consumer side: advances by at most one frame, then shows the current framebuffer.
    ///
    /// Never waits for the producer. Returns `None` when nothing has been rendered yet. After a
    /// resize the old frame stays on screen until a frame at the new size retires it.
    ///
    /// ### 中文
    /// 消费者侧：最多前进一帧，然后显示当前 framebuffer。
    ///
    /// 从不等待生产者。尚未渲染任何内容时返回 `None`。尺寸变化后，旧帧会一直显示，
    /// 直到新尺寸的帧将其回收。
    pub fn display<R>(&self, gl: &dyn GlApi, f: impl FnOnce(&Framebuffer) -> R) -> Option<R> {
        match self {
            Self::Fifo(chain) => chain.display(gl, f),
            Self::Mailbox(chain) => chain.display(gl, f),
        }
    }

    pub fn destroy_all(&self, gl: &dyn GlApi) {
        match self {
            Self::Fifo(chain) => chain.destroy_all(gl),
            Self::Mailbox(chain) => chain.destroy_all(gl),
        }
    }
}
