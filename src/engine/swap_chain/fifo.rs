//! ### English
//! FIFO presentation: every finished frame is shown, in production order.
//!
//! ### 中文
//! FIFO 呈现：每个完成的帧都按生产顺序显示。

use std::collections::VecDeque;
use std::sync::Mutex;

use dpi::PhysicalSize;

use super::{RenderQueue, lock, show};
use crate::engine::config::SwapChainConfig;
use crate::engine::error::PoolError;
use crate::engine::gl::GlApi;
use crate::engine::objects::Framebuffer;

/// ### English
/// Render queue -> display queue -> current -> render queue.
///
/// The producer is paced by the consumer: once every framebuffer is queued for display or on
/// screen, `render` reports no framebuffer until `display` retires one.
///
/// ### 中文
/// 渲染队列 -> 显示队列 -> current -> 渲染队列。
///
/// 生产者受消费者节奏约束：当所有 framebuffer 都在等待显示或正在显示时，
/// `render` 会报告无可用 framebuffer，直到 `display` 回收一个。
pub struct FifoSwapChain {
    render_queue: RenderQueue,
    display_queue: Mutex<VecDeque<Framebuffer>>,
    /// ### English
    /// Framebuffer on screen. Its mutex is the display lock.
    ///
    /// ### 中文
    /// 正在显示的 framebuffer。其互斥锁即显示锁。
    current: Mutex<Option<Framebuffer>>,
}

impl FifoSwapChain {
    pub(super) fn new(config: &SwapChainConfig) -> Self {
        Self {
            render_queue: RenderQueue::new(config),
            display_queue: Mutex::new(VecDeque::with_capacity(config.capacity)),
            current: Mutex::new(None),
        }
    }

    #[inline]
    pub(super) fn render_queue(&self) -> &RenderQueue {
        &self.render_queue
    }

    pub(super) fn held_framebuffers(&self) -> usize {
        let current = usize::from(lock(&self.current).is_some());
        self.render_queue.len() + lock(&self.display_queue).len() + current
    }

    /// ### English
    /// Destroys everything queued, then refills the render queue at `size`. The framebuffer on
    /// screen stays until it is retired.
    ///
    /// At most `capacity + 1` framebuffers are live at any point of the resize.
    ///
    /// ### 中文
    /// 先销毁所有排队的 framebuffer，再按 `size` 重新填充渲染队列。正在显示的 framebuffer
    /// 保留到被回收为止。
    ///
    /// 调整过程中任何时刻最多存在 `capacity + 1` 个 framebuffer。
    pub(super) fn resize(&self, gl: &dyn GlApi, size: PhysicalSize<u32>) -> Result<(), PoolError> {
        let mut pending = lock(&self.display_queue);
        for framebuffer in pending.drain(..) {
            framebuffer.destroy(gl);
        }
        self.render_queue.refill(gl, size)?;
        Ok(())
    }

    pub(super) fn render<R>(
        &self,
        gl: &dyn GlApi,
        f: impl FnOnce(&Framebuffer) -> Result<R, PoolError>,
    ) -> Result<Option<R>, PoolError> {
        let Some((framebuffer, value)) = self.render_queue.draw(gl, f)? else {
            return Ok(None);
        };
        lock(&self.display_queue).push_back(framebuffer);
        Ok(Some(value))
    }

    pub(super) fn display<R>(&self, gl: &dyn GlApi, f: impl FnOnce(&Framebuffer) -> R) -> Option<R> {
        let mut current = lock(&self.current);

        let next = lock(&self.display_queue).pop_front();
        if let Some(next) = next {
            if next.size() == self.render_queue.size() {
                if let Some(retired) = current.replace(next) {
                    self.render_queue.recycle(gl, retired);
                }
            } else {
                next.destroy(gl);
            }
        }

        show(current.as_ref(), f)
    }

    /// ### English
    /// Holds the display lock throughout, so a concurrent `display` cannot recycle a frame into
    /// an already drained render queue.
    ///
    /// ### 中文
    /// 全程持有显示锁，使并发的 `display` 无法把帧回收进已清空的渲染队列。
    pub(super) fn destroy_all(&self, gl: &dyn GlApi) {
        let mut current = lock(&self.current);
        self.render_queue.destroy_all(gl);
        let pending: Vec<_> = lock(&self.display_queue).drain(..).collect();
        for framebuffer in pending {
            framebuffer.destroy(gl);
        }
        if let Some(framebuffer) = current.take() {
            framebuffer.destroy(gl);
        }
    }
}
