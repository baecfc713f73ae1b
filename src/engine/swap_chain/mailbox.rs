//! ### English
//! MAILBOX presentation: the display side always gets the newest finished frame.
//!
//! ### 中文
//! MAILBOX 呈现：显示侧总是拿到最新完成的帧。

use std::sync::{Mutex, TryLockError};

use dpi::PhysicalSize;

use super::{RenderQueue, lock, show};
use crate::engine::config::SwapChainConfig;
use crate::engine::error::PoolError;
use crate::engine::gl::GlApi;
use crate::engine::objects::Framebuffer;

/// ### English
/// Render queue, one `current` slot (guarded by the display lock), and one `waiting` slot.
///
/// A finished frame goes straight to `current` when the display lock is free; otherwise it
/// replaces `waiting`. Any frame it supersedes is recycled, so at most one undisplayed frame is
/// kept. Lock order is always `current` then `waiting`.
///
/// ### 中文
/// 渲染队列、一个 `current` 槽（由显示锁保护）和一个 `waiting` 槽。
///
/// 显示锁空闲时，完成的帧直接进入 `current`；否则替换 `waiting`。被取代的帧会被回收，
/// 因此最多保留一个未显示的帧。加锁顺序始终为先 `current` 后 `waiting`。
pub struct MailboxSwapChain {
    render_queue: RenderQueue,
    current: Mutex<Option<Framebuffer>>,
    waiting: Mutex<Option<Framebuffer>>,
}

impl MailboxSwapChain {
    pub(super) fn new(config: &SwapChainConfig) -> Self {
        Self {
            render_queue: RenderQueue::new(config),
            current: Mutex::new(None),
            waiting: Mutex::new(None),
        }
    }

    #[inline]
    pub(super) fn render_queue(&self) -> &RenderQueue {
        &self.render_queue
    }

    pub(super) fn held_framebuffers(&self) -> usize {
        let current = lock(&self.current);
        let waiting = lock(&self.waiting);
        self.render_queue.len() + usize::from(current.is_some()) + usize::from(waiting.is_some())
    }

    pub(super) fn resize(&self, gl: &dyn GlApi, size: PhysicalSize<u32>) -> Result<(), PoolError> {
        let waiting = lock(&self.waiting).take();
        if let Some(waiting) = waiting {
            waiting.destroy(gl);
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

        let superseded = match self.current.try_lock() {
            Ok(mut current) => self.publish(&mut current, framebuffer),
            Err(TryLockError::Poisoned(poisoned)) => {
                self.publish(&mut poisoned.into_inner(), framebuffer)
            }
            Err(TryLockError::WouldBlock) => {
                let older = lock(&self.waiting).replace(framebuffer);
                [older, None]
            }
        };
        for framebuffer in superseded.into_iter().flatten() {
            self.render_queue.recycle(gl, framebuffer);
        }
        Ok(Some(value))
    }

    /// ### English
    /// Display lock is held: `framebuffer` becomes current; returns the old current and any
    /// older waiting frame for recycling.
    ///
    /// ### 中文
    /// 已持有显示锁：`framebuffer` 成为 current；返回旧的 current 以及更旧的 waiting 帧以供回收。
    fn publish(
        &self,
        current: &mut Option<Framebuffer>,
        framebuffer: Framebuffer,
    ) -> [Option<Framebuffer>; 2] {
        let retired = current.replace(framebuffer);
        let older = lock(&self.waiting).take();
        [retired, older]
    }

    pub(super) fn display<R>(&self, gl: &dyn GlApi, f: impl FnOnce(&Framebuffer) -> R) -> Option<R> {
        let mut current = lock(&self.current);

        let next = lock(&self.waiting).take();
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

    pub(super) fn destroy_all(&self, gl: &dyn GlApi) {
        let mut current = lock(&self.current);
        self.render_queue.destroy_all(gl);
        if let Some(waiting) = lock(&self.waiting).take() {
            waiting.destroy(gl);
        }
        if let Some(framebuffer) = current.take() {
            framebuffer.destroy(gl);
        }
    }
}
