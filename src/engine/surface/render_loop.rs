//! ### English
//! Body of the per-surface render thread.
//!
//! Sequence: wait for a non-empty size, derive an offscreen context, build and publish the pool,
//! then render until cancelled, terminated, or failed. Teardown always runs the cleanup callback,
//! destroys the pool, and destroys the offscreen context.
//!
//! ### 中文
//! 每个表面的渲染线程主体。
//!
//! 流程：等待非空尺寸，派生离屏上下文，构建并发布池，然后持续渲染直到被取消、终止或失败。
//! 收尾阶段总会执行清理回调、销毁池并销毁离屏上下文。

use std::sync::Arc;
use std::time::{Duration, Instant};

use dpi::PhysicalSize;

use super::Shared;
use super::signal::Wakeup;
use crate::engine::config::SurfaceConfig;
use crate::engine::context::{GlContext, NativeBackend};
use crate::engine::error::{DrawError, PoolError};
use crate::engine::pool::{DrawScope, FramebufferPool, Redraw, RenderOutcome};
use crate::engine::size::is_empty;

pub(super) struct RenderLoop<B: NativeBackend, D, C> {
    pub(super) id: usize,
    pub(super) shared: Arc<Shared<B>>,
    pub(super) parent: GlContext<B>,
    pub(super) config: SurfaceConfig,
    pub(super) wakeup: Wakeup,
    pub(super) draw: D,
    pub(super) cleanup: C,
}

impl<B, D, C> RenderLoop<B, D, C>
where
    B: NativeBackend,
    D: FnMut(&mut DrawScope<'_>) -> Result<(), DrawError>,
    C: FnOnce(),
{
    pub(super) fn run(self) -> Result<(), PoolError> {
        let Self {
            id,
            shared,
            parent,
            config,
            wakeup,
            mut draw,
            cleanup,
        } = self;

        let mut offscreen = None;
        let result = session(id, &shared, &parent, &config, &wakeup, &mut draw, &mut offscreen);
        if let Err(err) = &result {
            log::error!("surface {id} render loop failed: {err}");
        }

        let pool = shared.unpublish();
        cleanup();
        if let Some(pool) = pool {
            if let Err(err) = pool.destroy() {
                log::warn!("surface {id} failed to destroy framebuffer pool: {err}");
            }
        }
        if let Some(offscreen) = offscreen {
            if let Err(err) = offscreen.release_current() {
                log::warn!("surface {id} failed to release offscreen context: {err}");
            }
            offscreen.destroy();
        }
        drop(parent);

        log::debug!("surface {id} render loop exited");
        result
    }
}

fn wait_for_size<B: NativeBackend>(
    shared: &Shared<B>,
    config: &SurfaceConfig,
    wakeup: &Wakeup,
) -> Option<PhysicalSize<u32>> {
    loop {
        if shared.is_cancelled() {
            return None;
        }
        let size = shared.effective_size();
        if !is_empty(size) {
            return Some(size);
        }
        wakeup.wait_timeout(config.initial_size_poll);
    }
}

fn session<B, D>(
    id: usize,
    shared: &Shared<B>,
    parent: &GlContext<B>,
    config: &SurfaceConfig,
    wakeup: &Wakeup,
    draw: &mut D,
    offscreen_slot: &mut Option<GlContext<B>>,
) -> Result<(), PoolError>
where
    B: NativeBackend,
    D: FnMut(&mut DrawScope<'_>) -> Result<(), DrawError>,
{
    let Some(size) = wait_for_size(shared, config, wakeup) else {
        log::debug!("surface {id} cancelled before it was sized");
        return Ok(());
    };

    let offscreen = offscreen_slot.insert(parent.derive_offscreen()?);
    offscreen.make_current()?;

    let pool = FramebufferPool::new(offscreen.share()?, parent.share()?, size, &config.swap_chain)?
        .with_default_redraw(config.default_frame_interval);
    pool.initialize()?;
    let pool = Arc::new(pool);
    shared.publish(Arc::clone(&pool));
    pool.resize(shared.effective_size());
    log::info!(
        "surface {id} rendering at {}x{} ({})",
        size.width,
        size.height,
        config.swap_chain.present_mode
    );

    let mut last_frame = Instant::now();
    loop {
        if shared.is_cancelled() {
            log::debug!("surface {id} interrupted");
            return Ok(());
        }

        let frame_start = Instant::now();
        let delta = frame_start.duration_since(last_frame);
        match pool.render(delta, |scope| draw(scope))? {
            RenderOutcome::Rendered(redraw) => {
                shared.record_render(frame_start, frame_start.elapsed());
                last_frame = frame_start;
                match redraw {
                    Redraw::After(delay) => {
                        let remaining = delay.saturating_sub(frame_start.elapsed());
                        if remaining > Duration::ZERO {
                            wakeup.wait_timeout(remaining);
                        }
                    }
                    Redraw::OnRequest => wakeup.wait(),
                }
            }
            RenderOutcome::NoFramebufferAvailable => {
                log::trace!("surface {id} has no free framebuffer");
                wakeup.wait_timeout(config.no_framebuffer_backoff);
            }
            RenderOutcome::Terminated => {
                log::debug!("surface {id} draw callback requested termination");
                return Ok(());
            }
        }
    }
}
