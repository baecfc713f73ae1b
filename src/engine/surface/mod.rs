//! ### English
//! A rendered surface: one render thread producing frames into a framebuffer pool, and a host
//! thread presenting them.
//!
//! ### 中文
//! 渲染表面：一个渲染线程向 framebuffer 池生产帧，宿主线程负责呈现。

mod render_loop;
mod signal;
mod stats;

pub use signal::RedrawRequester;
pub use stats::{
    DurationStats, Percentile, RateStats, RollingWindowStatistics, Sample, Stats,
};

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError, RwLock};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use dpi::PhysicalSize;

use super::config::SurfaceConfig;
use super::context::{GlContext, NativeBackend};
use super::error::{DrawError, PoolError};
use super::pool::{DisplayScope, DrawScope, FramebufferPool};
use super::size::{AtomicSize, is_empty};
use super::swap_chain::lock;
use render_loop::RenderLoop;

static NEXT_SURFACE_ID: AtomicUsize = AtomicUsize::new(1);

struct Shared<B: NativeBackend> {
    component_size: AtomicSize,
    size_override: AtomicSize,
    cancelled: AtomicBool,
    pool: RwLock<Option<Arc<FramebufferPool<B>>>>,
    render_stats: Mutex<RollingWindowStatistics>,
    display_stats: Mutex<RollingWindowStatistics>,
    requester: RedrawRequester,
}

impl<B: NativeBackend> Shared<B> {
    /// ### English
    /// Override when set, otherwise the component size.
    ///
    /// ### 中文
    /// 若设置了覆盖尺寸则使用之，否则使用组件尺寸。
    fn effective_size(&self) -> PhysicalSize<u32> {
        let forced = self.size_override.load();
        if is_empty(forced) {
            self.component_size.load()
        } else {
            forced
        }
    }

    #[inline]
    fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }

    fn pool(&self) -> Option<Arc<FramebufferPool<B>>> {
        self.pool
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn publish(&self, pool: Arc<FramebufferPool<B>>) {
        *self.pool.write().unwrap_or_else(PoisonError::into_inner) = Some(pool);
    }

    fn unpublish(&self) -> Option<Arc<FramebufferPool<B>>> {
        self.pool
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
    }

    fn record_render(&self, at: Instant, elapsed: Duration) {
        lock(&self.render_stats).add(at, elapsed);
    }

    fn record_display(&self, at: Instant, elapsed: Duration) {
        lock(&self.display_stats).add(at, elapsed);
    }

    fn apply_size(&self) {
        if let Some(pool) = self.pool() {
            pool.resize(self.effective_size());
        }
        self.requester.request_redraw();
    }
}

/// ### English
/// Handle to a running surface. Dropping it interrupts and joins the render thread.
///
/// ### 中文
/// 运行中表面的句柄。drop 时会中断并 join 渲染线程。
pub struct GlSurface<B: NativeBackend> {
    id: usize,
    shared: Arc<Shared<B>>,
    thread: Mutex<Option<JoinHandle<Result<(), PoolError>>>>,
}

impl<B: NativeBackend> GlSurface<B> {
    /// ### English
    /// Spawns the render thread for a surface hosted by `parent`.
    ///
    /// #### Parameters
    /// - `parent`: Host context; frames are presented on it and the render context shares with it.
    /// - `config`: Swap chain, sizing, and pacing settings.
    /// - `draw`: Called on the render thread once per frame with a bound framebuffer.
    /// - `cleanup`: Called once on the render thread before GL resources are torn down.
    ///
    /// ### 中文
    /// 为 `parent` 承载的表面启动渲染线程。
    ///
    /// #### 参数
    /// - `parent`：宿主上下文；帧在其上呈现，渲染上下文与其共享对象。
    /// - `config`：交换链、尺寸与节奏设置。
    /// - `draw`：在渲染线程上每帧调用一次，framebuffer 已绑定。
    /// - `cleanup`：在 GL 资源销毁之前于渲染线程上调用一次。
    pub fn launch<D, C>(
        parent: GlContext<B>,
        config: SurfaceConfig,
        draw: D,
        cleanup: C,
    ) -> Result<Self, PoolError>
    where
        D: FnMut(&mut DrawScope<'_>) -> Result<(), DrawError> + Send + 'static,
        C: FnOnce() + Send + 'static,
    {
        config.swap_chain.validate()?;
        let id = NEXT_SURFACE_ID.fetch_add(1, Ordering::Relaxed);
        let (requester, wakeup) = signal::redraw_channel();
        let size_override = config.size_override.unwrap_or(PhysicalSize::new(0, 0));
        let shared = Arc::new(Shared {
            component_size: AtomicSize::new(config.initial_size),
            size_override: AtomicSize::new(size_override),
            cancelled: AtomicBool::new(false),
            pool: RwLock::new(None),
            render_stats: Mutex::new(RollingWindowStatistics::new(config.statistics_window)),
            display_stats: Mutex::new(RollingWindowStatistics::new(config.statistics_window)),
            requester,
        });

        let render_loop = RenderLoop {
            id,
            shared: Arc::clone(&shared),
            parent,
            config,
            wakeup,
            draw,
            cleanup,
        };
        let handle = thread::Builder::new()
            .name(format!("XianGlSurface-{id}"))
            .spawn(move || render_loop.run())
            .map_err(PoolError::ThreadSpawn)?;

        Ok(Self {
            id,
            shared,
            thread: Mutex::new(Some(handle)),
        })
    }

    #[inline]
    pub fn id(&self) -> usize {
        self.id
    }

    /// ### English
    /// Size frames are rendered at: the override when set, otherwise the component size.
    ///
    /// ### 中文
    /// 帧的渲染尺寸：设置了覆盖尺寸时为覆盖尺寸，否则为组件尺寸。
    #[inline]
    pub fn size(&self) -> PhysicalSize<u32> {
        self.shared.effective_size()
    }

    /// ### English
    /// Records the component size and wakes the render thread.
    ///
    /// ### 中文
    /// 记录组件尺寸并唤醒渲染线程。
    pub fn resize(&self, size: PhysicalSize<u32>) {
        self.shared.component_size.store(size);
        self.shared.apply_size();
    }

    /// ### English
    /// Pins the framebuffer size regardless of component resizes; `None` clears the pin.
    ///
    /// ### 中文
    /// 固定 framebuffer 尺寸，不受组件尺寸变化影响；`None` 取消固定。
    pub fn set_size_override(&self, size: Option<PhysicalSize<u32>>) {
        self.shared
            .size_override
            .store(size.unwrap_or(PhysicalSize::new(0, 0)));
        self.shared.apply_size();
    }

    #[inline]
    pub fn request_redraw(&self) {
        self.shared.requester.request_redraw();
    }

    #[inline]
    pub fn redraw_requester(&self) -> RedrawRequester {
        self.shared.requester.clone()
    }

    /// ### English
    /// Whether the pool has been created and not yet torn down.
    ///
    /// ### 中文
    /// 池是否已创建且尚未销毁。
    #[inline]
    pub fn is_rendering(&self) -> bool {
        self.shared.pool().is_some()
    }

    pub fn is_finished(&self) -> bool {
        lock(&self.thread)
            .as_ref()
            .is_none_or(JoinHandle::is_finished)
    }

    /// ### English
    /// Presents the latest frame on the calling thread. Returns `Ok(None)` while no frame exists
    /// or after the render thread has shut down.
    ///
    /// ### 中文
    /// 在调用线程上呈现最新帧。尚无帧或渲染线程已关闭时返回 `Ok(None)`。
    pub fn display<R>(&self, f: impl FnOnce(&DisplayScope<'_>) -> R) -> Result<Option<R>, PoolError> {
        let Some(pool) = self.shared.pool() else {
            return Ok(None);
        };
        let start = Instant::now();
        match pool.display(f) {
            Ok(Some(value)) => {
                self.shared.record_display(start, start.elapsed());
                Ok(Some(value))
            }
            Ok(None) | Err(PoolError::Destroyed) => Ok(None),
            Err(err) => Err(err),
        }
    }

    pub fn render_statistics(&self) -> RollingWindowStatistics {
        lock(&self.shared.render_stats).clone()
    }

    pub fn display_statistics(&self) -> RollingWindowStatistics {
        lock(&self.shared.display_stats).clone()
    }

    /// ### English
    /// Asks the render thread to stop after its current frame.
    ///
    /// ### 中文
    /// 请求渲染线程在当前帧结束后停止。
    pub fn interrupt(&self) {
        self.shared.cancelled.store(true, Ordering::Release);
        self.shared.requester.request_redraw();
    }

    /// ### English
    /// Waits for the render thread and returns its exit status. Later calls return `Ok(())`.
    ///
    /// ### 中文
    /// 等待渲染线程结束并返回其退出状态。之后的调用返回 `Ok(())`。
    pub fn join(&self) -> Result<(), PoolError> {
        let Some(handle) = lock(&self.thread).take() else {
            return Ok(());
        };
        handle.join().map_err(|_| PoolError::RenderThreadPanicked)?
    }
}

impl<B: NativeBackend> Drop for GlSurface<B> {
    fn drop(&mut self) {
        self.interrupt();
        if let Err(err) = self.join() {
            log::warn!("surface {} render thread ended with error: {err}", self.id);
        }
    }
}
