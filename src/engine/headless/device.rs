//! ### English
//! Software object namespace shared by every headless context of one share group.
//!
//! ### 中文
//! 同一共享组内所有 headless 上下文共享的软件对象命名空间。

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::thread;
use std::time::Duration;

use dpi::PhysicalSize;

/// ### English
/// Object kinds tracked by the device counters.
///
/// ### 中文
/// 设备计数器跟踪的对象类型。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ObjectKind {
    Texture,
    Renderbuffer,
    Framebuffer,
}

impl ObjectKind {
    #[inline]
    fn index(self) -> usize {
        match self {
            Self::Texture => 0,
            Self::Renderbuffer => 1,
            Self::Framebuffer => 2,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub(super) struct TextureObject {
    pub(super) size: Option<PhysicalSize<u32>>,
    pub(super) internal_format: u32,
    pub(super) fill: [u8; 4],
}

#[derive(Debug, Clone, Default)]
pub(super) struct RenderbufferObject {
    pub(super) size: Option<PhysicalSize<u32>>,
    pub(super) internal_format: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum Attachment {
    Texture(u32),
    Renderbuffer(u32),
}

#[derive(Debug, Clone, Default)]
pub(super) struct FramebufferObject {
    pub(super) color: Option<Attachment>,
    pub(super) depth_stencil: Option<Attachment>,
}

#[derive(Debug, Default)]
pub(super) struct Objects {
    pub(super) textures: HashMap<u32, TextureObject>,
    pub(super) renderbuffers: HashMap<u32, RenderbufferObject>,
    pub(super) framebuffers: HashMap<u32, FramebufferObject>,
}

impl Objects {
    pub(super) fn attachment_size(&self, attachment: Attachment) -> Option<PhysicalSize<u32>> {
        match attachment {
            Attachment::Texture(id) => self.textures.get(&id).and_then(|t| t.size),
            Attachment::Renderbuffer(id) => self.renderbuffers.get(&id).and_then(|r| r.size),
        }
    }

    /// ### English
    /// Completeness as `glCheckFramebufferStatus` would report it.
    ///
    /// ### 中文
    /// 按 `glCheckFramebufferStatus` 的规则计算完整性。
    pub(super) fn framebuffer_status(&self, id: u32) -> u32 {
        let Some(framebuffer) = self.framebuffers.get(&id) else {
            return glow::FRAMEBUFFER_UNDEFINED;
        };
        let (Some(color), Some(depth)) = (framebuffer.color, framebuffer.depth_stencil) else {
            return glow::FRAMEBUFFER_INCOMPLETE_MISSING_ATTACHMENT;
        };
        match (self.attachment_size(color), self.attachment_size(depth)) {
            (Some(a), Some(b)) if a == b => glow::FRAMEBUFFER_COMPLETE,
            _ => glow::FRAMEBUFFER_INCOMPLETE_ATTACHMENT,
        }
    }

    pub(super) fn color_texture(&self, framebuffer: u32) -> Option<u32> {
        match self.framebuffers.get(&framebuffer)?.color? {
            Attachment::Texture(id) => Some(id),
            Attachment::Renderbuffer(_) => None,
        }
    }
}

/// ### English
/// Shared object store plus creation/deletion counters and failure injection.
///
/// ### 中文
/// 共享对象存储，附带创建/删除计数器与故障注入。
#[derive(Debug, Default)]
pub struct HeadlessDevice {
    objects: Mutex<Objects>,
    next_name: AtomicU32,
    created: [AtomicUsize; 3],
    deleted: [AtomicUsize; 3],
    peak: [AtomicUsize; 3],
    forced_status: AtomicU32,
    fail_allocations: AtomicBool,
    delete_delay_micros: AtomicU64,
}

impl HeadlessDevice {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub(super) fn objects(&self) -> MutexGuard<'_, Objects> {
        self.objects.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub(super) fn allocate_name(&self, kind: ObjectKind) -> u32 {
        self.created[kind.index()].fetch_add(1, Ordering::Relaxed);
        self.next_name.fetch_add(1, Ordering::Relaxed) + 1
    }

    pub(super) fn record_delete(&self, kind: ObjectKind) {
        self.deleted[kind.index()].fetch_add(1, Ordering::Relaxed);
    }

    pub(super) fn record_live(&self, kind: ObjectKind, live: usize) {
        self.peak[kind.index()].fetch_max(live, Ordering::Relaxed);
    }

    #[inline]
    pub(super) fn forced_status(&self) -> Option<u32> {
        match self.forced_status.load(Ordering::Acquire) {
            0 => None,
            status => Some(status),
        }
    }

    #[inline]
    pub(super) fn allocations_fail(&self) -> bool {
        self.fail_allocations.load(Ordering::Acquire)
    }

    pub(super) fn delay_delete(&self) {
        let micros = self.delete_delay_micros.load(Ordering::Acquire);
        if micros > 0 {
            thread::sleep(Duration::from_micros(micros));
        }
    }

    /// ### English
    /// Number of objects of `kind` ever created.
    ///
    /// ### 中文
    /// `kind` 类型对象的累计创建数量。
    #[inline]
    pub fn created(&self, kind: ObjectKind) -> usize {
        self.created[kind.index()].load(Ordering::Relaxed)
    }

    /// ### English
    /// Number of delete calls issued for `kind` (each native deletion counts once).
    ///
    /// ### 中文
    /// 针对 `kind` 发出的删除调用次数（每次原生删除计一次）。
    #[inline]
    pub fn deleted(&self, kind: ObjectKind) -> usize {
        self.deleted[kind.index()].load(Ordering::Relaxed)
    }

    pub fn live(&self, kind: ObjectKind) -> usize {
        let objects = self.objects();
        match kind {
            ObjectKind::Texture => objects.textures.len(),
            ObjectKind::Renderbuffer => objects.renderbuffers.len(),
            ObjectKind::Framebuffer => objects.framebuffers.len(),
        }
    }

    /// ### English
    /// Highest number of simultaneously live objects of `kind` since creation or the last
    /// [`HeadlessDevice::reset_peak`].
    ///
    /// ### 中文
    /// 自创建或上次 [`HeadlessDevice::reset_peak`] 以来，`kind` 类型对象同时存活数量的峰值。
    #[inline]
    pub fn peak_live(&self, kind: ObjectKind) -> usize {
        self.peak[kind.index()].load(Ordering::Relaxed)
    }

    pub fn reset_peak(&self, kind: ObjectKind) {
        self.peak[kind.index()].store(self.live(kind), Ordering::Relaxed);
    }

    pub fn texture_size(&self, texture: u32) -> Option<PhysicalSize<u32>> {
        self.objects().textures.get(&texture).and_then(|t| t.size)
    }

    /// ### English
    /// Makes every completeness check report `status` (`None` restores normal behavior).
    ///
    /// ### 中文
    /// 使每次完整性检查都返回 `status`（`None` 恢复正常行为）。
    pub fn force_framebuffer_status(&self, status: Option<u32>) {
        self.forced_status.store(status.unwrap_or(0), Ordering::Release);
    }

    /// ### English
    /// Makes texture/renderbuffer storage allocation fail with `GL_OUT_OF_MEMORY`.
    ///
    /// ### 中文
    /// 使纹理/renderbuffer 存储分配以 `GL_OUT_OF_MEMORY` 失败。
    pub fn fail_allocations(&self, fail: bool) {
        self.fail_allocations.store(fail, Ordering::Release);
    }

    /// ### English
    /// Makes every framebuffer deletion sleep for `delay` first, widening teardown windows.
    ///
    /// ### 中文
    /// 使每次 framebuffer 删除前先休眠 `delay`，以拉长销毁过程的时间窗口。
    pub fn delay_framebuffer_deletes(&self, delay: Duration) {
        let micros = u64::try_from(delay.as_micros()).unwrap_or(u64::MAX);
        self.delete_delay_micros.store(micros, Ordering::Release);
    }
}
