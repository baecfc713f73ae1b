//! ### English
//! Headless context backend: software contexts with per-thread "current" tracking and a shared
//! object namespace per share group. Drives the pool without a GPU.
//!
//! ### 中文
//! headless 上下文后端：带每线程 current 跟踪的软件上下文，每个共享组一个共享对象命名空间。
//! 无需 GPU 即可驱动池。

mod device;
mod gl;

pub use device::{HeadlessDevice, ObjectKind};
pub use gl::HeadlessGl;

use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread::{self, ThreadId};

use crate::engine::context::NativeBackend;
use crate::engine::error::{ContextError, ContextResult};
use crate::engine::gl::SharedGl;

/// ### English
/// Identity of one headless context.
///
/// ### 中文
/// 单个 headless 上下文的标识。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct HeadlessContext(pub u32);

struct ContextRecord {
    gl: Arc<HeadlessGl>,
}

#[derive(Default)]
struct BackendState {
    contexts: HashMap<HeadlessContext, ContextRecord>,
    /// ### English
    /// Which context each thread has current. A context is current on at most one thread.
    ///
    /// ### 中文
    /// 每个线程的 current 上下文。一个上下文最多在一个线程上 current。
    current: HashMap<ThreadId, HeadlessContext>,
}

#[derive(Default)]
struct Counters {
    capability_loads: AtomicUsize,
    offscreen_created: AtomicUsize,
    destroyed: AtomicUsize,
    make_current: AtomicUsize,
}

/// ### English
/// Cheaply clonable handle to one headless "driver" instance.
///
/// ### 中文
/// 指向某个 headless “驱动”实例的可低成本克隆句柄。
#[derive(Clone, Default)]
pub struct HeadlessBackend {
    state: Arc<Mutex<BackendState>>,
    next_handle: Arc<AtomicU32>,
    counters: Arc<Counters>,
}

impl HeadlessBackend {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    fn state(&self) -> MutexGuard<'_, BackendState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn insert(&self, device: Arc<HeadlessDevice>) -> HeadlessContext {
        let handle = HeadlessContext(self.next_handle.fetch_add(1, Ordering::Relaxed) + 1);
        let gl = Arc::new(HeadlessGl::new(device));
        self.state().contexts.insert(handle, ContextRecord { gl });
        handle
    }

    /// ### English
    /// Creates a host-owned root context with its own share group, as a host toolkit would.
    ///
    /// ### 中文
    /// 像宿主工具包那样创建一个宿主持有的根上下文，拥有独立的共享组。
    pub fn create_root(&self) -> HeadlessContext {
        self.insert(Arc::new(HeadlessDevice::new()))
    }

    /// ### English
    /// Destroys a root context created by [`HeadlessBackend::create_root`].
    ///
    /// ### 中文
    /// 销毁由 [`HeadlessBackend::create_root`] 创建的根上下文。
    pub fn destroy_root(&self, handle: HeadlessContext) -> ContextResult<()> {
        self.destroy(handle)
    }

    pub fn gl(&self, handle: HeadlessContext) -> Option<Arc<HeadlessGl>> {
        self.state().contexts.get(&handle).map(|record| record.gl.clone())
    }

    pub fn device(&self, handle: HeadlessContext) -> Option<Arc<HeadlessDevice>> {
        self.gl(handle).map(|gl| gl.device().clone())
    }

    #[inline]
    pub fn is_alive(&self, handle: HeadlessContext) -> bool {
        self.state().contexts.contains_key(&handle)
    }

    #[inline]
    pub fn live_contexts(&self) -> usize {
        self.state().contexts.len()
    }

    #[inline]
    pub fn capability_loads(&self) -> usize {
        self.counters.capability_loads.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn offscreen_created(&self) -> usize {
        self.counters.offscreen_created.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn destroyed_contexts(&self) -> usize {
        self.counters.destroyed.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn make_current_calls(&self) -> usize {
        self.counters.make_current.load(Ordering::Relaxed)
    }

    fn missing(&self, handle: HeadlessContext) -> String {
        format!("unknown context {handle:?}")
    }
}

impl NativeBackend for HeadlessBackend {
    type Handle = HeadlessContext;

    fn name(&self) -> &'static str {
        "headless"
    }

    fn current(&self) -> Option<HeadlessContext> {
        self.state().current.get(&thread::current().id()).copied()
    }

    fn make_current(&self, handle: HeadlessContext) -> ContextResult<()> {
        self.counters.make_current.fetch_add(1, Ordering::Relaxed);
        let this_thread = thread::current().id();
        let mut state = self.state();
        if !state.contexts.contains_key(&handle) {
            return Err(ContextError::MakeCurrent {
                backend: self.name(),
                reason: self.missing(handle),
            });
        }
        let elsewhere = state
            .current
            .iter()
            .any(|(thread, current)| *current == handle && *thread != this_thread);
        if elsewhere {
            return Err(ContextError::MakeCurrent {
                backend: self.name(),
                reason: format!("{handle:?} is current on another thread"),
            });
        }
        state.current.insert(this_thread, handle);
        Ok(())
    }

    fn release_current(&self) -> ContextResult<()> {
        self.state().current.remove(&thread::current().id());
        Ok(())
    }

    fn load_gl(&self, handle: HeadlessContext) -> ContextResult<SharedGl> {
        self.counters.capability_loads.fetch_add(1, Ordering::Relaxed);
        self.gl(handle)
            .map(|gl| gl as SharedGl)
            .ok_or_else(|| ContextError::CapabilityLoad {
                backend: self.name(),
                reason: self.missing(handle),
            })
    }

    fn create_offscreen(&self, parent: HeadlessContext) -> ContextResult<HeadlessContext> {
        let device = self.device(parent).ok_or_else(|| ContextError::Creation {
            backend: self.name(),
            reason: self.missing(parent),
        })?;
        self.counters.offscreen_created.fetch_add(1, Ordering::Relaxed);
        Ok(self.insert(device))
    }

    fn destroy(&self, handle: HeadlessContext) -> ContextResult<()> {
        let mut state = self.state();
        if state.contexts.remove(&handle).is_none() {
            return Err(ContextError::Destruction {
                backend: self.name(),
                reason: self.missing(handle),
            });
        }
        state.current.retain(|_, current| *current != handle);
        self.counters.destroyed.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::gl::GlApi;

    #[test]
    fn context_is_current_on_one_thread_only() {
        let backend = HeadlessBackend::new();
        let root = backend.create_root();
        backend.make_current(root).unwrap();
        assert_eq!(backend.current(), Some(root));

        let other = backend.clone();
        let result = thread::spawn(move || other.make_current(root)).join().unwrap();
        assert!(result.is_err());

        backend.release_current().unwrap();
        assert_eq!(backend.current(), None);
    }

    #[test]
    fn offscreen_shares_the_parent_device() {
        let backend = HeadlessBackend::new();
        let root = backend.create_root();
        let child = backend.create_offscreen(root).unwrap();

        let texture = backend.gl(child).unwrap().create_texture().unwrap();
        let root_device = backend.device(root).unwrap();
        assert_eq!(root_device.live(ObjectKind::Texture), 1);
        assert_eq!(root_device.created(ObjectKind::Texture), 1);

        backend.gl(root).unwrap().delete_texture(texture);
        assert_eq!(root_device.live(ObjectKind::Texture), 0);
    }

    #[test]
    fn destroy_unbinds_everywhere() {
        let backend = HeadlessBackend::new();
        let root = backend.create_root();
        backend.make_current(root).unwrap();
        backend.destroy(root).unwrap();
        assert_eq!(backend.current(), None);
        assert!(backend.destroy(root).is_err());
    }
}
