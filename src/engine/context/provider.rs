//! ### English
//! Reference-counted capability registry keyed by native context handle.
//!
//! ### 中文
//! 以原生上下文句柄为键、带引用计数的能力注册表。

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use super::{Capabilities, GlContext, HostContextAdapter, HostWindow, NativeBackend};
use crate::engine::error::ContextResult;

/// ### English
/// One registry row: the shared capability set, how many wrappers reference it, and whether
/// the native context is ours to destroy.
///
/// ### 中文
/// 注册表中的一行：共享能力集、引用它的封装数量，以及原生上下文是否应由我们销毁。
struct RegistryEntry {
    capabilities: Arc<Capabilities>,
    refs: usize,
    /// ### English
    /// `false` for host contexts, which are only borrowed and never destroyed here.
    ///
    /// ### 中文
    /// 宿主上下文为 `false`：只是借用，此处从不销毁。
    owned: bool,
}

/// ### English
/// Creates and tracks [`GlContext`] wrappers for one backend.
///
/// Capabilities are resolved at most once per native handle. Releasing a wrapper decrements the
/// count; at zero the row is removed and, for owned contexts, the native context is destroyed.
///
/// ### 中文
/// 为某个后端创建并跟踪 [`GlContext`] 封装。
///
/// 每个原生句柄最多解析一次能力。释放封装会减少计数；计数归零时移除该行，
/// 若上下文由我们持有则销毁原生上下文。
pub struct ContextProvider<B: NativeBackend> {
    backend: B,
    registry: Mutex<HashMap<B::Handle, RegistryEntry>>,
}

impl<B: NativeBackend> ContextProvider<B> {
    pub fn new(backend: B) -> Arc<Self> {
        log::debug!("context provider created for backend `{}`", backend.name());
        Arc::new(Self {
            backend,
            registry: Mutex::new(HashMap::new()),
        })
    }

    #[inline]
    pub fn backend(&self) -> &B {
        &self.backend
    }

    #[inline]
    fn registry(&self) -> MutexGuard<'_, HashMap<B::Handle, RegistryEntry>> {
        self.registry.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// ### English
    /// Handle of the context current on the calling thread.
    ///
    /// ### 中文
    /// 调用线程上 current 上下文的句柄。
    #[inline]
    pub fn current_handle(&self) -> Option<B::Handle> {
        self.backend.current()
    }

    /// ### English
    /// Wraps whatever context is current on the calling thread (borrowed, never destroyed here).
    ///
    /// ### 中文
    /// 封装调用线程上的 current 上下文（借用，此处不会销毁）。
    pub fn from_current(self: &Arc<Self>) -> ContextResult<Option<GlContext<B>>> {
        match self.backend.current() {
            Some(handle) => self.acquire(handle, false).map(Some),
            None => Ok(None),
        }
    }

    /// ### English
    /// Wraps a host-owned context by handle (borrowed, never destroyed here).
    ///
    /// ### 中文
    /// 通过句柄封装宿主持有的上下文（借用，此处不会销毁）。
    #[inline]
    pub fn wrap_host(self: &Arc<Self>, handle: B::Handle) -> ContextResult<GlContext<B>> {
        self.acquire(handle, false)
    }

    /// ### English
    /// Asks `adapter` which context the host renderer has bound for `window` and wraps it.
    ///
    /// ### 中文
    /// 询问 `adapter` 宿主渲染器为 `window` 绑定了哪个上下文，并将其封装。
    pub fn from_host<A>(
        self: &Arc<Self>,
        adapter: &A,
        window: HostWindow,
    ) -> ContextResult<Option<GlContext<B>>>
    where
        A: HostContextAdapter<B> + ?Sized,
    {
        match adapter.bound_context(&self.backend, window) {
            Some(handle) => {
                log::debug!(
                    "host adapter `{}` resolved {window:?} to {handle:?}",
                    adapter.host_version()
                );
                self.wrap_host(handle).map(Some)
            }
            None => Ok(None),
        }
    }

    /// ### English
    /// Creates an owned offscreen context sharing objects with `parent`.
    ///
    /// ### 中文
    /// 创建一个与 `parent` 共享对象、由我们持有的离屏上下文。
    pub fn create_offscreen(self: &Arc<Self>, parent: &GlContext<B>) -> ContextResult<GlContext<B>> {
        let handle = self.backend.create_offscreen(parent.handle())?;
        log::debug!(
            "[{}] created offscreen context {handle:?} sharing with {:?}",
            self.backend.name(),
            parent.handle()
        );
        match self.acquire(handle, true) {
            Ok(context) => Ok(context),
            Err(err) => {
                if let Err(destroy_err) = self.backend.destroy(handle) {
                    log::warn!("failed to destroy offscreen context after error: {destroy_err}");
                }
                Err(err)
            }
        }
    }

    #[inline]
    pub fn is_current(&self, context: &GlContext<B>) -> bool {
        self.backend.current() == Some(context.handle())
    }

    /// ### English
    /// Makes `previous` current again, or releases the current context when `previous` is `None`.
    ///
    /// ### 中文
    /// 重新使 `previous` 成为 current；若 `previous` 为 `None` 则释放当前上下文。
    pub fn restore_previous(&self, previous: Option<B::Handle>) -> ContextResult<()> {
        match previous {
            Some(handle) if self.backend.current() == Some(handle) => Ok(()),
            Some(handle) => self.backend.make_current(handle),
            None if self.backend.current().is_none() => Ok(()),
            None => self.backend.release_current(),
        }
    }

    /// ### English
    /// Number of live wrappers of `handle` (`0` when unknown).
    ///
    /// ### 中文
    /// `handle` 的存活封装数量（未知时为 `0`）。
    pub fn ref_count(&self, handle: B::Handle) -> usize {
        self.registry().get(&handle).map_or(0, |entry| entry.refs)
    }

    /// ### English
    /// Number of distinct native contexts with at least one live wrapper.
    ///
    /// ### 中文
    /// 至少有一个存活封装的不同原生上下文数量。
    pub fn live_contexts(&self) -> usize {
        self.registry().len()
    }

    /// ### English
    /// Registers one more wrapper of `handle`, resolving capabilities on first use.
    ///
    /// ### 中文
    /// 为 `handle` 再登记一个封装，首次使用时解析能力。
    pub(super) fn acquire(self: &Arc<Self>, handle: B::Handle, owned: bool) -> ContextResult<GlContext<B>> {
        let mut registry = self.registry();
        if let Some(entry) = registry.get_mut(&handle) {
            entry.refs += 1;
            return Ok(GlContext::new(
                self.clone(),
                handle,
                entry.capabilities.clone(),
                entry.owned,
            ));
        }

        let capabilities = Arc::new(self.resolve_capabilities(handle)?);
        log::debug!(
            "[{}] resolved capabilities for {handle:?}: {}",
            self.backend.name(),
            capabilities.version().raw
        );
        registry.insert(
            handle,
            RegistryEntry {
                capabilities: capabilities.clone(),
                refs: 1,
                owned,
            },
        );
        Ok(GlContext::new(self.clone(), handle, capabilities, owned))
    }

    fn resolve_capabilities(&self, handle: B::Handle) -> ContextResult<Capabilities> {
        let previous = self.backend.current();
        if previous == Some(handle) {
            return self.backend.load_gl(handle).map(Capabilities::resolve);
        }

        self.backend.make_current(handle)?;
        let loaded = self.backend.load_gl(handle).map(Capabilities::resolve);
        let restored = self.restore_previous(previous);
        let capabilities = loaded?;
        restored?;
        Ok(capabilities)
    }

    /// ### English
    /// Drops one wrapper of `handle`; tears down the native context when it was the last owned one.
    ///
    /// ### 中文
    /// 释放 `handle` 的一个封装；若是最后一个且上下文由我们持有，则销毁原生上下文。
    pub(super) fn release(&self, handle: B::Handle) {
        let destroy = {
            let mut registry = self.registry();
            let Some(entry) = registry.get_mut(&handle) else {
                log::warn!(
                    "[{}] release of unknown context {handle:?}",
                    self.backend.name()
                );
                return;
            };
            entry.refs -= 1;
            if entry.refs > 0 {
                return;
            }
            registry.remove(&handle).is_some_and(|entry| entry.owned)
        };

        if !destroy {
            log::debug!(
                "[{}] last wrapper of borrowed context {handle:?} released",
                self.backend.name()
            );
            return;
        }

        if self.backend.current() == Some(handle) {
            if let Err(err) = self.backend.release_current() {
                log::warn!("failed to release {handle:?} before destroying it: {err}");
            }
        }
        match self.backend.destroy(handle) {
            Ok(()) => log::debug!("[{}] destroyed context {handle:?}", self.backend.name()),
            Err(err) => log::warn!("failed to destroy context {handle:?}: {err}"),
        }
    }
}
