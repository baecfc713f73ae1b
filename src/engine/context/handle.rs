//! ### English
//! Logical context wrapper handed to the pool and the render loop.
//!
//! ### 中文
//! 交给池与渲染循环使用的逻辑上下文封装。

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use super::{Capabilities, ContextProvider, NativeBackend};
use crate::engine::error::{ContextError, ContextResult};
use crate::engine::gl::{GlApi, SharedGl};

/// ### English
/// One reference to a native context registered in a [`ContextProvider`].
///
/// Wrappers are not `Clone`; use [`GlContext::share`] to take another counted reference.
/// Dropping a wrapper releases its reference.
///
/// ### 中文
/// 对 [`ContextProvider`] 中已登记原生上下文的一个引用。
///
/// 封装不实现 `Clone`；需要另一个计数引用时使用 [`GlContext::share`]。
/// Drop 封装会释放其引用。
pub struct GlContext<B: NativeBackend> {
    provider: Arc<ContextProvider<B>>,
    handle: B::Handle,
    capabilities: Arc<Capabilities>,
    owned: bool,
    released: AtomicBool,
}

impl<B: NativeBackend> GlContext<B> {
    pub(super) fn new(
        provider: Arc<ContextProvider<B>>,
        handle: B::Handle,
        capabilities: Arc<Capabilities>,
        owned: bool,
    ) -> Self {
        Self {
            provider,
            handle,
            capabilities,
            owned,
            released: AtomicBool::new(false),
        }
    }

    #[inline]
    pub fn handle(&self) -> B::Handle {
        self.handle
    }

    #[inline]
    pub fn provider(&self) -> &Arc<ContextProvider<B>> {
        &self.provider
    }

    #[inline]
    pub fn capabilities(&self) -> &Capabilities {
        &self.capabilities
    }

    #[inline]
    pub fn gl(&self) -> &dyn GlApi {
        self.capabilities.gl()
    }

    #[inline]
    pub fn shared_gl(&self) -> SharedGl {
        self.capabilities.shared_gl()
    }

    /// ### English
    /// Whether the native context was created by this crate (and is destroyed with its last wrapper).
    ///
    /// ### 中文
    /// 原生上下文是否由本 crate 创建（并随最后一个封装一起销毁）。
    #[inline]
    pub fn is_owned(&self) -> bool {
        self.owned
    }

    #[inline]
    pub fn is_destroyed(&self) -> bool {
        self.released.load(Ordering::Acquire)
    }

    #[inline]
    pub fn is_current(&self) -> bool {
        self.provider.is_current(self)
    }

    fn ensure_alive(&self) -> ContextResult<()> {
        if self.is_destroyed() {
            return Err(ContextError::Destroyed);
        }
        Ok(())
    }

    /// ### English
    /// Makes this context current on the calling thread (no-op if it already is).
    ///
    /// ### 中文
    /// 使该上下文在调用线程上成为 current（若已是则为 no-op）。
    pub fn make_current(&self) -> ContextResult<()> {
        self.ensure_alive()?;
        if self.is_current() {
            return Ok(());
        }
        self.provider.backend().make_current(self.handle)
    }

    /// ### English
    /// Releases this context from the calling thread if it is current there.
    ///
    /// ### 中文
    /// 若该上下文在调用线程上为 current，则将其释放。
    pub fn release_current(&self) -> ContextResult<()> {
        if !self.is_current() {
            return Ok(());
        }
        self.provider.backend().release_current()
    }

    /// ### English
    /// Creates an owned offscreen child context sharing this context's objects.
    ///
    /// ### 中文
    /// 创建一个与本上下文共享对象、由我们持有的离屏子上下文。
    pub fn derive_offscreen(&self) -> ContextResult<GlContext<B>> {
        self.ensure_alive()?;
        self.provider.create_offscreen(self)
    }

    /// ### English
    /// Takes another counted reference to the same native context.
    ///
    /// ### 中文
    /// 获取同一原生上下文的另一个计数引用。
    pub fn share(&self) -> ContextResult<GlContext<B>> {
        self.ensure_alive()?;
        self.provider.acquire(self.handle, self.owned)
    }

    /// ### English
    /// Releases this wrapper's reference. Returns `true` only for the first call.
    ///
    /// ### 中文
    /// 释放本封装持有的引用。只有第一次调用返回 `true`。
    pub fn destroy(&self) -> bool {
        if self
            .released
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            log::trace!("context {:?} wrapper already destroyed", self.handle);
            return false;
        }
        self.provider.release(self.handle);
        true
    }
}

impl<B: NativeBackend> fmt::Debug for GlContext<B> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GlContext")
            .field("backend", &self.provider.backend().name())
            .field("handle", &self.handle)
            .field("owned", &self.owned)
            .field("destroyed", &self.is_destroyed())
            .finish()
    }
}

impl<B: NativeBackend> Drop for GlContext<B> {
    fn drop(&mut self) {
        if !self.released.load(Ordering::Acquire) {
            self.destroy();
        }
    }
}
