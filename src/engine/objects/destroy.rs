//! ### English
//! Exactly-once destruction guard.
//!
//! ### 中文
//! 恰好一次的销毁守卫。

use std::sync::atomic::{AtomicBool, Ordering};

/// ### English
/// Compare-and-swap flag deciding which caller performs the native deletion.
///
/// Teardown paths and shared context wrappers may race to destroy the same object; the loser
/// gets `false` and must not touch the native handle.
///
/// ### 中文
/// 通过 CAS 决定由哪个调用者执行原生删除的标志。
///
/// 销毁路径与共享上下文封装可能竞争销毁同一个对象；失败方得到 `false`，且不得再操作原生句柄。
#[derive(Debug, Default)]
pub struct DestroyFlag(AtomicBool);

impl DestroyFlag {
    #[inline]
    pub const fn new() -> Self {
        Self(AtomicBool::new(false))
    }

    /// ### English
    /// Marks the object destroyed. Returns `true` only for the first caller.
    ///
    /// #### Parameters
    /// - `kind`: Object kind used in the trace message for repeated calls.
    /// - `id`: Native id used in the trace message for repeated calls.
    ///
    /// ### 中文
    /// 将对象标记为已销毁。只有第一个调用者得到 `true`。
    ///
    /// #### 参数
    /// - `kind`：重复调用时日志中使用的对象类型。
    /// - `id`：重复调用时日志中使用的原生 id。
    #[inline]
    pub fn mark(&self, kind: &'static str, id: u32) -> bool {
        let first = self
            .0
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_ok();
        if !first {
            log::trace!("{kind} {id} already destroyed; ignoring repeated destroy");
        }
        first
    }

    #[inline]
    pub fn is_set(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}

#[cfg(test)]
mod tests {
    use super::DestroyFlag;

    #[test]
    fn only_first_mark_wins() {
        let flag = DestroyFlag::new();
        assert!(!flag.is_set());
        assert!(flag.mark("texture", 1));
        assert!(!flag.mark("texture", 1));
        assert!(flag.is_set());
    }
}
