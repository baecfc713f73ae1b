//! ### English
//! Coalesced wake-up signal for the render thread.
//!
//! ### 中文
//! 渲染线程的合并唤醒信号。

use std::time::Duration;

use crossbeam_channel as channel;

/// ### English
/// Cross-thread "redraw now" trigger. Requests issued before the render thread wakes collapse
/// into one wake-up.
///
/// ### 中文
/// 跨线程的“立即重绘”触发器。渲染线程醒来之前发出的多次请求会合并为一次唤醒。
#[derive(Debug, Clone)]
pub struct RedrawRequester {
    tx: channel::Sender<()>,
}

impl RedrawRequester {
    #[inline]
    pub fn request_redraw(&self) {
        /* ### English
        A full slot already guarantees a wake-up; a closed channel means the loop is gone.
        ### 中文
        槽位已满说明唤醒已被保证；channel 关闭说明循环已退出。 */
        let _ = self.tx.try_send(());
    }
}

/// ### English
/// Receiving end owned by the render thread.
///
/// ### 中文
/// 由渲染线程持有的接收端。
pub(super) struct Wakeup {
    rx: channel::Receiver<()>,
}

impl Wakeup {
    /// ### English
    /// Sleeps until woken or `timeout` elapses; returns `true` if woken.
    ///
    /// ### 中文
    /// 休眠直到被唤醒或 `timeout` 到期；被唤醒时返回 `true`。
    pub(super) fn wait_timeout(&self, timeout: Duration) -> bool {
        match self.rx.recv_timeout(timeout) {
            Ok(()) => true,
            Err(channel::RecvTimeoutError::Timeout) => false,
            Err(channel::RecvTimeoutError::Disconnected) => true,
        }
    }

    /// ### English
    /// Sleeps until woken.
    ///
    /// ### 中文
    /// 休眠直到被唤醒。
    pub(super) fn wait(&self) {
        let _ = self.rx.recv();
    }
}

pub(super) fn redraw_channel() -> (RedrawRequester, Wakeup) {
    let (tx, rx) = channel::bounded(1);
    (RedrawRequester { tx }, Wakeup { rx })
}
