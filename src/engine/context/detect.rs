//! ### English
//! Backend selection: an explicit override first, otherwise the platform order probed for a
//! context that is already current.
//!
//! ### 中文
//! 后端选择：优先使用显式覆盖，否则按平台顺序探测已 current 的上下文。

use std::fmt;
use std::str::FromStr;

/// ### English
/// Environment variable forcing a backend (`glfw` | `headless`).
///
/// ### 中文
/// 强制指定后端的环境变量（`glfw` | `headless`）。
pub const CONTEXT_BACKEND_ENV: &str = "XIAN_GL_SURFACE_CONTEXT_BACKEND";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BackendKind {
    Glfw,
    Headless,
}

impl BackendKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Glfw => "glfw",
            Self::Headless => "headless",
        }
    }
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BackendKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "glfw" => Ok(Self::Glfw),
            "headless" => Ok(Self::Headless),
            other => Err(format!("unknown context backend `{other}`")),
        }
    }
}

/// ### English
/// Backends probed on this platform, in order. The headless backend is never probed; it is only
/// selected by override.
///
/// ### 中文
/// 本平台按顺序探测的后端。headless 后端从不被探测，只能通过覆盖选择。
#[inline]
pub fn platform_order() -> &'static [BackendKind] {
    &[BackendKind::Glfw]
}

/// ### English
/// Reads [`CONTEXT_BACKEND_ENV`] through `lookup`. Invalid values are logged and ignored.
///
/// ### 中文
/// 通过 `lookup` 读取 [`CONTEXT_BACKEND_ENV`]。非法值会记录日志并被忽略。
pub fn backend_override(lookup: impl Fn(&str) -> Option<String>) -> Option<BackendKind> {
    let value = lookup(CONTEXT_BACKEND_ENV)?;
    match value.parse() {
        Ok(kind) => Some(kind),
        Err(err) => {
            log::warn!("ignoring {CONTEXT_BACKEND_ENV}: {err}");
            None
        }
    }
}

/// ### English
/// Picks the backend: `override_kind` if given, else the first entry of `order` for which
/// `probe` reports a current context.
///
/// #### Parameters
/// - `override_kind`: Explicit selection (from configuration or [`backend_override`]).
/// - `order`: Candidates in priority order, usually [`platform_order`].
/// - `probe`: Returns whether a context of the given backend is current on this thread.
///
/// ### 中文
/// 选择后端：若给出 `override_kind` 则直接使用，否则取 `order` 中第一个 `probe` 报告存在
/// current 上下文的后端。
///
/// #### 参数
/// - `override_kind`：显式选择（来自配置或 [`backend_override`]）。
/// - `order`：按优先级排列的候选，通常为 [`platform_order`]。
/// - `probe`：返回该后端在当前线程上是否有 current 上下文。
pub fn detect_backend(
    override_kind: Option<BackendKind>,
    order: &[BackendKind],
    probe: impl Fn(BackendKind) -> bool,
) -> Option<BackendKind> {
    if let Some(kind) = override_kind {
        log::info!("context backend forced to `{kind}`");
        return Some(kind);
    }
    let detected = order.iter().copied().find(|&kind| probe(kind));
    match detected {
        Some(kind) => log::info!("context backend detected: `{kind}`"),
        None => log::warn!("no context backend has a current context on this thread"),
    }
    detected
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn override_wins_over_probe() {
        let kind = detect_backend(Some(BackendKind::Headless), platform_order(), |_| true);
        assert_eq!(kind, Some(BackendKind::Headless));
    }

    #[test]
    fn probes_in_order() {
        let order = [BackendKind::Headless, BackendKind::Glfw];
        let kind = detect_backend(None, &order, |kind| kind == BackendKind::Glfw);
        assert_eq!(kind, Some(BackendKind::Glfw));
        assert_eq!(detect_backend(None, &order, |_| false), None);
    }

    #[test]
    fn override_is_read_through_lookup() {
        let lookup = |key: &str| (key == CONTEXT_BACKEND_ENV).then(|| "Headless".to_string());
        assert_eq!(backend_override(lookup), Some(BackendKind::Headless));
        assert_eq!(backend_override(|_| Some("egl".to_string())), None);
        assert_eq!(backend_override(|_| None), None);
    }
}
