//! ### English
//! Construction-time configuration: present mode, swap-chain capacity, attachment formats,
//! and render-loop timing.
//!
//! Environment overrides are applied explicitly through [`SwapChainConfig::with_overrides`];
//! nothing here reads process state implicitly.
//!
//! ### 中文
//! 构造期配置：呈现模式、交换链容量、附件格式与渲染循环时序。
//!
//! 环境变量覆盖只通过 [`SwapChainConfig::with_overrides`] 显式应用；此处不会隐式读取进程状态。

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use dpi::PhysicalSize;

use super::error::PoolError;

/// ### English
/// Environment variable selecting the present mode (`fifo` | `mailbox`).
///
/// ### 中文
/// 选择呈现模式的环境变量（`fifo` | `mailbox`）。
pub const PRESENT_MODE_ENV: &str = "XIAN_GL_SURFACE_PRESENT_MODE";

/// ### English
/// Environment variable overriding the swap-chain capacity.
///
/// ### 中文
/// 覆盖交换链容量的环境变量。
pub const SWAP_CHAIN_SIZE_ENV: &str = "XIAN_GL_SURFACE_SWAP_CHAIN_SIZE";

pub const DEFAULT_SWAP_CHAIN_CAPACITY: usize = 10;

/// ### English
/// Smallest usable capacity: one framebuffer on screen plus one being drawn.
///
/// ### 中文
/// 最小可用容量：一个用于显示，一个用于绘制。
pub const MIN_SWAP_CHAIN_CAPACITY: usize = 2;

/// ### English
/// Presentation policy of a swap chain.
///
/// ### 中文
/// 交换链的呈现策略。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum PresentMode {
    /// ### English
    /// Every frame is shown, in production order; the producer is paced by the consumer.
    ///
    /// ### 中文
    /// 每一帧都按生产顺序显示；生产者受消费者节奏约束。
    #[default]
    Fifo,
    /// ### English
    /// Only the newest finished frame is shown; older pending frames are recycled.
    ///
    /// ### 中文
    /// 只显示最新完成的帧；更旧的待显示帧会被回收。
    Mailbox,
}

impl PresentMode {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Fifo => "fifo",
            Self::Mailbox => "mailbox",
        }
    }
}

impl fmt::Display for PresentMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown present mode `{0}` (expected `fifo` or `mailbox`)")]
pub struct ParsePresentModeError(String);

impl FromStr for PresentMode {
    type Err = ParsePresentModeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "fifo" => Ok(Self::Fifo),
            "mailbox" => Ok(Self::Mailbox),
            _ => Err(ParsePresentModeError(s.to_string())),
        }
    }
}

/// ### English
/// Texture sampling parameters applied to color attachments.
///
/// ### 中文
/// 应用于颜色附件的纹理采样参数。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SamplingParams {
    pub min_filter: u32,
    pub mag_filter: u32,
    pub wrap_s: u32,
    pub wrap_t: u32,
}

impl Default for SamplingParams {
    fn default() -> Self {
        Self {
            min_filter: glow::LINEAR,
            mag_filter: glow::LINEAR,
            wrap_s: glow::CLAMP_TO_EDGE,
            wrap_t: glow::CLAMP_TO_EDGE,
        }
    }
}

/// ### English
/// Attachment formats used by the framebuffer factory.
///
/// ### 中文
/// framebuffer 工厂使用的附件格式。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FramebufferFormat {
    /// ### English
    /// Color texture target (`TEXTURE_2D` or `TEXTURE_RECTANGLE`).
    ///
    /// ### 中文
    /// 颜色纹理目标（`TEXTURE_2D` 或 `TEXTURE_RECTANGLE`）。
    pub color_target: u32,
    pub color_internal_format: u32,
    pub depth_stencil_internal_format: u32,
    pub sampling: SamplingParams,
}

impl Default for FramebufferFormat {
    fn default() -> Self {
        Self {
            color_target: glow::TEXTURE_2D,
            color_internal_format: glow::RGBA8,
            depth_stencil_internal_format: glow::DEPTH24_STENCIL8,
            sampling: SamplingParams::default(),
        }
    }
}

/// ### English
/// Strategy selector plus capacity, resolved once when a pool is constructed.
///
/// ### 中文
/// 策略选择与容量，在构造池时一次性确定。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SwapChainConfig {
    pub present_mode: PresentMode,
    pub capacity: usize,
    pub format: FramebufferFormat,
}

impl Default for SwapChainConfig {
    fn default() -> Self {
        Self {
            present_mode: PresentMode::default(),
            capacity: DEFAULT_SWAP_CHAIN_CAPACITY,
            format: FramebufferFormat::default(),
        }
    }
}

impl SwapChainConfig {
    #[inline]
    pub fn new(present_mode: PresentMode, capacity: usize) -> Self {
        Self {
            present_mode,
            capacity,
            format: FramebufferFormat::default(),
        }
    }

    /// ### English
    /// Rejects capacities below [`MIN_SWAP_CHAIN_CAPACITY`].
    ///
    /// ### 中文
    /// 拒绝小于 [`MIN_SWAP_CHAIN_CAPACITY`] 的容量。
    pub fn validate(&self) -> Result<(), PoolError> {
        if self.capacity < MIN_SWAP_CHAIN_CAPACITY {
            return Err(PoolError::InvalidCapacity {
                requested: self.capacity,
                minimum: MIN_SWAP_CHAIN_CAPACITY,
            });
        }
        Ok(())
    }

    /// ### English
    /// Applies [`PRESENT_MODE_ENV`] / [`SWAP_CHAIN_SIZE_ENV`] looked up through `lookup`.
    /// Invalid values are logged and ignored.
    ///
    /// #### Parameters
    /// - `lookup`: Variable lookup, usually `|key| std::env::var(key).ok()`.
    ///
    /// ### 中文
    /// 通过 `lookup` 查询并应用 [`PRESENT_MODE_ENV`] / [`SWAP_CHAIN_SIZE_ENV`]。
    /// 非法值会记录日志并被忽略。
    ///
    /// #### 参数
    /// - `lookup`：变量查询函数，通常为 `|key| std::env::var(key).ok()`。
    pub fn with_overrides(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        if let Some(value) = lookup(PRESENT_MODE_ENV) {
            match value.parse::<PresentMode>() {
                Ok(mode) => {
                    log::info!("present mode overridden by {PRESENT_MODE_ENV}: {mode}");
                    self.present_mode = mode;
                }
                Err(err) => log::warn!("ignoring {PRESENT_MODE_ENV}: {err}"),
            }
        }

        if let Some(value) = lookup(SWAP_CHAIN_SIZE_ENV) {
            match value.trim().parse::<usize>() {
                Ok(capacity) if capacity >= MIN_SWAP_CHAIN_CAPACITY => {
                    log::info!("swap chain capacity overridden by {SWAP_CHAIN_SIZE_ENV}: {capacity}");
                    self.capacity = capacity;
                }
                _ => log::warn!(
                    "ignoring {SWAP_CHAIN_SIZE_ENV}={value:?}: expected an integer >= {MIN_SWAP_CHAIN_CAPACITY}"
                ),
            }
        }

        self
    }

    /// ### English
    /// Applies overrides from the process environment.
    ///
    /// ### 中文
    /// 应用来自进程环境变量的覆盖。
    #[inline]
    pub fn with_env_overrides(self) -> Self {
        self.with_overrides(|key| std::env::var(key).ok())
    }
}

/// ### English
/// Configuration of one rendered surface and its render loop.
///
/// ### 中文
/// 单个渲染表面及其渲染循环的配置。
#[derive(Debug, Clone, PartialEq)]
pub struct SurfaceConfig {
    pub swap_chain: SwapChainConfig,
    /// ### English
    /// Component size known at launch; the loop waits until the size is non-zero.
    ///
    /// ### 中文
    /// 启动时已知的组件尺寸；循环会等待尺寸变为非 0。
    pub initial_size: PhysicalSize<u32>,
    /// ### English
    /// Fixed framebuffer size that takes precedence over component resizes.
    ///
    /// ### 中文
    /// 固定的 framebuffer 尺寸，优先于组件尺寸变化。
    pub size_override: Option<PhysicalSize<u32>>,
    /// ### English
    /// Redraw delay used when the draw callback does not request one.
    ///
    /// ### 中文
    /// 绘制回调未指定时使用的重绘间隔。
    pub default_frame_interval: Duration,
    /// ### English
    /// Wait before retrying when every framebuffer is in use.
    ///
    /// ### 中文
    /// 所有 framebuffer 都在使用时，重试前的等待时间。
    pub no_framebuffer_backoff: Duration,
    pub initial_size_poll: Duration,
    pub statistics_window: Duration,
}

impl Default for SurfaceConfig {
    fn default() -> Self {
        Self {
            swap_chain: SwapChainConfig::default(),
            initial_size: PhysicalSize::new(0, 0),
            size_override: None,
            default_frame_interval: Duration::from_nanos(1_000_000_000 / 60),
            no_framebuffer_backoff: Duration::from_millis(1),
            initial_size_poll: Duration::from_millis(10),
            statistics_window: Duration::from_secs(5),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn present_mode_parses_case_insensitively() {
        assert_eq!("FIFO".parse::<PresentMode>(), Ok(PresentMode::Fifo));
        assert_eq!(" mailbox ".parse::<PresentMode>(), Ok(PresentMode::Mailbox));
        assert!("triple".parse::<PresentMode>().is_err());
    }

    #[test]
    fn overrides_replace_mode_and_capacity() {
        let config = SwapChainConfig::default()
            .with_overrides(lookup(&[(PRESENT_MODE_ENV, "mailbox"), (SWAP_CHAIN_SIZE_ENV, "4")]));
        assert_eq!(config.present_mode, PresentMode::Mailbox);
        assert_eq!(config.capacity, 4);
    }

    #[test]
    fn invalid_overrides_are_ignored() {
        let config = SwapChainConfig::default()
            .with_overrides(lookup(&[(PRESENT_MODE_ENV, "vsync"), (SWAP_CHAIN_SIZE_ENV, "1")]));
        assert_eq!(config, SwapChainConfig::default());
    }

    #[test]
    fn capacity_below_minimum_is_rejected() {
        assert!(SwapChainConfig::new(PresentMode::Fifo, 1).validate().is_err());
        assert!(SwapChainConfig::new(PresentMode::Fifo, 2).validate().is_ok());
    }

    #[test]
    fn default_frame_interval_is_sixty_hertz() {
        let interval = SurfaceConfig::default().default_frame_interval;
        assert_eq!(interval.as_nanos(), 16_666_666);
    }
}
