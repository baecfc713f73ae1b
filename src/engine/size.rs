//! ### English
//! Lock-free storage for a pixel size shared between the UI thread and the render thread.
//!
//! ### 中文
//! UI 线程与渲染线程之间共享像素尺寸的无锁存储。

use std::sync::atomic::{AtomicU64, Ordering};

use dpi::PhysicalSize;

/// ### English
/// A `PhysicalSize<u32>` packed into one `AtomicU64` (`width << 32 | height`).
///
/// ### 中文
/// 打包进单个 `AtomicU64` 的 `PhysicalSize<u32>`（`width << 32 | height`）。
#[derive(Debug, Default)]
pub struct AtomicSize(AtomicU64);

#[inline]
fn pack(size: PhysicalSize<u32>) -> u64 {
    ((size.width as u64) << 32) | size.height as u64
}

#[inline]
fn unpack(bits: u64) -> PhysicalSize<u32> {
    PhysicalSize::new((bits >> 32) as u32, bits as u32)
}

impl AtomicSize {
    #[inline]
    pub fn new(size: PhysicalSize<u32>) -> Self {
        Self(AtomicU64::new(pack(size)))
    }

    #[inline]
    pub fn load(&self) -> PhysicalSize<u32> {
        unpack(self.0.load(Ordering::Acquire))
    }

    #[inline]
    pub fn store(&self, size: PhysicalSize<u32>) {
        self.0.store(pack(size), Ordering::Release);
    }

    /// ### English
    /// Stores `size` and returns whether it differs from the previous value.
    ///
    /// ### 中文
    /// 写入 `size`，并返回它是否与旧值不同。
    #[inline]
    pub fn replace(&self, size: PhysicalSize<u32>) -> bool {
        self.0.swap(pack(size), Ordering::AcqRel) != pack(size)
    }
}

/// ### English
/// Returns `true` when either dimension is zero (nothing can be allocated for it).
///
/// ### 中文
/// 任一维度为 0 时返回 `true`（无法为其分配资源）。
#[inline]
pub fn is_empty(size: PhysicalSize<u32>) -> bool {
    size.width == 0 || size.height == 0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn packs_both_dimensions() {
        let size = AtomicSize::new(PhysicalSize::new(1920, 1080));
        assert_eq!(size.load(), PhysicalSize::new(1920, 1080));

        assert!(size.replace(PhysicalSize::new(u32::MAX, 1)));
        assert_eq!(size.load(), PhysicalSize::new(u32::MAX, 1));
        assert!(!size.replace(PhysicalSize::new(u32::MAX, 1)));
    }

    #[test]
    fn zero_dimension_is_empty() {
        assert!(is_empty(PhysicalSize::new(0, 10)));
        assert!(is_empty(PhysicalSize::new(10, 0)));
        assert!(!is_empty(PhysicalSize::new(1, 1)));
    }
}
