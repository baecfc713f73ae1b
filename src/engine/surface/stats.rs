//! ### English
//! Rolling-window frame statistics.
//!
//! ### 中文
//! 滚动窗口帧统计。

use std::collections::VecDeque;
use std::ops::{Add, Div};
use std::time::{Duration, Instant};

/// ### English
/// Which end of the distribution a percentile is taken from.
///
/// ### 中文
/// 百分位从分布的哪一端取值。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Percentile {
    /// ### English
    /// Index `floor(p * n)` of the ascending samples.
    ///
    /// ### 中文
    /// 升序样本中的下标 `floor(p * n)`。
    #[default]
    Up,
    /// ### English
    /// Index `n - floor(p * n) - 1` of the ascending samples.
    ///
    /// ### 中文
    /// 升序样本中的下标 `n - floor(p * n) - 1`。
    Lowest,
}

/// ### English
/// Sample types the statistics can be computed over.
///
/// ### 中文
/// 可用于统计计算的样本类型。
pub trait Sample: Copy + PartialOrd + Add<Output = Self> + Default {
    fn divide(self, count: usize) -> Self;
}

impl Sample for Duration {
    #[inline]
    fn divide(self, count: usize) -> Self {
        self.div(count as u32)
    }
}

impl Sample for f64 {
    #[inline]
    fn divide(self, count: usize) -> Self {
        self / count as f64
    }
}

/// ### English
/// Summary statistics over a sorted sample set. Empty sets report zero everywhere.
///
/// ### 中文
/// 基于已排序样本集的汇总统计。空集合的所有值均为 0。
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Stats<T> {
    sorted: Vec<T>,
}

pub type DurationStats = Stats<Duration>;
pub type RateStats = Stats<f64>;

impl<T: Sample> Stats<T> {
    pub fn new(mut values: Vec<T>) -> Self {
        values.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
        Self { sorted: values }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.sorted.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.sorted.is_empty()
    }

    #[inline]
    pub fn values(&self) -> &[T] {
        &self.sorted
    }

    pub fn sum(&self) -> T {
        self.sorted.iter().fold(T::default(), |acc, &v| acc + v)
    }

    pub fn average(&self) -> T {
        if self.sorted.is_empty() {
            return T::default();
        }
        self.sum().divide(self.sorted.len())
    }

    pub fn min(&self) -> T {
        self.sorted.first().copied().unwrap_or_default()
    }

    pub fn max(&self) -> T {
        self.sorted.last().copied().unwrap_or_default()
    }

    pub fn median(&self) -> T {
        let n = self.sorted.len();
        match n {
            0 => T::default(),
            _ if n % 2 == 0 => (self.sorted[n / 2 - 1] + self.sorted[n / 2]).divide(2),
            _ => self.sorted[n / 2],
        }
    }

    /// ### English
    /// Percentile `p` in `[0, 1]`; the index is clamped into range.
    ///
    /// ### 中文
    /// `[0, 1]` 区间内的百分位 `p`；下标会被限制在有效范围内。
    pub fn percentile(&self, p: f64, direction: Percentile) -> T {
        let n = self.sorted.len();
        if n == 0 {
            return T::default();
        }
        let rank = (p.clamp(0.0, 1.0) * n as f64) as usize;
        let index = match direction {
            Percentile::Up => rank,
            Percentile::Lowest => n.saturating_sub(rank + 1),
        };
        self.sorted[index.min(n - 1)]
    }
}

/// ### English
/// `(timestamp, elapsed)` samples kept for a fixed window, pruned on every insertion.
///
/// ### 中文
/// 在固定窗口内保存的 `(时间戳, 耗时)` 样本，每次插入时裁剪。
#[derive(Debug, Clone)]
pub struct RollingWindowStatistics {
    window: Duration,
    samples: VecDeque<(Instant, Duration)>,
}

impl RollingWindowStatistics {
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            samples: VecDeque::new(),
        }
    }

    #[inline]
    pub fn window(&self) -> Duration {
        self.window
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// ### English
    /// Records one sample and drops samples older than `at - window`.
    ///
    /// ### 中文
    /// 记录一个样本，并丢弃早于 `at - window` 的样本。
    pub fn add(&mut self, at: Instant, elapsed: Duration) {
        let insert_at = self.samples.partition_point(|&(t, _)| t <= at);
        self.samples.insert(insert_at, (at, elapsed));
        if let Some(cutoff) = at.checked_sub(self.window) {
            while self.samples.front().is_some_and(|&(t, _)| t < cutoff) {
                self.samples.pop_front();
            }
        }
    }

    /// ### English
    /// Statistics of the recorded durations.
    ///
    /// ### 中文
    /// 已记录耗时的统计。
    pub fn frame_times(&self) -> DurationStats {
        Stats::new(self.samples.iter().map(|&(_, d)| d).collect())
    }

    /// ### English
    /// Frames per second derived from consecutive timestamps; needs at least two samples.
    ///
    /// ### 中文
    /// 由相邻时间戳推导出的每秒帧数；至少需要两个样本。
    pub fn fps(&self) -> RateStats {
        let rates = self
            .samples
            .iter()
            .zip(self.samples.iter().skip(1))
            .filter_map(|(&(a, _), &(b, _))| {
                let gap = b.duration_since(a).as_secs_f64();
                (gap > 0.0).then(|| 1.0 / gap)
            })
            .collect();
        Stats::new(rates)
    }
}

impl Default for RollingWindowStatistics {
    fn default() -> Self {
        Self::new(Duration::from_secs(5))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ms(v: u64) -> Duration {
        Duration::from_millis(v)
    }

    #[test]
    fn duration_stats_match_definitions() {
        let stats = DurationStats::new(vec![ms(4), ms(1), ms(3), ms(2)]);
        assert_eq!(stats.sum(), ms(10));
        assert_eq!(stats.average(), Duration::from_micros(2500));
        assert_eq!(stats.min(), ms(1));
        assert_eq!(stats.max(), ms(4));
        assert_eq!(stats.median(), Duration::from_micros(2500));
        assert_eq!(stats.percentile(0.5, Percentile::Up), ms(3));
        assert_eq!(stats.percentile(0.25, Percentile::Lowest), ms(3));
        assert_eq!(stats.percentile(1.0, Percentile::Up), ms(4));
        assert_eq!(stats.percentile(1.0, Percentile::Lowest), ms(1));
    }

    #[test]
    fn empty_stats_are_zero() {
        let stats = DurationStats::new(Vec::new());
        assert_eq!(stats.average(), Duration::ZERO);
        assert_eq!(stats.median(), Duration::ZERO);
        assert_eq!(stats.percentile(0.99, Percentile::Up), Duration::ZERO);
        assert_eq!(RateStats::new(Vec::new()).max(), 0.0);
    }

    #[test]
    fn window_prunes_old_samples() {
        let start = Instant::now();
        let mut stats = RollingWindowStatistics::new(ms(100));
        stats.add(start, ms(1));
        stats.add(start + ms(50), ms(2));
        stats.add(start + ms(120), ms(3));

        assert_eq!(stats.len(), 2);
        assert_eq!(stats.frame_times().min(), ms(2));
    }

    #[test]
    fn fps_comes_from_timestamp_gaps() {
        let start = Instant::now();
        let mut stats = RollingWindowStatistics::new(Duration::from_secs(5));
        assert!(stats.fps().is_empty());

        for i in 0..5 {
            stats.add(start + ms(i * 20), ms(1));
        }
        let fps = stats.fps();
        assert_eq!(fps.len(), 4);
        assert!((fps.average() - 50.0).abs() < 1e-6);
    }
}
