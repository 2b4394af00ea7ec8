//! 退避等待 - 业务能力层
//!
//! 唯一的挂起点：以指数退避轮询一个条件，直到为真或到达上限。
//! 等待失败时返回 false，由调用方决定是否致命。

use std::future::Future;
use std::time::Duration;
use tokio::time::{sleep, Instant};
use tracing::trace;

/// 退避策略
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BackoffPolicy {
    /// 首次等待间隔
    pub base: Duration,
    /// 总等待上限
    pub max: Duration,
    /// 每次失败后的间隔倍数
    pub multiplier: f64,
}

impl BackoffPolicy {
    pub fn new(base: Duration, max: Duration, multiplier: f64) -> Self {
        Self {
            base,
            max,
            multiplier,
        }
    }

    pub fn from_millis(base_ms: u64, max_ms: u64, multiplier: f64) -> Self {
        Self::new(
            Duration::from_millis(base_ms),
            Duration::from_millis(max_ms),
            multiplier,
        )
    }
}

/// 退避等待器
///
/// `dynamic` 为 false 时退化为：固定睡眠 `base` 后只检查一次。
#[derive(Debug, Clone, Copy)]
pub struct BackoffWaiter {
    dynamic: bool,
}

impl Default for BackoffWaiter {
    fn default() -> Self {
        Self::new(true)
    }
}

impl BackoffWaiter {
    pub fn new(dynamic: bool) -> Self {
        Self { dynamic }
    }

    pub fn is_dynamic(&self) -> bool {
        self.dynamic
    }

    /// 轮询 `condition` 直到为真或耗尽 `policy.max`
    ///
    /// # 参数
    /// - `condition`: 条件函数，约定不会失败（调用方把错误映射为 false）
    /// - `policy`: 退避策略
    ///
    /// # 返回
    /// 条件为真返回 true；耗时达到上限仍未满足返回 false
    pub async fn wait_until<F, Fut>(&self, mut condition: F, policy: BackoffPolicy) -> bool
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = bool>,
    {
        if !self.dynamic {
            sleep(policy.base).await;
            return condition().await;
        }

        let start = Instant::now();
        let mut current = policy.base;
        let mut polls: u32 = 0;

        loop {
            polls += 1;
            if condition().await {
                trace!(polls, elapsed_ms = start.elapsed().as_millis() as u64, "条件满足");
                return true;
            }

            let elapsed = start.elapsed();
            if elapsed >= policy.max {
                trace!(polls, "等待超时");
                return false;
            }

            let remaining = policy.max - elapsed;
            sleep(current.min(remaining)).await;

            let remaining = policy.max.saturating_sub(start.elapsed());
            // 非法倍数（负数、NaN、溢出）直接取剩余时间，不让等待器 panic
            current = Duration::try_from_secs_f64(current.as_secs_f64() * policy.multiplier)
                .unwrap_or(remaining)
                .min(remaining);
            // 避免零间隔忙等
            if current.is_zero() {
                current = Duration::from_millis(1);
            }
        }
    }
}
