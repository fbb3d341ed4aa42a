use std::time::{Duration, Instant};

pub const DEFAULT_IDLE_RESET: Duration = Duration::from_millis(2500);

/// 长时间看不到地主底牌（牌桌离开画面）时触发整局重置
#[derive(Debug, Clone)]
pub struct IdleResetter {
    threshold: Duration,
    last_seen: Instant,
}

impl IdleResetter {
    pub fn new(threshold: Duration, now: Instant) -> Self {
        Self {
            threshold,
            last_seen: now,
        }
    }

    /// 本轮检测到底牌区域的牌
    pub fn touch(&mut self, now: Instant) {
        self.last_seen = now;
    }

    pub fn is_expired(&self, now: Instant) -> bool {
        now.saturating_duration_since(self.last_seen) > self.threshold
    }

    pub fn rearm(&mut self, now: Instant) {
        self.last_seen = now;
    }

    pub fn threshold(&self) -> Duration {
        self.threshold
    }

    pub fn set_threshold(&mut self, threshold: Duration) {
        self.threshold = threshold;
    }
}
