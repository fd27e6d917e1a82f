//! 預覽播放計時
//!
//! 使用單調時鐘（`Instant`），不受系統時間調整影響。
//! 暫停期間不計時：終端機被掛起或使用者按下暫停時呼叫 `pause`，
//! 這段時間視為未播放，匯出時不會算進去。

use std::time::{Duration, Instant};

#[derive(Debug, Clone, Copy, Default)]
pub struct PlaybackClock {
    started_at: Option<Instant>,
    accumulated: Duration,
    running: bool,
}

impl PlaybackClock {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            started_at: None,
            accumulated: Duration::ZERO,
            running: false,
        }
    }

    /// 重設並開始計時
    pub fn start(&mut self) {
        self.start_at(Instant::now());
    }

    pub fn start_at(&mut self, now: Instant) {
        self.accumulated = Duration::ZERO;
        self.started_at = Some(now);
        self.running = true;
    }

    pub fn pause(&mut self) {
        self.pause_at(Instant::now());
    }

    pub fn pause_at(&mut self, now: Instant) {
        if self.running {
            self.accumulated = self.elapsed_at(now);
            self.running = false;
        }
    }

    pub fn resume(&mut self) {
        self.resume_at(Instant::now());
    }

    /// 只有先前啟動過且已暫停時才會繼續
    pub fn resume_at(&mut self, now: Instant) {
        if !self.running && self.started_at.is_some() {
            self.started_at = Some(now);
            self.running = true;
        }
    }

    /// 停止並凍結目前的累計時間
    pub fn stop(&mut self) {
        self.pause();
    }

    pub fn stop_at(&mut self, now: Instant) {
        self.pause_at(now);
    }

    #[must_use]
    pub const fn is_running(&self) -> bool {
        self.running
    }

    #[must_use]
    pub fn elapsed(&self) -> Duration {
        self.elapsed_at(Instant::now())
    }

    #[must_use]
    pub fn elapsed_at(&self, now: Instant) -> Duration {
        match (self.running, self.started_at) {
            (true, Some(started_at)) => {
                self.accumulated + now.saturating_duration_since(started_at)
            }
            _ => self.accumulated,
        }
    }

    #[must_use]
    pub fn elapsed_ms(&self) -> u64 {
        u64::try_from(self.elapsed().as_millis()).unwrap_or(u64::MAX)
    }
}
