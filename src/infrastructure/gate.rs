//! Wall-clock scheduling: maintenance windows, pacing and backoff sleeps.

use async_trait::async_trait;
use chrono::{DateTime, Timelike, Utc};
use std::sync::Mutex;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

use crate::domain::{SchedulingGate, SourceName};

const SECONDS_PER_DAY: u32 = 24 * 60 * 60;

/// A daily blackout interval in a fixed reference offset.
///
/// `end` before `start` means the window crosses midnight.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MaintenanceWindow {
    start_minute: u32,
    end_minute: u32,
    utc_offset_minutes: i32,
}

impl MaintenanceWindow {
    /// Minutes are counted from local midnight; the offset is east of UTC.
    pub fn daily(start_minute: u32, end_minute: u32, utc_offset_minutes: i32) -> Self {
        Self {
            start_minute: start_minute % (24 * 60),
            end_minute: end_minute % (24 * 60),
            utc_offset_minutes,
        }
    }

    /// Time left until the window closes, or `None` when `now` is outside it.
    pub fn remaining(&self, now: DateTime<Utc>) -> Option<Duration> {
        let local = now + chrono::Duration::minutes(i64::from(self.utc_offset_minutes));
        let t = local.num_seconds_from_midnight();
        let start = self.start_minute * 60;
        let end = self.end_minute * 60;

        let left: Option<u32> = if start <= end {
            (start..end).contains(&t).then(|| end - t)
        } else if t >= start {
            Some(SECONDS_PER_DAY - t + end)
        } else if t < end {
            Some(end - t)
        } else {
            None
        };

        left.map(|secs| Duration::from_secs(u64::from(secs)))
    }
}

/// Production gate: real sleeps, interrupted early when the batch is cancelled.
pub struct WallClockGate {
    windows: Vec<(SourceName, MaintenanceWindow)>,
    cancel: CancellationToken,
}

impl WallClockGate {
    pub fn new(windows: Vec<(SourceName, MaintenanceWindow)>, cancel: CancellationToken) -> Self {
        Self { windows, cancel }
    }
}

#[async_trait]
impl SchedulingGate for WallClockGate {
    async fn wait_if_needed(&self, source: SourceName) {
        for (_, window) in self.windows.iter().filter(|(s, _)| *s == source) {
            if let Some(left) = window.remaining(Utc::now()) {
                tracing::info!(
                    "{} is in its maintenance window, pausing for {}s",
                    source,
                    left.as_secs()
                );
                self.sleep(left).await;
            }
        }
    }

    async fn sleep(&self, duration: Duration) {
        if duration.is_zero() {
            return;
        }
        tokio::select! {
            _ = self.cancel.cancelled() => {}
            _ = tokio::time::sleep(duration) => {}
        }
    }
}

/// Zero-delay gate that records every requested wait.
#[derive(Default)]
pub struct RecordingGate {
    sleeps: Mutex<Vec<Duration>>,
    window_checks: Mutex<Vec<SourceName>>,
}

impl RecordingGate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sleeps(&self) -> Vec<Duration> {
        self.sleeps.lock().map(|s| s.clone()).unwrap_or_default()
    }

    pub fn window_checks(&self) -> Vec<SourceName> {
        self.window_checks
            .lock()
            .map(|s| s.clone())
            .unwrap_or_default()
    }

    pub fn clear(&self) {
        if let Ok(mut sleeps) = self.sleeps.lock() {
            sleeps.clear();
        }
        if let Ok(mut checks) = self.window_checks.lock() {
            checks.clear();
        }
    }
}

#[async_trait]
impl SchedulingGate for RecordingGate {
    async fn wait_if_needed(&self, source: SourceName) {
        if let Ok(mut checks) = self.window_checks.lock() {
            checks.push(source);
        }
    }

    async fn sleep(&self, duration: Duration) {
        if let Ok(mut sleeps) = self.sleeps.lock() {
            sleeps.push(duration);
        }
    }
}
