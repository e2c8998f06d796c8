//! Progress reporting for a single artifact transfer.

use std::sync::atomic::{AtomicU64, Ordering};

/// Receives cumulative byte counts while a body streams to disk.
///
/// Called from inside the libcurl write callback, so implementations must be cheap.
pub trait ProgressSink {
    fn on_start(&self, _name: &str, _total: Option<u64>) {}
    fn on_progress(&self, received: u64, total: Option<u64>);
    fn on_finish(&self, _received: u64) {}
}

/// Discards all progress events.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoProgress;

impl ProgressSink for NoProgress {
    fn on_progress(&self, _received: u64, _total: Option<u64>) {}
}

/// Logs progress through `tracing` at coarse steps: every 10% when the total is
/// known, otherwise every `UNKNOWN_TOTAL_STEP` bytes.
#[derive(Debug, Default)]
pub struct LogProgress {
    last_step: AtomicU64,
}

const UNKNOWN_TOTAL_STEP: u64 = 16 * 1024 * 1024;

impl LogProgress {
    pub fn new() -> Self {
        Self::default()
    }

    fn step_of(received: u64, total: Option<u64>) -> u64 {
        match total {
            Some(t) if t > 0 => received.saturating_mul(10) / t,
            _ => received / UNKNOWN_TOTAL_STEP,
        }
    }
}

impl ProgressSink for LogProgress {
    fn on_start(&self, name: &str, total: Option<u64>) {
        self.last_step.store(0, Ordering::Relaxed);
        match total {
            Some(t) => tracing::info!(name, bytes = t, "downloading"),
            None => tracing::info!(name, "downloading (size unknown)"),
        }
    }

    fn on_progress(&self, received: u64, total: Option<u64>) {
        let step = Self::step_of(received, total);
        if step > self.last_step.fetch_max(step, Ordering::Relaxed) {
            match total {
                Some(t) => tracing::debug!(received, total = t, "{}%", step * 10),
                None => tracing::debug!(received, "progress"),
            }
        }
    }

    fn on_finish(&self, received: u64) {
        tracing::info!(bytes = received, "download complete");
    }
}
