//! Console progress line on stderr, throttled.

use ondemand_core::fetcher::ProgressSink;
use std::io::Write;
use std::sync::Mutex;
use std::time::{Duration, Instant};

const PROGRESS_INTERVAL: Duration = Duration::from_millis(500);

pub struct ConsoleProgress {
    started: Instant,
    last_print: Mutex<Option<Instant>>,
}

impl ConsoleProgress {
    pub fn new() -> Self {
        Self {
            started: Instant::now(),
            last_print: Mutex::new(None),
        }
    }

    fn line(&self, received: u64, total: Option<u64>) -> String {
        let done_mib = received as f64 / 1_048_576.0;
        let elapsed = self.started.elapsed().as_secs_f64();
        let rate = if elapsed > 0.0 { done_mib / elapsed } else { 0.0 };
        match total {
            Some(t) if t > 0 => format!(
                "{:.1} / {:.1} MiB ({:.0}%)  {:.2} MiB/s",
                done_mib,
                t as f64 / 1_048_576.0,
                received as f64 * 100.0 / t as f64,
                rate
            ),
            _ => format!("{:.1} MiB  {:.2} MiB/s", done_mib, rate),
        }
    }
}

impl ProgressSink for ConsoleProgress {
    fn on_start(&self, name: &str, _total: Option<u64>) {
        eprintln!("Downloading {}", name);
    }

    fn on_progress(&self, received: u64, total: Option<u64>) {
        let mut last = match self.last_print.lock() {
            Ok(g) => g,
            Err(_) => return,
        };
        let now = Instant::now();
        if last.map_or(false, |t| now.duration_since(t) < PROGRESS_INTERVAL) {
            return;
        }
        *last = Some(now);
        let mut err = std::io::stderr();
        let _ = write!(err, "\r{}", self.line(received, total));
        let _ = err.flush();
    }

    fn on_finish(&self, received: u64) {
        eprintln!("\r{}", self.line(received, Some(received)));
    }
}
