//! Progress reporting for resumable uploads.
//!
//! The remaining-time estimate is a straight extrapolation: if `p` percent took `elapsed`, the
//! whole upload takes `elapsed / (p / 100)`.

use std::time::{Duration, Instant};

use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};

/// Default size of each chunk sent to a resumable upload session (1 MiB).
///
/// Google requires chunk sizes to be a multiple of 256 KiB except for the final chunk.
pub const DEFAULT_CHUNK_SIZE: u64 = 1024 * 1024;

const PROGRESS_TEMPLATE: &str = "Upload progress: {pos}% - Estimated completion: {msg}";

/// Upload progress information emitted after every acknowledged chunk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UploadProgress {
    pub bytes_sent: u64,
    pub total_bytes: u64,
}

impl UploadProgress {
    /// Whole percentage of the file the server has acknowledged, rounded down.
    pub fn percent(&self) -> u8 {
        if self.total_bytes == 0 {
            return 100;
        }
        let percent = self.bytes_sent.min(self.total_bytes) * 100 / self.total_bytes;
        percent as u8
    }

    pub fn is_complete(&self) -> bool {
        self.bytes_sent >= self.total_bytes
    }
}

/// Estimated time left given the time spent so far and the whole percentage reached.
///
/// Returns `None` below 1%, where the extrapolation is meaningless.
pub fn estimate_remaining(elapsed: Duration, percent: u8) -> Option<Duration> {
    if percent == 0 {
        return None;
    }
    let fraction = f64::from(percent.min(100)) / 100.0;
    let total = elapsed.as_secs_f64() / fraction;
    let remaining = (total - elapsed.as_secs_f64()).max(0.0);
    Some(Duration::from_secs_f64(remaining))
}

/// Render whole seconds as `H:MM:SS`, prefixed with `N day(s), ` past 24 hours.
pub fn format_duration(duration: Duration) -> String {
    let secs = duration.as_secs();
    let days = secs / 86_400;
    let hours = (secs % 86_400) / 3_600;
    let minutes = (secs % 3_600) / 60;
    let seconds = secs % 60;

    let clock = format!("{hours}:{minutes:02}:{seconds:02}");
    match days {
        0 => clock,
        1 => format!("1 day, {clock}"),
        n => format!("{n} days, {clock}"),
    }
}

/// Single-line progress display for an upload running in the foreground.
#[derive(Debug)]
pub struct ProgressReporter {
    bar: ProgressBar,
    started: Instant,
}

impl ProgressReporter {
    /// Reporter drawing to standard output.
    pub fn stdout() -> Self {
        Self::with_target(ProgressDrawTarget::stdout())
    }

    /// Reporter that tracks progress without drawing anything.
    pub fn hidden() -> Self {
        Self::with_target(ProgressDrawTarget::hidden())
    }

    fn with_target(target: ProgressDrawTarget) -> Self {
        let bar = ProgressBar::with_draw_target(Some(100), target);
        let style =
            ProgressStyle::with_template(PROGRESS_TEMPLATE).unwrap_or_else(|_| ProgressStyle::default_bar());
        bar.set_style(style);
        Self {
            bar,
            started: Instant::now(),
        }
    }

    /// Record a progress event. Nothing is shown until the first whole percent, and the bar is
    /// finished once every byte is acknowledged.
    pub fn update(&self, progress: &UploadProgress) {
        if progress.is_complete() {
            self.bar.finish_with_message(format_duration(Duration::ZERO));
            return;
        }
        let percent = progress.percent();
        let Some(remaining) = estimate_remaining(self.started.elapsed(), percent) else {
            return;
        };
        self.bar.set_message(format_duration(remaining));
        self.bar.set_position(u64::from(percent));
    }

    pub fn finish(&self) {
        self.bar.finish();
    }
}
