//! Progress reporting to the host.
//!
//! The pipeline reports a fraction in `[0.0, 1.0]` at each milestone. What the
//! host does with it (a Calamares job bar, a terminal bar, a log line) is up
//! to the sink.

use indicatif::{ProgressBar, ProgressStyle};
use tracing::info;

pub trait ProgressSink {
    fn set_progress(&self, fraction: f64);
}

impl<F: Fn(f64)> ProgressSink for F {
    fn set_progress(&self, fraction: f64) {
        self(fraction)
    }
}

/// Logs each milestone.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogProgress;

impl ProgressSink for LogProgress {
    fn set_progress(&self, fraction: f64) {
        info!("Stage3 progress: {:.0}%", fraction * 100.0);
    }
}

/// Terminal bar for the CLI, 0-100.
pub struct BarProgress {
    bar: ProgressBar,
}

impl BarProgress {
    pub fn new() -> Self {
        let bar = ProgressBar::new(100);
        bar.set_style(
            ProgressStyle::with_template("[{bar:40.cyan/blue}] {pos:>3}% {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("=> "),
        );
        Self { bar }
    }

    pub fn finish(&self, msg: &'static str) {
        self.bar.finish_with_message(msg);
    }

    pub fn abandon(&self, msg: &'static str) {
        self.bar.abandon_with_message(msg);
    }
}

impl Default for BarProgress {
    fn default() -> Self {
        Self::new()
    }
}

impl ProgressSink for BarProgress {
    fn set_progress(&self, fraction: f64) {
        self.bar.set_position(percent(fraction));
    }
}

/// Fraction to a whole percentage, clamped.
fn percent(fraction: f64) -> u64 {
    (fraction.clamp(0.0, 1.0) * 100.0).round() as u64
}
