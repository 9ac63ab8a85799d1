//! Progress tracking for dump operations
//!
//! This module provides a progress spinner and row counting for long-running
//! table dumps, giving users real-time feedback on encoding throughput.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

use indicatif::{ProgressBar, ProgressStyle};

/// Progress tracker for dump operations
///
/// Tracks encoded rows and displays a spinner
/// with the encoding speed.
pub struct ProgressTracker {
    /// Number of rows encoded so far
    processed: AtomicU64,
    /// Start time of the operation
    start_time: Instant,
    /// Progress bar (optional, can be disabled)
    bar: Option<ProgressBar>,
}

impl ProgressTracker {
    /// Create a new progress tracker
    ///
    /// The row count is not known ahead of time, so the display is a spinner.
    ///
    /// # Arguments
    /// * `enable_bar` - Whether to display the spinner
    ///
    /// # Returns
    /// * `Self` - New progress tracker instance
    pub fn new(enable_bar: bool) -> Self {
        let bar = enable_bar.then(|| {
            let bar = ProgressBar::new_spinner();
            let style = ProgressStyle::default_spinner()
                .template("{spinner:.green} {pos} rows {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner());
            bar.set_style(style);
            bar
        });

        Self {
            processed: AtomicU64::new(0),
            start_time: Instant::now(),
            bar,
        }
    }

    /// A tracker that only counts
    pub fn hidden() -> Self {
        Self::new(false)
    }

    /// Update progress with new count
    ///
    /// # Arguments
    /// * `count` - Total number of rows encoded so far
    pub fn update(&self, count: u64) {
        self.processed.store(count, Ordering::Relaxed);

        if let Some(ref bar) = self.bar {
            bar.set_position(count);

            // Calculate and display speed
            let elapsed = self.start_time.elapsed().as_secs_f64();
            if elapsed > 0.0 {
                let speed = count as f64 / elapsed;
                bar.set_message(format!("({:.0} rows/sec)", speed));
            }
        }
    }

    /// Rows reported so far
    pub fn processed(&self) -> u64 {
        self.processed.load(Ordering::Relaxed)
    }

    /// Finish and clear the progress bar
    pub fn finish(&self) {
        if let Some(ref bar) = self.bar {
            bar.finish_and_clear();
        }
    }
}
