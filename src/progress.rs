//! Progress reporting for queries and downloads.
//!
//! Every long-running operation in this crate takes an explicit
//! [`ProgressReporter`] instead of owning a global indicator. The reporter
//! is scoped to one query or one batch download and may be shared across
//! worker tasks, so implementations must tolerate concurrent `advance`
//! calls (monotonic counter semantics, no ordering guarantees).

use std::sync::atomic::{AtomicU64, Ordering};

use indicatif::{ProgressBar, ProgressStyle};

/// Receives progress updates from a single operation.
///
/// `advance` may be called from multiple worker tasks concurrently during
/// batch downloads. `set_total` is advisory: it is called once per query
/// (page count from the first page) and once per download (byte total when
/// the server reports a content length).
pub trait ProgressReporter: Send + Sync {
    /// Sets the expected total number of units, when known.
    fn set_total(&self, _total: u64) {}

    /// Advances the counter by `delta` units (pages or bytes).
    fn advance(&self, delta: u64);

    /// Marks the operation as finished.
    fn finish(&self) {}
}

/// Reporter that discards all updates.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullProgress;

impl ProgressReporter for NullProgress {
    fn advance(&self, _delta: u64) {}
}

/// Reporter backed by atomic counters, safe for concurrent increment
/// from pool workers.
#[derive(Debug, Default)]
pub struct CountingProgress {
    total: AtomicU64,
    count: AtomicU64,
}

impl CountingProgress {
    /// Creates a reporter with zero counts.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the last total set, or 0 if never set.
    #[must_use]
    pub fn total(&self) -> u64 {
        self.total.load(Ordering::SeqCst)
    }

    /// Returns the number of units counted so far.
    #[must_use]
    pub fn count(&self) -> u64 {
        self.count.load(Ordering::SeqCst)
    }
}

impl ProgressReporter for CountingProgress {
    fn set_total(&self, total: u64) {
        self.total.store(total, Ordering::SeqCst);
    }

    fn advance(&self, delta: u64) {
        self.count.fetch_add(delta, Ordering::SeqCst);
    }
}

/// Console reporter rendering an `indicatif` progress bar.
#[derive(Debug)]
pub struct ConsoleProgress {
    bar: ProgressBar,
}

impl ConsoleProgress {
    /// Creates a bar counting query pages.
    #[must_use]
    pub fn pages() -> Self {
        let bar = ProgressBar::no_length();
        bar.set_style(
            ProgressStyle::with_template("{pos}/{len} pages {wide_bar}")
                .unwrap_or_else(|_| ProgressStyle::default_bar()),
        );
        Self { bar }
    }

    /// Creates a bar counting downloaded bytes.
    #[must_use]
    pub fn bytes() -> Self {
        let bar = ProgressBar::no_length();
        bar.set_style(
            ProgressStyle::with_template("{bytes}/{total_bytes} {bytes_per_sec} {wide_bar}")
                .unwrap_or_else(|_| ProgressStyle::default_bar()),
        );
        Self { bar }
    }
}

impl ProgressReporter for ConsoleProgress {
    fn set_total(&self, total: u64) {
        self.bar.set_length(total);
    }

    fn advance(&self, delta: u64) {
        self.bar.inc(delta);
    }

    fn finish(&self) {
        self.bar.finish();
    }
}
