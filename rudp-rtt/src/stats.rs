//! RTT statistics engine.
//!
//! [`RttStats`] absorbs one sample per acknowledged frame and keeps only
//! aggregates: extrema, a 128-bit running total, a count, and a fixed-width
//! histogram that grows on demand and never shrinks.
//!
//! Invariants maintained by [`RttStats::record`]:
//! - `count == histogram.iter().sum()`
//! - `min <= sample <= max` for every recorded sample
//! - a sample `s` lands in bucket `s / bucket_width_ns`

use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;
use std::time::Duration;

/// Default histogram bucket width.
pub const DEFAULT_BUCKET_WIDTH: Duration = Duration::from_millis(1);

/// Buckets allocated up front (200 ms of range at the default width).
const INITIAL_BUCKETS: usize = 200;

/// Extra buckets added past the needed index whenever the histogram grows.
const GROWTH_SLACK: usize = 10;

const NANOS_PER_MILLI: f64 = 1_000_000.0;

/// Running RTT aggregates for one client run.
#[derive(Debug, Clone)]
pub struct RttStats {
    min_ns: u64,
    max_ns: u64,
    total_ns: u128,
    count: u64,
    histogram: Vec<u64>,
    bucket_width_ns: u64,
    mean_ns: f64,
}

/// Point-in-time copy of the aggregates.
#[derive(Debug, Clone, PartialEq)]
pub struct RttSnapshot {
    pub count: u64,
    pub min: Option<Duration>,
    pub max: Option<Duration>,
    /// Mean in nanoseconds, `0.0` when empty.
    pub mean_ns: f64,
    pub bucket_width: Duration,
    /// Non-empty buckets as `(index, count)`, ascending.
    pub buckets: Vec<(usize, u64)>,
}

impl Default for RttStats {
    fn default() -> Self {
        Self::new(DEFAULT_BUCKET_WIDTH)
    }
}

impl RttStats {
    /// Create an empty aggregate with the given histogram bucket width.
    ///
    /// A zero width is bumped to 1 ns.
    pub fn new(bucket_width: Duration) -> Self {
        Self {
            min_ns: u64::MAX,
            max_ns: 0,
            total_ns: 0,
            count: 0,
            histogram: vec![0; INITIAL_BUCKETS],
            bucket_width_ns: duration_ns(bucket_width).max(1),
            mean_ns: 0.0,
        }
    }

    /// Histogram bucket a sample of `sample_ns` maps to.
    pub fn bucket_index(&self, sample_ns: u64) -> usize {
        usize::try_from(sample_ns / self.bucket_width_ns).unwrap_or(usize::MAX - GROWTH_SLACK)
    }

    /// Absorb one RTT sample.
    pub fn record(&mut self, sample: Duration) {
        self.record_ns(duration_ns(sample));
    }

    /// Absorb one RTT sample given in nanoseconds.
    pub fn record_ns(&mut self, sample_ns: u64) {
        let idx = self.bucket_index(sample_ns);
        if idx >= self.histogram.len() {
            self.histogram.resize(idx + GROWTH_SLACK, 0);
        }
        self.histogram[idx] += 1;

        self.min_ns = self.min_ns.min(sample_ns);
        self.max_ns = self.max_ns.max(sample_ns);
        self.total_ns += u128::from(sample_ns);
        self.count += 1;
    }

    /// Compute and store the mean. Returns it in nanoseconds.
    ///
    /// `successful` is the caller's own count of acknowledged frames; the mean
    /// always divides by the number of recorded samples.
    pub fn finalize(&mut self, successful: u64) -> f64 {
        if successful != self.count {
            log::warn!(
                "[stats] caller counted {successful} successful frames but {} samples were recorded",
                self.count
            );
        }
        self.mean_ns = self.current_mean_ns();
        self.mean_ns
    }

    fn current_mean_ns(&self) -> f64 {
        if self.count == 0 {
            return 0.0;
        }
        // Split into quotient and remainder so the u128 total never has to fit in an f64.
        let count = u128::from(self.count);
        let whole = self.total_ns / count;
        let rem = self.total_ns % count;
        whole as f64 + rem as f64 / count as f64
    }

    pub fn count(&self) -> u64 {
        self.count
    }

    pub fn total_ns(&self) -> u128 {
        self.total_ns
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// Smallest sample, `None` before the first one.
    pub fn min(&self) -> Option<Duration> {
        (!self.is_empty()).then(|| Duration::from_nanos(self.min_ns))
    }

    /// Largest sample, `None` before the first one.
    pub fn max(&self) -> Option<Duration> {
        (!self.is_empty()).then(|| Duration::from_nanos(self.max_ns))
    }

    /// Mean computed by the last [`finalize`](Self::finalize), in nanoseconds.
    pub fn mean_ns(&self) -> f64 {
        self.mean_ns
    }

    /// Mean computed by the last [`finalize`](Self::finalize).
    pub fn mean(&self) -> Duration {
        Duration::from_nanos(self.mean_ns.round() as u64)
    }

    pub fn bucket_width(&self) -> Duration {
        Duration::from_nanos(self.bucket_width_ns)
    }

    /// Raw bucket counts, including empty buckets.
    pub fn histogram(&self) -> &[u64] {
        &self.histogram
    }

    /// `[low, high)` bounds of bucket `idx` in milliseconds.
    pub fn bucket_bounds_ms(&self, idx: usize) -> (f64, f64) {
        let width_ms = self.bucket_width_ns as f64 / NANOS_PER_MILLI;
        (idx as f64 * width_ms, (idx + 1) as f64 * width_ms)
    }

    pub fn snapshot(&self) -> RttSnapshot {
        RttSnapshot {
            count: self.count,
            min: self.min(),
            max: self.max(),
            mean_ns: self.current_mean_ns(),
            bucket_width: self.bucket_width(),
            buckets: self
                .histogram
                .iter()
                .enumerate()
                .filter(|(_, &n)| n > 0)
                .map(|(i, &n)| (i, n))
                .collect(),
        }
    }

    /// Write the human-readable run report to `out`.
    pub fn report<W: Write>(&self, payload_len: usize, frames: u64, out: &mut W) -> io::Result<()> {
        let min_ms = self.min().map_or(0.0, |d| ns_to_ms(duration_ns(d)));
        let max_ms = self.max().map_or(0.0, |d| ns_to_ms(duration_ns(d)));

        writeln!(out, "RUDP Test Log")?;
        writeln!(out, "Payload bytes: {payload_len}")?;
        writeln!(out, "Frames: {frames}")?;
        writeln!(out, "Samples recorded: {}", self.count)?;
        writeln!(out, "Min RTT (ms): {min_ms:.3}")?;
        writeln!(out, "Max RTT (ms): {max_ms:.3}")?;
        writeln!(out, "Average RTT (ms): {:.3}", self.mean_ns / NANOS_PER_MILLI)?;
        writeln!(out)?;
        writeln!(
            out,
            "Histogram (bucket size = {:.3} ms):",
            ns_to_ms(self.bucket_width_ns)
        )?;
        for (idx, &n) in self.histogram.iter().enumerate() {
            if n == 0 {
                continue;
            }
            let (low, high) = self.bucket_bounds_ms(idx);
            writeln!(out, "  [{low:.3} ms, {high:.3} ms) : {n}")?;
        }
        out.flush()
    }

    /// Write the report to a file at `path`.
    ///
    /// Best effort: failures are logged at debug level and otherwise ignored.
    pub fn write_report(&self, payload_len: usize, frames: u64, path: &Path) {
        let result = File::create(path)
            .map(BufWriter::new)
            .and_then(|mut w| self.report(payload_len, frames, &mut w));
        if let Err(e) = result {
            log::debug!("[stats] report to {} not written: {e}", path.display());
        }
    }
}

fn duration_ns(d: Duration) -> u64 {
    u64::try_from(d.as_nanos()).unwrap_or(u64::MAX)
}

fn ns_to_ms(ns: u64) -> f64 {
    ns as f64 / NANOS_PER_MILLI
}
