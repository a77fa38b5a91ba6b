//! Metrics module - Sampling loop timing and deadline tracking

use hdrhistogram::Histogram;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::error::AcquisitionError;
use crate::sensor::{AnalogResult, AnalogSource};

// ============================================================================
// SAMPLING STATS - Counters shared between the runner and its owner
// ============================================================================

#[derive(Debug, Default)]
pub struct SamplingStats {
    pub total_cycles: AtomicU64,
    pub missed_deadlines: AtomicU64,
    pub shutdown: AtomicBool,
}

impl SamplingStats {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Ask the runner to stop after its current cycle.
    pub fn request_shutdown(&self) {
        self.shutdown.store(true, Ordering::Relaxed);
    }

    pub fn shutdown_requested(&self) -> bool {
        self.shutdown.load(Ordering::Relaxed)
    }

    /// Percentage of cycles that finished inside their period.
    pub fn compliance(&self) -> f64 {
        let total = self.total_cycles.load(Ordering::Relaxed);
        let missed = self.missed_deadlines.load(Ordering::Relaxed);
        if total > 0 {
            (total.saturating_sub(missed) as f64 / total as f64) * 100.0
        } else {
            100.0
        }
    }
}

// ============================================================================
// TIMING METRICS - Thread-safe latency and jitter histograms
// ============================================================================

fn histogram() -> Arc<Mutex<Histogram<u64>>> {
    // 3 significant figures is always within hdrhistogram's supported range
    Arc::new(Mutex::new(
        Histogram::new(3).expect("valid histogram precision"),
    ))
}

#[derive(Clone)]
pub struct TimingMetrics {
    acquisition_hist: Arc<Mutex<Histogram<u64>>>,
    processing_hist: Arc<Mutex<Histogram<u64>>>,
    jitter_hist: Arc<Mutex<Histogram<u64>>>,
    last_interval_ns: Arc<AtomicU64>,
}

impl TimingMetrics {
    pub fn new() -> Self {
        Self {
            acquisition_hist: histogram(),
            processing_hist: histogram(),
            jitter_hist: histogram(),
            last_interval_ns: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Time spent inside the analog source for one cycle.
    pub fn record_acquisition(&self, duration: Duration) {
        self.acquisition_hist.lock().record(duration.as_nanos() as u64).ok();
    }

    /// Whole `tick` duration; counts a missed deadline when it overruns `period`.
    pub fn record_cycle(&self, duration: Duration, period: Duration, stats: &SamplingStats) {
        self.processing_hist.lock().record(duration.as_nanos() as u64).ok();

        stats.total_cycles.fetch_add(1, Ordering::Relaxed);
        if duration > period {
            stats.missed_deadlines.fetch_add(1, Ordering::Relaxed);
        }
    }

    /// Record jitter (variation between consecutive tick-to-tick intervals)
    pub fn record_interval(&self, interval: Duration) {
        let interval_ns = interval.as_nanos() as u64;
        let last = self.last_interval_ns.swap(interval_ns, Ordering::Relaxed);
        if last > 0 {
            self.jitter_hist.lock().record(interval_ns.abs_diff(last)).ok();
        }
    }

    pub fn report(&self) -> MetricsReport {
        let acq = self.acquisition_hist.lock();
        let proc = self.processing_hist.lock();
        let jitter = self.jitter_hist.lock();

        MetricsReport {
            acquisition_p50: Duration::from_nanos(acq.value_at_quantile(0.5)),
            acquisition_p99: Duration::from_nanos(acq.value_at_quantile(0.99)),
            processing_p50: Duration::from_nanos(proc.value_at_quantile(0.5)),
            processing_p99: Duration::from_nanos(proc.value_at_quantile(0.99)),
            processing_max: Duration::from_nanos(proc.max()),
            jitter_p50: Duration::from_nanos(jitter.value_at_quantile(0.5)),
            jitter_p99: Duration::from_nanos(jitter.value_at_quantile(0.99)),
            samples: proc.len(),
        }
    }
}

impl Default for TimingMetrics {
    fn default() -> Self {
        Self::new()
    }
}

/// Wraps an [`AnalogSource`] and records how long each acquisition blocks.
pub struct TimedSource<S> {
    inner: S,
    metrics: TimingMetrics,
}

impl<S> TimedSource<S> {
    pub fn new(inner: S, metrics: TimingMetrics) -> Self {
        Self { inner, metrics }
    }
}

impl<S: AnalogSource> AnalogSource for TimedSource<S> {
    fn sample(&mut self) -> Result<AnalogResult, AcquisitionError> {
        let start = Instant::now();
        let result = self.inner.sample();
        self.metrics.record_acquisition(start.elapsed());
        result
    }
}

// ============================================================================
// METRICS REPORT - Summary statistics
// ============================================================================

#[derive(Debug, Clone)]
pub struct MetricsReport {
    pub acquisition_p50: Duration,
    pub acquisition_p99: Duration,
    pub processing_p50: Duration,
    pub processing_p99: Duration,
    pub processing_max: Duration,
    pub jitter_p50: Duration,
    pub jitter_p99: Duration,
    pub samples: u64,
}
