use std::io;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use crossbeam::channel::tick;
use tracing::{debug, error, info};

use crate::config::{PhysicalConstants, SamplingConfig};
use crate::error::AcquisitionError;
use crate::metrics::{SamplingStats, TimedSource, TimingMetrics};
use crate::sensor::{AnalogSource, ExcitationToggle, Measurements, SignalSampler};

/// Run `sampler` on its own named thread, one `tick` per `config.period()`.
///
/// The thread runs until [`SamplingStats::request_shutdown`] is called or an
/// acquisition fails; a failure ends the thread with that error.
pub fn spawn_sampling_thread<S, T>(
    mut sampler: SignalSampler<S, T>,
    config: &SamplingConfig,
    metrics: TimingMetrics,
) -> io::Result<(thread::JoinHandle<Result<(), AcquisitionError>>, Arc<SamplingStats>)>
where
    S: AnalogSource + Send + 'static,
    T: ExcitationToggle + Send + 'static,
{
    let stats = SamplingStats::new();
    let stats_clone = Arc::clone(&stats);
    let period = config.period();
    let log_every = config.log_every_cycles;

    let handle = thread::Builder::new()
        .name(config.thread_name.clone())
        .spawn(move || {
            let ticker = tick(period);
            let mut last_start: Option<Instant> = None;
            let mut cycle = 0u64;

            info!(period_us = period.as_micros() as u64, "sampling thread started");

            loop {
                if stats_clone.shutdown_requested() {
                    info!(cycles = cycle, "sampling thread shutting down");
                    return Ok(());
                }

                // The ticker never disconnects while we hold it
                if ticker.recv().is_err() {
                    return Ok(());
                }

                let cycle_start = Instant::now();
                if let Some(prev) = last_start {
                    metrics.record_interval(cycle_start.duration_since(prev));
                }
                last_start = Some(cycle_start);

                let out = match sampler.tick() {
                    Ok(out) => out,
                    Err(e) => {
                        error!(error = %e, cycle, "acquisition failed, sampling stopped");
                        return Err(e);
                    }
                };

                metrics.record_cycle(cycle_start.elapsed(), period, &stats_clone);
                cycle += 1;

                if log_every > 0 && cycle % log_every == 0 {
                    debug!(
                        cycle,
                        nernst_ac = out.nernst.ac,
                        nernst_dc = out.nernst.dc,
                        pump_sense_v = out.pump_current_sense_voltage,
                        "sampling cycle"
                    );
                }
            }
        })?;

    Ok((handle, stats))
}

/// A running sampling thread plus the handles needed to read from it.
pub struct SamplingHandle {
    measurements: Measurements,
    stats: Arc<SamplingStats>,
    metrics: TimingMetrics,
    join: thread::JoinHandle<Result<(), AcquisitionError>>,
}

impl SamplingHandle {
    pub fn measurements(&self) -> &Measurements {
        &self.measurements
    }

    pub fn stats(&self) -> &Arc<SamplingStats> {
        &self.stats
    }

    pub fn metrics(&self) -> &TimingMetrics {
        &self.metrics
    }

    /// True once the thread has exited, normally only after an acquisition failure.
    pub fn is_finished(&self) -> bool {
        self.join.is_finished()
    }

    /// Block until at least `cycles` have been published or `timeout` elapses.
    pub fn wait_for_cycles(&self, cycles: u64, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        while self.measurements.cycles() < cycles {
            if Instant::now() >= deadline || self.is_finished() {
                return self.measurements.cycles() >= cycles;
            }
            thread::sleep(Duration::from_millis(1));
        }
        true
    }

    /// Request shutdown and wait for the thread.
    pub fn stop(self) -> thread::Result<Result<(), AcquisitionError>> {
        self.stats.request_shutdown();
        self.join.join()
    }
}

/// Start the periodic sampling task for `source` and `excitation`.
///
/// Acquisition time, cycle time and jitter are recorded into the handle's
/// [`TimingMetrics`].
pub fn start_sampling<S, T>(
    source: S,
    excitation: T,
    constants: PhysicalConstants,
    config: &SamplingConfig,
) -> io::Result<SamplingHandle>
where
    S: AnalogSource + Send + 'static,
    T: ExcitationToggle + Send + 'static,
{
    let metrics = TimingMetrics::new();
    let sampler = SignalSampler::new(
        TimedSource::new(source, metrics.clone()),
        excitation,
        constants,
    );
    let measurements = sampler.measurements();
    let (join, stats) = spawn_sampling_thread(sampler, config, metrics.clone())?;

    Ok(SamplingHandle {
        measurements,
        stats,
        metrics,
        join,
    })
}
