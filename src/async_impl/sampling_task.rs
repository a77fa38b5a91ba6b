use std::sync::Arc;

use tokio::time::{interval, Duration, Instant, MissedTickBehavior};
use tracing::{error, info};

use crate::error::AcquisitionError;
use crate::metrics::{SamplingStats, TimingMetrics};
use crate::sensor::{AnalogSource, ExcitationToggle, SignalSampler};

/// Async counterpart of the sampling thread, paced by `tokio::time::interval`.
///
/// `tick` runs inline on the executor, so a blocking [`AnalogSource`] stalls
/// whatever else shares the worker; give this task a runtime of its own when
/// acquisition blocks for long.
///
/// A late cycle pushes the schedule back instead of bursting to catch up, so
/// consecutive samples stay at least one period apart.
pub async fn sampling_task<S, T>(
    mut sampler: SignalSampler<S, T>,
    period: Duration,
    stats: Arc<SamplingStats>,
    metrics: TimingMetrics,
) -> Result<(), AcquisitionError>
where
    S: AnalogSource,
    T: ExcitationToggle,
{
    let mut interval_timer = interval(period);
    interval_timer.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut last_start: Option<Instant> = None;

    info!(period_us = period.as_micros() as u64, "sampling task started");

    loop {
        interval_timer.tick().await;

        if stats.shutdown_requested() {
            info!("sampling task shutting down");
            return Ok(());
        }

        let cycle_start = Instant::now();
        if let Some(prev) = last_start {
            metrics.record_interval(cycle_start.duration_since(prev));
        }
        last_start = Some(cycle_start);

        if let Err(e) = sampler.tick() {
            error!(error = %e, "acquisition failed, sampling stopped");
            return Err(e);
        }

        metrics.record_cycle(cycle_start.elapsed(), period, &stats);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PhysicalConstants;
    use crate::sensor::{AnalogResult, SimulatedCell};
    use parking_lot::Mutex;

    /// Records when each sample was taken and blocks once on a chosen sample.
    struct StallingSource {
        taken: Arc<Mutex<Vec<std::time::Instant>>>,
        stall_on: usize,
        stall_for: Duration,
        stop_after: usize,
        stats: Arc<SamplingStats>,
    }

    impl AnalogSource for StallingSource {
        fn sample(&mut self) -> Result<AnalogResult, AcquisitionError> {
            let mut taken = self.taken.lock();
            taken.push(std::time::Instant::now());
            let n = taken.len();
            drop(taken);

            if n == self.stall_on {
                std::thread::sleep(self.stall_for);
            }
            if n >= self.stop_after {
                self.stats.request_shutdown();
            }
            Ok(AnalogResult {
                nernst_voltage: 0.45,
                pump_current_voltage: 1.65,
            })
        }
    }

    #[tokio::test]
    async fn task_samples_until_shutdown() {
        let constants = PhysicalConstants::default();
        let cell = SimulatedCell::new(5, constants);
        cell.set_pump_current(1.0);
        let (excitation, analog) = cell.split();

        let sampler = SignalSampler::new(analog, excitation, constants);
        let measurements = sampler.measurements();
        let stats = SamplingStats::new();

        let task = tokio::spawn(sampling_task(
            sampler,
            Duration::from_millis(1),
            Arc::clone(&stats),
            TimingMetrics::new(),
        ));

        tokio::time::sleep(Duration::from_millis(100)).await;
        stats.request_shutdown();
        let result = task.await.expect("sampling task panicked");

        assert_eq!(result, Ok(()));
        assert!(measurements.cycles() > 10);
        assert!((measurements.sensor_internal_resistance() - 300.0).abs() < 1.0);
        // EMA has not fully settled; it must be heading towards 1 mA
        assert!(measurements.pump_nominal_current() > 0.5);
    }

    #[tokio::test]
    async fn task_returns_acquisition_error() {
        let constants = PhysicalConstants::default();
        let cell = SimulatedCell::new(5, constants);
        let (excitation, analog) = cell.split();
        cell.inject_fault(AcquisitionError::Conversion("dma overrun".to_string()));

        let sampler = SignalSampler::new(analog, excitation, constants);
        let result = sampling_task(
            sampler,
            Duration::from_millis(1),
            SamplingStats::new(),
            TimingMetrics::new(),
        )
        .await;

        assert_eq!(
            result,
            Err(AcquisitionError::Conversion("dma overrun".to_string()))
        );
    }

    #[tokio::test]
    async fn slow_sample_does_not_burst_missed_ticks() {
        let period = Duration::from_millis(10);
        let stats = SamplingStats::new();
        let taken = Arc::new(Mutex::new(Vec::new()));
        let source = StallingSource {
            taken: Arc::clone(&taken),
            stall_on: 5,
            stall_for: Duration::from_millis(45),
            stop_after: 12,
            stats: Arc::clone(&stats),
        };

        let sampler = SignalSampler::new(source, || {}, PhysicalConstants::default());
        let result = sampling_task(sampler, period, stats, TimingMetrics::new()).await;
        assert_eq!(result, Ok(()));

        let taken = taken.lock();
        assert_eq!(taken.len(), 12);
        for (i, pair) in taken.windows(2).enumerate() {
            let gap = pair[1].duration_since(pair[0]);
            assert!(gap >= period / 2, "samples {} and {} only {:?} apart", i + 1, i + 2, gap);
        }
    }
}
