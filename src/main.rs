use std::sync::atomic::Ordering;
use std::thread;
use std::time::{Duration, Instant};

use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use wideband_sense::{
    load_config, start_sampling, EsrStatus, PidController, RuntimeConfig, SimulatedCell,
};

const DEFAULT_CONFIG_PATH: &str = "config/wideband.toml";
const RUN_TIME: Duration = Duration::from_secs(3);

// Heater drive around which the heater loop trims, in volts
const HEATER_BASE_VOLTAGE: f32 = 7.5;
const HEATER_MAX_VOLTAGE: f32 = 12.0;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let path = std::env::args().nth(1).unwrap_or_else(|| DEFAULT_CONFIG_PATH.to_string());
    let config = load_config(&path).unwrap_or_else(|e| {
        warn!(error = %e, path = %path, "using default configuration");
        RuntimeConfig::default()
    });
    let constants = config.constants;

    println!("===========================================");
    println!("Starting wideband sensor conditioning");
    println!("===========================================\n");

    // Cold cell, lean exhaust
    let cell = SimulatedCell::new(42, constants);
    cell.set_internal_resistance(config.heater.underheat_esr);
    cell.set_nernst_dc(0.2);
    cell.set_noise(0.002);
    let (excitation, analog) = cell.split();

    let sampling = start_sampling(analog, excitation, constants, &config.sampling)?;
    let m = sampling.measurements().clone();

    let mut heater_pid = PidController::from_tuning(&config.heater.tuning);
    let mut pump_pid = PidController::from_tuning(&config.pump.tuning);

    let pump_period = config.pump.tuning.period();
    let heater_every = (config.heater.tuning.period().as_micros()
        / pump_period.as_micros().max(1))
    .max(1) as u64;

    let start = Instant::now();
    let mut iteration = 0u64;
    let mut resistance = config.heater.underheat_esr;
    let mut nernst_dc = 0.2f32;

    while start.elapsed() < RUN_TIME {
        if sampling.is_finished() {
            warn!("sampling stopped early");
            break;
        }

        // Pump loop: hold the Nernst cell at its target voltage
        let pump_ma = pump_pid.compute_output(config.pump.nernst_target, m.nernst_dc());
        cell.set_pump_current(pump_ma);
        nernst_dc += 0.05 * ((0.2 + 0.1 * pump_ma) - nernst_dc);
        cell.set_nernst_dc(nernst_dc);

        // Heater loop: hold the cell at its target ESR
        if iteration % heater_every == 0 {
            let esr = m.sensor_internal_resistance();
            if EsrStatus::classify(esr, &config.heater).is_usable() {
                let trim = heater_pid.compute_output(config.heater.target_esr, esr);
                let heater_v = (HEATER_BASE_VOLTAGE - trim).clamp(0.0, HEATER_MAX_VOLTAGE);
                let equilibrium =
                    config.heater.target_esr * HEATER_BASE_VOLTAGE / heater_v.max(0.5);
                resistance += 0.2 * (equilibrium - resistance);
                cell.set_internal_resistance(resistance);
            }
        }

        if iteration % 250 == 0 {
            info!(
                esr = m.sensor_internal_resistance(),
                esr_status = %m.esr_status(&config.heater),
                nernst_dc = m.nernst_dc(),
                pump_ma = m.pump_nominal_current(),
                "control loop"
            );
        }

        iteration += 1;
        thread::sleep(pump_period);
    }

    println!("\n===========================================");
    println!("Run completed - stopping sampling");
    let stats = sampling.stats().clone();
    let metrics = sampling.metrics().clone();
    let final_esr = m.sensor_internal_resistance();
    let final_dc = m.nernst_dc();
    let final_ma = m.pump_nominal_current();

    match sampling.stop() {
        Ok(Ok(())) => {}
        Ok(Err(e)) => warn!(error = %e, "sampling ended with acquisition failure"),
        Err(_) => warn!("sampling thread panicked"),
    }

    let total_cycles = stats.total_cycles.load(Ordering::Relaxed);
    let missed = stats.missed_deadlines.load(Ordering::Relaxed);

    println!("===========================================");
    println!("FINAL RESULTS");
    println!("===========================================");
    println!(
        "Internal resistance: {:.1} ohm (target {:.0}, {})",
        final_esr,
        config.heater.target_esr,
        EsrStatus::classify(final_esr, &config.heater)
    );
    println!("Nernst DC: {:.3} V (target {:.2})", final_dc, config.pump.nernst_target);
    println!("Pump current: {:.3} mA", final_ma);
    println!("Sampling cycles: {}", total_cycles);
    println!("Deadline compliance: {:.2}% ({} missed)", stats.compliance(), missed);

    let report = metrics.report();
    println!("\n=== Timing ===");
    println!(
        "Acquisition P50: {:?}, P99: {:?}",
        report.acquisition_p50, report.acquisition_p99
    );
    println!(
        "Cycle P50: {:?}, P99: {:?}, max: {:?}",
        report.processing_p50, report.processing_p99, report.processing_max
    );
    println!("Jitter P50: {:?}, P99: {:?}", report.jitter_p50, report.jitter_p99);

    Ok(())
}
