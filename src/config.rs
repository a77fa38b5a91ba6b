//! Configuration loading: physical constants, sampling cadence and controller tuning

use std::path::Path;
use std::time::Duration;

use serde::Deserialize;

use crate::error::ConfigError;

// ============================================================================
// PHYSICAL CONSTANTS - Board and sensor front-end values
// ============================================================================

/// Fixed electrical constants of the sensor front end.
///
/// Loaded once at startup and never mutated afterwards.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(default)]
pub struct PhysicalConstants {
    /// Analog supply rail in volts.
    pub supply_voltage: f32,
    /// Peak-to-peak amplitude of the AC excitation injected into the Nernst cell.
    pub ac_excitation_voltage: f32,
    /// Top resistor of the ESR divider, in ohms.
    pub esr_supply_resistor: f32,
    /// Gain of the pump current sense amplifier.
    pub pump_current_sense_gain: f32,
    /// Pump current shunt, in ohms.
    pub pump_sense_resistor: f32,
    /// Coefficient of the pump current low-pass filter.
    pub pump_filter_alpha: f32,
    /// Scale applied to the Nernst ADC channel after averaging.
    pub nernst_input_gain: f32,
    pub adc_max_count: u16,
    pub adc_oversample: usize,
}

impl PhysicalConstants {
    /// Midpoint of the supply rail; the pump sense amplifier is referenced to it.
    pub fn half_supply_voltage(&self) -> f32 {
        self.supply_voltage / 2.0
    }

    /// Milliamps per volt of filtered pump sense voltage (negative: inverted sense polarity).
    pub fn pump_current_ratio(&self) -> f32 {
        -1000.0 / (self.pump_current_sense_gain * self.pump_sense_resistor)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        positive("constants.supply_voltage", self.supply_voltage)?;
        positive("constants.ac_excitation_voltage", self.ac_excitation_voltage)?;
        positive("constants.esr_supply_resistor", self.esr_supply_resistor)?;
        positive("constants.pump_current_sense_gain", self.pump_current_sense_gain)?;
        positive("constants.pump_sense_resistor", self.pump_sense_resistor)?;
        positive("constants.nernst_input_gain", self.nernst_input_gain)?;

        if !(self.pump_filter_alpha > 0.0 && self.pump_filter_alpha <= 1.0) {
            return Err(ConfigError::Invalid {
                field: "constants.pump_filter_alpha",
                reason: format!("{} is outside (0, 1]", self.pump_filter_alpha),
            });
        }
        if self.adc_max_count == 0 {
            return Err(ConfigError::Invalid {
                field: "constants.adc_max_count",
                reason: "must be non-zero".to_string(),
            });
        }
        if self.adc_oversample == 0 {
            return Err(ConfigError::Invalid {
                field: "constants.adc_oversample",
                reason: "must be non-zero".to_string(),
            });
        }
        Ok(())
    }
}

impl Default for PhysicalConstants {
    fn default() -> Self {
        Self {
            supply_voltage: 3.3,
            // The excitation is driven from the supply rail
            ac_excitation_voltage: 3.3,
            esr_supply_resistor: 22_000.0,
            pump_current_sense_gain: 10.0,
            pump_sense_resistor: 61.9,
            // At 2.5 kHz sampling this gives roughly 42 Hz of bandwidth
            pump_filter_alpha: 0.1,
            nernst_input_gain: 1.0 / 2.7,
            adc_max_count: 4095,
            adc_oversample: 24,
        }
    }
}

// ============================================================================
// SAMPLING CONFIG
// ============================================================================

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct SamplingConfig {
    pub period_us: u64,
    pub thread_name: String,
    /// Emit a debug line with the published state every N cycles (0 disables).
    pub log_every_cycles: u64,
}

impl SamplingConfig {
    pub fn period(&self) -> Duration {
        Duration::from_micros(self.period_us)
    }
}

impl Default for SamplingConfig {
    fn default() -> Self {
        Self {
            period_us: 400,
            thread_name: "wideband-sampling".to_string(),
            log_every_cycles: 2500,
        }
    }
}

// ============================================================================
// CONTROLLER TUNING
// ============================================================================

/// Gains for one P + clamped-I loop.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PiTuning {
    pub kp: f32,
    pub ki: f32,
    pub integrator_clamp: f32,
    pub period_ms: u64,
}

impl PiTuning {
    pub fn period(&self) -> Duration {
        Duration::from_millis(self.period_ms)
    }

    fn validate(&self, section: &'static str) -> Result<(), ConfigError> {
        if !self.kp.is_finite() || !self.ki.is_finite() {
            return Err(ConfigError::Invalid {
                field: section,
                reason: format!("gains kp={} ki={} must be finite", self.kp, self.ki),
            });
        }
        if self.integrator_clamp < 0.0 || !self.integrator_clamp.is_finite() {
            return Err(ConfigError::Invalid {
                field: section,
                reason: format!(
                    "integrator_clamp {} must be finite and >= 0",
                    self.integrator_clamp
                ),
            });
        }
        if self.period_ms == 0 {
            return Err(ConfigError::Invalid {
                field: section,
                reason: "period_ms must be non-zero".to_string(),
            });
        }
        Ok(())
    }
}

/// A `[*.tuning]` table as written in the file; absent keys keep the
/// section's own defaults.
#[derive(Debug, Clone, Copy, Default, Deserialize)]
struct TuningTable {
    kp: Option<f32>,
    ki: Option<f32>,
    integrator_clamp: Option<f32>,
    period_ms: Option<u64>,
}

impl TuningTable {
    fn over(self, base: PiTuning) -> PiTuning {
        PiTuning {
            kp: self.kp.unwrap_or(base.kp),
            ki: self.ki.unwrap_or(base.ki),
            integrator_clamp: self.integrator_clamp.unwrap_or(base.integrator_clamp),
            period_ms: self.period_ms.unwrap_or(base.period_ms),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(from = "HeaterTable")]
pub struct HeaterConfig {
    pub target_esr: f32,
    /// Below this ESR the heater may leave open-loop warmup.
    pub closed_loop_threshold_esr: f32,
    pub overheat_esr: f32,
    pub underheat_esr: f32,
    pub tuning: PiTuning,
}

impl HeaterConfig {
    /// The ESR bands must nest: overheat < target < closed-loop threshold < underheat.
    fn validate(&self) -> Result<(), ConfigError> {
        let bands = [
            ("heater.overheat_esr", self.overheat_esr),
            ("heater.target_esr", self.target_esr),
            ("heater.closed_loop_threshold_esr", self.closed_loop_threshold_esr),
            ("heater.underheat_esr", self.underheat_esr),
        ];
        for &(field, value) in &bands {
            positive(field, value)?;
        }
        for pair in bands.windows(2) {
            let (lower, low) = pair[0];
            let (field, high) = pair[1];
            if high <= low {
                return Err(ConfigError::Invalid {
                    field,
                    reason: format!("{} must be above {} ({})", high, lower, low),
                });
            }
        }
        self.tuning.validate("heater.tuning")
    }
}

impl Default for HeaterConfig {
    fn default() -> Self {
        Self {
            target_esr: 300.0,
            closed_loop_threshold_esr: 2000.0,
            overheat_esr: 200.0,
            underheat_esr: 3000.0,
            tuning: PiTuning {
                kp: 0.3,
                ki: 0.3,
                integrator_clamp: 3.0,
                period_ms: 50,
            },
        }
    }
}

#[derive(Debug, Deserialize)]
struct HeaterTable {
    target_esr: Option<f32>,
    closed_loop_threshold_esr: Option<f32>,
    overheat_esr: Option<f32>,
    underheat_esr: Option<f32>,
    #[serde(default)]
    tuning: TuningTable,
}

impl From<HeaterTable> for HeaterConfig {
    fn from(table: HeaterTable) -> Self {
        let base = HeaterConfig::default();
        Self {
            target_esr: table.target_esr.unwrap_or(base.target_esr),
            closed_loop_threshold_esr: table
                .closed_loop_threshold_esr
                .unwrap_or(base.closed_loop_threshold_esr),
            overheat_esr: table.overheat_esr.unwrap_or(base.overheat_esr),
            underheat_esr: table.underheat_esr.unwrap_or(base.underheat_esr),
            tuning: table.tuning.over(base.tuning),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(from = "PumpTable")]
pub struct PumpConfig {
    /// Nernst DC voltage the pump loop holds the cell at.
    pub nernst_target: f32,
    pub tuning: PiTuning,
}

impl Default for PumpConfig {
    fn default() -> Self {
        Self {
            nernst_target: 0.45,
            tuning: PiTuning {
                kp: 50.0,
                ki: 10_000.0,
                integrator_clamp: 10.0,
                period_ms: 2,
            },
        }
    }
}

#[derive(Debug, Deserialize)]
struct PumpTable {
    nernst_target: Option<f32>,
    #[serde(default)]
    tuning: TuningTable,
}

impl From<PumpTable> for PumpConfig {
    fn from(table: PumpTable) -> Self {
        let base = PumpConfig::default();
        Self {
            nernst_target: table.nernst_target.unwrap_or(base.nernst_target),
            tuning: table.tuning.over(base.tuning),
        }
    }
}

// ============================================================================
// RUNTIME CONFIG - Whole file
// ============================================================================

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
    pub sampling: SamplingConfig,
    pub constants: PhysicalConstants,
    pub heater: HeaterConfig,
    pub pump: PumpConfig,
}

impl RuntimeConfig {
    pub fn from_toml(s: &str) -> Result<Self, ConfigError> {
        let config: RuntimeConfig = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.sampling.period_us == 0 {
            return Err(ConfigError::Invalid {
                field: "sampling.period_us",
                reason: "must be non-zero".to_string(),
            });
        }
        self.constants.validate()?;
        self.heater.validate()?;
        positive("pump.nernst_target", self.pump.nernst_target)?;
        self.pump.tuning.validate("pump.tuning")?;
        Ok(())
    }
}

pub fn load_config(path: impl AsRef<Path>) -> Result<RuntimeConfig, ConfigError> {
    let path = path.as_ref();
    let s = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.display().to_string(),
        source,
    })?;
    RuntimeConfig::from_toml(&s)
}

fn positive(field: &'static str, value: f32) -> Result<(), ConfigError> {
    if value > 0.0 && value.is_finite() {
        Ok(())
    } else {
        Err(ConfigError::Invalid {
            field,
            reason: format!("{} must be finite and > 0", value),
        })
    }
}
