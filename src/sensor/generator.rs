//! Simulated wideband cell for tests, benchmarks and the demo binary.
//!
//! The excitation handle and the analog handle share one cell, so toggling
//! the excitation moves subsequent readings to the other side of the DC level,
//! exactly like the real divider does.

use std::sync::Arc;

use parking_lot::Mutex;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use super::hardware::{AnalogResult, AnalogSource, ExcitationToggle};
use crate::config::PhysicalConstants;
use crate::error::AcquisitionError;

struct CellState {
    rng: StdRng,
    constants: PhysicalConstants,
    phase_high: bool,
    nernst_dc: f32,
    drift_per_sample: f32,
    internal_resistance: f32,
    pump_current_ma: f32,
    noise_amplitude: f32,
    pending_fault: Option<AcquisitionError>,
    samples: u64,
}

impl CellState {
    fn nernst_ac(&self) -> f32 {
        // Inverse of the divider model used for the ESR measurement
        let r = self.internal_resistance;
        if r.is_infinite() {
            return self.constants.ac_excitation_voltage;
        }
        self.constants.ac_excitation_voltage * r / (self.constants.esr_supply_resistor + r)
    }

    fn noise(&mut self) -> f32 {
        if self.noise_amplitude > 0.0 {
            self.rng.gen_range(-self.noise_amplitude..self.noise_amplitude)
        } else {
            0.0
        }
    }
}

/// Shared handle to a simulated cell.
#[derive(Clone)]
pub struct SimulatedCell {
    inner: Arc<Mutex<CellState>>,
}

impl SimulatedCell {
    pub fn new(seed: u64, constants: PhysicalConstants) -> Self {
        Self {
            inner: Arc::new(Mutex::new(CellState {
                rng: StdRng::seed_from_u64(seed),
                constants,
                phase_high: false,
                nernst_dc: 0.45,
                drift_per_sample: 0.0,
                internal_resistance: 300.0,
                pump_current_ma: 0.0,
                noise_amplitude: 0.0,
                pending_fault: None,
                samples: 0,
            })),
        }
    }

    /// Excitation and analog handles bound to this cell.
    pub fn split(&self) -> (SimExcitation, SimAnalog) {
        (
            SimExcitation { cell: self.clone() },
            SimAnalog { cell: self.clone() },
        )
    }

    pub fn set_nernst_dc(&self, volts: f32) {
        self.inner.lock().nernst_dc = volts;
    }

    /// DC change applied after every sample.
    pub fn set_drift(&self, volts_per_sample: f32) {
        self.inner.lock().drift_per_sample = volts_per_sample;
    }

    pub fn set_internal_resistance(&self, ohms: f32) {
        self.inner.lock().internal_resistance = ohms;
    }

    pub fn set_pump_current(&self, milliamps: f32) {
        self.inner.lock().pump_current_ma = milliamps;
    }

    pub fn set_noise(&self, amplitude: f32) {
        self.inner.lock().noise_amplitude = amplitude.abs();
    }

    /// The next sample fails with `error`.
    pub fn inject_fault(&self, error: AcquisitionError) {
        self.inner.lock().pending_fault = Some(error);
    }

    pub fn samples(&self) -> u64 {
        self.inner.lock().samples
    }

    /// Heater-style disturbance: shift DC and resistance together.
    pub fn inject_disturbance(&self, dc_delta: f32, resistance_delta: f32) {
        let mut guard = self.inner.lock();
        let cell = &mut *guard;
        cell.nernst_dc += dc_delta;
        cell.internal_resistance = (cell.internal_resistance + resistance_delta).max(0.0);
    }
}

pub struct SimExcitation {
    cell: SimulatedCell,
}

impl ExcitationToggle for SimExcitation {
    fn toggle(&mut self) {
        let mut cell = self.cell.inner.lock();
        cell.phase_high = !cell.phase_high;
    }
}

pub struct SimAnalog {
    cell: SimulatedCell,
}

impl AnalogSource for SimAnalog {
    fn sample(&mut self) -> Result<AnalogResult, AcquisitionError> {
        let mut guard = self.cell.inner.lock();
        let cell = &mut *guard;
        if let Some(err) = cell.pending_fault.take() {
            return Err(err);
        }

        let half_ac = cell.nernst_ac() / 2.0;
        let excitation = if cell.phase_high { half_ac } else { -half_ac };
        let nernst_noise = cell.noise();
        let pump_noise = cell.noise();

        // Inverse of the pump current conversion
        let pump_sense = cell.pump_current_ma / cell.constants.pump_current_ratio();

        let result = AnalogResult {
            nernst_voltage: cell.nernst_dc + excitation + nernst_noise,
            pump_current_voltage: cell.constants.half_supply_voltage() + pump_sense + pump_noise,
        };

        cell.nernst_dc += cell.drift_per_sample;
        cell.samples += 1;

        Ok(result)
    }
}
