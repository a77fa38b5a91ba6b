use std::sync::Arc;

use crate::config::{HeaterConfig, PhysicalConstants};
use crate::ipc::{DerivedState, StateSnapshot};

/// Internal resistance of the Nernst cell, in ohms.
///
/// The cell is the low side of a divider whose top is `esr_supply_resistor`,
/// driven by `ac_excitation_voltage`. The result is not range checked:
/// `nernst_ac == ac_excitation_voltage` gives infinity and `nernst_ac == 0`
/// gives zero. Treat non-finite or implausible values as "cell cold or
/// disconnected".
pub fn sensor_internal_resistance(nernst_ac: f32, constants: &PhysicalConstants) -> f32 {
    constants.esr_supply_resistor / (constants.ac_excitation_voltage / nernst_ac - 1.0)
}

/// Pump current in milliamps from the filtered sense voltage.
pub fn pump_nominal_current(pump_current_sense_voltage: f32, constants: &PhysicalConstants) -> f32 {
    pump_current_sense_voltage * constants.pump_current_ratio()
}

// ============================================================================
// ESR STATUS - Downstream range check on the raw resistance
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EsrStatus {
    /// Non-finite or non-positive: cell disconnected or no excitation seen.
    Invalid,
    Overheat,
    InRange,
    /// Warming, not yet below the closed-loop threshold.
    Cold,
    Underheat,
}

impl EsrStatus {
    pub fn classify(esr: f32, heater: &HeaterConfig) -> Self {
        if !esr.is_finite() || esr <= 0.0 {
            EsrStatus::Invalid
        } else if esr < heater.overheat_esr {
            EsrStatus::Overheat
        } else if esr > heater.underheat_esr {
            EsrStatus::Underheat
        } else if esr > heater.closed_loop_threshold_esr {
            EsrStatus::Cold
        } else {
            EsrStatus::InRange
        }
    }

    pub fn is_usable(&self) -> bool {
        !matches!(self, EsrStatus::Invalid)
    }
}

impl std::fmt::Display for EsrStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EsrStatus::Invalid => write!(f, "Invalid"),
            EsrStatus::Overheat => write!(f, "Overheat"),
            EsrStatus::InRange => write!(f, "InRange"),
            EsrStatus::Cold => write!(f, "Cold"),
            EsrStatus::Underheat => write!(f, "Underheat"),
        }
    }
}

/// Read-side view of the sampling task's output.
///
/// Cheap to clone; every clone reads the same [`DerivedState`].
#[derive(Debug, Clone)]
pub struct Measurements {
    state: Arc<DerivedState>,
    constants: PhysicalConstants,
}

impl Measurements {
    pub fn new(state: Arc<DerivedState>, constants: PhysicalConstants) -> Self {
        Self { state, constants }
    }

    pub fn nernst_ac(&self) -> f32 {
        self.state.nernst_ac()
    }

    pub fn nernst_dc(&self) -> f32 {
        self.state.nernst_dc()
    }

    pub fn sensor_internal_resistance(&self) -> f32 {
        sensor_internal_resistance(self.nernst_ac(), &self.constants)
    }

    pub fn pump_nominal_current(&self) -> f32 {
        pump_nominal_current(self.state.pump_current_sense_voltage(), &self.constants)
    }

    /// Cycles published by the sampling task so far.
    pub fn cycles(&self) -> u64 {
        self.state.cycles()
    }

    pub fn snapshot(&self) -> StateSnapshot {
        self.state.snapshot()
    }

    pub fn esr_status(&self, heater: &HeaterConfig) -> EsrStatus {
        EsrStatus::classify(self.sensor_internal_resistance(), heater)
    }

    pub fn constants(&self) -> &PhysicalConstants {
        &self.constants
    }
}
