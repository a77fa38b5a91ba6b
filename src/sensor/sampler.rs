use std::sync::Arc;

use super::decomposition::{AcDc, SampleHistory};
use super::filter::PumpCurrentFilter;
use super::hardware::{AnalogResult, AnalogSource, ExcitationToggle};
use super::measurements::Measurements;
use crate::config::PhysicalConstants;
use crate::error::AcquisitionError;
use crate::ipc::DerivedState;

/// What one `tick` computed, for runners that want to log or record it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CycleOutput {
    pub raw: AnalogResult,
    pub nernst: AcDc,
    pub pump_current_sense_voltage: f32,
}

/// One sampling cycle: toggle, acquire, decompose, filter, publish.
///
/// Owns the sample history and is the only writer of its [`DerivedState`].
/// `tick` must be called at a steady period: the slope cancellation assumes
/// evenly spaced samples.
pub struct SignalSampler<S, T> {
    source: S,
    excitation: T,
    history: SampleHistory,
    pump_filter: PumpCurrentFilter,
    state: Arc<DerivedState>,
    constants: PhysicalConstants,
}

impl<S: AnalogSource, T: ExcitationToggle> SignalSampler<S, T> {
    pub fn new(source: S, excitation: T, constants: PhysicalConstants) -> Self {
        Self {
            source,
            excitation,
            history: SampleHistory::new(),
            pump_filter: PumpCurrentFilter::new(
                constants.pump_filter_alpha,
                constants.half_supply_voltage(),
            ),
            state: Arc::new(DerivedState::new()),
            constants,
        }
    }

    pub fn tick(&mut self) -> Result<CycleOutput, AcquisitionError> {
        self.excitation.toggle();
        let raw = self.source.sample()?;

        let nernst = self.history.push(raw.nernst_voltage);
        let pump = self.pump_filter.push(raw.pump_current_voltage);

        self.state.publish(nernst.ac, nernst.dc, pump);

        Ok(CycleOutput {
            raw,
            nernst,
            pump_current_sense_voltage: pump,
        })
    }

    /// Reader handle onto the state this sampler publishes.
    pub fn measurements(&self) -> Measurements {
        Measurements::new(Arc::clone(&self.state), self.constants)
    }

    pub fn state(&self) -> &Arc<DerivedState> {
        &self.state
    }

    pub fn history(&self) -> &SampleHistory {
        &self.history
    }
}
