use crate::error::AcquisitionError;

/// One converted reading of both analog channels, in volts.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AnalogResult {
    pub nernst_voltage: f32,
    pub pump_current_voltage: f32,
}

/// Produces one reading per sampling cycle. May block until the conversion completes.
pub trait AnalogSource {
    fn sample(&mut self) -> Result<AnalogResult, AcquisitionError>;
}

/// Flips the phase of the AC excitation injected into the Nernst cell.
pub trait ExcitationToggle {
    fn toggle(&mut self);
}

impl<F: FnMut()> ExcitationToggle for F {
    fn toggle(&mut self) {
        self()
    }
}

impl<S: AnalogSource + ?Sized> AnalogSource for Box<S> {
    fn sample(&mut self) -> Result<AnalogResult, AcquisitionError> {
        (**self).sample()
    }
}
