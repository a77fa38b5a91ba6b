//! Oversampled ADC front end producing [`AnalogResult`]s in volts.

use super::hardware::{AnalogResult, AnalogSource};
use crate::config::PhysicalConstants;
use crate::error::AcquisitionError;

/// Channels per conversion frame, in buffer order.
pub const CHANNEL_COUNT: usize = 2;
const NERNST_CHANNEL: usize = 0;
const PUMP_CHANNEL: usize = 1;

/// Raw converter: fills `buffer` with interleaved frames of
/// `[nernst, pump]` counts and returns how many samples it wrote.
pub trait AdcConverter {
    fn convert(&mut self, buffer: &mut [u16]) -> Result<usize, AcquisitionError>;
}

pub struct AdcFrontEnd<C> {
    converter: C,
    constants: PhysicalConstants,
    buffer: Vec<u16>,
}

impl<C: AdcConverter> AdcFrontEnd<C> {
    pub fn new(converter: C, constants: PhysicalConstants) -> Self {
        Self {
            converter,
            constants,
            buffer: vec![0; constants.adc_oversample * CHANNEL_COUNT],
        }
    }

    /// Mean of one channel across all frames, in volts.
    fn average(&self, channel: usize) -> f32 {
        let sum: u64 = self
            .buffer
            .iter()
            .skip(channel)
            .step_by(CHANNEL_COUNT)
            .map(|&count| u64::from(count))
            .sum();

        let scale = self.constants.supply_voltage
            / (self.constants.adc_max_count as f32 * self.constants.adc_oversample as f32);
        sum as f32 * scale
    }
}

impl<C: AdcConverter> AnalogSource for AdcFrontEnd<C> {
    fn sample(&mut self) -> Result<AnalogResult, AcquisitionError> {
        let written = self.converter.convert(&mut self.buffer)?;
        if written != self.buffer.len() {
            return Err(AcquisitionError::BufferSize {
                expected: self.buffer.len(),
                got: written,
            });
        }

        Ok(AnalogResult {
            nernst_voltage: self.average(NERNST_CHANNEL) * self.constants.nernst_input_gain,
            pump_current_voltage: self.average(PUMP_CHANNEL),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FixedCounts {
        nernst: u16,
        pump: u16,
    }

    impl AdcConverter for FixedCounts {
        fn convert(&mut self, buffer: &mut [u16]) -> Result<usize, AcquisitionError> {
            for frame in buffer.chunks_mut(CHANNEL_COUNT) {
                frame[NERNST_CHANNEL] = self.nernst;
                frame[PUMP_CHANNEL] = self.pump;
            }
            Ok(buffer.len())
        }
    }

    struct ShortRead;

    impl AdcConverter for ShortRead {
        fn convert(&mut self, buffer: &mut [u16]) -> Result<usize, AcquisitionError> {
            Ok(buffer.len() / 2)
        }
    }

    struct Broken;

    impl AdcConverter for Broken {
        fn convert(&mut self, _buffer: &mut [u16]) -> Result<usize, AcquisitionError> {
            Err(AcquisitionError::Conversion("overrun".to_string()))
        }
    }

    #[test]
    fn full_scale_reads_supply() {
        let constants = PhysicalConstants::default();
        let mut adc = AdcFrontEnd::new(FixedCounts { nernst: 4095, pump: 4095 }, constants);
        let r = adc.sample().expect("sample");
        assert!((r.pump_current_voltage - 3.3).abs() < 1e-5);
        assert!((r.nernst_voltage - 3.3 / 2.7).abs() < 1e-5);
    }

    #[test]
    fn mid_scale_reads_half_supply() {
        let constants = PhysicalConstants::default();
        let mut adc = AdcFrontEnd::new(FixedCounts { nernst: 0, pump: 2048 }, constants);
        let r = adc.sample().expect("sample");
        assert_eq!(r.nernst_voltage, 0.0);
        assert!((r.pump_current_voltage - 1.65).abs() < 1e-3);
    }

    #[test]
    fn channels_are_not_mixed() {
        let constants = PhysicalConstants {
            nernst_input_gain: 1.0,
            ..PhysicalConstants::default()
        };
        let mut adc = AdcFrontEnd::new(FixedCounts { nernst: 1000, pump: 3000 }, constants);
        let r = adc.sample().expect("sample");
        assert!(r.pump_current_voltage > 2.0 * r.nernst_voltage);
    }

    #[test]
    fn deep_oversampling_does_not_overflow_sum() {
        let constants = PhysicalConstants {
            adc_oversample: 100_000,
            nernst_input_gain: 1.0,
            ..PhysicalConstants::default()
        };
        let mut adc = AdcFrontEnd::new(FixedCounts { nernst: 4095, pump: 4095 }, constants);
        let r = adc.sample().expect("sample");
        assert!((r.nernst_voltage - 3.3).abs() < 1e-3);
        assert!((r.pump_current_voltage - 3.3).abs() < 1e-3);
    }

    #[test]
    fn short_conversion_is_an_error() {
        let mut adc = AdcFrontEnd::new(ShortRead, PhysicalConstants::default());
        assert_eq!(
            adc.sample(),
            Err(AcquisitionError::BufferSize { expected: 48, got: 24 })
        );
    }

    #[test]
    fn converter_error_propagates() {
        let mut adc = AdcFrontEnd::new(Broken, PhysicalConstants::default());
        assert!(matches!(adc.sample(), Err(AcquisitionError::Conversion(_))));
    }
}
