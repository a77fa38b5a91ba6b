//! Sensor module - Acquisition, AC/DC decomposition, pump filtering and derived measurements

pub mod adc;
pub mod decomposition;
pub mod filter;
pub mod generator;
pub mod hardware;
pub mod measurements;
pub mod sampler;

pub use adc::{AdcConverter, AdcFrontEnd};
pub use decomposition::{decompose, AcDc, SampleHistory};
pub use filter::PumpCurrentFilter;
pub use generator::{SimAnalog, SimExcitation, SimulatedCell};
pub use hardware::{AnalogResult, AnalogSource, ExcitationToggle};
pub use measurements::{pump_nominal_current, sensor_internal_resistance, EsrStatus, Measurements};
pub use sampler::{CycleOutput, SignalSampler};
