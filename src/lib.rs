//! Signal conditioning core for a heated wideband lambda sensor.
//!
//! A periodic [`SignalSampler`] toggles the AC excitation, acquires the Nernst
//! and pump sense voltages, splits the Nernst signal into its AC and DC parts
//! and low-pass filters the pump sense voltage. [`Measurements`] turns the
//! published state into cell resistance and pump current, and
//! [`PidController`] is the loop primitive heater and pump control build on.

pub mod async_impl;
pub mod config;
pub mod control;
pub mod error;
pub mod ipc;
pub mod metrics;
pub mod sensor;
pub mod threaded_impl;

pub use config::{load_config, PhysicalConstants, RuntimeConfig, SamplingConfig};
pub use control::PidController;
pub use error::{AcquisitionError, ConfigError};
pub use ipc::DerivedState;
pub use metrics::{MetricsReport, SamplingStats, TimingMetrics};
pub use sensor::{
    AnalogResult, AnalogSource, EsrStatus, ExcitationToggle, Measurements, SignalSampler,
    SimulatedCell,
};
pub use threaded_impl::{start_sampling, SamplingHandle};
