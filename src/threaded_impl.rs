//! Threaded runner - Drives a `SignalSampler` from a dedicated OS thread

pub mod sampling_thread;

pub use sampling_thread::{spawn_sampling_thread, start_sampling, SamplingHandle};
