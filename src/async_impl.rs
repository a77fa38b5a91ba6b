//! Async runner - Drives a `SignalSampler` from a tokio task

pub mod sampling_task;

pub use sampling_task::sampling_task;
