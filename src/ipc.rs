//! IPC module - State published by the sampling task to any number of readers

pub mod shared_state;

pub use shared_state::{AtomicF32, DerivedState, StateSnapshot};
