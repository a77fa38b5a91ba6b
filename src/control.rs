//! Control module - P + clamped-I controller used by heater and pump loops

pub mod pid;

pub use pid::PidController;
