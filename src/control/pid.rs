use std::time::Duration;

use crate::config::PiTuning;

/// Proportional + clamped-integral controller.
///
/// There is no derivative term. The integrator is hard-saturated at
/// `±integrator_clamp`, which is the only anti-windup measure.
///
/// `compute_output` integrates with a fixed `sample_period`; call it at that
/// cadence or the integral gain loses its units.
#[derive(Debug, Clone)]
pub struct PidController {
    // Gains
    kp: f32,
    ki: f32,
    sample_period: Duration,
    period_secs: f32,
    integrator_clamp: f32,

    // State
    integrator: f32,
}

impl PidController {
    /// `integrator_clamp` must be finite; its sign is ignored. A NaN clamp would
    /// leave the integrator unbounded.
    pub fn new(kp: f32, ki: f32, integrator_clamp: f32, sample_period: Duration) -> Self {
        debug_assert!(
            integrator_clamp.is_finite(),
            "integrator clamp must be finite, got {}",
            integrator_clamp
        );
        Self {
            kp,
            ki,
            sample_period,
            period_secs: sample_period.as_secs_f32(),
            integrator_clamp: integrator_clamp.abs(),
            integrator: 0.0,
        }
    }

    pub fn from_tuning(tuning: &PiTuning) -> Self {
        Self::new(tuning.kp, tuning.ki, tuning.integrator_clamp, tuning.period())
    }

    pub fn compute_output(&mut self, setpoint: f32, observation: f32) -> f32 {
        let error = setpoint - observation;

        // Euler integration at the configured period
        self.integrator += error * self.period_secs * self.ki;

        if self.integrator > self.integrator_clamp {
            self.integrator = self.integrator_clamp;
        }
        if self.integrator < -self.integrator_clamp {
            self.integrator = -self.integrator_clamp;
        }

        self.kp * error + self.integrator
    }

    pub fn integrator(&self) -> f32 {
        self.integrator
    }

    pub fn integrator_clamp(&self) -> f32 {
        self.integrator_clamp
    }

    pub fn sample_period(&self) -> Duration {
        self.sample_period
    }
}
