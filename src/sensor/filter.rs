// First-order low-pass (exponential moving average) for the pump current sense voltage

/// Filters the pump sense amplifier output relative to its half-supply reference.
///
/// `value = (1 - alpha) * value + alpha * (raw - reference)`
#[derive(Debug, Clone, PartialEq)]
pub struct PumpCurrentFilter {
    alpha: f32,
    reference: f32,
    value: f32,
}

impl PumpCurrentFilter {
    pub fn new(alpha: f32, reference: f32) -> Self {
        Self { alpha, reference, value: 0.0 }
    }

    pub fn push(&mut self, raw_voltage: f32) -> f32 {
        self.value = (1.0 - self.alpha) * self.value + self.alpha * (raw_voltage - self.reference);
        self.value
    }

    pub fn value(&self) -> f32 {
        self.value
    }

    pub fn alpha(&self) -> f32 {
        self.alpha
    }
}
