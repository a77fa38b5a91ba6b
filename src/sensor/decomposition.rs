//! AC/DC separation of the Nernst voltage.
//!
//! The excitation flips phase every sample, so consecutive readings sit on
//! alternate sides of the cell's DC level. Comparing the middle reading `r2`
//! against the mean of its neighbours `r1` and `r3` (both in the opposite phase)
//! yields the AC amplitude with any linear DC slope cancelled:
//!
//! ```text
//! r2_opposite = (r1 + r3) / 2
//! ac          = |r2_opposite - r2|
//! dc          = (r2_opposite + r2) / 2
//! ```

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AcDc {
    /// Peak-to-peak amplitude of the injected excitation, never negative.
    pub ac: f32,
    /// Underlying cell voltage.
    pub dc: f32,
}

/// Decompose the three most recent readings, `r1` newest and `r3` oldest.
pub fn decompose(r1: f32, r2: f32, r3: f32) -> AcDc {
    // Where r2 would have been without the phase flip
    let r2_opposite_phase = (r1 + r3) / 2.0;

    AcDc {
        ac: (r2_opposite_phase - r2).abs(),
        dc: (r2_opposite_phase + r2) / 2.0,
    }
}

/// The two readings preceding the current one.
///
/// Together with the reading being pushed this forms the three-sample window.
/// Both slots start at zero, so the first two cycles after startup decompose
/// against placeholder history.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct SampleHistory {
    r2: f32,
    r3: f32,
}

impl SampleHistory {
    pub fn new() -> Self {
        Self::default()
    }

    /// History as if `r2` then `r3` had been the last two readings.
    pub fn with_readings(r2: f32, r3: f32) -> Self {
        Self { r2, r3 }
    }

    /// Decompose against the stored history, then shift: `r3 <- r2`, `r2 <- r1`.
    pub fn push(&mut self, r1: f32) -> AcDc {
        let out = decompose(r1, self.r2, self.r3);

        self.r3 = self.r2;
        self.r2 = r1;

        out
    }

    pub fn r2(&self) -> f32 {
        self.r2
    }

    pub fn r3(&self) -> f32 {
        self.r3
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    #[test]
    fn no_slope_degenerates_to_alternation_amplitude() {
        let out = decompose(0.7, 0.4, 0.7);
        assert_eq!(out.ac, (0.7f32 - 0.4).abs());
        assert_eq!(out.dc, (0.7 + 0.4) / 2.0);
    }

    #[test]
    fn pure_ramp_has_zero_ac() {
        // Binary-exact steps so the identity holds bit for bit
        let x = 0.25;
        let d = 0.125;
        let out = decompose(x + 2.0 * d, x + d, x);
        assert_eq!(out.ac, 0.0);
        assert_eq!(out.dc, x + d);
    }

    #[test]
    fn ramp_with_square_wave_recovers_amplitude() {
        let mut history = SampleHistory::new();
        let amplitude = 0.5;
        let mut last = None;
        for n in 0..20 {
            let drift = 0.0625 * n as f32;
            let phase = if n % 2 == 0 { amplitude / 2.0 } else { -amplitude / 2.0 };
            last = Some(history.push(1.0 + drift + phase));
        }
        let out = last.expect("pushed at least once");
        assert!((out.ac - amplitude).abs() < 1e-5, "ac was {}", out.ac);
    }

    #[test]
    fn ac_is_never_negative() {
        let mut rng = StdRng::seed_from_u64(7);
        let mut history = SampleHistory::new();
        for _ in 0..1000 {
            let out = history.push(rng.gen_range(-5.0..5.0));
            assert!(out.ac >= 0.0);
        }
    }

    #[test]
    fn push_shifts_history() {
        let mut history = SampleHistory::with_readings(2.0, 3.0);
        history.push(1.0);
        assert_eq!(history.r2(), 1.0);
        assert_eq!(history.r3(), 2.0);

        history.push(4.0);
        assert_eq!(history.r2(), 4.0);
        assert_eq!(history.r3(), 1.0);
    }

    #[test]
    fn push_uses_stored_window() {
        let mut history = SampleHistory::with_readings(0.4, 0.7);
        assert_eq!(history.push(0.7), decompose(0.7, 0.4, 0.7));
    }

    #[test]
    fn startup_history_is_zero() {
        let mut history = SampleHistory::new();
        // r2 = r3 = 0: opposite estimate is r1 / 2
        let out = history.push(1.0);
        assert_eq!(out.ac, 0.5);
        assert_eq!(out.dc, 0.25);
    }
}
