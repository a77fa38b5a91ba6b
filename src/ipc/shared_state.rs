use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};

/// An `f32` stored as its bit pattern in an `AtomicU32`.
#[derive(Debug)]
pub struct AtomicF32(AtomicU32);

impl AtomicF32 {
    pub fn new(value: f32) -> Self {
        Self(AtomicU32::new(value.to_bits()))
    }

    pub fn load(&self, order: Ordering) -> f32 {
        f32::from_bits(self.0.load(order))
    }

    pub fn store(&self, value: f32, order: Ordering) {
        self.0.store(value.to_bits(), order);
    }
}

// ============================================================================
// DERIVED STATE - Single writer (sampling task), many readers
// ============================================================================

/// Latest AC/DC decomposition and filtered pump sense voltage.
///
/// Each field is an independent scalar. A reader may observe fields from two
/// adjacent cycles; the quantities vary slowly enough that this is harmless.
/// Only the sampling task should call [`DerivedState::publish`].
#[derive(Debug)]
pub struct DerivedState {
    nernst_ac: AtomicF32,
    nernst_dc: AtomicF32,
    pump_current_sense_voltage: AtomicF32,
    cycles: AtomicU64,
}

/// Plain copy of the published state at one instant.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StateSnapshot {
    pub nernst_ac: f32,
    pub nernst_dc: f32,
    pub pump_current_sense_voltage: f32,
    pub cycle: u64,
}

impl DerivedState {
    pub fn new() -> Self {
        Self {
            nernst_ac: AtomicF32::new(0.0),
            nernst_dc: AtomicF32::new(0.0),
            pump_current_sense_voltage: AtomicF32::new(0.0),
            cycles: AtomicU64::new(0),
        }
    }

    pub fn publish(&self, nernst_ac: f32, nernst_dc: f32, pump_current_sense_voltage: f32) {
        self.nernst_ac.store(nernst_ac, Ordering::Relaxed);
        self.nernst_dc.store(nernst_dc, Ordering::Relaxed);
        self.pump_current_sense_voltage
            .store(pump_current_sense_voltage, Ordering::Relaxed);
        // Release so a reader that sees the new count also sees this cycle's values
        self.cycles.fetch_add(1, Ordering::Release);
    }

    pub fn nernst_ac(&self) -> f32 {
        self.nernst_ac.load(Ordering::Relaxed)
    }

    pub fn nernst_dc(&self) -> f32 {
        self.nernst_dc.load(Ordering::Relaxed)
    }

    pub fn pump_current_sense_voltage(&self) -> f32 {
        self.pump_current_sense_voltage.load(Ordering::Relaxed)
    }

    /// Number of cycles published so far.
    pub fn cycles(&self) -> u64 {
        self.cycles.load(Ordering::Acquire)
    }

    pub fn snapshot(&self) -> StateSnapshot {
        let cycle = self.cycles();
        StateSnapshot {
            nernst_ac: self.nernst_ac(),
            nernst_dc: self.nernst_dc(),
            pump_current_sense_voltage: self.pump_current_sense_voltage(),
            cycle,
        }
    }
}

impl Default for DerivedState {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn atomic_f32_preserves_special_values() {
        let a = AtomicF32::new(-0.0);
        assert!(a.load(Ordering::Relaxed).is_sign_negative());
        a.store(f32::INFINITY, Ordering::Relaxed);
        assert_eq!(a.load(Ordering::Relaxed), f32::INFINITY);
        a.store(f32::NAN, Ordering::Relaxed);
        assert!(a.load(Ordering::Relaxed).is_nan());
    }

    #[test]
    fn publish_updates_all_fields_and_counter() {
        let state = DerivedState::new();
        assert_eq!(state.cycles(), 0);

        state.publish(0.25, 0.45, -0.01);
        let snap = state.snapshot();
        assert_eq!(snap.nernst_ac, 0.25);
        assert_eq!(snap.nernst_dc, 0.45);
        assert_eq!(snap.pump_current_sense_voltage, -0.01);
        assert_eq!(snap.cycle, 1);
    }

    #[test]
    fn readers_on_other_threads_see_published_values() {
        let state = Arc::new(DerivedState::new());

        let writer = {
            let state = Arc::clone(&state);
            thread::spawn(move || {
                for i in 1..=1000 {
                    state.publish(i as f32, -(i as f32), 0.0);
                }
            })
        };
        writer.join().expect("writer thread panicked");

        let reader = {
            let state = Arc::clone(&state);
            thread::spawn(move || state.snapshot())
        };
        let snap = reader.join().expect("reader thread panicked");
        assert_eq!(snap.cycle, 1000);
        assert_eq!(snap.nernst_ac, 1000.0);
        assert_eq!(snap.nernst_dc, -1000.0);
    }
}
