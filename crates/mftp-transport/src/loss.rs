//! # Loss Injector
//!
//! Probabilistic drop filter for loss experiments on the receiver. The
//! PRNG is an explicit value owned by the injector rather than
//! process-global state, so a seeded injector replays the exact same
//! drop pattern across runs.

use rand::rngs::StdRng;
use rand::RngExt as _;
use rand::SeedableRng;

/// Resolution of the configured probability: basis points of 10 000.
const BASIS_POINTS: u32 = 10_000;

/// Uniform drop filter over accepted DATA packets.
#[derive(Debug)]
pub struct LossInjector {
    rng: StdRng,
    loss_bp: u32,
}

impl LossInjector {
    /// Build an injector for a drop probability in `[0, 1]`, seeded from
    /// OS entropy so repeated runs differ.
    pub fn new(probability: f32) -> Self {
        let seed = rand::rng().random::<u64>();
        Self::with_seed(probability, seed)
    }

    /// Deterministically seeded variant for reproducible runs.
    pub fn with_seed(probability: f32, seed: u64) -> Self {
        let loss_bp = (probability.clamp(0.0, 1.0) * BASIS_POINTS as f32).round() as u32;
        LossInjector {
            rng: StdRng::seed_from_u64(seed),
            loss_bp,
        }
    }

    /// Draw once: `true` to keep the packet, `false` to drop it.
    pub fn keep(&mut self) -> bool {
        self.rng.random_range(0..BASIS_POINTS) >= self.loss_bp
    }

    /// Configured drop probability in basis points of 10 000.
    pub fn loss_bp(&self) -> u32 {
        self.loss_bp
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_probability_keeps_everything() {
        let mut inj = LossInjector::with_seed(0.0, 7);
        assert!((0..10_000).all(|_| inj.keep()));
    }

    #[test]
    fn full_probability_drops_everything() {
        let mut inj = LossInjector::with_seed(1.0, 7);
        assert!((0..10_000).all(|_| !inj.keep()));
    }

    #[test]
    fn probability_rounds_to_basis_points() {
        assert_eq!(LossInjector::with_seed(0.1, 0).loss_bp(), 1_000);
        assert_eq!(LossInjector::with_seed(0.0001, 0).loss_bp(), 1);
        assert_eq!(LossInjector::with_seed(0.55555, 0).loss_bp(), 5_556);
    }

    #[test]
    fn out_of_range_probability_clamped() {
        assert_eq!(LossInjector::with_seed(1.5, 0).loss_bp(), 10_000);
        assert_eq!(LossInjector::with_seed(-0.5, 0).loss_bp(), 0);
    }

    #[test]
    fn same_seed_replays_same_pattern() {
        let mut a = LossInjector::with_seed(0.3, 42);
        let mut b = LossInjector::with_seed(0.3, 42);
        let pattern_a: Vec<bool> = (0..1_000).map(|_| a.keep()).collect();
        let pattern_b: Vec<bool> = (0..1_000).map(|_| b.keep()).collect();
        assert_eq!(pattern_a, pattern_b);
    }

    #[test]
    fn drop_frequency_tracks_configuration() {
        let mut inj = LossInjector::with_seed(0.1, 1234);
        let dropped = (0..100_000).filter(|_| !inj.keep()).count();
        // Deterministic for the fixed seed; the bound just documents that
        // the frequency lands near the configured 10%.
        assert!(
            (8_000..12_000).contains(&dropped),
            "observed {dropped} drops out of 100k at 10%"
        );
    }
}
