//! # Retransmission-Timeout Estimator
//!
//! Jacobson/Karels-style smoothed RTT tracking (α = 1/8, β = 1/4),
//! simplified: every ACK is sampled, including ACKs of retransmitted
//! packets. Without Karn's exclusion the estimate drifts high under heavy
//! loss, which is the accepted trade-off for a stop-and-wait engine whose
//! only timer is this one.

/// Smoothed RTT state, all values in microseconds.
#[derive(Debug, Clone)]
pub struct RttEstimator {
    /// Exponentially-weighted RTT estimate.
    est_rtt_us: f64,
    /// Smoothed deviation of samples from the estimate.
    dev_rtt_us: f64,
    /// Current retransmission timeout: `EstRTT + 4 * DevRTT`.
    timeout_us: u64,
    /// Number of ACK samples observed.
    sample_count: u64,
}

/// Both smoothing terms start at one second, giving an initial timeout of
/// five seconds before the first sample arrives.
const INITIAL_RTT_US: f64 = 1_000_000.0;

impl RttEstimator {
    pub fn new() -> Self {
        let est_rtt_us = INITIAL_RTT_US;
        let dev_rtt_us = INITIAL_RTT_US;
        RttEstimator {
            est_rtt_us,
            dev_rtt_us,
            timeout_us: (est_rtt_us + 4.0 * dev_rtt_us) as u64,
            sample_count: 0,
        }
    }

    /// Fold one RTT sample into the estimate and recompute the timeout.
    ///
    /// The deviation term uses the freshly-updated estimate, matching the
    /// update order of the classic implementation.
    pub fn observe(&mut self, sample_us: f64) {
        self.est_rtt_us = 0.875 * self.est_rtt_us + 0.125 * sample_us;
        self.dev_rtt_us = 0.75 * self.dev_rtt_us + 0.25 * (self.est_rtt_us - sample_us).abs();
        self.timeout_us = (self.est_rtt_us + 4.0 * self.dev_rtt_us) as u64;
        self.sample_count += 1;
        tracing::trace!(
            sample_us,
            timeout_us = self.timeout_us,
            "rtt sample folded"
        );
    }

    /// Current retransmission timeout in microseconds.
    pub fn timeout_us(&self) -> u64 {
        self.timeout_us
    }

    /// Current smoothed RTT estimate in microseconds.
    pub fn est_rtt_us(&self) -> f64 {
        self.est_rtt_us
    }

    /// Current smoothed deviation in microseconds.
    pub fn dev_rtt_us(&self) -> f64 {
        self.dev_rtt_us
    }

    /// Number of samples folded so far.
    pub fn sample_count(&self) -> u64 {
        self.sample_count
    }
}

impl Default for RttEstimator {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn initial_timeout_is_five_seconds() {
        let rtt = RttEstimator::new();
        assert_eq!(rtt.timeout_us(), 5_000_000);
        assert_eq!(rtt.sample_count(), 0);
    }

    #[test]
    fn single_sample_update_matches_formula() {
        let mut rtt = RttEstimator::new();
        rtt.observe(500_000.0);

        // EstRTT = 0.875 * 1_000_000 + 0.125 * 500_000 = 937_500
        assert!((rtt.est_rtt_us() - 937_500.0).abs() < 1e-6);
        // DevRTT = 0.75 * 1_000_000 + 0.25 * |937_500 - 500_000| = 859_375
        assert!((rtt.dev_rtt_us() - 859_375.0).abs() < 1e-6);
        // timeout = 937_500 + 4 * 859_375 = 4_375_000
        assert_eq!(rtt.timeout_us(), 4_375_000);
    }

    #[test]
    fn converges_toward_stable_rtt() {
        let mut rtt = RttEstimator::new();
        for _ in 0..200 {
            rtt.observe(20_000.0);
        }
        assert!(
            (rtt.est_rtt_us() - 20_000.0).abs() < 100.0,
            "estimate should settle near the true RTT: {}",
            rtt.est_rtt_us()
        );
        // With zero jitter the deviation decays toward zero and the
        // timeout approaches the RTT itself.
        assert!(rtt.timeout_us() < 25_000);
        assert!(rtt.timeout_us() >= 20_000);
    }

    #[test]
    fn spike_widens_timeout() {
        let mut rtt = RttEstimator::new();
        for _ in 0..200 {
            rtt.observe(20_000.0);
        }
        let settled = rtt.timeout_us();

        rtt.observe(200_000.0);
        assert!(
            rtt.timeout_us() > settled,
            "an RTT spike must raise the timeout"
        );
    }
}
