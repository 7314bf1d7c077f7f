//! # Transfer Statistics
//!
//! Counters both engines accumulate during a run, serializable for JSON
//! export and summarised into the CSV timing log at shutdown.

use serde::Serialize;

// ─── Sender Stats ───────────────────────────────────────────────────────────

/// Sender-side counters for one transfer.
#[derive(Debug, Clone, Default, Serialize)]
pub struct SenderStats {
    /// DATA packets committed (every destination acknowledged).
    pub packet_count: u64,
    /// Stop-and-wait timer expiries (each triggers a retransmission pass).
    pub timeout_events: u64,
    /// Payload bytes accepted from the producer.
    pub bytes_consumed: u64,
}

impl SenderStats {
    pub fn new() -> Self {
        Self::default()
    }

    /// Estimated per-destination effective loss:
    /// `timeout_events / packet_count / destinations`.
    pub fn effective_loss(&self, destinations: usize) -> f64 {
        if self.packet_count == 0 || destinations == 0 {
            0.0
        } else {
            self.timeout_events as f64 / self.packet_count as f64 / destinations as f64
        }
    }
}

// ─── Receiver Stats ─────────────────────────────────────────────────────────

/// Receiver-side counters for one transfer.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ReceiverStats {
    /// DATA packets accepted and acknowledged.
    pub packet_count: u64,
    /// Valid packets discarded by the loss injector.
    pub dropped_count: u64,
    /// Payload bytes handed to the consumer.
    pub bytes_written: u64,
    /// Configured injector probability in basis points of 10 000.
    pub loss_probability_bp: u32,
}

impl ReceiverStats {
    pub fn new() -> Self {
        Self::default()
    }

    /// Configured injector probability as a fraction.
    pub fn configured_loss(&self) -> f64 {
        self.loss_probability_bp as f64 / 10_000.0
    }

    /// Observed drop fraction: `dropped / (accepted + dropped)`.
    pub fn effective_loss(&self) -> f64 {
        let total = self.packet_count + self.dropped_count;
        if total == 0 {
            0.0
        } else {
            self.dropped_count as f64 / total as f64
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // ─── SenderStats ────────────────────────────────────────────────────

    #[test]
    fn sender_effective_loss() {
        let stats = SenderStats {
            packet_count: 100,
            timeout_events: 10,
            bytes_consumed: 0,
        };
        assert!((stats.effective_loss(1) - 0.10).abs() < 1e-9);
        assert!((stats.effective_loss(2) - 0.05).abs() < 1e-9);
    }

    #[test]
    fn sender_effective_loss_zero_div() {
        let stats = SenderStats::new();
        assert_eq!(stats.effective_loss(1), 0.0);
        assert_eq!(stats.effective_loss(0), 0.0);
    }

    // ─── ReceiverStats ──────────────────────────────────────────────────

    #[test]
    fn receiver_effective_loss() {
        let stats = ReceiverStats {
            packet_count: 90,
            dropped_count: 10,
            bytes_written: 0,
            loss_probability_bp: 1_000,
        };
        assert!((stats.effective_loss() - 0.10).abs() < 1e-9);
        assert!((stats.configured_loss() - 0.10).abs() < 1e-9);
    }

    #[test]
    fn receiver_effective_loss_zero_div() {
        assert_eq!(ReceiverStats::new().effective_loss(), 0.0);
    }

    #[test]
    fn stats_serialize_to_json() {
        let stats = SenderStats {
            packet_count: 42,
            timeout_events: 3,
            bytes_consumed: 60_000,
        };
        let json = serde_json::to_string(&stats).unwrap();
        assert!(json.contains("\"packet_count\":42"));
        assert!(json.contains("\"timeout_events\":3"));
    }
}
