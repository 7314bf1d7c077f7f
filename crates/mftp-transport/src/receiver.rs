//! # Stop-and-Wait Receiver Engine
//!
//! Blocks on the bound socket, validates each datagram against the
//! expected sequence cursor, and writes accepted payloads to the consumer
//! in arrival order, which under stop-and-wait is producer order.
//!
//! The validation chain runs in a fixed order and short-circuits: sequence
//! number, checksum, packet type, then the loss injector. Every failure is
//! a silent drop on the wire (the sender's timer covers recovery); in
//! particular duplicates are **not** re-ACKed, so a lost ACK is repaired
//! only by the sender retransmitting into the advanced cursor.

use std::io::Write;
use std::net::UdpSocket;
use std::path::PathBuf;

use crate::endpoint;
use crate::loss::LossInjector;
use crate::report;
use crate::stats::ReceiverStats;
use crate::wire::{self, PacketTag, HEADER_LEN, MSG_LEN};
use crate::TransportError;

// ─── Configuration ──────────────────────────────────────────────────────────

/// Receiver configuration.
#[derive(Debug, Clone)]
pub struct ReceiverConfig {
    /// UDP port to bind; 0 selects an ephemeral port.
    pub port: u16,
    /// Injected drop probability in `[0, 1]`.
    pub loss_probability: f32,
    /// Deterministic injector seed; `None` seeds from OS entropy.
    pub loss_seed: Option<u64>,
    /// Timing-log CSV path.
    pub log_path: PathBuf,
}

impl Default for ReceiverConfig {
    fn default() -> Self {
        ReceiverConfig {
            port: 0,
            loss_probability: 0.0,
            loss_seed: None,
            log_path: PathBuf::from(report::DEFAULT_LOG_PATH),
        }
    }
}

// ─── Receiver ───────────────────────────────────────────────────────────────

/// Stop-and-wait receiver bound to one inbound socket.
pub struct SawReceiver {
    socket: UdpSocket,
    /// Sequence number the next acceptable DATA packet must carry.
    expected_seq: u32,
    /// ACK value for that packet; always `expected_seq + 1`.
    next_ack_num: u32,
    in_buffer: [u8; MSG_LEN],
    loss: LossInjector,
    stats: ReceiverStats,
    log_path: PathBuf,
}

impl SawReceiver {
    /// Bind the inbound socket and seed the loss injector.
    pub fn new(config: ReceiverConfig) -> Result<Self, TransportError> {
        let socket = endpoint::bind_inbound(config.port)?;
        let port = socket.local_addr()?.port();
        let loss = match config.loss_seed {
            Some(seed) => LossInjector::with_seed(config.loss_probability, seed),
            None => LossInjector::new(config.loss_probability),
        };
        tracing::info!(port, loss_bp = loss.loss_bp(), "receiver listening");

        let stats = ReceiverStats {
            loss_probability_bp: loss.loss_bp(),
            ..ReceiverStats::new()
        };
        Ok(SawReceiver {
            socket,
            expected_seq: 0,
            next_ack_num: 1,
            in_buffer: [0u8; MSG_LEN],
            loss,
            stats,
            log_path: config.log_path,
        })
    }

    /// Port the inbound socket is bound to.
    pub fn local_port(&self) -> Result<u16, TransportError> {
        Ok(self.socket.local_addr()?.port())
    }

    /// Counters accumulated so far.
    pub fn stats(&self) -> &ReceiverStats {
        &self.stats
    }

    /// Run the receive loop until FIN, writing accepted payloads to
    /// `consumer` in order.
    pub fn receive(&mut self, consumer: &mut impl Write) -> Result<(), TransportError> {
        loop {
            self.in_buffer.fill(0);
            let Some((n, src)) = endpoint::recv_from(&self.socket, &mut self.in_buffer)? else {
                continue;
            };
            if n < HEADER_LEN {
                continue;
            }

            if wire::decode_tag(&self.in_buffer) == Some(PacketTag::Fin) {
                tracing::debug!(seq = wire::decode_seq(&self.in_buffer), "fin received");
                break;
            }

            if !self.accept_data(n) {
                continue;
            }

            consumer.write_all(&self.in_buffer[HEADER_LEN..n])?;
            self.stats.bytes_written += (n - HEADER_LEN) as u64;

            let mut ack = [0u8; HEADER_LEN];
            wire::encode_seq(&mut ack, self.next_ack_num);
            wire::encode_tag(&mut ack, PacketTag::Ack);
            endpoint::send_to(&self.socket, &ack, src)?;

            self.expected_seq += 1;
            self.next_ack_num += 1;
            self.stats.packet_count += 1;
        }

        consumer.flush()?;
        self.finish();
        Ok(())
    }

    /// The validation chain, in order, short-circuiting on the first
    /// failure. Returns `true` when the packet must be written and ACKed.
    fn accept_data(&mut self, n: usize) -> bool {
        let seq = wire::decode_seq(&self.in_buffer);
        if seq != self.expected_seq {
            // Duplicates land here (seq < expected) and are dropped
            // without a fresh ACK.
            tracing::debug!(seq, expected = self.expected_seq, len = n, "sequence mismatch");
            return false;
        }
        if !wire::verify_checksum(&self.in_buffer) {
            tracing::warn!(seq, "invalid checksum");
            return false;
        }
        if wire::decode_tag(&self.in_buffer) != Some(PacketTag::Data) {
            tracing::warn!(seq, "invalid packet type");
            return false;
        }
        if !self.loss.keep() {
            self.stats.dropped_count += 1;
            tracing::warn!(seq, "injected packet loss");
            return false;
        }
        true
    }

    /// End-of-run bookkeeping: CSV row plus the summary report.
    fn finish(&self) {
        if let Err(e) = report::append_receiver_row(&self.log_path, &self.stats) {
            tracing::warn!(path = %self.log_path.display(), error = %e, "timing log append failed");
        }
        tracing::info!(
            packets = self.stats.packet_count,
            dropped = self.stats.dropped_count,
            bytes = self.stats.bytes_written,
            configured_loss = self.stats.configured_loss(),
            effective_loss = self.stats.effective_loss(),
            "transfer complete"
        );
    }
}
