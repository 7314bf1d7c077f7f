//! # Stop-and-Wait Sender Engine
//!
//! Accepts one byte at a time from the producer, fragments the stream into
//! fixed-size DATA packets, and transmits each packet to **every**
//! configured destination before advancing the sequence number. The wait
//! phase polls all destinations round-robin from the single engine thread;
//! the per-socket 10 µs receive timeout keeps the polling fair without
//! busy-spinning.
//!
//! ## Transfer lifecycle
//!
//! 1. [`SawSender::send`] fills the outgoing buffer; a full buffer commits
//!    the packet and blocks until every destination ACKs it.
//! 2. Each fresh ACK feeds the RTT estimator; timer expiry retransmits to
//!    the destinations still missing an ACK. There is no retry ceiling,
//!    so a permanently dead destination stalls the transfer.
//! 3. [`SawSender::shutdown`] flushes the residual bytes as a short final
//!    packet, fires FIN at every destination, and appends the CSV report.

use std::net::{SocketAddr, UdpSocket};
use std::path::PathBuf;
use std::time::Duration;

use quanta::Instant;

use crate::endpoint;
use crate::report;
use crate::rtt::RttEstimator;
use crate::stats::SenderStats;
use crate::wire::{self, PacketTag, HEADER_LEN, MAX_MSS, MSG_LEN};
use crate::TransportError;

/// FIN is unacknowledged; repeating it a few times with a short gap keeps
/// a single lost datagram from hanging the receiver.
const FIN_REPEAT: u32 = 3;
const FIN_GAP: Duration = Duration::from_millis(1);

const MIB: u64 = 1_048_576;

// ─── Configuration ──────────────────────────────────────────────────────────

/// Sender configuration.
#[derive(Debug, Clone)]
pub struct SenderConfig {
    /// Destination hostnames, one receiver each. A `host:port` entry
    /// overrides the shared port for that receiver.
    pub destinations: Vec<String>,
    /// UDP port every receiver listens on.
    pub port: u16,
    /// Payload bytes per DATA packet, `1..=MAX_MSS`.
    pub mss: usize,
    /// Timing-log CSV path.
    pub log_path: PathBuf,
}

impl Default for SenderConfig {
    fn default() -> Self {
        SenderConfig {
            destinations: Vec::new(),
            port: 0,
            mss: 1024,
            log_path: PathBuf::from(report::DEFAULT_LOG_PATH),
        }
    }
}

// ─── Destination State ──────────────────────────────────────────────────────

/// Per-receiver acknowledgement cursor.
///
/// `last_ack` is always `current_seq` (in flight or idle) or
/// `current_seq + 1` (acknowledged for the packet in flight).
#[derive(Debug)]
struct Destination {
    addr: SocketAddr,
    socket: UdpSocket,
    /// Segments delivered to this receiver.
    next_segment: u32,
    /// Highest ACK value seen from this receiver.
    last_ack: u32,
}

// ─── Sender ─────────────────────────────────────────────────────────────────

/// Stop-and-wait sender over one or more destinations.
pub struct SawSender {
    destinations: Vec<Destination>,
    mss: usize,
    /// Next sequence number to transmit.
    current_seq: u32,
    /// `current_seq + 1` while a packet is in flight, else `current_seq`.
    expected_ack: u32,
    /// Fill level of the payload region, `0..=mss`.
    byte_index: usize,
    out_buffer: [u8; MSG_LEN],
    in_buffer: [u8; MSG_LEN],
    rtt: RttEstimator,
    timer_start: Instant,
    started_at: Instant,
    stats: SenderStats,
    last_milestone_mib: u64,
    log_path: PathBuf,
}

impl SawSender {
    /// Resolve every destination and open one polling socket per receiver.
    pub fn new(config: SenderConfig) -> Result<Self, TransportError> {
        if config.destinations.is_empty() {
            return Err(TransportError::NoDestinations);
        }
        if config.mss == 0 || config.mss > MAX_MSS {
            return Err(TransportError::InvalidMss {
                mss: config.mss,
                max: MAX_MSS,
            });
        }

        let mut destinations = Vec::with_capacity(config.destinations.len());
        for host in &config.destinations {
            let addr = endpoint::resolve_destination(host, config.port)?;
            let socket = endpoint::open_outbound()?;
            tracing::info!(host = %host, %addr, "destination attached");
            destinations.push(Destination {
                addr,
                socket,
                next_segment: 0,
                last_ack: 0,
            });
        }

        let now = Instant::now();
        Ok(SawSender {
            destinations,
            mss: config.mss,
            current_seq: 0,
            expected_ack: 0,
            byte_index: 0,
            out_buffer: [0u8; MSG_LEN],
            in_buffer: [0u8; MSG_LEN],
            rtt: RttEstimator::new(),
            timer_start: now,
            started_at: now,
            stats: SenderStats::new(),
            last_milestone_mib: 0,
            log_path: config.log_path,
        })
    }

    /// Accept one byte from the producer.
    ///
    /// When the buffer reaches MSS the pending packet is committed first:
    /// the call blocks until every destination has acknowledged it, then
    /// the byte lands as the first payload byte of the next packet.
    pub fn send(&mut self, byte: u8) -> Result<(), TransportError> {
        while self.byte_index >= self.mss {
            self.commit_and_wait()?;
        }
        self.out_buffer[HEADER_LEN + self.byte_index] = byte;
        self.byte_index += 1;
        self.stats.bytes_consumed += 1;
        Ok(())
    }

    /// Flush the residual payload as a (possibly empty) short final
    /// packet, emit FIN, and append the timing-log row.
    ///
    /// An empty transfer still commits one zero-payload packet so the
    /// receiver observes at least one acknowledged segment before FIN.
    pub fn shutdown(mut self) -> Result<SenderStats, TransportError> {
        let full_mss = self.mss;
        self.mss = self.byte_index;
        self.commit_and_wait()?;
        self.mss = full_mss;

        self.send_fin()?;

        let elapsed_secs = self.started_at.elapsed().as_secs_f64();
        let effective_loss = self.stats.effective_loss(self.destinations.len());
        if let Err(e) = report::append_sender_row(
            &self.log_path,
            self.destinations.len(),
            self.mss,
            effective_loss,
            elapsed_secs,
        ) {
            tracing::warn!(path = %self.log_path.display(), error = %e, "timing log append failed");
        }

        tracing::info!(
            packets = self.stats.packet_count,
            timeout_events = self.stats.timeout_events,
            effective_loss,
            timeout_s = self.rtt.timeout_us() as f64 / 1e6,
            est_rtt_s = self.rtt.est_rtt_us() / 1e6,
            elapsed_s = elapsed_secs,
            "transfer complete"
        );

        Ok(self.stats)
    }

    /// Counters accumulated so far.
    pub fn stats(&self) -> &SenderStats {
        &self.stats
    }

    /// Number of attached destinations.
    pub fn destination_count(&self) -> usize {
        self.destinations.len()
    }

    // ─── Internals ───────────────────────────────────────────────────────

    /// Commit the buffered packet: encode, transmit to every unacked
    /// destination, run the stop-and-wait phase to completion, then reset
    /// the buffer and advance the sequence.
    fn commit_and_wait(&mut self) -> Result<(), TransportError> {
        // First attempt for this sequence number.
        if self.expected_ack == self.current_seq {
            self.expected_ack = self.current_seq + 1;
        }

        wire::encode_seq(&mut self.out_buffer, self.current_seq);
        wire::encode_tag(&mut self.out_buffer, PacketTag::Data);
        wire::encode_checksum(&mut self.out_buffer);

        self.timer_start = Instant::now();
        self.transmit_unacked()?;
        self.process_acks_and_retransmissions()?;

        // Zero the whole scratch region so the next packet's checksum span
        // holds no stale bytes.
        self.out_buffer.fill(0);
        self.byte_index = 0;
        self.current_seq += 1;
        self.stats.packet_count += 1;

        let mib = self.stats.bytes_consumed / MIB;
        if mib > self.last_milestone_mib {
            self.last_milestone_mib = mib;
            tracing::info!("{mib} MiB transmitted");
        }

        Ok(())
    }

    /// Send the committed packet to every destination still missing its
    /// ACK. On the first attempt that is all of them.
    fn transmit_unacked(&mut self) -> Result<(), TransportError> {
        let frame = HEADER_LEN + self.mss;
        for dest in &self.destinations {
            if dest.last_ack == self.current_seq {
                endpoint::send_to(&dest.socket, &self.out_buffer[..frame], dest.addr)?;
            }
        }
        Ok(())
    }

    /// The stop-and-wait phase: poll every unacked destination in strict
    /// round-robin until all have acknowledged `current_seq`, retransmitting
    /// on every timer expiry.
    fn process_acks_and_retransmissions(&mut self) -> Result<(), TransportError> {
        while !self.all_acked() {
            for i in 0..self.destinations.len() {
                if self.destinations[i].last_ack != self.current_seq {
                    continue;
                }
                let received =
                    endpoint::recv_from(&self.destinations[i].socket, &mut self.in_buffer)?;
                let Some((n, _)) = received else { continue };
                if n < HEADER_LEN || wire::decode_seq(&self.in_buffer) != self.current_seq + 1 {
                    // Stale or malformed ACK; keep polling.
                    continue;
                }

                let sample_us = self.timer_start.elapsed().as_micros() as f64;
                self.rtt.observe(sample_us);

                let dest = &mut self.destinations[i];
                dest.last_ack = self.current_seq + 1;
                dest.next_segment += 1;
                tracing::debug!(
                    dest = %dest.addr,
                    seq = self.current_seq,
                    segment = dest.next_segment,
                    "ack received"
                );
            }

            if self.timer_start.elapsed().as_micros() as u64 >= self.rtt.timeout_us() {
                tracing::warn!(
                    seq = self.current_seq,
                    timeout_us = self.rtt.timeout_us(),
                    "retransmission timeout"
                );
                self.stats.timeout_events += 1;
                self.timer_start = Instant::now();
                self.transmit_unacked()?;
            }
        }
        Ok(())
    }

    fn all_acked(&self) -> bool {
        self.destinations
            .iter()
            .all(|d| d.last_ack == self.current_seq + 1)
    }

    /// Fire-and-forget FIN on every destination socket. Repeated a few
    /// times since nothing acknowledges it.
    fn send_fin(&mut self) -> Result<(), TransportError> {
        self.out_buffer.fill(0);
        wire::encode_seq(&mut self.out_buffer, self.current_seq);
        wire::encode_tag(&mut self.out_buffer, PacketTag::Fin);

        for attempt in 0..FIN_REPEAT {
            for dest in &self.destinations {
                endpoint::send_to(&dest.socket, &self.out_buffer[..HEADER_LEN], dest.addr)?;
            }
            if attempt + 1 < FIN_REPEAT {
                std::thread::sleep(FIN_GAP);
            }
        }
        tracing::debug!(seq = self.current_seq, "fin emitted");
        Ok(())
    }
}
