//! # mftp-transport
//!
//! MFTP — one-way reliable file transfer over UDP.
//!
//! A single sender streams a file bytewise to one or more receivers using a
//! stop-and-wait engine: fixed 8-byte packet framing with a 16-bit
//! one's-complement checksum, per-destination ACK tracking, adaptive
//! RTT-based retransmission timeouts, and a FIN teardown. The receiver
//! validates each datagram, writes payloads in order, and can drop accepted
//! packets probabilistically for loss experiments.
//!
//! ## Crate structure
//!
//! - [`wire`] — packet header codec and checksum
//! - [`endpoint`] — UDP socket setup and datagram send/recv wrappers
//! - [`rtt`] — Jacobson/Karels retransmission-timeout estimator
//! - [`loss`] — probabilistic drop filter for the receiver
//! - [`sender`] — stop-and-wait sender engine
//! - [`receiver`] — stop-and-wait receiver engine
//! - [`stats`] — sender/receiver transfer statistics
//! - [`report`] — CSV timing-log reporter

pub mod endpoint;
pub mod loss;
pub mod receiver;
pub mod report;
pub mod rtt;
pub mod sender;
pub mod stats;
pub mod wire;

use std::io;

/// Errors surfaced by the transport engines.
///
/// Transient conditions (receive timeouts, malformed packets) are absorbed
/// inside the stop-and-wait loops and never reach this type; only
/// configuration and fatal socket failures do.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("bind error on port {port}: {source}")]
    Bind { port: u16, source: io::Error },

    #[error("cannot resolve host '{host}'")]
    Resolve { host: String },

    #[error("segment size {mss} outside valid range 1..={max}")]
    InvalidMss { mss: usize, max: usize },

    #[error("no destinations configured")]
    NoDestinations,

    #[error("socket error: {0}")]
    Io(#[from] io::Error),
}
