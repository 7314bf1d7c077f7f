//! # MFTP Sender
//!
//! Streams one local file to one or more receivers over the stop-and-wait
//! transport, optionally repeating the transfer for experiment batches.
//!
//! ## Usage
//!
//! ```bash
//! # Single receiver
//! mftp-sender receiver-host 4455 payload.bin 1024
//!
//! # Fan-out to three receivers, repeat the experiment 5 times
//! mftp-sender host-a host-b host-c 4455 payload.bin 1024 r5
//! ```

use std::fs::File;
use std::io::{BufReader, Read};
use std::path::PathBuf;
use std::time::Duration;

use anyhow::anyhow;
use mftp_transport::report::DEFAULT_LOG_PATH;
use mftp_transport::sender::{SawSender, SenderConfig};

/// Pause between repeated transfers so the receiver can re-bind and the
/// runs start from a clean synchronisation point.
const REPETITION_PAUSE: Duration = Duration::from_millis(500);

fn main() -> anyhow::Result<()> {
    // ── Logging ─────────────────────────────────────────────────
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(true)
        .compact()
        .init();

    // ── Parse CLI ───────────────────────────────────────────────
    let args = parse_args()?;

    tracing::info!(
        hosts = ?args.hosts,
        port = args.port,
        file = %args.file.display(),
        mss = args.mss,
        repetitions = args.repetitions,
        "mftp-sender starting"
    );

    // ── Run the transfer (repetitions) times ────────────────────
    for rep in 0..args.repetitions {
        let config = SenderConfig {
            destinations: args.hosts.clone(),
            port: args.port,
            mss: args.mss,
            log_path: args.log_path.clone(),
        };
        let mut sender = SawSender::new(config)?;

        let file = File::open(&args.file)
            .map_err(|e| anyhow!("cannot open '{}': {e}", args.file.display()))?;
        let mut reader = BufReader::new(file);
        let mut chunk = [0u8; 8192];
        loop {
            let n = reader.read(&mut chunk)?;
            if n == 0 {
                break;
            }
            for &byte in &chunk[..n] {
                sender.send(byte)?;
            }
        }

        let stats = sender.shutdown()?;
        tracing::info!(
            run = rep + 1,
            packets = stats.packet_count,
            bytes = stats.bytes_consumed,
            "run finished"
        );

        if rep + 1 < args.repetitions {
            std::thread::sleep(REPETITION_PAUSE);
        }
    }

    Ok(())
}

// ─── CLI Parsing ────────────────────────────────────────────────────────────

struct Args {
    hosts: Vec<String>,
    port: u16,
    file: PathBuf,
    mss: usize,
    repetitions: u32,
    log_path: PathBuf,
}

/// Positional format: `<server_host>... <port> <file> <MSS> [r<N>]`.
/// Parsed from the end so any number of leading hostnames works.
fn parse_args() -> anyhow::Result<Args> {
    let mut args: Vec<String> = std::env::args().skip(1).collect();

    if args.iter().any(|a| a == "--help" || a == "-h") {
        print_help();
        std::process::exit(0);
    }

    // Optional trailing repetition count.
    let mut repetitions = 1u32;
    if let Some(last) = args.last() {
        if let Some(count) = last.strip_prefix('r') {
            repetitions = count
                .parse()
                .map_err(|e| anyhow!("invalid repetition count '{last}': {e}"))?;
            args.pop();
        }
    }

    if args.len() < 4 {
        print_help();
        anyhow::bail!("invalid number of arguments");
    }

    let mss_arg = args.pop().unwrap_or_default();
    let mss: usize = mss_arg
        .parse()
        .map_err(|e| anyhow!("invalid MSS '{mss_arg}': {e}"))?;

    let file = PathBuf::from(args.pop().unwrap_or_default());

    let port_arg = args.pop().unwrap_or_default();
    let port: u16 = port_arg
        .parse()
        .map_err(|e| anyhow!("invalid port '{port_arg}': {e}"))?;

    let hosts = args;

    let log_path = std::env::var("MFTP_TIME_LOG")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from(DEFAULT_LOG_PATH));

    Ok(Args {
        hosts,
        port,
        file,
        mss,
        repetitions,
        log_path,
    })
}

fn print_help() {
    eprintln!(
        r#"mftp-sender — Stop-and-wait reliable file sender over UDP

USAGE:
  mftp-sender <server_host>... <port> <file> <MSS> [r<N>]

ARGUMENTS:
  <server_host>...  One or more receiver hostnames
  <port>            UDP port every receiver listens on
  <file>            Local file to transmit
  <MSS>             Payload bytes per packet (1..=1492)
  r<N>              Optional: repeat the transfer N times

ENVIRONMENT VARIABLES:
  MFTP_TIME_LOG  Timing-log CSV path (default: Mftp_time_log.csv)
  RUST_LOG       Log level filter (e.g. info, debug, mftp_transport=trace)

EXAMPLES:
  mftp-sender receiver-host 4455 payload.bin 1024
  mftp-sender host-a host-b 4455 payload.bin 1024 r5
"#
    );
}
