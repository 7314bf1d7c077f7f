//! # MFTP Receiver
//!
//! Binds a UDP port, accepts one stop-and-wait transfer, and writes the
//! delivered byte stream to a local file. An optional loss probability
//! makes the receiver deliberately drop valid packets for retransmission
//! experiments.
//!
//! ## Usage
//!
//! ```bash
//! # Lossless receive
//! mftp-receiver 4455 out.bin 0
//!
//! # Drop 10% of valid packets, repeat for 5 experiment runs
//! mftp-receiver 4455 out.bin 0.1 r5
//! ```

use std::fs::File;
use std::io::BufWriter;
use std::path::PathBuf;

use anyhow::anyhow;
use mftp_transport::receiver::{ReceiverConfig, SawReceiver};
use mftp_transport::report::DEFAULT_LOG_PATH;

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
        port = args.port,
        out_file = %args.out_file.display(),
        loss_probability = args.loss_probability,
        repetitions = args.repetitions,
        "mftp-receiver starting"
    );

    // ── Accept (repetitions) transfers ──────────────────────────
    for rep in 0..args.repetitions {
        let config = ReceiverConfig {
            port: args.port,
            loss_probability: args.loss_probability,
            loss_seed: args.loss_seed,
            log_path: args.log_path.clone(),
        };
        let mut receiver = SawReceiver::new(config)?;

        let file = File::create(&args.out_file)
            .map_err(|e| anyhow!("cannot create '{}': {e}", args.out_file.display()))?;
        let mut consumer = BufWriter::new(file);
        receiver.receive(&mut consumer)?;

        tracing::info!(
            run = rep + 1,
            packets = receiver.stats().packet_count,
            bytes = receiver.stats().bytes_written,
            "run finished"
        );
    }

    Ok(())
}

// ─── CLI Parsing ────────────────────────────────────────────────────────────

struct Args {
    port: u16,
    out_file: PathBuf,
    loss_probability: f32,
    loss_seed: Option<u64>,
    repetitions: u32,
    log_path: PathBuf,
}

/// Positional format: `<port> <out_file> <loss_probability> [r<N>]`.
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

    if args.len() != 3 {
        print_help();
        anyhow::bail!("invalid number of arguments");
    }

    let port: u16 = args[0]
        .parse()
        .map_err(|e| anyhow!("invalid port '{}': {e}", args[0]))?;
    let out_file = PathBuf::from(&args[1]);
    let loss_probability: f32 = args[2]
        .parse()
        .map_err(|e| anyhow!("invalid loss probability '{}': {e}", args[2]))?;
    if !(0.0..=1.0).contains(&loss_probability) {
        anyhow::bail!("loss probability {loss_probability} outside [0, 1]");
    }

    let loss_seed = match std::env::var("MFTP_LOSS_SEED") {
        Ok(val) => Some(
            val.parse()
                .map_err(|e| anyhow!("invalid MFTP_LOSS_SEED '{val}': {e}"))?,
        ),
        Err(_) => None,
    };

    let log_path = std::env::var("MFTP_TIME_LOG")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from(DEFAULT_LOG_PATH));

    Ok(Args {
        port,
        out_file,
        loss_probability,
        loss_seed,
        repetitions,
        log_path,
    })
}

fn print_help() {
    eprintln!(
        r#"mftp-receiver — Stop-and-wait reliable file receiver over UDP

USAGE:
  mftp-receiver <port> <out_file> <loss_probability> [r<N>]

ARGUMENTS:
  <port>              UDP port to bind on 0.0.0.0
  <out_file>          Path for the delivered byte stream
  <loss_probability>  Deliberate drop rate for valid packets, in [0, 1]
  r<N>                Optional: accept N transfers back-to-back

ENVIRONMENT VARIABLES:
  MFTP_LOSS_SEED  Deterministic loss-injector seed for reproducible runs
  MFTP_TIME_LOG   Timing-log CSV path (default: Mftp_time_log.csv)
  RUST_LOG        Log level filter (e.g. info, debug, mftp_transport=trace)

EXAMPLES:
  mftp-receiver 4455 out.bin 0
  mftp-receiver 4455 out.bin 0.1 r5
"#
    );
}
