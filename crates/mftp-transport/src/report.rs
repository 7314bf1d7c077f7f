//! # Timing-Log Reporter
//!
//! Appends one CSV row per run to the shared timing log so repeated
//! experiment runs accumulate in a single file. Reporting is best-effort
//! glue: callers log a warning on failure and never abort a completed
//! transfer because of it.

use std::fs::OpenOptions;
use std::io::{self, Write};
use std::path::Path;

use crate::stats::ReceiverStats;

/// Default timing-log file name, shared by both executables.
pub const DEFAULT_LOG_PATH: &str = "Mftp_time_log.csv";

/// Append the sender's row: destination count, segment size, estimated
/// per-destination effective loss (rounded to thousandths), and elapsed
/// wall-clock seconds.
pub fn append_sender_row(
    path: &Path,
    destinations: usize,
    mss: usize,
    effective_loss: f64,
    elapsed_secs: f64,
) -> io::Result<()> {
    let rounded = (effective_loss * 1000.0).round() / 1000.0;
    let row = format!("{destinations}, {mss}, {rounded:.3}, {elapsed_secs:.3}\n");
    append(path, &row)
}

/// Append the receiver's row: packets accepted, injector drops, configured
/// loss rate, observed effective loss.
pub fn append_receiver_row(path: &Path, stats: &ReceiverStats) -> io::Result<()> {
    let row = format!(
        "{}, {}, {:.4}, {:.4}\n",
        stats.packet_count,
        stats.dropped_count,
        stats.configured_loss(),
        stats.effective_loss()
    );
    append(path, &row)
}

fn append(path: &Path, row: &str) -> io::Result<()> {
    let mut file = OpenOptions::new().create(true).append(true).open(path)?;
    file.write_all(row.as_bytes())
}
