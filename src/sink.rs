use std::io::{self, Write};

use crate::stats::RunStats;

/// Receives progress messages while a run is in flight and one summary per run.
pub trait StatsSink: Send + Sync {
    fn progress(&self, message: &str);
    fn summary(&self, stats: &RunStats);
}

pub fn format_summary(stats: &RunStats) -> String {
    format!(
        "Threads {}\tSuccessful {} ({:.2}/s)\tFailed {} ({:.2}%)\tAvg time {}ms",
        stats.parallelism,
        stats.success_count,
        stats.successful_requests_per_second(),
        stats.fail_count,
        stats.failure_percentage(),
        stats.average_response.as_millis(),
    )
}

/// Writes to stdout, overwriting the current line for progress messages.
#[derive(Debug, Default)]
pub struct ConsoleSink;

const BLANK_LINE: &str = "                                                  \r";

impl ConsoleSink {
    fn write(&self, text: &str, terminator: &str) {
        if let Err(e) = write_line(&mut io::stdout().lock(), text, terminator) {
            tracing::warn!("Failed to write to stdout: {}", e);
        }
    }
}

fn write_line<W: Write>(out: &mut W, text: &str, terminator: &str) -> io::Result<()> {
    out.write_all(BLANK_LINE.as_bytes())?;
    write!(out, "{}{}", text, terminator)?;
    out.flush()
}

impl StatsSink for ConsoleSink {
    fn progress(&self, message: &str) {
        self.write(message, "\r");
    }

    fn summary(&self, stats: &RunStats) {
        self.write(&format_summary(stats), "\n");
    }
}
