//! Output formatting helpers.
//!
//! Machine-readable results go to stdout; status messages go to stderr so
//! that command output can be piped.

use anyhow::Result;
use colored::Colorize;
use serde::Serialize;

use domsync_core::{PendingOperation, SyncEvent};

/// Print a success message.
pub fn success(msg: &str) {
    eprintln!("{} {}", "✓".green(), msg);
}

/// Print a warning message.
pub fn warning(msg: &str) {
    eprintln!("{} {}", "!".yellow(), msg);
}

/// Print an error message.
pub fn error(msg: &str) {
    eprintln!("{} {}", "✗".red(), msg);
}

/// Print a dimmed note.
pub fn note(msg: &str) {
    eprintln!("{}", msg.dimmed());
}

/// Print a labeled field.
pub fn field(label: &str, value: &str) {
    println!("{}: {}", label.dimmed(), value);
}

/// Print a value as compact JSON.
pub fn json<T: Serialize>(value: &T) -> Result<()> {
    let json = serde_json::to_string(value)?;
    println!("{}", json);
    Ok(())
}

/// Print a value as pretty-printed JSON.
pub fn json_pretty<T: Serialize>(value: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(value)?;
    println!("{}", json);
    Ok(())
}

/// One-line human summary of an operation.
pub fn operation_line(op: &PendingOperation) -> String {
    let identity = op
        .payload
        .identity_key(domsync_core::DEFAULT_IDENTITY_FIELD)
        .unwrap_or_else(|| "-".to_string());
    format!(
        "#{} {} {} {}",
        op.id,
        op.target,
        identity,
        op.enqueued_at.format("%Y-%m-%d %H:%M:%S").to_string().dimmed()
    )
}

/// Print a sync event as a human-readable line.
pub fn event(event: &SyncEvent) {
    match event {
        SyncEvent::Enqueued { id, target } => {
            println!("{} #{} {}", "QUEUED".cyan(), id, target);
        }
        SyncEvent::DrainStarted { pending } => {
            println!("{} {} pending", "DRAIN".blue(), pending);
        }
        SyncEvent::Applied { id, target } => {
            println!("{} #{} {}", "APPLIED".green(), id, target);
        }
        SyncEvent::Rejected {
            id,
            target,
            attempts,
            reason,
        } => {
            println!(
                "{} #{} {} (attempt {}): {}",
                "REJECTED".red(),
                id,
                target,
                attempts,
                reason
            );
        }
        SyncEvent::Stalled {
            id,
            target,
            attempts,
        } => {
            println!(
                "{} #{} {} after {} attempts",
                "STALLED".magenta(),
                id,
                target,
                attempts
            );
        }
        SyncEvent::Interrupted { id, target, reason } => {
            println!(
                "{} at #{} {}: {}",
                "INTERRUPTED".yellow(),
                id,
                target,
                reason
            );
        }
        SyncEvent::DrainFinished { report } => {
            println!(
                "{} {} applied, {} rejected, {} remaining",
                "DONE".blue(),
                report.applied.len(),
                report.rejected.len(),
                report.remaining()
            );
        }
    }
}
