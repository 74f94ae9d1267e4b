use crate::runner::{Status, TickOutcome};
use crate::state::RunResult;
use std::fmt::Write;

fn percentage(part: u64, whole: u64) -> f64 {
    if whole > 0 {
        (part as f64 / whole as f64) * 100.0
    } else {
        0.0
    }
}

fn write_run(out: &mut String, result: &RunResult) {
    let _ = writeln!(out, "Last Run:");
    let _ = writeln!(out, "  Started: {}", result.started_at.to_rfc3339());
    match result.ended_at {
        Some(ended) => {
            let _ = writeln!(out, "  Ended: {}", ended.to_rfc3339());
            let _ = writeln!(
                out,
                "  Duration: {}s",
                (ended - result.started_at).num_seconds()
            );
        }
        None => {
            let _ = writeln!(out, "  Ended: (in progress)");
        }
    }
    if let Some(hash) = &result.config_hash {
        let _ = writeln!(out, "  Config hash: {}", hash);
    }
    let _ = writeln!(out);

    let _ = writeln!(out, "Counts:");
    let _ = writeln!(out, "  Total: {}", result.total);
    let _ = writeln!(
        out,
        "  Processed: {} ({:.1}%)",
        result.processed(),
        percentage(result.processed(), result.total)
    );
    let _ = writeln!(out, "  OK: {}", result.ok);
    let _ = writeln!(out, "  Failed: {}", result.fail);
}

/// Renders persisted progress for `--status`
pub fn format_status(status: &Status) -> String {
    let mut out = String::from("=== Cache Warmup Status ===\n\n");

    match status.queued {
        Some(queued) => {
            let _ = writeln!(out, "Queue: {} URLs pending\n", queued);
        }
        None => {
            let _ = writeln!(out, "Queue: none (next tick rebuilds from sitemaps)\n");
        }
    }

    match &status.result {
        Some(result) => write_run(&mut out, result),
        None => {
            let _ = writeln!(out, "No run recorded yet");
        }
    }
    out
}

pub fn print_status(status: &Status) {
    print!("{}", format_status(status));
}

/// One-line summary of a tick for the console
pub fn format_outcome(outcome: &TickOutcome) -> String {
    match outcome {
        TickOutcome::NoUrls => "No URLs to warm".to_string(),
        TickOutcome::Batch {
            processed,
            remaining,
            next_tick_in,
        } => format!(
            "Warmed {} URLs, {} remaining (next tick in {}s)",
            processed,
            remaining,
            next_tick_in.as_secs()
        ),
        TickOutcome::Completed { result } => format!(
            "Run complete: {} ok, {} failed of {} ({:.1}% ok)",
            result.ok,
            result.fail,
            result.total,
            percentage(result.ok, result.total)
        ),
    }
}
