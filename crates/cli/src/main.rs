//! Trace-driven command-line runner for the `aim-core` DRAM + PIM
//! simulator.
//!
//! Loads a device/controller configuration, replays a trace file
//! against a [`aim_core::MemorySystem`] one cycle at a time, and emits
//! the final YAML statistics document (`spec.md` §6).

mod trace;

use std::fs;
use std::process;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use aim_core::request::RequestType;
use aim_core::{AimError, Config, MemorySystem};
use clap::Parser;
use tracing::{info, warn};

use trace::TraceEntry;

#[derive(Parser, Debug)]
#[command(name = "aim-sim", author, version, about = "Cycle-accurate DRAM + PIM device and controller simulator")]
struct Cli {
    /// Path to the simulator configuration (JSON or YAML, by extension).
    #[arg(short, long)]
    config: String,

    /// Path to the trace file to replay.
    #[arg(short, long)]
    trace: String,

    /// Maximum number of cycles to run before giving up on stragglers.
    /// `0` means "run until every submitted request completes."
    #[arg(long, default_value_t = 0)]
    max_cycles: u64,
}

/// One already-resolved, single-address submission. Broadcast trace
/// entries (channel masks) are expanded to one of these per selected
/// channel before the run loop starts, so backpressure retries one
/// address at a time rather than resubmitting an already-accepted
/// sibling address (`spec.md` §6: `convert_packet` fires one callback
/// per address).
enum Submission {
    Linear { request_type: RequestType, address: u64 },
    Explicit { request_type: RequestType, fields: Vec<i32> },
}

fn main() {
    tracing_subscriber::fmt::init();
    let cli = Cli::parse();

    if let Err(e) = run(&cli) {
        eprintln!("aim-sim: {e}");
        process::exit(1);
    }
}

fn load_config(path: &str) -> Result<Config, AimError> {
    let text = fs::read_to_string(path).map_err(|e| AimError::configuration(format!("reading {path}: {e}")))?;
    if path.ends_with(".json") {
        Config::from_json(&text)
    } else {
        Config::from_yaml(&text)
    }
}

fn expand(system: &MemorySystem, entries: Vec<TraceEntry>) -> Vec<Submission> {
    let spec = system.spec();
    let mut out = Vec::new();
    for entry in entries {
        match entry {
            TraceEntry::Linear { request_type, address, .. } => out.push(Submission::Linear { request_type, address }),
            TraceEntry::Broadcast { request_type, ch_mask, rank, bank, row, col, .. } => {
                for (_, fields) in trace::expand_broadcast(spec, ch_mask, rank, bank, row, col) {
                    out.push(Submission::Explicit { request_type, fields });
                }
            }
        }
    }
    out
}

fn run(cli: &Cli) -> Result<(), AimError> {
    let cfg = load_config(&cli.config)?;
    let trace_text = fs::read_to_string(&cli.trace).map_err(|e| AimError::trace_format(format!("reading {}: {e}", cli.trace)))?;
    let entries = trace::parse(&trace_text)?;
    info!(lines = entries.len(), "trace loaded");

    let mut system = MemorySystem::new(&cfg)?;
    let submissions = expand(&system, entries);
    let mut pending_submit: Vec<(u64, Submission)> = submissions.into_iter().enumerate().map(|(i, s)| (i as u64, s)).collect();
    let mut retries = 0u64;
    let outstanding = Arc::new(AtomicU64::new(0));

    let mut clk = 0u64;
    while !pending_submit.is_empty() || outstanding.load(Ordering::Relaxed) > 0 {
        if cli.max_cycles != 0 && clk >= cli.max_cycles {
            warn!(
                clk,
                remaining = pending_submit.len(),
                outstanding = outstanding.load(Ordering::Relaxed),
                "max_cycles reached with work left outstanding"
            );
            break;
        }

        let mut still_pending = Vec::new();
        for (source_id, submission) in pending_submit.drain(..) {
            let accepted = submit_one(&mut system, source_id, &submission, &outstanding)?;
            if !accepted {
                retries += 1;
                still_pending.push((source_id, submission));
            }
        }
        pending_submit = still_pending;

        system.tick();
        clk += 1;
        // Each accepted submission's completion callback decrements
        // `outstanding` the cycle it departs, so the loop condition
        // above reflects true remaining work rather than a fixed
        // cycle budget.
    }

    info!(cycles = clk, retries, "run complete");
    let stats = aim_core::stats::Stats::collect(&system);
    println!("{}", stats.to_yaml()?);
    Ok(())
}

/// Submit one resolved submission, bumping `outstanding` on acceptance
/// and wiring its completion callback to bring it back down.
fn submit_one(system: &mut MemorySystem, source_id: u64, submission: &Submission, outstanding: &Arc<AtomicU64>) -> Result<bool, AimError> {
    let _ = outstanding.fetch_add(1, Ordering::Relaxed);
    let counter = Arc::clone(outstanding);
    let callback = move |_req: &aim_core::request::Request| {
        let _ = counter.fetch_sub(1, Ordering::Relaxed);
    };

    let accepted = match submission {
        Submission::Linear { request_type, address } => system.submit_rw_linear(*request_type, *address, source_id, callback)?,
        Submission::Explicit { request_type, fields } if request_type.is_pim() => system.submit_pim(*request_type, fields, source_id, callback)?,
        Submission::Explicit { request_type, fields } => system.submit_rw(*request_type, fields, source_id, callback)?,
    };
    if !accepted {
        let _ = outstanding.fetch_sub(1, Ordering::Relaxed);
    }
    Ok(accepted)
}
