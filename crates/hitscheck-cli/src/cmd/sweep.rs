//! `hitscheck sweep`: validate the engine across many seeded random graphs.

use std::process;

use anyhow::Result;
use clap::Args;
use hitscheck_core::config::Precision;
use hitscheck_harness::engine::PartitionedEngine;
use hitscheck_harness::sweep::{SweepConfig, SweepReport, run_sweep as sweep_seeds};
use serde::Serialize;

use super::RunFlags;
use crate::output::{OutputMode, opt_count, pretty_kv, pretty_section, print_json};

/// Arguments for `hitscheck sweep`.
#[derive(Args, Debug)]
pub struct SweepArgs {
    /// Number of seeds to run.
    #[arg(long, default_value = "20")]
    pub seeds: u64,

    /// Starting seed value.
    #[arg(long, default_value = "0")]
    pub seed_start: u64,

    /// Vertices per generated graph.
    #[arg(long, default_value = "1000")]
    pub nodes: usize,

    /// Arcs drawn per generated graph.
    #[arg(long, default_value = "8000")]
    pub arcs: usize,

    #[command(flatten)]
    pub flags: RunFlags,
}

/// JSON output for `hitscheck sweep`.
#[derive(Debug, Serialize)]
struct SweepOutput<'a> {
    precision: Precision,
    nodes: usize,
    arcs: usize,
    all_passed: bool,
    #[serde(flatten)]
    report: &'a SweepReport,
    compute_latency: serde_json::Value,
}

/// Execute `hitscheck sweep`. Exits with status 1 if any seed fails.
///
/// # Errors
///
/// Returns an error if the configuration is invalid or any run fails.
pub fn run_sweep(args: &SweepArgs, output: OutputMode) -> Result<()> {
    let run = args.flags.resolve()?;
    let sweep = SweepConfig {
        seed_range: args.seed_start..args.seed_start.saturating_add(args.seeds),
        vertices: args.nodes,
        arcs: args.arcs,
    };

    let engine = PartitionedEngine::new();
    let report = match run.precision {
        Precision::Single => sweep_seeds::<f32, _>(&engine, &sweep, &run)?,
        Precision::Double => sweep_seeds::<f64, _>(&engine, &sweep, &run)?,
    };

    match output {
        OutputMode::Json => print_json(&SweepOutput {
            precision: run.precision,
            nodes: args.nodes,
            arcs: args.arcs,
            all_passed: report.all_passed(),
            report: &report,
            compute_latency: report.compute.to_json(),
        })?,
        OutputMode::Text => {
            println!(
                "sweep seeds={} nodes={} arcs={} precision={}",
                report.runs, args.nodes, args.arcs, run.precision
            );
            println!(
                "results passed={} failed={} all_passed={}",
                report.passed,
                report.failures.len(),
                report.all_passed()
            );
            println!("compute {}", report.compute.display_line());
            for failure in report.failures.iter().take(5) {
                println!(
                    "failure seed={} hub_mismatches={} authority_mismatches={}",
                    failure.seed,
                    failure.hub_mismatches,
                    opt_count(failure.authority_mismatches)
                );
            }
            if report.failures.len() > 5 {
                println!("failures_truncated count={}", report.failures.len() - 5);
            }
            if let Some(seed) = report.first_failure {
                println!(
                    "hint replay_seed={seed} nodes={} arcs={}",
                    args.nodes, args.arcs
                );
            }
        }
        OutputMode::Pretty => {
            let stdout = std::io::stdout();
            let mut w = stdout.lock();
            pretty_section(&mut w, "HITS Sweep")?;
            pretty_kv(&mut w, "Seeds", report.runs.to_string())?;
            pretty_kv(
                &mut w,
                "Graphs",
                format!("{} vertices, {} arcs", args.nodes, args.arcs),
            )?;
            pretty_kv(&mut w, "Precision", run.precision.to_string())?;
            pretty_kv(
                &mut w,
                "Results",
                format!(
                    "{} passed / {} failed",
                    report.passed,
                    report.failures.len()
                ),
            )?;
            pretty_kv(&mut w, "Compute", report.compute.display_line())?;
            match report.first_failure {
                None => pretty_kv(&mut w, "Status", "all seeds passed")?,
                Some(seed) => {
                    pretty_kv(
                        &mut w,
                        "Status",
                        format!(
                            "{} failures (first at seed {seed})",
                            report.failures.len()
                        ),
                    )?;
                    pretty_kv(
                        &mut w,
                        "Replay",
                        format!(
                            "hitscheck run --random-nodes {} --random-arcs {} --seed {seed} --verbose",
                            args.nodes, args.arcs
                        ),
                    )?;
                }
            }
        }
    }

    // Exit code 1 on any failure for CI integration
    if !report.all_passed() {
        process::exit(1);
    }
    Ok(())
}
