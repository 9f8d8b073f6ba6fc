//! `hitscheck run`: validate the engine on one graph.

use std::io::Write;
use std::path::PathBuf;
use std::process;

use anyhow::{Context, Result};
use clap::Args;
use hitscheck_core::config::{Precision, RunConfig};
use hitscheck_core::graph::{GraphPair, GraphView};
use hitscheck_harness::engine::PartitionedEngine;
use hitscheck_harness::generate::random_graph;
use hitscheck_harness::{RunStats, run_validation};
use hitscheck_rank::Score;
use tracing::info;

use super::RunFlags;
use crate::graph_io::{EdgeListOptions, read_edge_list};
use crate::output::{OutputMode, opt_count, pretty_kv, pretty_section, print_json};

/// Where the graph comes from.
#[derive(Args, Debug)]
pub struct GraphArgs {
    /// Whitespace edge-list file (`src dst` per line).
    #[arg(
        long,
        value_name = "FILE",
        required_unless_present = "random_nodes",
        conflicts_with = "random_nodes"
    )]
    pub graph: Option<PathBuf>,

    /// Generate a random graph with this many vertices.
    #[arg(long, value_name = "N", requires = "random_arcs")]
    pub random_nodes: Option<usize>,

    /// Number of arcs to draw for the random graph.
    #[arg(long, value_name = "M", requires = "random_nodes")]
    pub random_arcs: Option<usize>,

    /// Seed for the random graph.
    #[arg(long, default_value = "0")]
    pub seed: u64,

    /// Minimum vertex count for edge-list input.
    #[arg(long, value_name = "N")]
    pub vertices: Option<usize>,

    /// Keep self-loops from the edge list.
    #[arg(long)]
    pub keep_self_loops: bool,

    /// Keep duplicate arcs from the edge list.
    #[arg(long)]
    pub keep_duplicates: bool,
}

impl GraphArgs {
    /// Load or generate the graph.
    ///
    /// # Errors
    ///
    /// Returns an error if the edge list cannot be read or parsed.
    pub fn load(&self) -> Result<GraphPair> {
        if let (Some(nodes), Some(arcs)) = (self.random_nodes, self.random_arcs) {
            return random_graph(nodes, arcs, self.seed)
                .with_context(|| format!("failed to generate graph for seed {}", self.seed));
        }

        let path = self
            .graph
            .as_deref()
            .context("either --graph or --random-nodes/--random-arcs is required")?;
        read_edge_list(
            path,
            EdgeListOptions {
                min_vertices: self.vertices.unwrap_or(0),
                drop_self_loops: !self.keep_self_loops,
                drop_duplicates: !self.keep_duplicates,
            },
        )
    }
}

/// Arguments for `hitscheck run`.
#[derive(Args, Debug)]
pub struct RunArgs {
    #[command(flatten)]
    pub graph: GraphArgs,

    #[command(flatten)]
    pub flags: RunFlags,
}

/// Execute `hitscheck run`. Exits with status 1 when the comparison fails.
///
/// # Errors
///
/// Returns an error if the configuration or graph is invalid, or the engine
/// fails.
pub fn run_run(args: &RunArgs, output: OutputMode) -> Result<()> {
    let config = args.flags.resolve()?;
    let graph = args.graph.load()?;
    info!(
        vertices = graph.view().num_vertices(),
        arcs = graph.view().num_arcs(),
        "graph loaded"
    );

    let engine = PartitionedEngine::new();
    let stats = match config.precision {
        Precision::Single => validate::<f32>(&engine, graph.view(), &config, output)?,
        Precision::Double => validate::<f64>(&engine, graph.view(), &config, output)?,
    };

    render_stats(&stats, output)?;

    // Exit code 1 on a failed comparison for CI integration
    if stats.failed() {
        process::exit(1);
    }
    Ok(())
}

fn validate<S: Score>(
    engine: &PartitionedEngine,
    graph: GraphView<'_>,
    config: &RunConfig,
    output: OutputMode,
) -> Result<RunStats> {
    let mut narrative = output.narrative();
    let stats = run_validation::<S, _>(engine, graph, config, &mut *narrative)?;
    narrative.flush()?;
    Ok(stats)
}

fn render_stats(stats: &RunStats, output: OutputMode) -> Result<()> {
    match output {
        OutputMode::Json => print_json(stats)?,
        OutputMode::Text => {
            println!(
                "run engine={} precision={} vertices={} arcs={} iterations={} threshold={}",
                stats.engine,
                stats.precision,
                stats.vertices,
                stats.arcs,
                stats.max_iterations,
                stats.error_threshold
            );
            println!(
                "timing reference_ms={} preprocess_ms={:.3} compute_ms={:.3} postprocess_ms={:.3} total_ms={:.3}",
                stats
                    .reference_ms
                    .map_or_else(|| "-".to_string(), |ms| format!("{ms:.3}")),
                stats.preprocess_ms,
                stats.compute_ms,
                stats.postprocess_ms,
                stats.total_ms
            );
            println!(
                "result passed={} hub_mismatches={} authority_mismatches={} divergence={}",
                stats
                    .passed
                    .map_or_else(|| "-".to_string(), |p| p.to_string()),
                opt_count(stats.hub_mismatches),
                opt_count(stats.authority_mismatches),
                opt_count(stats.divergence)
            );
        }
        OutputMode::Pretty => {
            let stdout = std::io::stdout();
            let mut w = stdout.lock();
            pretty_section(&mut w, "HITS Validation")?;
            pretty_kv(&mut w, "Engine", &stats.engine)?;
            pretty_kv(&mut w, "Precision", &stats.precision)?;
            pretty_kv(
                &mut w,
                "Graph",
                format!("{} vertices, {} arcs", stats.vertices, stats.arcs),
            )?;
            pretty_kv(&mut w, "Devices", format!("{:?}", stats.devices))?;
            pretty_kv(&mut w, "Iterations", stats.max_iterations.to_string())?;
            if let Some(ms) = stats.reference_ms {
                pretty_kv(&mut w, "Reference", format!("{ms:.3} ms"))?;
            }
            pretty_kv(
                &mut w,
                "Engine time",
                format!(
                    "{:.3} ms prepare / {:.3} ms compute / {:.3} ms extract",
                    stats.preprocess_ms, stats.compute_ms, stats.postprocess_ms
                ),
            )?;
            let status = match stats.passed {
                None => "not compared (quick mode)".to_string(),
                Some(true) => "passed".to_string(),
                Some(false) => format!(
                    "FAILED ({} mismatches, threshold {})",
                    opt_count(stats.divergence),
                    stats.error_threshold
                ),
            };
            pretty_kv(&mut w, "Status", status)?;
        }
    }
    Ok(())
}
