#![forbid(unsafe_code)]

mod cmd;
mod graph_io;
mod output;

use clap::{CommandFactory, Parser, Subcommand};
use output::OutputMode;
use std::env;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

#[derive(Parser, Debug)]
#[command(
    name = "hitscheck",
    author,
    version,
    about = "hitscheck: correctness harness for HITS ranking engines",
    long_about = None
)]
struct Cli {
    /// Output format: pretty, text, or json.
    #[arg(long, global = true, value_enum)]
    format: Option<OutputMode>,

    /// Emit JSON output (same as `--format json`).
    #[arg(long, global = true, hide = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    #[command(
        about = "Validate the engine on one graph",
        long_about = "Compute reference HITS scores, run the partitioned engine on the same\n\
                      graph, and compare hub and authority vectors element by element.\n\
                      Exits with status 1 if any score diverges beyond the threshold.",
        after_help = "EXAMPLES:\n    # Validate against an edge list\n    hitscheck run --graph web.txt\n\n\
                      # Random graph on two devices, single precision\n    hitscheck run --random-nodes 10000 --random-arcs 80000 --device 0 --device 1 --precision single\n\n\
                      # Show divergence windows and top-10 tables\n    hitscheck run --graph web.txt --verbose\n\n\
                      # Machine-readable statistics record\n    hitscheck run --graph web.txt --format json"
    )]
    Run(cmd::run::RunArgs),

    #[command(
        about = "Validate the engine across many seeded random graphs",
        long_about = "Generate one random graph per seed and validate the engine on each.\n\
                      Reports pass/fail per seed and the first failure for replay.",
        after_help = "EXAMPLES:\n    # 50 seeds with defaults\n    hitscheck sweep --seeds 50\n\n\
                      # Larger graphs, edge-balanced partitions\n    hitscheck sweep --seeds 10 --nodes 50000 --arcs 400000 --partition edge-balanced\n\n\
                      # Machine-readable output\n    hitscheck sweep --seeds 20 --format json"
    )]
    Sweep(cmd::sweep::SweepArgs),

    #[command(
        about = "Generate shell completions",
        after_help = "EXAMPLES:\n    # Bash\n    hitscheck completions bash > /etc/bash_completion.d/hitscheck"
    )]
    Completions(cmd::completions::CompletionsArgs),
}

fn init_tracing() {
    let filter = EnvFilter::try_from_env("HITSCHECK_LOG").unwrap_or_else(|_| {
        EnvFilter::new(if env::var("DEBUG").is_ok() {
            "hitscheck=debug,info"
        } else {
            "hitscheck=info,warn"
        })
    });

    let format = env::var("HITSCHECK_LOG_FORMAT").unwrap_or_else(|_| "compact".to_string());

    let registry = tracing_subscriber::registry().with(filter);

    match format.as_str() {
        "json" => {
            registry
                .with(fmt::layer().json().with_ansi(false).with_writer(std::io::stderr))
                .init();
        }
        _ => {
            registry
                .with(fmt::layer().compact().with_writer(std::io::stderr))
                .init();
        }
    }
}

fn main() -> anyhow::Result<()> {
    init_tracing();

    let cli = Cli::parse();
    let output = output::resolve_output_mode(cli.format, cli.json);

    match cli.command {
        Commands::Run(ref args) => cmd::run::run_run(args, output),
        Commands::Sweep(ref args) => cmd::sweep::run_sweep(args, output),
        Commands::Completions(args) => {
            cmd::completions::run_completions(args.shell, &mut Cli::command())
        }
    }
}
