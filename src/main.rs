use anyhow::{Context, Result};
use camino::Utf8PathBuf;
use clap::{Parser, ValueEnum};
use log::info;
use serde::Serialize;

use rustyblocks::interchange::PartDocument;
use rustyblocks::{
    Budget, CancelToken, CostBreakdown, DiagramSnapshot, EditorConfig, OptimizationReport, Strategy,
};

#[derive(Debug, Clone, Copy, ValueEnum)]
enum StrategyArg {
    Hill,
    Anneal,
}

/// What the binary prints to stdout.
#[derive(Serialize)]
struct Output {
    diagram: DiagramSnapshot,
    cost: CostBreakdown,
    optimization: Option<OptimizationReport>,
}

#[derive(Parser, Debug)]
#[command(author, version, about = "Import a part JSON file into a block diagram and optionally optimize its layout", long_about = None)]
struct Cli {
    /// Part interchange JSON file
    #[arg(value_name = "PART_JSON")]
    part_file: Utf8PathBuf,

    /// Editor configuration (TOML)
    #[arg(long, value_name = "FILE")]
    config: Option<Utf8PathBuf>,

    /// Run the placement optimizer after importing
    #[arg(long)]
    optimize: bool,

    /// Optimizer iteration budget (defaults to the strategy's own default)
    #[arg(long)]
    iterations: Option<usize>,

    #[arg(long)]
    seed: Option<u64>,

    #[arg(long, value_enum)]
    strategy: Option<StrategyArg>,

    /// Also save the diagram as a binary document
    #[arg(long, value_name = "OUT")]
    binary: Option<Utf8PathBuf>,
}

fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => EditorConfig::load(path)?,
        None => EditorConfig::default(),
    };
    if let Some(strategy) = cli.strategy {
        config.optimizer.strategy = match strategy {
            StrategyArg::Hill => Strategy::HillClimbing,
            StrategyArg::Anneal => Strategy::annealing(),
        };
        config.optimizer.budget = Budget::iterations(config.optimizer.strategy.default_iterations());
    }
    if let Some(iterations) = cli.iterations {
        config.optimizer.budget.max_iterations = iterations;
    }
    if let Some(seed) = cli.seed {
        config.optimizer.seed = seed;
    }

    let document = PartDocument::load(&cli.part_file)?;
    let mut diagram = document
        .to_diagram(config)
        .with_context(|| format!("Failed to build diagram from {}", cli.part_file))?;

    let report = if cli.optimize {
        let settings = diagram.config().optimizer.clone();
        Some(diagram.optimize_placement_with(&settings, &CancelToken::new())?)
    } else {
        None
    };

    let output = Output {
        diagram: diagram.snapshot()?,
        cost: diagram.cost()?,
        optimization: report,
    };
    println!("{}", serde_json::to_string_pretty(&output)?);

    if let Some(out) = &cli.binary {
        diagram
            .save_to_binary(out)
            .with_context(|| format!("Failed to write {}", out))?;
        info!(path = out.as_str(); "Saved binary document");
    }
    Ok(())
}
