use std::path::{Path, PathBuf};

use anyhow::{Context, Result, anyhow};
use clap::{Args, Parser, Subcommand};
use log::info;

use single_gcl::gcl::{DEFAULT_TRIALS, ResamplingEngine};
use single_gcl::io::read_expression_csv;
use single_gcl::summary::{DEFAULT_BINS, DistributionSummary, histogram};
use single_gcl::{GclConfig, MatrixGcl};

#[derive(Parser, Debug)]
#[command(name = "single-gcl", about = "Global Coordination Level of single-cell expression matrices")]
struct Cli {
    /// Log level (error, warn, info, debug, trace)
    #[arg(long, default_value = "info", global = true)]
    log_level: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// GCL of each matrix from random gene splits
    Regular(RegularArgs),
    /// Distribution of GCL values over random cell subsets
    #[command(alias = "bootstrap")]
    Jackknife(JackknifeArgs),
}

#[derive(Args, Debug)]
struct InputArgs {
    /// Headerless CSV files, genes as rows and cells as columns
    #[arg(required = true, value_delimiter = ',')]
    files: Vec<PathBuf>,

    /// Root random seed for reproducible results
    #[arg(long)]
    seed: Option<u64>,
}

#[derive(Args, Debug)]
struct RegularArgs {
    #[command(flatten)]
    input: InputArgs,

    /// Number of random gene splits
    #[arg(long, default_value_t = DEFAULT_TRIALS)]
    trials: usize,
}

#[derive(Args, Debug)]
struct JackknifeArgs {
    #[command(flatten)]
    input: InputArgs,

    /// Number of resampled cell subsets
    #[arg(long, default_value_t = 70)]
    iterations: usize,

    /// Fraction of cells kept in each subset
    #[arg(long, default_value_t = 0.8)]
    keep_fraction: f64,

    /// Random gene splits per subset
    #[arg(long, default_value_t = 10)]
    trials: usize,

    /// Subsets computed concurrently per batch
    #[arg(long, default_value_t = 4)]
    width: usize,

    /// Minimum number of subsets; 0 runs exactly --iterations
    #[arg(long, default_value_t = 10)]
    min_iterations: usize,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let log_level = cli
        .log_level
        .parse::<log::LevelFilter>()
        .unwrap_or_else(|_| {
            eprintln!(
                "Warning: Invalid log level '{}' provided. Defaulting to Info.",
                cli.log_level
            );
            log::LevelFilter::Info
        });
    env_logger::Builder::new()
        .filter_level(log_level)
        .format_timestamp_micros()
        .init();

    match cli.command {
        Command::Regular(args) => run_regular(args),
        Command::Jackknife(args) => run_jackknife(args),
    }
}

fn check_files(files: &[PathBuf]) -> Result<()> {
    for file in files {
        if !file.is_file() {
            return Err(anyhow!("Input file not found: {}", file.display()));
        }
    }
    Ok(())
}

fn file_label(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

fn run_regular(args: RegularArgs) -> Result<()> {
    check_files(&args.input.files)?;

    for file in &args.input.files {
        let matrix = read_expression_csv(file)
            .with_context(|| format!("Failed to load {}", file.display()))?
            .into_inner();
        info!("Computing GCL of {} with {} gene splits", file.display(), args.trials);

        let value = matrix.gcl(args.trials, args.input.seed)?;
        println!("GCL value of {} is: {}", file_label(file), value);
    }
    Ok(())
}

fn run_jackknife(args: JackknifeArgs) -> Result<()> {
    check_files(&args.input.files)?;

    let minimum = if args.min_iterations == 0 {
        None
    } else {
        Some(args.min_iterations)
    };
    let mut config = GclConfig::new(args.iterations, args.keep_fraction, args.trials)
        .with_concurrency(args.width)
        .with_minimum_iterations(minimum);
    if let Some(seed) = args.input.seed {
        config = config.with_seed(seed);
    }
    config.validate()?;

    for file in &args.input.files {
        let matrix = read_expression_csv(file)
            .with_context(|| format!("Failed to load {}", file.display()))?;

        let distribution = ResamplingEngine::new(config.clone())?
            .run(&matrix)
            .with_context(|| format!("Resampling failed for {}", file.display()))?;
        let summary = DistributionSummary::from_values(&distribution.values);

        println!(
            "GCL jackknife of {}: {} realizations, {:.0}% of cells ({} cells), {} gene splits each",
            file_label(file),
            distribution.len(),
            args.keep_fraction * 100.0,
            distribution.cells_per_sample,
            distribution.trials_per_iteration
        );
        println!(
            "  mean {:.4}  sd {:.4}  median {:.4}  95% [{:.4}, {:.4}]  valid {}/{}",
            summary.mean,
            summary.std_dev,
            summary.median,
            summary.lower_95,
            summary.upper_95,
            summary.valid,
            summary.count
        );

        let bins = histogram(&distribution.values, DEFAULT_BINS);
        let peak = bins.iter().map(|b| b.count).max().unwrap_or(0).max(1);
        for bin in &bins {
            let bar = "#".repeat(bin.count * 40 / peak);
            println!("  [{:>8.4}, {:>8.4}] {:>4} {}", bin.lower, bin.upper, bin.count, bar);
        }
    }
    Ok(())
}
