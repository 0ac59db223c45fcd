//! rangecov: bounded sort, coalesce and membership checks over integer ranges
//!
//! Usage: rangecov <COMMAND> [OPTIONS]

use clap::{Parser, Subcommand};
use std::fs::File;
use std::io::{self, Read};
use std::path::PathBuf;
use std::process;

use rangecov::commands::{
    CheckCommand, GenerateCommand, GenerateConfig, MergeCommand, SortCommand,
};
use rangecov::config::{
    PipelineConfig, DEFAULT_MAX_CHECKS, DEFAULT_MAX_RANGES, DEFAULT_STEP_BUDGET,
};
use rangecov::error::{PipelineError, Result};

#[derive(Parser)]
#[command(name = "rangecov")]
#[command(version)]
#[command(about = "Bounded interval pipeline: sort, coalesce and check integer ranges", long_about = None)]
struct Cli {
    /// Number of threads to use for --parallel (default: number of CPUs)
    #[arg(long, short = 't', global = true)]
    threads: Option<usize>,

    /// Maximum number of ranges per run
    #[arg(long, global = true, default_value_t = DEFAULT_MAX_RANGES)]
    max_ranges: usize,

    /// Maximum number of query ids per run
    #[arg(long, global = true, default_value_t = DEFAULT_MAX_CHECKS)]
    max_checks: usize,

    /// Give up after this many pipeline steps
    #[arg(long, global = true, default_value_t = DEFAULT_STEP_BUDGET)]
    max_steps: u64,

    /// Parse coordinates as signed 64-bit integers
    #[arg(long, global = true)]
    signed: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Sort ranges by start, then end
    Sort {
        /// Input file (use - for stdin)
        #[arg(short, long)]
        input: Option<PathBuf>,

        /// Reverse the sort order
        #[arg(short, long)]
        reverse: bool,

        /// Print sorting statistics to stderr
        #[arg(long)]
        stats: bool,
    },

    /// Coalesce overlapping and touching ranges
    Merge {
        /// Input file (use - for stdin)
        #[arg(short, long)]
        input: Option<PathBuf>,

        /// Print the total number of covered integers after the ranges
        #[arg(short = 'c', long)]
        coverage: bool,

        /// Input is already sorted; stream it without the sort stage
        #[arg(long)]
        assume_sorted: bool,

        /// Print merge statistics to stderr
        #[arg(long)]
        stats: bool,
    },

    /// Count query ids covered by any range
    Check {
        /// Input file (use - for stdin)
        #[arg(short, long)]
        input: Option<PathBuf>,

        /// Print one verdict per query before the count
        #[arg(short, long)]
        verbose: bool,

        /// Answer the whole batch in parallel
        #[arg(long)]
        parallel: bool,

        /// Print check statistics to stderr
        #[arg(long)]
        stats: bool,
    },

    /// Generate a random input file
    Generate {
        /// Number of ranges
        #[arg(long, default_value = "200")]
        ranges: usize,

        /// Number of query ids
        #[arg(long, default_value = "1000")]
        queries: usize,

        /// Largest coordinate
        #[arg(long, default_value = "1000000")]
        max_coord: u64,

        /// Largest range length
        #[arg(long, default_value = "10000")]
        max_len: u64,

        /// Random seed for reproducibility
        #[arg(long, default_value = "42")]
        seed: u64,
    },
}

fn main() {
    env_logger::init();
    let cli = Cli::parse();

    let result = run(cli);

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}

fn run(cli: Cli) -> Result<()> {
    if let Some(n) = cli.threads {
        rayon::ThreadPoolBuilder::new()
            .num_threads(n)
            .build_global()
            .map_err(|e| PipelineError::InvalidConfig(format!("thread pool: {}", e)))?;
    }

    let config = PipelineConfig::new()
        .with_max_ranges(cli.max_ranges)
        .with_max_checks(cli.max_checks);
    config.validate()?;

    let stdout = io::stdout();
    let mut handle = stdout.lock();

    match cli.command {
        Commands::Sort {
            input,
            reverse,
            stats,
        } => {
            let cmd = SortCommand::new()
                .with_config(config)
                .with_step_budget(cli.max_steps)
                .with_reverse(reverse);
            let reader = open_input(input)?;
            let result = if cli.signed {
                cmd.run_reader::<i64, _, _>(reader, &mut handle)?
            } else {
                cmd.run_reader::<u64, _, _>(reader, &mut handle)?
            };
            if stats {
                eprintln!("Sort stats: {}", result);
            }
        }

        Commands::Merge {
            input,
            coverage,
            assume_sorted,
            stats,
        } => {
            let cmd = MergeCommand::new()
                .with_config(config)
                .with_step_budget(cli.max_steps)
                .with_presorted(assume_sorted)
                .with_coverage(coverage);
            let reader = open_input(input)?;
            let result = if cli.signed {
                cmd.run_reader::<i64, _, _>(reader, &mut handle)?
            } else {
                cmd.run_reader::<u64, _, _>(reader, &mut handle)?
            };
            if stats {
                eprintln!("Merge stats: {}", result);
            }
        }

        Commands::Check {
            input,
            verbose,
            parallel,
            stats,
        } => {
            let cmd = CheckCommand::new()
                .with_config(config)
                .with_step_budget(cli.max_steps)
                .with_verbose(verbose)
                .with_parallel(parallel);
            let reader = open_input(input)?;
            let result = if cli.signed {
                cmd.run_reader::<i64, _, _>(reader, &mut handle)?
            } else {
                cmd.run_reader::<u64, _, _>(reader, &mut handle)?
            };
            if stats {
                eprintln!("Check stats: {}", result);
            }
        }

        Commands::Generate {
            ranges,
            queries,
            max_coord,
            max_len,
            seed,
        } => {
            let cmd = GenerateCommand::new(GenerateConfig {
                ranges,
                queries,
                max_coord,
                max_len,
                seed,
            });
            let result = cmd.run(&mut handle)?;
            eprintln!("Generated {}", result);
        }
    }

    Ok(())
}

/// Open `path`, or stdin when it is absent or `-`.
fn open_input(path: Option<PathBuf>) -> Result<Box<dyn Read>> {
    match path {
        Some(p) if p.to_string_lossy() != "-" => Ok(Box::new(File::open(&p)?)),
        _ => Ok(Box::new(io::stdin().lock())),
    }
}
