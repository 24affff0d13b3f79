use clap::Parser;
use std::path::PathBuf;

mod error;
mod io;

mod commands;

use error::CliError;

#[derive(Parser, Debug)]
#[command(name = "weary")]
#[command(about = "Fatigue-aware parallel linear algebra evaluator", long_about = None)]
struct Args {
    #[clap(subcommand)]
    command: Command,
}

#[derive(Parser, Debug)]
enum Command {
    /// Evaluate an expression tree and write the result matrix
    Run {
        /// JSON file describing the expression tree
        file: PathBuf,
        /// Worker thread count (defaults to the number of CPU cores)
        #[arg(short, long)]
        threads: Option<usize>,
        /// Output file (defaults to the input name with a .out.json extension)
        #[arg(short, long, value_name = "OUT")]
        output: Option<PathBuf>,
        /// Print per-worker statistics to stderr after the run
        #[arg(long)]
        report: bool,
        /// Show progress while nodes resolve
        #[arg(long)]
        progress: bool,
    },

    /// Parse and shape-check an expression tree without evaluating it
    Check {
        /// JSON file describing the expression tree
        file: PathBuf,
    },
}

fn main() -> Result<(), CliError> {
    env_logger::init();
    let args = Args::parse();

    match args.command {
        Command::Run {
            file,
            threads,
            output,
            report,
            progress,
        } => commands::run::handle_run(file, threads, output, report, progress),
        Command::Check { file } => commands::check::handle_check(file),
    }
}
