use clap::{Parser, ValueEnum};
use lnctfidf::dictionary::{BooleanPostings, RankedPostings};
use lnctfidf::driver::{self, Mode as DriverMode};
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Mode {
    Boolean,
    Ranked,
}

/// Runs a file of queries against a dictionary/postings pair and writes one
/// result line per query.
#[derive(Parser, Debug)]
#[command(name = "search", version, about)]
struct Args {
    /// Path to the dictionary file built by the indexer.
    #[arg(short = 'd', long = "dictionary")]
    dictionary: PathBuf,

    /// Path to the postings file built by the indexer.
    #[arg(short = 'p', long = "postings")]
    postings: PathBuf,

    /// Path to the file of queries, one per line.
    #[arg(short = 'q', long = "queries")]
    queries: PathBuf,

    /// Path to write results to, one line per query.
    #[arg(short = 'o', long = "output")]
    output: PathBuf,

    /// Which engine to run the queries through. Must match the format the
    /// postings file was built with.
    #[arg(long, value_enum, default_value_t = Mode::Ranked)]
    mode: Mode,

    /// Number of top results to return per ranked query. Ignored in boolean mode.
    #[arg(short = 'k', long = "top-k", default_value_t = 10)]
    top_k: usize,

    /// Score documents in parallel with rayon. Ignored in boolean mode.
    #[arg(long)]
    parallel: bool,
}

impl std::fmt::Display for Mode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Mode::Boolean => write!(f, "boolean"),
            Mode::Ranked => write!(f, "ranked"),
        }
    }
}

fn main() -> ExitCode {
    env_logger::init();
    let args = Args::parse();

    match args.mode {
        Mode::Boolean => {
            let postings = match BooleanPostings::open(&args.dictionary, &args.postings) {
                Ok(postings) => postings,
                Err(err) => {
                    eprintln!("search: {err}");
                    return ExitCode::FAILURE;
                }
            };
            let mode: DriverMode<'_> = DriverMode::Boolean { postings: &postings };
            run(&mode, &args)
        }
        Mode::Ranked => {
            let postings = match RankedPostings::open(&args.dictionary, &args.postings) {
                Ok(postings) => postings,
                Err(err) => {
                    eprintln!("search: {err}");
                    return ExitCode::FAILURE;
                }
            };
            let mode: DriverMode<'_> = DriverMode::Ranked { postings: &postings, k: args.top_k, parallel: args.parallel };
            run(&mode, &args)
        }
    }
}

fn run(mode: &DriverMode<'_>, args: &Args) -> ExitCode {
    match driver::run(mode, &args.queries, &args.output) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("search: {err}");
            ExitCode::FAILURE
        }
    }
}
