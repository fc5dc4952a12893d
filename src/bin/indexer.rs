use clap::{Parser, ValueEnum};
use lnctfidf::dictionary::PostingFormat;
use lnctfidf::error::IndexError;
use lnctfidf::indexer::build_index;
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Mode {
    Boolean,
    Ranked,
}

/// Builds a dictionary/postings file pair from a directory of documents.
#[derive(Parser, Debug)]
#[command(name = "indexer", version, about)]
struct Args {
    /// Directory of documents, one file per document, named by doc id.
    #[arg(short = 'i', long = "input")]
    input: PathBuf,

    /// Path to write the dictionary file to.
    #[arg(short = 'd', long = "dictionary")]
    dictionary: PathBuf,

    /// Path to write the postings file to.
    #[arg(short = 'p', long = "postings")]
    postings: PathBuf,

    /// Posting-entry grammar to write: `ranked` carries term frequencies,
    /// `boolean` carries skip pointers.
    #[arg(long, value_enum, default_value_t = Mode::Ranked)]
    mode: Mode,
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

    let format = match args.mode {
        Mode::Boolean => PostingFormat::Boolean,
        Mode::Ranked => PostingFormat::Ranked,
    };

    match build_index(&args.input, &args.dictionary, &args.postings, format) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err @ IndexError::InvalidDocId { .. }) => {
            eprintln!("indexer: {err}");
            ExitCode::from(2)
        }
        Err(err) => {
            eprintln!("indexer: {err}");
            ExitCode::FAILURE
        }
    }
}
