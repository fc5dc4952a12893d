//! The searcher's query-file driver loop: reads one query per line,
//! dispatches to the boolean or ranked engine, and writes one result line per
//! query, in order.

use crate::boolean;
use crate::dictionary::{BooleanPostings, RankedPostings};
use crate::error::{self, SearchError};
use crate::ranked;
use snafu::ResultExt;
use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;

/// Which engine a query file should be run through, and the parameters each
/// needs (the ranked engine's `k`/`parallel` knobs have no boolean equivalent).
pub enum Mode<'a> {
    Boolean { postings: &'a BooleanPostings },
    Ranked { postings: &'a RankedPostings, k: usize, parallel: bool },
}

/// Runs every query in `queries_path` through `mode` and writes one
/// whitespace-joined, newline-terminated result line per query to
/// `results_path`, in the same order as the input. A query that fails to
/// parse (boolean mode only) logs a warning and contributes a blank line
/// rather than aborting the batch.
pub fn run(mode: &Mode, queries_path: &Path, results_path: &Path) -> Result<(), SearchError> {
    let queries_file =
        File::open(queries_path).context(error::OpenQueriesSnafu { path: queries_path.to_path_buf() })?;
    let reader = BufReader::new(queries_file);

    let results_file =
        File::create(results_path).context(error::CreateResultsSnafu { path: results_path.to_path_buf() })?;
    let mut writer = BufWriter::new(results_file);

    for line in reader.lines() {
        let line = line.context(error::ReadQueryLineSnafu)?;
        let query = line.trim();
        if query.is_empty() {
            writeln!(writer).context(error::WriteResultLineSnafu)?;
            continue;
        }

        let result_line = match mode {
            Mode::Boolean { postings } => match boolean::evaluate(query, postings) {
                Ok(doc_ids) => doc_ids.iter().map(|id| id.to_string()).collect::<Vec<_>>().join(" "),
                Err(err) => {
                    log::warn!("failed to parse query {query:?}: {err}");
                    String::new()
                }
            },
            Mode::Ranked { postings, k, parallel } => ranked::search(query, postings, *k, *parallel)
                .iter()
                .map(|id| id.to_string())
                .collect::<Vec<_>>()
                .join(" "),
        };

        writeln!(writer, "{result_line}").context(error::WriteResultLineSnafu)?;
    }

    Ok(())
}
