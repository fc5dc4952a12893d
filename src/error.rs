use snafu::Snafu;
use std::io;
use std::path::PathBuf;

/// Errors raised while walking a corpus directory and serializing the two index files.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum IndexError {
    #[snafu(display("could not walk corpus directory {}: {source}", path.display()))]
    WalkCorpusDir { path: PathBuf, source: walkdir::Error },

    #[snafu(display("document file name {:?} is not a valid document id", name))]
    InvalidDocId { name: String },

    #[snafu(display("could not read document {}: {source}", path.display()))]
    ReadDocument { path: PathBuf, source: io::Error },

    #[snafu(display("could not create postings file {}: {source}", path.display()))]
    CreatePostings { path: PathBuf, source: io::Error },

    #[snafu(display("could not write postings file {}: {source}", path.display()))]
    WritePostings { path: PathBuf, source: io::Error },

    #[snafu(display("could not create dictionary file {}: {source}", path.display()))]
    CreateDictionary { path: PathBuf, source: io::Error },

    #[snafu(display("could not write dictionary file {}: {source}", path.display()))]
    WriteDictionary { path: PathBuf, source: io::Error },
}

/// Errors raised while opening and reading the dictionary/postings pair.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum DictionaryError {
    #[snafu(display("could not open postings file {}: {source}", path.display()))]
    OpenPostings { path: PathBuf, source: io::Error },

    #[snafu(display("could not open dictionary file {}: {source}", path.display()))]
    OpenDictionary { path: PathBuf, source: io::Error },

    #[snafu(display("could not read dictionary file {}: {source}", path.display()))]
    ReadDictionary { path: PathBuf, source: io::Error },

    #[snafu(display("dictionary file {} is missing the all-documents offset", path.display()))]
    MissingAllDocsOffset { path: PathBuf },

    #[snafu(display("could not seek to offset {offset} in postings file: {source}"))]
    SeekPostings { offset: u64, source: io::Error },

    #[snafu(display("could not read posting line at offset {offset}: {source}"))]
    ReadPostingLine { offset: u64, source: io::Error },

    #[snafu(display("posting line at offset {offset} is malformed"))]
    MalformedPostingLine { offset: u64 },
}

/// Errors raised while parsing a single boolean query.
///
/// Callers at the driver layer catch these per query: they are never fatal
/// to the batch, only to the one query line that produced them.
#[derive(Debug, Snafu, PartialEq, Eq, Clone)]
#[snafu(visibility(pub))]
pub enum BooleanParseError {
    #[snafu(display("query is empty"))]
    EmptyQuery,

    #[snafu(display("unmatched parenthesis in query"))]
    UnmatchedParen,

    #[snafu(display("operator {op} is missing an operand"))]
    MissingOperand { op: String },

    #[snafu(display("query has leftover operands after parsing"))]
    LeftoverOperands,
}

/// Errors raised by the searcher's driver loop.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum SearchError {
    #[snafu(display("could not open queries file {}: {source}", path.display()))]
    OpenQueries { path: PathBuf, source: io::Error },

    #[snafu(display("could not read a query line: {source}"))]
    ReadQueryLine { source: io::Error },

    #[snafu(display("could not create results file {}: {source}", path.display()))]
    CreateResults { path: PathBuf, source: io::Error },

    #[snafu(display("could not write a result line: {source}"))]
    WriteResultLine { source: io::Error },

    #[snafu(context(false))]
    Dictionary { source: DictionaryError },
}
