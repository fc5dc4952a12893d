//! The dictionary/postings reader and the on-disk grammar it parses.
//!
//! Two reader types exist, `RankedPostings` and `BooleanPostings`, rather than
//! one reader generic over posting shape: the ranked searcher needs the
//! all-documents posting's per-doc unique-term counts (`doc_sizes`) and never
//! needs skip pointers, while the boolean searcher needs skip pointers and
//! never needs term frequencies. They share the dictionary-file parsing logic
//! below.

use crate::error::{self, DictionaryError};
use crate::postings::{BooleanPostingList, DocId, RankedPostingList};
use snafu::ResultExt;
use std::cell::RefCell;
use std::collections::HashMap;
use std::fs::File;
use std::io::{BufRead, BufReader, Seek, SeekFrom};
use std::path::Path;

/// Which posting-entry grammar a postings file uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PostingFormat {
    /// `<doc_id>:<term_frequency>`, no skip pointers.
    Ranked,
    /// `<doc_id>` optionally followed by `:<skip_target_index>`.
    Boolean,
}

/// `term -> (document_frequency, byte_offset)`, plus the all-documents offset.
struct DictionaryFile {
    all_docs_offset: u64,
    entries: HashMap<String, (u32, u64)>,
}

/// Parses the dictionary file: first line is the all-documents offset,
/// subsequent lines are `<term> <document_frequency> <byte_offset>`. Lines
/// that don't parse in that shape are silently skipped.
fn read_dictionary_file(path: &Path) -> Result<DictionaryFile, DictionaryError> {
    let file = File::open(path).context(error::OpenDictionarySnafu { path: path.to_path_buf() })?;
    let mut lines = BufReader::new(file).lines();

    let first = lines
        .next()
        .ok_or_else(|| DictionaryError::MissingAllDocsOffset { path: path.to_path_buf() })?
        .context(error::ReadDictionarySnafu { path: path.to_path_buf() })?;
    let all_docs_offset: u64 = first
        .trim()
        .parse()
        .map_err(|_| DictionaryError::MissingAllDocsOffset { path: path.to_path_buf() })?;

    let mut entries = HashMap::new();
    for line in lines {
        let line = line.context(error::ReadDictionarySnafu { path: path.to_path_buf() })?;
        let mut parts = line.split_whitespace();
        let (term, df, offset) = match (parts.next(), parts.next(), parts.next(), parts.next()) {
            (Some(term), Some(df), Some(offset), None) => (term, df, offset),
            _ => continue,
        };
        let (df, offset) = match (df.parse::<u32>(), offset.parse::<u64>()) {
            (Ok(df), Ok(offset)) => (df, offset),
            _ => continue,
        };
        entries.insert(term.to_string(), (df, offset));
    }

    Ok(DictionaryFile { all_docs_offset, entries })
}

fn read_line_at(file: &RefCell<File>, offset: u64) -> Result<String, DictionaryError> {
    let mut file = file.borrow_mut();
    file.seek(SeekFrom::Start(offset))
        .context(error::SeekPostingsSnafu { offset })?;
    let mut reader = BufReader::new(&mut *file);
    let mut line = String::new();
    reader
        .read_line(&mut line)
        .context(error::ReadPostingLineSnafu { offset })?;
    Ok(line)
}

fn parse_ranked_line(line: &str, offset: u64) -> Result<RankedPostingList, DictionaryError> {
    let mut entries = Vec::new();
    for token in line.split_whitespace() {
        let mut parts = token.splitn(2, ':');
        let doc_id: DocId = parts
            .next()
            .and_then(|s| s.parse().ok())
            .ok_or(DictionaryError::MalformedPostingLine { offset })?;
        let tf: u32 = parts
            .next()
            .and_then(|s| s.parse().ok())
            .ok_or(DictionaryError::MalformedPostingLine { offset })?;
        entries.push((doc_id, tf));
    }
    Ok(RankedPostingList { entries })
}

fn parse_boolean_line(line: &str, offset: u64) -> Result<BooleanPostingList, DictionaryError> {
    let mut doc_ids = Vec::new();
    let mut skips = std::collections::BTreeMap::new();
    for (i, token) in line.split_whitespace().enumerate() {
        let mut parts = token.splitn(2, ':');
        let doc_id: DocId = parts
            .next()
            .and_then(|s| s.parse().ok())
            .ok_or(DictionaryError::MalformedPostingLine { offset })?;
        doc_ids.push(doc_id);
        if let Some(skip_str) = parts.next() {
            let target: usize = skip_str
                .parse()
                .map_err(|_| DictionaryError::MalformedPostingLine { offset })?;
            skips.insert(i, target);
        }
    }
    Ok(BooleanPostingList { doc_ids, skips })
}

/// The ranked searcher's view of the index: dictionary plus term-frequency
/// postings plus the `doc_sizes` table used as the scorer's length
/// denominator.
pub struct RankedPostings {
    file: RefCell<File>,
    dictionary: HashMap<String, (u32, u64)>,
    doc_sizes: std::collections::BTreeMap<DocId, u32>,
    cache: RefCell<HashMap<u64, RankedPostingList>>,
}

impl RankedPostings {
    pub fn open(dictionary_path: &Path, postings_path: &Path) -> Result<Self, DictionaryError> {
        let dict = read_dictionary_file(dictionary_path)?;
        let file = File::open(postings_path)
            .context(error::OpenPostingsSnafu { path: postings_path.to_path_buf() })?;
        let file = RefCell::new(file);

        let all_docs_line = read_line_at(&file, dict.all_docs_offset)?;
        let all_docs = parse_ranked_line(&all_docs_line, dict.all_docs_offset)?;
        let doc_sizes = all_docs.entries.into_iter().collect();

        Ok(RankedPostings {
            file,
            dictionary: dict.entries,
            doc_sizes,
            cache: RefCell::new(HashMap::new()),
        })
    }

    pub fn lookup(&self, term: &str) -> Option<(u32, u64)> {
        self.dictionary.get(term).copied()
    }

    pub fn postings(&self, term: &str) -> RankedPostingList {
        let Some((_, offset)) = self.lookup(term) else {
            return RankedPostingList::default();
        };
        if let Some(cached) = self.cache.borrow().get(&offset) {
            return cached.clone();
        }
        let parsed = read_line_at(&self.file, offset)
            .and_then(|line| parse_ranked_line(&line, offset))
            .unwrap_or_else(|err| {
                log::error!("failed to read postings for term {term:?} at offset {offset}: {err}");
                RankedPostingList::default()
            });
        self.cache.borrow_mut().insert(offset, parsed.clone());
        parsed
    }

    /// Dictionary size (distinct term count), used as *N* in IDF. Intentionally
    /// the term count, not the document count.
    pub fn num_docs(&self) -> usize {
        self.dictionary.len()
    }

    pub fn doc_length(&self, doc_id: DocId) -> usize {
        self.doc_sizes.get(&doc_id).copied().unwrap_or(0) as usize
    }

    pub fn all_docs(&self) -> Vec<DocId> {
        self.doc_sizes.keys().copied().collect()
    }
}

/// The boolean searcher's view of the index: dictionary plus doc-id-only
/// postings with skip pointers, plus the all-documents posting used as the
/// universe for `NOT`.
pub struct BooleanPostings {
    file: RefCell<File>,
    dictionary: HashMap<String, (u32, u64)>,
    all_docs: BooleanPostingList,
    cache: RefCell<HashMap<u64, BooleanPostingList>>,
}

impl BooleanPostings {
    pub fn open(dictionary_path: &Path, postings_path: &Path) -> Result<Self, DictionaryError> {
        let dict = read_dictionary_file(dictionary_path)?;
        let file = File::open(postings_path)
            .context(error::OpenPostingsSnafu { path: postings_path.to_path_buf() })?;
        let file = RefCell::new(file);

        let all_docs_line = read_line_at(&file, dict.all_docs_offset)?;
        let all_docs = parse_boolean_line(&all_docs_line, dict.all_docs_offset)?;

        Ok(BooleanPostings {
            file,
            dictionary: dict.entries,
            all_docs,
            cache: RefCell::new(HashMap::new()),
        })
    }

    pub fn lookup(&self, term: &str) -> Option<(u32, u64)> {
        self.dictionary.get(term).copied()
    }

    pub fn postings(&self, term: &str) -> BooleanPostingList {
        let Some((_, offset)) = self.lookup(term) else {
            return BooleanPostingList::default();
        };
        if let Some(cached) = self.cache.borrow().get(&offset) {
            return cached.clone();
        }
        let parsed = read_line_at(&self.file, offset)
            .and_then(|line| parse_boolean_line(&line, offset))
            .unwrap_or_else(|err| {
                log::error!("failed to read postings for term {term:?} at offset {offset}: {err}");
                BooleanPostingList::default()
            });
        self.cache.borrow_mut().insert(offset, parsed.clone());
        parsed
    }

    pub fn num_docs(&self) -> usize {
        self.dictionary.len()
    }

    pub fn all_docs(&self) -> &[DocId] {
        &self.all_docs.doc_ids
    }

    pub fn all_docs_skips(&self) -> &crate::postings::SkipMap {
        &self.all_docs.skips
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::postings::RankedPostingList;
    use std::io::Write;
    use std::path::PathBuf;
    use tempfile::tempdir;

    fn write_fixture(dir: &Path) -> (PathBuf, PathBuf) {
        let postings_path = dir.join("postings.txt");
        let dictionary_path = dir.join("dictionary.txt");

        let mut postings = File::create(&postings_path).unwrap();
        let fox_line = "1:1 2:1\n";
        let quick_line = "1:1 2:2\n";
        let all_docs_line = "1:3 2:2 3:2\n";

        let fox_offset = 0u64;
        write!(postings, "{fox_line}").unwrap();
        let quick_offset = fox_line.len() as u64;
        write!(postings, "{quick_line}").unwrap();
        let all_docs_offset = quick_offset + quick_line.len() as u64;
        write!(postings, "{all_docs_line}").unwrap();

        let mut dictionary = File::create(&dictionary_path).unwrap();
        writeln!(dictionary, "{all_docs_offset}").unwrap();
        writeln!(dictionary, "fox 2 {fox_offset}").unwrap();
        writeln!(dictionary, "quick 2 {quick_offset}").unwrap();
        // a trailing blank/malformed line must be silently skipped
        writeln!(dictionary, "   ").unwrap();

        (dictionary_path, postings_path)
    }

    #[test]
    fn ranked_reader_round_trips_postings_and_doc_sizes() {
        let dir = tempdir().unwrap();
        let (dict_path, post_path) = write_fixture(dir.path());
        let reader = RankedPostings::open(&dict_path, &post_path).unwrap();

        assert_eq!(reader.num_docs(), 2);
        assert_eq!(
            reader.postings("fox"),
            RankedPostingList { entries: vec![(1, 1), (2, 1)] }
        );
        assert_eq!(reader.doc_length(1), 3);
        assert_eq!(reader.doc_length(2), 2);
        assert_eq!(reader.all_docs(), vec![1, 2, 3]);
    }

    #[test]
    fn unknown_term_yields_empty_postings() {
        let dir = tempdir().unwrap();
        let (dict_path, post_path) = write_fixture(dir.path());
        let reader = RankedPostings::open(&dict_path, &post_path).unwrap();
        assert!(reader.postings("nonexistent").is_empty());
        assert_eq!(reader.lookup("nonexistent"), None);
    }
}
