//! The corpus walker and index builder: reads a directory of documents named
//! by doc id, normalizes their text, and writes out the dictionary/postings
//! file pair.

use crate::dictionary::PostingFormat;
use crate::error::{self, IndexError};
use crate::normalize::normalize;
use crate::postings::{BooleanPostingList, DocId};
use snafu::ResultExt;
use std::collections::BTreeMap;
use std::fs;
use std::io::Write;
use std::path::Path;

/// Walks `input_dir`'s immediate children, each expected to be named with a
/// decimal document id, and returns them sorted ascending. Mirrors the
/// original indexer's `sorted(map(int, os.listdir(...)))`.
fn list_doc_ids(input_dir: &Path) -> Result<Vec<(DocId, std::path::PathBuf)>, IndexError> {
    let mut docs = Vec::new();
    for entry in walkdir::WalkDir::new(input_dir).min_depth(1).max_depth(1) {
        let entry = entry.context(error::WalkCorpusDirSnafu { path: input_dir.to_path_buf() })?;
        let name = entry.file_name().to_string_lossy().to_string();
        let doc_id: DocId = name
            .parse()
            .map_err(|_| IndexError::InvalidDocId { name: name.clone() })?;
        docs.push((doc_id, entry.path().to_path_buf()));
    }
    docs.sort_by_key(|(id, _)| *id);
    Ok(docs)
}

/// `term -> { doc_id -> term_frequency }`, built in one pass over the corpus.
type TermDictionary = BTreeMap<String, BTreeMap<DocId, u32>>;

fn build_term_dictionary(docs: &[(DocId, std::path::PathBuf)]) -> Result<(TermDictionary, BTreeMap<DocId, u32>), IndexError> {
    let mut term_dictionary: TermDictionary = BTreeMap::new();
    let mut doc_sizes = BTreeMap::new();

    for (doc_id, path) in docs {
        log::debug!("indexing doc {doc_id}");
        let bytes = fs::read(path).context(error::ReadDocumentSnafu { path: path.clone() })?;
        let content = String::from_utf8_lossy(&bytes);

        let mut unique_terms = 0u32;
        for term in normalize(&content) {
            let postings = term_dictionary.entry(term).or_default();
            if !postings.contains_key(doc_id) {
                unique_terms += 1;
            }
            *postings.entry(*doc_id).or_insert(0) += 1;
        }
        doc_sizes.insert(*doc_id, unique_terms);
    }

    Ok((term_dictionary, doc_sizes))
}

fn format_ranked_line(postings: &BTreeMap<DocId, u32>) -> String {
    let body: Vec<String> = postings.iter().map(|(doc_id, tf)| format!("{doc_id}:{tf}")).collect();
    format!("{}\n", body.join(" "))
}

fn format_boolean_line(doc_ids: &[DocId]) -> String {
    let list = BooleanPostingList::with_skips(doc_ids.to_vec());
    let body: Vec<String> = doc_ids
        .iter()
        .enumerate()
        .map(|(i, doc_id)| match list.skips.get(&i) {
            Some(target) => format!("{doc_id}:{target}"),
            None => format!("{doc_id}"),
        })
        .collect();
    format!("{}\n", body.join(" "))
}

/// Builds the index for the documents under `input_dir` and writes the
/// dictionary/postings file pair in the grammar selected by `format`.
pub fn build_index(
    input_dir: &Path,
    dictionary_path: &Path,
    postings_path: &Path,
    format: PostingFormat,
) -> Result<(), IndexError> {
    let docs = list_doc_ids(input_dir)?;
    log::info!("found {} documents under {}", docs.len(), input_dir.display());

    let (term_dictionary, doc_sizes) = build_term_dictionary(&docs)?;
    log::info!("{} distinct terms", term_dictionary.len());

    let mut postings_file =
        fs::File::create(postings_path).context(error::CreatePostingsSnafu { path: postings_path.to_path_buf() })?;

    let mut offset: u64 = 0;
    let mut term_offsets = Vec::with_capacity(term_dictionary.len());

    for (term, postings) in &term_dictionary {
        let line = match format {
            PostingFormat::Ranked => format_ranked_line(postings),
            PostingFormat::Boolean => format_boolean_line(&postings.keys().copied().collect::<Vec<_>>()),
        };
        term_offsets.push((term.clone(), postings.len() as u32, offset));
        offset += line.len() as u64;
        postings_file
            .write_all(line.as_bytes())
            .context(error::WritePostingsSnafu { path: postings_path.to_path_buf() })?;
    }

    let all_docs_line = match format {
        PostingFormat::Ranked => format_ranked_line(&doc_sizes),
        PostingFormat::Boolean => format_boolean_line(&doc_sizes.keys().copied().collect::<Vec<_>>()),
    };
    let all_docs_offset = offset;
    postings_file
        .write_all(all_docs_line.as_bytes())
        .context(error::WritePostingsSnafu { path: postings_path.to_path_buf() })?;

    let mut dictionary_file =
        fs::File::create(dictionary_path).context(error::CreateDictionarySnafu { path: dictionary_path.to_path_buf() })?;
    writeln!(dictionary_file, "{all_docs_offset}")
        .context(error::WriteDictionarySnafu { path: dictionary_path.to_path_buf() })?;
    for (term, df, term_offset) in term_offsets {
        writeln!(dictionary_file, "{term} {df} {term_offset}")
            .context(error::WriteDictionarySnafu { path: dictionary_path.to_path_buf() })?;
    }

    log::info!(
        "wrote dictionary {} and postings {}",
        dictionary_path.display(),
        postings_path.display()
    );
    Ok(())
}
