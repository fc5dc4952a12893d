//! The ranked (`lnc.ltc` tf-idf) scorer.
//!
//! Query vectors are `ltc`-weighted (log-tf, idf, cosine-normalized);
//! document vectors are `lnc`-weighted (log-tf, no idf, cosine-normalized)
//! restricted to the query's terms. The final score is divided by the
//! document's unique-term count rather than re-normalized — a deliberate,
//! non-standard step this implementation preserves.

use crate::dictionary::RankedPostings;
use crate::normalize::normalize;
use crate::postings::DocId;
use itertools::Itertools;
use std::collections::BTreeMap;

fn l2_normalize(weights: &mut [f64]) {
    let norm: f64 = weights.iter().map(|w| w * w).sum::<f64>().sqrt();
    if norm > 0.0 {
        for w in weights.iter_mut() {
            *w /= norm;
        }
    }
}

/// `term -> in-query term frequency`, one entry per distinct term in
/// ascending alphabetical order so the weight vector below is built
/// deterministically.
fn query_term_frequencies(query: &str) -> Vec<(String, u32)> {
    normalize(query)
        .counts()
        .into_iter()
        .collect::<BTreeMap<_, _>>()
        .into_iter()
        .map(|(term, count)| (term, count as u32))
        .collect()
}

/// Builds the `ltc`-weighted, L2-normalized query vector. Terms absent from
/// the index get a zero weight rather than being dropped, so the vector's
/// term order stays aligned with `terms`.
fn query_vector(terms: &[(String, u32)], postings: &RankedPostings) -> Vec<f64> {
    let n = postings.num_docs().max(1) as f64;
    let mut weights: Vec<f64> = terms
        .iter()
        .map(|(term, tf)| match postings.lookup(term) {
            Some((df, _)) if df > 0 => {
                let log_tf = 1.0 + (*tf as f64).log10();
                let idf = (n / df as f64).log10();
                log_tf * idf
            }
            _ => 0.0,
        })
        .collect();
    l2_normalize(&mut weights);
    weights
}

/// Builds the `lnc`-weighted, L2-normalized document vector restricted to
/// `terms`' components, for one candidate document.
fn document_vector(terms: &[(String, u32)], doc_id: DocId, postings: &RankedPostings) -> Vec<f64> {
    let mut weights: Vec<f64> = terms
        .iter()
        .map(|(term, _)| {
            let tf = postings.postings(term).term_frequency(doc_id).unwrap_or(0);
            if tf > 0 {
                1.0 + (tf as f64).log10()
            } else {
                0.0
            }
        })
        .collect();
    l2_normalize(&mut weights);
    weights
}

fn score_document(query_weights: &[f64], terms: &[(String, u32)], doc_id: DocId, postings: &RankedPostings) -> f64 {
    let doc_weights = document_vector(terms, doc_id, postings);
    let dot: f64 = query_weights.iter().zip(doc_weights.iter()).map(|(q, d)| q * d).sum();
    let length = postings.doc_length(doc_id);
    if length == 0 {
        0.0
    } else {
        dot / length as f64
    }
}

/// Runs a ranked query against `postings` and returns the top `k` doc ids,
/// highest score first, ties broken by ascending doc id for determinism.
/// When `parallel` is set, per-document scoring is spread across
/// `rayon`'s global pool.
pub fn search(query: &str, postings: &RankedPostings, k: usize, parallel: bool) -> Vec<DocId> {
    let terms = query_term_frequencies(query);
    if terms.is_empty() {
        return Vec::new();
    }

    // Warm-up pass: loads every query term's postings sequentially before any
    // concurrent scoring begins, satisfying the one-writer/one-shot-cache
    // contract without needing a lock.
    for (term, _) in &terms {
        postings.postings(term);
    }

    let query_weights = query_vector(&terms, postings);
    if query_weights.iter().all(|w| *w == 0.0) {
        return Vec::new();
    }

    let candidates: Vec<DocId> = terms
        .iter()
        .flat_map(|(term, _)| postings.postings(term).doc_ids())
        .sorted()
        .dedup()
        .collect();

    let mut scored: Vec<(DocId, f64)> = if parallel {
        use rayon::prelude::*;
        candidates
            .par_iter()
            .map(|&doc_id| (doc_id, score_document(&query_weights, &terms, doc_id, postings)))
            .collect()
    } else {
        candidates
            .iter()
            .map(|&doc_id| (doc_id, score_document(&query_weights, &terms, doc_id, postings)))
            .collect()
    };

    scored.sort_by(|(doc_a, score_a), (doc_b, score_b)| {
        score_b
            .partial_cmp(score_a)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| doc_a.cmp(doc_b))
    });
    scored.into_iter().take(k).map(|(doc_id, _)| doc_id).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    fn build_fixture() -> (tempfile::TempDir, std::path::PathBuf, std::path::PathBuf) {
        let corpus = tempdir().unwrap();
        fs::write(corpus.path().join("1"), "quick brown fox").unwrap();
        fs::write(corpus.path().join("2"), "quick quick fox").unwrap();
        fs::write(corpus.path().join("3"), "lazy dog").unwrap();

        let workdir = tempdir().unwrap();
        let dict_path = workdir.path().join("dictionary.txt");
        let post_path = workdir.path().join("postings.txt");
        crate::indexer::build_index(corpus.path(), &dict_path, &post_path, crate::dictionary::PostingFormat::Ranked)
            .unwrap();
        (workdir, dict_path, post_path)
    }

    #[test]
    fn single_term_query_ranks_higher_frequency_document_first() {
        let (_workdir, dict_path, post_path) = build_fixture();
        let postings = RankedPostings::open(&dict_path, &post_path).unwrap();
        let results = search("quick", &postings, 10, false);
        assert_eq!(results, vec![2, 1]);
    }

    #[test]
    fn two_term_query_excludes_documents_with_neither_term() {
        let (_workdir, dict_path, post_path) = build_fixture();
        let postings = RankedPostings::open(&dict_path, &post_path).unwrap();
        let results = search("quick fox", &postings, 2, false);
        assert_eq!(results, vec![2, 1]);
    }

    #[test]
    fn out_of_vocabulary_query_returns_no_results() {
        let (_workdir, dict_path, post_path) = build_fixture();
        let postings = RankedPostings::open(&dict_path, &post_path).unwrap();
        assert_eq!(search("nonexistentword", &postings, 10, false), Vec::<DocId>::new());
    }

    #[test]
    fn sequential_and_parallel_scoring_agree() {
        let (_workdir, dict_path, post_path) = build_fixture();
        let postings = RankedPostings::open(&dict_path, &post_path).unwrap();
        let sequential = search("quick fox", &postings, 10, false);
        let parallel = search("quick fox", &postings, 10, true);
        assert_eq!(sequential, parallel);
    }

    #[test]
    fn results_are_capped_at_k() {
        let (_workdir, dict_path, post_path) = build_fixture();
        let postings = RankedPostings::open(&dict_path, &post_path).unwrap();
        let results = search("quick fox lazy dog", &postings, 1, false);
        assert_eq!(results.len(), 1);
    }
}
