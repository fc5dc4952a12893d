//! The text normalizer: segment, sanitize, fold case, and stem.
//!
//! The same pipeline runs at index time and at query time, and is idempotent
//! on its own output, up to stemmer stability.

use rust_stemmers::{Algorithm, Stemmer};
use unicode_segmentation::UnicodeSegmentation;

fn is_allowed(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_' || c.is_whitespace() || c == '-'
}

/// Normalizes `text` into a lazy sequence of stemmed, lowercased terms.
pub fn normalize(text: &str) -> impl Iterator<Item = String> + '_ {
    let stemmer = Stemmer::create(Algorithm::English);
    text.split_word_bounds()
        .map(|segment| segment.chars().filter(|c| is_allowed(*c)).collect::<String>())
        .filter(|segment| !segment.is_empty())
        .map(|segment| segment.to_lowercase())
        .map(move |segment| stemmer.stem(&segment).into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn terms(text: &str) -> Vec<String> {
        normalize(text).collect()
    }

    #[test]
    fn idempotent_on_already_normalized_input() {
        let once = terms("The Quick-Brown Fox's");
        let twice: Vec<String> = once
            .iter()
            .flat_map(|t| normalize(t).collect::<Vec<_>>())
            .collect();
        assert_eq!(once, twice);
    }

    #[test]
    fn case_folds() {
        assert_eq!(terms("The"), terms("the"));
    }

    #[test]
    fn strips_punctuation() {
        assert_eq!(terms("hello, world!"), vec!["hello".to_string(), "world".to_string()]);
    }

    #[test]
    fn porter_stems_classical_vectors() {
        assert_eq!(terms("caresses"), vec!["caress".to_string()]);
        assert_eq!(terms("ponies"), vec!["poni".to_string()]);
        assert_eq!(terms("ties"), vec!["ti".to_string()]);
        assert_eq!(terms("cats"), vec!["cat".to_string()]);
        assert_eq!(terms("running"), vec!["run".to_string()]);
    }

    #[test]
    fn drops_segments_with_no_sanitized_characters() {
        assert_eq!(terms("--- !!! ???"), Vec::<String>::new());
    }
}
