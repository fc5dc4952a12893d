//! A small information-retrieval engine: an inverted-index builder plus
//! boolean and ranked (`lnc.ltc` tf-idf) searchers over a corpus of plain-text
//! documents.

pub mod boolean;
pub mod dictionary;
pub mod driver;
pub mod error;
pub mod indexer;
pub mod normalize;
pub mod postings;
pub mod ranked;

pub use dictionary::{BooleanPostings, PostingFormat, RankedPostings};
