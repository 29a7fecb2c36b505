//! ragsieve-text
//!
//! Lexical side of hybrid retrieval: a whitespace/lowercase tantivy analyzer
//! feeding an in-memory BM25 index rebuilt from the loaded corpus.

pub mod tantivy_utils;
pub mod index;

pub use index::{Bm25Params, LexicalIndex};
