//! Corpus store: chunk records plus the dense vector index aligned with them.
//!
//! The indexing path builds a [`CorpusStore`] in memory and saves it as a
//! LanceDB table next to a JSON corpus file; serving opens it with [`load`].
pub mod corpus_file;
pub mod flat;
pub mod paths;
pub mod schema;
pub mod search;
pub mod store;
pub mod table;

pub use flat::FlatIndex;
pub use paths::{scope_paths, validate_store, StorePaths, StoreReport};
pub use search::LanceIndex;
pub use store::{load, search_corpus, CorpusStore, LoadedStore};
