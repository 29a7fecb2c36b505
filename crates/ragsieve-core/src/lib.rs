#![deny(warnings)]
#![deny(dead_code)]
#![deny(unused_variables)]
#![deny(unused_imports)]

//! ragsieve-core
//!
//! Domain types, error taxonomy, capability traits and configuration shared
//! by the corpus store, lexical index, retriever and reranker.

pub mod config;
pub mod error;
pub mod traits;
pub mod types;

pub use error::{Error, Result};
