//! Hybrid retrieval and validation engine.
//!
//! [`HybridRetriever`] fuses dense and lexical candidates and decides whether
//! a corpus can answer a query; [`Reranker`] narrows candidates with a
//! cross-encoder; [`RetrievalOrchestrator`] sequences both and formats the
//! context handed to a generator.
pub mod cache;
pub mod context;
pub mod orchestrator;
pub mod rerank;
pub mod retriever;

pub use cache::{RebuildOutcome, RetrieverCache};
pub use context::{build_prompt, distinct_sources, format_context_blocks};
pub use orchestrator::{Answer, ContextOutcome, RetrievalOrchestrator, ScopeLoader, StoreScopeLoader, INSUFFICIENT_CONTEXT};
pub use rerank::{relevance, Reranker};
pub use retriever::{fuse, select_lexical, HybridRetriever, LexicalSelection};
