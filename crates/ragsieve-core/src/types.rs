//! Domain types shared by the corpus store, lexical index and retriever.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Citation and identity data attached to a chunk.
///
/// - `stable_id`: deduplication key, unique within a corpus (`chunk_unique_id` is accepted on read)
/// - `chunk_id`: secondary numeric identifier used when `stable_id` is absent
/// - `source_document_id`: identity of the parent document, used for scoping
/// - `source`: path or filename shown in citations
/// - `page`/`position_index`: location within the parent document and corpus
///
/// Unknown keys written by the external chunker are preserved in `extra`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChunkMetadata {
    #[serde(default, alias = "chunk_unique_id", skip_serializing_if = "Option::is_none")]
    pub stable_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chunk_id: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_document_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page: Option<u32>,
    #[serde(default)]
    pub position_index: usize,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// A retrievable unit of text with its metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chunk {
    pub text: String,
    #[serde(default)]
    pub metadata: ChunkMetadata,
}

/// Identity used to deduplicate fused candidates.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ChunkKey {
    Stable(String),
    Secondary(u64),
}

impl Chunk {
    pub fn new(text: impl Into<String>, metadata: ChunkMetadata) -> Self {
        Self { text: text.into(), metadata }
    }

    /// Stable identifier, falling back to the secondary `chunk_id`.
    /// An empty `stable_id` counts as absent.
    pub fn key(&self) -> Option<ChunkKey> {
        match self.metadata.stable_id.as_deref() {
            Some(id) if !id.is_empty() => Some(ChunkKey::Stable(id.to_string())),
            _ => self.metadata.chunk_id.map(ChunkKey::Secondary),
        }
    }

    /// Human-readable identifier for citations and logs.
    pub fn display_id(&self) -> String {
        match self.key() {
            Some(ChunkKey::Stable(id)) => id,
            Some(ChunkKey::Secondary(id)) => id.to_string(),
            None => format!("#{}", self.metadata.position_index),
        }
    }
}

/// Ordered chunk records, index-aligned with the dense index.
pub type Corpus = Vec<Chunk>;

/// Indicates which retrieval stage produced a candidate.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum SourceKind {
    Dense,
    Lexical,
}

/// A fused candidate. `score` is stage-specific (cosine for dense, BM25 for
/// lexical) and only comparable within one stage.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoredChunk {
    pub chunk: Chunk,
    pub score: f32,
    pub source: SourceKind,
}

/// Outcome of one hybrid retrieval.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RetrievalResult {
    pub chunks: Vec<ScoredChunk>,
    pub is_relevant: bool,
    pub dense_kept: usize,
    pub lexical_kept: usize,
    pub lexical_top1: f32,
}

impl RetrievalResult {
    /// The "no relevant context" outcome.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Collapses the verdict: fused chunks when relevant, `None` otherwise.
    pub fn into_validated(self) -> Option<Vec<ScoredChunk>> {
        if self.is_relevant { Some(self.chunks) } else { None }
    }
}

/// A chunk kept by the reranker with its logistic relevance in `[0, 1]`.
#[derive(Debug, Clone, PartialEq)]
pub struct RerankedChunk {
    pub chunk: Chunk,
    pub score: f32,
}
