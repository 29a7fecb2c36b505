//! Dense + lexical retrieval with threshold gating and a relevance verdict.
//!
//! 1. Dense: top `k_semantic` by inner product, kept when `score >= semantic_threshold`.
//! 2. Lexical: every chunk is BM25-scored. Nothing is kept when the best score
//!    is not positive or falls below `bm25_absolute_floor`; otherwise the ranked
//!    list is walked while `score >= bm25_dynamic_ratio * top1`, up to `k_keyword`.
//! 3. Fusion: dense first, then lexical, deduplicated by chunk key.
//! 4. Verdict: relevant when at least `min_results` chunks survive.
use std::collections::HashSet;
use std::sync::Arc;

use tracing::{debug, info, instrument, warn};

use ragsieve_core::config::RetrievalParams;
use ragsieve_core::error::{Error, Result};
use ragsieve_core::traits::{EncodeMode, Encoder, VectorIndex};
use ragsieve_core::types::{Chunk, Corpus, RetrievalResult, ScoredChunk, SourceKind};
use ragsieve_text::LexicalIndex;
use ragsieve_vector::{search_corpus, LoadedStore};

pub struct HybridRetriever {
	corpus: Corpus,
	lexical: LexicalIndex,
	index: Arc<dyn VectorIndex>,
	encoder: Arc<dyn Encoder>,
}

impl HybridRetriever {
	/// Builds the lexical index from `corpus`. The dense index must be aligned
	/// with the corpus and share the encoder's dimension.
	pub fn new(corpus: Corpus, index: Arc<dyn VectorIndex>, encoder: Arc<dyn Encoder>) -> Result<Self> {
		if corpus.is_empty() {
			return Err(Error::Configuration("cannot build a retriever over an empty corpus".into()));
		}
		if index.len() != corpus.len() {
			return Err(Error::Configuration(format!("dense index holds {} vectors for {} chunks", index.len(), corpus.len())));
		}
		if index.dim() != encoder.dim() {
			return Err(Error::Configuration(format!("dense index dimension {} differs from encoder dimension {}", index.dim(), encoder.dim())));
		}
		let lexical = LexicalIndex::build(&corpus)?;
		info!(chunks = corpus.len(), dim = index.dim(), "hybrid retriever ready");
		Ok(Self { corpus, lexical, index, encoder })
	}

	pub fn from_store(store: LoadedStore, encoder: Arc<dyn Encoder>) -> Result<Self> {
		let LoadedStore { corpus, index } = store;
		Self::new(corpus, Arc::new(index), encoder)
	}

	pub fn corpus(&self) -> &[Chunk] { &self.corpus }

	/// Never fails: encoder or index errors are logged and yield an empty
	/// result, judged like any other against `min_results`.
	#[instrument(skip(self, params), fields(k_semantic = params.k_semantic, k_keyword = params.k_keyword))]
	pub fn retrieve(&self, query: &str, params: &RetrievalParams) -> RetrievalResult {
		match self.try_retrieve(query, params) {
			Ok(result) => result,
			Err(e) => {
				warn!(error = %e, "retrieval failed, treating query as unanswerable");
				RetrievalResult { is_relevant: params.min_results == 0, ..RetrievalResult::empty() }
			}
		}
	}

	/// Fused chunks when the corpus holds enough relevant material, else `None`.
	pub fn retrieve_validated(&self, query: &str, params: &RetrievalParams) -> Option<Vec<ScoredChunk>> {
		self.retrieve(query, params).into_validated()
	}

	fn try_retrieve(&self, query: &str, params: &RetrievalParams) -> Result<RetrievalResult> {
		let dense = self.dense_stage(query, params)?;
		let dense_kept = dense.len();

		let ranked = self.lexical.ranked(query);
		let selection = select_lexical(&ranked, params.k_keyword, params.bm25_dynamic_ratio, params.bm25_absolute_floor);
		let lexical: Vec<ScoredChunk> = selection
			.hits
			.iter()
			.map(|&(pos, score)| ScoredChunk { chunk: self.corpus[pos].clone(), score, source: SourceKind::Lexical })
			.collect();
		let lexical_kept = lexical.len();
		info!("lexical: {} kept, top1 {:.3} (floor {:.2})", lexical_kept, selection.top1, params.bm25_absolute_floor);

		let chunks = fuse(dense, lexical);
		let is_relevant = chunks.len() >= params.min_results;
		info!(fused = chunks.len(), is_relevant, "retrieval verdict");
		Ok(RetrievalResult { chunks, is_relevant, dense_kept, lexical_kept, lexical_top1: selection.top1 })
	}

	fn dense_stage(&self, query: &str, params: &RetrievalParams) -> Result<Vec<ScoredChunk>> {
		let vector = self
			.encoder
			.encode(&[query.to_string()], EncodeMode::Query)
			.map_err(|e| Error::Retrieval(format!("query encoding failed: {:#}", e)))?
			.into_iter()
			.next()
			.ok_or_else(|| Error::Retrieval("encoder returned no vector for the query".into()))?;
		let hits = search_corpus(self.index.as_ref(), &self.corpus, &vector, params.k_semantic)
			.map_err(|e| Error::Retrieval(format!("dense search failed: {:#}", e)))?;
		let total = hits.len();
		let kept: Vec<ScoredChunk> = hits
			.into_iter()
			.filter(|(score, _)| *score >= params.semantic_threshold)
			.map(|(score, chunk)| ScoredChunk { chunk: chunk.clone(), score, source: SourceKind::Dense })
			.collect();
		info!("dense: {}/{} above {:.2}", kept.len(), total, params.semantic_threshold);
		Ok(kept)
	}
}

/// Lexical hits kept for one query, with the corpus-wide best score.
#[derive(Debug, Clone, PartialEq)]
pub struct LexicalSelection {
	pub hits: Vec<(usize, f32)>,
	pub top1: f32,
}

/// Applies the floor and dynamic threshold to a descending `(position, score)` list.
pub fn select_lexical(ranked: &[(usize, f32)], k_keyword: usize, ratio: f32, floor: f32) -> LexicalSelection {
	let top1 = ranked.first().map_or(0.0, |&(_, s)| s);
	if top1.is_nan() || top1 <= 0.0 || top1 < floor {
		debug!(top1, floor, "lexical stage below floor");
		return LexicalSelection { hits: Vec::new(), top1 };
	}
	let dynamic = ratio * top1;
	debug!(top1, dynamic, "lexical dynamic threshold");
	let hits = ranked.iter().take_while(|&&(_, s)| s >= dynamic).take(k_keyword).copied().collect();
	LexicalSelection { hits, top1 }
}

/// Concatenates dense then lexical candidates, keeping the first occurrence of
/// each chunk key. Candidates with no key are dropped.
pub fn fuse(dense: Vec<ScoredChunk>, lexical: Vec<ScoredChunk>) -> Vec<ScoredChunk> {
	let mut seen = HashSet::new();
	let mut fused = Vec::with_capacity(dense.len() + lexical.len());
	for candidate in dense.into_iter().chain(lexical) {
		let Some(key) = candidate.chunk.key() else {
			warn!(position = candidate.chunk.metadata.position_index, source = ?candidate.source, "dropping candidate without stable_id or chunk_id");
			continue;
		};
		if seen.insert(key) { fused.push(candidate); }
	}
	fused
}
