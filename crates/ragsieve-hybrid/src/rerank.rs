use std::cmp::Ordering;
use std::sync::Arc;

use tracing::{debug, instrument};

use ragsieve_core::error::{Error, Result};
use ragsieve_core::traits::CrossEncoder;
use ragsieve_core::types::{Chunk, RerankedChunk};

/// Logistic relevance of a cross-encoder logit. Non-finite logits map to 0.
pub fn relevance(logit: f32) -> f32 {
	if logit.is_finite() { 1.0 / (1.0 + (-logit).exp()) } else { 0.0 }
}

/// Cross-encoder pass over retrieved candidates.
pub struct Reranker { model: Arc<dyn CrossEncoder> }

impl Reranker {
	pub fn new(model: Arc<dyn CrossEncoder>) -> Self { Self { model } }

	/// Candidates ordered by descending relevance (ties keep input order),
	/// dropping those below `score_threshold`, at most `top_n`.
	#[instrument(skip_all, fields(candidates = candidates.len(), top_n))]
	pub fn rerank(&self, query: &str, candidates: Vec<Chunk>, top_n: usize, score_threshold: Option<f32>) -> Result<Vec<RerankedChunk>> {
		if candidates.is_empty() || top_n == 0 { return Ok(Vec::new()); }
		let passages: Vec<&str> = candidates.iter().map(|c| c.text.as_str()).collect();
		let logits = self.model.score_batch(query, &passages).map_err(|e| Error::Rerank(format!("{:#}", e)))?;
		if logits.len() != passages.len() {
			return Err(Error::Rerank(format!("cross-encoder returned {} scores for {} pairs", logits.len(), passages.len())));
		}
		let mut scored: Vec<(f32, Chunk)> = logits.into_iter().map(relevance).zip(candidates).collect();
		scored.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap_or(Ordering::Equal));
		let kept: Vec<RerankedChunk> = scored
			.into_iter()
			.filter(|(score, _)| score_threshold.map_or(true, |t| *score >= t))
			.take(top_n)
			.map(|(score, chunk)| RerankedChunk { chunk, score })
			.collect();
		debug!(kept = kept.len(), best = kept.first().map(|c| c.score), "rerank done");
		Ok(kept)
	}
}
