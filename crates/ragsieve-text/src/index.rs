use std::cmp::Ordering;
use std::collections::HashMap;

use tantivy::tokenizer::TextAnalyzer;
use tracing::debug;

use ragsieve_core::error::{Error, Result};
use ragsieve_core::types::Chunk;

use crate::tantivy_utils::{build_analyzer, tokenize};

/// Okapi BM25 constants.
///
/// `epsilon` scales the mean idf that replaces negative idf values, so terms
/// present in more than half of the corpus still count a little.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bm25Params {
	pub k1: f64,
	pub b: f64,
	pub epsilon: f64,
}

impl Default for Bm25Params {
	fn default() -> Self { Self { k1: 1.5, b: 0.75, epsilon: 0.25 } }
}

/// In-memory BM25 index over corpus text, addressed by corpus position.
pub struct LexicalIndex {
	analyzer: TextAnalyzer,
	params: Bm25Params,
	doc_freqs: Vec<HashMap<String, u32>>,
	doc_len: Vec<f64>,
	avgdl: f64,
	idf: HashMap<String, f64>,
}

impl LexicalIndex {
	pub fn build(chunks: &[Chunk]) -> Result<Self> {
		Self::with_params(chunks, Bm25Params::default())
	}

	pub fn with_params(chunks: &[Chunk], params: Bm25Params) -> Result<Self> {
		if chunks.is_empty() {
			return Err(Error::Configuration("cannot build a lexical index over an empty corpus".into()));
		}
		let mut analyzer = build_analyzer();
		let mut doc_freqs = Vec::with_capacity(chunks.len());
		let mut doc_len = Vec::with_capacity(chunks.len());
		let mut containing: HashMap<String, u32> = HashMap::new();
		for chunk in chunks {
			let tokens = tokenize(&mut analyzer, &chunk.text);
			doc_len.push(tokens.len() as f64);
			let mut freqs: HashMap<String, u32> = HashMap::new();
			for t in tokens { *freqs.entry(t).or_insert(0) += 1; }
			for term in freqs.keys() { *containing.entry(term.clone()).or_insert(0) += 1; }
			doc_freqs.push(freqs);
		}
		let n = chunks.len() as f64;
		let avgdl = doc_len.iter().sum::<f64>() / n;

		let mut idf = HashMap::with_capacity(containing.len());
		let mut idf_sum = 0.0;
		let mut negative = Vec::new();
		for (term, df) in containing {
			let df = f64::from(df);
			let value = (n - df + 0.5).ln() - (df + 0.5).ln();
			idf_sum += value;
			if value < 0.0 { negative.push(term.clone()); }
			idf.insert(term, value);
		}
		if !idf.is_empty() {
			let eps = params.epsilon * idf_sum / idf.len() as f64;
			for term in negative { idf.insert(term, eps); }
		}
		debug!(chunks = chunks.len(), terms = idf.len(), avgdl, "lexical index built");
		Ok(Self { analyzer, params, doc_freqs, doc_len, avgdl, idf })
	}

	pub fn len(&self) -> usize { self.doc_freqs.len() }

	pub fn is_empty(&self) -> bool { self.doc_freqs.is_empty() }

	pub fn tokenize(&self, text: &str) -> Vec<String> {
		let mut analyzer = self.analyzer.clone();
		tokenize(&mut analyzer, text)
	}

	/// BM25 score of every chunk for the given query tokens, by position.
	/// Repeated query tokens contribute repeatedly.
	pub fn score(&self, query_tokens: &[String]) -> Vec<f32> {
		let mut scores = vec![0f64; self.len()];
		if self.avgdl <= 0.0 { return vec![0f32; self.len()]; }
		let Bm25Params { k1, b, .. } = self.params;
		for q in query_tokens {
			let Some(&idf) = self.idf.get(q) else { continue };
			for (i, freqs) in self.doc_freqs.iter().enumerate() {
				let tf = freqs.get(q).copied().map_or(0.0, f64::from);
				if tf == 0.0 { continue; }
				let norm = k1 * (1.0 - b + b * self.doc_len[i] / self.avgdl);
				scores[i] += idf * (tf * (k1 + 1.0) / (tf + norm));
			}
		}
		scores.into_iter().map(|s| s as f32).collect()
	}

	/// Every chunk ranked by descending score; ties keep corpus order.
	pub fn ranked(&self, query: &str) -> Vec<(usize, f32)> {
		let tokens = self.tokenize(query);
		let mut ranked: Vec<(usize, f32)> = self.score(&tokens).into_iter().enumerate().collect();
		ranked.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(Ordering::Equal));
		ranked
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use ragsieve_core::types::ChunkMetadata;

	fn corpus(texts: &[&str]) -> Vec<Chunk> {
		texts.iter().map(|t| Chunk::new(*t, ChunkMetadata::default())).collect()
	}

	#[test]
	fn empty_corpus_is_a_configuration_error() {
		assert!(matches!(LexicalIndex::build(&[]), Err(Error::Configuration(_))));
	}

	#[test]
	fn matches_reference_okapi_scores() {
		// Reference values computed with the classic Okapi formula
		// (k1=1.5, b=0.75, epsilon=0.25).
		let index = LexicalIndex::build(&corpus(&["hello there good man", "it is quite windy in london", "how is the weather today"])).unwrap();
		let scores = index.score(&index.tokenize("windy london"));
		assert_eq!(scores[0], 0.0);
		assert_eq!(scores[2], 0.0);
		// idf = ln(2.5/1.5); dl = 6, avgdl = 15/3
		let idf = (2.5f64 / 1.5).ln();
		let norm = 1.5 * (1.0 - 0.75 + 0.75 * 6.0 / 5.0);
		let expected = 2.0 * idf * (2.5 / (1.0 + norm));
		assert!((f64::from(scores[1]) - expected).abs() < 1e-5, "{} vs {}", scores[1], expected);
	}

	#[test]
	fn ubiquitous_terms_get_epsilon_idf() {
		let index = LexicalIndex::build(&corpus(&["cell wall plant", "cell membrane lipid", "cell nucleus dna"])).unwrap();
		let scores = index.score(&index.tokenize("cell"));
		assert!(scores.iter().all(|s| *s > 0.0), "epsilon idf keeps shared terms positive: {scores:?}");
	}

	#[test]
	fn unknown_terms_score_zero() {
		let index = LexicalIndex::build(&corpus(&["alpha beta", "gamma delta"])).unwrap();
		assert!(index.score(&index.tokenize("omega")).iter().all(|s| *s == 0.0));
	}

	#[test]
	fn ranked_is_descending_and_complete() {
		let index = LexicalIndex::build(&corpus(&["a d", "x y z", "b b c", "q"])).unwrap();
		let ranked = index.ranked("B");
		assert_eq!(ranked.len(), 4);
		assert_eq!(ranked[0].0, 2);
		for pair in ranked.windows(2) { assert!(pair[0].1 >= pair[1].1); }
	}
}
