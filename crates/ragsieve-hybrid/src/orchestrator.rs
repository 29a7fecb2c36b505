//! Retrieve, optionally rerank, format context and hand off to a generator.
use std::path::PathBuf;
use std::sync::Arc;

use tracing::{info, instrument, warn};

use ragsieve_core::config::Settings;
use ragsieve_core::error::{Error, Result};
use ragsieve_core::traits::{Generator, TextStream};
use ragsieve_core::types::Chunk;
use ragsieve_embed::ModelRegistry;
use ragsieve_vector::{load, scope_paths};

use crate::cache::{RebuildOutcome, RetrieverCache};
use crate::context::{build_prompt, format_context_blocks};
use crate::rerank::Reranker;
use crate::retriever::HybridRetriever;

/// Fixed reply when the corpus holds nothing relevant to the question.
pub const INSUFFICIENT_CONTEXT: &str = "Sorry, I could not find relevant information in the documents to answer this question.";

/// Constructs the retriever for a scope.
pub trait ScopeLoader: Send + Sync {
	fn load(&self, scope: &str) -> Result<HybridRetriever>;
}

/// Loads `{index_dir}/{scope}` with the registry's encoder.
pub struct StoreScopeLoader { index_dir: PathBuf, registry: Arc<ModelRegistry> }

impl StoreScopeLoader {
	pub fn new(index_dir: PathBuf, registry: Arc<ModelRegistry>) -> Self { Self { index_dir, registry } }
}

impl ScopeLoader for StoreScopeLoader {
	fn load(&self, scope: &str) -> Result<HybridRetriever> {
		let paths = scope_paths(&self.index_dir, scope)?;
		let encoder = self.registry.encoder().map_err(|e| Error::Configuration(format!("encoder unavailable: {:#}", e)))?;
		let store = load(&paths.index, &paths.meta, Some(encoder.dim()))?;
		HybridRetriever::from_store(store, encoder)
	}
}

/// Context ready for generation, or the insufficient-context verdict.
#[derive(Debug, Clone, PartialEq)]
pub enum ContextOutcome {
	Insufficient,
	Ready { chunks: Vec<Chunk>, blocks: Vec<String>, reranked: bool },
}

pub enum Answer {
	Text(String),
	Stream(TextStream),
}

impl Answer {
	/// Drains a stream into one string.
	pub fn into_text(self) -> String {
		match self {
			Answer::Text(text) => text,
			Answer::Stream(stream) => stream.collect(),
		}
	}
}

pub struct RetrievalOrchestrator {
	loader: Arc<dyn ScopeLoader>,
	settings: Settings,
	cache: RetrieverCache,
	reranker: Option<Reranker>,
	generator: Option<Arc<dyn Generator>>,
}

impl RetrievalOrchestrator {
	/// Fails with a configuration error when `settings` do not validate.
	pub fn new(loader: Arc<dyn ScopeLoader>, settings: Settings) -> Result<Self> {
		settings.validate()?;
		Ok(Self { loader, settings, cache: RetrieverCache::new(), reranker: None, generator: None })
	}

	pub fn with_reranker(mut self, reranker: Reranker) -> Self {
		self.reranker = Some(reranker);
		self
	}

	pub fn with_generator(mut self, generator: Arc<dyn Generator>) -> Self {
		self.generator = Some(generator);
		self
	}

	pub fn settings(&self) -> &Settings { &self.settings }

	pub fn retriever(&self, scope: &str) -> Result<Arc<HybridRetriever>> {
		self.cache.get_or_build(scope, || self.loader.load(scope))
	}

	/// Makes `scope` the only cached scope and loads it.
	pub fn activate_scope(&self, scope: &str) -> Result<Arc<HybridRetriever>> {
		self.cache.retain_only(scope);
		self.retriever(scope)
	}

	/// Reloads a scope after its store was rewritten.
	pub fn refresh_scope(&self, scope: &str) -> Result<RebuildOutcome<HybridRetriever>> {
		self.cache.rebuild(scope, || self.loader.load(scope))
	}

	pub fn evict_scope(&self, scope: &str) -> bool { self.cache.evict(scope) }

	/// Runs retrieval and optional reranking for `question` within `scope`.
	///
	/// `allowed_source_ids` restricts candidates by `source_document_id` after
	/// fusion. Only construction of the scope's retriever can fail.
	#[instrument(skip(self, allowed_source_ids))]
	pub fn prepare_context(&self, question: &str, scope: &str, use_reranker: bool, allowed_source_ids: Option<&[String]>) -> Result<ContextOutcome> {
		let retriever = self.retriever(scope)?;
		let Some(fused) = retriever.retrieve_validated(question, &self.settings.retrieval) else {
			info!("no relevant context");
			return Ok(ContextOutcome::Insufficient);
		};
		let mut candidates: Vec<Chunk> = fused.into_iter().map(|c| c.chunk).collect();

		if let Some(allowed) = allowed_source_ids {
			candidates.retain(|c| c.metadata.source_document_id.as_ref().is_some_and(|id| allowed.contains(id)));
			if candidates.is_empty() {
				info!("allow-list removed every candidate");
				return Ok(ContextOutcome::Insufficient);
			}
		}

		let top_n = self.settings.rerank.top_n;
		let mut reranked = false;
		if use_reranker && self.settings.rerank.enabled && candidates.len() > top_n {
			match &self.reranker {
				Some(reranker) => match reranker.rerank(question, candidates.clone(), top_n, self.settings.rerank.score_threshold) {
					Ok(ranked) if ranked.is_empty() => {
						info!("reranker kept nothing above threshold");
						return Ok(ContextOutcome::Insufficient);
					}
					Ok(ranked) => {
						candidates = ranked.into_iter().map(|r| r.chunk).collect();
						reranked = true;
					}
					Err(e) => warn!(error = %e, "rerank failed, using fused order"),
				},
				None => warn!("reranking requested but no reranker configured"),
			}
		}

		let blocks = format_context_blocks(&candidates);
		Ok(ContextOutcome::Ready { chunks: candidates, blocks, reranked })
	}

	/// Full question answering. Insufficient context short-circuits to
	/// [`INSUFFICIENT_CONTEXT`] without calling the generator.
	pub fn answer(&self, question: &str, scope: &str, streaming: bool, use_reranker: bool, allowed_source_ids: Option<&[String]>) -> Result<Answer> {
		let blocks = match self.prepare_context(question, scope, use_reranker, allowed_source_ids)? {
			ContextOutcome::Insufficient => return Ok(insufficient(streaming)),
			ContextOutcome::Ready { blocks, .. } => blocks,
		};
		let generator = self.generator.as_ref().ok_or_else(|| Error::Configuration("no generator configured".into()))?;
		let prompt = build_prompt(question, &blocks);
		if streaming {
			generator.generate_stream(&prompt).map(Answer::Stream).map_err(|e| Error::Generation(format!("{:#}", e)))
		} else {
			generator.generate(&prompt).map(Answer::Text).map_err(|e| Error::Generation(format!("{:#}", e)))
		}
	}
}

fn insufficient(streaming: bool) -> Answer {
	if streaming {
		Answer::Stream(Box::new(std::iter::once(INSUFFICIENT_CONTEXT.to_string())))
	} else {
		Answer::Text(INSUFFICIENT_CONTEXT.to_string())
	}
}
