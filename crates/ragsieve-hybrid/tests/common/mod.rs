#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use ragsieve_core::error::Result;
use ragsieve_core::traits::{CrossEncoder, EncodeMode, Encoder, Generator, TextStream};
use ragsieve_core::types::{Chunk, ChunkMetadata};
use ragsieve_hybrid::{HybridRetriever, ScopeLoader};
use ragsieve_vector::FlatIndex;

/// Query encoder backed by a lookup table; unknown texts map to `fallback`.
pub struct TableEncoder {
    pub table: HashMap<String, Vec<f32>>,
    pub fallback: Vec<f32>,
}

impl TableEncoder {
    pub fn new(fallback: Vec<f32>) -> Self { Self { table: HashMap::new(), fallback } }

    pub fn with(mut self, text: &str, vector: Vec<f32>) -> Self {
        self.table.insert(text.to_string(), vector);
        self
    }
}

impl Encoder for TableEncoder {
    fn dim(&self) -> usize { self.fallback.len() }

    fn encode(&self, texts: &[String], _mode: EncodeMode) -> anyhow::Result<Vec<Vec<f32>>> {
        Ok(texts.iter().map(|t| self.table.get(t).cloned().unwrap_or_else(|| self.fallback.clone())).collect())
    }
}

pub struct FailingEncoder(pub usize);

impl Encoder for FailingEncoder {
    fn dim(&self) -> usize { self.0 }

    fn encode(&self, _texts: &[String], _mode: EncodeMode) -> anyhow::Result<Vec<Vec<f32>>> { anyhow::bail!("model offline") }
}

/// Cross-encoder returning a fixed logit per passage text (default -10) and
/// counting calls.
#[derive(Default)]
pub struct TableCrossEncoder {
    pub logits: HashMap<String, f32>,
    pub calls: AtomicUsize,
}

impl TableCrossEncoder {
    pub fn with(mut self, passage: &str, logit: f32) -> Self {
        self.logits.insert(passage.to_string(), logit);
        self
    }

    pub fn calls(&self) -> usize { self.calls.load(Ordering::SeqCst) }
}

impl CrossEncoder for TableCrossEncoder {
    fn score(&self, _query: &str, passage: &str) -> anyhow::Result<f32> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.logits.get(passage).copied().unwrap_or(-10.0))
    }
}

pub struct FailingCrossEncoder;

impl CrossEncoder for FailingCrossEncoder {
    fn score(&self, _query: &str, _passage: &str) -> anyhow::Result<f32> { anyhow::bail!("reranker crashed") }
}

/// Echoes the prompt back so tests can inspect it.
pub struct EchoGenerator;

impl Generator for EchoGenerator {
    fn generate(&self, prompt: &str) -> anyhow::Result<String> { Ok(prompt.to_string()) }

    fn generate_stream(&self, prompt: &str) -> anyhow::Result<TextStream> {
        let parts: Vec<String> = prompt.split_inclusive('\n').map(str::to_string).collect();
        Ok(Box::new(parts.into_iter()))
    }
}

pub fn chunk(id: &str, doc: &str, text: &str) -> Chunk {
    Chunk::new(
        text,
        ChunkMetadata {
            stable_id: Some(id.to_string()),
            source_document_id: Some(doc.to_string()),
            source: Some(format!("{doc}.pdf")),
            ..ChunkMetadata::default()
        },
    )
}

pub fn retriever(chunks: Vec<Chunk>, vectors: &[Vec<f32>], encoder: Arc<dyn Encoder>) -> HybridRetriever {
    let index = FlatIndex::from_vectors(encoder.dim(), vectors).unwrap();
    HybridRetriever::new(chunks, Arc::new(index), encoder).unwrap()
}

/// Builds the same in-memory retriever for any scope.
pub struct FixtureLoader {
    pub chunks: Vec<Chunk>,
    pub vectors: Vec<Vec<f32>>,
    pub encoder: Arc<dyn Encoder>,
    pub loads: AtomicUsize,
}

impl FixtureLoader {
    pub fn new(chunks: Vec<Chunk>, vectors: Vec<Vec<f32>>, encoder: Arc<dyn Encoder>) -> Self {
        Self { chunks, vectors, encoder, loads: AtomicUsize::new(0) }
    }
}

impl ScopeLoader for FixtureLoader {
    fn load(&self, _scope: &str) -> Result<HybridRetriever> {
        self.loads.fetch_add(1, Ordering::SeqCst);
        let index = FlatIndex::from_vectors(self.encoder.dim(), &self.vectors).map_err(|e| ragsieve_core::Error::Configuration(e.to_string()))?;
        HybridRetriever::new(self.chunks.clone(), Arc::new(index), self.encoder.clone())
    }
}

/// Unit vector along `axis` in `dim` dimensions.
pub fn axis(dim: usize, axis: usize) -> Vec<f32> {
    let mut v = vec![0.0; dim];
    v[axis] = 1.0;
    v
}

/// Reads the logit from the passage text itself.
pub struct ParsedLogit;

impl CrossEncoder for ParsedLogit {
    fn score(&self, _query: &str, passage: &str) -> anyhow::Result<f32> { Ok(passage.parse()?) }
}
