use anyhow::anyhow;
use std::collections::HashSet;
use std::fs;
use std::path::Path;
use tracing::info;

use ragsieve_core::error::{Error, Result};
use ragsieve_core::traits::VectorIndex;
use ragsieve_core::types::{Chunk, Corpus};

use crate::corpus_file::{read_corpus, write_corpus};
use crate::flat::FlatIndex;
use crate::search::LanceIndex;
use crate::table::{create_vector_table, open_db};

/// Maps index hits back to corpus chunks, as `(score, chunk)`.
pub fn search_corpus<'c>(index: &dyn VectorIndex, corpus: &'c [Chunk], query: &[f32], k: usize) -> anyhow::Result<Vec<(f32, &'c Chunk)>> {
	index
		.search(query, k)?
		.into_iter()
		.map(|(pos, score)| {
			corpus.get(pos).map(|c| (score, c)).ok_or_else(|| anyhow!("index returned position {} outside a corpus of {}", pos, corpus.len()))
		})
		.collect()
}

/// Append-only corpus under construction by the indexing path.
pub struct CorpusStore { corpus: Corpus, index: FlatIndex, ids: HashSet<String> }

impl CorpusStore {
	pub fn new(dim: usize) -> Self {
		Self { corpus: Vec::new(), index: FlatIndex::new(dim), ids: HashSet::new() }
	}

	pub fn dim(&self) -> usize { self.index.dim() }

	pub fn len(&self) -> usize { self.corpus.len() }

	pub fn is_empty(&self) -> bool { self.corpus.is_empty() }

	pub fn chunks(&self) -> &[Chunk] { &self.corpus }

	/// Appends aligned vectors and chunks. `position_index` is set to each
	/// chunk's corpus position. Nothing is appended when validation fails.
	pub fn add(&mut self, vectors: &[Vec<f32>], chunks: Vec<Chunk>) -> Result<()> {
		if vectors.len() != chunks.len() {
			return Err(Error::CorruptIndex(format!("{} vectors for {} chunks", vectors.len(), chunks.len())));
		}
		let mut batch_ids = HashSet::new();
		for chunk in &chunks {
			if chunk.text.is_empty() {
				return Err(Error::CorruptIndex(format!("chunk {} has empty text", chunk.display_id())));
			}
			if let Some(id) = chunk.metadata.stable_id.as_deref().filter(|id| !id.is_empty()) {
				if self.ids.contains(id) || !batch_ids.insert(id.to_string()) {
					return Err(Error::CorruptIndex(format!("duplicate stable_id '{}'", id)));
				}
			}
		}
		self.index.add(vectors).map_err(|e| Error::CorruptIndex(e.to_string()))?;
		self.ids.extend(batch_ids);
		let offset = self.corpus.len();
		self.corpus.extend(chunks.into_iter().enumerate().map(|(i, mut chunk)| {
			chunk.metadata.position_index = offset + i;
			chunk
		}));
		Ok(())
	}

	pub fn search(&self, query: &[f32], k: usize) -> Result<Vec<(f32, &Chunk)>> {
		search_corpus(&self.index, &self.corpus, query, k).map_err(|e| Error::Retrieval(e.to_string()))
	}

	/// Writes the dense index at `index_path` (replacing any previous one) and
	/// the corpus file at `meta_path`. The index is staged in a sibling
	/// directory, so a failed write leaves the previous store in place.
	pub fn save(&self, index_path: &Path, meta_path: &Path) -> Result<()> {
		if self.corpus.is_empty() {
			return Err(Error::Configuration("refusing to save an empty corpus".into()));
		}
		let vectors: Vec<Vec<f32>> = self.index.vectors().map(<[f32]>::to_vec).collect();
		replace_dir(index_path, |staging| {
			let uri = staging.to_string_lossy().to_string();
			let runtime = tokio::runtime::Builder::new_current_thread().enable_all().build()?;
			runtime
				.block_on(async {
					let conn = open_db(&uri).await?;
					create_vector_table(&conn, &vectors, self.dim()).await
				})
				.map_err(|e| Error::Io(std::io::Error::other(format!("failed to write {}: {:#}", index_path.display(), e))))
		})?;
		write_corpus(meta_path, &self.corpus)?;
		info!(chunks = self.corpus.len(), dim = self.dim(), index = %index_path.display(), "corpus store saved");
		Ok(())
	}

	pub fn into_parts(self) -> (Corpus, FlatIndex) { (self.corpus, self.index) }
}

/// Runs `write` against a fresh directory next to `target`, then swaps it in.
/// `target` is untouched when `write` fails.
fn replace_dir<F>(target: &Path, write: F) -> Result<()>
where
	F: FnOnce(&Path) -> Result<()>,
{
	let parent = match target.parent() {
		Some(p) if !p.as_os_str().is_empty() => p,
		_ => Path::new("."),
	};
	fs::create_dir_all(parent)?;
	let staging = tempfile::Builder::new().prefix(".staging-").tempdir_in(parent)?;
	write(staging.path())?;
	// Holds the previous directory until the swap is done; removed on drop.
	let retired = tempfile::Builder::new().prefix(".retired-").tempdir_in(parent)?;
	if target.exists() {
		fs::rename(target, retired.path().join("previous"))?;
	}
	fs::rename(staging.path(), target)?;
	Ok(())
}

/// Rejects corpora breaking the record invariants: non-empty text and unique `stable_id`.
pub(crate) fn check_corpus(corpus: &[Chunk], meta_path: &Path) -> Result<()> {
	let mut ids = HashSet::new();
	for chunk in corpus {
		if chunk.text.is_empty() {
			return Err(Error::CorruptIndex(format!("{}: chunk {} has empty text", meta_path.display(), chunk.display_id())));
		}
		if let Some(id) = chunk.metadata.stable_id.as_deref().filter(|id| !id.is_empty()) {
			if !ids.insert(id) {
				return Err(Error::CorruptIndex(format!("{}: duplicate stable_id '{}'", meta_path.display(), id)));
			}
		}
	}
	Ok(())
}

/// A persisted store opened read-only for serving.
pub struct LoadedStore {
	pub corpus: Corpus,
	pub index: LanceIndex,
}

impl LoadedStore {
	pub fn search(&self, query: &[f32], k: usize) -> Result<Vec<(f32, &Chunk)>> {
		search_corpus(&self.index, &self.corpus, query, k).map_err(|e| Error::Retrieval(e.to_string()))
	}
}

/// Opens a saved store. `expected_dim` is checked against the stored vectors
/// when given.
pub fn load(index_path: &Path, meta_path: &Path, expected_dim: Option<usize>) -> Result<LoadedStore> {
	if !index_path.exists() {
		return Err(Error::NotFound(format!("dense index {}", index_path.display())));
	}
	if !meta_path.exists() {
		return Err(Error::NotFound(format!("corpus file {}", meta_path.display())));
	}
	let corpus = read_corpus(meta_path)?;
	check_corpus(&corpus, meta_path)?;
	let index = LanceIndex::open(index_path).map_err(|e| Error::CorruptIndex(format!("{}: {:#}", index_path.display(), e)))?;
	if index.len() != corpus.len() {
		return Err(Error::CorruptIndex(format!("{} vectors but {} chunks in {}", index.len(), corpus.len(), meta_path.display())));
	}
	if let Some(dim) = expected_dim {
		if dim != index.dim() {
			return Err(Error::Configuration(format!("index dimension {} does not match encoder dimension {}", index.dim(), dim)));
		}
	}
	info!(chunks = corpus.len(), dim = index.dim(), "corpus store loaded");
	Ok(LoadedStore { corpus, index })
}
