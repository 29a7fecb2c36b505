use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};

use ragsieve_core::error::{Error, Result};
use ragsieve_core::traits::VectorIndex;

use crate::corpus_file::parse_corpus;
use crate::search::LanceIndex;
use crate::store::check_corpus;

pub const INDEX_DIR_NAME: &str = "store.lance";
pub const META_FILE_NAME: &str = "chunks.json";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorePaths {
	pub index: PathBuf,
	pub meta: PathBuf,
}

/// Store location for one scope: `{index_dir}/{scope}/store.lance` and
/// `{index_dir}/{scope}/chunks.json`.
pub fn scope_paths(index_dir: &Path, scope: &str) -> Result<StorePaths> {
	if scope.is_empty() || scope == "." || scope == ".." || scope.contains(['/', '\\']) {
		return Err(Error::Configuration(format!("invalid scope id '{}'", scope)));
	}
	let root = index_dir.join(scope);
	Ok(StorePaths { index: root.join(INDEX_DIR_NAME), meta: root.join(META_FILE_NAME) })
}

/// Readiness of a persisted store, computed without building a retriever.
#[derive(Debug, Clone, Default, Serialize)]
pub struct StoreReport {
	pub index_exists: bool,
	pub meta_exists: bool,
	pub chunk_count: Option<usize>,
	pub vector_count: Option<usize>,
	pub dim: Option<usize>,
	pub is_ready: bool,
	pub errors: Vec<String>,
}

pub fn validate_store(paths: &StorePaths) -> StoreReport {
	let mut report = StoreReport { index_exists: paths.index.exists(), meta_exists: paths.meta.exists(), ..StoreReport::default() };
	if !report.index_exists { report.errors.push(format!("missing dense index {}", paths.index.display())); }
	if !report.meta_exists { report.errors.push(format!("missing corpus file {}", paths.meta.display())); }

	if report.meta_exists {
		match fs::read_to_string(&paths.meta).map_err(Error::from).and_then(|raw| parse_corpus(&raw)) {
			Ok((corpus, _)) => {
				report.chunk_count = Some(corpus.len());
				if let Err(e) = check_corpus(&corpus, &paths.meta) { report.errors.push(e.to_string()); }
			}
			Err(e) => report.errors.push(e.to_string()),
		}
	}
	if report.index_exists {
		match LanceIndex::open(&paths.index) {
			Ok(index) => {
				report.vector_count = Some(index.len());
				report.dim = Some(index.dim());
			}
			Err(e) => report.errors.push(format!("unreadable dense index: {:#}", e)),
		}
	}
	if let (Some(chunks), Some(vectors)) = (report.chunk_count, report.vector_count) {
		if chunks != vectors { report.errors.push(format!("{} vectors but {} chunks", vectors, chunks)); }
		if chunks == 0 { report.errors.push("corpus is empty".to_string()); }
	}
	report.is_ready = report.errors.is_empty();
	report
}
