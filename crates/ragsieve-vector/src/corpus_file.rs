//! On-disk corpus file: a pretty-printed JSON array of chunk records.
//!
//! Older indexers wrote a bare array of strings. Such files are upgraded once
//! on load and rewritten in the record layout.
use serde::Deserialize;
use std::fs;
use std::io::Write;
use std::path::Path;
use tempfile::NamedTempFile;
use tracing::warn;

use ragsieve_core::error::{Error, Result};
use ragsieve_core::types::{Chunk, ChunkMetadata, Corpus};

#[derive(Deserialize)]
#[serde(untagged)]
enum CorpusFile {
	Records(Vec<Chunk>),
	Strings(Vec<String>),
}

/// Layout detected when parsing a corpus file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CorpusLayout {
	Records,
	LegacyStrings,
}

pub fn parse_corpus(raw: &str) -> Result<(Corpus, CorpusLayout)> {
	match serde_json::from_str::<CorpusFile>(raw) {
		Ok(CorpusFile::Records(chunks)) => Ok((chunks, CorpusLayout::Records)),
		Ok(CorpusFile::Strings(texts)) => Ok((upgrade_legacy(texts), CorpusLayout::LegacyStrings)),
		Err(e) => Err(Error::CorruptIndex(format!("corpus file is neither chunk records nor strings: {e}"))),
	}
}

/// Reads a corpus file, migrating the legacy string layout in place.
pub fn read_corpus(meta_path: &Path) -> Result<Corpus> {
	let raw = fs::read_to_string(meta_path)?;
	let (corpus, layout) = parse_corpus(&raw).map_err(|e| match e {
		Error::CorruptIndex(msg) => Error::CorruptIndex(format!("{}: {}", meta_path.display(), msg)),
		other => other,
	})?;
	if layout == CorpusLayout::LegacyStrings {
		warn!(path = %meta_path.display(), chunks = corpus.len(), "migrating legacy string corpus to chunk records");
		write_corpus(meta_path, &corpus)?;
	}
	Ok(corpus)
}

/// Atomically replaces `meta_path` with the serialized corpus.
pub fn write_corpus(meta_path: &Path, corpus: &[Chunk]) -> Result<()> {
	let dir = match meta_path.parent() {
		Some(p) if !p.as_os_str().is_empty() => p,
		_ => Path::new("."),
	};
	fs::create_dir_all(dir)?;
	let mut tmp = NamedTempFile::new_in(dir)?;
	serde_json::to_writer_pretty(&mut tmp, corpus)?;
	tmp.flush()?;
	tmp.persist(meta_path).map_err(|e| Error::Io(e.error))?;
	Ok(())
}

fn upgrade_legacy(texts: Vec<String>) -> Corpus {
	texts
		.into_iter()
		.enumerate()
		.map(|(i, text)| {
			let metadata = ChunkMetadata {
				stable_id: Some(format!("legacy-{i}")),
				chunk_id: Some(i as u64),
				source: Some("unknown".to_string()),
				position_index: i,
				..ChunkMetadata::default()
			};
			Chunk::new(text, metadata)
		})
		.collect()
}
