//! Context blocks and the grounded-answer prompt.
use std::path::Path;

use ragsieve_core::types::Chunk;

pub const BLOCK_SEPARATOR: &str = "\n\n---\n";

/// One labeled block per chunk, numbered from 1, e.g.
/// `[1] Source: notes.pdf, page 3, chunk notes-3-0`.
pub fn format_context_blocks(chunks: &[Chunk]) -> Vec<String> {
	chunks.iter().enumerate().map(|(i, chunk)| format!("[{}] {}\n{}", i + 1, citation(chunk), chunk.text.trim())).collect()
}

fn citation(chunk: &Chunk) -> String {
	let source = chunk.metadata.source.as_deref().map_or("unknown", |s| Path::new(s).file_name().and_then(|n| n.to_str()).unwrap_or(s));
	let mut label = format!("Source: {}", source);
	if let Some(page) = chunk.metadata.page { label.push_str(&format!(", page {}", page)); }
	label.push_str(&format!(", chunk {}", chunk.display_id()));
	label
}

/// Distinct citation sources in first-seen order.
pub fn distinct_sources(chunks: &[Chunk]) -> Vec<String> {
	let mut out: Vec<String> = Vec::new();
	for source in chunks.iter().filter_map(|c| c.metadata.source.as_deref()) {
		if !out.iter().any(|s| s == source) { out.push(source.to_string()); }
	}
	out
}

pub fn build_prompt(question: &str, blocks: &[String]) -> String {
	let context = blocks.join(BLOCK_SEPARATOR);
	format!(
		"[System]\n\
		You are a multilingual learning assistant helping students understand their study materials.\n\
		\n\
		[Rules]\n\
		- Answer in the same language as the question.\n\
		- Use ONLY the information in the [Context] section below.\n\
		- If the answer cannot be found in the context, say you do not know instead of guessing.\n\
		- When sources conflict, summarize the parts best supported by the context.\n\
		- Cite the numbered blocks you rely on.\n\
		- Format the answer in Markdown.\n\
		\n\
		[Context]\n\
		{context}\n\
		\n\
		[Question]\n\
		{question}\n\
		\n\
		[Answer]\n"
	)
}
