use anyhow::{Result, anyhow};
use std::cmp::Ordering;

use ragsieve_core::traits::VectorIndex;

/// Exact inner-product index held in memory, row-major.
#[derive(Debug, Clone)]
pub struct FlatIndex { dim: usize, data: Vec<f32> }

impl FlatIndex {
	pub fn new(dim: usize) -> Self { Self { dim, data: Vec::new() } }

	pub fn from_vectors(dim: usize, vectors: &[Vec<f32>]) -> Result<Self> {
		let mut index = Self::new(dim);
		index.add(vectors)?;
		Ok(index)
	}

	/// Appends vectors; positions continue from the current length.
	pub fn add(&mut self, vectors: &[Vec<f32>]) -> Result<()> {
		if let Some(bad) = vectors.iter().find(|v| v.len() != self.dim) {
			return Err(anyhow!("vector dimension {} does not match index dimension {}", bad.len(), self.dim));
		}
		self.data.reserve(vectors.len() * self.dim);
		for v in vectors { self.data.extend_from_slice(v); }
		Ok(())
	}

	pub fn vectors(&self) -> impl Iterator<Item = &[f32]> { self.data.chunks_exact(self.dim.max(1)) }
}

impl VectorIndex for FlatIndex {
	fn dim(&self) -> usize { self.dim }

	fn len(&self) -> usize { if self.dim == 0 { 0 } else { self.data.len() / self.dim } }

	fn search(&self, query: &[f32], k: usize) -> Result<Vec<(usize, f32)>> {
		if query.len() != self.dim { return Err(anyhow!("query dimension {} does not match index dimension {}", query.len(), self.dim)); }
		let mut scored: Vec<(usize, f32)> = self.vectors()
			.enumerate()
			.map(|(i, v)| (i, v.iter().zip(query).map(|(a, b)| a * b).sum()))
			.collect();
		scored.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(Ordering::Equal));
		scored.truncate(k);
		Ok(scored)
	}
}
