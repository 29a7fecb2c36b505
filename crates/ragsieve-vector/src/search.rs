//! Dense nearest-neighbour search over the persisted LanceDB table.
//!
//! Scores are inner products: the table is queried with dot distance and
//! `score = 1 - _distance`. The index owns a private current-thread runtime so
//! callers stay synchronous; do not call [`LanceIndex::search`] from inside
//! another tokio runtime.
use anyhow::{Result, anyhow};
use arrow_array::{Float32Array, Int64Array};
use futures::TryStreamExt;
use lancedb::query::{ExecutableQuery, QueryBase};
use lancedb::{DistanceType, Table};
use std::cmp::Ordering;
use std::path::Path;
use tokio::runtime::Runtime;

use ragsieve_core::traits::VectorIndex;

use crate::schema::{vector_dim, POSITION_COLUMN, VECTOR_TABLE};
use crate::table::{has_vector_table, open_db};

pub struct LanceIndex { runtime: Runtime, table: Table, dim: usize, len: usize }

impl LanceIndex {
	pub fn open(path: &Path) -> Result<Self> {
		let runtime = tokio::runtime::Builder::new_current_thread().enable_all().build()?;
		let uri = path.to_string_lossy().to_string();
		let (table, dim, len) = runtime.block_on(async {
			let conn = open_db(&uri).await?;
			if !has_vector_table(&conn).await? {
				return Err(anyhow!("{} has no '{}' table", uri, VECTOR_TABLE));
			}
			let table = conn.open_table(VECTOR_TABLE).execute().await?;
			let schema = table.schema().await?;
			let dim = vector_dim(&schema).ok_or_else(|| anyhow!("'{}' table has no fixed-size vector column", VECTOR_TABLE))?;
			let len = table.count_rows(None).await?;
			Ok::<_, anyhow::Error>((table, dim, len))
		})?;
		Ok(Self { runtime, table, dim, len })
	}
}

impl VectorIndex for LanceIndex {
	fn dim(&self) -> usize { self.dim }

	fn len(&self) -> usize { self.len }

	fn search(&self, query: &[f32], k: usize) -> Result<Vec<(usize, f32)>> {
		if query.len() != self.dim { return Err(anyhow!("query dimension {} does not match index dimension {}", query.len(), self.dim)); }
		if k == 0 || self.len == 0 { return Ok(Vec::new()); }
		self.runtime.block_on(async {
			let mut stream = self.table.vector_search(query.to_vec())?.distance_type(DistanceType::Dot).limit(k).execute().await?;
			let mut hits = Vec::with_capacity(k);
			while let Some(batch) = stream.try_next().await? {
				let positions = batch.column_by_name(POSITION_COLUMN).and_then(|c| c.as_any().downcast_ref::<Int64Array>()).ok_or_else(|| anyhow!("position column missing from search results"))?;
				let distances = batch.column_by_name("_distance").and_then(|c| c.as_any().downcast_ref::<Float32Array>()).ok_or_else(|| anyhow!("_distance column missing from search results"))?;
				for i in 0..batch.num_rows() {
					hits.push((positions.value(i) as usize, 1.0 - distances.value(i)));
				}
			}
			hits.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(Ordering::Equal));
			hits.truncate(k);
			Ok::<_, anyhow::Error>(hits)
		})
	}
}
