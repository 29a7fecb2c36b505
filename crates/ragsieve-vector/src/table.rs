//! LanceDB connection and write helpers for the dense index.
use anyhow::{Result, ensure};
use arrow_array::types::Float32Type;
use arrow_array::{FixedSizeListArray, Int64Array, RecordBatch, RecordBatchIterator};
use lancedb::{connect, Connection};
use std::sync::Arc;

use crate::schema::{build_vector_schema, VECTOR_TABLE};

const WRITE_BATCH: usize = 1000;

pub async fn open_db(uri: &str) -> Result<Connection> {
	Ok(connect(uri).execute().await?)
}

pub async fn has_vector_table(conn: &Connection) -> Result<bool> {
	let names = conn.table_names().execute().await?;
	Ok(names.iter().any(|n| n == VECTOR_TABLE))
}

pub fn vectors_to_record_batch(offset: usize, vectors: &[Vec<f32>], dim: usize) -> Result<RecordBatch> {
	ensure!(vectors.iter().all(|v| v.len() == dim), "every vector must have dimension {dim}");
	let positions: Vec<i64> = (offset..offset + vectors.len()).map(|p| p as i64).collect();
	let values = vectors.iter().map(|v| Some(v.iter().copied().map(Some).collect::<Vec<_>>()));
	let batch = RecordBatch::try_new(build_vector_schema(dim), vec![
		Arc::new(Int64Array::from(positions)),
		Arc::new(FixedSizeListArray::from_iter_primitive::<Float32Type, _, _>(values, dim as i32)),
	])?;
	Ok(batch)
}

/// Creates the vector table from scratch. Row `i` stores `vectors[i]` at position `i`.
pub async fn create_vector_table(conn: &Connection, vectors: &[Vec<f32>], dim: usize) -> Result<()> {
	let mut batches = Vec::with_capacity(vectors.len().div_ceil(WRITE_BATCH));
	for (i, slice) in vectors.chunks(WRITE_BATCH).enumerate() {
		batches.push(vectors_to_record_batch(i * WRITE_BATCH, slice, dim)?);
	}
	let reader = Box::new(RecordBatchIterator::new(batches.into_iter().map(Ok), build_vector_schema(dim)));
	conn.create_table(VECTOR_TABLE, reader).execute().await?;
	Ok(())
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn record_batch_carries_offset_positions() {
		let batch = vectors_to_record_batch(5, &[vec![1.0, 0.0], vec![0.0, 1.0]], 2).unwrap();
		assert_eq!(batch.num_rows(), 2);
		let positions = batch.column(0).as_any().downcast_ref::<Int64Array>().unwrap();
		assert_eq!(positions.value(0), 5);
		assert_eq!(positions.value(1), 6);
	}

	#[test]
	fn wrong_width_is_rejected() {
		assert!(vectors_to_record_batch(0, &[vec![1.0, 0.0, 0.0]], 2).is_err());
	}
}
