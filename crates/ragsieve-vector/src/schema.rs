use arrow_schema::{DataType, Field, Schema};
use std::sync::Arc;

/// Table holding one row per corpus position.
pub const VECTOR_TABLE: &str = "vectors";
pub const POSITION_COLUMN: &str = "position";
pub const VECTOR_COLUMN: &str = "vector";

pub fn build_vector_schema(dim: usize) -> Arc<Schema> {
	Arc::new(Schema::new(vec![
		Field::new(POSITION_COLUMN, DataType::Int64, false),
		Field::new(VECTOR_COLUMN, DataType::FixedSizeList(Arc::new(Field::new("item", DataType::Float32, true)), dim as i32), true),
	]))
}

/// Embedding width recorded in a stored schema.
pub fn vector_dim(schema: &Schema) -> Option<usize> {
	match schema.field_with_name(VECTOR_COLUMN).ok()?.data_type() {
		DataType::FixedSizeList(_, size) if *size > 0 => Some(*size as usize),
		_ => None,
	}
}
