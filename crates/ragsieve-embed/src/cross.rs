use anyhow::{Result, ensure};
use std::collections::HashSet;
use std::path::Path;

use candle_core::{DType, Device};
use candle_transformers::models::xlm_roberta::XLMRobertaForSequenceClassification;
use tokenizers::Tokenizer;
use tracing::info;

use ragsieve_core::traits::CrossEncoder;

use crate::device::select_device;
use crate::tokenize::tokenize_batch;
use crate::{load_config, load_tokenizer, load_var_builder};

/// BGE reranker: XLM-RoBERTa sequence classifier with a single relevance logit.
pub struct BgeCrossEncoder { model: XLMRobertaForSequenceClassification, tokenizer: Tokenizer, device: Device, max_len: usize, batch_size: usize }

impl BgeCrossEncoder {
    pub fn load(model_dir: &Path, max_len: usize) -> Result<Self> {
        let device = select_device();
        info!(dir = %model_dir.display(), "loading cross-encoder");
        let tokenizer = load_tokenizer(model_dir)?;
        let config = load_config(model_dir)?;
        let vb = load_var_builder(model_dir, &device)?;
        let model = XLMRobertaForSequenceClassification::new(1, &config, vb)?;
        Ok(Self { model, tokenizer, device, max_len, batch_size: 16 })
    }

    fn logits(&self, query: &str, passages: &[&str]) -> Result<Vec<f32>> {
        let pairs: Vec<(&str, &str)> = passages.iter().map(|p| (query, *p)).collect();
        let (input_ids, attention_mask) = tokenize_batch(&self.tokenizer, pairs, self.max_len, &self.device)?;
        let token_type_ids = input_ids.zeros_like()?;
        let logits = self.model.forward(&input_ids, &attention_mask, &token_type_ids)?;
        let rows: Vec<Vec<f32>> = logits.to_device(&Device::Cpu)?.to_dtype(DType::F32)?.to_vec2()?;
        ensure!(rows.len() == passages.len(), "cross-encoder returned {} rows for {} pairs", rows.len(), passages.len());
        Ok(rows.into_iter().map(|r| r.first().copied().unwrap_or(f32::NAN)).collect())
    }
}

impl CrossEncoder for BgeCrossEncoder {
    fn score(&self, query: &str, passage: &str) -> Result<f32> {
        Ok(self.logits(query, &[passage])?[0])
    }

    fn score_batch(&self, query: &str, passages: &[&str]) -> Result<Vec<f32>> {
        let mut out = Vec::with_capacity(passages.len());
        for batch in passages.chunks(self.batch_size) { out.extend(self.logits(query, batch)?); }
        Ok(out)
    }
}

/// Token-overlap stand-in for the neural reranker, used alongside
/// [`crate::HashEncoder`] when models are not installed. The logit maps the
/// fraction of query tokens found in the passage onto `[-4, 4]`.
pub struct OverlapCrossEncoder;

impl CrossEncoder for OverlapCrossEncoder {
    fn score(&self, query: &str, passage: &str) -> Result<f32> {
        let passage_tokens: HashSet<String> = passage.split_whitespace().map(str::to_lowercase).collect();
        let query_tokens: Vec<String> = query.split_whitespace().map(str::to_lowercase).collect();
        if query_tokens.is_empty() { return Ok(-4.0); }
        let hits = query_tokens.iter().filter(|t| passage_tokens.contains(*t)).count();
        Ok(8.0 * hits as f32 / query_tokens.len() as f32 - 4.0)
    }
}
