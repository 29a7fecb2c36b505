use anyhow::{Result, anyhow};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Instant;

use candle_core::{DType, Device, Tensor};
use candle_nn::VarBuilder;
use candle_transformers::models::xlm_roberta::{Config as XLMRobertaConfig, XLMRobertaModel};
use tokenizers::Tokenizer;
use tracing::{info, warn};

use ragsieve_core::traits::{EncodeMode, Encoder};

pub mod cross;
pub mod device;
pub mod pool;
pub mod registry;
pub mod tokenize;

pub use cross::{BgeCrossEncoder, OverlapCrossEncoder};
pub use pool::masked_mean_l2;
pub use registry::ModelRegistry;

use crate::device::select_device;
use crate::tokenize::tokenize_batch;

/// Multilingual E5 sentence encoder (XLM-RoBERTa backbone).
///
/// Texts are prefixed with `query: ` or `passage: `, mean-pooled over the
/// attention mask and L2-normalized.
pub struct E5Encoder { model: XLMRobertaModel, tokenizer: Tokenizer, device: Device, dim: usize, max_len: usize, batch_size: usize }

impl E5Encoder {
    pub fn load(model_dir: &Path, max_len: usize) -> Result<Self> {
        let device = select_device();
        info!(dir = %model_dir.display(), "loading E5 encoder");
        let tokenizer = load_tokenizer(model_dir)?;
        let config: XLMRobertaConfig = load_config(model_dir)?;
        let vb = load_var_builder(model_dir, &device)?;
        let model = XLMRobertaModel::new(&config, vb)?;
        let dim = config.hidden_size;
        info!(dim, "E5 encoder loaded");
        Ok(Self { model, tokenizer, device, dim, max_len, batch_size: 32 })
    }

    fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let start = Instant::now();
        let inputs: Vec<&str> = texts.iter().map(String::as_str).collect();
        let (input_ids, attention_mask) = tokenize_batch(&self.tokenizer, inputs, self.max_len, &self.device)?;
        let token_type_ids = input_ids.zeros_like()?;
        let hidden = self.model.forward(&input_ids, &attention_mask, &token_type_ids, None, None, None)?;
        let pooled = masked_mean_l2(&hidden, &attention_mask)?;
        let out: Vec<Vec<f32>> = pooled.to_device(&Device::Cpu)?.to_dtype(DType::F32)?.to_vec2()?;
        if start.elapsed().as_millis() > 500 { warn!(batch = texts.len(), ms = start.elapsed().as_millis() as u64, "slow embedding batch"); }
        Ok(out)
    }
}

impl Encoder for E5Encoder {
    fn dim(&self) -> usize { self.dim }

    fn encode(&self, texts: &[String], mode: EncodeMode) -> Result<Vec<Vec<f32>>> {
        let prefixed: Vec<String> = texts.iter().map(|t| format!("{}{}", mode.prefix(), t)).collect();
        let mut out = Vec::with_capacity(prefixed.len());
        for batch in prefixed.chunks(self.batch_size) { out.extend(self.embed_batch(batch)?); }
        Ok(out)
    }
}

/// Deterministic hashed bag-of-words encoder for tests and development.
/// Symmetric: the encode mode is ignored.
pub struct HashEncoder { dim: usize }

impl HashEncoder {
    pub fn new(dim: usize) -> Self { Self { dim } }

    fn embed_one(&self, text: &str) -> Vec<f32> {
        use std::hash::{Hash, Hasher}; use twox_hash::XxHash64;
        let mut v = vec![0f32; self.dim];
        for token in text.split_whitespace() {
            let mut hasher = XxHash64::with_seed(0);
            token.to_lowercase().hash(&mut hasher);
            let h = hasher.finish();
            let idx = (h % self.dim as u64) as usize;
            v[idx] += 0.5 + ((h >> 32) as u32 as f32) / (u32::MAX as f32);
        }
        let norm = (v.iter().map(|x| x * x).sum::<f32>()).sqrt().max(1e-6);
        for x in &mut v { *x /= norm; }
        v
    }
}

impl Encoder for HashEncoder {
    fn dim(&self) -> usize { self.dim }

    fn encode(&self, texts: &[String], _mode: EncodeMode) -> Result<Vec<Vec<f32>>> {
        Ok(texts.iter().map(|t| self.embed_one(t)).collect())
    }
}

pub(crate) fn load_tokenizer(model_dir: &Path) -> Result<Tokenizer> {
    let tokenizer_path = model_dir.join("tokenizer.json");
    Tokenizer::from_file(&tokenizer_path)
        .map_err(|e| anyhow!("Failed to load tokenizer from {}: {}", tokenizer_path.display(), e))
}

pub(crate) fn load_config(model_dir: &Path) -> Result<XLMRobertaConfig> {
    let config_path = model_dir.join("config.json");
    Ok(serde_json::from_str(&std::fs::read_to_string(&config_path)?)?)
}

/// Prefers `model.safetensors`, falling back to `pytorch_model.bin`.
pub(crate) fn load_var_builder(model_dir: &Path, device: &Device) -> Result<VarBuilder<'static>> {
    let safetensors = model_dir.join("model.safetensors");
    let tensors: HashMap<String, Tensor> = if safetensors.exists() {
        candle_core::safetensors::load(&safetensors, device)?
    } else {
        let weights_path = model_dir.join("pytorch_model.bin");
        candle_core::pickle::read_all(&weights_path)?.into_iter().collect()
    };
    Ok(VarBuilder::from_tensors(tensors, DType::F32, device))
}

/// Locates a model directory: the configured path first, then `../models/<name>`
/// and `models/<name>` relative to the working directory.
pub fn resolve_model_dir(configured: Option<&Path>, name: &str) -> Result<PathBuf> {
    if let Some(p) = configured {
        if p.exists() { return Ok(p.to_path_buf()); }
        return Err(anyhow!("Configured model directory {} does not exist", p.display()));
    }
    for candidate in [Path::new("../models").join(name), Path::new("models").join(name)] {
        if candidate.exists() { info!(dir = %candidate.display(), "using model dir"); return Ok(candidate); }
    }
    Err(anyhow!("Could not locate model directory for {}", name))
}
