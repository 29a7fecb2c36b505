//! Lazily-initialized holder for the heavy model capabilities.
//!
//! The application constructs one registry at startup and injects the
//! resulting `Arc`s everywhere. Each model is loaded at most once; a failed
//! load is not cached, so the next call retries.

use anyhow::Result;
use once_cell::sync::OnceCell;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

use ragsieve_core::config::{expand_path, Settings};
use ragsieve_core::traits::{CrossEncoder, Encoder};

use crate::{resolve_model_dir, BgeCrossEncoder, E5Encoder, HashEncoder, OverlapCrossEncoder};

pub const DEFAULT_ENCODER: &str = "multilingual-e5-base";
pub const DEFAULT_RERANKER: &str = "bge-reranker-base";

pub struct ModelRegistry {
    use_fake: bool,
    fake_dim: usize,
    max_len: usize,
    encoder_dir: Option<PathBuf>,
    reranker_dir: Option<PathBuf>,
    encoder: OnceCell<Arc<dyn Encoder>>,
    cross_encoder: OnceCell<Arc<dyn CrossEncoder>>,
}

impl ModelRegistry {
    /// `APP_USE_FAKE_EMBEDDINGS=1` forces the hash encoder regardless of settings.
    pub fn from_settings(settings: &Settings) -> Self {
        let env_fake = std::env::var("APP_USE_FAKE_EMBEDDINGS").ok().map(|v| v == "1" || v.eq_ignore_ascii_case("true")).unwrap_or(false);
        Self {
            use_fake: settings.models.use_fake_embeddings || env_fake,
            fake_dim: settings.models.fake_dim,
            max_len: settings.models.max_len,
            encoder_dir: settings.paths.encoder_model_dir.as_deref().map(expand_path),
            reranker_dir: settings.paths.reranker_model_dir.as_deref().map(expand_path),
            encoder: OnceCell::new(),
            cross_encoder: OnceCell::new(),
        }
    }

    pub fn uses_fake_models(&self) -> bool { self.use_fake }

    pub fn encoder(&self) -> Result<Arc<dyn Encoder>> {
        self.encoder
            .get_or_try_init(|| -> Result<Arc<dyn Encoder>> {
                if self.use_fake {
                    info!(dim = self.fake_dim, "using HashEncoder");
                    return Ok(Arc::new(HashEncoder::new(self.fake_dim)));
                }
                let dir = resolve_model_dir(self.encoder_dir.as_deref(), DEFAULT_ENCODER)?;
                Ok(Arc::new(E5Encoder::load(&dir, self.max_len)?))
            })
            .cloned()
    }

    pub fn cross_encoder(&self) -> Result<Arc<dyn CrossEncoder>> {
        self.cross_encoder
            .get_or_try_init(|| -> Result<Arc<dyn CrossEncoder>> {
                if self.use_fake {
                    info!("using OverlapCrossEncoder");
                    return Ok(Arc::new(OverlapCrossEncoder));
                }
                let dir = resolve_model_dir(self.reranker_dir.as_deref(), DEFAULT_RERANKER)?;
                Ok(Arc::new(BgeCrossEncoder::load(&dir, self.max_len)?))
            })
            .cloned()
    }

    /// Loads models ahead of the first query.
    pub fn warmup(&self, with_reranker: bool) -> Result<()> {
        self.encoder()?;
        if with_reranker { self.cross_encoder()?; }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ragsieve_core::traits::EncodeMode;

    fn fake_registry() -> ModelRegistry {
        let mut settings = Settings::default();
        settings.models.use_fake_embeddings = true;
        settings.models.fake_dim = 32;
        ModelRegistry::from_settings(&settings)
    }

    #[test]
    fn encoder_is_constructed_once() {
        let registry = fake_registry();
        let a = registry.encoder().unwrap();
        let b = registry.encoder().unwrap();
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(a.dim(), 32);
        assert_eq!(a.encode(&["x".to_string()], EncodeMode::Query).unwrap()[0].len(), 32);
    }

    #[test]
    fn missing_model_dir_is_an_error_and_not_cached() {
        let mut settings = Settings::default();
        settings.paths.encoder_model_dir = Some("/nonexistent/ragsieve/e5".into());
        let registry = ModelRegistry { use_fake: false, ..ModelRegistry::from_settings(&settings) };
        assert!(registry.encoder().is_err());
        assert!(registry.encoder.get().is_none());
    }
}
