//! Lightweight configuration loader and path helpers.
//!
//! Uses Figment to merge serialized defaults + `config.toml` + `config.<env>.toml`
//! + `APP_*` env vars (nested keys separated by `__`, e.g.
//! `APP_RETRIEVAL__BM25_ABSOLUTE_FLOOR=2.5`).
use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

pub struct Config {
    figment: Figment,
}

impl Config {
    pub fn load() -> anyhow::Result<Self> {
        let env_name = env::var("RUST_ENV").unwrap_or_else(|_| "dev".to_string());

        let mut figment = Figment::from(Serialized::defaults(Settings::default())).merge(Toml::file("config.toml"));
        match env_name.as_str() {
            "dev" | "development" => figment = figment.merge(Toml::file("config.dev.toml")),
            "prod" | "production" => figment = figment.merge(Toml::file("config.prod.toml")),
            "test" | "testing" => figment = figment.merge(Toml::file("config.test.toml")),
            _ => {}
        }
        figment = figment.merge(Env::prefixed("APP_").split("__"));

        let config = Self { figment };
        config.settings()?;
        Ok(config)
    }

    pub fn get<T>(&self, key: &str) -> anyhow::Result<T>
    where
        T: serde::de::DeserializeOwned,
    {
        self.figment
            .extract_inner(key)
            .map_err(|e| anyhow::anyhow!("Failed to get '{}': {}", key, e))
    }

    /// Typed, validated view of the merged configuration.
    pub fn settings(&self) -> anyhow::Result<Settings> {
        let settings: Settings = self
            .figment
            .extract()
            .map_err(|e| anyhow::anyhow!("Failed to extract settings: {}", e))?;
        settings.validate()?;
        Ok(settings)
    }
}

/// Thresholds and fan-out of one hybrid retrieval.
///
/// `bm25_absolute_floor` is tied to the scale of the lexical scorer and the
/// tokenizer; calibrate it per corpus family rather than trusting the default.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrievalParams {
    pub k_semantic: usize,
    pub k_keyword: usize,
    pub semantic_threshold: f32,
    pub bm25_dynamic_ratio: f32,
    pub bm25_absolute_floor: f32,
    pub min_results: usize,
}

impl Default for RetrievalParams {
    fn default() -> Self {
        Self {
            k_semantic: 10,
            k_keyword: 10,
            semantic_threshold: 0.3,
            bm25_dynamic_ratio: 0.3,
            bm25_absolute_floor: 1.0,
            min_results: 1,
        }
    }
}

impl RetrievalParams {
    pub fn validate(&self) -> Result<()> {
        if self.k_semantic == 0 || self.k_keyword == 0 {
            return Err(Error::Configuration("k_semantic and k_keyword must be positive".into()));
        }
        check_unit("semantic_threshold", self.semantic_threshold)?;
        check_unit("bm25_dynamic_ratio", self.bm25_dynamic_ratio)?;
        if !self.bm25_absolute_floor.is_finite() || self.bm25_absolute_floor < 0.0 {
            return Err(Error::Configuration(format!("bm25_absolute_floor must be a non-negative number, got {}", self.bm25_absolute_floor)));
        }
        if self.min_results == 0 {
            return Err(Error::Configuration("min_results must be at least 1".into()));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RerankParams {
    pub enabled: bool,
    pub top_n: usize,
    pub score_threshold: Option<f32>,
}

impl Default for RerankParams {
    fn default() -> Self {
        Self { enabled: true, top_n: 3, score_threshold: Some(0.5) }
    }
}

impl RerankParams {
    pub fn validate(&self) -> Result<()> {
        if self.top_n == 0 {
            return Err(Error::Configuration("rerank.top_n must be at least 1".into()));
        }
        if let Some(t) = self.score_threshold {
            check_unit("rerank.score_threshold", t)?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PathSettings {
    pub index_dir: String,
    pub encoder_model_dir: Option<String>,
    pub reranker_model_dir: Option<String>,
}

impl Default for PathSettings {
    fn default() -> Self {
        Self { index_dir: "indexes".to_string(), encoder_model_dir: None, reranker_model_dir: None }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelSettings {
    pub use_fake_embeddings: bool,
    pub fake_dim: usize,
    pub max_len: usize,
}

impl Default for ModelSettings {
    fn default() -> Self {
        Self { use_fake_embeddings: false, fake_dim: 768, max_len: 512 }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub retrieval: RetrievalParams,
    pub rerank: RerankParams,
    pub paths: PathSettings,
    pub models: ModelSettings,
}

impl Settings {
    pub fn validate(&self) -> Result<()> {
        self.retrieval.validate()?;
        self.rerank.validate()?;
        if self.models.fake_dim == 0 || self.models.max_len == 0 {
            return Err(Error::Configuration("models.fake_dim and models.max_len must be positive".into()));
        }
        Ok(())
    }

    pub fn index_dir(&self) -> PathBuf {
        expand_path(&self.paths.index_dir)
    }
}

fn check_unit(name: &str, value: f32) -> Result<()> {
    if (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(Error::Configuration(format!("{} must be within [0, 1], got {}", name, value)))
    }
}

/// Expand a user-provided path string:
/// - Expands leading '~' to the user's home directory
/// - Expands ${VAR} and $VAR environment variables
/// - Returns a PathBuf without attempting to canonicalize
pub fn expand_path<S: AsRef<str>>(input: S) -> PathBuf {
    let s = input.as_ref();
    let expanded_env = shellexpand::env(s).unwrap_or(std::borrow::Cow::Borrowed(s));
    let expanded = shellexpand::tilde(&expanded_env);
    PathBuf::from(expanded.as_ref())
}

/// Resolve a possibly relative path against a given base directory after expansion.
/// If `p` is absolute, it's returned as-is; otherwise `base.join(p)` is returned.
pub fn resolve_with_base<S: AsRef<str>>(base: &Path, p: S) -> PathBuf {
    let p = expand_path(p);
    if p.is_absolute() { p } else { base.join(p) }
}
