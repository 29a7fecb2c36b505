use ragsieve_core::config::Config;
use ragsieve_core::traits::EncodeMode;
use ragsieve_embed::ModelRegistry;

fn main() -> anyhow::Result<()> {
    let settings = Config::load()?.settings()?;
    let registry = ModelRegistry::from_settings(&settings);
    let encoder = registry.encoder()?;
    let texts = vec!["hello world".to_string(), "rust embeddings".to_string()];
    let embs = encoder.encode(&texts, EncodeMode::Passage)?;
    println!("B={} dim={}", embs.len(), encoder.dim());
    Ok(())
}
