use std::{env, fs, path::PathBuf};

use indicatif::{ProgressBar, ProgressStyle};
use tracing_subscriber::EnvFilter;

use ragsieve_core::config::Config;
use ragsieve_core::traits::EncodeMode;
use ragsieve_embed::ModelRegistry;
use ragsieve_vector::corpus_file::parse_corpus;
use ragsieve_vector::{scope_paths, CorpusStore};

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt().with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))).init();
    let config = Config::load().map_err(|e| { eprintln!("Error loading config: {}", e); e })?;
    let settings = config.settings()?;

    let args: Vec<String> = env::args().skip(1).collect();
    let mut positional = Vec::new(); let mut batch_size = 32usize;
    let mut i = 0; while i < args.len() { match args[i].as_str() {
        "--batch" => { match args.get(i + 1).and_then(|v| v.parse::<usize>().ok()).filter(|b| *b > 0) { Some(b) => { batch_size = b; i += 1; } None => { eprintln!("Error: --batch requires a positive number"); std::process::exit(1); } } }
        a if !a.starts_with('-') => positional.push(a.to_string()), _ => {} } i += 1; }
    let (Some(chunks_path), Some(scope)) = (positional.first().map(PathBuf::from), positional.get(1)) else {
        eprintln!("Usage: ragsieve-indexer <chunks.json> <scope> [--batch N]");
        std::process::exit(1);
    };

    let (chunks, _) = parse_corpus(&fs::read_to_string(&chunks_path)?)?;
    if chunks.is_empty() { anyhow::bail!("{} contains no chunks", chunks_path.display()); }
    let paths = scope_paths(&settings.index_dir(), scope)?;
    println!("ragsieve indexer\n================");
    println!("Chunks: {} from {}", chunks.len(), chunks_path.display());
    println!("Scope: {} -> {}", scope, paths.index.display());

    let registry = ModelRegistry::from_settings(&settings);
    let encoder = registry.encoder()?;
    let mut store = CorpusStore::new(encoder.dim());
    let pb = ProgressBar::new(chunks.len() as u64);
    pb.set_style(ProgressStyle::default_bar().template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} chunks ({percent}%) {msg}")?.progress_chars("#>-"));
    for batch in chunks.chunks(batch_size) {
        let texts: Vec<String> = batch.iter().map(|c| c.text.clone()).collect();
        let vectors = encoder.encode(&texts, EncodeMode::Passage)?;
        store.add(&vectors, batch.to_vec())?;
        pb.inc(batch.len() as u64);
    }
    pb.finish_with_message("encoded");

    store.save(&paths.index, &paths.meta)?;
    println!("\nIndexed {} chunks (dim {}) into scope '{}'", store.len(), store.dim(), scope);
    println!("Meta: {}", paths.meta.display());
    Ok(())
}
