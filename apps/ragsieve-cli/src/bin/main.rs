use std::env;
use std::sync::Arc;

use tracing::warn;
use tracing_subscriber::EnvFilter;

use ragsieve_core::config::{Config, Settings};
use ragsieve_embed::ModelRegistry;
use ragsieve_hybrid::{build_prompt, ContextOutcome, Reranker, RetrievalOrchestrator, StoreScopeLoader, INSUFFICIENT_CONTEXT};
use ragsieve_vector::{scope_paths, validate_store};

struct Args { cmd: String, scope: String, query: Option<String>, rerank: bool, prompt: bool, allow: Option<Vec<String>> }

fn usage(prog: &str) -> ! {
    eprintln!("Usage: {} <retrieve|context|validate> <scope> [query] [--rerank] [--prompt] [--allow id1,id2]", prog);
    std::process::exit(1)
}

fn parse_args() -> Args {
    let mut args: Vec<String> = env::args().collect();
    let prog = args.remove(0);
    if args.len() < 2 { usage(&prog); }
    let cmd = args.remove(0); let scope = args.remove(0);
    let mut query = None; let mut rerank = false; let mut prompt = false; let mut allow = None;
    let mut i = 0; while i < args.len() { match args[i].as_str() {
        "--rerank" => rerank = true,
        "--prompt" => prompt = true,
        "--allow" => { match args.get(i + 1) { Some(ids) => { allow = Some(ids.split(',').map(str::trim).filter(|s| !s.is_empty()).map(str::to_string).collect()); i += 1; } None => usage(&prog) } }
        a if !a.starts_with('-') && query.is_none() => query = Some(a.to_string()),
        _ => {} } i += 1; }
    Args { cmd, scope, query, rerank, prompt, allow }
}

fn orchestrator(settings: &Settings, with_reranker: bool) -> anyhow::Result<RetrievalOrchestrator> {
    let registry = Arc::new(ModelRegistry::from_settings(settings));
    registry.warmup(false)?;
    let loader = Arc::new(StoreScopeLoader::new(settings.index_dir(), registry.clone()));
    let mut orch = RetrievalOrchestrator::new(loader, settings.clone())?;
    if with_reranker {
        match registry.cross_encoder() {
            Ok(model) => orch = orch.with_reranker(Reranker::new(model)),
            Err(e) => warn!(error = %e, "reranker unavailable, continuing without it"),
        }
    }
    Ok(orch)
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt().with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))).init();
    let config = Config::load().map_err(|e| { eprintln!("Error loading config: {}", e); e })?;
    let settings = config.settings()?;
    let args = parse_args();
    let require_query = || args.query.clone().unwrap_or_else(|| { eprintln!("Error: '{}' needs a query", args.cmd); std::process::exit(1) });

    match args.cmd.as_str() {
        "retrieve" => {
            let query = require_query();
            let orch = orchestrator(&settings, false)?;
            let result = orch.retriever(&args.scope)?.retrieve(&query, &settings.retrieval);
            println!("Query: {}", query);
            println!("Relevant: {} (dense {}, lexical {}, lexical top1 {:.3})", result.is_relevant, result.dense_kept, result.lexical_kept, result.lexical_top1);
            for (i, c) in result.chunks.iter().enumerate() {
                println!("\n  {}. [{:?}] score={:.4}  id={}  source={}", i + 1, c.source, c.score, c.chunk.display_id(), c.chunk.metadata.source.as_deref().unwrap_or("unknown"));
                println!("     {}", c.chunk.text);
            }
        }
        "context" => {
            let query = require_query();
            let orch = orchestrator(&settings, args.rerank)?;
            match orch.prepare_context(&query, &args.scope, args.rerank, args.allow.as_deref())? {
                ContextOutcome::Insufficient => println!("{}", INSUFFICIENT_CONTEXT),
                ContextOutcome::Ready { blocks, reranked, .. } => {
                    if args.prompt {
                        println!("{}", build_prompt(&query, &blocks));
                    } else {
                        println!("{} context blocks{}\n", blocks.len(), if reranked { " (reranked)" } else { "" });
                        for block in &blocks { println!("{}\n", block); }
                    }
                }
            }
        }
        "validate" => {
            let paths = scope_paths(&settings.index_dir(), &args.scope)?;
            let report = validate_store(&paths);
            println!("{}", serde_json::to_string_pretty(&report)?);
            if !report.is_ready { std::process::exit(2); }
        }
        other => {
            eprintln!("Unknown command '{}'. Expected retrieve, context or validate.", other);
            std::process::exit(1);
        }
    }
    Ok(())
}
