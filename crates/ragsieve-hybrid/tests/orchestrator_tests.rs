mod common;

use std::sync::atomic::Ordering;
use std::sync::Arc;

use common::{axis, chunk, EchoGenerator, FailingCrossEncoder, FixtureLoader, TableCrossEncoder, TableEncoder};
use ragsieve_core::config::Settings;
use ragsieve_core::error::Error;
use ragsieve_core::traits::{EncodeMode, Encoder};
use ragsieve_embed::{HashEncoder, ModelRegistry};
use ragsieve_hybrid::{ContextOutcome, RebuildOutcome, Reranker, RetrievalOrchestrator, StoreScopeLoader, INSUFFICIENT_CONTEXT};
use ragsieve_vector::{scope_paths, CorpusStore};

const QUESTION: &str = "How is ATP made?";
const C0: &str = "Mitochondria produce ATP through respiration.";
const C1: &str = "ATP stores chemical energy for the cell.";
const C2: &str = "Glycolysis yields a small amount of ATP.";

fn loader() -> Arc<FixtureLoader> {
    let chunks = vec![
        chunk("c0", "doc-a", C0),
        chunk("c1", "doc-a", C1),
        chunk("c2", "doc-b", C2),
        chunk("c3", "doc-b", "Chloroplasts perform photosynthesis."),
        chunk("c4", "doc-c", "Ribosomes build proteins."),
    ];
    let vectors = vec![axis(4, 0), vec![0.8, 0.6, 0.0, 0.0], vec![0.6, 0.8, 0.0, 0.0], axis(4, 2), axis(4, 3)];
    let encoder = Arc::new(TableEncoder::new(vec![0.0; 4]).with(QUESTION, axis(4, 0)));
    Arc::new(FixtureLoader::new(chunks, vectors, encoder))
}

fn orchestrator(loader: Arc<FixtureLoader>, top_n: usize) -> RetrievalOrchestrator {
    let mut settings = Settings::default();
    settings.rerank.top_n = top_n;
    RetrievalOrchestrator::new(loader, settings).unwrap()
}

fn ids(outcome: &ContextOutcome) -> Vec<String> {
    match outcome {
        ContextOutcome::Ready { chunks, .. } => chunks.iter().map(|c| c.display_id()).collect(),
        ContextOutcome::Insufficient => Vec::new(),
    }
}

#[test]
fn unanswerable_question_short_circuits() {
    let orch = orchestrator(loader(), 2);
    assert_eq!(orch.prepare_context("Unrelated question", "bio", true, None).unwrap(), ContextOutcome::Insufficient);
    // No generator is configured, so reaching it would be an error.
    assert_eq!(orch.answer("Unrelated question", "bio", false, true, None).unwrap().into_text(), INSUFFICIENT_CONTEXT);
    let streamed: Vec<String> = match orch.answer("Unrelated question", "bio", true, true, None).unwrap() {
        ragsieve_hybrid::Answer::Stream(s) => s.collect(),
        ragsieve_hybrid::Answer::Text(_) => panic!("expected a stream"),
    };
    assert_eq!(streamed, vec![INSUFFICIENT_CONTEXT.to_string()]);
}

#[test]
fn allow_list_filters_by_source_document() {
    let orch = orchestrator(loader(), 2);
    let allowed = vec!["doc-b".to_string()];
    let outcome = orch.prepare_context(QUESTION, "bio", true, Some(&allowed)).unwrap();
    assert_eq!(ids(&outcome), vec!["c2"]);

    let nothing = vec!["doc-z".to_string()];
    assert_eq!(orch.prepare_context(QUESTION, "bio", true, Some(&nothing)).unwrap(), ContextOutcome::Insufficient);
}

#[test]
fn reranker_reorders_and_trims() {
    let model = Arc::new(TableCrossEncoder::default().with(C1, 3.0).with(C2, 1.0).with(C0, -5.0));
    let orch = orchestrator(loader(), 2).with_reranker(Reranker::new(model.clone()));
    let outcome = orch.prepare_context(QUESTION, "bio", true, None).unwrap();
    assert_eq!(ids(&outcome), vec!["c1", "c2"]);
    assert!(matches!(outcome, ContextOutcome::Ready { reranked: true, .. }));
    assert_eq!(model.calls(), 3);
}

#[test]
fn rerank_is_skipped_when_few_candidates_or_not_requested() {
    let model = Arc::new(TableCrossEncoder::default());
    let orch = orchestrator(loader(), 3).with_reranker(Reranker::new(model.clone()));
    assert_eq!(ids(&orch.prepare_context(QUESTION, "bio", true, None).unwrap()), vec!["c0", "c1", "c2"]);

    let orch = orchestrator(loader(), 2).with_reranker(Reranker::new(model.clone()));
    assert_eq!(ids(&orch.prepare_context(QUESTION, "bio", false, None).unwrap()), vec!["c0", "c1", "c2"]);
    assert_eq!(model.calls(), 0);
}

#[test]
fn rerank_failure_falls_back_to_fused_order() {
    let orch = orchestrator(loader(), 2).with_reranker(Reranker::new(Arc::new(FailingCrossEncoder)));
    let outcome = orch.prepare_context(QUESTION, "bio", true, None).unwrap();
    assert_eq!(ids(&outcome), vec!["c0", "c1", "c2"]);
    assert!(matches!(outcome, ContextOutcome::Ready { reranked: false, .. }));
}

#[test]
fn empty_rerank_means_insufficient_context() {
    let orch = orchestrator(loader(), 2).with_reranker(Reranker::new(Arc::new(TableCrossEncoder::default())));
    assert_eq!(orch.prepare_context(QUESTION, "bio", true, None).unwrap(), ContextOutcome::Insufficient);
}

#[test]
fn answer_sends_labeled_context_to_the_generator() {
    let orch = orchestrator(loader(), 3).with_generator(Arc::new(EchoGenerator));
    let text = orch.answer(QUESTION, "bio", false, false, None).unwrap().into_text();
    assert!(text.contains("[1] Source: doc-a.pdf, chunk c0\nMitochondria produce ATP through respiration."));
    assert!(text.contains("\n\n---\n[2] Source: doc-a.pdf, chunk c1"));
    assert!(text.contains(QUESTION));
    assert_eq!(orch.answer(QUESTION, "bio", true, false, None).unwrap().into_text(), text);
}

#[test]
fn missing_generator_is_a_configuration_error() {
    let orch = orchestrator(loader(), 3);
    assert!(matches!(orch.answer(QUESTION, "bio", false, false, None), Err(Error::Configuration(_))));
}

#[test]
fn retrievers_are_cached_per_scope() {
    let loader = loader();
    let orch = orchestrator(loader.clone(), 3);
    orch.prepare_context(QUESTION, "bio", false, None).unwrap();
    orch.prepare_context(QUESTION, "bio", false, None).unwrap();
    assert_eq!(loader.loads.load(Ordering::SeqCst), 1);
    orch.prepare_context(QUESTION, "chem", false, None).unwrap();
    assert_eq!(loader.loads.load(Ordering::SeqCst), 2);

    assert!(matches!(orch.refresh_scope("bio").unwrap(), RebuildOutcome::Rebuilt(_)));
    assert_eq!(loader.loads.load(Ordering::SeqCst), 3);
    orch.activate_scope("chem").unwrap();
    assert!(!orch.evict_scope("bio"));
    assert!(orch.evict_scope("chem"));
}

#[test]
fn store_loader_serves_a_saved_scope() {
    let dir = tempfile::tempdir().unwrap();
    let texts = vec![
        "mitochondria produces atp in the cell".to_string(),
        "chloroplasts capture light".to_string(),
        "ribosomes build proteins".to_string(),
    ];
    let encoder = HashEncoder::new(16);
    let vectors = encoder.encode(&texts, EncodeMode::Passage).unwrap();
    let mut store = CorpusStore::new(16);
    store.add(&vectors, texts.iter().enumerate().map(|(i, t)| chunk(&format!("s{i}"), "bio-book", t)).collect()).unwrap();
    let paths = scope_paths(dir.path(), "bio").unwrap();
    store.save(&paths.index, &paths.meta).unwrap();

    let mut settings = Settings::default();
    settings.models.use_fake_embeddings = true;
    settings.models.fake_dim = 16;
    let registry = Arc::new(ModelRegistry::from_settings(&settings));
    let loader = Arc::new(StoreScopeLoader::new(dir.path().to_path_buf(), registry));
    let orch = RetrievalOrchestrator::new(loader, settings).unwrap();

    let outcome = orch.prepare_context("mitochondria produces atp in the cell", "bio", false, None).unwrap();
    assert_eq!(ids(&outcome).first().map(String::as_str), Some("s0"));
    assert!(matches!(orch.prepare_context("anything", "missing", false, None), Err(Error::NotFound(_))));
}

#[test]
fn invalid_settings_are_rejected_at_construction() {
    let mut settings = Settings::default();
    settings.rerank.top_n = 0;
    assert!(matches!(RetrievalOrchestrator::new(loader(), settings), Err(Error::Configuration(_))));

    let mut settings = Settings::default();
    settings.retrieval.min_results = 0;
    assert!(matches!(RetrievalOrchestrator::new(loader(), settings), Err(Error::Configuration(_))));
}
