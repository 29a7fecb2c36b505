use ragsieve_core::traits::{CrossEncoder, EncodeMode, Encoder};
use ragsieve_embed::{HashEncoder, OverlapCrossEncoder};

#[test]
fn hash_encoder_shapes_and_determinism() {
    let encoder = HashEncoder::new(1024);
    let texts = vec!["hello world".to_string(), "hello world".to_string()];
    let embs = encoder.encode(&texts, EncodeMode::Passage).expect("encode");
    let v1 = &embs[0];
    let v2 = &embs[1];

    assert_eq!(v1.len(), 1024, "embedding dim is 1024");

    let norm: f32 = v1.iter().map(|x| x * x).sum::<f32>().sqrt();
    assert!((norm - 1.0).abs() <= 1e-3, "vector is L2-normalized (norm={norm})");

    for (a, b) in v1.iter().zip(v2.iter()) { assert!((a - b).abs() <= 1e-6); }
}

#[test]
fn hash_encoder_is_symmetric_across_modes() {
    let encoder = HashEncoder::new(64);
    let text = vec!["mitochondria produces ATP".to_string()];
    let q = encoder.encode(&text, EncodeMode::Query).unwrap();
    let p = encoder.encode(&text, EncodeMode::Passage).unwrap();
    assert_eq!(q, p);
}

#[test]
fn overlap_cross_encoder_orders_by_shared_tokens() {
    let ce = OverlapCrossEncoder;
    let full = ce.score("cell membrane", "The cell membrane is thin").unwrap();
    let half = ce.score("cell membrane", "A cell wall").unwrap();
    let none = ce.score("cell membrane", "Photosynthesis").unwrap();
    assert!(full > half && half > none);
    assert_eq!(ce.score_batch("cell membrane", &["A cell wall", "Photosynthesis"]).unwrap(), vec![half, none]);
}
