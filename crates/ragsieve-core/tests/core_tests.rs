use figment::Jail;

use ragsieve_core::config::Config;
use ragsieve_core::types::{Chunk, ChunkKey};

#[test]
fn chunk_key_prefers_stable_id_then_secondary() {
    let with_stable: Chunk = serde_json::from_str(r#"{"text":"a","metadata":{"chunk_unique_id":"doc1:0","chunk_id":7}}"#).unwrap();
    assert_eq!(with_stable.key(), Some(ChunkKey::Stable("doc1:0".into())));

    let secondary: Chunk = serde_json::from_str(r#"{"text":"b","metadata":{"stable_id":"","chunk_id":7}}"#).unwrap();
    assert_eq!(secondary.key(), Some(ChunkKey::Secondary(7)));

    let anonymous: Chunk = serde_json::from_str(r#"{"text":"c","metadata":{"position_index":4}}"#).unwrap();
    assert_eq!(anonymous.key(), None);
    assert_eq!(anonymous.display_id(), "#4");
}

#[test]
fn metadata_round_trip_preserves_unknown_keys() {
    let raw = r#"{"text":"t","metadata":{"stable_id":"x","page":3,"content_length":1,"filename":"bio.pdf"}}"#;
    let chunk: Chunk = serde_json::from_str(raw).unwrap();
    assert_eq!(chunk.metadata.page, Some(3));
    assert_eq!(chunk.metadata.extra.get("filename").and_then(|v| v.as_str()), Some("bio.pdf"));
    let back = serde_json::to_value(&chunk).unwrap();
    assert_eq!(back["metadata"]["content_length"], 1);
}

#[test]
fn config_merges_toml_and_env() {
    Jail::expect_with(|jail| {
        jail.set_env("RUST_ENV", "test");
        jail.create_file("config.toml", "[retrieval]\nk_semantic = 25\n[rerank]\ntop_n = 5\n")?;
        jail.create_file("config.test.toml", "[retrieval]\nsemantic_threshold = 0.45\n")?;
        jail.set_env("APP_RETRIEVAL__BM25_ABSOLUTE_FLOOR", "2.5");

        let config = Config::load().expect("config");
        let settings = config.settings().expect("settings");
        assert_eq!(settings.retrieval.k_semantic, 25);
        assert_eq!(settings.retrieval.k_keyword, 10);
        assert!((settings.retrieval.semantic_threshold - 0.45).abs() < 1e-6);
        assert!((settings.retrieval.bm25_absolute_floor - 2.5).abs() < 1e-6);
        assert_eq!(settings.rerank.top_n, 5);
        let top_n: usize = config.get("rerank.top_n").expect("get");
        assert_eq!(top_n, 5);
        Ok(())
    });
}

#[test]
fn config_rejects_invalid_ratio() {
    Jail::expect_with(|jail| {
        jail.create_file("config.toml", "[retrieval]\nbm25_dynamic_ratio = 1.7\n")?;
        assert!(Config::load().is_err());
        Ok(())
    });
}
