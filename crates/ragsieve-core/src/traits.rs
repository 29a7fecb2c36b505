/// Which side of an asymmetric embedding model a text is encoded for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EncodeMode {
    Query,
    Passage,
}

impl EncodeMode {
    pub fn prefix(self) -> &'static str {
        match self {
            EncodeMode::Query => "query: ",
            EncodeMode::Passage => "passage: ",
        }
    }
}

/// Dense text encoder. Implementations return L2-normalized vectors of
/// length `dim()`.
pub trait Encoder: Send + Sync {
    fn dim(&self) -> usize;
    fn encode(&self, texts: &[String], mode: EncodeMode) -> anyhow::Result<Vec<Vec<f32>>>;
}

/// Pairwise relevance model returning raw logits.
pub trait CrossEncoder: Send + Sync {
    fn score(&self, query: &str, passage: &str) -> anyhow::Result<f32>;

    fn score_batch(&self, query: &str, passages: &[&str]) -> anyhow::Result<Vec<f32>> {
        passages.iter().map(|p| self.score(query, p)).collect()
    }
}

/// Nearest-neighbor index over corpus positions.
///
/// `search` returns `(position, score)` pairs ordered by descending inner
/// product. Position `i` refers to the i-th chunk of the corpus.
pub trait VectorIndex: Send + Sync {
    fn dim(&self) -> usize;
    fn len(&self) -> usize;
    fn is_empty(&self) -> bool { self.len() == 0 }
    fn search(&self, query: &[f32], k: usize) -> anyhow::Result<Vec<(usize, f32)>>;
}

pub type TextStream = Box<dyn Iterator<Item = String> + Send>;

/// Answer generator consuming a fully assembled prompt.
pub trait Generator: Send + Sync {
    fn generate(&self, prompt: &str) -> anyhow::Result<String>;
    fn generate_stream(&self, prompt: &str) -> anyhow::Result<TextStream>;
}
