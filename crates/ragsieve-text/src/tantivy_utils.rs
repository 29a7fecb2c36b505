use tantivy::tokenizer::{LowerCaser, TextAnalyzer, TokenStream, WhitespaceTokenizer};

/// Language-agnostic analyzer: whitespace split plus lowercasing, no stemming
/// and no stop words.
pub fn build_analyzer() -> TextAnalyzer {
	TextAnalyzer::builder(WhitespaceTokenizer::default())
		.filter(LowerCaser)
		.build()
}

pub fn tokenize(analyzer: &mut TextAnalyzer, text: &str) -> Vec<String> {
	let mut stream = analyzer.token_stream(text);
	let mut tokens = Vec::new();
	while stream.advance() { tokens.push(stream.token().text.clone()); }
	tokens
}
