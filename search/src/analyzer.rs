//! Text analysis shared by indexing and querying.

/// One analyzed token; `start..end` is the byte range of its surface form in the input
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub text: String,
    pub start: usize,
    pub end: usize,
}

pub trait Analyzer: Send + Sync + std::fmt::Debug {
    fn tokens(&self, text: &str) -> Vec<Token>;
}

/// Splits on anything that is not alphanumeric and lower-cases each token.
#[derive(Debug, Clone, Copy, Default)]
pub struct StandardAnalyzer;

impl Analyzer for StandardAnalyzer {
    fn tokens(&self, text: &str) -> Vec<Token> {
        let mut tokens = Vec::new();
        let mut start: Option<usize> = None;
        for (offset, ch) in text.char_indices() {
            match (ch.is_alphanumeric(), start) {
                (true, None) => start = Some(offset),
                (false, Some(begin)) => {
                    tokens.push(Token { text: text[begin..offset].to_lowercase(), start: begin, end: offset });
                    start = None;
                }
                _ => {}
            }
        }
        if let Some(begin) = start {
            tokens.push(Token { text: text[begin..].to_lowercase(), start: begin, end: text.len() });
        }
        tokens
    }
}

/// The tokens of a search phrase. `prefix` is the final token when nothing
/// was discarded after it, meaning the user may still be typing it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryTokens {
    pub tokens: Vec<String>,
    pub prefix: Option<String>,
}

pub fn query_tokens(analyzer: &dyn Analyzer, phrase: &str) -> QueryTokens {
    let mut analyzed = analyzer.tokens(phrase);
    let Some(last) = analyzed.pop() else {
        return QueryTokens::default();
    };
    let mut tokens: Vec<String> = analyzed.into_iter().map(|t| t.text).collect();
    if last.end == phrase.len() {
        QueryTokens { tokens, prefix: Some(last.text) }
    } else {
        tokens.push(last.text);
        QueryTokens { tokens, prefix: None }
    }
}
