//! Normalization of index search text into tokens.
//!
//! The search index stores lower-cased words. User text is lower-cased and
//! split at every code point outside `[0-9a-z\u{BF}-\u{FFFF}]`; this covers
//! spaces, commas, dashes, underscores and periods alike. Tokens shorter than
//! the configured minimum are dropped.

/// Splits free text into normalized index tokens.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TokenNormalizer {
    min_length: usize,
}

impl TokenNormalizer {
    /// Creates a normalizer that keeps tokens of at least `min_length` characters.
    pub fn new(min_length: usize) -> Self {
        Self {
            min_length: min_length.max(1),
        }
    }

    /// Returns the minimum token length.
    pub fn min_length(&self) -> usize {
        self.min_length
    }

    /// Normalizes text into distinct tokens, in order of first appearance.
    pub fn normalize(&self, text: &str) -> Vec<String> {
        let mut tokens: Vec<String> = Vec::new();
        let mut current = String::new();

        for c in text.chars().flat_map(char::to_lowercase) {
            if is_token_char(c) {
                current.push(c);
            } else {
                self.push_token(&mut tokens, &mut current);
            }
        }
        self.push_token(&mut tokens, &mut current);

        tokens
    }

    fn push_token(&self, tokens: &mut Vec<String>, current: &mut String) {
        if current.chars().count() >= self.min_length && !tokens.contains(current) {
            tokens.push(std::mem::take(current));
        } else {
            current.clear();
        }
    }
}

impl Default for TokenNormalizer {
    fn default() -> Self {
        Self::new(3)
    }
}

fn is_token_char(c: char) -> bool {
    matches!(c, '0'..='9' | 'a'..='z' | '\u{BF}'..='\u{FFFF}')
}
