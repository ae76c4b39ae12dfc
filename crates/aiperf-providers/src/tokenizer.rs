//! A reference `Tokenizer`: counts whitespace-separated words. Stands in
//! for a real BPE tokenizer loaded from a HuggingFace `tokenizer.json` -
//! deterministic and dependency-free, but not representative of a real
//! model's token boundaries.

use aiperf_core::providers::Tokenizer;

pub struct WhitespaceTokenizer {
    name: String,
}

impl WhitespaceTokenizer {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

impl Default for WhitespaceTokenizer {
    fn default() -> Self {
        Self::new("whitespace")
    }
}

impl Tokenizer for WhitespaceTokenizer {
    fn count_tokens(&self, text: &str) -> u32 {
        text.split_whitespace().count() as u32
    }

    fn name(&self) -> &str {
        &self.name
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counts_whitespace_separated_words() {
        let tokenizer = WhitespaceTokenizer::default();
        assert_eq!(tokenizer.count_tokens("the quick brown fox"), 4);
        assert_eq!(tokenizer.count_tokens(""), 0);
        assert_eq!(tokenizer.count_tokens("   "), 0);
    }
}
