use jieba_rs::Jieba;

/// Word segmenter for search queries
pub struct Tokenizer {
    jieba: Jieba,
}

impl Tokenizer {
    /// Loads the bundled jieba dictionary
    pub fn new() -> Self {
        Self {
            jieba: Jieba::new(),
        }
    }

    /// Splits a query into distinct search tokens
    ///
    /// Tokens are trimmed and anything of one character or less is dropped.
    /// Order of first appearance is kept.
    pub fn tokenize(&self, query: &str) -> Vec<String> {
        let mut tokens: Vec<String> = Vec::new();

        for word in self.jieba.cut(query.trim(), true) {
            let word = word.trim();
            if word.chars().count() <= 1 {
                continue;
            }
            if !tokens.iter().any(|t| t == word) {
                tokens.push(word.to_string());
            }
        }

        tokens
    }
}

impl Default for Tokenizer {
    fn default() -> Self {
        Self::new()
    }
}
