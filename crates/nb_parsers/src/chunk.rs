//! Splits content into pieces small enough for a single model call.

/// Rough characters-per-token ratio used for budgeting.
pub const CHARS_PER_TOKEN: usize = 4;

/// Token budget per chunk. Keeps a chunk of pure text under a 4k-token window.
pub const MAX_CHUNK_TOKENS: usize = 3800;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkBudget {
    pub chars_per_token: usize,
    pub max_tokens: usize,
}

impl Default for ChunkBudget {
    fn default() -> Self {
        Self {
            chars_per_token: CHARS_PER_TOKEN,
            max_tokens: MAX_CHUNK_TOKENS,
        }
    }
}

impl ChunkBudget {
    pub fn new(chars_per_token: usize, max_tokens: usize) -> Self {
        Self {
            chars_per_token: chars_per_token.max(1),
            max_tokens: max_tokens.max(1),
        }
    }

    pub fn max_chars(&self) -> usize {
        self.chars_per_token.max(1) * self.max_tokens.max(1)
    }

    /// `ceil(chars / chars_per_token)`
    pub fn estimate_tokens(&self, text: &str) -> usize {
        let chars = text.chars().count();
        let per_token = self.chars_per_token.max(1);
        (chars + per_token - 1) / per_token
    }
}

/// Lazy sequence of chunks. Clone it to iterate again from the start.
#[derive(Debug, Clone)]
pub struct Chunks<'a> {
    rest: &'a str,
    max_chars: usize,
}

impl<'a> Iterator for Chunks<'a> {
    type Item = &'a str;

    fn next(&mut self) -> Option<&'a str> {
        if self.rest.is_empty() {
            return None;
        }

        let end = self
            .rest
            .char_indices()
            .nth(self.max_chars)
            .map(|(idx, _)| idx)
            .unwrap_or(self.rest.len());

        let (chunk, rest) = self.rest.split_at(end);
        self.rest = rest;
        Some(chunk)
    }
}

pub fn chunk_content(content: &str) -> Chunks<'_> {
    chunk_with_budget(content, ChunkBudget::default())
}

pub fn chunk_with_budget(content: &str, budget: ChunkBudget) -> Chunks<'_> {
    Chunks {
        rest: content,
        max_chars: budget.max_chars(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_input_has_no_chunks() {
        assert_eq!(chunk_content("").count(), 0);
    }

    #[test]
    fn test_small_input_is_one_chunk() {
        let chunks: Vec<_> = chunk_content("<p>short</p>").collect();
        assert_eq!(chunks, vec!["<p>short</p>"]);
    }

    #[test]
    fn test_chunks_reconstruct_input() {
        let content = "abcdefghij".repeat(4000);
        let chunks: Vec<_> = chunk_content(&content).collect();
        assert_eq!(chunks.len(), 3);
        assert_eq!(chunks.concat(), content);
    }

    #[test]
    fn test_chunks_respect_budget() {
        let budget = ChunkBudget::new(4, 10);
        let content = "x".repeat(123);
        for chunk in chunk_with_budget(&content, budget) {
            assert!(budget.estimate_tokens(chunk) <= budget.max_tokens);
        }
        assert_eq!(chunk_with_budget(&content, budget).count(), 4);
    }

    #[test]
    fn test_multibyte_characters_are_not_split() {
        let budget = ChunkBudget::new(1, 3);
        let content = "héllo wörld ñ";
        let chunks: Vec<_> = chunk_with_budget(content, budget).collect();
        assert_eq!(chunks.concat(), content);
        assert!(chunks.iter().all(|c| c.chars().count() <= 3));
    }

    #[test]
    fn test_chunks_are_restartable() {
        let content = "y".repeat(40_000);
        let chunks = chunk_content(&content);
        let first: Vec<_> = chunks.clone().collect();
        let second: Vec<_> = chunks.collect();
        assert_eq!(first, second);
    }

    #[test]
    fn test_estimate_tokens_rounds_up() {
        let budget = ChunkBudget::default();
        assert_eq!(budget.estimate_tokens(""), 0);
        assert_eq!(budget.estimate_tokens("a"), 1);
        assert_eq!(budget.estimate_tokens("abcd"), 1);
        assert_eq!(budget.estimate_tokens("abcde"), 2);
        assert_eq!(budget.max_chars(), 15_200);
    }
}
