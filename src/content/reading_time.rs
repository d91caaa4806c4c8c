//! Reading time estimate

use super::ContentBlock;

/// Assumed reading speed
pub const WORDS_PER_MINUTE: usize = 200;

/// Whitespace-delimited tokens across every heading and body fragment
pub fn count_words(content: &[ContentBlock]) -> usize {
    content
        .iter()
        .map(|block| {
            let body: usize = block
                .body
                .iter()
                .map(|fragment| fragment.text.split_whitespace().count())
                .sum();
            block.heading.split_whitespace().count() + body
        })
        .sum()
}

/// Minutes to read, rounded up
pub fn reading_time(content: &[ContentBlock]) -> u32 {
    count_words(content).div_ceil(WORDS_PER_MINUTE) as u32
}
