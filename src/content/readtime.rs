//! Word counting and read-time estimation

use lazy_static::lazy_static;
use regex::Regex;

use super::ContentBlock;

/// Reading speed assumed when none is configured
pub const DEFAULT_WORDS_PER_MINUTE: usize = 200;

lazy_static! {
    /// An HTML tag, or a single whitespace character other than a line break
    static ref WORD_BOUNDARY: Regex =
        Regex::new(r"<.*?p*/?>|[^\S\r\n]").expect("word boundary pattern is valid");
}

/// Count the words in a heading or an HTML body
///
/// Tags and non-newline whitespace both act as separators, so
/// `<p>Hello   world</p>` counts as two words.
pub fn count_words(text: &str) -> usize {
    WORD_BOUNDARY
        .split(text)
        .filter(|word| !word.is_empty())
        .count()
}

/// Total words across every heading and body
pub fn total_words(blocks: &[ContentBlock]) -> usize {
    blocks
        .iter()
        .map(|block| count_words(&block.heading) + count_words(block.body.as_str()))
        .sum()
}

/// Whole minutes needed to read the content, rounded down
pub fn estimate_read_minutes(blocks: &[ContentBlock], words_per_minute: usize) -> usize {
    let rate = if words_per_minute == 0 {
        DEFAULT_WORDS_PER_MINUTE
    } else {
        words_per_minute
    };
    total_words(blocks) / rate
}
