//! Sentence splitting.
//!
//! A sentence ends at `.`, `!` or `?` followed by whitespace or the end of
//! the text. Spans are byte ranges into the original text with surrounding
//! whitespace excluded.

/// Byte range of one sentence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Sentence {
    pub start: usize,
    pub end: usize,
}

impl Sentence {
    pub fn text<'a>(&self, source: &'a str) -> &'a str {
        &source[self.start..self.end]
    }
}

pub fn split_sentences(text: &str) -> Vec<Sentence> {
    let mut sentences = Vec::new();
    let mut start = skip_whitespace(text, 0);

    for (i, c) in text.char_indices() {
        if i < start || !matches!(c, '.' | '!' | '?') {
            continue;
        }
        let next = i + c.len_utf8();
        let at_boundary = next >= text.len() || text[next..].starts_with(char::is_whitespace);
        if at_boundary {
            sentences.push(Sentence { start, end: next });
            start = skip_whitespace(text, next);
        }
    }

    // Trailing text without terminal punctuation
    if start < text.len() {
        let end = start + text[start..].trim_end().len();
        if end > start {
            sentences.push(Sentence { start, end });
        }
    }

    sentences
}

fn skip_whitespace(text: &str, from: usize) -> usize {
    text[from..]
        .find(|c: char| !c.is_whitespace())
        .map_or(text.len(), |offset| from + offset)
}
