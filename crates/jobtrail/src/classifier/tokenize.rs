//! Word and sentence splitting shared by the heuristic scorer and tagger.

use super::keywords::STOPWORDS;

/// A word as it appeared in the text, plus whether a sentence or clause
/// boundary separates it from the previous word.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Word<'a> {
    pub text: &'a str,
    pub after_break: bool,
}

fn is_word_char(c: char) -> bool {
    c.is_alphanumeric() || c == '&' || c == '\'' || c == '-'
}

fn is_break_char(c: char) -> bool {
    matches!(
        c,
        '.' | '!' | '?' | ',' | ';' | ':' | '\n' | '(' | ')' | '[' | ']' | '"' | '|' | '/'
    )
}

/// Splits text into words, keeping case. Leading and trailing `'`/`-` are
/// trimmed so quotes and dashes never form words on their own.
pub fn words(text: &str) -> Vec<Word<'_>> {
    let mut out = Vec::new();
    let mut start = None;
    let mut pending_break = true;

    for (i, c) in text.char_indices() {
        if is_word_char(c) {
            if start.is_none() {
                start = Some(i);
            }
            continue;
        }
        if let Some(s) = start.take() {
            push_word(&mut out, &text[s..i], &mut pending_break);
        }
        if is_break_char(c) {
            pending_break = true;
        }
    }
    if let Some(s) = start {
        push_word(&mut out, &text[s..], &mut pending_break);
    }

    out
}

fn push_word<'a>(out: &mut Vec<Word<'a>>, raw: &'a str, pending_break: &mut bool) {
    let trimmed = raw.trim_matches(|c| c == '\'' || c == '-');
    if trimmed.is_empty() {
        return;
    }
    out.push(Word {
        text: trimmed,
        after_break: *pending_break,
    });
    *pending_break = false;
}

/// Lowercased words in order, stopwords included.
pub fn lowercase_words(text: &str) -> Vec<String> {
    words(text)
        .into_iter()
        .map(|w| w.text.to_lowercase())
        .collect()
}

/// Lowercased words with stopwords removed.
pub fn content_tokens(text: &str) -> Vec<String> {
    lowercase_words(text)
        .into_iter()
        .filter(|w| !is_stopword(w))
        .collect()
}

pub fn is_stopword(word: &str) -> bool {
    STOPWORDS.binary_search(&word).is_ok()
}

/// Splits on sentence punctuation and line breaks; blank pieces are dropped.
pub fn sentences(text: &str) -> Vec<&str> {
    text.split(['.', '!', '?', '\n'])
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .collect()
}
