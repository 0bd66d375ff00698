//! Lightweight proper-noun tagging for company name extraction.
//!
//! A word is tagged as a proper noun when it is capitalized (or an acronym)
//! and is not a stopword, a scoring keyword, a word from a curated job title,
//! or a common capitalized non-name such as a greeting or weekday. Runs of
//! tagged words that are not split by punctuation form candidates.

use std::collections::HashSet;
use std::sync::LazyLock;

use super::keywords::{
    ASSESSMENT_WORDS, CATEGORIES, COMPANY_SUFFIXES, NON_NAME_WORDS, POSITION_TITLES,
};
use super::tokenize::{is_stopword, words};

static EXCLUDED: LazyLock<HashSet<String>> = LazyLock::new(|| {
    let mut set: HashSet<String> = NON_NAME_WORDS.iter().map(|w| w.to_string()).collect();
    for (_, keywords) in CATEGORIES {
        set.extend(keywords.iter().map(|w| w.to_string()));
    }
    set.extend(ASSESSMENT_WORDS.iter().map(|w| w.to_string()));
    for title in POSITION_TITLES {
        set.extend(title.split([' ', '/']).map(|w| w.to_lowercase()));
    }
    set
});

fn is_proper_noun(word: &str) -> bool {
    let Some(first) = word.chars().next() else {
        return false;
    };
    if !first.is_uppercase() {
        return false;
    }
    let lower = word.to_lowercase();
    !is_stopword(&lower) && !EXCLUDED.contains(&lower)
}

pub fn is_company_suffix(word: &str) -> bool {
    let lower = word.trim_end_matches('.').to_lowercase();
    COMPANY_SUFFIXES.contains(&lower.as_str())
}

/// Maximal runs of proper nouns, in order of appearance. Runs made up only
/// of corporate suffixes ("Company", "Group") are dropped.
pub fn proper_noun_runs(text: &str) -> Vec<String> {
    let mut runs = Vec::new();
    let mut current: Vec<&str> = Vec::new();

    let mut flush = |current: &mut Vec<&str>| {
        if !current.is_empty() && !current.iter().all(|w| is_company_suffix(w)) {
            runs.push(current.join(" "));
        }
        current.clear();
    };

    for word in words(text) {
        if word.after_break {
            flush(&mut current);
        }

        let (bare, possessive) = match word
            .text
            .strip_suffix("'s")
            .or_else(|| word.text.strip_suffix("\u{2019}s"))
        {
            Some(stem) => (stem, true),
            None => (word.text, false),
        };

        // A suffix only continues an existing run; "Co" on its own is not a name.
        let tagged = is_proper_noun(bare) || (!current.is_empty() && is_company_suffix(bare));
        if tagged {
            current.push(bare);
            if possessive {
                flush(&mut current);
            }
        } else {
            flush(&mut current);
        }
    }
    flush(&mut current);

    runs
}
