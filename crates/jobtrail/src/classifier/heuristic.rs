//! Keyword-scoring classifier.

use async_trait::async_trait;
use log::{debug, info};

use super::keywords::{
    Category, ASSESSMENT_WORDS, CATEGORIES, PERSONAL_MARKERS, POSITION_TITLES, POSTING_MARKERS,
};
use super::tagger::{is_company_suffix, proper_noun_runs};
use super::tokenize::{content_tokens, is_stopword, sentences, words};
use super::{ClassificationError, ClassificationResult, Classifier, JobExtraction, JobStatus};
use crate::email::RawMessage;

pub const UNKNOWN_COMPANY: &str = "Unknown";
pub const UNKNOWN_POSITION: &str = "Unknown Position";

/// Characters of the body kept in the notes seed.
const NOTES_BODY_CHARS: usize = 500;

/// Classifies by counting keyword hits in the subject and body.
///
/// A message needs at least `min_job_score` tokens that belong to any
/// category before it is considered job related at all. The winning
/// category decides the status; company and position come from the tagger
/// and the curated title list.
#[derive(Debug, Clone)]
pub struct HeuristicClassifier {
    min_job_score: u32,
}

impl Default for HeuristicClassifier {
    fn default() -> Self {
        Self::new(2)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CategoryScores {
    pub application: u32,
    pub interview: u32,
    pub offer: u32,
    pub rejection: u32,
}

impl CategoryScores {
    fn get_mut(&mut self, category: Category) -> &mut u32 {
        match category {
            Category::Application => &mut self.application,
            Category::Interview => &mut self.interview,
            Category::Offer => &mut self.offer,
            Category::Rejection => &mut self.rejection,
        }
    }

    fn get(&self, category: Category) -> u32 {
        match category {
            Category::Application => self.application,
            Category::Interview => self.interview,
            Category::Offer => self.offer,
            Category::Rejection => self.rejection,
        }
    }

    /// Highest-scoring category; the first in scoring order wins ties.
    pub fn best(&self) -> Category {
        let mut best = CATEGORIES[0].0;
        for (category, _) in CATEGORIES.iter().skip(1) {
            if self.get(*category) > self.get(best) {
                best = *category;
            }
        }
        best
    }
}

impl HeuristicClassifier {
    pub fn new(min_job_score: u32) -> Self {
        Self {
            min_job_score: min_job_score.max(1),
        }
    }

    /// Number of tokens that hit any category list.
    pub fn job_score(tokens: &[String]) -> u32 {
        tokens
            .iter()
            .filter(|t| {
                CATEGORIES
                    .iter()
                    .any(|(_, words)| words.contains(&t.as_str()))
            })
            .count() as u32
    }

    pub fn category_scores(tokens: &[String]) -> CategoryScores {
        let mut scores = CategoryScores {
            application: 0,
            interview: 0,
            offer: 0,
            rejection: 0,
        };
        for token in tokens {
            for (category, words) in CATEGORIES {
                if words.contains(&token.as_str()) {
                    *scores.get_mut(*category) += category.weight();
                }
            }
        }
        scores
    }

    /// True for job-board mail (alerts, postings, fairs) that is not about
    /// one of the reader's own applications.
    pub fn is_posting(text_lower: &str) -> bool {
        POSTING_MARKERS.iter().any(|m| text_lower.contains(m))
            && !PERSONAL_MARKERS.iter().any(|m| text_lower.contains(m))
    }

    /// An interview-type message that asks for an assessment is still at the
    /// application stage, even when it says an interview may follow.
    fn status_for(category: Category, tokens: &[String]) -> JobStatus {
        match category {
            Category::Application => JobStatus::Applied,
            Category::Interview => {
                if tokens.iter().any(|t| ASSESSMENT_WORDS.contains(&t.as_str())) {
                    JobStatus::Applied
                } else {
                    JobStatus::Interview
                }
            }
            Category::Offer => JobStatus::Offered,
            Category::Rejection => JobStatus::Rejected,
        }
    }

    /// Most frequently mentioned proper-noun run, with a bonus for a
    /// corporate suffix. Ties go to the first mentioned.
    pub fn extract_company(subject: &str, body: &str) -> String {
        let text = format!("{}. \n{}", subject, body);
        let mut scored: Vec<(String, u32)> = Vec::new();

        for run in proper_noun_runs(&text) {
            let bonus = if run.split(' ').any(is_company_suffix) {
                2
            } else {
                0
            };
            match scored.iter_mut().find(|(name, _)| *name == run) {
                Some((_, score)) => *score += 1 + bonus,
                None => scored.push((run, 1 + bonus)),
            }
        }

        let mut best: Option<&(String, u32)> = None;
        for entry in &scored {
            if best.map_or(true, |b| entry.1 > b.1) {
                best = Some(entry);
            }
        }

        best.map(|(name, _)| name.clone())
            .unwrap_or_else(|| UNKNOWN_COMPANY.to_string())
    }

    /// A curated title found verbatim in one sentence (longest wins), else
    /// the title with the best phrase/word overlap, else "Unknown Position".
    pub fn extract_position(subject: &str, body: &str) -> String {
        let text = format!("{}. \n{}", subject, body);

        let lowered: Vec<String> = sentences(&text).iter().map(|s| s.to_lowercase()).collect();
        let mut exact: Option<&str> = None;
        for &title in POSITION_TITLES {
            let needle = title.to_lowercase();
            if lowered.iter().any(|s| s.contains(&needle))
                && exact.map_or(true, |e| title.len() > e.len())
            {
                exact = Some(title);
            }
        }
        if let Some(title) = exact {
            return title.to_string();
        }

        let text_words: Vec<&str> = words(&text).into_iter().map(|w| w.text).collect();
        let mut best: Option<(&str, usize)> = None;
        for &title in POSITION_TITLES {
            let score = ngram_score(&text_words, title);
            if score > 0 && best.map_or(true, |(_, b)| score > b) {
                best = Some((title, score));
            }
        }

        best.map(|(t, _)| t.to_string())
            .unwrap_or_else(|| UNKNOWN_POSITION.to_string())
    }

    /// Scores the message without the async wrapper.
    pub fn classify_sync(&self, message: &RawMessage) -> ClassificationResult {
        let combined_lower = format!("{}\n{}", message.subject, message.body).to_lowercase();
        if Self::is_posting(&combined_lower) {
            debug!("'{}' looks like a job posting or newsletter", message.subject);
            return ClassificationResult::NotJobRelated;
        }

        let mut tokens = content_tokens(&message.subject);
        tokens.extend(content_tokens(&message.body));

        let job_score = Self::job_score(&tokens);
        debug!("Job-related score for '{}': {}", message.subject, job_score);
        if job_score < self.min_job_score {
            return ClassificationResult::NotJobRelated;
        }

        let scores = Self::category_scores(&tokens);
        let category = scores.best();
        let status = Self::status_for(category, &tokens);
        let company = Self::extract_company(&message.subject, &message.body);
        let position = Self::extract_position(&message.subject, &message.body);

        info!(
            "Classified '{}' as {} ({} / {}), scores {:?}",
            message.subject, status, company, position, scores
        );

        ClassificationResult::JobRelated(JobExtraction {
            company,
            position,
            status,
            normalized_content: notes_seed(&message.subject, &message.body),
        })
    }
}

/// Title words with two or more capitals ("IT", "QA", "IoT") only match
/// the same spelling, so the pronoun "it" never hits "IT Support Specialist".
fn title_word_matches(title_word: &str, word: &str) -> bool {
    if is_acronym(title_word) {
        word == title_word
    } else {
        word.eq_ignore_ascii_case(title_word)
    }
}

fn is_acronym(word: &str) -> bool {
    word.chars().filter(|c| c.is_uppercase()).count() >= 2
}

/// Full-phrase occurrences weigh 3, each contiguous sub-phrase occurrence 1.
/// Sub-phrases are counted over the text with stopwords removed.
fn ngram_score(words: &[&str], title: &str) -> usize {
    let title_words: Vec<&str> = title.split([' ', '/']).filter(|w| !w.is_empty()).collect();
    let n = title_words.len();
    let content: Vec<&str> = words
        .iter()
        .copied()
        .filter(|w| is_acronym(w) || !is_stopword(&w.to_lowercase()))
        .collect();

    let count = |haystack: &[&str], phrase: &[&str]| -> usize {
        if phrase.is_empty() || phrase.len() > haystack.len() {
            return 0;
        }
        haystack
            .windows(phrase.len())
            .filter(|window| {
                window
                    .iter()
                    .zip(phrase)
                    .all(|(word, title_word)| title_word_matches(title_word, word))
            })
            .count()
    };

    let mut score = 3 * count(words, &title_words[..]);
    for i in 0..n {
        for j in (i + 1)..=n {
            if j - i < n {
                score += count(&content, &title_words[i..j]);
            }
        }
    }
    score
}

/// The note text recorded for a message.
pub fn notes_seed(subject: &str, body: &str) -> String {
    let prefix: String = body.chars().take(NOTES_BODY_CHARS).collect();
    format!("Email subject: {}\n\nEmail body: {}...", subject, prefix)
}

#[async_trait]
impl Classifier for HeuristicClassifier {
    fn name(&self) -> &'static str {
        "heuristic"
    }

    async fn try_classify(
        &self,
        message: &RawMessage,
    ) -> Result<ClassificationResult, ClassificationError> {
        Ok(self.classify_sync(message))
    }
}
