//! Answer grounding check.
//!
//! Coarse lexical proxy: an answer is grounded when it shares at least
//! `threshold` distinct content words with the retrieved context.

use crate::screen::fold_apostrophes;
use serde::Serialize;
use std::collections::{BTreeSet, HashSet};
use unicode_segmentation::UnicodeSegmentation;

/// Default number of shared content words required.
pub const DEFAULT_THRESHOLD: usize = 7;

/// English stop-words (the NLTK list).
const STOP_WORDS: &[&str] = &[
    "i", "me", "my", "myself", "we", "our", "ours", "ourselves", "you", "you're", "you've",
    "you'll", "you'd", "your", "yours", "yourself", "yourselves", "he", "him", "his", "himself",
    "she", "she's", "her", "hers", "herself", "it", "it's", "its", "itself", "they", "them",
    "their", "theirs", "themselves", "what", "which", "who", "whom", "this", "that", "that'll",
    "these", "those", "am", "is", "are", "was", "were", "be", "been", "being", "have", "has",
    "had", "having", "do", "does", "did", "doing", "a", "an", "the", "and", "but", "if", "or",
    "because", "as", "until", "while", "of", "at", "by", "for", "with", "about", "against",
    "between", "into", "through", "during", "before", "after", "above", "below", "to", "from",
    "up", "down", "in", "out", "on", "off", "over", "under", "again", "further", "then", "once",
    "here", "there", "when", "where", "why", "how", "all", "any", "both", "each", "few", "more",
    "most", "other", "some", "such", "no", "nor", "not", "only", "own", "same", "so", "than",
    "too", "very", "s", "t", "can", "will", "just", "don", "don't", "should", "should've", "now",
    "d", "ll", "m", "o", "re", "ve", "y", "ain", "aren", "aren't", "couldn", "couldn't", "didn",
    "didn't", "doesn", "doesn't", "hadn", "hadn't", "hasn", "hasn't", "haven", "haven't", "isn",
    "isn't", "ma", "mightn", "mightn't", "mustn", "mustn't", "needn", "needn't", "shan",
    "shan't", "shouldn", "shouldn't", "wasn", "wasn't", "weren", "weren't", "won", "won't",
    "wouldn", "wouldn't",
];

/// Outcome of one grounding check, kept for logs and calibration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GroundingReport {
    /// Content words present in both answer and context
    pub key_concepts: BTreeSet<String>,
    pub threshold: usize,
    pub grounded: bool,
}

impl GroundingReport {
    pub fn overlap(&self) -> usize {
        self.key_concepts.len()
    }
}

/// Replaceable grounding capability.
pub trait AnswerValidator: Send + Sync {
    fn name(&self) -> &str;

    /// Full report for an answer against its context.
    fn assess(&self, answer: &str, context: &str) -> GroundingReport;

    fn is_grounded(&self, answer: &str, context: &str) -> bool {
        self.assess(answer, context).grounded
    }
}

/// Stop-word filtered key-concept overlap.
#[derive(Debug, Clone)]
pub struct KeyConceptValidator {
    threshold: usize,
    stop_words: HashSet<&'static str>,
}

impl KeyConceptValidator {
    /// Validator requiring `threshold` shared words. Zero is raised to one so
    /// an empty answer can never pass.
    pub fn new(threshold: usize) -> Self {
        Self {
            threshold: threshold.max(1),
            stop_words: STOP_WORDS.iter().copied().collect(),
        }
    }

    pub fn threshold(&self) -> usize {
        self.threshold
    }

    /// Lower-cased words of `text` minus stop-words.
    pub fn content_tokens(&self, text: &str) -> HashSet<String> {
        fold_apostrophes(text)
            .unicode_words()
            .map(str::to_lowercase)
            .filter(|word| !self.stop_words.contains(word.as_str()))
            .collect()
    }
}

impl Default for KeyConceptValidator {
    fn default() -> Self {
        Self::new(DEFAULT_THRESHOLD)
    }
}

impl AnswerValidator for KeyConceptValidator {
    fn name(&self) -> &str {
        "key-concept"
    }

    fn assess(&self, answer: &str, context: &str) -> GroundingReport {
        let answer_tokens = self.content_tokens(answer);
        let context_tokens = self.content_tokens(context);

        let key_concepts: BTreeSet<String> = answer_tokens
            .intersection(&context_tokens)
            .cloned()
            .collect();

        let grounded = key_concepts.len() >= self.threshold;

        tracing::info!(
            threshold = self.threshold,
            key_concepts = key_concepts.len(),
            grounded,
            "Grounding check"
        );
        tracing::debug!("Key concepts: {:?}", key_concepts);

        GroundingReport {
            key_concepts,
            threshold: self.threshold,
            grounded,
        }
    }
}
