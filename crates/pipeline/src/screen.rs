//! Bias screening for questions and generated answers.
//!
//! A screen is total: it never fails and always returns a cleaned text.
//! Empty input yields an empty cleaned text and no finding.

use serde::{Deserialize, Serialize};
use std::fmt;
use unicode_segmentation::UnicodeSegmentation;

/// Category of a bias finding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BiasKind {
    Gender,
    Age,
    Origin,
    Disability,
    /// Deployment-supplied phrase
    Custom,
}

impl BiasKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Gender => "gender",
            Self::Age => "age",
            Self::Origin => "origin",
            Self::Disability => "disability",
            Self::Custom => "custom",
        }
    }
}

impl fmt::Display for BiasKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A detected bias: what kind, and a message meant for humans.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BiasFinding {
    pub kind: BiasKind,
    pub message: String,
}

/// Result of screening one text.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Screened {
    pub cleaned: String,
    pub finding: Option<BiasFinding>,
}

impl Screened {
    pub fn clean(cleaned: impl Into<String>) -> Self {
        Self {
            cleaned: cleaned.into(),
            finding: None,
        }
    }

    pub fn has_finding(&self) -> bool {
        self.finding.is_some()
    }
}

/// Replaceable bias-screening capability.
///
/// Implementations backed by a remote classifier must swallow their own
/// failures and fall back to "no finding"; `screen` has no error path.
#[async_trait::async_trait]
pub trait BiasScreen: Send + Sync {
    fn name(&self) -> &str;

    async fn screen(&self, text: &str) -> Screened;

    /// Screen text that may be absent. `None` behaves like `""`.
    async fn screen_opt(&self, text: Option<&str>) -> Screened {
        match text {
            Some(text) => self.screen(text).await,
            None => Screened::default(),
        }
    }
}

/// Which side of the conversation a screen inspects. Changes the finding
/// wording and how the cleaned text is normalized.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScreenTarget {
    Question,
    Response,
}

impl ScreenTarget {
    /// Questions collapse to one line; responses keep their line structure.
    pub fn normalize(&self, text: &str) -> String {
        match self {
            Self::Question => normalize_text(text),
            Self::Response => normalize_answer(text),
        }
    }
}

/// Collapse runs of whitespace and drop control characters.
pub fn normalize_text(text: &str) -> String {
    text.split_whitespace()
        .map(|word| word.chars().filter(|c| !c.is_control()).collect::<String>())
        .filter(|word| !word.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Drop control characters other than newline and tab, strip trailing
/// whitespace from each line and trim the whole text. Indentation, blank
/// lines and code blocks survive.
pub fn normalize_answer(text: &str) -> String {
    text.lines()
        .map(|line| {
            line.chars()
                .filter(|c| *c == '\t' || !c.is_control())
                .collect::<String>()
                .trim_end()
                .to_string()
        })
        .collect::<Vec<_>>()
        .join("\n")
        .trim()
        .to_string()
}

/// Fold typographic apostrophes into ASCII ones so "can’t" matches "can't".
pub(crate) fn fold_apostrophes(text: &str) -> String {
    text.replace(['\u{2019}', '\u{2018}'], "'")
}

/// Lower-cased words joined by single spaces, padded for phrase matching.
fn phrase_key(text: &str) -> String {
    let folded = fold_apostrophes(text);
    let words: Vec<String> = folded.unicode_words().map(str::to_lowercase).collect();
    format!(" {} ", words.join(" "))
}

const DEFAULT_LEXICON: &[(BiasKind, &[&str])] = &[
    (
        BiasKind::Gender,
        &[
            "women can't",
            "women cannot",
            "girls can't",
            "only men",
            "only women",
            "like a girl",
            "for a woman",
            "men are better",
            "women are worse",
        ],
    ),
    (
        BiasKind::Age,
        &[
            "too old to",
            "old people can't",
            "boomers",
            "young people can't",
            "kids these days",
        ],
    ),
    (
        BiasKind::Origin,
        &[
            "foreigners",
            "third world",
            "immigrants can't",
            "those people",
        ],
    ),
    (
        BiasKind::Disability,
        &["retarded", "cripple", "crippled", "handicapped people can't"],
    ),
];

/// Phrase-lexicon screen.
///
/// Matches whole-word phrases case-insensitively; the first matching rule
/// in lexicon order produces the finding.
#[derive(Debug, Clone)]
pub struct LexicalBiasScreen {
    target: ScreenTarget,
    rules: Vec<(BiasKind, String, String)>,
}

impl LexicalBiasScreen {
    /// Screen with the built-in lexicon.
    pub fn new(target: ScreenTarget) -> Self {
        let rules = DEFAULT_LEXICON
            .iter()
            .flat_map(|(kind, phrases)| {
                phrases
                    .iter()
                    .map(move |phrase| (*kind, phrase.to_string(), phrase_key(phrase)))
            })
            .collect();

        Self { target, rules }
    }

    pub fn for_questions() -> Self {
        Self::new(ScreenTarget::Question)
    }

    pub fn for_responses() -> Self {
        Self::new(ScreenTarget::Response)
    }

    /// Add deployment-specific phrases, flagged as [`BiasKind::Custom`].
    pub fn with_extra_terms<I, S>(mut self, terms: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        for term in terms {
            let term = term.as_ref().trim();
            let key = phrase_key(term);
            if key.trim().is_empty() {
                continue;
            }
            self.rules.push((BiasKind::Custom, term.to_string(), key));
        }
        self
    }

    pub fn rule_count(&self) -> usize {
        self.rules.len()
    }

    fn finding_for(&self, kind: BiasKind, phrase: &str) -> BiasFinding {
        let message = match self.target {
            ScreenTarget::Question => format!(
                "Your question contains a generalization about {} (\"{}\"). \
                 Please rephrase it in neutral terms and ask again.",
                kind, phrase
            ),
            ScreenTarget::Response => format!(
                "The generated response contains a generalization about {} (\"{}\").",
                kind, phrase
            ),
        };
        BiasFinding { kind, message }
    }
}

#[async_trait::async_trait]
impl BiasScreen for LexicalBiasScreen {
    fn name(&self) -> &str {
        "lexical"
    }

    async fn screen(&self, text: &str) -> Screened {
        let cleaned = self.target.normalize(text);
        if cleaned.is_empty() {
            return Screened::default();
        }

        let key = phrase_key(&cleaned);
        let finding = self
            .rules
            .iter()
            .find(|(_, _, rule_key)| key.contains(rule_key.as_str()))
            .map(|(kind, phrase, _)| self.finding_for(*kind, phrase));

        if let Some(ref finding) = finding {
            tracing::debug!(kind = %finding.kind, "Bias screen matched");
        }

        Screened { cleaned, finding }
    }
}

/// Screen that only normalizes text. Used when screening is disabled.
#[derive(Debug, Clone, Copy)]
pub struct PassthroughScreen {
    target: ScreenTarget,
}

impl PassthroughScreen {
    pub fn new(target: ScreenTarget) -> Self {
        Self { target }
    }
}

#[async_trait::async_trait]
impl BiasScreen for PassthroughScreen {
    fn name(&self) -> &str {
        "passthrough"
    }

    async fn screen(&self, text: &str) -> Screened {
        Screened::clean(self.target.normalize(text))
    }
}
