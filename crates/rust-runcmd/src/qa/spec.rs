//! Q&A specifications.

use serde::{Deserialize, Serialize};

use crate::error::{Result, RunError};

/// What to send when a question matches.
///
/// Deserializes from either a string or a list of strings; anything else is
/// rejected.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Answer {
    /// The same answer every time.
    One(String),
    /// One element per match, in order.
    Many(Vec<String>),
}

impl Answer {
    /// Number of distinct answers.
    #[must_use]
    pub fn len(&self) -> usize {
        match self {
            Self::One(_) => 1,
            Self::Many(list) => list.len(),
        }
    }

    /// Whether this is an empty list.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// All answer texts.
    pub fn texts(&self) -> impl Iterator<Item = &str> {
        let slice: &[String] = match self {
            Self::One(answer) => std::slice::from_ref(answer),
            Self::Many(list) => list,
        };
        slice.iter().map(String::as_str)
    }
}

impl From<&str> for Answer {
    fn from(answer: &str) -> Self {
        Self::One(answer.to_string())
    }
}

impl From<String> for Answer {
    fn from(answer: String) -> Self {
        Self::One(answer)
    }
}

impl From<Vec<String>> for Answer {
    fn from(answers: Vec<String>) -> Self {
        Self::Many(answers)
    }
}

impl From<Vec<&str>> for Answer {
    fn from(answers: Vec<&str>) -> Self {
        Self::Many(answers.into_iter().map(str::to_string).collect())
    }
}

impl<const N: usize> From<[&str; N]> for Answer {
    fn from(answers: [&str; N]) -> Self {
        Self::Many(answers.iter().map(|s| (*s).to_string()).collect())
    }
}

/// One question and its answer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QaEntry {
    /// Literal question text, or a regular expression for regex questions.
    pub prompt: String,
    /// The answer.
    pub answer: Answer,
}

impl QaEntry {
    /// Create an entry.
    #[must_use]
    pub fn new(prompt: impl Into<String>, answer: impl Into<Answer>) -> Self {
        Self {
            prompt: prompt.into(),
            answer: answer.into(),
        }
    }
}

/// Questions to answer, and output to tolerate, during a Q&A run.
///
/// Literal questions are tried before regex questions, each in insertion
/// order. In files, they are `[[question]]` and `[[regex_question]]` tables.
///
/// ```toml
/// no_qa = ['Please wait \d+ seconds']
/// cycle_answers = false
///
/// [[question]]
/// prompt = "Continue? [y/n]"
/// answer = "y"
///
/// [[regex_question]]
/// prompt = 'Password for (?P<user>\w+):'
/// answer = ["%(user)s-secret"]
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct QaSpec {
    /// Literal questions.
    #[serde(rename = "question")]
    pub questions: Vec<QaEntry>,
    /// Regular-expression questions; answers may use `%(name)s` templates.
    #[serde(rename = "regex_question")]
    pub regex_questions: Vec<QaEntry>,
    /// Patterns excusing a stall without answering.
    pub no_qa: Vec<String>,
    /// Overrides [`QaConfig::cycle_answers`](crate::QaConfig::cycle_answers).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cycle_answers: Option<bool>,
    /// Overrides [`QaConfig::max_miss_count`](crate::QaConfig::max_miss_count).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_miss_count: Option<u32>,
}

impl QaSpec {
    /// Create an empty specification.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a literal question.
    #[must_use]
    pub fn question(mut self, prompt: impl Into<String>, answer: impl Into<Answer>) -> Self {
        self.questions.push(QaEntry::new(prompt, answer));
        self
    }

    /// Add a regular-expression question.
    #[must_use]
    pub fn regex_question(mut self, pattern: impl Into<String>, answer: impl Into<Answer>) -> Self {
        self.regex_questions.push(QaEntry::new(pattern, answer));
        self
    }

    /// Add a no-qa pattern.
    #[must_use]
    pub fn no_qa(mut self, pattern: impl Into<String>) -> Self {
        self.no_qa.push(pattern.into());
        self
    }

    /// Cycle list answers (true) or repeat the last element (false).
    #[must_use]
    pub const fn cycle_answers(mut self, cycle: bool) -> Self {
        self.cycle_answers = Some(cycle);
        self
    }

    /// Stalled iterations tolerated before giving up.
    #[must_use]
    pub const fn max_miss_count(mut self, max: u32) -> Self {
        self.max_miss_count = Some(max);
        self
    }

    /// Whether there are no questions at all.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.questions.is_empty() && self.regex_questions.is_empty()
    }

    /// Static checks that need no regex compilation.
    pub fn validate(&self) -> Result<()> {
        for entry in self.questions.iter().chain(&self.regex_questions) {
            if entry.answer.is_empty() {
                return Err(RunError::config(format!(
                    "answer list for {:?} is empty",
                    entry.prompt
                )));
            }
        }
        for entry in &self.questions {
            if entry.prompt.trim().is_empty() {
                return Err(RunError::invalid_question(&entry.prompt, "question is empty"));
            }
        }
        Ok(())
    }
}
