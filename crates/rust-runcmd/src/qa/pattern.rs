//! Construction of tail-anchored question patterns.
//!
//! Every pattern built here matches only at the end of the accumulated
//! output, optionally followed by whitespace. A question that scrolled by
//! earlier in the stream never matches again once more output follows it.

use regex::bytes::Regex;

use crate::error::{Result, RunError};

/// Whitespace class joining the tokens of a literal question.
const WHITESPACE_JOIN: &str = r"[\s\n]+";

/// Suffix anchoring a pattern at the end of output.
const TAIL_ANCHOR: &str = r"[\s\n]*$";

/// Turn a literal question into its regex source.
///
/// The question is split on whitespace, each token is escaped, and the tokens
/// are joined by a whitespace class. Line wrapping or re-indentation by the
/// child therefore still matches. Returns `None` for a question with no
/// visible characters.
#[must_use]
pub fn question_pattern(question: &str) -> Option<String> {
    let tokens: Vec<String> = question.split_whitespace().map(regex::escape).collect();
    if tokens.is_empty() {
        return None;
    }
    Some(format!("{}{TAIL_ANCHOR}", tokens.join(WHITESPACE_JOIN)))
}

/// Compile a literal question, checking that the result matches the question.
pub fn compile_question(question: &str) -> Result<Regex> {
    let source = question_pattern(question)
        .ok_or_else(|| RunError::invalid_question(question, "question is empty"))?;
    let regex = Regex::new(&source)?;
    if !regex.is_match(question.as_bytes()) {
        return Err(RunError::invalid_question(
            question,
            format!("derived pattern {source:?} does not match the question itself"),
        ));
    }
    Ok(regex)
}

/// Compile a raw regular expression, anchored at the tail like a question.
pub fn compile_tail_regex(pattern: &str) -> Result<Regex> {
    Ok(Regex::new(&format!("(?:{pattern}){TAIL_ANCHOR}"))?)
}
