//! The Q&A matching engine.

use std::collections::HashSet;
use std::fmt;
use std::sync::LazyLock;

use regex::bytes::{Captures, Regex};

use super::pattern::{compile_question, compile_tail_regex};
use super::spec::{Answer, QaSpec};
use crate::config::QaConfig;
use crate::error::{Result, RunError};
use crate::handler::{ChunkHandler, LoopAction};
use crate::types::{DIAGNOSTIC_TAIL_CHARS, tail_excerpt};

/// `%(name)s` placeholders, plus `%%` for a literal percent sign.
static PLACEHOLDER: LazyLock<regex::Regex> = LazyLock::new(|| {
    regex::Regex::new(r"%\((\w+)\)s|%%").expect("placeholder pattern is a valid regex")
});

/// Mutable state of one interaction.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InteractionState {
    /// Consecutive iterations with no answer, no growth and no excuse.
    pub miss_count: u32,
    /// Accumulated output length at the last check that saw growth.
    pub previous_output_length: usize,
    /// Next answer index, per question.
    pub answer_cursors: Vec<usize>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum QuestionKind {
    Literal,
    Regex,
}

#[derive(Debug)]
struct CompiledQuestion {
    prompt: String,
    kind: QuestionKind,
    regex: Regex,
    /// Newline-terminated answers.
    answers: Vec<String>,
    /// Whether answers are rendered from named captures.
    templated: bool,
}

impl CompiledQuestion {
    fn literal(prompt: &str, answer: &Answer) -> Result<Self> {
        Ok(Self {
            prompt: prompt.to_string(),
            kind: QuestionKind::Literal,
            regex: compile_question(prompt)?,
            answers: terminate(answer),
            templated: false,
        })
    }

    fn regex(pattern: &str, answer: &Answer) -> Result<Self> {
        let regex = compile_tail_regex(pattern)?;
        let names: HashSet<&str> = regex.capture_names().flatten().collect();
        let templated = !names.is_empty();
        if templated {
            for text in answer.texts() {
                for caps in PLACEHOLDER.captures_iter(text) {
                    if let Some(name) = caps.get(1) {
                        if !names.contains(name.as_str()) {
                            return Err(RunError::config(format!(
                                "answer {text:?} references unknown group {:?} of {pattern:?}",
                                name.as_str()
                            )));
                        }
                    }
                }
            }
        }
        Ok(Self {
            prompt: pattern.to_string(),
            kind: QuestionKind::Regex,
            regex,
            answers: terminate(answer),
            templated,
        })
    }
}

fn terminate(answer: &Answer) -> Vec<String> {
    answer
        .texts()
        .map(|text| {
            if text.ends_with('\n') {
                text.to_string()
            } else {
                format!("{text}\n")
            }
        })
        .collect()
}

/// Substitute named captures into `template`. Groups that did not take part
/// in the match render as nothing.
fn render(template: &str, caps: &Captures<'_>) -> Vec<u8> {
    let mut out = Vec::with_capacity(template.len());
    let mut last = 0;
    for placeholder in PLACEHOLDER.captures_iter(template) {
        let Some(whole) = placeholder.get(0) else {
            continue;
        };
        out.extend_from_slice(template[last..whole.start()].as_bytes());
        match placeholder.get(1) {
            Some(name) => {
                if let Some(value) = caps.name(name.as_str()) {
                    out.extend_from_slice(value.as_bytes());
                }
            }
            None => out.push(b'%'),
        }
        last = whole.end();
    }
    out.extend_from_slice(template[last..].as_bytes());
    out
}

/// Answers questions found at the tail of the output, and gives up when the
/// child stalls.
///
/// Literal questions are tried first, then regex questions, each in the order
/// they were given. Every match resets the miss count. An iteration that
/// neither answers, nor sees output grow, nor matches a no-qa pattern counts
/// as a miss; once the miss count exceeds the maximum, the engine returns
/// [`LoopAction::Stop`].
pub struct QaEngine {
    questions: Vec<CompiledQuestion>,
    no_qa: Vec<Regex>,
    cycle_answers: bool,
    max_miss_count: u32,
    state: InteractionState,
    echo: Option<Box<dyn ChunkHandler>>,
}

impl QaEngine {
    /// Compile `spec`, filling unset policy from `defaults`.
    ///
    /// Every pattern is compiled and checked here, so a bad specification
    /// fails before any child is spawned.
    pub fn new(spec: &QaSpec, defaults: &QaConfig) -> Result<Self> {
        spec.validate()?;

        let mut questions = Vec::with_capacity(spec.questions.len() + spec.regex_questions.len());
        for entry in &spec.questions {
            questions.push(CompiledQuestion::literal(&entry.prompt, &entry.answer)?);
        }
        for entry in &spec.regex_questions {
            questions.push(CompiledQuestion::regex(&entry.prompt, &entry.answer)?);
        }
        let no_qa = spec
            .no_qa
            .iter()
            .map(|pattern| compile_tail_regex(pattern))
            .collect::<Result<Vec<_>>>()?;

        let state = InteractionState {
            answer_cursors: vec![0; questions.len()],
            ..InteractionState::default()
        };

        tracing::debug!(
            questions = spec.questions.len(),
            regex_questions = spec.regex_questions.len(),
            no_qa = no_qa.len(),
            "Compiled Q&A specification"
        );

        Ok(Self {
            questions,
            no_qa,
            cycle_answers: spec.cycle_answers.unwrap_or(defaults.cycle_answers),
            max_miss_count: spec.max_miss_count.unwrap_or(defaults.max_miss_count),
            state,
            echo: None,
        })
    }

    /// Also pass every chunk to `echo`, before matching.
    #[must_use]
    pub fn with_echo(mut self, echo: Box<dyn ChunkHandler>) -> Self {
        self.echo = Some(echo);
        self
    }

    /// Current interaction state.
    #[must_use]
    pub const fn state(&self) -> &InteractionState {
        &self.state
    }

    /// Effective miss threshold.
    #[must_use]
    pub const fn max_miss_count(&self) -> u32 {
        self.max_miss_count
    }

    /// Effective cycling policy.
    #[must_use]
    pub const fn cycle_answers(&self) -> bool {
        self.cycle_answers
    }

    /// Return the cursor to use now and move it forward.
    fn advance_cursor(&mut self, index: usize) -> usize {
        let len = self.questions[index].answers.len();
        let cursor = &mut self.state.answer_cursors[index];
        let current = *cursor;
        *cursor = if current + 1 < len {
            current + 1
        } else if self.cycle_answers {
            0
        } else {
            len - 1
        };
        current
    }

    /// The answer for the first question matching the tail of `output`.
    fn answer_for(&mut self, output: &[u8]) -> Option<Vec<u8>> {
        let (index, caps) = self
            .questions
            .iter()
            .enumerate()
            .find_map(|(index, question)| question.regex.captures(output).map(|caps| (index, caps)))?;
        let cursor = self.advance_cursor(index);
        let question = &self.questions[index];
        let template = &question.answers[cursor];
        let answer = if question.templated {
            render(template, &caps)
        } else {
            template.as_bytes().to_vec()
        };
        tracing::debug!(
            question = %question.prompt,
            kind = ?question.kind,
            answer_index = cursor,
            "Answering question"
        );
        Some(answer)
    }
}

impl ChunkHandler for QaEngine {
    fn process_output(&mut self, chunk: &[u8], output: &[u8]) -> Result<LoopAction> {
        if let Some(echo) = &mut self.echo {
            echo.process_output(chunk, output)?;
        }

        if !chunk.is_empty() {
            if let Some(answer) = self.answer_for(output) {
                self.state.miss_count = 0;
                return Ok(LoopAction::Send(answer));
            }
        }

        if output.len() > self.state.previous_output_length {
            self.state.previous_output_length = output.len();
        } else if self.no_qa.iter().any(|pattern| pattern.is_match(output)) {
            tracing::trace!("Stall excused by no-qa pattern");
        } else {
            self.state.miss_count += 1;
            tracing::trace!(miss_count = self.state.miss_count, "No question matched");
        }

        if self.state.miss_count > self.max_miss_count {
            tracing::warn!(
                miss_count = self.state.miss_count,
                max_miss_count = self.max_miss_count,
                tail = %tail_excerpt(output, DIAGNOSTIC_TAIL_CHARS),
                "No question matched the output, killing the process group"
            );
            return Ok(LoopAction::Stop);
        }
        Ok(LoopAction::Continue)
    }

    fn process_output_final(&mut self, chunk: &[u8], output: &[u8]) -> Result<()> {
        if let Some(echo) = &mut self.echo {
            echo.process_output_final(chunk, output)?;
        }
        Ok(())
    }
}

impl fmt::Debug for QaEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QaEngine")
            .field("questions", &self.questions)
            .field("no_qa", &self.no_qa)
            .field("cycle_answers", &self.cycle_answers)
            .field("max_miss_count", &self.max_miss_count)
            .field("state", &self.state)
            .field("echo", &self.echo.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handler::TeeHandler;

    fn engine(spec: &QaSpec) -> QaEngine {
        QaEngine::new(spec, &QaConfig::default()).unwrap()
    }

    /// Feed `prompt` as a new chunk and return the answer sent, if any.
    fn ask(engine: &mut QaEngine, output: &mut Vec<u8>, prompt: &str) -> Option<String> {
        output.extend_from_slice(prompt.as_bytes());
        match engine.process_output(prompt.as_bytes(), output).unwrap() {
            LoopAction::Send(answer) => Some(String::from_utf8(answer).unwrap()),
            _ => None,
        }
    }

    #[test]
    fn single_answer_gets_newline() {
        let mut engine = engine(&QaSpec::new().question("Name:", "bob"));
        let mut output = Vec::new();
        assert_eq!(ask(&mut engine, &mut output, "Name: ").as_deref(), Some("bob\n"));
    }

    #[test]
    fn existing_newline_is_kept() {
        let mut engine = engine(&QaSpec::new().question("Name:", "bob\n"));
        let mut output = Vec::new();
        assert_eq!(ask(&mut engine, &mut output, "Name:").as_deref(), Some("bob\n"));
    }

    #[test]
    fn list_answers_cycle() {
        let mut engine = engine(&QaSpec::new().question("Next?", ["a", "b", "c"]));
        let mut output = Vec::new();
        let sent: Vec<_> = (0..5)
            .map(|_| ask(&mut engine, &mut output, "\nNext? ").unwrap())
            .collect();
        assert_eq!(sent, ["a\n", "b\n", "c\n", "a\n", "b\n"]);
    }

    #[test]
    fn list_answers_clamp_without_cycling() {
        let spec = QaSpec::new()
            .question("Next?", ["a", "b", "c"])
            .cycle_answers(false);
        let mut engine = engine(&spec);
        let mut output = Vec::new();
        let sent: Vec<_> = (0..5)
            .map(|_| ask(&mut engine, &mut output, "\nNext? ").unwrap())
            .collect();
        assert_eq!(sent, ["a\n", "b\n", "c\n", "c\n", "c\n"]);
    }

    #[test]
    fn two_element_list_without_cycling_repeats_last() {
        let spec = QaSpec::new().question("Q?", ["x", "y"]).cycle_answers(false);
        let mut engine = engine(&spec);
        let mut output = Vec::new();
        let sent: Vec<_> = (0..3)
            .map(|_| ask(&mut engine, &mut output, "Q?\n").unwrap())
            .collect();
        assert_eq!(sent, ["x\n", "y\n", "y\n"]);
    }

    #[test]
    fn literal_questions_win_over_regex() {
        let spec = QaSpec::new()
            .regex_question(r"Proceed\?", "regex")
            .question("Proceed?", "literal");
        let mut engine = engine(&spec);
        let mut output = Vec::new();
        assert_eq!(ask(&mut engine, &mut output, "Proceed?").as_deref(), Some("literal\n"));
    }

    #[test]
    fn question_split_across_chunks() {
        let mut engine = engine(&QaSpec::new().question("Enter your name:", "bob"));
        let mut output = Vec::new();
        assert_eq!(ask(&mut engine, &mut output, "Enter yo"), None);
        assert_eq!(ask(&mut engine, &mut output, "ur name: ").as_deref(), Some("bob\n"));
    }

    #[test]
    fn stale_question_is_not_answered() {
        let mut engine = engine(&QaSpec::new().question("Name:", "bob"));
        let mut output = Vec::new();
        assert!(ask(&mut engine, &mut output, "Name: ").is_some());
        assert!(ask(&mut engine, &mut output, "bob\nWelcome!\n").is_none());
    }

    #[test]
    fn named_groups_render_templates() {
        let spec = QaSpec::new().regex_question(
            r"Password for (?P<user>\w+)@(?P<host>\w+):",
            "%(user)s-on-%(host)s 100%%",
        );
        let mut engine = engine(&spec);
        let mut output = Vec::new();
        assert_eq!(
            ask(&mut engine, &mut output, "Password for alice@db1: ").as_deref(),
            Some("alice-on-db1 100%\n")
        );
    }

    #[test]
    fn templates_need_named_groups() {
        let spec = QaSpec::new().regex_question(r"Value (\d+)\?", "%(n)s");
        let mut engine = engine(&spec);
        let mut output = Vec::new();
        assert_eq!(ask(&mut engine, &mut output, "Value 3?").as_deref(), Some("%(n)s\n"));
    }

    #[test]
    fn unknown_template_group_is_config_error() {
        let spec = QaSpec::new().regex_question(r"User (?P<user>\w+)\?", "%(host)s");
        let err = QaEngine::new(&spec, &QaConfig::default()).unwrap_err();
        assert!(err.is_config());
    }

    #[test]
    fn invalid_regex_fails_construction() {
        let spec = QaSpec::new().regex_question("(", "x");
        assert!(QaEngine::new(&spec, &QaConfig::default()).is_err());
    }

    #[test]
    fn miss_count_rules() {
        let mut engine = engine(&QaSpec::new().question("Name:", "bob"));
        let mut output = b"starting\n".to_vec();

        // Growth is progress.
        engine.process_output(b"starting\n", &output).unwrap();
        assert_eq!(engine.state().miss_count, 0);
        assert_eq!(engine.state().previous_output_length, output.len());

        // No growth, no excuse.
        engine.process_output(b"", &output).unwrap();
        engine.process_output(b"", &output).unwrap();
        assert_eq!(engine.state().miss_count, 2);

        // Growth leaves the count alone; only an answer resets it.
        output.extend_from_slice(b"more\n");
        engine.process_output(b"more\n", &output).unwrap();
        assert_eq!(engine.state().miss_count, 2);

        assert!(ask(&mut engine, &mut output, "Name:").is_some());
        assert_eq!(engine.state().miss_count, 0);
    }

    #[test]
    fn no_qa_excuses_stall() {
        let spec = QaSpec::new()
            .question("Name:", "bob")
            .no_qa(r"Please wait \d+s")
            .max_miss_count(2);
        let mut engine = engine(&spec);
        let output = b"Please wait 5s\n".to_vec();
        engine.process_output(&output, &output).unwrap();
        for _ in 0..10 {
            assert_eq!(
                engine.process_output(b"", &output).unwrap(),
                LoopAction::Continue
            );
        }
        assert_eq!(engine.state().miss_count, 0);
    }

    #[test]
    fn gives_up_after_max_misses() {
        let spec = QaSpec::new().question("Name:", "bob").max_miss_count(3);
        let mut engine = engine(&spec);
        let output = b"stuck\n".to_vec();
        engine.process_output(&output, &output).unwrap();

        let mut actions = Vec::new();
        for _ in 0..4 {
            actions.push(engine.process_output(b"", &output).unwrap());
        }
        assert_eq!(actions[..3], [LoopAction::Continue, LoopAction::Continue, LoopAction::Continue]);
        assert_eq!(actions[3], LoopAction::Stop);
    }

    #[test]
    fn spec_policy_overrides_defaults() {
        let defaults = QaConfig {
            max_miss_count: 7,
            cycle_answers: true,
        };
        let engine = QaEngine::new(&QaSpec::new().cycle_answers(false), &defaults).unwrap();
        assert_eq!(engine.max_miss_count(), 7);
        assert!(!engine.cycle_answers());
    }

    #[test]
    fn final_drain_only_echoes() {
        let spec = QaSpec::new().question("Name:", "bob");
        let mut engine = engine(&spec).with_echo(Box::new(TeeHandler::new(std::io::sink())));
        engine.process_output_final(b"Name:", b"Name:").unwrap();
        assert_eq!(engine.state().answer_cursors, vec![0]);
    }
}
