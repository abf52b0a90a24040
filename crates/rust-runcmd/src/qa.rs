//! Automated question/answer interaction.
//!
//! A [`QaSpec`] lists the prompts a child may print and what to answer. The
//! [`QaEngine`] compiles it and plugs into the loop strategy as a
//! [`ChunkHandler`](crate::ChunkHandler): on every chunk it checks whether the
//! accumulated output now ends in a known prompt, answers it, and gives up on
//! a child that stopped making progress.
//!
//! # Example
//!
//! ```ignore
//! use rust_runcmd::prelude::*;
//!
//! let qa = QaSpec::new()
//!     .question("Continue? [y/n]", "y")
//!     .question("Pick a color:", ["red", "green"])
//!     .no_qa(r"Please wait \d+ seconds");
//! let result = run_qa("./installer.sh", qa).await?;
//! ```

pub mod engine;
pub mod pattern;
pub mod spec;

pub use engine::{InteractionState, QaEngine};
pub use pattern::{compile_question, compile_tail_regex, question_pattern};
pub use spec::{Answer, QaEntry, QaSpec};
