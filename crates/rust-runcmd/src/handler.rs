//! Per-chunk output handlers for the loop strategy.
//!
//! The loop appends every chunk to the accumulated output and then hands
//! both to a [`ChunkHandler`]. The handler decides what happens next through
//! the [`LoopAction`] it returns.

use std::fmt;
use std::io::{self, Write};

use crate::error::Result;

/// What the loop should do after a chunk was handled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoopAction {
    /// Keep polling.
    Continue,
    /// Write these bytes to the child's stdin, then keep polling.
    Send(Vec<u8>),
    /// Kill the child's process group and leave the loop.
    Stop,
}

/// Reacts to output as the loop reads it.
pub trait ChunkHandler: Send {
    /// Handle one chunk.
    ///
    /// `chunk` is what was just read (possibly empty); `output` is everything
    /// read so far, `chunk` included.
    fn process_output(&mut self, chunk: &[u8], output: &[u8]) -> Result<LoopAction>;

    /// Handle the final drain after the loop ended.
    ///
    /// The child is gone or being killed by then, so any action is ignored.
    fn process_output_final(&mut self, chunk: &[u8], output: &[u8]) -> Result<()> {
        self.process_output(chunk, output).map(drop)
    }
}

impl<H: ChunkHandler + ?Sized> ChunkHandler for Box<H> {
    fn process_output(&mut self, chunk: &[u8], output: &[u8]) -> Result<LoopAction> {
        (**self).process_output(chunk, output)
    }

    fn process_output_final(&mut self, chunk: &[u8], output: &[u8]) -> Result<()> {
        (**self).process_output_final(chunk, output)
    }
}

/// Accumulates output without reacting to it.
#[derive(Debug, Clone, Copy, Default)]
pub struct Collect;

impl ChunkHandler for Collect {
    fn process_output(&mut self, _chunk: &[u8], _output: &[u8]) -> Result<LoopAction> {
        Ok(LoopAction::Continue)
    }
}

/// Forwards each chunk to `tracing` at info level.
#[derive(Debug, Clone, Default)]
pub struct LogHandler {
    label: Option<String>,
}

impl LogHandler {
    /// Create a handler.
    #[must_use]
    pub const fn new() -> Self {
        Self { label: None }
    }

    /// Tag every event with `label`, typically the command.
    #[must_use]
    pub fn labelled(label: impl Into<String>) -> Self {
        Self {
            label: Some(label.into()),
        }
    }
}

impl ChunkHandler for LogHandler {
    fn process_output(&mut self, chunk: &[u8], _output: &[u8]) -> Result<LoopAction> {
        if !chunk.is_empty() {
            let text = String::from_utf8_lossy(chunk);
            match &self.label {
                Some(label) => tracing::info!(command = %label, output = %text.trim_end(), "Child output"),
                None => tracing::info!(output = %text.trim_end(), "Child output"),
            }
        }
        Ok(LoopAction::Continue)
    }
}

/// Copies each chunk to a writer as it arrives.
pub struct TeeHandler<W> {
    writer: W,
}

impl TeeHandler<io::Stdout> {
    /// Tee to the caller's stdout.
    #[must_use]
    pub fn stdout() -> Self {
        Self::new(io::stdout())
    }
}

impl<W: Write + Send> TeeHandler<W> {
    /// Tee to `writer`.
    #[must_use]
    pub const fn new(writer: W) -> Self {
        Self { writer }
    }

    /// Recover the writer.
    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl<W> fmt::Debug for TeeHandler<W> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TeeHandler").finish_non_exhaustive()
    }
}

impl<W: Write + Send> ChunkHandler for TeeHandler<W> {
    fn process_output(&mut self, chunk: &[u8], _output: &[u8]) -> Result<LoopAction> {
        if !chunk.is_empty() {
            if let Err(e) = self.writer.write_all(chunk).and_then(|()| self.writer.flush()) {
                tracing::warn!(error = %e, "Failed to echo child output");
            }
        }
        Ok(LoopAction::Continue)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn collect_always_continues() {
        let mut handler = Collect;
        assert_eq!(
            handler.process_output(b"x", b"x").unwrap(),
            LoopAction::Continue
        );
        assert!(handler.process_output_final(b"", b"x").is_ok());
    }

    #[test]
    fn tee_copies_chunks() {
        let mut handler = TeeHandler::new(Vec::new());
        handler.process_output(b"hello ", b"hello ").unwrap();
        handler.process_output(b"", b"hello ").unwrap();
        handler.process_output_final(b"world", b"hello world").unwrap();
        assert_eq!(handler.into_inner(), b"hello world");
    }

    #[test]
    fn boxed_handlers_delegate() {
        let mut handler: Box<dyn ChunkHandler> = Box::new(LogHandler::labelled("echo hi"));
        assert_eq!(
            handler.process_output(b"hi\n", b"hi\n").unwrap(),
            LoopAction::Continue
        );
    }
}
