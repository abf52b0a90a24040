//! Output readers.
//!
//! Every reader answers "give me the next chunk of output". What that means
//! depends on how the child's stdout was wired by the launcher:
//!
//! - [`OutputReader::Pipe`]: bounded reads that only come back short at end
//!   of stream.
//! - [`OutputReader::AsyncPipe`]: returns whatever is available right now,
//!   possibly nothing. The loop's sleep cadence is the only backpressure.
//!   The final read after exit does not wait for end of stream either, so a
//!   background job still holding the pipe cannot hold up the run.
//! - [`OutputReader::File`]: output goes straight to a file; reads are empty.
//! - [`OutputReader::Pty`]: the child talks to a terminal; reads are empty.
//!
//! Read errors never propagate. They are logged and count as "no output".

use std::fs::File;
use std::io;
use std::os::unix::io::OwnedFd;
use std::path::PathBuf;
use std::time::Duration;

use tokio::io::AsyncReadExt;
use tokio::net::unix::pipe;

use crate::deadline::Deadline;

/// Size of the scratch buffer used for a single `read` call.
const SCRATCH_SIZE: usize = 8192;

/// Reader over the child's combined stdout/stderr.
#[derive(Debug)]
pub enum OutputReader {
    /// Blocking, bounded pipe reads.
    Pipe(PipeReader),
    /// Non-blocking pipe reads.
    AsyncPipe(PipeReader),
    /// Output redirected to a file.
    File(FileSink),
    /// Output written to a pseudo-terminal.
    Pty(PtySink),
}

impl OutputReader {
    /// Short name of the reader variant, for logging.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Pipe(_) => "pipe",
            Self::AsyncPipe(_) => "async-pipe",
            Self::File(_) => "file",
            Self::Pty(_) => "pty",
        }
    }

    /// Read the next chunk.
    ///
    /// `read_size` bounds blocking pipe reads; `deadline`, when set, cuts a
    /// blocking read short and returns what arrived so far.
    pub async fn read_chunk(&mut self, read_size: usize, deadline: Option<&Deadline>) -> Vec<u8> {
        match self {
            Self::Pipe(reader) => reader.read_bounded(read_size, deadline).await,
            Self::AsyncPipe(reader) => reader.read_available(),
            Self::File(_) | Self::Pty(_) => Vec::new(),
        }
    }

    /// Read everything left until end of stream.
    pub async fn read_remaining(&mut self) -> Vec<u8> {
        match self {
            Self::Pipe(reader) | Self::AsyncPipe(reader) => reader.read_remaining(None).await.output,
            Self::File(_) | Self::Pty(_) => Vec::new(),
        }
    }

    /// Collect what is left once the child has exited.
    ///
    /// Blocking pipes read to end of stream, cut short by `deadline`. Async
    /// pipes wait at most `settle` for the pipe to become readable and take
    /// what is there.
    pub async fn drain(&mut self, settle: Duration, deadline: Option<&Deadline>) -> Drain {
        match self {
            Self::Pipe(reader) => reader.read_remaining(deadline).await,
            Self::AsyncPipe(reader) => {
                let settle = deadline.map_or(settle, |d| settle.min(d.remaining()));
                Drain::complete(reader.read_settled(settle).await)
            }
            Self::File(_) | Self::Pty(_) => Drain::default(),
        }
    }

    /// Release any handle held for the redirection.
    pub fn close(&mut self) {
        match self {
            Self::Pipe(_) | Self::AsyncPipe(_) => {}
            Self::File(sink) => sink.close(),
            Self::Pty(sink) => sink.close(),
        }
    }
}

/// Output collected by a final drain.
#[derive(Debug, Default)]
pub struct Drain {
    /// Bytes read.
    pub output: Vec<u8>,
    /// The deadline passed before the stream ended.
    pub expired: bool,
}

impl Drain {
    const fn complete(output: Vec<u8>) -> Self {
        Self {
            output,
            expired: false,
        }
    }
}

/// Read side of the output pipe.
#[derive(Debug)]
pub struct PipeReader {
    pipe: pipe::Receiver,
    /// Bytes read but not yet handed out.
    pending: Vec<u8>,
    eof: bool,
}

impl PipeReader {
    /// Wrap the read end of an anonymous pipe.
    ///
    /// Must be called from within a tokio runtime.
    pub fn new(fd: OwnedFd) -> io::Result<Self> {
        Ok(Self {
            pipe: pipe::Receiver::from_owned_fd(fd)?,
            pending: Vec::new(),
            eof: false,
        })
    }

    /// Whether end of stream has been seen.
    #[must_use]
    pub const fn is_eof(&self) -> bool {
        self.eof
    }

    /// Read into `pending` until it holds `limit` bytes or the stream ends.
    async fn fill(&mut self, limit: usize) -> io::Result<()> {
        let mut scratch = [0u8; SCRATCH_SIZE];
        while !self.eof && self.pending.len() < limit {
            let want = (limit - self.pending.len()).min(SCRATCH_SIZE);
            let n = self.pipe.read(&mut scratch[..want]).await?;
            if n == 0 {
                self.eof = true;
            } else {
                self.pending.extend_from_slice(&scratch[..n]);
            }
        }
        Ok(())
    }

    /// Like [`Self::fill`], bounded by `deadline`. `Ok(true)` when the
    /// deadline passed first; what was read so far is kept.
    async fn fill_until(&mut self, limit: usize, deadline: Option<&Deadline>) -> io::Result<bool> {
        match deadline {
            Some(deadline) => match deadline.apply(self.fill(limit)).await {
                Ok(filled) => filled.map(|()| false),
                Err(_) => Ok(true),
            },
            None => self.fill(limit).await.map(|()| false),
        }
    }

    /// Read up to `limit` bytes, blocking until that many arrived or EOF.
    pub async fn read_bounded(&mut self, limit: usize, deadline: Option<&Deadline>) -> Vec<u8> {
        if let Err(e) = self.fill_until(limit.max(1), deadline).await {
            tracing::warn!(error = %e, "Error reading child output, treating as no output");
        }
        let take = self.pending.len().min(limit.max(1));
        self.pending.drain(..take).collect()
    }

    /// Read whatever is available without waiting.
    pub fn read_available(&mut self) -> Vec<u8> {
        let mut out = std::mem::take(&mut self.pending);
        let mut scratch = [0u8; SCRATCH_SIZE];
        while !self.eof {
            match self.pipe.try_read(&mut scratch) {
                Ok(0) => self.eof = true,
                Ok(n) => out.extend_from_slice(&scratch[..n]),
                Err(e) if e.kind() == io::ErrorKind::WouldBlock => break,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
                Err(e) => {
                    tracing::warn!(error = %e, "Error reading child output, treating as no output");
                    break;
                }
            }
        }
        out
    }

    /// Wait up to `settle` for the pipe to become readable, then take
    /// whatever is available.
    pub async fn read_settled(&mut self, settle: Duration) -> Vec<u8> {
        if !self.is_eof() && self.pending.is_empty() {
            if let Ok(Err(e)) = tokio::time::timeout(settle, self.pipe.readable()).await {
                tracing::warn!(error = %e, "Error waiting for child output");
            }
        }
        self.read_available()
    }

    /// Read until end of stream or `deadline`.
    pub async fn read_remaining(&mut self, deadline: Option<&Deadline>) -> Drain {
        let expired = match self.fill_until(usize::MAX, deadline).await {
            Ok(expired) => expired,
            Err(e) => {
                tracing::warn!(error = %e, "Error draining child output");
                false
            }
        };
        Drain {
            output: std::mem::take(&mut self.pending),
            expired,
        }
    }
}

/// Output redirected to a file by the OS.
#[derive(Debug)]
pub struct FileSink {
    path: PathBuf,
    file: Option<File>,
}

impl FileSink {
    pub(crate) const fn new(path: PathBuf, file: File) -> Self {
        Self {
            path,
            file: Some(file),
        }
    }

    /// The redirect target.
    #[must_use]
    pub const fn path(&self) -> &PathBuf {
        &self.path
    }

    /// Whether the parent's handle is still open.
    #[must_use]
    pub const fn is_open(&self) -> bool {
        self.file.is_some()
    }

    fn close(&mut self) {
        if let Some(file) = self.file.take() {
            if let Err(e) = file.sync_all() {
                tracing::debug!(path = %self.path.display(), error = %e, "Failed to sync output file");
            }
            drop(file);
            tracing::trace!(path = %self.path.display(), "Closed output file");
        }
    }
}

/// Master side of the pseudo-terminal, held so the terminal outlives the child.
#[derive(Debug)]
pub struct PtySink {
    master: Option<OwnedFd>,
}

impl PtySink {
    pub(crate) const fn new(master: OwnedFd) -> Self {
        Self {
            master: Some(master),
        }
    }

    fn close(&mut self) {
        self.master.take();
    }
}
