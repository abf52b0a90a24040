//! Process launcher.
//!
//! Turns a [`Command`] into exactly one child of `<shell> -c <line>`, wires
//! its stdio for the chosen [`Backend`], and hands back the
//! [`ProcessHandle`] plus the matching [`OutputReader`].
//!
//! The child always leads its own process group (or its own session for the
//! PTY backend), so [`ProcessHandle::kill_tree`] can take down the shell and
//! every grandchild it started without touching the caller.

use std::fs::File;
use std::io::{self, Write as _};
use std::os::unix::io::OwnedFd;
use std::path::PathBuf;
use std::process::{ExitStatus, Stdio};

use rustix::io::Errno;
use rustix::pipe::{PipeFlags, pipe_with};
use rustix::process::{Pid, Signal, getpgid, getpgrp, kill_process_group};
use tokio::io::AsyncWriteExt;
use tokio::process::{Child, ChildStdin};

use crate::command::Command;
use crate::error::{Result, RunError, SpawnError};
use crate::pty::{PtyPair, os_error};
use crate::reader::{FileSink, OutputReader, PipeReader, PtySink};

/// How the child's stdio is wired.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Backend {
    /// Pipe for stdin, shared pipe for stdout+stderr, bounded blocking reads.
    Pipe,
    /// Like [`Backend::Pipe`], but reads return whatever is available.
    AsyncPipe,
    /// stdout+stderr redirected to a file; output is not captured.
    File(PathBuf),
    /// stdin, stdout and stderr attached to a pseudo-terminal.
    Pty,
}

impl Backend {
    /// Short name for logging.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Pipe => "pipe",
            Self::AsyncPipe => "async-pipe",
            Self::File(_) => "file",
            Self::Pty => "pty",
        }
    }

    /// Whether output can be read back incrementally.
    #[must_use]
    pub const fn captures_output(&self) -> bool {
        matches!(self, Self::Pipe | Self::AsyncPipe)
    }
}

/// Spawns children for one backend.
#[derive(Debug, Clone)]
pub struct Launcher {
    shell: PathBuf,
    backend: Backend,
    working_dir: Option<PathBuf>,
}

impl Launcher {
    /// Create a launcher using `shell` to interpret command lines.
    #[must_use]
    pub fn new(shell: impl Into<PathBuf>, backend: Backend) -> Self {
        Self {
            shell: shell.into(),
            backend,
            working_dir: None,
        }
    }

    /// Run the child in `dir` instead of the caller's working directory.
    #[must_use]
    pub fn working_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_dir = Some(dir.into());
        self
    }

    /// The backend this launcher wires.
    #[must_use]
    pub const fn backend(&self) -> &Backend {
        &self.backend
    }

    /// Validate the working directory, if one is set.
    pub fn check_working_dir(&self) -> std::result::Result<(), SpawnError> {
        let Some(dir) = &self.working_dir else {
            return Ok(());
        };
        match std::fs::metadata(dir) {
            Ok(meta) if meta.is_dir() => Ok(()),
            Ok(_) => Err(SpawnError::invalid_working_dir(dir, "not a directory")),
            Err(e) => Err(SpawnError::invalid_working_dir(dir, e.to_string())),
        }
    }

    /// Spawn the child.
    ///
    /// Must be called from within a tokio runtime.
    pub fn spawn(&self, command: &Command) -> Result<(ProcessHandle, OutputReader)> {
        if command.is_empty() {
            return Err(SpawnError::EmptyCommand.into());
        }
        self.check_working_dir()?;

        let line = command.shell_line();
        let mut cmd = tokio::process::Command::new(&self.shell);
        cmd.arg("-c").arg(&line).kill_on_drop(true);
        if let Some(dir) = &self.working_dir {
            cmd.current_dir(dir);
        }

        let wiring = self.wire(&mut cmd)?;
        let mut child = cmd.spawn().map_err(SpawnError::Io)?;
        // The parent's copies of the child's stdio must close now, or the
        // output pipe never reports EOF.
        drop(cmd);

        let pid = child.id().ok_or_else(|| {
            SpawnError::Io(io::Error::other("child exited before its pid was read"))
        })?;
        let pgid = match process_group_of(pid) {
            Ok(pgid) => Some(pgid),
            Err(e) => {
                tracing::warn!(pid, error = %e, "Child does not lead its own process group");
                None
            }
        };

        let (input, reader) = match wiring {
            Wiring::Pipe(rx) => {
                let reader = PipeReader::new(rx).map_err(SpawnError::Pipe)?;
                let reader = if self.backend == Backend::AsyncPipe {
                    OutputReader::AsyncPipe(reader)
                } else {
                    OutputReader::Pipe(reader)
                };
                (Input::from_child(&mut child), reader)
            }
            Wiring::File(path, file) => (
                Input::from_child(&mut child),
                OutputReader::File(FileSink::new(path, file)),
            ),
            Wiring::Pty(master) => {
                let writer = master.try_clone().map_err(SpawnError::PtyAllocation)?;
                (
                    Input::Pty(File::from(writer)),
                    OutputReader::Pty(PtySink::new(master)),
                )
            }
        };

        tracing::debug!(
            pid,
            shell = %self.shell.display(),
            backend = self.backend.name(),
            command = %line,
            "Spawned child"
        );

        Ok((
            ProcessHandle {
                child,
                pid,
                pgid,
                input,
                status: None,
            },
            reader,
        ))
    }

    fn wire(&self, cmd: &mut tokio::process::Command) -> Result<Wiring> {
        match &self.backend {
            Backend::Pipe | Backend::AsyncPipe => {
                let (rx, tx) =
                    pipe_with(PipeFlags::CLOEXEC).map_err(|e| SpawnError::Pipe(os_error(e)))?;
                let tx_err = tx.try_clone().map_err(SpawnError::Pipe)?;
                cmd.stdin(Stdio::piped())
                    .stdout(Stdio::from(tx))
                    .stderr(Stdio::from(tx_err))
                    .process_group(0);
                Ok(Wiring::Pipe(rx))
            }
            Backend::File(path) => {
                let file = File::create(path).map_err(|source| SpawnError::OutputFile {
                    path: path.clone(),
                    source,
                })?;
                let out = file.try_clone().map_err(SpawnError::Io)?;
                let err = file.try_clone().map_err(SpawnError::Io)?;
                cmd.stdin(Stdio::piped())
                    .stdout(Stdio::from(out))
                    .stderr(Stdio::from(err))
                    .process_group(0);
                Ok(Wiring::File(path.clone(), file))
            }
            Backend::Pty => {
                let pair = PtyPair::open().map_err(SpawnError::PtyAllocation)?;
                let stdin = pair.slave.try_clone().map_err(SpawnError::PtyAllocation)?;
                let stdout = pair.slave.try_clone().map_err(SpawnError::PtyAllocation)?;
                cmd.stdin(Stdio::from(stdin))
                    .stdout(Stdio::from(stdout))
                    .stderr(Stdio::from(pair.slave));
                // SAFETY: setsid and ioctl are async-signal-safe. By the time
                // this runs, fd 0 is the PTY slave.
                #[allow(unsafe_code)]
                unsafe {
                    cmd.pre_exec(|| {
                        if libc::setsid() == -1 {
                            return Err(io::Error::last_os_error());
                        }
                        if libc::ioctl(0, libc::TIOCSCTTY, 0) == -1 {
                            return Err(io::Error::last_os_error());
                        }
                        Ok(())
                    });
                }
                Ok(Wiring::Pty(pair.master))
            }
        }
    }
}

/// Parent-side ends kept until the child is spawned.
enum Wiring {
    Pipe(OwnedFd),
    File(PathBuf, File),
    Pty(OwnedFd),
}

/// The child's standard input as seen by the parent.
#[derive(Debug)]
enum Input {
    Pipe(ChildStdin),
    Pty(File),
    Closed,
}

impl Input {
    fn from_child(child: &mut Child) -> Self {
        child.stdin.take().map_or(Self::Closed, Self::Pipe)
    }
}

/// Owns one spawned child for the lifetime of a run.
///
/// Dropping a handle whose child has not been reaped kills the child's
/// process group.
#[derive(Debug)]
pub struct ProcessHandle {
    child: Child,
    pid: u32,
    /// Recorded at spawn so the group can be killed after the leader is reaped.
    pgid: Option<Pid>,
    input: Input,
    status: Option<ExitStatus>,
}

impl ProcessHandle {
    /// The child's process id.
    #[must_use]
    pub const fn pid(&self) -> u32 {
        self.pid
    }

    /// Exit status, once the child has been reaped.
    #[must_use]
    pub const fn status(&self) -> Option<ExitStatus> {
        self.status
    }

    /// Write `data` to the child's stdin.
    pub async fn send(&mut self, data: &[u8]) -> io::Result<()> {
        match &mut self.input {
            Input::Pipe(stdin) => {
                stdin.write_all(data).await?;
                stdin.flush().await
            }
            Input::Pty(master) => {
                master.write_all(data)?;
                master.flush()
            }
            Input::Closed => Err(io::Error::new(
                io::ErrorKind::BrokenPipe,
                "child stdin is closed",
            )),
        }
    }

    /// Close the parent's side of stdin so the child sees end of input.
    pub async fn close_input(&mut self) {
        if let Input::Pipe(stdin) = &mut self.input {
            if let Err(e) = stdin.shutdown().await {
                tracing::debug!(pid = self.pid, error = %e, "Error closing child stdin");
            }
        }
        self.input = Input::Closed;
    }

    /// Non-blocking liveness check. `Some` once the child has exited.
    pub fn poll(&mut self) -> Result<Option<ExitStatus>> {
        if self.status.is_none() {
            self.status = RunError::with_io_context(self.child.try_wait(), "polling child")?;
        }
        Ok(self.status)
    }

    /// Wait for the child to exit.
    pub async fn wait(&mut self) -> Result<ExitStatus> {
        if let Some(status) = self.status {
            return Ok(status);
        }
        let status = RunError::with_io_context(self.child.wait().await, "waiting for child")?;
        self.status = Some(status);
        Ok(status)
    }

    /// Kill the child's process group, then the child itself as a fallback.
    ///
    /// The group is signalled even after the child has been reaped, so
    /// descendants that outlived the shell die too.
    pub fn kill_tree(&mut self) {
        if let Some(pgid) = self.pgid {
            let raw = pgid.as_raw_nonzero().get();
            match kill_process_group(pgid, Signal::KILL) {
                Ok(()) => tracing::debug!(pid = self.pid, pgid = raw, "Killed process group"),
                Err(Errno::SRCH) => {
                    tracing::trace!(pid = self.pid, pgid = raw, "Process group already empty");
                }
                Err(e) => tracing::warn!(
                    pid = self.pid,
                    pgid = raw,
                    error = %os_error(e),
                    "Failed to kill process group"
                ),
            }
        }
        if self.status.is_none() {
            if let Err(e) = self.child.start_kill() {
                tracing::debug!(pid = self.pid, error = %e, "Direct kill of child failed");
            }
        }
    }

    /// Kill the process tree and reap the child.
    pub async fn terminate(&mut self) -> Result<ExitStatus> {
        self.kill_tree();
        self.wait().await
    }
}

impl Drop for ProcessHandle {
    fn drop(&mut self) {
        if self.status.is_none() {
            if let Ok(Some(status)) = self.child.try_wait() {
                self.status = Some(status);
                return;
            }
            tracing::debug!(pid = self.pid, "Killing unreaped child on drop");
            self.kill_tree();
        }
    }
}

/// The process group led by `pid`, refusing the caller's own group.
fn process_group_of(pid: u32) -> io::Result<Pid> {
    let invalid = || io::Error::new(io::ErrorKind::InvalidInput, "invalid pid");
    let raw = i32::try_from(pid).map_err(|_| invalid())?;
    let pid = Pid::from_raw(raw).ok_or_else(invalid)?;
    let pgid = getpgid(Some(pid)).map_err(os_error)?;
    if pgid == getpgrp() {
        return Err(io::Error::new(
            io::ErrorKind::PermissionDenied,
            "child shares the caller's process group",
        ));
    }
    Ok(pgid)
}
