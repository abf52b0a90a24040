//! Pseudo-terminal allocation for the PTY backend.
//!
//! Only the pair of file descriptors is managed here. The child gets the
//! slave side as stdin, stdout and stderr; the master side stays with the
//! run session so the terminal lives as long as the child does.

use std::io;
use std::os::unix::io::OwnedFd;
use std::path::Path;

use rustix::fs::{Mode, OFlags, open};
use rustix::io::{FdFlags, fcntl_setfd};
use rustix::pty::{OpenptFlags, grantpt, openpt, ptsname, unlockpt};
use rustix::termios::{Winsize, tcsetwinsize};

/// Terminal size given to the child (columns, rows).
pub const PTY_WINDOW_SIZE: (u16, u16) = (80, 24);

pub(crate) fn os_error(errno: rustix::io::Errno) -> io::Error {
    io::Error::from_raw_os_error(errno.raw_os_error())
}

/// An allocated master/slave pair.
#[derive(Debug)]
pub struct PtyPair {
    /// Master side, kept by the parent.
    pub master: OwnedFd,
    /// Slave side, handed to the child.
    pub slave: OwnedFd,
    /// Path of the slave device.
    pub slave_path: String,
}

impl PtyPair {
    /// Allocate a new pseudo-terminal pair.
    ///
    /// Both descriptors are close-on-exec; the child receives duplicates of
    /// the slave through its stdio.
    pub fn open() -> io::Result<Self> {
        let master = openpt(OpenptFlags::RDWR | OpenptFlags::NOCTTY).map_err(os_error)?;
        fcntl_setfd(&master, FdFlags::CLOEXEC).map_err(os_error)?;
        grantpt(&master).map_err(os_error)?;
        unlockpt(&master).map_err(os_error)?;

        let slave_name = ptsname(&master, Vec::new()).map_err(os_error)?;
        let slave_path = slave_name
            .to_str()
            .map_err(|_| io::Error::new(io::ErrorKind::InvalidData, "invalid slave path encoding"))?
            .to_string();

        let slave = open(
            Path::new(&slave_path),
            OFlags::RDWR | OFlags::NOCTTY | OFlags::CLOEXEC,
            Mode::empty(),
        )
        .map_err(os_error)?;

        let (cols, rows) = PTY_WINDOW_SIZE;
        let winsize = Winsize {
            ws_col: cols,
            ws_row: rows,
            ws_xpixel: 0,
            ws_ypixel: 0,
        };
        tcsetwinsize(&master, winsize).map_err(os_error)?;

        tracing::trace!(slave = %slave_path, "Allocated PTY");

        Ok(Self {
            master,
            slave,
            slave_path,
        })
    }
}
