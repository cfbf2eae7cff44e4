use std::fs::File;
use std::io::{Read, Write};
use std::os::fd::{AsFd, AsRawFd, BorrowedFd, FromRawFd, OwnedFd, RawFd};

use tracing::trace;

use crate::error::{Result, TransportError};

/// Read end of an OS pipe.
#[derive(Debug)]
pub struct PipeReader {
    file: File,
}

/// Write end of an OS pipe.
#[derive(Debug)]
pub struct PipeWriter {
    file: File,
}

/// Create an anonymous OS pipe.
///
/// Both ends are close-on-exec. The pipe is unidirectional: bytes written to
/// the [`PipeWriter`] come out of the [`PipeReader`] in order. Once every
/// writer descriptor is closed, reads drain what is left and then return 0.
pub fn pipe() -> Result<(PipeReader, PipeWriter)> {
    let mut fds: [libc::c_int; 2] = [-1, -1];

    // SAFETY: `fds` is a valid, writable array of two descriptors as pipe(2) requires.
    let rc = unsafe { libc::pipe(fds.as_mut_ptr()) };
    if rc != 0 {
        return Err(TransportError::Pipe(std::io::Error::last_os_error()));
    }

    // SAFETY: pipe(2) succeeded, so both descriptors are open and owned by nobody else.
    let (read_fd, write_fd) = unsafe { (OwnedFd::from_raw_fd(fds[0]), OwnedFd::from_raw_fd(fds[1])) };
    set_cloexec(&read_fd)?;
    set_cloexec(&write_fd)?;

    trace!(
        read_fd = read_fd.as_raw_fd(),
        write_fd = write_fd.as_raw_fd(),
        "created pipe"
    );

    Ok((
        PipeReader {
            file: File::from(read_fd),
        },
        PipeWriter {
            file: File::from(write_fd),
        },
    ))
}

fn set_cloexec(fd: &OwnedFd) -> Result<()> {
    let raw = fd.as_raw_fd();
    // SAFETY: `raw` is an open descriptor owned by `fd` for the duration of both calls.
    let flags = unsafe { libc::fcntl(raw, libc::F_GETFD) };
    if flags < 0 {
        return Err(TransportError::Pipe(std::io::Error::last_os_error()));
    }
    // SAFETY: as above; only the FD_CLOEXEC bit is added.
    let rc = unsafe { libc::fcntl(raw, libc::F_SETFD, flags | libc::FD_CLOEXEC) };
    if rc < 0 {
        return Err(TransportError::Pipe(std::io::Error::last_os_error()));
    }
    Ok(())
}

impl PipeReader {
    /// Duplicate the descriptor.
    pub fn try_clone(&self) -> Result<Self> {
        Ok(Self {
            file: self.file.try_clone()?,
        })
    }
}

impl PipeWriter {
    /// Duplicate the descriptor.
    pub fn try_clone(&self) -> Result<Self> {
        Ok(Self {
            file: self.file.try_clone()?,
        })
    }
}

impl Read for PipeReader {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        self.file.read(buf)
    }
}

impl Write for PipeWriter {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.file.write(buf)
    }

    fn flush(&mut self) -> std::io::Result<()> {
        self.file.flush()
    }
}

impl AsFd for PipeReader {
    fn as_fd(&self) -> BorrowedFd<'_> {
        self.file.as_fd()
    }
}

impl AsRawFd for PipeReader {
    fn as_raw_fd(&self) -> RawFd {
        self.file.as_raw_fd()
    }
}

impl AsFd for PipeWriter {
    fn as_fd(&self) -> BorrowedFd<'_> {
        self.file.as_fd()
    }
}

impl AsRawFd for PipeWriter {
    fn as_raw_fd(&self) -> RawFd {
        self.file.as_raw_fd()
    }
}
