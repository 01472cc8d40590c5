//! Non-blocking byte input

use nix::errno::Errno;
use nix::fcntl::{fcntl, FcntlArg, OFlag};
use nix::libc;
use nix::unistd;
use std::collections::VecDeque;
use std::io;
use std::os::unix::io::RawFd;

/// Source of single input bytes. `Ok(None)` means nothing is available yet.
pub trait ByteSource {
    fn read_byte(&mut self) -> io::Result<Option<u8>>;
}

impl ByteSource for VecDeque<u8> {
    fn read_byte(&mut self) -> io::Result<Option<u8>> {
        Ok(self.pop_front())
    }
}

/// Standard input switched to `O_NONBLOCK`
pub struct StdinBytes {
    fd: RawFd,
    original_flags: OFlag,
}

impl StdinBytes {
    /// Put stdin into non-blocking mode. The previous flags are kept so
    /// [`StdinBytes::original_flags`] can be restored at exit.
    pub fn open() -> io::Result<Self> {
        let fd = libc::STDIN_FILENO;
        let original_flags = OFlag::from_bits_truncate(fcntl(fd, FcntlArg::F_GETFL)?);
        fcntl(fd, FcntlArg::F_SETFL(original_flags | OFlag::O_NONBLOCK))?;
        Ok(Self { fd, original_flags })
    }

    pub fn original_flags(&self) -> OFlag {
        self.original_flags
    }

    pub fn fd(&self) -> RawFd {
        self.fd
    }
}

impl ByteSource for StdinBytes {
    fn read_byte(&mut self) -> io::Result<Option<u8>> {
        let mut buf = [0u8; 1];
        match unistd::read(self.fd, &mut buf) {
            Ok(1) => Ok(Some(buf[0])),
            Ok(_) => Ok(None),
            Err(Errno::EAGAIN) | Err(Errno::EINTR) => Ok(None),
            Err(e) => Err(io::Error::from(e)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn queue_source_drains_in_order() {
        let mut source: VecDeque<u8> = VecDeque::from(vec![1, 2]);
        assert_eq!(source.read_byte().unwrap(), Some(1));
        assert_eq!(source.read_byte().unwrap(), Some(2));
        assert_eq!(source.read_byte().unwrap(), None);
    }
}
