//! Controlling terminal: raw mode, console I/O and one-shot restoration

use crate::app::Console;
use crate::keyboard::{ByteSource, StdinBytes};
use crate::ui::ResetScrollRegion;
use crossterm::cursor::{MoveTo, Show};
use crossterm::style::{Attribute, ResetColor, SetAttribute};
use crossterm::terminal::{self, disable_raw_mode, enable_raw_mode};
use crossterm::queue;
use log::{debug, warn};
use nix::fcntl::{fcntl, FcntlArg, OFlag};
use std::io::{self, BufWriter, Stdout, Write};
use std::os::unix::io::RawFd;
use std::panic;
use std::sync::atomic::{AtomicBool, AtomicI32, Ordering};

static CLEANED_UP: AtomicBool = AtomicBool::new(false);
/// Flags stdin had before it was made non-blocking; -1 until then
static STDIN_FLAGS: AtomicI32 = AtomicI32::new(-1);
static STDIN_FD: AtomicI32 = AtomicI32::new(-1);

/// The real terminal: non-blocking stdin and buffered stdout
pub struct StdConsole {
    input: StdinBytes,
    output: BufWriter<Stdout>,
}

impl StdConsole {
    /// Enter raw mode and make stdin non-blocking. Both are undone by
    /// [`cleanup`].
    pub fn open() -> io::Result<Self> {
        enable_raw_mode()?;
        let input = StdinBytes::open().inspect_err(|_| {
            let _ = disable_raw_mode();
        })?;
        STDIN_FD.store(input.fd(), Ordering::SeqCst);
        STDIN_FLAGS.store(input.original_flags().bits(), Ordering::SeqCst);
        CLEANED_UP.store(false, Ordering::SeqCst);
        Ok(Self {
            input,
            output: BufWriter::with_capacity(16 * 1024, io::stdout()),
        })
    }
}

impl ByteSource for StdConsole {
    fn read_byte(&mut self) -> io::Result<Option<u8>> {
        self.input.read_byte()
    }
}

impl Console for StdConsole {
    type Output = BufWriter<Stdout>;

    fn size(&self) -> io::Result<(u16, u16)> {
        terminal::size()
    }

    fn output(&mut self) -> &mut Self::Output {
        &mut self.output
    }
}

fn restore_stdin_flags() {
    let fd: RawFd = STDIN_FD.load(Ordering::SeqCst);
    let bits = STDIN_FLAGS.load(Ordering::SeqCst);
    if fd < 0 || bits < 0 {
        return;
    }
    if let Err(e) = fcntl(fd, FcntlArg::F_SETFL(OFlag::from_bits_truncate(bits))) {
        warn!("could not restore stdin flags: {}", e);
    }
}

/// Put the terminal back the way it was. Runs once; later calls do nothing.
///
/// Returns whether this call did the work.
pub fn cleanup() -> bool {
    if CLEANED_UP.swap(true, Ordering::SeqCst) {
        return false;
    }

    let mut out = io::stdout();
    let rows = terminal::size().map(|(_, rows)| rows).unwrap_or(1);
    let _ = queue!(
        out,
        ResetScrollRegion,
        SetAttribute(Attribute::Reset),
        ResetColor,
        MoveTo(0, rows.saturating_sub(1)),
        Show
    );
    let _ = out.write_all(b"\r\n");
    let _ = out.flush();

    if let Err(e) = disable_raw_mode() {
        warn!("could not leave raw mode: {}", e);
    }
    restore_stdin_flags();
    debug!("terminal restored");
    true
}

/// Restore the terminal before the default panic message is printed.
pub fn install_panic_hook() {
    let default_hook = panic::take_hook();
    panic::set_hook(Box::new(move |info| {
        cleanup();
        default_hook(info);
    }));
}
