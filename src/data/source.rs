//! Data line sources
//!
//! A serial device (or any readable path such as a FIFO) opened non-blocking,
//! and a synthetic generator used when no device is configured or the device
//! can't be opened.

use crate::config::{Parity, SerialConfig, SyntheticConfig};
use log::{debug, info, warn};
use nix::libc;
use nix::sys::termios::{self, BaudRate, ControlFlags, SetArg};
use std::collections::VecDeque;
use std::fs::{File, OpenOptions};
use std::io::{self, IsTerminal, Read};
use std::os::unix::fs::OpenOptionsExt;
use std::path::PathBuf;
use std::time::{Duration, Instant};
use thiserror::Error;

/// Longest partial line kept while waiting for its newline
pub const MAX_LINE_BYTES: usize = 4096;

/// Error type for data sources
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("cannot open {path}: {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("cannot configure {path}: {source}")]
    Configure {
        path: PathBuf,
        #[source]
        source: nix::Error,
    },
    #[error("unsupported baud rate {0}")]
    Baud(u32),
    #[error("read from {path} failed: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// A non-blocking producer of text lines
pub trait DataSource {
    /// Next complete line, or `None` if nothing is ready yet.
    fn poll_line(&mut self, now: Instant) -> Result<Option<String>, SourceError>;

    /// Short description for the header
    fn describe(&self) -> String;
}

fn baud_rate(baud: u32) -> Result<BaudRate, SourceError> {
    Ok(match baud {
        1200 => BaudRate::B1200,
        2400 => BaudRate::B2400,
        4800 => BaudRate::B4800,
        9600 => BaudRate::B9600,
        19200 => BaudRate::B19200,
        38400 => BaudRate::B38400,
        57600 => BaudRate::B57600,
        115_200 => BaudRate::B115200,
        230_400 => BaudRate::B230400,
        other => return Err(SourceError::Baud(other)),
    })
}

/// Serial device (or FIFO/file) read without blocking
pub struct SerialSource {
    file: File,
    path: PathBuf,
    baud: u32,
    partial: Vec<u8>,
    lines: VecDeque<String>,
    chunk: Vec<u8>,
}

impl SerialSource {
    /// Open the configured device. Terminal devices are switched to raw mode
    /// with the configured baud rate, parity and stop bits.
    pub fn open(settings: &SerialConfig) -> Result<Self, SourceError> {
        let path = PathBuf::from(&settings.device);
        let file = OpenOptions::new()
            .read(true)
            .custom_flags(libc::O_NONBLOCK | libc::O_NOCTTY)
            .open(&path)
            .map_err(|source| SourceError::Open {
                path: path.clone(),
                source,
            })?;

        if file.is_terminal() {
            Self::configure(&file, &path, settings)?;
        } else {
            debug!("{} is not a tty, skipping line settings", path.display());
        }

        info!("reading samples from {} at {} baud", path.display(), settings.baud);
        Ok(Self {
            file,
            path,
            baud: settings.baud,
            partial: Vec::with_capacity(256),
            lines: VecDeque::new(),
            chunk: vec![0u8; 1024],
        })
    }

    fn configure(file: &File, path: &PathBuf, settings: &SerialConfig) -> Result<(), SourceError> {
        let configure_err = |source| SourceError::Configure {
            path: path.clone(),
            source,
        };
        let baud = baud_rate(settings.baud)?;

        let mut tio = termios::tcgetattr(file).map_err(configure_err)?;
        termios::cfmakeraw(&mut tio);
        termios::cfsetspeed(&mut tio, baud).map_err(configure_err)?;

        let flags = &mut tio.control_flags;
        match settings.parity {
            Parity::None => flags.remove(ControlFlags::PARENB | ControlFlags::PARODD),
            Parity::Even => {
                flags.insert(ControlFlags::PARENB);
                flags.remove(ControlFlags::PARODD);
            }
            Parity::Odd => flags.insert(ControlFlags::PARENB | ControlFlags::PARODD),
        }
        if settings.stopbits >= 2 {
            flags.insert(ControlFlags::CSTOPB);
        } else {
            flags.remove(ControlFlags::CSTOPB);
        }
        flags.insert(ControlFlags::CLOCAL | ControlFlags::CREAD);

        termios::tcsetattr(file, SetArg::TCSANOW, &tio).map_err(configure_err)
    }

    /// Split buffered bytes into complete lines
    fn absorb(&mut self, bytes: &[u8]) {
        for &byte in bytes {
            if byte == b'\n' {
                let text = String::from_utf8_lossy(&self.partial);
                self.lines.push_back(text.trim_end_matches('\r').to_string());
                self.partial.clear();
            } else if self.partial.len() >= MAX_LINE_BYTES {
                warn!(
                    "discarding {} bytes without a newline from {}",
                    self.partial.len(),
                    self.path.display()
                );
                self.partial.clear();
                self.partial.push(byte);
            } else {
                self.partial.push(byte);
            }
        }
    }
}

impl DataSource for SerialSource {
    fn poll_line(&mut self, _now: Instant) -> Result<Option<String>, SourceError> {
        if let Some(line) = self.lines.pop_front() {
            return Ok(Some(line));
        }

        let mut chunk = std::mem::take(&mut self.chunk);
        let result = self.file.read(&mut chunk);
        let outcome = match result {
            Ok(n) => {
                self.absorb(&chunk[..n]);
                Ok(self.lines.pop_front())
            }
            Err(e) if matches!(e.kind(), io::ErrorKind::WouldBlock | io::ErrorKind::Interrupted) => {
                Ok(None)
            }
            Err(source) => Err(SourceError::Read {
                path: self.path.clone(),
                source,
            }),
        };
        self.chunk = chunk;
        outcome
    }

    fn describe(&self) -> String {
        format!("{} @ {}", self.path.display(), self.baud)
    }
}

/// Field names produced by the generator, in order
const SYNTHETIC_CHANNELS: &[&str] = &["sine", "cosine", "saw", "beat", "square", "ramp"];

/// Deterministic waveform generator, one line per interval
pub struct SyntheticSource {
    interval: Duration,
    channels: usize,
    next_due: Option<Instant>,
    sample: u64,
}

impl SyntheticSource {
    pub fn new(settings: &SyntheticConfig) -> Self {
        Self {
            interval: Duration::from_millis(settings.interval_ms),
            channels: settings.channels.clamp(1, SYNTHETIC_CHANNELS.len()),
            next_due: None,
            sample: 0,
        }
    }

    fn value(channel: usize, sample: u64) -> f64 {
        let t = sample as f64 * 0.1;
        match channel {
            0 => 10.0 * t.sin(),
            1 => 5.0 * (0.7 * t).cos() + 2.0,
            2 => (sample % 50) as f64 / 5.0,
            3 => 8.0 * t.sin() * (0.05 * t).sin(),
            4 => {
                if (sample / 25) % 2 == 0 {
                    3.0
                } else {
                    -3.0
                }
            }
            _ => (sample % 400) as f64 / 40.0 - 5.0,
        }
    }

    /// Render the line for a given sample number
    pub fn line_for(&self, sample: u64) -> String {
        SYNTHETIC_CHANNELS
            .iter()
            .take(self.channels)
            .enumerate()
            .map(|(i, name)| format!("{}:{:.3}", name, Self::value(i, sample)))
            .collect::<Vec<_>>()
            .join("\t")
    }
}

impl DataSource for SyntheticSource {
    fn poll_line(&mut self, now: Instant) -> Result<Option<String>, SourceError> {
        if self.next_due.is_some_and(|due| now < due) {
            return Ok(None);
        }
        self.next_due = Some(now + self.interval);
        let line = self.line_for(self.sample);
        self.sample += 1;
        Ok(Some(line))
    }

    fn describe(&self) -> String {
        format!("synthetic ({} ch)", self.channels)
    }
}

/// Pick the data source. Any failure to open the device falls back to the
/// synthetic generator with a warning.
pub fn open_source(
    serial: &SerialConfig,
    synthetic: &SyntheticConfig,
    force_synthetic: bool,
) -> Box<dyn DataSource> {
    if force_synthetic || serial.device.is_empty() {
        info!("using synthetic data source");
        return Box::new(SyntheticSource::new(synthetic));
    }
    match SerialSource::open(serial) {
        Ok(source) => Box::new(source),
        Err(e) => {
            warn!("{}; falling back to synthetic data", e);
            Box::new(SyntheticSource::new(synthetic))
        }
    }
}
