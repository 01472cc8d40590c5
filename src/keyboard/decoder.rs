//! Byte-stream to key event decoder

use super::{ByteSource, KeyEvent, KeyKind, SequenceTable, ESC};
use log::debug;
use std::io;
use std::time::{Duration, Instant};

/// How long a possible escape-sequence prefix waits for its next byte
pub const DEFAULT_ESCAPE_TIMEOUT: Duration = Duration::from_millis(50);

/// Stateful decoder, fed at most one byte per tick.
///
/// Bytes that could still grow into a known sequence are buffered. They are
/// released as literal events one per tick once the timeout passes without
/// the sequence completing. Nothing here ever blocks.
#[derive(Debug, Clone)]
pub struct KeyDecoder {
    table: SequenceTable,
    timeout: Duration,
    buffer: Vec<u8>,
    /// Arrival of the most recent byte
    last_activity: Option<Instant>,
    /// Arrival of the first byte still in the buffer
    started: Option<Instant>,
}

impl KeyDecoder {
    pub fn new(table: SequenceTable, timeout: Duration) -> Self {
        Self {
            table,
            timeout,
            buffer: Vec::with_capacity(8),
            last_activity: None,
            started: None,
        }
    }

    /// Bytes held back waiting for a sequence to complete
    pub fn pending(&self) -> &[u8] {
        &self.buffer
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Read at most one byte from `input` and decode it.
    pub fn poll(&mut self, input: &mut dyn ByteSource, now: Instant) -> io::Result<Option<KeyEvent>> {
        let byte = input.read_byte()?;
        Ok(self.feed(byte, now))
    }

    /// Advance the decoder by one tick with an optional new byte.
    pub fn feed(&mut self, byte: Option<u8>, now: Instant) -> Option<KeyEvent> {
        let Some(byte) = byte else {
            return self.idle(now);
        };

        if self.buffer.is_empty() {
            self.started = Some(now);
        }
        self.buffer.push(byte);
        self.last_activity = Some(now);

        if let Some(key) = self.table.exact(&self.buffer) {
            let bytes = std::mem::take(&mut self.buffer);
            let elapsed_ms = self.elapsed_ms(now);
            self.started = None;
            debug!("decoded {} from {:?}", key.name(), bytes);
            return Some(KeyEvent::new(KeyKind::Named(key), bytes, elapsed_ms));
        }

        if self.table.is_strict_prefix(&self.buffer) {
            return None;
        }

        Some(self.pop_literal(now))
    }

    /// No byte this tick: flush the head of the buffer if it can no longer
    /// start a sequence or the timeout has passed.
    fn idle(&mut self, now: Instant) -> Option<KeyEvent> {
        if self.buffer.is_empty() {
            return None;
        }
        let expired = self
            .last_activity
            .map_or(true, |t| now.saturating_duration_since(t) > self.timeout);
        if expired || !self.table.is_strict_prefix(&self.buffer) {
            Some(self.pop_literal(now))
        } else {
            None
        }
    }

    fn pop_literal(&mut self, now: Instant) -> KeyEvent {
        let byte = self.buffer.remove(0);
        let elapsed_ms = self.elapsed_ms(now);
        self.started = if self.buffer.is_empty() {
            None
        } else {
            self.last_activity
        };
        let kind = if byte == ESC {
            KeyKind::Escape
        } else if byte.is_ascii() {
            KeyKind::Char(byte as char)
        } else {
            KeyKind::Byte(byte)
        };
        KeyEvent::new(kind, vec![byte], elapsed_ms)
    }

    fn elapsed_ms(&self, now: Instant) -> u64 {
        self.started
            .map(|t| now.saturating_duration_since(t).as_millis() as u64)
            .unwrap_or(0)
    }
}

impl Default for KeyDecoder {
    fn default() -> Self {
        Self::new(SequenceTable::xterm(), DEFAULT_ESCAPE_TIMEOUT)
    }
}
