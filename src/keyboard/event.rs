//! Logical key event types

/// Navigation keys recognised from multi-byte sequences
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NamedKey {
    Up,
    Down,
    Left,
    Right,
    CtrlUp,
    CtrlDown,
    CtrlLeft,
    CtrlRight,
}

impl NamedKey {
    pub fn all() -> &'static [NamedKey] {
        &[
            Self::Up,
            Self::Down,
            Self::Left,
            Self::Right,
            Self::CtrlUp,
            Self::CtrlDown,
            Self::CtrlLeft,
            Self::CtrlRight,
        ]
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Up => "Up",
            Self::Down => "Down",
            Self::Left => "Left",
            Self::Right => "Right",
            Self::CtrlUp => "Ctrl+Up",
            Self::CtrlDown => "Ctrl+Down",
            Self::CtrlLeft => "Ctrl+Left",
            Self::CtrlRight => "Ctrl+Right",
        }
    }
}

/// Decoded key type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyKind {
    /// A single ASCII byte
    Char(char),
    /// A byte of 0x80 or above. Multi-byte UTF-8 input arrives as one
    /// event per byte; nothing here reassembles it.
    Byte(u8),
    /// A lone escape byte
    Escape,
    /// A recognised multi-byte sequence
    Named(NamedKey),
}

/// A decoded key with the bytes it came from
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyEvent {
    /// What the bytes decoded to
    pub kind: KeyKind,
    /// Raw bytes consumed by this event
    pub bytes: Vec<u8>,
    /// Milliseconds between the first byte of the sequence and the event
    pub elapsed_ms: u64,
}

impl KeyEvent {
    pub fn new(kind: KeyKind, bytes: Vec<u8>, elapsed_ms: u64) -> Self {
        Self {
            kind,
            bytes,
            elapsed_ms,
        }
    }

    /// The literal character, if this is a plain key press
    pub fn as_char(&self) -> Option<char> {
        match self.kind {
            KeyKind::Char(ch) => Some(ch),
            _ => None,
        }
    }
}
