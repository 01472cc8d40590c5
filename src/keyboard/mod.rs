//! Keyboard byte decoding
//!
//! Raw terminal input arrives one byte at a time. The decoder turns it into
//! logical key events, holding back bytes that may start a multi-byte escape
//! sequence until the sequence completes or a timeout expires.

mod decoder;
mod event;
pub mod input;
pub mod keymap;

pub use decoder::{KeyDecoder, DEFAULT_ESCAPE_TIMEOUT};
pub use event::{KeyEvent, KeyKind, NamedKey};
pub use input::{ByteSource, StdinBytes};
pub use keymap::{SequenceTable, ESC};
