//! Known multi-byte key sequences
//!
//! A sequence missing from the current terminal's capability set is simply
//! absent from the table, so it never takes part in prefix or exact checks.

use super::NamedKey;

/// Escape byte
pub const ESC: u8 = 0x1b;

/// Table of multi-byte sequences the decoder recognises
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SequenceTable {
    entries: Vec<(NamedKey, Vec<u8>)>,
}

impl SequenceTable {
    /// Build a table, dropping keys the terminal doesn't define.
    pub fn new(entries: impl IntoIterator<Item = (NamedKey, Option<Vec<u8>>)>) -> Self {
        let entries = entries
            .into_iter()
            .filter_map(|(key, seq)| seq.filter(|s| s.len() > 1).map(|s| (key, s)))
            .collect();
        Self { entries }
    }

    /// An empty table. Every byte decodes as a literal.
    pub fn empty() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// xterm-compatible arrows in both cursor modes plus control-modified arrows
    pub fn xterm() -> Self {
        let mut entries = Vec::new();
        for (key, last) in [
            (NamedKey::Up, b'A'),
            (NamedKey::Down, b'B'),
            (NamedKey::Right, b'C'),
            (NamedKey::Left, b'D'),
        ] {
            entries.push((key, Some(vec![ESC, b'[', last])));
            entries.push((key, Some(vec![ESC, b'O', last])));
        }
        for (key, last) in [
            (NamedKey::CtrlUp, b'A'),
            (NamedKey::CtrlDown, b'B'),
            (NamedKey::CtrlRight, b'C'),
            (NamedKey::CtrlLeft, b'D'),
        ] {
            entries.push((key, Some(vec![ESC, b'[', b'1', b';', b'5', last])));
        }
        Self::new(entries)
    }

    /// Linux virtual console: plain arrows only
    pub fn linux_console() -> Self {
        let ctrl_arrows = [
            NamedKey::CtrlUp,
            NamedKey::CtrlDown,
            NamedKey::CtrlLeft,
            NamedKey::CtrlRight,
        ];
        Self::new(
            Self::xterm()
                .entries
                .into_iter()
                .map(|(key, seq)| (key, (!ctrl_arrows.contains(&key)).then_some(seq))),
        )
    }

    /// Pick a table for a `$TERM` value
    pub fn for_term(term: Option<&str>) -> Self {
        match term {
            None | Some("") | Some("dumb") => Self::empty(),
            Some("linux") => Self::linux_console(),
            Some(_) => Self::xterm(),
        }
    }

    /// Key whose sequence equals `buf` exactly
    pub fn exact(&self, buf: &[u8]) -> Option<NamedKey> {
        self.entries
            .iter()
            .find(|(_, seq)| seq.as_slice() == buf)
            .map(|(key, _)| *key)
    }

    /// True if `buf` is shorter than, and a prefix of, at least one sequence
    pub fn is_strict_prefix(&self, buf: &[u8]) -> bool {
        self.entries
            .iter()
            .any(|(_, seq)| seq.len() > buf.len() && seq.starts_with(buf))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Default for SequenceTable {
    fn default() -> Self {
        Self::xterm()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn xterm_recognises_arrows() {
        let table = SequenceTable::xterm();
        assert_eq!(table.exact(b"\x1b[A"), Some(NamedKey::Up));
        assert_eq!(table.exact(b"\x1bOD"), Some(NamedKey::Left));
        assert_eq!(table.exact(b"\x1b[1;5C"), Some(NamedKey::CtrlRight));
        assert_eq!(table.exact(b"\x1b["), None);
    }

    #[test]
    fn strict_prefix_excludes_full_sequences() {
        let table = SequenceTable::xterm();
        assert!(table.is_strict_prefix(b""));
        assert!(table.is_strict_prefix(b"\x1b"));
        assert!(table.is_strict_prefix(b"\x1b[1;"));
        assert!(!table.is_strict_prefix(b"\x1b[1;5A"));
        assert!(!table.is_strict_prefix(b"\x1bx"));
    }

    #[test]
    fn absent_sequences_are_dropped() {
        let table = SequenceTable::new([
            (NamedKey::Up, Some(b"\x1b[A".to_vec())),
            (NamedKey::CtrlUp, None),
        ]);
        assert_eq!(table.len(), 1);
        assert_eq!(table.exact(b"\x1b[1;5A"), None);
        assert!(!table.is_strict_prefix(b"\x1b[1"));
    }

    #[test]
    fn linux_console_has_no_ctrl_arrows() {
        let table = SequenceTable::for_term(Some("linux"));
        assert_eq!(table.exact(b"\x1b[B"), Some(NamedKey::Down));
        assert_eq!(table.exact(b"\x1b[1;5B"), None);
    }

    #[test]
    fn dumb_terminal_has_no_sequences() {
        assert!(SequenceTable::for_term(Some("dumb")).is_empty());
        assert!(SequenceTable::for_term(None).is_empty());
        assert_eq!(SequenceTable::for_term(Some("xterm-256color")).len(), 12);
    }
}
