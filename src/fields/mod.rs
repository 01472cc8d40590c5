//! Field and group records
//!
//! A [`Field`] is one labelled column of the incoming data together with its
//! display metadata and recent history. Groups carry only their own
//! shortcut and enabled state; membership lives on each field.

pub mod spec;
mod table;

pub use spec::{FieldDef, FieldSpec, GroupSpec, ShortcutSpec};
pub use table::{EnabledStates, FieldTable, IngestOutcome, Toggled};

use std::collections::{BTreeSet, VecDeque};

/// Glyphs handed to fields the fieldspec doesn't describe, by position
const DEFAULT_GLYPHS: &[char] = &['*', '+', 'o', 'x', '@', '%', '&', '=', '~', '$'];

/// Display color of a field
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldColor {
    /// 256-color palette index
    Palette(u8),
    /// 24-bit color
    Rgb(u8, u8, u8),
}

impl FieldColor {
    /// Color for an undescribed field: cycles the six basic ANSI hues
    pub fn for_index(index: usize) -> Self {
        FieldColor::Palette((index % 6) as u8 + 1)
    }
}

/// One data column
#[derive(Debug, Clone, PartialEq)]
pub struct Field {
    pub name: String,
    /// Position in the current schema
    pub index: usize,
    pub value: f64,
    /// Most recent values, oldest first
    pub history: VecDeque<f64>,
    pub enabled: bool,
    /// Hidden fields pass data through but are never shown or toggled
    pub hidden: bool,
    pub glyph: char,
    pub color: FieldColor,
    pub shortcut: Option<char>,
    pub groups: BTreeSet<String>,
}

impl Field {
    /// A fresh record at `index`, styled from its fieldspec entry if any
    pub fn new(name: &str, index: usize, def: Option<&FieldDef>) -> Self {
        Self {
            name: name.to_string(),
            index,
            value: 0.0,
            history: VecDeque::new(),
            enabled: true,
            hidden: def.is_some_and(|d| d.hidden),
            glyph: def
                .and_then(|d| d.glyph)
                .unwrap_or(DEFAULT_GLYPHS[index % DEFAULT_GLYPHS.len()]),
            color: def
                .and_then(|d| d.color)
                .unwrap_or_else(|| FieldColor::for_index(index)),
            shortcut: None,
            groups: def
                .map(|d| d.groups.iter().cloned().collect())
                .unwrap_or_default(),
        }
    }

    /// Store a new value, keeping at most `window` history entries
    pub fn push_sample(&mut self, value: f64, window: usize) {
        self.value = value;
        self.history.push_back(value);
        while self.history.len() > window.max(1) {
            self.history.pop_front();
        }
    }

    /// Shown in the legend and plotted when enabled
    pub fn is_visible(&self) -> bool {
        !self.hidden
    }

    pub fn is_plotted(&self) -> bool {
        self.enabled && !self.hidden
    }
}

/// A named set of fields toggled together
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Group {
    pub name: String,
    pub shortcut: Option<char>,
    pub enabled: bool,
    /// Resolution order; unordered groups are applied last
    pub order: Option<i64>,
}

impl Group {
    pub fn from_spec(spec: &GroupSpec) -> Self {
        Self {
            name: spec.name.clone(),
            shortcut: None,
            enabled: spec.state,
            order: spec.order,
        }
    }

    /// Sort key used by group resolution
    pub fn sort_order(&self) -> i64 {
        self.order.unwrap_or(i64::MAX)
    }
}
