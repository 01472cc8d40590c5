//! Legend entries and line packing
//!
//! Every entry has a fixed width for the life of a layout (values are padded
//! to [`VALUE_WIDTH`]), so the packing computed at relayout stays valid while
//! values refresh every tick.

use crate::fields::{Field, FieldColor, Group};
use crate::utils::display_width;

/// Columns reserved for a field value
pub const VALUE_WIDTH: usize = 9;
/// Columns reserved for the autorange label at the start of the legend
pub const RANGE_WIDTH: usize = 2 * VALUE_WIDTH + 2;
/// Gap between entries on a line
pub const SEPARATOR: &str = "  ";

/// Suffix of a disabled entry
pub const OFF_MARKER: &str = " off";

/// Format a value into exactly [`VALUE_WIDTH`] columns
pub fn format_value(value: f64) -> String {
    let text = format!("{value:.2}");
    if text.len() > VALUE_WIDTH {
        format!("{value:>w$.2e}", w = VALUE_WIDTH)
            .chars()
            .take(VALUE_WIDTH)
            .collect()
    } else {
        format!("{text:<VALUE_WIDTH$}")
    }
}

/// Autorange label, padded to [`RANGE_WIDTH`]
pub fn format_range(lo: f64, hi: f64) -> String {
    let text = format!("{}..{}", format_value(lo).trim_end(), format_value(hi).trim_end());
    let text: String = text.chars().take(RANGE_WIDTH).collect();
    format!("{text:<RANGE_WIDTH$}")
}

/// One item in the legend
#[derive(Debug, Clone, PartialEq)]
pub enum LegendEntry {
    /// `<glyph> <name>[<key>]=<value>` plus ` off` when disabled
    Field {
        glyph: char,
        color: FieldColor,
        name: String,
        key: Option<char>,
        value: f64,
        enabled: bool,
    },
    /// `<name>[<key>]` plus ` off`; groups carry no value
    Group {
        name: String,
        key: Option<char>,
        enabled: bool,
    },
}

impl LegendEntry {
    pub fn from_field(field: &Field) -> Self {
        LegendEntry::Field {
            glyph: field.glyph,
            color: field.color,
            name: field.name.clone(),
            key: field.shortcut,
            value: field.value,
            enabled: field.enabled,
        }
    }

    pub fn from_group(group: &Group) -> Self {
        LegendEntry::Group {
            name: group.name.clone(),
            key: group.shortcut,
            enabled: group.enabled,
        }
    }

    pub fn name(&self) -> &str {
        match self {
            LegendEntry::Field { name, .. } | LegendEntry::Group { name, .. } => name,
        }
    }

    pub fn key(&self) -> Option<char> {
        match self {
            LegendEntry::Field { key, .. } | LegendEntry::Group { key, .. } => *key,
        }
    }

    pub fn enabled(&self) -> bool {
        match self {
            LegendEntry::Field { enabled, .. } | LegendEntry::Group { enabled, .. } => *enabled,
        }
    }

    /// Label part without color or value
    pub fn label(&self) -> String {
        let key = self.key().map(|k| format!("[{k}]")).unwrap_or_default();
        match self {
            LegendEntry::Field { glyph, name, .. } => format!("{glyph} {name}{key}"),
            LegendEntry::Group { name, .. } => format!("<{name}>{key}"),
        }
    }

    /// Rendered width with room for any value and the disabled marker
    pub fn width(&self) -> usize {
        let value = match self {
            LegendEntry::Field { .. } => 1 + VALUE_WIDTH,
            LegendEntry::Group { .. } => 0,
        };
        display_width(&self.label()) + value + OFF_MARKER.len()
    }

    /// Plain text of the entry, `width()` columns wide
    pub fn text(&self) -> String {
        let mut text = self.label();
        if let LegendEntry::Field { value, .. } = self {
            text.push('=');
            text.push_str(&format_value(*value));
        }
        if self.enabled() {
            text.push_str(&" ".repeat(OFF_MARKER.len()));
        } else {
            text.push_str(OFF_MARKER);
        }
        text
    }
}

/// Greedily pack item widths into lines no wider than `width`.
///
/// Returns the indices on each line. The first line starts with the range
/// label. An item wider than a whole line still gets a line of its own.
pub fn pack(widths: &[usize], width: usize) -> Vec<Vec<usize>> {
    let mut lines: Vec<Vec<usize>> = Vec::new();
    if width == 0 {
        return lines;
    }

    let mut current: Vec<usize> = Vec::new();
    let mut used = RANGE_WIDTH.min(width);
    for (i, &w) in widths.iter().enumerate() {
        if used + SEPARATOR.len() + w <= width {
            used += SEPARATOR.len() + w;
            current.push(i);
        } else {
            lines.push(std::mem::take(&mut current));
            current.push(i);
            used = w;
        }
    }
    lines.push(current);
    lines
}
