//! Shared utility functions and traits

use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

/// Extension trait for tracking running minimum and maximum values in `Option<T>`.
///
/// Works with partially ordered types so sample values (`f64`) can be scanned
/// directly. NaN never replaces an existing bound and is never stored.
///
/// # Example
///
/// ```
/// use splotty::utils::MinMaxExt;
///
/// let mut min: Option<f64> = None;
/// let mut max: Option<f64> = None;
///
/// for v in [2.5, -1.0, 7.25] {
///     min.update_min(v);
///     max.update_max(v);
/// }
/// assert_eq!(min, Some(-1.0));
/// assert_eq!(max, Some(7.25));
/// ```
pub trait MinMaxExt<T: PartialOrd + Copy> {
    /// Stores `value` if it is smaller than the current minimum or no minimum exists yet.
    fn update_min(&mut self, value: T);

    /// Stores `value` if it is larger than the current maximum or no maximum exists yet.
    fn update_max(&mut self, value: T);
}

impl<T: PartialOrd + Copy> MinMaxExt<T> for Option<T> {
    fn update_min(&mut self, value: T) {
        if value.partial_cmp(&value).is_none() {
            return;
        }
        match self {
            Some(m) if *m <= value => {}
            _ => *self = Some(value),
        }
    }

    fn update_max(&mut self, value: T) {
        if value.partial_cmp(&value).is_none() {
            return;
        }
        match self {
            Some(m) if *m >= value => {}
            _ => *self = Some(value),
        }
    }
}

/// Number of terminal cells a plain (escape-free) string occupies.
pub fn display_width(text: &str) -> usize {
    UnicodeWidthStr::width(text)
}

/// Longest prefix of `text` that fits in `width` cells.
pub fn truncate_to_width(text: &str, width: usize) -> &str {
    let mut used = 0;
    for (i, ch) in text.char_indices() {
        let w = UnicodeWidthChar::width(ch).unwrap_or(0);
        if used + w > width {
            return &text[..i];
        }
        used += w;
    }
    text
}
