//! Screen regions and value scaling
//!
//! Rows from top to bottom: header, legend, plot, footer. The plot is the
//! scroll region; a narrow gutter to its right carries the sample counter.

use crate::config::UiConfig;
use crate::fields::Field;
use crate::utils::MinMaxExt;
use ratatui::layout::Rect;
use thiserror::Error;

/// Smallest range the autoranger will hand to the scaler
pub const RANGE_EPSILON: f64 = 1e-9;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LayoutError {
    #[error("terminal too small: {cols}x{rows}, need at least {needed} rows")]
    TooSmall { cols: u16, rows: u16, needed: u16 },
    #[error("terminal too narrow: {cols} columns, need at least {needed}")]
    TooNarrow { cols: u16, needed: u16 },
}

/// Regions for one terminal size. All coordinates are 0-based.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Layout {
    pub cols: u16,
    pub rows: u16,
    pub header: Rect,
    pub legend: Rect,
    pub plot: Rect,
    pub gutter: Rect,
    pub footer: Rect,
}

impl Layout {
    /// Split a `cols` x `rows` terminal.
    ///
    /// The header shrinks to nothing first, then the legend loses lines,
    /// before the plot is allowed under `min_plot_rows`.
    pub fn compute(
        cols: u16,
        rows: u16,
        legend_lines: usize,
        ui: &UiConfig,
    ) -> Result<Self, LayoutError> {
        let min_plot = ui.min_plot_rows.max(1);
        let footer_h = ui.footer_rows;
        let needed = footer_h.saturating_add(min_plot);
        if rows < needed {
            return Err(LayoutError::TooSmall { cols, rows, needed });
        }

        let side = ui
            .pad_left
            .saturating_add(ui.pad_right)
            .saturating_add(ui.gutter_width);
        if cols <= side {
            return Err(LayoutError::TooNarrow {
                cols,
                needed: side + 1,
            });
        }

        let mut legend_h = u16::try_from(legend_lines).unwrap_or(u16::MAX);
        let mut header_h = ui.header_rows;
        if header_h + legend_h + needed > rows {
            header_h = 0;
        }
        legend_h = legend_h.min(rows - needed - header_h);

        let plot_h = rows - header_h - legend_h - footer_h;
        let plot_w = cols - side;

        let header = Rect::new(0, 0, cols, header_h);
        let legend = Rect::new(0, header.bottom(), cols, legend_h);
        let plot = Rect::new(ui.pad_left, legend.bottom(), plot_w, plot_h);
        let gutter = Rect::new(plot.right(), plot.y, ui.gutter_width, plot_h);
        let footer = Rect::new(0, plot.bottom(), cols, footer_h);

        Ok(Self {
            cols,
            rows,
            header,
            legend,
            plot,
            gutter,
            footer,
        })
    }

    /// Width available to legend lines
    pub fn legend_width(&self) -> usize {
        self.legend.width as usize
    }

    /// Row the next plot line is written to
    pub fn plot_bottom_row(&self) -> u16 {
        self.plot.bottom().saturating_sub(1)
    }
}

/// Map `value` into the plot's columns.
pub fn value_to_column(value: f64, lo: f64, hi: f64, plot: Rect) -> u16 {
    if plot.width <= 1 {
        return plot.x;
    }
    let mut range = hi - lo;
    if range == 0.0 || !range.is_finite() {
        range = 1.0;
    }
    let frac = (value - lo) / range;
    let frac = if frac.is_nan() { 0.0 } else { frac.clamp(0.0, 1.0) };
    let span = f64::from(plot.width - 1);
    plot.x + (frac * span).round() as u16
}

/// Autorange over the history of every plotted field.
///
/// Never returns a range narrower than [`RANGE_EPSILON`]; a flat or empty
/// window is widened by one on each side.
pub fn window_minmax<'a>(fields: impl IntoIterator<Item = &'a Field>) -> (f64, f64) {
    let mut lo: Option<f64> = None;
    let mut hi: Option<f64> = None;
    for field in fields.into_iter().filter(|f| f.is_plotted()) {
        for &value in &field.history {
            lo.update_min(value);
            hi.update_max(value);
        }
    }

    let lo = lo.unwrap_or(0.0);
    let hi = hi.unwrap_or(0.0);
    if hi - lo < RANGE_EPSILON {
        (lo - 1.0, hi + 1.0)
    } else {
        (lo, hi)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn field_with(values: &[f64]) -> Field {
        let mut field = Field::new("f", 0, None);
        for &v in values {
            field.push_sample(v, 100);
        }
        field
    }

    #[test]
    fn default_layout_splits_rows() {
        let ui = UiConfig::default();
        let layout = Layout::compute(80, 24, 2, &ui).expect("fits");
        assert_eq!(layout.header, Rect::new(0, 0, 80, 2));
        assert_eq!(layout.legend, Rect::new(0, 2, 80, 2));
        assert_eq!(layout.plot, Rect::new(1, 4, 71, 19));
        assert_eq!(layout.gutter, Rect::new(72, 4, 7, 19));
        assert_eq!(layout.footer, Rect::new(0, 23, 80, 1));
        assert_eq!(layout.plot_bottom_row(), 22);
    }

    #[test]
    fn header_is_dropped_before_plot_shrinks() {
        let ui = UiConfig::default();
        let layout = Layout::compute(80, 6, 2, &ui).expect("fits without header");
        assert_eq!(layout.header.height, 0);
        assert_eq!(layout.legend.height, 2);
        assert_eq!(layout.plot.height, 3);
    }

    #[test]
    fn legend_is_truncated_last() {
        let ui = UiConfig::default();
        let layout = Layout::compute(80, 5, 4, &ui).expect("fits with short legend");
        assert_eq!(layout.header.height, 0);
        assert_eq!(layout.legend.height, 1);
        assert_eq!(layout.plot.height, ui.min_plot_rows);
    }

    #[test]
    fn too_small_is_rejected() {
        let ui = UiConfig::default();
        assert_eq!(
            Layout::compute(80, 3, 0, &ui),
            Err(LayoutError::TooSmall {
                cols: 80,
                rows: 3,
                needed: 4
            })
        );
        assert!(matches!(
            Layout::compute(9, 24, 0, &ui),
            Err(LayoutError::TooNarrow { needed: 10, .. })
        ));
    }

    #[test]
    fn values_map_across_plot() {
        let plot = Rect::new(2, 0, 11, 5);
        assert_eq!(value_to_column(0.0, 0.0, 10.0, plot), 2);
        assert_eq!(value_to_column(10.0, 0.0, 10.0, plot), 12);
        assert_eq!(value_to_column(5.0, 0.0, 10.0, plot), 7);
        assert_eq!(value_to_column(-50.0, 0.0, 10.0, plot), 2);
        assert_eq!(value_to_column(99.0, 0.0, 10.0, plot), 12);
    }

    #[test]
    fn degenerate_ranges_and_widths() {
        let plot = Rect::new(3, 0, 10, 5);
        assert_eq!(value_to_column(4.0, 4.0, 4.0, plot), 3);
        assert_eq!(value_to_column(f64::NAN, 0.0, 1.0, plot), 3);
        let narrow = Rect::new(5, 0, 1, 5);
        assert_eq!(value_to_column(1e9, 0.0, 1.0, narrow), 5);
    }

    #[test]
    fn window_minmax_never_zero_width() {
        assert_eq!(window_minmax(std::iter::empty()), (-1.0, 1.0));
        let single = field_with(&[5.0]);
        let (lo, hi) = window_minmax([&single]);
        assert!(hi - lo >= RANGE_EPSILON);
        assert_eq!((lo, hi), (4.0, 6.0));
    }

    #[test]
    fn window_minmax_skips_disabled_and_hidden() {
        let a = field_with(&[1.0, 3.0]);
        let mut b = field_with(&[-100.0]);
        b.enabled = false;
        let mut c = field_with(&[500.0]);
        c.hidden = true;
        assert_eq!(window_minmax([&a, &b, &c]), (1.0, 3.0));
    }
}
