//! Scroll-region renderer
//!
//! A redraw paints the header, legend and footer once and confines scrolling
//! to the plot rows with DECSTBM. After that each sample is a single line
//! written at the bottom of the region followed by a line feed, so the
//! terminal scrolls the plot by itself and nothing else is repainted.

use super::layout::{value_to_column, window_minmax, Layout, LayoutError};
use super::legend::{self, LegendEntry, SEPARATOR};
use super::theme::ThemeColors;
use crate::config::UiConfig;
use crate::fields::{Field, FieldTable};
use crate::utils::{display_width, truncate_to_width};
use chrono::{DateTime, Local};
use crossterm::cursor::{Hide, MoveTo};
use crossterm::style::{Attribute, Color, Print, ResetColor, SetAttribute, SetForegroundColor};
use crossterm::terminal::{Clear, ClearType};
use crossterm::{queue, Command};
use log::debug;
use std::fmt;
use std::io::{self, Write};
use thiserror::Error;

/// Rows between gutter sample counters
pub const COUNTER_EVERY: u64 = 10;

/// `CSI top ; bottom r`. Rows are 0-based and inclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SetScrollRegion {
    pub top: u16,
    pub bottom: u16,
}

impl Command for SetScrollRegion {
    fn write_ansi(&self, f: &mut impl fmt::Write) -> fmt::Result {
        write!(f, "\x1b[{};{}r", self.top + 1, self.bottom + 1)
    }

    #[cfg(windows)]
    fn execute_winapi(&self) -> io::Result<()> {
        Err(io::Error::new(
            io::ErrorKind::Unsupported,
            "scroll regions need an ANSI terminal",
        ))
    }
}

/// `CSI r`: scroll the whole screen again
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResetScrollRegion;

impl Command for ResetScrollRegion {
    fn write_ansi(&self, f: &mut impl fmt::Write) -> fmt::Result {
        f.write_str("\x1b[r")
    }

    #[cfg(windows)]
    fn execute_winapi(&self) -> io::Result<()> {
        Err(io::Error::new(
            io::ErrorKind::Unsupported,
            "scroll regions need an ANSI terminal",
        ))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderState {
    /// Static regions and scroll region must be (re)drawn
    NeedsRedraw,
    /// Only plot lines and legend values change
    Steady,
}

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("terminal write failed: {0}")]
    Io(#[from] io::Error),
    #[error(transparent)]
    Layout(#[from] LayoutError),
}

/// Text around the plot
#[derive(Debug, Clone, Copy)]
pub struct Chrome<'a> {
    /// Data source description for the header
    pub source: &'a str,
    /// Key help for the second header row
    pub help: &'a str,
    /// Footer text
    pub status: &'a str,
}

type Segment = (Option<Color>, String);

fn fit(text: &str, width: usize) -> String {
    truncate_to_width(text, width).to_string()
}

/// Write colored segments, never past `budget` columns.
fn write_segments(out: &mut impl Write, segments: &[Segment], mut budget: usize) -> io::Result<()> {
    for (color, text) in segments {
        if budget == 0 {
            break;
        }
        let text = fit(text, budget);
        budget -= display_width(&text);
        match color {
            Some(color) => queue!(out, SetForegroundColor(*color), Print(text), ResetColor)?,
            None => queue!(out, Print(text))?,
        }
    }
    Ok(())
}

pub struct Renderer {
    ui: UiConfig,
    theme: ThemeColors,
    state: RenderState,
    layout: Option<Layout>,
    /// Entry indices per legend row, from the last redraw
    legend_rows: Vec<Vec<usize>>,
    legend_entries: usize,
    drawn_status: String,
    started: DateTime<Local>,
}

impl Renderer {
    pub fn new(ui: &UiConfig, started: DateTime<Local>) -> Self {
        Self {
            ui: ui.clone(),
            theme: ThemeColors::from_theme(ui.theme),
            state: RenderState::NeedsRedraw,
            layout: None,
            legend_rows: Vec::new(),
            legend_entries: 0,
            drawn_status: String::new(),
            started,
        }
    }

    pub fn state(&self) -> RenderState {
        self.state
    }

    pub fn layout(&self) -> Option<&Layout> {
        self.layout.as_ref()
    }

    /// Force a full redraw on the next opportunity
    pub fn request_redraw(&mut self) {
        self.state = RenderState::NeedsRedraw;
    }

    fn legend_entries(table: &FieldTable) -> Vec<LegendEntry> {
        table
            .visible()
            .map(LegendEntry::from_field)
            .chain(table.groups().iter().map(LegendEntry::from_group))
            .collect()
    }

    /// Recompute the layout for `cols` x `rows` and paint every static region.
    pub fn redraw(
        &mut self,
        out: &mut impl Write,
        cols: u16,
        rows: u16,
        table: &FieldTable,
        chrome: &Chrome<'_>,
    ) -> Result<(), RenderError> {
        let entries = Self::legend_entries(table);
        let widths: Vec<usize> = entries.iter().map(LegendEntry::width).collect();
        let mut legend_rows = legend::pack(&widths, cols as usize);

        let layout = Layout::compute(cols, rows, legend_rows.len(), &self.ui)?;
        legend_rows.truncate(layout.legend.height as usize);
        debug!(
            "layout {}x{}: header {} legend {} plot {}x{}",
            cols, rows, layout.header.height, layout.legend.height, layout.plot.width, layout.plot.height
        );

        self.layout = Some(layout);
        self.legend_rows = legend_rows;
        self.legend_entries = entries.len();

        queue!(
            out,
            ResetScrollRegion,
            SetAttribute(Attribute::Reset),
            Clear(ClearType::All),
            Hide
        )?;
        self.draw_header(out, &layout, chrome)?;
        self.draw_legend(out, &layout, &entries, table)?;
        self.draw_footer(out, &layout, chrome.status)?;
        queue!(
            out,
            SetScrollRegion {
                top: layout.plot.y,
                bottom: layout.plot_bottom_row(),
            }
        )?;
        out.flush()?;

        self.state = RenderState::Steady;
        Ok(())
    }

    fn draw_header(&self, out: &mut impl Write, layout: &Layout, chrome: &Chrome<'_>) -> io::Result<()> {
        let width = layout.cols as usize;
        if layout.header.height >= 1 {
            queue!(
                out,
                MoveTo(0, layout.header.y),
                Clear(ClearType::CurrentLine),
                SetAttribute(Attribute::Bold)
            )?;
            let segments = [
                (Some(self.theme.accent), "splotty".to_string()),
                (
                    Some(self.theme.fg),
                    format!(
                        "  {}  started {}",
                        chrome.source,
                        self.started.format("%Y-%m-%d %H:%M:%S")
                    ),
                ),
            ];
            write_segments(out, &segments[..1], width)?;
            queue!(out, SetAttribute(Attribute::Reset))?;
            write_segments(out, &segments[1..], width.saturating_sub(7))?;
        }
        if layout.header.height >= 2 {
            queue!(out, MoveTo(0, layout.header.y + 1), Clear(ClearType::CurrentLine))?;
            write_segments(out, &[(Some(self.theme.dim), chrome.help.to_string())], width)?;
        }
        Ok(())
    }

    /// Colored pieces of one legend entry. Together they spell
    /// [`LegendEntry::text`].
    fn entry_segments(&self, entry: &LegendEntry) -> Vec<Segment> {
        let mut segments: Vec<Segment> = Vec::with_capacity(5);
        let mut push = |color: Color, text: String| {
            if let Some((Some(last), prev)) = segments.last_mut() {
                if *last == color {
                    prev.push_str(&text);
                    return;
                }
            }
            segments.push((Some(color), text));
        };

        match entry {
            LegendEntry::Field { glyph, color, name, .. } => {
                push(Color::from(*color), glyph.to_string());
                push(self.theme.fg, format!(" {name}"));
            }
            LegendEntry::Group { name, .. } => push(self.theme.fg, format!("<{name}>")),
        }
        if let Some(key) = entry.key() {
            push(self.theme.key, format!("[{key}]"));
        }
        if let LegendEntry::Field { value, .. } = entry {
            push(self.theme.fg, format!("={}", legend::format_value(*value)));
        }
        if entry.enabled() {
            push(self.theme.fg, " ".repeat(legend::OFF_MARKER.len()));
        } else {
            push(self.theme.off, legend::OFF_MARKER.to_string());
        }
        segments
    }

    fn draw_legend(
        &self,
        out: &mut impl Write,
        layout: &Layout,
        entries: &[LegendEntry],
        table: &FieldTable,
    ) -> io::Result<()> {
        let width = layout.legend_width();
        let (lo, hi) = window_minmax(table.fields());

        for (row, indices) in self.legend_rows.iter().enumerate() {
            let y = layout.legend.y + row as u16;
            queue!(out, MoveTo(0, y), Clear(ClearType::CurrentLine))?;

            let mut segments: Vec<Segment> = Vec::new();
            if row == 0 {
                segments.push((Some(self.theme.accent), legend::format_range(lo, hi)));
            }
            for &i in indices {
                let Some(entry) = entries.get(i) else { continue };
                if !segments.is_empty() {
                    segments.push((None, SEPARATOR.to_string()));
                }
                segments.extend(self.entry_segments(entry));
            }
            write_segments(out, &segments, width)?;
        }
        Ok(())
    }

    fn draw_footer(&mut self, out: &mut impl Write, layout: &Layout, status: &str) -> io::Result<()> {
        self.drawn_status = status.to_string();
        if layout.footer.height == 0 {
            return Ok(());
        }
        queue!(out, MoveTo(0, layout.footer.y), Clear(ClearType::CurrentLine))?;
        write_segments(
            out,
            &[(Some(self.theme.status), status.to_string())],
            layout.cols as usize,
        )
    }

    /// Write one plot line for the table's current values and scroll it up.
    pub fn draw_row(
        &self,
        out: &mut impl Write,
        table: &FieldTable,
        inline_numbers: bool,
        sample: u64,
    ) -> io::Result<()> {
        let Some(layout) = self.layout.filter(|_| self.state == RenderState::Steady) else {
            return Ok(());
        };
        let plot = layout.plot;
        let width = plot.width as usize;
        let (lo, hi) = window_minmax(table.fields());

        let mut cells: Vec<Option<(char, Color)>> = vec![None; width];
        let marks: Vec<(usize, &Field)> = table
            .plotted()
            .map(|f| ((value_to_column(f.value, lo, hi, plot) - plot.x) as usize, f))
            .collect();
        for (col, field) in &marks {
            cells[*col] = Some((field.glyph, Color::from(field.color)));
        }
        if inline_numbers {
            for (col, field) in &marks {
                let text = format!("{:.2}", field.value);
                let start = col + 1;
                let end = start + text.chars().count();
                if end <= width && cells[start..end].iter().all(Option::is_none) {
                    let color = Color::from(field.color);
                    for (cell, ch) in cells[start..end].iter_mut().zip(text.chars()) {
                        *cell = Some((ch, color));
                    }
                }
            }
        }

        let bottom = layout.plot_bottom_row();
        queue!(out, MoveTo(plot.x, bottom))?;
        let mut current: Option<Color> = None;
        for cell in &cells {
            match cell {
                Some((ch, color)) => {
                    if current != Some(*color) {
                        queue!(out, SetForegroundColor(*color))?;
                        current = Some(*color);
                    }
                    queue!(out, Print(*ch))?;
                }
                None => queue!(out, Print(' '))?,
            }
        }
        queue!(out, ResetColor)?;

        if sample % COUNTER_EVERY == 0 && layout.gutter.width > 1 {
            let text = fit(&format!(" {sample}"), layout.gutter.width as usize);
            queue!(
                out,
                MoveTo(layout.gutter.x, bottom),
                SetForegroundColor(self.theme.dim),
                Print(text),
                ResetColor
            )?;
        }
        queue!(out, Print("\n"))
    }

    /// Refresh legend values and, if it changed, the status line.
    ///
    /// Falls back to requesting a redraw when the legend no longer matches
    /// the packing from the last redraw.
    pub fn refresh(
        &mut self,
        out: &mut impl Write,
        table: &FieldTable,
        status: &str,
    ) -> io::Result<()> {
        let Some(layout) = self.layout.filter(|_| self.state == RenderState::Steady) else {
            return Ok(());
        };
        let entries = Self::legend_entries(table);
        if entries.len() != self.legend_entries {
            self.request_redraw();
            return Ok(());
        }
        self.draw_legend(out, &layout, &entries, table)?;
        if status != self.drawn_status {
            self.draw_footer(out, &layout, status)?;
        }
        out.flush()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::parse_line;
    use crate::fields::FieldSpec;

    fn chrome(status: &str) -> Chrome<'_> {
        Chrome {
            source: "synthetic",
            help: "q quit",
            status,
        }
    }

    fn table_with(lines: &[&str]) -> FieldTable {
        let mut table = FieldTable::new(FieldSpec::empty(), 50);
        for line in lines {
            table.ingest(&parse_line(line).unwrap());
        }
        table
    }

    fn text(out: &[u8]) -> String {
        String::from_utf8_lossy(out).into_owned()
    }

    #[test]
    fn scroll_region_commands_are_one_based() {
        let mut buf = String::new();
        SetScrollRegion { top: 0, bottom: 23 }.write_ansi(&mut buf).unwrap();
        assert_eq!(buf, "\x1b[1;24r");
        buf.clear();
        ResetScrollRegion.write_ansi(&mut buf).unwrap();
        assert_eq!(buf, "\x1b[r");
    }

    #[test]
    fn redraw_sets_scroll_region_to_plot() {
        let table = table_with(&["a:1\tb:2"]);
        let mut renderer = Renderer::new(&UiConfig::default(), Local::now());
        assert_eq!(renderer.state(), RenderState::NeedsRedraw);

        let mut out = Vec::new();
        renderer
            .redraw(&mut out, 80, 24, &table, &chrome("ready"))
            .expect("redraw");
        assert_eq!(renderer.state(), RenderState::Steady);

        let layout = *renderer.layout().unwrap();
        let region = format!("\x1b[{};{}r", layout.plot.y + 1, layout.plot.bottom());
        let output = text(&out);
        assert!(output.starts_with("\x1b[r"));
        assert!(output.contains(&region));
        assert!(output.contains("splotty"));
        assert!(output.contains("synthetic"));
        assert!(output.contains("ready"));
        assert!(output.contains(" a=1.00"));
    }

    #[test]
    fn redraw_too_small_is_layout_error() {
        let table = table_with(&["a:1"]);
        let mut renderer = Renderer::new(&UiConfig::default(), Local::now());
        let result = renderer.redraw(&mut Vec::new(), 80, 2, &table, &chrome(""));
        assert!(matches!(result, Err(RenderError::Layout(_))));
        assert_eq!(renderer.state(), RenderState::NeedsRedraw);
    }

    #[test]
    fn draw_row_writes_bottom_line_and_newline() {
        let table = table_with(&["a:0\tb:10", "a:10\tb:0"]);
        let mut renderer = Renderer::new(&UiConfig::default(), Local::now());
        renderer
            .redraw(&mut Vec::new(), 80, 24, &table, &chrome(""))
            .unwrap();
        let layout = *renderer.layout().unwrap();

        let mut out = Vec::new();
        renderer.draw_row(&mut out, &table, false, 3).unwrap();
        let output = text(&out);
        let move_to = format!("\x1b[{};{}H", layout.plot_bottom_row() + 1, layout.plot.x + 1);
        assert!(output.starts_with(&move_to));
        assert!(output.ends_with('\n'));
        assert!(output.contains('*'));
        assert!(output.contains('+'));
        assert!(!output.contains(" 3"));
    }

    #[test]
    fn gutter_counter_every_ten_rows() {
        let table = table_with(&["a:1"]);
        let mut renderer = Renderer::new(&UiConfig::default(), Local::now());
        renderer
            .redraw(&mut Vec::new(), 80, 24, &table, &chrome(""))
            .unwrap();
        let mut out = Vec::new();
        renderer.draw_row(&mut out, &table, false, 20).unwrap();
        assert!(text(&out).contains(" 20"));
    }

    #[test]
    fn inline_numbers_follow_glyphs() {
        let table = table_with(&["a:0\tb:100", "a:2.5\tb:50"]);
        let mut renderer = Renderer::new(&UiConfig::default(), Local::now());
        renderer
            .redraw(&mut Vec::new(), 80, 24, &table, &chrome(""))
            .unwrap();
        let mut out = Vec::new();
        renderer.draw_row(&mut out, &table, true, 1).unwrap();
        let output = text(&out);
        assert!(output.contains("2.50"));
        assert!(output.contains("50.00"));
    }

    #[test]
    fn nothing_drawn_before_redraw() {
        let table = table_with(&["a:1"]);
        let mut renderer = Renderer::new(&UiConfig::default(), Local::now());
        let mut out = Vec::new();
        renderer.draw_row(&mut out, &table, false, 0).unwrap();
        renderer.refresh(&mut out, &table, "x").unwrap();
        assert!(out.is_empty());
    }

    #[test]
    fn refresh_updates_values_and_status() {
        let mut table = table_with(&["a:1"]);
        let mut renderer = Renderer::new(&UiConfig::default(), Local::now());
        renderer
            .redraw(&mut Vec::new(), 80, 24, &table, &chrome("old"))
            .unwrap();
        table.ingest(&parse_line("a:42").unwrap());

        let mut out = Vec::new();
        renderer.refresh(&mut out, &table, "new status").unwrap();
        let output = text(&out);
        assert!(output.contains("=42.00"));
        assert!(output.contains("new status"));

        let mut out = Vec::new();
        renderer.refresh(&mut out, &table, "new status").unwrap();
        assert!(!text(&out).contains("new status"));
    }

    #[test]
    fn refresh_after_schema_change_requests_redraw() {
        let mut table = table_with(&["a:1"]);
        let mut renderer = Renderer::new(&UiConfig::default(), Local::now());
        renderer
            .redraw(&mut Vec::new(), 80, 24, &table, &chrome(""))
            .unwrap();
        table.ingest(&parse_line("a:1\tb:2").unwrap());
        renderer.refresh(&mut Vec::new(), &table, "").unwrap();
        assert_eq!(renderer.state(), RenderState::NeedsRedraw);
    }

    #[test]
    fn shortcut_key_uses_key_color() {
        let renderer = Renderer::new(&UiConfig::default(), Local::now());
        let table = table_with(&["temp:1"]);
        let mut field = table.fields()[0].clone();
        field.shortcut = Some('t');
        let entry = LegendEntry::from_field(&field);
        let segments = renderer.entry_segments(&entry);

        assert!(segments.contains(&(Some(renderer.theme.key), "[t]".to_string())));
        let joined: String = segments.iter().map(|(_, text)| text.as_str()).collect();
        assert_eq!(joined, entry.text());
    }

    #[test]
    fn wide_names_are_packed_by_cell_width() {
        // Each entry is 20 cells wide, so none fits beside another in 40.
        let table = table_with(&["温度:1\t湿度:2\t气压:3"]);
        let mut renderer = Renderer::new(&UiConfig::default(), Local::now());
        renderer
            .redraw(&mut Vec::new(), 40, 24, &table, &chrome(""))
            .unwrap();
        assert_eq!(
            renderer.legend_rows,
            vec![vec![], vec![0], vec![1], vec![2]]
        );
    }

    #[test]
    fn disabled_entry_uses_off_color() {
        let renderer = Renderer::new(&UiConfig::default(), Local::now());
        let table = table_with(&["a:1"]);
        let mut field = table.fields()[0].clone();
        field.enabled = false;
        let segments = renderer.entry_segments(&LegendEntry::from_field(&field));
        assert_eq!(segments.last().unwrap(), &(Some(renderer.theme.off), " off".to_string()));
        assert_eq!(segments[0].0, Some(Color::AnsiValue(1)));
    }
}
