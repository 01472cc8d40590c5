//! Session context and the event loop tick
//!
//! [`App`] owns every piece of mutable state: the field table, the key
//! decoder, the data source and the renderer. One call to [`App::tick`] is
//! one pass of the loop:
//!
//! 1. check termination and resize flags
//! 2. decode at most one input byte and act on it
//! 3. ingest pending data lines, one plot row each
//! 4. relayout if needed, then refresh legend values and status

use crate::config::Config;
use crate::data::{parse_line, DataSource, SyntheticSource};
use crate::fields::{EnabledStates, FieldSpec, FieldTable};
use crate::keyboard::{ByteSource, KeyDecoder, KeyEvent, KeyKind, NamedKey};
use crate::shortcuts::AssignOptions;
use crate::signals;
use crate::ui::{Chrome, RenderError, RenderState, Renderer};
use chrono::{DateTime, Local};
use log::{debug, info, warn};
use std::collections::HashSet;
use std::io::{self, Write};
use std::time::{Duration, Instant};
use thiserror::Error;

/// Redraw request (Ctrl-L)
const CTRL_L: char = '\x0c';
const MIN_TICK: Duration = Duration::from_millis(1);
const MAX_TICK: Duration = Duration::from_secs(1);

/// Where the loop reads keys from and draws to
pub trait Console: ByteSource {
    type Output: Write;

    /// Terminal size as (columns, rows)
    fn size(&self) -> io::Result<(u16, u16)>;

    fn output(&mut self) -> &mut Self::Output;
}

#[derive(Debug, Error)]
pub enum AppError {
    #[error("console I/O failed: {0}")]
    Io(#[from] io::Error),
    #[error(transparent)]
    Render(#[from] RenderError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    Continue,
    Quit,
}

pub struct App {
    config: Config,
    table: FieldTable,
    decoder: KeyDecoder,
    source: Box<dyn DataSource>,
    source_name: String,
    renderer: Renderer,
    reserved: HashSet<char>,
    help: String,
    status: String,
    inline_numbers: bool,
    tick_interval: Duration,
    running: bool,
    samples: u64,
}

impl App {
    pub fn new(
        config: Config,
        spec: FieldSpec,
        source: Box<dyn DataSource>,
        decoder: KeyDecoder,
        started: DateTime<Local>,
    ) -> Self {
        let help = format!(
            "{} quit  {} numbers  ^L redraw  Up/Down speed  [key] toggles a field or <group>",
            config.keys.quit, config.keys.inline_numbers
        );
        let mut table = FieldTable::new(spec, config.ui.window_size);
        let reserved = config.reserved_keys();
        // Groups get their keys before any data arrives. Only this startup
        // pass pauses on conflicts; the loop never sleeps mid-tick.
        let startup = AssignOptions {
            conflict_pause: config.conflict_pause(),
        };
        if let Some(exhausted) = table.assign_shortcuts(&reserved, &startup) {
            warn!("{}", exhausted);
        }

        Self {
            source_name: source.describe(),
            renderer: Renderer::new(&config.ui, started),
            inline_numbers: config.ui.inline_numbers,
            tick_interval: config.refresh_interval(),
            status: "waiting for data".to_string(),
            config,
            table,
            decoder,
            source,
            reserved,
            help,
            running: true,
            samples: 0,
        }
    }

    pub fn table(&self) -> &FieldTable {
        &self.table
    }

    pub fn renderer(&self) -> &Renderer {
        &self.renderer
    }

    pub fn status(&self) -> &str {
        &self.status
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn inline_numbers(&self) -> bool {
        self.inline_numbers
    }

    /// Sleep between ticks
    pub fn tick_interval(&self) -> Duration {
        self.tick_interval
    }

    /// Data lines plotted so far
    pub fn samples(&self) -> u64 {
        self.samples
    }

    pub fn source_name(&self) -> &str {
        &self.source_name
    }

    pub fn restore_states(&mut self, states: &EnabledStates) {
        self.table.restore_states(states);
        self.renderer.request_redraw();
    }

    pub fn snapshot_states(&self) -> EnabledStates {
        self.table.snapshot_states()
    }

    pub fn set_status(&mut self, status: impl Into<String>) {
        self.status = status.into();
    }

    /// Run one pass of the loop.
    pub fn tick<C: Console>(&mut self, console: &mut C, now: Instant) -> Result<TickOutcome, AppError> {
        if signals::terminate_requested() {
            info!("termination requested");
            self.running = false;
            return Ok(TickOutcome::Quit);
        }
        if signals::take_resize() {
            debug!("resize");
            self.renderer.request_redraw();
        }

        if let Some(event) = self.decoder.poll(console, now)? {
            if self.handle_key(&event) == TickOutcome::Quit {
                self.running = false;
                return Ok(TickOutcome::Quit);
            }
        }

        self.ensure_layout(console)?;
        self.ingest(console, now)?;
        self.ensure_layout(console)?;

        self.renderer
            .refresh(console.output(), &self.table, &self.status)?;
        Ok(TickOutcome::Continue)
    }

    fn handle_key(&mut self, event: &KeyEvent) -> TickOutcome {
        match event.kind {
            KeyKind::Char(ch) if ch == self.config.keys.quit => return TickOutcome::Quit,
            KeyKind::Char(ch) if ch == self.config.keys.inline_numbers => {
                self.inline_numbers = !self.inline_numbers;
                self.status = format!(
                    "inline numbers {}",
                    if self.inline_numbers { "on" } else { "off" }
                );
            }
            KeyKind::Char(CTRL_L) => {
                self.status = "redraw".to_string();
                self.renderer.request_redraw();
            }
            KeyKind::Char(ch) => match self.table.toggle_key(ch) {
                Some(toggled) => {
                    let name = if toggled.is_group {
                        format!("<{}>", toggled.name)
                    } else {
                        toggled.name
                    };
                    self.status = format!("{} {}", name, if toggled.enabled { "on" } else { "off" });
                    debug!("toggled {}", self.status);
                }
                None => debug!("unbound key {:?}", ch),
            },
            KeyKind::Named(NamedKey::Up) => {
                self.tick_interval = (self.tick_interval / 2).max(MIN_TICK);
                self.status = format!("tick {} ms", self.tick_interval.as_millis());
            }
            KeyKind::Named(NamedKey::Down) => {
                self.tick_interval = (self.tick_interval * 2).min(MAX_TICK);
                self.status = format!("tick {} ms", self.tick_interval.as_millis());
            }
            KeyKind::Named(key) => debug!("ignoring {}", key.name()),
            KeyKind::Escape => debug!("ignoring escape"),
            KeyKind::Byte(byte) => debug!("ignoring byte {:#04x}", byte),
        }
        TickOutcome::Continue
    }

    /// Pull up to `max_lines_per_tick` lines from the source.
    fn ingest<C: Console>(&mut self, console: &mut C, now: Instant) -> Result<(), AppError> {
        for _ in 0..self.config.ui.max_lines_per_tick.max(1) {
            let line = match self.source.poll_line(now) {
                Ok(Some(line)) => line,
                Ok(None) => break,
                Err(e) => {
                    warn!("{}; switching to synthetic data", e);
                    self.source = Box::new(SyntheticSource::new(&self.config.synthetic));
                    self.source_name = self.source.describe();
                    self.status = format!("source lost: {e}");
                    self.renderer.request_redraw();
                    break;
                }
            };

            let parsed = match parse_line(&line) {
                Ok(parsed) => parsed,
                Err(e) => {
                    debug!("dropping line {:?}: {}", line, e);
                    continue;
                }
            };
            for token in &parsed.rejected {
                debug!("dropping token {:?}", token);
            }

            if self.table.ingest(&parsed).schema_changed {
                self.on_schema_change();
                self.ensure_layout(console)?;
            }
            self.renderer
                .draw_row(console.output(), &self.table, self.inline_numbers, self.samples)?;
            self.samples += 1;
        }
        Ok(())
    }

    fn on_schema_change(&mut self) {
        match self
            .table
            .assign_shortcuts(&self.reserved, &AssignOptions::immediate())
        {
            Some(exhausted) => self.status = exhausted.to_string(),
            None => self.status = format!("{} fields", self.table.visible().count()),
        }
        self.renderer.request_redraw();
    }

    /// Relayout and repaint static regions if a redraw is pending.
    fn ensure_layout<C: Console>(&mut self, console: &mut C) -> Result<(), AppError> {
        if self.renderer.state() == RenderState::Steady {
            return Ok(());
        }
        self.table.resolve_groups();
        let (cols, rows) = console.size()?;
        let chrome = Chrome {
            source: &self.source_name,
            help: &self.help,
            status: &self.status,
        };
        self.renderer
            .redraw(console.output(), cols, rows, &self.table, &chrome)?;
        Ok(())
    }
}
