//! Signal flags and terminal restoration
//!
//! The resize and terminate flags are process-wide, so these tests live in
//! their own binary and run the flag sequence inside a single test.

use chrono::Local;
use splotty::config::Config;
use splotty::data::{DataSource, SourceError};
use splotty::fields::FieldSpec;
use splotty::keyboard::{ByteSource, KeyDecoder};
use splotty::ui::RenderState;
use splotty::{signals, terminal, App, Console, TickOutcome};
use std::collections::VecDeque;
use std::io;
use std::time::Instant;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

struct FakeConsole {
    output: Vec<u8>,
    size: (u16, u16),
}

impl FakeConsole {
    fn take_output(&mut self) -> String {
        String::from_utf8_lossy(&std::mem::take(&mut self.output)).into_owned()
    }
}

impl ByteSource for FakeConsole {
    fn read_byte(&mut self) -> io::Result<Option<u8>> {
        Ok(None)
    }
}

impl Console for FakeConsole {
    type Output = Vec<u8>;

    fn size(&self) -> io::Result<(u16, u16)> {
        Ok(self.size)
    }

    fn output(&mut self) -> &mut Vec<u8> {
        &mut self.output
    }
}

struct ScriptedSource {
    lines: VecDeque<String>,
}

impl DataSource for ScriptedSource {
    fn poll_line(&mut self, _now: Instant) -> Result<Option<String>, SourceError> {
        Ok(self.lines.pop_front())
    }

    fn describe(&self) -> String {
        "scripted".to_string()
    }
}

fn app(lines: &[&str]) -> App {
    let mut config = Config::default();
    config.keys.conflict_pause_ms = 0;
    let source = ScriptedSource {
        lines: lines.iter().map(|l| l.to_string()).collect(),
    };
    App::new(
        config,
        FieldSpec::empty(),
        Box::new(source),
        KeyDecoder::default(),
        Local::now(),
    )
}

// ---------------------------------------------------------------------------
// Signals
// ---------------------------------------------------------------------------

#[test]
fn resize_redraws_and_terminate_quits() {
    let mut app = app(&["a:1", "a:2"]);
    let mut console = FakeConsole {
        output: Vec::new(),
        size: (80, 24),
    };

    app.tick(&mut console, Instant::now()).unwrap();
    assert_eq!(app.renderer().state(), RenderState::Steady);
    console.take_output();

    // A steady tick repaints nothing static.
    app.tick(&mut console, Instant::now()).unwrap();
    assert!(!console.take_output().contains("\x1b[r"));

    console.size = (100, 30);
    signals::notify_resize();
    assert_eq!(
        app.tick(&mut console, Instant::now()).unwrap(),
        TickOutcome::Continue
    );
    let output = console.take_output();
    let layout = *app.renderer().layout().expect("layout after resize");
    assert_eq!(layout.cols, 100);
    assert!(output.contains("\x1b[r"));
    let region = format!("\x1b[{};{}r", layout.plot.y + 1, layout.plot.bottom());
    assert!(output.contains(&region));
    assert!(!signals::take_resize());

    signals::request_terminate();
    assert_eq!(
        app.tick(&mut console, Instant::now()).unwrap(),
        TickOutcome::Quit
    );
    assert!(!app.is_running());
    assert!(console.take_output().is_empty());
}

// ---------------------------------------------------------------------------
// Terminal restoration
// ---------------------------------------------------------------------------

#[test]
fn cleanup_runs_exactly_once() {
    assert!(terminal::cleanup());
    assert!(!terminal::cleanup());
    assert!(!terminal::cleanup());
}
