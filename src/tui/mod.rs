//! TUI interface using ratatui
//!
//! An interactive form for generating the HWOL workbook:
//! - pick the lab file, sample column and variant
//! - Enter runs the pipeline, showing each stage as it happens
//! - the results table lists every template row with its value
//! - `s` saves the workbook to the output directory

mod app;
mod draw;
mod state;

pub use app::{App, Settings};
pub use state::InputMode;

use std::io::{self, stdout};
use std::time::Duration;

use crossterm::{
    event::{self, Event, KeyCode, KeyEventKind},
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
    ExecutableCommand,
};
use ratatui::prelude::*;

use crate::pipeline;
use draw::draw_ui;

type Term = Terminal<CrosstermBackend<io::Stdout>>;

/// Runs the TUI interface until the user quits.
pub fn run(settings: Settings) -> anyhow::Result<()> {
    enable_raw_mode()?;
    stdout().execute(EnterAlternateScreen)?;
    let mut terminal = Terminal::new(CrosstermBackend::new(stdout()))?;
    let result = run_app(&mut terminal, App::new(settings));
    let _ = disable_raw_mode();
    let _ = stdout().execute(LeaveAlternateScreen);
    result
}

/// Runs one request, redrawing at every stage.
fn generate(terminal: &mut Term, app: &mut App) -> anyhow::Result<()> {
    let request = match app.request() {
        Ok(r) => r,
        Err(message) => {
            app.set_status(message);
            return Ok(());
        }
    };

    app.begin();
    let mut draw_error = None;
    let result = pipeline::generate(&request, |stage| {
        app.stage = stage;
        if let Err(e) = terminal.draw(|frame| draw_ui(frame, app)) {
            draw_error.get_or_insert(e);
        }
    });
    app.finish(result);

    match draw_error {
        Some(e) => Err(e.into()),
        None => Ok(()),
    }
}

fn run_app(terminal: &mut Term, mut app: App) -> anyhow::Result<()> {
    loop {
        terminal.draw(|frame| draw_ui(frame, &mut app))?;
        if !event::poll(Duration::from_millis(50))? {
            continue;
        }
        let Event::Key(key) = event::read()? else {
            continue;
        };
        if key.kind != KeyEventKind::Press {
            continue;
        }
        match app.input_mode {
            InputMode::Normal => match key.code {
                KeyCode::Char('q') | KeyCode::Esc => return Ok(()),
                KeyCode::Enter => generate(terminal, &mut app)?,
                KeyCode::Char('s') if app.can_save() => {
                    if let Err(e) = app.save() {
                        app.set_status(format!("Error: {e}"));
                    }
                }
                KeyCode::Char('e' | 'i') => app.edit_focused(),
                KeyCode::Char('v') => app.toggle_variant(),
                KeyCode::Tab => app.next_field(),
                KeyCode::BackTab => app.prev_field(),
                KeyCode::Up | KeyCode::Char('k') => app.select_previous(),
                KeyCode::Down | KeyCode::Char('j') => app.select_next(),
                _ => {}
            },
            InputMode::Editing => match key.code {
                KeyCode::Enter | KeyCode::Esc => app.stop_editing(),
                KeyCode::Backspace => app.input_pop(),
                KeyCode::Char(c) => app.input_push(c),
                KeyCode::Tab => {
                    app.stop_editing();
                    app.next_field();
                }
                _ => {}
            },
        }
    }
}
