//! Terminal lifecycle and the event loop
//!
//! Single-threaded: block on the next terminal event, apply it to the editor,
//! redraw. Resize events only trigger the redraw.

use std::io::{self, Stdout};

use anyhow::{Context, Result};
use crossterm::event::{self, Event, KeyEventKind};
use crossterm::execute;
use crossterm::terminal::{
    EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode,
};
use ratatui::Terminal;
use ratatui::backend::CrosstermBackend;
use tracing::{debug, error, info};

use crate::editor::{Editor, Flow};
use crate::grid::GridRenderer;
use crate::ui;

/// Raw mode and alternate screen, undone on drop
struct TerminalGuard {
    terminal: Terminal<CrosstermBackend<Stdout>>,
}

impl TerminalGuard {
    fn enter() -> Result<Self> {
        enable_raw_mode().context("Failed to enable raw mode")?;
        let mut stdout = io::stdout();
        if let Err(e) = execute!(stdout, EnterAlternateScreen) {
            let _ = disable_raw_mode();
            return Err(e).context("Failed to enter alternate screen");
        }
        match Terminal::new(CrosstermBackend::new(stdout)) {
            Ok(terminal) => Ok(Self { terminal }),
            Err(e) => {
                let _ = execute!(io::stdout(), LeaveAlternateScreen);
                let _ = disable_raw_mode();
                Err(e).context("Failed to create terminal")
            }
        }
    }
}

impl Drop for TerminalGuard {
    fn drop(&mut self) {
        if let Err(e) = disable_raw_mode() {
            error!(error = %e, "Failed to disable raw mode");
        }
        if let Err(e) = execute!(self.terminal.backend_mut(), LeaveAlternateScreen) {
            error!(error = %e, "Failed to leave alternate screen");
        }
        let _ = self.terminal.show_cursor();
    }
}

/// Run the editor until the user quits
pub fn run(mut editor: Editor, renderer: GridRenderer) -> Result<()> {
    let mut guard = TerminalGuard::enter()?;
    info!("Terminal ready");

    loop {
        guard
            .terminal
            .draw(|frame| ui::draw(frame, &editor, &renderer))
            .context("Failed to draw frame")?;

        match event::read().context("Failed to read terminal event")? {
            Event::Key(key) if key.kind == KeyEventKind::Press => {
                if editor.handle_key(key) == Flow::Quit {
                    info!("Quit requested");
                    break;
                }
            }
            Event::Resize(width, height) => debug!(width, height, "Terminal resized"),
            _ => {}
        }
    }

    Ok(())
}
