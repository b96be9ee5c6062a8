//! Observers that receive board snapshots from the coordinator

use std::io::{self, Write};

use colored::{ColoredString, Colorize};
use tracing::{debug, warn};

use super::snapshot::{BoardSnapshot, Cell};
use crate::domain::Position;

/// Passive consumer of the coordinator's view
///
/// The coordinator is held across awaits on a spawned task, so observers must
/// be `Sync` as well as `Send`.
pub trait BoardObserver: Send + Sync {
    fn render(&mut self, snapshot: &BoardSnapshot);
}

/// Discards every snapshot (`--no-render`, tests)
#[derive(Debug, Default)]
pub struct NullObserver;

impl BoardObserver for NullObserver {
    fn render(&mut self, _snapshot: &BoardSnapshot) {}
}

/// Redraws the board in place on stdout
#[derive(Debug)]
pub struct TerminalRenderer {
    color: bool,
}

impl TerminalRenderer {
    pub fn new(color: bool) -> Self {
        debug!(color, "TerminalRenderer::new: called");
        Self { color }
    }

    fn paint(&self, cell: Cell) -> ColoredString {
        let symbol = cell.symbol().to_string();
        if !self.color {
            return symbol.normal();
        }
        match cell {
            Cell::Empty => symbol.dimmed(),
            Cell::Seeker => symbol.red().bold(),
            Cell::Hider => symbol.green(),
            Cell::Frozen => symbol.cyan(),
            Cell::Crowded => symbol.yellow().bold(),
        }
    }

    /// Full frame as it is written to the terminal
    pub fn frame(&self, snapshot: &BoardSnapshot) -> String {
        let mut out = String::new();
        for y in 0..snapshot.height as i32 {
            let row: Vec<String> = (0..snapshot.width as i32)
                .map(|x| self.paint(snapshot.cell_at(Position::new(x, y))).to_string())
                .collect();
            out.push_str(&row.join(" "));
            out.push('\n');
        }
        out.push('\n');
        out.push_str(&snapshot.summary());
        out.push('\n');
        out
    }
}

impl BoardObserver for TerminalRenderer {
    fn render(&mut self, snapshot: &BoardSnapshot) {
        let frame = self.frame(snapshot);
        let mut stdout = io::stdout().lock();
        // Clear screen and home the cursor before each frame
        if let Err(e) = write!(stdout, "\x1b[2J\x1b[H{frame}").and_then(|_| stdout.flush()) {
            warn!(error = %e, "TerminalRenderer: failed to draw frame");
        }
    }
}
