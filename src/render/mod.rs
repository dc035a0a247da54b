//! Console rendering of grid snapshots
//!
//! This module is READ-ONLY - it only ever sees `GridSnapshot`s obtained
//! through `GridView` and never touches live simulation state.

use crate::core::config::VisualisationConfig;
use crate::core::error::Result;
use crate::core::types::LaneAxis;
use crate::grid::motion::GridView;
use crate::grid::state::GridSnapshot;
use crossterm::{
    cursor::MoveTo,
    execute,
    terminal::{Clear, ClearType},
    tty::IsTty,
};
use std::io::{self, Write};
use std::sync::Arc;
use tokio::sync::watch;
use tokio::time::{self, MissedTickBehavior};

/// Draw one frame: road borders, cell separators, a symbol per occupant
pub fn render_frame(snapshot: &GridSnapshot, config: &VisualisationConfig) -> String {
    let border = "==".repeat(snapshot.columns());
    let mut frame = String::with_capacity((snapshot.columns() * 2 + 2) * (snapshot.rows() + 2));

    frame.push_str(&border);
    frame.push('\n');

    for row in 0..snapshot.rows() {
        frame.push('|');
        for cell in snapshot.row(row).unwrap_or_default() {
            let symbol = match cell.map(|direction| direction.axis()) {
                Some(LaneAxis::Horizontal) => config.horizontal_symbol,
                Some(LaneAxis::Vertical) => config.vertical_symbol,
                None => ' ',
            };
            frame.push(symbol);
            frame.push('|');
        }
        frame.push('\n');
    }

    frame.push_str(&border);
    frame
}

/// Polls a grid view at a fixed refresh rate and prints frames
pub struct Visualiser {
    view: Arc<dyn GridView>,
    config: VisualisationConfig,
}

impl Visualiser {
    pub fn new(view: Arc<dyn GridView>, config: VisualisationConfig) -> Self {
        Self { view, config }
    }

    /// Draw up to `config.frames` frames to stdout. Returns the number drawn;
    /// fewer than requested if `shutdown` fires first.
    pub async fn run(self, mut shutdown: watch::Receiver<bool>) -> Result<u32> {
        let mut stdout = io::stdout();
        let clear = stdout.is_tty();
        let mut ticker = time::interval(self.config.refresh_rate());
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        for frame in 1..=self.config.frames {
            tokio::select! {
                _ = ticker.tick() => {}
                _ = crate::traffic::shutdown_requested(&mut shutdown) => return Ok(frame - 1),
            }

            let snapshot = self.view.snapshot()?;
            if clear {
                execute!(stdout, Clear(ClearType::All), MoveTo(0, 0))?;
            }
            writeln!(stdout, "Frame: {}", frame)?;
            writeln!(stdout, "{}", render_frame(&snapshot, &self.config))?;
            stdout.flush()?;
        }

        Ok(self.config.frames)
    }
}
