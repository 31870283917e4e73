use indicatif::{ProgressBar, ProgressStyle};
use scout_core::{RunStatus, RunViewModel};
use scout_engine::ProgressRenderer;

use super::constants::*;
use super::layout::format_row;

/// Draws a run as a progress bar with rows printed above it as they arrive.
pub struct TerminalRenderer {
    bar: ProgressBar,
    printed: usize,
}

impl TerminalRenderer {
    pub fn new(target: usize) -> Self {
        let bar = ProgressBar::new(target as u64);
        if let Ok(style) = ProgressStyle::with_template(BAR_TEMPLATE) {
            bar.set_style(style.progress_chars(BAR_CHARS));
        }
        bar.set_prefix(PREFIX_RUNNING);
        Self { bar, printed: 0 }
    }

    /// Prints a line above the bar without tearing it.
    pub fn println(&self, line: impl AsRef<str>) {
        self.bar.println(line);
    }
}

impl ProgressRenderer for TerminalRenderer {
    fn render(&mut self, view: &RunViewModel) {
        for (i, row) in view.rows.iter().enumerate().skip(self.printed) {
            self.bar.println(format_row(i + 1, row));
        }
        self.printed = view.rows.len();

        self.bar.set_length(view.target as u64);
        self.bar.set_position(view.collected as u64);
        self.bar.set_message(status_message(view));

        match view.status {
            RunStatus::Running => {}
            RunStatus::Complete => self.bar.set_prefix(PREFIX_DONE),
            RunStatus::Exhausted | RunStatus::TimedOut | RunStatus::Cancelled => {
                self.bar.set_prefix(PREFIX_STOPPED);
                self.bar.abandon();
            }
        }
    }

    fn export_ready(&mut self, view: &RunViewModel) {
        self.bar
            .println(format!("All {} listings collected", view.collected));
        self.bar.finish();
    }
}

fn status_message(view: &RunViewModel) -> String {
    if view.error_count == 0 {
        view.status_line()
    } else {
        format!("{} ({} errors)", view.status_line(), view.error_count)
    }
}
