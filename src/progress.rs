//! Progress display for the decision loop
//!
//! Visual feedback while dependencies are checked, using indicatif.
//! Disabled in quiet mode and when output is not a terminal-facing run.

use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;

/// Progress reporter over the dependency loop.
pub struct Progress {
    enabled: bool,
    bar: Option<ProgressBar>,
}

impl Progress {
    /// Creates a reporter; pass false to disable all output.
    pub fn new(enabled: bool) -> Self {
        Self { enabled, bar: None }
    }

    /// Shows a spinner for an indeterminate phase.
    pub fn spinner(&mut self, message: &str) {
        if !self.enabled {
            return;
        }
        let spinner = ProgressBar::new_spinner();
        spinner.set_style(
            ProgressStyle::default_spinner()
                .template("{spinner:.cyan} {msg}")
                .expect("Invalid template"),
        );
        spinner.set_message(message.to_string());
        spinner.enable_steady_tick(Duration::from_millis(80));
        self.bar = Some(spinner);
    }

    /// Starts a bar over a known number of dependencies.
    pub fn start(&mut self, total: u64, message: &str) {
        if !self.enabled {
            return;
        }
        let bar = ProgressBar::new(total);
        bar.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.cyan} {msg} [{bar:30.cyan/blue}] {pos}/{len}")
                .expect("Invalid template")
                .progress_chars("█▓▒░"),
        );
        bar.set_message(message.to_string());
        self.bar = Some(bar);
    }

    /// Advances the bar by one.
    pub fn inc(&self) {
        if let Some(bar) = &self.bar {
            bar.inc(1);
        }
    }

    /// Updates the message.
    pub fn set_message(&self, message: &str) {
        if let Some(bar) = &self.bar {
            bar.set_message(message.to_string());
        }
    }

    /// Removes the bar from the terminal.
    pub fn finish_and_clear(&mut self) {
        if let Some(bar) = self.bar.take() {
            bar.finish_and_clear();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_disabled_progress_is_inert() {
        let mut progress = Progress::new(false);
        progress.spinner("working");
        assert!(progress.bar.is_none());
        progress.inc();
        progress.finish_and_clear();
    }

    #[test]
    fn test_bar_lifecycle() {
        let mut progress = Progress::new(true);
        progress.start(3, "Checking dependencies");
        assert!(progress.bar.is_some());
        progress.inc();
        progress.set_message("Checking serde");
        progress.finish_and_clear();
        assert!(progress.bar.is_none());
    }
}
