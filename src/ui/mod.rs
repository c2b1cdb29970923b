//! Progress reporting for long-running downloads and loads
//!
//! Provides a simple API for displaying pipeline state:
//! - Current phase (Downloading, Extracting, Loading, Indexing)
//! - Progress (current/total with a label)
//! - Activity log

use indicatif::{ProgressBar, ProgressStyle};
use tracing::info;

/// Pipeline phases
#[derive(Debug, Clone, PartialEq)]
pub enum Phase {
    Downloading,
    Extracting,
    Loading,
    Indexing,
    Complete,
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Phase::Downloading => write!(f, "Downloading dumps"),
            Phase::Extracting => write!(f, "Extracting files"),
            Phase::Loading => write!(f, "Loading tables"),
            Phase::Indexing => write!(f, "Building language columns and search index"),
            Phase::Complete => write!(f, "Complete"),
        }
    }
}

/// Trait for UI implementations - allows both console and silent/test modes
pub trait Ui {
    fn set_phase(&mut self, phase: Phase);
    fn set_progress(&mut self, current: u64, total: u64, label: impl Into<String>);
    fn clear_progress(&mut self);
    fn log(&mut self, message: impl Into<String>);
}

/// Console UI: one progress bar at a time, messages go to the log
pub struct ConsoleUi {
    bar: Option<ProgressBar>,
}

impl ConsoleUi {
    pub fn new() -> Self {
        Self { bar: None }
    }

    fn bar(&mut self, total: u64) -> &ProgressBar {
        let bar = self.bar.get_or_insert_with(|| {
            let bar = ProgressBar::new(total);
            let style = ProgressStyle::default_bar()
                .template("{msg:30} [{bar:40.cyan/blue}] {percent:>3}%")
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("=>-");
            bar.set_style(style);
            bar
        });
        if bar.length() != Some(total) {
            bar.set_length(total);
        }
        bar
    }
}

impl Default for ConsoleUi {
    fn default() -> Self {
        Self::new()
    }
}

impl Ui for ConsoleUi {
    fn set_phase(&mut self, phase: Phase) {
        self.clear_progress();
        info!("{}", phase);
    }

    fn set_progress(&mut self, current: u64, total: u64, label: impl Into<String>) {
        let bar = self.bar(total);
        bar.set_position(current);
        bar.set_message(label.into());
    }

    fn clear_progress(&mut self) {
        if let Some(bar) = self.bar.take() {
            bar.finish_and_clear();
        }
    }

    fn log(&mut self, message: impl Into<String>) {
        let message = message.into();
        match &self.bar {
            Some(bar) => bar.suspend(|| info!("{}", message)),
            None => info!("{}", message),
        }
    }
}

impl Drop for ConsoleUi {
    fn drop(&mut self) {
        self.clear_progress();
    }
}

/// Silent UI implementation for testing and non-interactive use
#[derive(Default)]
pub struct SilentUi;

impl SilentUi {
    pub fn new() -> Self {
        Self
    }
}

impl Ui for SilentUi {
    fn set_phase(&mut self, _phase: Phase) {}
    fn set_progress(&mut self, _current: u64, _total: u64, _label: impl Into<String>) {}
    fn clear_progress(&mut self) {}
    fn log(&mut self, _message: impl Into<String>) {}
}
