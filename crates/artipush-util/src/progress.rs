use std::io::Write;
use std::sync::Mutex;

use console::Style;
use indicatif::{ProgressBar, ProgressStyle};

/// Print a Cargo-style status line: `   Uploading build-42.zip`
///
/// The `label` is right-padded to 12 characters and printed in bold green,
/// followed by the `message` in the default terminal colour.
pub fn status(label: &str, message: &str) {
    status_styled(Style::new().green().bold(), label, message);
}

/// Print a warning-style status line (bold yellow label).
pub fn status_warn(label: &str, message: &str) {
    status_styled(Style::new().yellow().bold(), label, message);
}

/// Print an error-style status line (bold red label).
pub fn status_error(label: &str, message: &str) {
    status_styled(Style::new().red().bold(), label, message);
}

fn status_styled(style: Style, label: &str, message: &str) {
    let _ = writeln!(
        std::io::stderr(),
        "{:>12} {message}",
        style.apply_to(label),
    );
}

/// Create an animated spinner with the given message for indeterminate progress.
///
/// The spinner ticks automatically and should be finished with
/// [`ProgressBar::finish_with_message`] or [`ProgressBar::finish_and_clear`].
pub fn spinner(message: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.green} {msg}")
            .expect("valid template"),
    );
    pb.set_message(message.to_string());
    pb.enable_steady_tick(std::time::Duration::from_millis(80));
    pb
}

/// Outcome attached to a completed step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusLevel {
    Ok,
    Warning,
    Error,
}

/// Sink for human-readable progress of a single operation.
///
/// `update` replaces the in-flight message, `step` records a finished step,
/// and `close` releases whatever the sink holds (spinners, buffers).
pub trait StatusReporter: Send + Sync {
    fn update(&self, message: &str);
    fn step(&self, level: StatusLevel, message: &str);
    fn close(&self);
}

/// Scoped handle on a [`StatusReporter`]; closes it exactly once when dropped.
pub struct StatusScope<'a> {
    reporter: &'a dyn StatusReporter,
}

impl<'a> StatusScope<'a> {
    pub fn open(reporter: &'a dyn StatusReporter) -> Self {
        Self { reporter }
    }

    pub fn update(&self, message: &str) {
        self.reporter.update(message);
    }

    pub fn step(&self, level: StatusLevel, message: &str) {
        self.reporter.step(level, message);
    }
}

impl Drop for StatusScope<'_> {
    fn drop(&mut self) {
        self.reporter.close();
    }
}

/// Terminal reporter: a spinner for updates, coloured status lines for steps.
#[derive(Default)]
pub struct TerminalStatus {
    spinner: Mutex<Option<ProgressBar>>,
}

impl TerminalStatus {
    pub fn new() -> Self {
        Self::default()
    }
}

impl StatusReporter for TerminalStatus {
    fn update(&self, message: &str) {
        let Ok(mut guard) = self.spinner.lock() else {
            return;
        };
        match guard.as_ref() {
            Some(pb) => pb.set_message(message.to_string()),
            None => *guard = Some(spinner(message)),
        }
    }

    fn step(&self, level: StatusLevel, message: &str) {
        let print = || match level {
            StatusLevel::Ok => status("Success", message),
            StatusLevel::Warning => status_warn("Warning", message),
            StatusLevel::Error => status_error("Error", message),
        };
        match self.spinner.lock().ok().as_deref().and_then(Option::as_ref) {
            Some(pb) => pb.suspend(print),
            None => print(),
        }
    }

    fn close(&self) {
        if let Ok(mut guard) = self.spinner.lock() {
            if let Some(pb) = guard.take() {
                pb.finish_and_clear();
            }
        }
    }
}
