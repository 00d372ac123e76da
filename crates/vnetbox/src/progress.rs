//! Spinner shown on stderr while a run is in flight.

use std::io::IsTerminal;
use std::time::Duration;

use indicatif::{ProgressBar, ProgressStyle};

pub struct RunProgress {
    bar: Option<ProgressBar>,
}

impl RunProgress {
    /// A no-op when disabled or when stderr is not a terminal.
    pub fn start(message: &str, enabled: bool, dry_run: bool) -> Self {
        if !enabled || !std::io::stderr().is_terminal() {
            return Self { bar: None };
        }

        let template = if dry_run {
            "{spinner:.yellow} (dry-run) {msg} [{elapsed}]"
        } else {
            "{spinner:.green} {msg} [{elapsed}]"
        };
        let bar = ProgressBar::new_spinner();
        if let Ok(style) = ProgressStyle::with_template(template) {
            bar.set_style(style);
        }
        bar.set_message(message.to_owned());
        bar.enable_steady_tick(Duration::from_millis(100));
        Self { bar: Some(bar) }
    }

    pub fn finish(&self) {
        if let Some(ref bar) = self.bar {
            bar.finish_and_clear();
        }
    }
}
