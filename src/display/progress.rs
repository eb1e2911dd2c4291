//! Spinners for long-running CLI steps.

use indicatif::{ProgressBar, ProgressStyle};
use is_terminal::IsTerminal;
use std::time::Duration;

use crate::ingest::{IngestReport, IngestStage};

const TICKS: &[&str] = &["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"];

/// Spinner on stderr; hidden when stderr is not a terminal.
pub fn create_spinner(message: &str) -> ProgressBar {
    if !std::io::stderr().is_terminal() {
        return ProgressBar::hidden();
    }
    let spinner = ProgressBar::new_spinner();
    let style = ProgressStyle::default_spinner()
        .template("{spinner:.green} {msg} {elapsed:.dim}")
        .unwrap_or_else(|_| ProgressStyle::default_spinner())
        .tick_strings(TICKS);
    spinner.set_style(style);
    spinner.set_message(message.to_string());
    spinner.enable_steady_tick(Duration::from_millis(80));
    spinner
}

/// Runs `operation` behind a spinner.
pub fn with_spinner<F, T>(message: &str, operation: F) -> T
where
    F: FnOnce() -> T,
{
    let spinner = create_spinner(message);
    let result = operation();
    spinner.finish_and_clear();
    result
}

/// One spinner line per ingestion stage; finished stages stay on screen.
pub struct StageProgress {
    current: Option<(IngestStage, ProgressBar)>,
}

impl Default for StageProgress {
    fn default() -> Self {
        Self::new()
    }
}

impl StageProgress {
    pub fn new() -> Self {
        Self { current: None }
    }

    pub fn update(&mut self, report: &IngestReport) {
        if let Some((stage, bar)) = &self.current {
            if *stage == report.stage {
                return;
            }
            bar.finish_with_message(format!("{} {}", stage.label(), summary(*stage, report)));
        }
        if report.stage == IngestStage::Done {
            self.current = None;
        } else {
            self.current = Some((report.stage, create_spinner(report.stage.label())));
        }
    }

    /// Marks the running stage as failed.
    pub fn fail(&mut self) {
        if let Some((stage, bar)) = self.current.take() {
            bar.abandon_with_message(format!("{} failed", stage.label()));
        }
    }
}

fn summary(stage: IngestStage, report: &IngestReport) -> String {
    match stage {
        IngestStage::Loading => format!("({} documents)", report.documents_loaded),
        IngestStage::Chunking | IngestStage::Embedding => format!("({} chunks)", report.chunks),
        IngestStage::Building => format!("({} partitions)", report.partitions),
        IngestStage::Saving | IngestStage::Done => String::new(),
    }
}
