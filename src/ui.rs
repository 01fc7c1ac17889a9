//! Terminal rendering of a job: spinner while it runs, coloured outcome at the end.
//!
//! Uses `indicatif` for the spinner and `console` for styles. [`JobProgress`]
//! consumes the snapshots pushed by the driver and never touches the job itself.

use console::Style;
use indicatif::{ProgressBar, ProgressStyle};

use crate::state_machine::{JobReport, JobSnapshot, Phase};

/// Spinner line shown while a job is in the given phase.
pub fn phase_message(phase: Phase) -> &'static str {
    match phase {
        Phase::Begin => "Preparing",
        Phase::ImageReceived => "Please wait, this might take a while",
        Phase::UrlFetched => "Uploading image",
        Phase::ImageUploaded => "Waiting for processing to start",
        Phase::StillProcessingText => "Reading text from the image",
        Phase::StillProcessingAudio => "Producing audio",
        Phase::Finish => "Done",
        _ => "Stopped",
    }
}

pub struct JobProgress {
    pb: ProgressBar,
    green: Style,
    red: Style,
    yellow: Style,
    dim: Style,
}

impl JobProgress {
    pub fn start(image: &str) -> Self {
        let pb = ProgressBar::new_spinner();
        let style = ProgressStyle::default_spinner()
            .template("{spinner:.cyan} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner());
        pb.set_style(style);
        pb.set_message(format!("{image}: {}", phase_message(Phase::Begin)));
        pb.enable_steady_tick(std::time::Duration::from_millis(100));

        Self {
            pb,
            green: Style::new().green().bold(),
            red: Style::new().red().bold(),
            yellow: Style::new().yellow(),
            dim: Style::new().dim(),
        }
    }

    /// Reflects a new snapshot in the spinner line.
    pub fn update(&self, snapshot: &JobSnapshot) {
        let detail = match (&snapshot.processed_text, snapshot.phase) {
            (Some(text), Phase::StillProcessingAudio) => {
                format!("({} characters read)", text.chars().count())
            }
            _ => format!("[{}]", snapshot.phase),
        };
        self.pb.set_message(format!(
            "{} {}",
            phase_message(snapshot.phase),
            self.dim.apply_to(detail)
        ));
    }

    /// Clears the spinner and prints how the job ended.
    pub fn complete(&self, report: &JobReport) {
        self.pb.finish_and_clear();

        if let Some(text) = &report.processed_text
            && !text.is_empty()
        {
            println!("{text}");
            println!();
        }

        if report.cancelled {
            println!(
                "  {} Job stopped before finishing ({})",
                self.yellow.apply_to("↻"),
                report.phase
            );
            return;
        }

        match (&report.audio_url, report.failure) {
            (Some(url), None) => {
                println!("  {} Audio ready: {url}", self.green.apply_to("✓"));
            }
            (_, Some(failure)) if failure.is_transient() => {
                println!("  {} {failure}", self.yellow.apply_to("↻"));
            }
            (_, Some(failure)) => {
                println!("  {} {failure}", self.red.apply_to("✗"));
            }
            (None, None) => {
                println!("  {} Job ended in {}", self.yellow.apply_to("?"), report.phase);
            }
        }
    }

    /// Prints the job report as pretty JSON.
    pub fn print_report(&self, report: &JobReport) {
        let style = if report.phase.is_success() {
            &self.green
        } else if report.phase.is_failure() {
            &self.red
        } else {
            &self.yellow
        };
        println!();
        println!("{}", style.apply_to("─── Job Report ───"));
        println!("{}", serde_json::to_string_pretty(report).unwrap_or_default());
    }
}
