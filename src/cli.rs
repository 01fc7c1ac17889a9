//! Command-line interface based on clap.
//!
//! [`Cli`] carries the subcommands ([`Command`]: submit, status) and the
//! global flags that override `snapvoice.toml`.

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

use crate::pipeline::Voice;

/// snapvoice: read the text in a picture out loud.
#[derive(Debug, Parser)]
#[command(name = "snapvoice", version, about)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Voice used for the synthesized audio.
    #[arg(long, global = true)]
    pub voice: Option<VoiceArg>,

    /// Milliseconds between two status requests.
    #[arg(long, global = true)]
    pub poll_interval_ms: Option<u64>,

    /// Give up on the job after this many seconds.
    #[arg(long, global = true)]
    pub timeout_secs: Option<u64>,

    /// Print the final job report as JSON.
    #[arg(long, global = true, default_value_t = false)]
    pub json: bool,

    /// Enable debug logging.
    #[arg(long, short, global = true, default_value_t = false)]
    pub verbose: bool,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum VoiceArg {
    Male,
    Female,
}

impl From<VoiceArg> for Voice {
    fn from(arg: VoiceArg) -> Self {
        match arg {
            VoiceArg::Male => Voice::Male,
            VoiceArg::Female => Voice::Female,
        }
    }
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Upload an image and wait for its text and audio.
    Submit {
        /// Path to the image file.
        image: PathBuf,
    },

    /// Fetch the current status of an existing job once.
    Status {
        /// Job id returned when the image was submitted.
        job_id: String,
    },
}
