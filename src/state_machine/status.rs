use std::fmt;

use serde::{Deserialize, Serialize};

use super::phase::Phase;

/// Job status codes reported verbatim by the processing service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ServerStatus {
    Created,
    TextProcessing,
    TextFailed,
    AudioProcessing,
    AudioFailed,
    LanguageNotSupported,
    TextTooShort,
    Success,
}

impl ServerStatus {
    /// Whether the service attaches the extracted text to this status.
    pub fn carries_text(self) -> bool {
        matches!(
            self,
            ServerStatus::AudioProcessing
                | ServerStatus::AudioFailed
                | ServerStatus::LanguageNotSupported
                | ServerStatus::TextTooShort
                | ServerStatus::Success
        )
    }
}

impl fmt::Display for ServerStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ServerStatus::Created => "created",
            ServerStatus::TextProcessing => "text_processing",
            ServerStatus::TextFailed => "text_failed",
            ServerStatus::AudioProcessing => "audio_processing",
            ServerStatus::AudioFailed => "audio_failed",
            ServerStatus::LanguageNotSupported => "language_not_supported",
            ServerStatus::TextTooShort => "text_too_short",
            ServerStatus::Success => "success",
        };
        f.write_str(name)
    }
}

/// A successfully fetched job status together with its payload.
///
/// The three audio failures share a payload shape on the wire, so each one is
/// its own variant keyed by the status code and never inferred from the body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StatusReport {
    Created,
    TextProcessing,
    TextFailed,
    AudioProcessing { processed_text: String },
    AudioFailed { processed_text: String },
    LanguageNotSupported { processed_text: String },
    TextTooShort { processed_text: String },
    Success { processed_text: String, audio_url: String },
}

impl StatusReport {
    pub fn status(&self) -> ServerStatus {
        match self {
            StatusReport::Created => ServerStatus::Created,
            StatusReport::TextProcessing => ServerStatus::TextProcessing,
            StatusReport::TextFailed => ServerStatus::TextFailed,
            StatusReport::AudioProcessing { .. } => ServerStatus::AudioProcessing,
            StatusReport::AudioFailed { .. } => ServerStatus::AudioFailed,
            StatusReport::LanguageNotSupported { .. } => ServerStatus::LanguageNotSupported,
            StatusReport::TextTooShort { .. } => ServerStatus::TextTooShort,
            StatusReport::Success { .. } => ServerStatus::Success,
        }
    }

    /// Client phase this status maps to. `created` maps to none: the job is
    /// still waiting and the current phase stays as it is.
    pub fn phase(&self) -> Option<Phase> {
        match self {
            StatusReport::Created => None,
            StatusReport::TextProcessing => Some(Phase::StillProcessingText),
            StatusReport::TextFailed => Some(Phase::TextProcessingFailure),
            StatusReport::AudioProcessing { .. } => Some(Phase::StillProcessingAudio),
            StatusReport::AudioFailed { .. } => Some(Phase::AudioProcessingFailure),
            StatusReport::LanguageNotSupported { .. } => {
                Some(Phase::AudioFailureLanguageNotSupported)
            }
            StatusReport::TextTooShort { .. } => Some(Phase::AudioFailureTextTooShort),
            StatusReport::Success { .. } => Some(Phase::Finish),
        }
    }

    pub fn processed_text(&self) -> Option<&str> {
        match self {
            StatusReport::AudioProcessing { processed_text }
            | StatusReport::AudioFailed { processed_text }
            | StatusReport::LanguageNotSupported { processed_text }
            | StatusReport::TextTooShort { processed_text }
            | StatusReport::Success { processed_text, .. } => Some(processed_text),
            _ => None,
        }
    }

    pub fn audio_url(&self) -> Option<&str> {
        match self {
            StatusReport::Success { audio_url, .. } => Some(audio_url),
            _ => None,
        }
    }
}
