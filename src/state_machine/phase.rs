use std::fmt;

use serde::{Deserialize, Serialize};

use crate::pipeline::ApiError;

/// Client-visible stage of a single job.
///
/// A job flows through:
/// BEGIN → IMAGE_RECEIVED → URL_FETCHED → IMAGE_UPLOADED → STILL_PROCESSING_TEXT ⟲
/// → STILL_PROCESSING_AUDIO ⟲ → FINISH, and may stop early in one of the failure phases.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Phase {
    Begin,
    ImageReceived,
    UrlFetched,
    ErrorUrlFetch,
    ImageUploaded,
    ErrorImageUpload,
    StillProcessingText,
    TextProcessingFailure,
    StillProcessingAudio,
    AudioProcessingFailure,
    AudioFailureLanguageNotSupported,
    AudioFailureTextTooShort,
    GetFailure,
    Finish,
}

impl Phase {
    /// Position along the progression. Sibling branches share a stage, so a
    /// move is forward only when the stage strictly increases.
    pub(crate) fn stage(self) -> u8 {
        match self {
            Phase::Begin => 0,
            Phase::ImageReceived => 1,
            Phase::UrlFetched => 2,
            Phase::ErrorUrlFetch | Phase::ImageUploaded => 3,
            Phase::ErrorImageUpload | Phase::StillProcessingText => 4,
            Phase::TextProcessingFailure | Phase::StillProcessingAudio => 5,
            Phase::AudioProcessingFailure
            | Phase::AudioFailureLanguageNotSupported
            | Phase::AudioFailureTextTooShort
            | Phase::Finish => 6,
            Phase::GetFailure => 7,
        }
    }

    /// No operation follows a terminal phase.
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            Phase::ErrorUrlFetch
                | Phase::ErrorImageUpload
                | Phase::TextProcessingFailure
                | Phase::AudioProcessingFailure
                | Phase::AudioFailureLanguageNotSupported
                | Phase::AudioFailureTextTooShort
                | Phase::GetFailure
                | Phase::Finish
        )
    }

    /// Phases in which the driver keeps fetching the job status.
    pub fn is_polling(self) -> bool {
        matches!(
            self,
            Phase::ImageUploaded | Phase::StillProcessingText | Phase::StillProcessingAudio
        )
    }

    /// The two phases allowed to repeat themselves.
    pub fn is_still_processing(self) -> bool {
        matches!(self, Phase::StillProcessingText | Phase::StillProcessingAudio)
    }

    pub fn is_success(self) -> bool {
        self == Phase::Finish
    }

    pub fn is_failure(self) -> bool {
        self.is_terminal() && !self.is_success()
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Phase::Begin => "BEGIN",
            Phase::ImageReceived => "IMAGE_RECEIVED",
            Phase::UrlFetched => "URL_FETCHED",
            Phase::ErrorUrlFetch => "ERROR_URL_FETCH",
            Phase::ImageUploaded => "IMAGE_UPLOADED",
            Phase::ErrorImageUpload => "ERROR_IMAGE_UPLOAD",
            Phase::StillProcessingText => "STILL_PROCESSING_TEXT",
            Phase::TextProcessingFailure => "TEXT_PROCESSING_FAILURE",
            Phase::StillProcessingAudio => "STILL_PROCESSING_AUDIO",
            Phase::AudioProcessingFailure => "AUDIO_PROCESSING_FAILURE",
            Phase::AudioFailureLanguageNotSupported => "AUDIO_FAILURE_LANGUAGE_NOT_SUPPORTED",
            Phase::AudioFailureTextTooShort => "AUDIO_FAILURE_TEXT_TOO_SHORT",
            Phase::GetFailure => "GET_FAILURE",
            Phase::Finish => "FINISH",
        };
        f.write_str(name)
    }
}

/// Human-facing category of a failed job.
///
/// The presentation layer renders one fixed message per category instead of
/// the raw server status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureCategory {
    /// Network or server trouble; the same image may succeed later.
    Transient,
    /// The server no longer knows the job.
    JobMissing,
    TextFailed,
    AudioFailed,
    LanguageNotSupported,
    TextTooShort,
}

impl FailureCategory {
    /// Category for a finished job, `None` when the job succeeded or is still running.
    pub fn for_outcome(phase: Phase, error: Option<&ApiError>) -> Option<Self> {
        match phase {
            Phase::ErrorUrlFetch | Phase::ErrorImageUpload => Some(FailureCategory::Transient),
            Phase::GetFailure => match error {
                Some(ApiError::JobNotFound { .. }) => Some(FailureCategory::JobMissing),
                _ => Some(FailureCategory::Transient),
            },
            Phase::TextProcessingFailure => Some(FailureCategory::TextFailed),
            Phase::AudioProcessingFailure => Some(FailureCategory::AudioFailed),
            Phase::AudioFailureLanguageNotSupported => Some(FailureCategory::LanguageNotSupported),
            Phase::AudioFailureTextTooShort => Some(FailureCategory::TextTooShort),
            _ => None,
        }
    }

    /// Transient failures are worth retrying; the others are definitive results.
    pub fn is_transient(self) -> bool {
        self == FailureCategory::Transient
    }

    pub fn message(self) -> &'static str {
        match self {
            FailureCategory::Transient => "Error occurred, try again later",
            FailureCategory::JobMissing => "The server does not know this job, submit the image again",
            FailureCategory::TextFailed => "No text could be read from the image",
            FailureCategory::AudioFailed => "The text was read but audio could not be produced",
            FailureCategory::LanguageNotSupported => {
                "Supported audio languages: English, Spanish, French, Portuguese, Italian or German"
            }
            FailureCategory::TextTooShort => "Text under 20 characters cannot be processed to audio",
        }
    }
}

impl fmt::Display for FailureCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.message())
    }
}
