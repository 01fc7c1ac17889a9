//! Request and response bodies of the processing service.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::error::ApiError;
use crate::state_machine::{ServerStatus, StatusReport};

/// Voice used for speech synthesis. Sent as the `gender` flag, `true` meaning male.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Voice {
    Male,
    #[default]
    Female,
}

impl Voice {
    pub fn is_male(self) -> bool {
        self == Voice::Male
    }
}

impl fmt::Display for Voice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Voice::Male => write!(f, "male"),
            Voice::Female => write!(f, "female"),
        }
    }
}

/// Body of `POST /`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadTargetRequest {
    #[serde(rename = "fileName")]
    pub file_name: String,
    pub gender: bool,
}

impl UploadTargetRequest {
    pub fn new(file_name: &str, voice: Voice) -> Self {
        Self {
            file_name: file_name.to_string(),
            gender: voice.is_male(),
        }
    }
}

/// Answer to `POST /`: the job identifier and where to `PUT` the image.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadTarget {
    #[serde(rename = "jobId")]
    pub job_id: String,
    pub url: String,
}

/// Body of the status endpoint.
///
/// The service fills `processedText` and `urlAudio` with empty strings when it
/// has nothing to report, so both are optional here.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusResponse {
    pub status: ServerStatus,
    #[serde(rename = "processedText", default)]
    pub processed_text: Option<String>,
    #[serde(rename = "urlAudio", default)]
    pub url_audio: Option<String>,
}

impl TryFrom<StatusResponse> for StatusReport {
    type Error = ApiError;

    fn try_from(body: StatusResponse) -> Result<Self, Self::Error> {
        let status = body.status;
        let text = || {
            body.processed_text.clone().ok_or_else(|| {
                ApiError::Transport(format!("status `{status}` without processedText"))
            })
        };

        let report = match status {
            ServerStatus::Created => StatusReport::Created,
            ServerStatus::TextProcessing => StatusReport::TextProcessing,
            ServerStatus::TextFailed => StatusReport::TextFailed,
            ServerStatus::AudioProcessing => StatusReport::AudioProcessing {
                processed_text: text()?,
            },
            ServerStatus::AudioFailed => StatusReport::AudioFailed {
                processed_text: text()?,
            },
            ServerStatus::LanguageNotSupported => StatusReport::LanguageNotSupported {
                processed_text: text()?,
            },
            ServerStatus::TextTooShort => StatusReport::TextTooShort {
                processed_text: text()?,
            },
            ServerStatus::Success => {
                let audio_url = body
                    .url_audio
                    .clone()
                    .filter(|url| !url.is_empty())
                    .ok_or_else(|| ApiError::Transport("status `success` without urlAudio".into()))?;
                StatusReport::Success {
                    processed_text: text()?,
                    audio_url,
                }
            }
        };
        Ok(report)
    }
}
