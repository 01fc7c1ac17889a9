//! Failures of the remote operations.
//!
//! Every HTTP problem is turned into an [`ApiError`] at the adapter boundary and
//! reaches the state machine as plain data. The variants are `Clone` and
//! serializable because the job record keeps the error that failed it.

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
pub enum ApiError {
    /// The upload-target request failed or returned an unusable body.
    #[error("upload URL request failed: {0}")]
    UrlFetch(String),

    /// The image bytes could not be stored at the upload URL.
    #[error("image upload failed: {0}")]
    ImageUpload(String),

    /// The status request failed or returned a malformed body.
    #[error("status request failed: {0}")]
    Transport(String),

    /// The status endpoint answered 404 for this job.
    #[error("job {job_id} does not exist")]
    JobNotFound { job_id: String },
}

impl ApiError {
    /// Whether repeating the same request could succeed.
    pub fn is_retryable(&self) -> bool {
        !matches!(self, ApiError::JobNotFound { .. })
    }
}

/// Short description of a `reqwest` failure for the error payload.
pub(crate) fn describe(err: &reqwest::Error) -> String {
    if err.is_timeout() {
        "request timed out".to_string()
    } else if err.is_connect() {
        format!("connection failed: {err}")
    } else if err.is_decode() {
        format!("malformed response body: {err}")
    } else {
        err.to_string()
    }
}
