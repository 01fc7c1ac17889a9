//! Configuration loaded from `snapvoice.toml`.
//!
//! [`SnapvoiceConfig`] holds every tunable. Keys missing from the file fall
//! back to defaults. `SNAPVOICE_UPLOAD_URL` and `SNAPVOICE_STATUS_URL` take
//! precedence over the file.

use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

use crate::driver::{DEFAULT_FILE_NAME, DriverConfig};
use crate::error::SnapvoiceError;
use crate::pipeline::Voice;

pub const CONFIG_FILE: &str = "snapvoice.toml";
pub const UPLOAD_URL_ENV: &str = "SNAPVOICE_UPLOAD_URL";
pub const STATUS_URL_ENV: &str = "SNAPVOICE_STATUS_URL";

#[derive(Debug, Clone, Deserialize)]
pub struct SnapvoiceConfig {
    /// Endpoint that hands out job ids and upload URLs (`POST`).
    #[serde(default)]
    pub upload_url: String,

    /// Endpoint reporting job status (`GET ?jobId=`).
    #[serde(default)]
    pub status_url: String,

    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,

    /// Upper bound on the whole job; the job is cancelled once it elapses.
    #[serde(default = "default_job_timeout_secs")]
    pub job_timeout_secs: u64,

    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,

    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    #[serde(default)]
    pub voice: Voice,

    #[serde(default = "default_file_name")]
    pub file_name: String,
}

fn default_poll_interval_ms() -> u64 {
    500
}

fn default_job_timeout_secs() -> u64 {
    120
}

fn default_connect_timeout_secs() -> u64 {
    10
}

fn default_request_timeout_secs() -> u64 {
    30
}

fn default_file_name() -> String {
    DEFAULT_FILE_NAME.to_string()
}

impl Default for SnapvoiceConfig {
    fn default() -> Self {
        Self {
            upload_url: String::new(),
            status_url: String::new(),
            poll_interval_ms: default_poll_interval_ms(),
            job_timeout_secs: default_job_timeout_secs(),
            connect_timeout_secs: default_connect_timeout_secs(),
            request_timeout_secs: default_request_timeout_secs(),
            voice: Voice::default(),
            file_name: default_file_name(),
        }
    }
}

impl SnapvoiceConfig {
    /// Loads `snapvoice.toml` from the working directory, or defaults if absent.
    pub fn load() -> Result<Self, SnapvoiceError> {
        Self::load_from(Path::new(CONFIG_FILE))
    }

    pub fn load_from(path: &Path) -> Result<Self, SnapvoiceError> {
        let mut config = if path.exists() {
            let contents = std::fs::read_to_string(path)?;
            toml::from_str::<SnapvoiceConfig>(&contents)?
        } else {
            Self::default()
        };

        if let Ok(url) = std::env::var(UPLOAD_URL_ENV)
            && !url.is_empty()
        {
            config.upload_url = url;
        }
        if let Ok(url) = std::env::var(STATUS_URL_ENV)
            && !url.is_empty()
        {
            config.status_url = url;
        }

        Ok(config)
    }

    /// Both endpoints are required before a job can run.
    pub fn validate(&self) -> Result<(), SnapvoiceError> {
        if self.upload_url.trim().is_empty() {
            return Err(SnapvoiceError::Config(format!(
                "upload_url is not set (use {CONFIG_FILE} or {UPLOAD_URL_ENV})"
            )));
        }
        if self.status_url.trim().is_empty() {
            return Err(SnapvoiceError::Config(format!(
                "status_url is not set (use {CONFIG_FILE} or {STATUS_URL_ENV})"
            )));
        }
        if self.poll_interval_ms == 0 {
            return Err(SnapvoiceError::Config(
                "poll_interval_ms must be greater than zero".into(),
            ));
        }
        Ok(())
    }

    pub fn job_timeout(&self) -> Duration {
        Duration::from_secs(self.job_timeout_secs)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn driver_config(&self) -> DriverConfig {
        DriverConfig {
            poll_interval: Duration::from_millis(self.poll_interval_ms),
            voice: self.voice,
            file_name: self.file_name.clone(),
        }
    }
}
