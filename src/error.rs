use thiserror::Error;

use crate::pipeline::ApiError;

#[derive(Debug, Error)]
pub enum SnapvoiceError {
    #[error("Config error: {0}")]
    Config(String),

    #[error("Cannot read image {path}: {source}")]
    Image {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Image {0} is empty")]
    EmptyImage(String),

    #[error("Service error: {0}")]
    Api(#[from] ApiError),

    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
}
