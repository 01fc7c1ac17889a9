//! Adapter for the remote processing service.

pub mod client;
pub mod error;
pub mod types;

pub use client::{HttpPipelineApi, PipelineApi};
pub use error::ApiError;
pub use types::{StatusResponse, UploadTarget, UploadTargetRequest, Voice};
