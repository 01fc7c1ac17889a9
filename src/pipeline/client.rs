use std::future::Future;
use std::time::Duration;

use reqwest::{Client, StatusCode, header};
use tracing::debug;

use super::error::{ApiError, describe};
use super::types::{StatusResponse, UploadTarget, UploadTargetRequest, Voice};
use crate::image::ImageSource;
use crate::state_machine::StatusReport;

const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// The three remote operations a job needs.
///
/// Each call is exactly one round trip. Failures come back as [`ApiError`]
/// values; retrying is the caller's decision.
pub trait PipelineApi: Send + Sync {
    /// Asks the service for a job id and a URL to upload the image to.
    ///
    /// `file_name` must be unique among submissions running at the same time.
    fn request_upload_target(
        &self,
        file_name: &str,
        voice: Voice,
    ) -> impl Future<Output = Result<UploadTarget, ApiError>> + Send;

    /// Stores the image bytes at a URL returned by [`request_upload_target`](Self::request_upload_target).
    fn upload_image(
        &self,
        url: &str,
        image: &ImageSource,
    ) -> impl Future<Output = Result<(), ApiError>> + Send;

    /// Fetches the current status of a job.
    fn fetch_status(
        &self,
        job_id: &str,
    ) -> impl Future<Output = Result<StatusReport, ApiError>> + Send;
}

/// [`PipelineApi`] over HTTP.
pub struct HttpPipelineApi {
    client: Client,
    upload_endpoint: String,
    status_endpoint: String,
}

impl HttpPipelineApi {
    pub fn new(upload_endpoint: String, status_endpoint: String) -> Result<Self, reqwest::Error> {
        Self::with_timeouts(upload_endpoint, status_endpoint, CONNECT_TIMEOUT, REQUEST_TIMEOUT)
    }

    pub fn with_timeouts(
        upload_endpoint: String,
        status_endpoint: String,
        connect_timeout: Duration,
        request_timeout: Duration,
    ) -> Result<Self, reqwest::Error> {
        let client = Client::builder()
            .connect_timeout(connect_timeout)
            .timeout(request_timeout)
            .build()?;
        Ok(Self {
            client,
            upload_endpoint,
            status_endpoint,
        })
    }
}

impl PipelineApi for HttpPipelineApi {
    async fn request_upload_target(
        &self,
        file_name: &str,
        voice: Voice,
    ) -> Result<UploadTarget, ApiError> {
        let body = UploadTargetRequest::new(file_name, voice);
        let response = self
            .client
            .post(&self.upload_endpoint)
            .json(&body)
            .send()
            .await
            .map_err(|e| ApiError::UrlFetch(describe(&e)))?;

        let status = response.status();
        debug!(%status, file_name, %voice, "upload target requested");
        if !status.is_success() {
            return Err(ApiError::UrlFetch(format!("HTTP {}", status.as_u16())));
        }

        let target = response
            .json::<UploadTarget>()
            .await
            .map_err(|e| ApiError::UrlFetch(describe(&e)))?;
        if target.job_id.is_empty() || target.url.is_empty() {
            return Err(ApiError::UrlFetch(
                "response without job id or upload URL".into(),
            ));
        }
        Ok(target)
    }

    async fn upload_image(&self, url: &str, image: &ImageSource) -> Result<(), ApiError> {
        let response = self
            .client
            .put(url)
            .header(header::CONTENT_TYPE, image.content_type())
            .body(image.bytes().to_vec())
            .send()
            .await
            .map_err(|e| ApiError::ImageUpload(describe(&e)))?;

        let status = response.status();
        debug!(%status, bytes = image.len(), "image uploaded");
        if !status.is_success() {
            return Err(ApiError::ImageUpload(format!("HTTP {}", status.as_u16())));
        }
        Ok(())
    }

    async fn fetch_status(&self, job_id: &str) -> Result<StatusReport, ApiError> {
        let response = self
            .client
            .get(&self.status_endpoint)
            .query(&[("jobId", job_id)])
            .send()
            .await
            .map_err(|e| ApiError::Transport(describe(&e)))?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Err(ApiError::JobNotFound {
                job_id: job_id.to_string(),
            });
        }
        if !status.is_success() {
            return Err(ApiError::Transport(format!("HTTP {}", status.as_u16())));
        }

        let body = response
            .json::<StatusResponse>()
            .await
            .map_err(|e| ApiError::Transport(describe(&e)))?;
        debug!(job_id, status = %body.status, "job status fetched");
        StatusReport::try_from(body)
    }
}
