//! Drives one job from image to audio.
//!
//! [`start`] spawns the job on the tokio runtime and hands back a [`JobHandle`].
//! The job runs through:
//!
//! ```text
//! insert image        → IMAGE_RECEIVED
//! request upload URL  → URL_FETCHED            | ERROR_URL_FETCH
//! upload bytes        → IMAGE_UPLOADED         | ERROR_IMAGE_UPLOAD
//! fetch status (loop) → STILL_PROCESSING_*  …  → FINISH | failure phase
//! ```
//!
//! Every observable transition is pushed to the handle as a [`JobSnapshot`].
//! Cancelling stops the job at its next suspension point: the pending request
//! is dropped, its result never reaches the state machine and nothing more is
//! sent.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::{JoinError, JoinHandle};
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};
use uuid::Uuid;

use crate::image::ImageSource;
use crate::pipeline::{PipelineApi, Voice};
use crate::state_machine::{JobReport, JobSnapshot, JobStateMachine, Transition};

/// File name the service stores uploads under, before it is made unique.
pub const DEFAULT_FILE_NAME: &str = "pic.jpg";

#[derive(Debug, Clone)]
pub struct DriverConfig {
    /// Pause between two status requests.
    pub poll_interval: Duration,
    pub voice: Voice,
    pub file_name: String,
}

impl Default for DriverConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_millis(500),
            voice: Voice::default(),
            file_name: DEFAULT_FILE_NAME.to_string(),
        }
    }
}

/// Prefixes the file name so that jobs submitted close together do not collide.
pub fn unique_file_name(base: &str) -> String {
    format!("{}-{base}", Uuid::new_v4().simple())
}

/// Caller's side of a running job.
pub struct JobHandle {
    updates: mpsc::UnboundedReceiver<JobSnapshot>,
    cancel: CancellationToken,
    task: JoinHandle<JobReport>,
}

impl JobHandle {
    /// Next snapshot, or `None` once the job stopped and every snapshot was read.
    pub async fn next_update(&mut self) -> Option<JobSnapshot> {
        self.updates.recv().await
    }

    /// Stops the job. No snapshot is sent after this returns.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Waits for the job to stop and returns its report.
    pub async fn finish(self) -> Result<JobReport, JoinError> {
        self.task.await
    }
}

/// Spawns a job for `image` and returns its handle.
pub fn start<A>(api: Arc<A>, image: ImageSource, config: DriverConfig) -> JobHandle
where
    A: PipelineApi + 'static,
{
    let (tx, rx) = mpsc::unbounded_channel();
    let cancel = CancellationToken::new();
    let driver = PollingDriver {
        api,
        config,
        machine: JobStateMachine::new(),
        updates: tx,
        cancel: cancel.clone(),
    };
    let task = tokio::spawn(driver.run(image));
    JobHandle {
        updates: rx,
        cancel,
        task,
    }
}

/// Sequences the remote operations of one job and feeds their results to its
/// state machine. Only this driver mutates the job.
pub struct PollingDriver<A> {
    api: Arc<A>,
    config: DriverConfig,
    machine: JobStateMachine,
    updates: mpsc::UnboundedSender<JobSnapshot>,
    cancel: CancellationToken,
}

impl<A: PipelineApi> PollingDriver<A> {
    async fn run(mut self, image: ImageSource) -> JobReport {
        let t = self.machine.on_image_inserted(image.reference().clone());
        self.emit(&t);

        let file_name = unique_file_name(&self.config.file_name);
        let api = Arc::clone(&self.api);
        let Some(result) = self
            .guarded(api.request_upload_target(&file_name, self.config.voice))
            .await
        else {
            return self.stopped();
        };
        let t = self.machine.on_upload_target_result(result);
        self.emit(&t);

        let Some(url) = self.machine.record().upload_url.clone() else {
            return self.stopped();
        };
        let Some(result) = self.guarded(api.upload_image(&url, &image)).await else {
            return self.stopped();
        };
        let t = self.machine.on_upload_result(result);
        self.emit(&t);

        let mut first_poll = true;
        while self.machine.phase().is_polling() {
            if !first_poll && self.guarded(sleep(self.config.poll_interval)).await.is_none() {
                return self.stopped();
            }
            first_poll = false;

            let job_id = self.machine.record().job_id.clone().unwrap_or_default();
            let Some(result) = self.guarded(api.fetch_status(&job_id)).await else {
                return self.stopped();
            };
            let t = self.machine.on_status_result(result);
            self.emit(&t);
        }

        self.stopped()
    }

    /// Runs `op` unless the job gets cancelled first.
    async fn guarded<T>(&self, op: impl Future<Output = T>) -> Option<T> {
        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => None,
            out = op => Some(out),
        }
    }

    fn emit(&self, transition: &Transition) {
        if !transition.is_observable() || self.cancel.is_cancelled() {
            return;
        }
        if self.updates.send(self.machine.snapshot()).is_err() {
            debug!("snapshot receiver dropped, abandoning job");
            self.cancel.cancel();
        }
    }

    fn stopped(self) -> JobReport {
        let cancelled = self.cancel.is_cancelled() && !self.machine.phase().is_terminal();
        let record = self.machine.into_record();
        info!(
            job_id = ?record.job_id,
            phase = %record.phase,
            cancelled,
            "job stopped"
        );
        JobReport::from_record(&record, cancelled)
    }
}
