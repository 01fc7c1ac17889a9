use std::fmt;

use chrono::Utc;
use tracing::{debug, info, warn};

use super::job::{ImageRef, JobRecord, JobSnapshot};
use super::phase::Phase;
use super::status::StatusReport;
use crate::pipeline::{ApiError, UploadTarget};

/// Why an event left the job untouched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IgnoreReason {
    /// `created` while the job has not progressed past the upload yet.
    Waiting,
    /// `created` after processing was already reported.
    LateCreated,
    /// A status that belongs to an earlier stage than the current phase.
    Stale,
    AlreadyTerminal,
    /// The event does not belong to the current phase.
    OutOfOrder,
}

impl fmt::Display for IgnoreReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IgnoreReason::Waiting => write!(f, "waiting for processing to start"),
            IgnoreReason::LateCreated => write!(f, "late `created` status"),
            IgnoreReason::Stale => write!(f, "stale status"),
            IgnoreReason::AlreadyTerminal => write!(f, "job already finished"),
            IgnoreReason::OutOfOrder => write!(f, "event out of order"),
        }
    }
}

/// The result of feeding one event to the state machine.
#[derive(Debug, Clone, PartialEq)]
pub enum Transition {
    /// Moved to a new non-terminal phase.
    Next(Phase),
    /// A still-processing phase looped onto itself.
    Repeat(Phase),
    /// Reached a terminal phase.
    Complete(Phase),
    /// Nothing changed.
    Ignored(IgnoreReason),
}

impl Transition {
    /// Whether observers should receive a new snapshot.
    pub fn is_observable(&self) -> bool {
        !matches!(self, Transition::Ignored(_))
    }
}

/// Owns one [`JobRecord`] and moves it through its phases.
///
/// Events are the outcomes of the remote operations. Phases only move forward:
/// the still-processing phases may repeat, anything pointing backward is ignored,
/// and once a terminal phase is reached every further event is ignored.
#[derive(Debug, Default)]
pub struct JobStateMachine {
    record: JobRecord,
}

impl JobStateMachine {
    pub fn new() -> Self {
        Self {
            record: JobRecord::new(),
        }
    }

    pub fn record(&self) -> &JobRecord {
        &self.record
    }

    pub fn phase(&self) -> Phase {
        self.record.phase
    }

    pub fn snapshot(&self) -> JobSnapshot {
        self.record.snapshot()
    }

    pub fn into_record(self) -> JobRecord {
        self.record
    }

    pub fn on_image_inserted(&mut self, image: ImageRef) -> Transition {
        if self.record.phase != Phase::Begin {
            return self.ignore(IgnoreReason::OutOfOrder, "image inserted twice");
        }
        self.record.image = Some(image);
        self.enter(Phase::ImageReceived)
    }

    pub fn on_upload_target_result(&mut self, result: Result<UploadTarget, ApiError>) -> Transition {
        if self.record.phase != Phase::ImageReceived {
            return self.ignore(IgnoreReason::OutOfOrder, "upload target result");
        }
        match result {
            Ok(target) if !target.job_id.is_empty() && !target.url.is_empty() => {
                self.record.job_id = Some(target.job_id);
                self.record.upload_url = Some(target.url);
                self.enter(Phase::UrlFetched)
            }
            Ok(_) => self.fail(
                Phase::ErrorUrlFetch,
                ApiError::UrlFetch("response without job id or upload URL".into()),
            ),
            Err(err) => self.fail(Phase::ErrorUrlFetch, err),
        }
    }

    pub fn on_upload_result(&mut self, result: Result<(), ApiError>) -> Transition {
        if self.record.phase != Phase::UrlFetched {
            return self.ignore(IgnoreReason::OutOfOrder, "upload result");
        }
        match result {
            Ok(()) => self.enter(Phase::ImageUploaded),
            Err(err) => self.fail(Phase::ErrorImageUpload, err),
        }
    }

    pub fn on_status_result(&mut self, result: Result<StatusReport, ApiError>) -> Transition {
        if self.record.phase.is_terminal() {
            return self.ignore(IgnoreReason::AlreadyTerminal, "status result");
        }
        let report = match result {
            Ok(report) => report,
            Err(err) => return self.fail(Phase::GetFailure, err),
        };
        if !self.record.phase.is_polling() {
            return self.ignore(IgnoreReason::OutOfOrder, "status result");
        }

        let current = self.record.phase;
        let Some(target) = report.phase() else {
            if current == Phase::ImageUploaded {
                debug!(job_id = ?self.record.job_id, "job created, processing not started yet");
                return Transition::Ignored(IgnoreReason::Waiting);
            }
            return self.ignore(IgnoreReason::LateCreated, "created");
        };

        let repeat = target == current && current.is_still_processing();
        if !repeat && target.stage() <= current.stage() {
            return self.ignore(IgnoreReason::Stale, &report.status().to_string());
        }

        if let Some(text) = report.processed_text()
            && (!text.is_empty() || self.record.processed_text.is_none())
        {
            self.record.processed_text = Some(text.to_string());
        }
        if let Some(url) = report.audio_url() {
            self.record.audio_url = Some(url.to_string());
        }

        if repeat {
            self.record.updated_at = Utc::now();
            debug!(job_id = ?self.record.job_id, phase = %current, "still processing");
            Transition::Repeat(current)
        } else {
            self.enter(target)
        }
    }

    fn enter(&mut self, next: Phase) -> Transition {
        let previous = self.record.phase;
        self.record.phase_history.push(previous);
        self.record.phase = next;
        self.record.updated_at = Utc::now();

        info!(job_id = ?self.record.job_id, from = %previous, to = %next, "job phase changed");

        if next.is_terminal() {
            Transition::Complete(next)
        } else {
            Transition::Next(next)
        }
    }

    fn fail(&mut self, next: Phase, err: ApiError) -> Transition {
        warn!(job_id = ?self.record.job_id, phase = %next, error = %err, "job failed");
        self.record.error = Some(err);
        self.enter(next)
    }

    fn ignore(&self, reason: IgnoreReason, event: &str) -> Transition {
        warn!(
            job_id = ?self.record.job_id,
            phase = %self.record.phase,
            event,
            %reason,
            "ignoring event"
        );
        Transition::Ignored(reason)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn target(job_id: &str, url: &str) -> UploadTarget {
        UploadTarget {
            job_id: job_id.into(),
            url: url.into(),
        }
    }

    fn uploaded() -> JobStateMachine {
        let mut machine = JobStateMachine::new();
        machine.on_image_inserted(ImageRef::new("photo.jpg"));
        machine.on_upload_target_result(Ok(target("J1", "U1")));
        machine.on_upload_result(Ok(()));
        assert_eq!(machine.phase(), Phase::ImageUploaded);
        machine
    }

    fn audio_processing(text: &str) -> StatusReport {
        StatusReport::AudioProcessing {
            processed_text: text.into(),
        }
    }

    fn success(text: &str, audio: &str) -> StatusReport {
        StatusReport::Success {
            processed_text: text.into(),
            audio_url: audio.into(),
        }
    }

    #[test]
    fn image_inserted_moves_to_image_received() {
        let mut machine = JobStateMachine::new();
        let t = machine.on_image_inserted(ImageRef::new("photo.jpg"));
        assert_eq!(t, Transition::Next(Phase::ImageReceived));
        assert_eq!(machine.record().image, Some(ImageRef::new("photo.jpg")));

        let t = machine.on_image_inserted(ImageRef::new("other.jpg"));
        assert_eq!(t, Transition::Ignored(IgnoreReason::OutOfOrder));
        assert_eq!(machine.record().image, Some(ImageRef::new("photo.jpg")));
    }

    #[test]
    fn upload_target_then_upload_keeps_identifiers() {
        let mut machine = JobStateMachine::new();
        machine.on_image_inserted(ImageRef::new("photo.jpg"));

        let t = machine.on_upload_target_result(Ok(target("J1", "U1")));
        assert_eq!(t, Transition::Next(Phase::UrlFetched));
        assert_eq!(machine.record().job_id.as_deref(), Some("J1"));
        assert_eq!(machine.record().upload_url.as_deref(), Some("U1"));

        let t = machine.on_upload_result(Ok(()));
        assert_eq!(t, Transition::Next(Phase::ImageUploaded));
        assert_eq!(machine.record().job_id.as_deref(), Some("J1"));
        assert_eq!(machine.record().upload_url.as_deref(), Some("U1"));
    }

    #[test]
    fn upload_target_failure_is_terminal() {
        let mut machine = JobStateMachine::new();
        machine.on_image_inserted(ImageRef::new("photo.jpg"));
        let t = machine.on_upload_target_result(Err(ApiError::UrlFetch("HTTP 500".into())));
        assert_eq!(t, Transition::Complete(Phase::ErrorUrlFetch));
        assert!(machine.record().job_id.is_none());

        let t = machine.on_upload_result(Ok(()));
        assert_eq!(t, Transition::Ignored(IgnoreReason::OutOfOrder));
        assert_eq!(machine.phase(), Phase::ErrorUrlFetch);
    }

    #[test]
    fn empty_job_id_counts_as_url_fetch_error() {
        let mut machine = JobStateMachine::new();
        machine.on_image_inserted(ImageRef::new("photo.jpg"));
        let t = machine.on_upload_target_result(Ok(target("", "U1")));
        assert_eq!(t, Transition::Complete(Phase::ErrorUrlFetch));
        assert!(matches!(machine.record().error, Some(ApiError::UrlFetch(_))));
    }

    #[test]
    fn upload_failure_is_terminal() {
        let mut machine = JobStateMachine::new();
        machine.on_image_inserted(ImageRef::new("photo.jpg"));
        machine.on_upload_target_result(Ok(target("J1", "U1")));
        let t = machine.on_upload_result(Err(ApiError::ImageUpload("HTTP 403".into())));
        assert_eq!(t, Transition::Complete(Phase::ErrorImageUpload));
        assert_eq!(machine.record().job_id.as_deref(), Some("J1"));
    }

    #[test]
    fn happy_path_poll_sequence() {
        let mut machine = uploaded();

        let t = machine.on_status_result(Ok(StatusReport::Created));
        assert_eq!(t, Transition::Ignored(IgnoreReason::Waiting));
        assert_eq!(machine.phase(), Phase::ImageUploaded);

        let t = machine.on_status_result(Ok(StatusReport::TextProcessing));
        assert_eq!(t, Transition::Next(Phase::StillProcessingText));

        let t = machine.on_status_result(Ok(audio_processing("hello")));
        assert_eq!(t, Transition::Next(Phase::StillProcessingAudio));
        assert_eq!(machine.record().processed_text.as_deref(), Some("hello"));

        let t = machine.on_status_result(Ok(success("hello", "http://audio")));
        assert_eq!(t, Transition::Complete(Phase::Finish));

        let record = machine.record();
        assert_eq!(record.phase, Phase::Finish);
        assert_eq!(record.processed_text.as_deref(), Some("hello"));
        assert_eq!(record.audio_url.as_deref(), Some("http://audio"));
        assert_eq!(
            record.phase_history,
            vec![
                Phase::Begin,
                Phase::ImageReceived,
                Phase::UrlFetched,
                Phase::ImageUploaded,
                Phase::StillProcessingText,
                Phase::StillProcessingAudio,
            ]
        );
    }

    #[test]
    fn still_processing_phases_repeat() {
        let mut machine = uploaded();
        machine.on_status_result(Ok(StatusReport::TextProcessing));
        let t = machine.on_status_result(Ok(StatusReport::TextProcessing));
        assert_eq!(t, Transition::Repeat(Phase::StillProcessingText));

        machine.on_status_result(Ok(audio_processing("first")));
        let t = machine.on_status_result(Ok(audio_processing("second")));
        assert_eq!(t, Transition::Repeat(Phase::StillProcessingAudio));
        assert_eq!(machine.record().processed_text.as_deref(), Some("second"));
    }

    #[test]
    fn audio_failures_map_by_status_code() {
        let cases = [
            (
                StatusReport::AudioFailed {
                    processed_text: "hi".into(),
                },
                Phase::AudioProcessingFailure,
            ),
            (
                StatusReport::LanguageNotSupported {
                    processed_text: "hi".into(),
                },
                Phase::AudioFailureLanguageNotSupported,
            ),
            (
                StatusReport::TextTooShort {
                    processed_text: "hi".into(),
                },
                Phase::AudioFailureTextTooShort,
            ),
        ];
        for (report, expected) in cases {
            let mut machine = uploaded();
            let t = machine.on_status_result(Ok(report));
            assert_eq!(t, Transition::Complete(expected));
            assert_eq!(machine.record().processed_text.as_deref(), Some("hi"));
            assert!(machine.record().audio_url.is_none());
        }
    }

    #[test]
    fn text_failure_is_terminal() {
        let mut machine = uploaded();
        machine.on_status_result(Ok(StatusReport::TextProcessing));
        let t = machine.on_status_result(Ok(StatusReport::TextFailed));
        assert_eq!(t, Transition::Complete(Phase::TextProcessingFailure));
        assert!(machine.record().processed_text.is_none());
    }

    #[test]
    fn late_created_is_a_no_op() {
        let mut machine = uploaded();
        machine.on_status_result(Ok(audio_processing("hello")));
        let before = machine.snapshot();

        let t = machine.on_status_result(Ok(StatusReport::Created));
        assert_eq!(t, Transition::Ignored(IgnoreReason::LateCreated));
        assert_eq!(machine.snapshot(), before);
    }

    #[test]
    fn phases_never_move_backward() {
        let mut machine = uploaded();
        machine.on_status_result(Ok(audio_processing("hello")));

        let t = machine.on_status_result(Ok(StatusReport::TextProcessing));
        assert_eq!(t, Transition::Ignored(IgnoreReason::Stale));
        let t = machine.on_status_result(Ok(StatusReport::TextFailed));
        assert_eq!(t, Transition::Ignored(IgnoreReason::Stale));
        assert_eq!(machine.phase(), Phase::StillProcessingAudio);
        assert_eq!(machine.record().processed_text.as_deref(), Some("hello"));
    }

    #[test]
    fn processed_text_is_never_cleared() {
        let mut machine = uploaded();
        machine.on_status_result(Ok(audio_processing("hello")));
        machine.on_status_result(Ok(audio_processing("")));
        assert_eq!(machine.record().processed_text.as_deref(), Some("hello"));

        machine.on_status_result(Ok(success("", "http://audio")));
        assert_eq!(machine.record().processed_text.as_deref(), Some("hello"));
        assert_eq!(machine.phase(), Phase::Finish);
    }

    #[test]
    fn terminal_phase_ignores_everything() {
        let mut machine = uploaded();
        machine.on_status_result(Ok(success("hello", "http://audio")));

        let t = machine.on_status_result(Ok(StatusReport::TextProcessing));
        assert_eq!(t, Transition::Ignored(IgnoreReason::AlreadyTerminal));
        let t = machine.on_status_result(Err(ApiError::Transport("HTTP 500".into())));
        assert_eq!(t, Transition::Ignored(IgnoreReason::AlreadyTerminal));
        assert_eq!(machine.phase(), Phase::Finish);
        assert!(machine.record().error.is_none());
    }

    #[test]
    fn poll_failure_keeps_not_found_apart_from_transport() {
        let mut machine = uploaded();
        machine.on_status_result(Ok(audio_processing("hello")));
        let t = machine.on_status_result(Err(ApiError::JobNotFound {
            job_id: "J1".into(),
        }));
        assert_eq!(t, Transition::Complete(Phase::GetFailure));
        assert!(matches!(
            machine.record().error,
            Some(ApiError::JobNotFound { .. })
        ));
        assert_eq!(machine.record().processed_text.as_deref(), Some("hello"));

        let mut machine = uploaded();
        let t = machine.on_status_result(Err(ApiError::Transport("HTTP 502".into())));
        assert_eq!(t, Transition::Complete(Phase::GetFailure));
        assert!(matches!(machine.record().error, Some(ApiError::Transport(_))));
    }

    #[test]
    fn status_before_upload_is_out_of_order() {
        let mut machine = JobStateMachine::new();
        machine.on_image_inserted(ImageRef::new("photo.jpg"));
        let t = machine.on_status_result(Ok(StatusReport::TextProcessing));
        assert_eq!(t, Transition::Ignored(IgnoreReason::OutOfOrder));
        assert_eq!(machine.phase(), Phase::ImageReceived);
    }

    #[test]
    fn stage_never_decreases_over_arbitrary_sequences() {
        let statuses = [
            StatusReport::Created,
            StatusReport::TextProcessing,
            audio_processing("a"),
            StatusReport::TextProcessing,
            StatusReport::Created,
            audio_processing("b"),
            StatusReport::TextFailed,
            success("b", "http://audio"),
            StatusReport::TextProcessing,
        ];
        // Every suffix of the sequence, starting from a freshly uploaded job.
        for start in 0..statuses.len() {
            let mut machine = uploaded();
            let mut last = machine.phase();
            for report in &statuses[start..] {
                machine.on_status_result(Ok(report.clone()));
                let now = machine.phase();
                assert!(now.stage() >= last.stage(), "{last} -> {now}");
                last = now;
            }
        }
    }
}
