use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::phase::{FailureCategory, Phase};
use crate::pipeline::ApiError;

/// Opaque handle to the submitted image (a path or any caller-chosen label).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ImageRef(String);

impl ImageRef {
    pub fn new(reference: impl Into<String>) -> Self {
        Self(reference.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ImageRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Mutable state of one in-flight job.
///
/// Only [`JobStateMachine`](super::JobStateMachine) writes to it; everyone else
/// sees immutable [`JobSnapshot`]s.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobRecord {
    pub image: Option<ImageRef>,
    pub processed_text: Option<String>,
    pub upload_url: Option<String>,
    pub job_id: Option<String>,
    pub audio_url: Option<String>,
    pub phase: Phase,
    /// Adapter failure that put the job into its failure phase, if any.
    pub error: Option<ApiError>,
    pub phase_history: Vec<Phase>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl JobRecord {
    pub fn new() -> Self {
        let now = Utc::now();
        Self {
            image: None,
            processed_text: None,
            upload_url: None,
            job_id: None,
            audio_url: None,
            phase: Phase::Begin,
            error: None,
            phase_history: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Builds a fresh value reflecting the record right now.
    pub fn snapshot(&self) -> JobSnapshot {
        JobSnapshot {
            image: self.image.clone(),
            processed_text: self.processed_text.clone(),
            upload_url: self.upload_url.clone(),
            job_id: self.job_id.clone(),
            audio_url: self.audio_url.clone(),
            phase: self.phase,
            error: self.error.clone(),
        }
    }

    pub fn failure(&self) -> Option<FailureCategory> {
        FailureCategory::for_outcome(self.phase, self.error.as_ref())
    }
}

impl Default for JobRecord {
    fn default() -> Self {
        Self::new()
    }
}

/// Phase-tagged view of a job pushed to observers on every transition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobSnapshot {
    pub image: Option<ImageRef>,
    pub processed_text: Option<String>,
    pub upload_url: Option<String>,
    pub job_id: Option<String>,
    pub audio_url: Option<String>,
    pub phase: Phase,
    pub error: Option<ApiError>,
}

impl JobSnapshot {
    pub fn failure(&self) -> Option<FailureCategory> {
        FailureCategory::for_outcome(self.phase, self.error.as_ref())
    }
}

/// Summary produced when a job stops, whether finished, failed or cancelled.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobReport {
    pub job_id: Option<String>,
    pub image: Option<ImageRef>,
    pub phase: Phase,
    pub processed_text: Option<String>,
    pub audio_url: Option<String>,
    pub failure: Option<FailureCategory>,
    pub error: Option<String>,
    pub phase_transitions: Vec<Phase>,
    pub cancelled: bool,
    pub started_at: DateTime<Utc>,
    pub completed_at: DateTime<Utc>,
    pub duration_ms: i64,
}

impl JobReport {
    pub fn from_record(record: &JobRecord, cancelled: bool) -> Self {
        let now = Utc::now();
        let duration = now - record.created_at;
        let mut transitions = record.phase_history.clone();
        transitions.push(record.phase);

        Self {
            job_id: record.job_id.clone(),
            image: record.image.clone(),
            phase: record.phase,
            processed_text: record.processed_text.clone(),
            audio_url: record.audio_url.clone(),
            failure: record.failure(),
            error: record.error.as_ref().map(ToString::to_string),
            phase_transitions: transitions,
            cancelled,
            started_at: record.created_at,
            completed_at: now,
            duration_ms: duration.num_milliseconds(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn record_defaults() {
        let record = JobRecord::new();
        assert_eq!(record.phase, Phase::Begin);
        assert!(record.image.is_none());
        assert!(record.job_id.is_none());
        assert!(record.phase_history.is_empty());
        assert_eq!(record.failure(), None);
    }

    #[test]
    fn snapshot_is_detached_from_record() {
        let mut record = JobRecord::new();
        record.processed_text = Some("first".into());
        let snapshot = record.snapshot();

        record.processed_text = Some("second".into());
        record.phase = Phase::StillProcessingAudio;

        assert_eq!(snapshot.processed_text.as_deref(), Some("first"));
        assert_eq!(snapshot.phase, Phase::Begin);
    }

    #[test]
    fn report_from_record() {
        let mut record = JobRecord::new();
        record.image = Some(ImageRef::new("receipt.jpg"));
        record.job_id = Some("J1".into());
        record.phase_history = vec![Phase::Begin, Phase::ImageReceived, Phase::UrlFetched];
        record.phase = Phase::GetFailure;
        record.error = Some(ApiError::JobNotFound {
            job_id: "J1".into(),
        });

        let report = JobReport::from_record(&record, false);
        assert_eq!(report.job_id.as_deref(), Some("J1"));
        assert_eq!(report.failure, Some(FailureCategory::JobMissing));
        assert_eq!(report.error.as_deref(), Some("job J1 does not exist"));
        assert_eq!(
            report.phase_transitions,
            vec![
                Phase::Begin,
                Phase::ImageReceived,
                Phase::UrlFetched,
                Phase::GetFailure
            ]
        );
        assert!(!report.cancelled);
        assert!(report.duration_ms >= 0);
    }

    #[test]
    fn report_serializes_phase_names() {
        let record = JobRecord::new();
        let json = serde_json::to_value(JobReport::from_record(&record, true)).unwrap();
        assert_eq!(json["phase"], "BEGIN");
        assert_eq!(json["cancelled"], true);
    }
}
