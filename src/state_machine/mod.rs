mod job;
mod phase;
mod state;
mod status;

pub use job::{ImageRef, JobRecord, JobReport, JobSnapshot};
pub use phase::{FailureCategory, Phase};
pub use state::{IgnoreReason, JobStateMachine, Transition};
pub use status::{ServerStatus, StatusReport};
