use serde::{Deserialize, Serialize};

/// Lifecycle state of a generation job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum JobState {
    Pending,
    Done,
    Failed,
}

impl JobState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobState::Done | JobState::Failed)
    }
}

/// The body of `GET /job/{id}`.
///
/// A 2xx body may still carry `success: false` and no state (unknown job).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobStatus {
    #[serde(default)]
    pub state: Option<JobState>,
    #[serde(default)]
    pub filename: Option<String>,
    #[serde(default)]
    pub download_url: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
}

/// A generation job tracked by id through PENDING → DONE | FAILED.
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationJob {
    pub id: String,
    pub state: JobState,
    pub filename: Option<String>,
    pub download_url: Option<String>,
    pub error: Option<String>,
}

impl GenerationJob {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            state: JobState::Pending,
            filename: None,
            download_url: None,
            error: None,
        }
    }

    /// Applies a status report. Transitions only move forward: once the job
    /// is terminal, later reports are ignored.
    ///
    /// # Returns
    ///
    /// `true` if the report changed the job.
    pub fn apply(&mut self, state: JobState, status: &JobStatus) -> bool {
        if self.state.is_terminal() || state == JobState::Pending {
            return false;
        }

        self.state = state;
        self.filename = status.filename.clone();
        self.download_url = status.download_url.clone();
        self.error = status.error.clone();
        true
    }
}
