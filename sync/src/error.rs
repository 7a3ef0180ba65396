use common::JobId;
use thiserror::Error;

/// Everything that can go wrong between a view and the scheduler gateway.
///
/// Malformed payloads are not errors: the normalizer degrades them
/// to defaults instead of reporting them.
#[derive(Debug, Error)]
pub enum SyncError {
    #[error("request {endpoint} failed: {source}")]
    Transport {
        endpoint: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("request {endpoint} returned HTTP {status}")]
    Status { endpoint: String, status: u16 },

    #[error("invalid {field}: {message}")]
    Validation { field: &'static str, message: String },

    #[error("resubmission of job {0} is already in flight")]
    ResubmitInFlight(JobId),

    #[error("job {id} is {status}, only failed jobs can be resubmitted")]
    NotResubmittable { id: JobId, status: common::JobStatus },

    #[error("configuration error: {0}")]
    Config(String),
}

impl SyncError {
    pub fn validation(field: &'static str, message: impl Into<String>) -> Self {
        SyncError::Validation {
            field,
            message: message.into(),
        }
    }

    /// Errors raised before any request left the process.
    pub fn is_local(&self) -> bool {
        matches!(
            self,
            SyncError::Validation { .. }
                | SyncError::ResubmitInFlight(_)
                | SyncError::NotResubmittable { .. }
                | SyncError::Config(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, SyncError>;
