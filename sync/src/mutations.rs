use common::{CreateJobRequest, Endpoint, Job, JobId, JobStatus, QueryFamily};
use dashmap::DashSet;
use serde_json::{json, Value};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use crate::cache::QueryCache;
use crate::error::{Result, SyncError};

pub const DEFAULT_PAYLOAD_TEMPLATE: &str = "{\n  \"key\": \"value\"\n}";

/// Input of the create-job form. Survives a failed submission untouched and
/// is reset after a successful one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateJobForm {
    pub job_type: String,
    pub payload: String,
}

impl Default for CreateJobForm {
    fn default() -> Self {
        Self {
            job_type: String::new(),
            payload: DEFAULT_PAYLOAD_TEMPLATE.to_string(),
        }
    }
}

impl CreateJobForm {
    pub fn new(job_type: impl Into<String>, payload: impl Into<String>) -> Self {
        Self {
            job_type: job_type.into(),
            payload: payload.into(),
        }
    }

    pub fn validate(&self) -> Result<CreateJobRequest> {
        let job_type = self.job_type.trim();
        if job_type.is_empty() {
            return Err(SyncError::validation("type", "Job Type is required"));
        }
        if let Err(e) = serde_json::from_str::<Value>(&self.payload) {
            return Err(SyncError::validation(
                "payload",
                format!("Payload must be a valid JSON string ({})", e),
            ));
        }
        Ok(CreateJobRequest {
            job_type: job_type.to_string(),
            payload: self.payload.clone(),
        })
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

/// Writes against the scheduler. Nothing cached is edited in place: a
/// successful write invalidates the affected queries and the refetch shows
/// what the server actually did.
pub struct MutationCoordinator {
    cache: Arc<QueryCache>,
    creating: AtomicUsize,
    resubmitting: DashSet<JobId>,
}

struct ResubmitGuard<'a> {
    set: &'a DashSet<JobId>,
    id: JobId,
}

impl Drop for ResubmitGuard<'_> {
    fn drop(&mut self) {
        self.set.remove(&self.id);
    }
}

struct CreateGuard<'a>(&'a AtomicUsize);

impl Drop for CreateGuard<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

impl MutationCoordinator {
    pub fn new(cache: Arc<QueryCache>) -> Self {
        Self {
            cache,
            creating: AtomicUsize::new(0),
            resubmitting: DashSet::new(),
        }
    }

    pub fn is_creating(&self) -> bool {
        self.creating.load(Ordering::SeqCst) > 0
    }

    /// Whether the resubmit action for this job should be disabled.
    pub fn is_resubmitting(&self, id: &JobId) -> bool {
        self.resubmitting.contains(id)
    }

    /// Validates and posts the form. Validation failures never reach the
    /// network. On success the form is reset and every `jobs` page plus the
    /// stats are invalidated.
    pub async fn create_job(&self, form: &mut CreateJobForm) -> Result<Value> {
        let request = form.validate()?;
        let body = json!({ "type": request.job_type, "payload": request.payload });

        self.creating.fetch_add(1, Ordering::SeqCst);
        let _guard = CreateGuard(&self.creating);

        let created = self
            .cache
            .transport()
            .send(&Endpoint::CreateJob, Some(&body))
            .await
            .map_err(|e| {
                log::warn!("create job {} failed: {}", request.job_type, e);
                e
            })?;

        log::info!("created job of type {}", request.job_type);
        self.cache.metrics().record_mutation("create_job");
        self.cache.invalidate(&QueryFamily::Jobs);
        self.cache.invalidate(&QueryFamily::Stats);
        form.reset();
        Ok(created)
    }

    /// Re-enqueues a failed job. Only one resubmission per job may be in
    /// flight; other jobs are unaffected. On success the dead-letter pages,
    /// the stats and the job's own detail are invalidated.
    pub async fn resubmit(&self, job: &Job) -> Result<()> {
        if job.status != JobStatus::Failed {
            return Err(SyncError::NotResubmittable {
                id: job.id.clone(),
                status: job.status,
            });
        }
        if !self.resubmitting.insert(job.id.clone()) {
            return Err(SyncError::ResubmitInFlight(job.id.clone()));
        }
        let guard = ResubmitGuard {
            set: &self.resubmitting,
            id: job.id.clone(),
        };

        let result = self
            .cache
            .transport()
            .send(&Endpoint::ResubmitJob(job.id.clone()), Some(&json!({})))
            .await;
        drop(guard);

        match result {
            Ok(_) => {
                log::info!("resubmitted job {}", job.id);
                self.cache.metrics().record_mutation("resubmit_job");
                self.cache.invalidate(&QueryFamily::DeadJobs);
                self.cache.invalidate(&QueryFamily::Stats);
                self.cache.invalidate(&QueryFamily::Job(job.id.clone()));
                Ok(())
            }
            Err(e) => {
                log::warn!("resubmit {} failed: {}", job.id, e);
                Err(e)
            }
        }
    }
}
