use std::time::Duration;

use serde_json::Value;

use crate::api::Endpoint;
use crate::job::{Job, JobId, JobStats, Page};
use crate::normalize;

/// Refresh cadence for every polled query.
pub const POLL_INTERVAL: Duration = Duration::from_millis(2000);

/// Identity of one cacheable read: a resource plus its parameters.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum QueryKey {
    Stats,
    Jobs { limit: u64, offset: u64 },
    DeadJobs { limit: u64, offset: u64 },
    Job(JobId),
}

/// Groups of identities that a mutation invalidates together.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueryFamily {
    Stats,
    Jobs,
    DeadJobs,
    Job(JobId),
}

/// A normalized query result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueryData {
    Stats(JobStats),
    Jobs(Page<Job>),
    Job(Job),
}

impl QueryData {
    pub fn as_stats(&self) -> Option<&JobStats> {
        match self {
            QueryData::Stats(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_page(&self) -> Option<&Page<Job>> {
        match self {
            QueryData::Jobs(p) => Some(p),
            _ => None,
        }
    }

    pub fn as_job(&self) -> Option<&Job> {
        match self {
            QueryData::Job(j) => Some(j),
            _ => None,
        }
    }
}

impl QueryKey {
    pub fn resource(&self) -> &'static str {
        match self {
            QueryKey::Stats => "jobStats",
            QueryKey::Jobs { .. } => "jobs",
            QueryKey::DeadJobs { .. } => "deadJobs",
            QueryKey::Job(_) => "job",
        }
    }

    pub fn endpoint(&self) -> Endpoint {
        match self {
            QueryKey::Stats => Endpoint::Stats,
            QueryKey::Jobs { limit, offset } => Endpoint::Jobs {
                limit: *limit,
                offset: *offset,
            },
            QueryKey::DeadJobs { limit, offset } => Endpoint::DeadJobs {
                limit: *limit,
                offset: *offset,
            },
            QueryKey::Job(id) => Endpoint::Job(id.clone()),
        }
    }

    /// Single-job detail is fetched on demand only.
    pub fn poll_interval(&self) -> Option<Duration> {
        match self {
            QueryKey::Job(_) => None,
            _ => Some(POLL_INTERVAL),
        }
    }

    pub fn belongs_to(&self, family: &QueryFamily) -> bool {
        match (self, family) {
            (QueryKey::Stats, QueryFamily::Stats) => true,
            (QueryKey::Jobs { .. }, QueryFamily::Jobs) => true,
            (QueryKey::DeadJobs { .. }, QueryFamily::DeadJobs) => true,
            (QueryKey::Job(id), QueryFamily::Job(other)) => id == other,
            _ => false,
        }
    }

    pub fn decode(&self, raw: &Value) -> QueryData {
        match self {
            QueryKey::Stats => QueryData::Stats(normalize::normalize_stats(raw)),
            QueryKey::Jobs { .. } | QueryKey::DeadJobs { .. } => {
                QueryData::Jobs(normalize::normalize_page(raw))
            }
            QueryKey::Job(_) => QueryData::Job(normalize::normalize_job(raw)),
        }
    }
}

impl std::fmt::Display for QueryKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            QueryKey::Stats => write!(f, "[jobStats]"),
            QueryKey::Jobs { limit, offset } => write!(f, "[jobs, {}, {}]", limit, offset),
            QueryKey::DeadJobs { limit, offset } => write!(f, "[deadJobs, {}, {}]", limit, offset),
            QueryKey::Job(id) => write!(f, "[job, {}]", id),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::collections::HashSet;

    #[test]
    fn identity_is_resource_plus_params() {
        let mut keys = HashSet::new();
        keys.insert(QueryKey::Jobs { limit: 20, offset: 0 });
        keys.insert(QueryKey::Jobs { limit: 20, offset: 0 });
        keys.insert(QueryKey::Jobs { limit: 20, offset: 20 });
        keys.insert(QueryKey::DeadJobs { limit: 20, offset: 0 });
        assert_eq!(keys.len(), 3);
    }

    #[test]
    fn families() {
        let page2 = QueryKey::Jobs { limit: 20, offset: 20 };
        assert!(page2.belongs_to(&QueryFamily::Jobs));
        assert!(!page2.belongs_to(&QueryFamily::DeadJobs));
        assert!(QueryKey::Job(JobId::from("a")).belongs_to(&QueryFamily::Job(JobId::from("a"))));
        assert!(!QueryKey::Job(JobId::from("a")).belongs_to(&QueryFamily::Job(JobId::from("b"))));
    }

    #[test]
    fn detail_is_not_polled() {
        assert_eq!(QueryKey::Stats.poll_interval(), Some(POLL_INTERVAL));
        assert_eq!(QueryKey::Job(JobId::from("x")).poll_interval(), None);
    }

    #[test]
    fn decode_by_resource() {
        let data = QueryKey::Stats.decode(&json!({"failed_jobs": "3"}));
        assert_eq!(data.as_stats().map(|s| s.failed_jobs), Some(3));

        let data = QueryKey::Job(JobId::from("x")).decode(&json!({"job_id": "x"}));
        assert_eq!(data.as_job().map(|j| j.id.0.as_str()), Some("x"));
        assert!(data.as_page().is_none());
    }
}
