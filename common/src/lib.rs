pub mod api;
pub mod job;
pub mod normalize;
pub mod pagination;
pub mod query;

pub use api::{Endpoint, Method};
pub use job::{CreateJobRequest, Job, JobId, JobStats, JobStatus, Page};
pub use pagination::{ListKind, Pagination, DEFAULT_PAGE_SIZE};
pub use query::{QueryData, QueryFamily, QueryKey, POLL_INTERVAL};

pub const DEFAULT_API_URL: &str = "http://localhost:8080";
pub const DEFAULT_CONFIG_PATH: &str = "/etc/jobdeck/config.yaml";
pub const USER_CONFIG_PATH: &str = "~/.config/jobdeck/config.yaml";

/// Job types the scheduler ships handlers for.
pub const KNOWN_JOB_TYPES: &[&str] = &[
    "notification:email",
    "media:resize_image",
    "finance:invoice",
    "maintenance:archive",
];
