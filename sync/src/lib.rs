//! Synchronization layer between the dashboard views and the job scheduler's
//! HTTP gateway: polling query cache, list pagination and write coordination.

pub mod cache;
pub mod config;
pub mod dashboard;
pub mod error;
pub mod metrics;
pub mod mutations;
mod poller;
pub mod transport;
pub mod views;

pub use cache::{Observer, QueryCache, QueryState};
pub use config::Config;
pub use dashboard::Dashboard;
pub use error::{Result, SyncError};
pub use metrics::SyncMetrics;
pub use mutations::{CreateJobForm, MutationCoordinator};
pub use transport::{HttpTransport, Transport};
pub use views::JobListView;
