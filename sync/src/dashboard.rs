use common::{ListKind, QueryKey};
use std::sync::Arc;

use crate::cache::{Observer, QueryCache};
use crate::config::Config;
use crate::error::Result;
use crate::mutations::MutationCoordinator;
use crate::transport::{HttpTransport, Transport};
use crate::views::JobListView;

/// The sync layer as one object: created at startup, handed to views, shut
/// down on exit.
pub struct Dashboard {
    cache: Arc<QueryCache>,
    mutations: MutationCoordinator,
    page_size: u64,
}

impl Dashboard {
    pub fn connect(config: &Config) -> Result<Self> {
        let transport = HttpTransport::new(&config.api)?;
        log::info!("using scheduler API at {}", transport.base_url());
        Ok(Self::with_transport(Arc::new(transport), config))
    }

    pub fn with_transport(transport: Arc<dyn Transport>, config: &Config) -> Self {
        let cache = Arc::new(QueryCache::new(transport, &config.polling));
        Self {
            mutations: MutationCoordinator::new(Arc::clone(&cache)),
            cache,
            page_size: config.pagination.page_size,
        }
    }

    pub fn cache(&self) -> &Arc<QueryCache> {
        &self.cache
    }

    pub fn mutations(&self) -> &MutationCoordinator {
        &self.mutations
    }

    pub fn stats(&self) -> Observer {
        self.cache.observe(QueryKey::Stats)
    }

    pub fn job(&self, id: &str) -> Observer {
        self.cache.observe(QueryKey::Job(id.into()))
    }

    pub fn jobs(&self, kind: ListKind, page: u64) -> JobListView {
        JobListView::new(Arc::clone(&self.cache), kind, page, self.page_size)
    }

    pub fn shutdown(&self) {
        self.cache.shutdown();
    }
}
