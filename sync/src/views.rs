use common::{Job, ListKind, Page, Pagination, QueryKey};
use std::sync::Arc;

use crate::cache::{Observer, QueryCache, QueryState};

/// A paginated job listing (all jobs or dead-letter jobs).
///
/// Each page is its own query, so moving between pages swaps the observation
/// and the previous page stops polling. When a fetched page reports fewer
/// pages than the one requested, the view moves to the last page.
pub struct JobListView {
    cache: Arc<QueryCache>,
    kind: ListKind,
    pagination: Pagination,
    observer: Observer,
}

impl JobListView {
    pub fn new(cache: Arc<QueryCache>, kind: ListKind, page: u64, page_size: u64) -> Self {
        let pagination = Pagination::new(page, page_size);
        let observer = cache.observe(pagination.key(kind));
        Self {
            cache,
            kind,
            pagination,
            observer,
        }
    }

    pub fn kind(&self) -> ListKind {
        self.kind
    }

    pub fn page(&self) -> u64 {
        self.pagination.page()
    }

    pub fn key(&self) -> &QueryKey {
        self.observer.key()
    }

    pub fn state(&self) -> QueryState {
        self.observer.state()
    }

    pub fn current(&self) -> Option<Page<Job>> {
        self.state().page().cloned()
    }

    pub fn can_go_prev(&self) -> bool {
        self.pagination.can_go_prev()
    }

    pub fn can_go_next(&self) -> bool {
        let state = self.state();
        !state.is_loading
            && state
                .page()
                .is_some_and(|page| self.pagination.can_go_next(page))
    }

    pub fn goto(&mut self, page: u64) {
        self.pagination.goto(page);
        self.reobserve();
    }

    pub fn next(&mut self) -> bool {
        if !self.can_go_next() {
            return false;
        }
        self.goto(self.pagination.page().saturating_add(1));
        true
    }

    pub fn prev(&mut self) -> bool {
        if self.pagination.prev() {
            self.reobserve();
            true
        } else {
            false
        }
    }

    fn reobserve(&mut self) {
        let key = self.pagination.key(self.kind);
        if &key != self.observer.key() {
            self.observer = self.cache.observe(key);
        }
    }

    fn clamp(&mut self, state: &QueryState) -> bool {
        match state.page() {
            Some(page) if self.pagination.page() > page.total_pages => {
                log::debug!(
                    "page {} is past the last page {}, clamping",
                    self.pagination.page(),
                    page.total_pages
                );
                self.goto(page.total_pages);
                true
            }
            _ => false,
        }
    }

    /// Waits for the next update, applying the clamp.
    pub async fn changed(&mut self) -> QueryState {
        let state = self.observer.changed().await;
        if self.clamp(&state) {
            return self.state();
        }
        state
    }

    /// Waits until the current page has no fetch running, following clamps.
    pub async fn settled(&mut self) -> QueryState {
        loop {
            let state = self.observer.settled().await;
            if !self.clamp(&state) {
                return state;
            }
        }
    }

    pub async fn refresh(&mut self) -> QueryState {
        let state = self.observer.refetch().await;
        if self.clamp(&state) {
            return self.settled().await;
        }
        state
    }
}
