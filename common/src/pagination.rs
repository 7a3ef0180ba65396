use crate::job::Page;
use crate::query::QueryKey;

pub const DEFAULT_PAGE_SIZE: u64 = 20;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListKind {
    All,
    Dead,
}

/// Page number → offset/limit. The page is owned by the caller; the
/// controller never corrects it against the server's page count.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pagination {
    page: u64,
    limit: u64,
}

impl Default for Pagination {
    fn default() -> Self {
        Self::new(1, DEFAULT_PAGE_SIZE)
    }
}

impl Pagination {
    /// `page` and `limit` are raised to 1 if given as 0.
    pub fn new(page: u64, limit: u64) -> Self {
        Self {
            page: page.max(1),
            limit: limit.max(1),
        }
    }

    pub fn page(&self) -> u64 {
        self.page
    }

    pub fn limit(&self) -> u64 {
        self.limit
    }

    pub fn offset(&self) -> u64 {
        (self.page - 1).saturating_mul(self.limit)
    }

    pub fn can_go_prev(&self) -> bool {
        self.page > 1
    }

    pub fn can_go_next<T>(&self, page: &Page<T>) -> bool {
        page.current_page < page.total_pages
    }

    pub fn goto(&mut self, page: u64) {
        self.page = page.max(1);
    }

    pub fn next<T>(&mut self, page: &Page<T>) -> bool {
        if self.can_go_next(page) {
            self.page = self.page.saturating_add(1);
            true
        } else {
            false
        }
    }

    pub fn prev(&mut self) -> bool {
        if self.can_go_prev() {
            self.page -= 1;
            true
        } else {
            false
        }
    }

    pub fn key(&self, kind: ListKind) -> QueryKey {
        let (limit, offset) = (self.limit, self.offset());
        match kind {
            ListKind::All => QueryKey::Jobs { limit, offset },
            ListKind::Dead => QueryKey::DeadJobs { limit, offset },
        }
    }
}
