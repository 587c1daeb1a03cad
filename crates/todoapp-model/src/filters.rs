use serde::{Deserialize, Serialize};

/// Page size the task API uses when the client does not ask for one.
pub const DEFAULT_PAGE_SIZE: u32 = 20;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StatusFilter {
    #[default]
    All,
    Pending,
    Completed,
}

impl StatusFilter {
    /// Whether a todo with the given completion flag passes this filter.
    pub fn accepts(self, is_completed: bool) -> bool {
        match self {
            StatusFilter::All => true,
            StatusFilter::Pending => !is_completed,
            StatusFilter::Completed => is_completed,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SortBy {
    #[default]
    CreatedAt,
    Title,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    Asc,
    #[default]
    Desc,
}

/// View criteria. The default is what `clear_filters` goes back to: every
/// status, newest first, no search.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Filters {
    pub status: StatusFilter,
    pub search: Option<String>,
    pub sort_by: SortBy,
    pub sort_order: SortOrder,
}

/// A partial set of criteria to merge into [`Filters`].
///
/// `search: Some(None)` removes the search term; `search: None` leaves it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FiltersPatch {
    pub status: Option<StatusFilter>,
    pub search: Option<Option<String>>,
    pub sort_by: Option<SortBy>,
    pub sort_order: Option<SortOrder>,
}

impl FiltersPatch {
    pub fn status(status: StatusFilter) -> Self {
        Self {
            status: Some(status),
            ..Self::default()
        }
    }

    pub fn search(term: impl Into<String>) -> Self {
        Self {
            search: Some(Some(term.into())),
            ..Self::default()
        }
    }

    pub fn sort(sort_by: SortBy, sort_order: SortOrder) -> Self {
        Self {
            sort_by: Some(sort_by),
            sort_order: Some(sort_order),
            ..Self::default()
        }
    }
}

impl Filters {
    pub fn merge(&mut self, patch: FiltersPatch) {
        if let Some(status) = patch.status {
            self.status = status;
        }
        if let Some(search) = patch.search {
            // An empty term is the same as no search
            self.search = search.filter(|term| !term.trim().is_empty());
        }
        if let Some(sort_by) = patch.sort_by {
            self.sort_by = sort_by;
        }
        if let Some(sort_order) = patch.sort_order {
            self.sort_order = sort_order;
        }
    }

    pub fn merged(&self, patch: FiltersPatch) -> Self {
        let mut next = self.clone();
        next.merge(patch);
        next
    }
}

/// The page window the client asks the server for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub page: u32,
    pub limit: u32,
}

impl Default for PageRequest {
    fn default() -> Self {
        Self {
            page: 1,
            limit: DEFAULT_PAGE_SIZE,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Pagination {
    pub page: u32,
    pub limit: u32,
    pub total: u64,
    pub total_pages: u32,
    pub has_next: bool,
    pub has_prev: bool,
}

impl Default for Pagination {
    fn default() -> Self {
        Self {
            page: 1,
            limit: DEFAULT_PAGE_SIZE,
            total: 0,
            total_pages: 0,
            has_next: false,
            has_prev: false,
        }
    }
}

impl Pagination {
    pub fn from_page(page: u32, limit: u32, total: u64, has_next: bool, has_prev: bool) -> Self {
        let total_pages = if limit == 0 {
            0
        } else {
            u32::try_from(total.div_ceil(u64::from(limit))).unwrap_or(u32::MAX)
        };
        Self {
            page,
            limit,
            total,
            total_pages,
            has_next,
            has_prev,
        }
    }

    pub fn request(&self) -> PageRequest {
        PageRequest {
            page: self.page,
            limit: self.limit,
        }
    }
}

/// Counts over a collection. `pending` is everything not completed, so it
/// includes the `in_progress` todos and `completed + pending == total`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Stats {
    pub total: usize,
    pub completed: usize,
    pub pending: usize,
    pub in_progress: usize,
    pub completed_today: usize,
    /// Completed share in percent, rounded to two decimals.
    pub completion_rate: f64,
}

impl Stats {
    pub fn completion_rate(completed: usize, total: usize) -> f64 {
        if total == 0 {
            return 0.0;
        }
        (completed as f64 / total as f64 * 10_000.0).round() / 100.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_filters() {
        let filters = Filters::default();
        assert_eq!(filters.status, StatusFilter::All);
        assert_eq!(filters.sort_by, SortBy::CreatedAt);
        assert_eq!(filters.sort_order, SortOrder::Desc);
        assert!(filters.search.is_none());
    }

    #[test]
    fn test_merge_only_touches_present_fields() {
        let mut filters = Filters::default();
        filters.merge(FiltersPatch::search("milk"));
        filters.merge(FiltersPatch::status(StatusFilter::Completed));

        assert_eq!(filters.search.as_deref(), Some("milk"));
        assert_eq!(filters.status, StatusFilter::Completed);
        assert_eq!(filters.sort_order, SortOrder::Desc);

        filters.merge(FiltersPatch {
            search: Some(None),
            ..FiltersPatch::default()
        });
        assert!(filters.search.is_none());

        filters.merge(FiltersPatch::search("  "));
        assert!(filters.search.is_none());
    }

    #[test]
    fn test_status_filter_accepts() {
        assert!(StatusFilter::All.accepts(true));
        assert!(StatusFilter::Pending.accepts(false));
        assert!(!StatusFilter::Pending.accepts(true));
        assert!(StatusFilter::Completed.accepts(true));
    }

    #[test]
    fn test_total_pages() {
        assert_eq!(Pagination::from_page(1, 20, 0, false, false).total_pages, 0);
        assert_eq!(Pagination::from_page(1, 20, 20, false, false).total_pages, 1);
        assert_eq!(Pagination::from_page(2, 20, 41, true, true).total_pages, 3);
        assert_eq!(Pagination::from_page(1, 0, 41, false, false).total_pages, 0);
    }
}
