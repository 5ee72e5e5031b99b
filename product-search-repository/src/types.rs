//! Request types for search index operations.

/// A paginated full-text query against the search index.
///
/// `candidate_ids` restricts results to an identifier allow-list. `None` means
/// unrestricted; `Some(empty)` never reaches a provider (`SearchIndexService`
/// short-circuits it to an empty page).
#[derive(Debug, Clone, PartialEq)]
pub struct SearchRequest {
    /// Normalized query text.
    pub query: String,
    /// 1-based page number.
    pub page: u32,
    /// Page size.
    pub size: u32,
    /// Optional identifier allow-list.
    pub candidate_ids: Option<Vec<String>>,
}

impl SearchRequest {
    /// Create an unrestricted request.
    pub fn new(query: impl Into<String>, page: u32, size: u32) -> Self {
        Self {
            query: query.into(),
            page,
            size,
            candidate_ids: None,
        }
    }

    /// Restrict the request to the given identifiers.
    pub fn with_candidates(mut self, candidate_ids: Vec<String>) -> Self {
        self.candidate_ids = Some(candidate_ids);
        self
    }

    /// Zero-based offset of the first hit: `(page - 1) * size`.
    pub fn offset(&self) -> usize {
        (self.page.saturating_sub(1) as usize) * self.size as usize
    }
}
