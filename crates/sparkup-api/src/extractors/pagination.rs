//! Pagination body parameters.

use serde::{Deserialize, Serialize};

use sparkup_core::error::AppError;
use sparkup_core::types::PageRequest;

/// `{page?, per_page?}` as sent by clients of the room list.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PaginationParams {
    /// Page number (1-based, default: 1).
    pub page: Option<i64>,
    /// Items per page (default: 20, max: 100).
    pub per_page: Option<i64>,
}

impl PaginationParams {
    /// Parse an optional JSON body; an empty body means defaults.
    pub fn from_body(body: &[u8]) -> Result<Self, AppError> {
        if body.iter().all(u8::is_ascii_whitespace) {
            return Ok(Self::default());
        }
        serde_json::from_slice(body)
            .map_err(|e| AppError::validation(format!("Invalid pagination body: {e}")))
    }

    /// Converts to a clamped `PageRequest`.
    pub fn into_page_request(self) -> PageRequest {
        let defaults = PageRequest::default();
        let page = self.page.map_or(defaults.page, |p| p.max(1) as u64);
        let per_page = self.per_page.map_or(defaults.per_page, |p| p.max(1) as u64);
        PageRequest::new(page, per_page)
    }
}
