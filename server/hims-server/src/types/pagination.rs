//! Pagination for list endpoints

use serde::Deserialize;
use utoipa::IntoParams;

use crate::error::{api_success_with_meta, ApiResponse, PaginationInfo, ResponseMetadata};

/// Standard pagination parameters for list endpoints
#[derive(Debug, Deserialize, IntoParams, Clone, Default)]
pub struct PaginationParams {
    #[param(example = 1, minimum = 1)]
    pub page: Option<u32>,

    #[param(example = 20, minimum = 1, maximum = 100)]
    pub page_size: Option<u32>,
}

impl PaginationParams {
    /// Get the page number (defaults to 1, minimum 1)
    pub fn page(&self) -> u32 {
        self.page.unwrap_or(1).max(1)
    }

    /// Get the page size (defaults to 20, clamped between 1 and 100)
    pub fn page_size(&self) -> u32 {
        self.page_size.unwrap_or(20).clamp(1, 100)
    }

    pub fn offset(&self) -> usize {
        (self.page() as usize - 1) * self.page_size() as usize
    }

    /// Calculate total pages given a total count
    pub fn total_pages(&self, total_count: usize) -> u32 {
        if total_count == 0 {
            return 1;
        }
        let size = self.page_size() as usize;
        u32::try_from(total_count.div_ceil(size)).unwrap_or(u32::MAX)
    }

    pub fn to_metadata(&self, total_count: usize) -> ResponseMetadata {
        let total_pages = self.total_pages(total_count);
        ResponseMetadata {
            pagination: Some(PaginationInfo {
                page: self.page(),
                page_size: self.page_size(),
                total_pages,
                has_next: self.page() < total_pages,
                has_previous: self.page() > 1,
            }),
            total_count: Some(total_count),
        }
    }

    /// Cut one page out of an already ordered list
    pub fn paginate<T>(&self, items: Vec<T>) -> ApiResponse<Vec<T>> {
        let total_count = items.len();
        let page = items
            .into_iter()
            .skip(self.offset())
            .take(self.page_size() as usize)
            .collect();
        api_success_with_meta(page, self.to_metadata(total_count))
    }
}
