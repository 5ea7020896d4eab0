//! Pagination envelope shared by every list endpoint

use serde::Serialize;
use utoipa::ToSchema;

use super::{book::Book, borrow::BorrowRecordDetails, user::UserResponse};
use crate::error::{AppError, AppResult};

pub const DEFAULT_PAGE_SIZE: i64 = 10;
pub const MAX_PAGE_SIZE: i64 = 100;

/// Zero-based page selection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub page: i64,
    pub size: i64,
    offset: i64,
}

impl PageRequest {
    pub fn new(page: Option<i64>, size: Option<i64>) -> AppResult<Self> {
        let page = page.unwrap_or(0);
        let size = size.unwrap_or(DEFAULT_PAGE_SIZE);

        if page < 0 {
            return Err(AppError::Validation("Page index must not be negative".to_string()));
        }
        if !(1..=MAX_PAGE_SIZE).contains(&size) {
            return Err(AppError::Validation(format!(
                "Page size must be between 1 and {}",
                MAX_PAGE_SIZE
            )));
        }

        let offset = page
            .checked_mul(size)
            .ok_or_else(|| AppError::Validation("Page index is out of range".to_string()))?;

        Ok(Self { page, size, offset })
    }

    pub fn offset(&self) -> i64 {
        self.offset
    }
}

/// Paginated response wrapper
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
#[aliases(
    PagedBooks = PagedResponse<Book>,
    PagedBorrowRecords = PagedResponse<BorrowRecordDetails>,
    PagedUsers = PagedResponse<UserResponse>
)]
pub struct PagedResponse<T>
where
    T: for<'a> ToSchema<'a>,
{
    pub content: Vec<T>,
    pub current_page: i64,
    pub page_size: i64,
    pub total_elements: i64,
    pub total_pages: i64,
    pub has_next: bool,
    pub has_previous: bool,
    pub is_first: bool,
    pub is_last: bool,
}

impl<T> PagedResponse<T>
where
    T: for<'a> ToSchema<'a>,
{
    pub fn new(content: Vec<T>, request: PageRequest, total_elements: i64) -> Self {
        let total_pages = (total_elements + request.size - 1) / request.size;
        let has_next = request.page + 1 < total_pages;

        Self {
            content,
            current_page: request.page,
            page_size: request.size,
            total_elements,
            total_pages,
            has_next,
            has_previous: request.page > 0,
            is_first: request.page == 0,
            is_last: !has_next,
        }
    }
}
