//! Book (catalog entry) model and related types

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use validator::Validate;

/// ISBN-10 or ISBN-13, hyphens and spaces allowed
static ISBN_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(?:[0-9][0-9\- ]{8,15}[0-9Xx])$").unwrap());

/// Book row from database
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Book {
    pub id: i64,
    pub title: String,
    pub author: String,
    pub isbn: String,
    pub total_copies: i32,
    pub available_copies: i32,
    /// Public URL of the cover image
    pub image_url: Option<String>,
}

impl Book {
    /// Copies currently out on loan
    pub fn borrowed_copies(&self) -> i32 {
        self.total_copies - self.available_copies
    }
}

/// Validated fields of a new catalog entry (image handled separately)
#[derive(Debug, Clone, Validate)]
pub struct NewBook {
    #[validate(length(min = 1, message = "Title is required"))]
    pub title: String,
    #[validate(length(min = 1, message = "Author is required"))]
    pub author: String,
    #[validate(regex(path = *ISBN_PATTERN, message = "Invalid ISBN"))]
    pub isbn: String,
    #[validate(range(min = 0, message = "Copies cannot be negative"))]
    pub copies: i32,
}

/// Validated fields of a catalog update (image handled separately)
#[derive(Debug, Clone, Validate)]
pub struct BookUpdate {
    #[validate(length(min = 1, message = "Title is required"))]
    pub title: String,
    #[validate(length(min = 1, message = "Author is required"))]
    pub author: String,
    #[validate(regex(path = *ISBN_PATTERN, message = "Invalid ISBN"))]
    pub isbn: String,
    #[validate(range(min = 0, message = "Total copies cannot be negative"))]
    pub total_copies: i32,
}

/// Uploaded cover image
#[derive(Debug, Clone)]
pub struct ImageUpload {
    pub file_name: Option<String>,
    pub content_type: Option<String>,
    pub bytes: Vec<u8>,
}
