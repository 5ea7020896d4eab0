//! Data models for Bookaholic

pub mod auth;
pub mod book;
pub mod borrow;
pub mod enums;
pub mod page;
pub mod user;

// Re-export commonly used types
pub use book::Book;
pub use borrow::{BorrowRecord, BorrowRecordDetails};
pub use enums::{AuthProvider, BorrowStatus, Role};
pub use page::{PageRequest, PagedResponse};
pub use user::{User, UserClaims, UserResponse};
