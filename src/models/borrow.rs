//! Borrow record model and related types

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::{IntoParams, ToSchema};

use super::enums::BorrowStatus;

/// Borrow record row from database
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct BorrowRecord {
    pub id: i64,
    pub user_id: i64,
    pub book_id: i64,
    pub borrow_date: NaiveDate,
    pub due_date: NaiveDate,
    pub return_date: Option<NaiveDate>,
    pub status: BorrowStatus,
}

/// Borrow record joined with the borrower email and book title for display
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct BorrowRecordDetails {
    pub id: i64,
    pub user_id: i64,
    pub user_email: String,
    pub book_id: i64,
    pub book_title: String,
    pub borrow_date: NaiveDate,
    pub due_date: NaiveDate,
    pub return_date: Option<NaiveDate>,
    pub status: BorrowStatus,
}

impl BorrowRecordDetails {
    /// Attach the borrower email and book title to a stored record
    pub fn from_parts(record: BorrowRecord, user_email: String, book_title: String) -> Self {
        Self {
            id: record.id,
            user_id: record.user_id,
            user_email,
            book_id: record.book_id,
            book_title,
            borrow_date: record.borrow_date,
            due_date: record.due_date,
            return_date: record.return_date,
            status: record.status,
        }
    }
}

/// Admin edit of a borrow record
#[derive(Debug, Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateBorrowRecord {
    pub status: Option<BorrowStatus>,
    pub due_date: Option<NaiveDate>,
}

/// Borrow history filters
#[derive(Debug, Deserialize, IntoParams)]
pub struct BorrowQuery {
    pub page: Option<i64>,
    pub size: Option<i64>,
    pub status: Option<BorrowStatus>,
}

/// Target status of an admin override
#[derive(Debug, Deserialize, IntoParams)]
pub struct OverrideQuery {
    pub status: BorrowStatus,
}

/// Fields of a borrow record about to be inserted
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewBorrowRecord {
    pub user_id: i64,
    pub book_id: i64,
    pub borrow_date: NaiveDate,
    pub due_date: NaiveDate,
    pub status: BorrowStatus,
}
