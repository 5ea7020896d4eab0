//! Borrow ledger repository.
//!
//! Every write that touches inventory runs in one transaction holding row
//! locks on the affected book and record, so concurrent checkouts of the last
//! copy serialize instead of overselling.

use sqlx::{PgConnection, Pool, Postgres};

use crate::{
    error::{AppError, AppResult},
    models::{
        book::Book,
        borrow::{BorrowRecord, BorrowRecordDetails, NewBorrowRecord},
        enums::BorrowStatus,
        page::PageRequest,
    },
};

use super::books;

/// Record joined with borrower email and book title
const DETAILS_SELECT: &str = r#"
    SELECT r.id, r.user_id, u.email AS user_email, r.book_id, k.title AS book_title,
           r.borrow_date, r.due_date, r.return_date, r.status
    FROM borrow_records r
    JOIN users u ON u.id = r.user_id
    JOIN books k ON k.id = r.book_id
"#;

const FILTER: &str =
    "WHERE ($1::BIGINT IS NULL OR r.user_id = $1) AND ($2::TEXT IS NULL OR r.status = $2)";

#[derive(Clone)]
pub struct BorrowsRepository {
    pool: Pool<Postgres>,
}

impl BorrowsRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    // =========================================================================
    // READ
    // =========================================================================

    /// Get record by ID
    pub async fn get_by_id(&self, id: i64) -> AppResult<BorrowRecord> {
        sqlx::query_as::<_, BorrowRecord>("SELECT * FROM borrow_records WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound("Record not found".to_string()))
    }

    /// Page through records, optionally for one user or status
    pub async fn list(
        &self,
        page: PageRequest,
        user_id: Option<i64>,
        status: Option<BorrowStatus>,
    ) -> AppResult<(Vec<BorrowRecordDetails>, i64)> {
        let count_query = format!("SELECT COUNT(*) FROM borrow_records r {}", FILTER);
        let total = sqlx::query_scalar::<_, i64>(&count_query)
            .bind(user_id)
            .bind(status)
            .fetch_one(&self.pool)
            .await?;

        let select_query = format!(
            "{} {} ORDER BY r.id LIMIT $3 OFFSET $4",
            DETAILS_SELECT, FILTER
        );
        let records = sqlx::query_as::<_, BorrowRecordDetails>(&select_query)
            .bind(user_id)
            .bind(status)
            .bind(page.size)
            .bind(page.offset())
            .fetch_all(&self.pool)
            .await?;

        Ok((records, total))
    }

    /// Every record, optionally for one user
    pub async fn list_all(&self, user_id: Option<i64>) -> AppResult<Vec<BorrowRecordDetails>> {
        let query = format!(
            "{} {} ORDER BY r.id",
            DETAILS_SELECT, FILTER
        );
        let records = sqlx::query_as::<_, BorrowRecordDetails>(&query)
            .bind(user_id)
            .bind(None::<BorrowStatus>)
            .fetch_all(&self.pool)
            .await?;
        Ok(records)
    }

    pub async fn count(&self) -> AppResult<i64> {
        let count = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM borrow_records")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    // =========================================================================
    // WRITE
    // =========================================================================

    /// Check a copy out to `user_id`.
    ///
    /// Locks the user row first so one member's concurrent checkouts are
    /// counted against the limit one at a time, then the book row. `rule`
    /// receives the active borrow count and the locked book.
    pub async fn checkout<F>(&self, user_id: i64, book_id: i64, rule: F) -> AppResult<BorrowRecordDetails>
    where
        F: FnOnce(i64, &mut Book) -> AppResult<NewBorrowRecord>,
    {
        let mut tx = self.pool.begin().await?;

        let email =
            sqlx::query_scalar::<_, String>("SELECT email FROM users WHERE id = $1 FOR UPDATE")
                .bind(user_id)
                .fetch_optional(&mut *tx)
                .await?
                .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;

        let active = count_active(&mut tx, user_id).await?;
        let mut book = books::lock(&mut tx, book_id).await?;

        let new_record = rule(active, &mut book)?;
        books::save_stock(&mut tx, &book).await?;

        let record = sqlx::query_as::<_, BorrowRecord>(
            r#"
            INSERT INTO borrow_records (user_id, book_id, borrow_date, due_date, status)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING *
            "#,
        )
        .bind(new_record.user_id)
        .bind(new_record.book_id)
        .bind(new_record.borrow_date)
        .bind(new_record.due_date)
        .bind(new_record.status)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(BorrowRecordDetails::from_parts(record, email, book.title))
    }

    /// Apply `rule` to an existing record and its book under row locks,
    /// then persist both.
    pub async fn reconcile<F>(&self, record_id: i64, rule: F) -> AppResult<BorrowRecordDetails>
    where
        F: FnOnce(&mut BorrowRecord, &mut Book) -> AppResult<()>,
    {
        let mut tx = self.pool.begin().await?;

        let mut record = sqlx::query_as::<_, BorrowRecord>(
            "SELECT * FROM borrow_records WHERE id = $1 FOR UPDATE",
        )
        .bind(record_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| AppError::NotFound("Record not found".to_string()))?;

        let mut book = books::lock(&mut tx, record.book_id).await?;

        rule(&mut record, &mut book)?;

        books::save_stock(&mut tx, &book).await?;
        sqlx::query(
            "UPDATE borrow_records SET status = $1, due_date = $2, return_date = $3 WHERE id = $4",
        )
        .bind(record.status)
        .bind(record.due_date)
        .bind(record.return_date)
        .bind(record.id)
        .execute(&mut *tx)
        .await?;

        let email = sqlx::query_scalar::<_, String>("SELECT email FROM users WHERE id = $1")
            .bind(record.user_id)
            .fetch_one(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(BorrowRecordDetails::from_parts(record, email, book.title))
    }
}

async fn count_active(conn: &mut PgConnection, user_id: i64) -> AppResult<i64> {
    let count = sqlx::query_scalar::<_, i64>(
        "SELECT COUNT(*) FROM borrow_records WHERE user_id = $1 AND status = 'BORROWED'",
    )
    .bind(user_id)
    .fetch_one(&mut *conn)
    .await?;
    Ok(count)
}
