//! Books repository for database operations

use sqlx::{PgConnection, Pool, Postgres};

use crate::{
    error::{AppError, AppResult},
    inventory,
    models::{
        book::{Book, BookUpdate, NewBook},
        page::PageRequest,
    },
};

use super::is_unique_violation;

#[derive(Clone)]
pub struct BooksRepository {
    pool: Pool<Postgres>,
}

impl BooksRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    /// Get book by ID
    pub async fn get_by_id(&self, id: i64) -> AppResult<Book> {
        sqlx::query_as::<_, Book>("SELECT * FROM books WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound("Book not found".to_string()))
    }

    /// Check whether another book already carries this ISBN
    pub async fn isbn_exists(&self, isbn: &str, exclude_id: Option<i64>) -> AppResult<bool> {
        let exists = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM books WHERE isbn = $1 AND ($2::BIGINT IS NULL OR id <> $2))",
        )
        .bind(isbn)
        .bind(exclude_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(exists)
    }

    /// Insert a new book with every copy on the shelf
    pub async fn create(&self, book: &NewBook, image_url: Option<&str>) -> AppResult<Book> {
        sqlx::query_as::<_, Book>(
            r#"
            INSERT INTO books (title, author, isbn, total_copies, available_copies, image_url)
            VALUES ($1, $2, $3, $4, $4, $5)
            RETURNING *
            "#,
        )
        .bind(&book.title)
        .bind(&book.author)
        .bind(&book.isbn)
        .bind(book.copies)
        .bind(image_url)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| duplicate_isbn(e, &book.isbn))
    }

    /// Update descriptive fields and resize stock under a row lock.
    ///
    /// `image_url` replaces the stored URL only when present.
    pub async fn update(
        &self,
        id: i64,
        fields: &BookUpdate,
        image_url: Option<&str>,
    ) -> AppResult<Book> {
        let mut tx = self.pool.begin().await?;

        let mut book = lock(&mut tx, id).await?;
        inventory::resize(&mut book, fields.total_copies)?;

        let updated = sqlx::query_as::<_, Book>(
            r#"
            UPDATE books
            SET title = $1, author = $2, isbn = $3,
                total_copies = $4, available_copies = $5,
                image_url = COALESCE($6, image_url)
            WHERE id = $7
            RETURNING *
            "#,
        )
        .bind(&fields.title)
        .bind(&fields.author)
        .bind(&fields.isbn)
        .bind(book.total_copies)
        .bind(book.available_copies)
        .bind(image_url)
        .bind(id)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| duplicate_isbn(e, &fields.isbn))?;

        tx.commit().await?;
        Ok(updated)
    }

    /// Page through the catalog ordered by ID
    pub async fn list(&self, page: PageRequest) -> AppResult<(Vec<Book>, i64)> {
        let total = self.count().await?;

        let books = sqlx::query_as::<_, Book>(
            "SELECT * FROM books ORDER BY id LIMIT $1 OFFSET $2",
        )
        .bind(page.size)
        .bind(page.offset())
        .fetch_all(&self.pool)
        .await?;

        Ok((books, total))
    }

    /// Whole catalog ordered by ID
    pub async fn list_all(&self) -> AppResult<Vec<Book>> {
        let books = sqlx::query_as::<_, Book>("SELECT * FROM books ORDER BY id")
            .fetch_all(&self.pool)
            .await?;
        Ok(books)
    }

    pub async fn count(&self) -> AppResult<i64> {
        let count = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM books")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }
}

/// Load a book row with `FOR UPDATE` inside an open transaction
pub(crate) async fn lock(conn: &mut PgConnection, id: i64) -> AppResult<Book> {
    sqlx::query_as::<_, Book>("SELECT * FROM books WHERE id = $1 FOR UPDATE")
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?
        .ok_or_else(|| AppError::NotFound("Book not found".to_string()))
}

/// Write back the stock counters of a locked book
pub(crate) async fn save_stock(conn: &mut PgConnection, book: &Book) -> AppResult<()> {
    sqlx::query("UPDATE books SET total_copies = $1, available_copies = $2 WHERE id = $3")
        .bind(book.total_copies)
        .bind(book.available_copies)
        .bind(book.id)
        .execute(&mut *conn)
        .await?;
    Ok(())
}

fn duplicate_isbn(err: sqlx::Error, isbn: &str) -> AppError {
    if is_unique_violation(&err) {
        AppError::Conflict(format!("A book with ISBN {} already exists", isbn))
    } else {
        err.into()
    }
}
