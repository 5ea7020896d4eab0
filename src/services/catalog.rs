//! Catalog service: books and their cover images

use std::sync::Arc;

use validator::Validate;

use crate::{
    error::{AppError, AppResult},
    inventory,
    models::{
        book::{Book, BookUpdate, ImageUpload, NewBook},
        page::{PageRequest, PagedResponse},
    },
    repository::Repository,
};

use super::storage::ImageStorage;

#[derive(Clone)]
pub struct CatalogService {
    repository: Repository,
    storage: Arc<dyn ImageStorage>,
}

impl CatalogService {
    pub fn new(repository: Repository, storage: Arc<dyn ImageStorage>) -> Self {
        Self {
            repository,
            storage,
        }
    }

    /// Add a book with all its copies on the shelf
    pub async fn add_book(&self, book: NewBook, image: ImageUpload) -> AppResult<Book> {
        book.validate()?;
        check_image(&image)?;

        if self.repository.books.isbn_exists(&book.isbn, None).await? {
            return Err(AppError::Conflict(format!(
                "A book with ISBN {} already exists",
                book.isbn
            )));
        }

        let image_url = self.storage.upload(image).await?;
        let created = self.repository.books.create(&book, Some(&image_url)).await?;

        tracing::info!("Added book {} ({} copies)", created.id, created.total_copies);
        Ok(created)
    }

    /// Update a book; the cover is replaced only when a new image is sent
    pub async fn update_book(
        &self,
        id: i64,
        fields: BookUpdate,
        image: Option<ImageUpload>,
    ) -> AppResult<Book> {
        fields.validate()?;

        // Fail fast before uploading anything
        let current = self.repository.books.get_by_id(id).await?;
        if self.repository.books.isbn_exists(&fields.isbn, Some(id)).await? {
            return Err(AppError::Conflict(format!(
                "A book with ISBN {} already exists",
                fields.isbn
            )));
        }

        let image_url = stage_cover(self.storage.as_ref(), &current, &fields, image).await?;

        let updated = self
            .repository
            .books
            .update(id, &fields, image_url.as_deref())
            .await?;

        tracing::info!(
            "Updated book {}: {} of {} copies available",
            updated.id,
            updated.available_copies,
            updated.total_copies
        );
        Ok(updated)
    }

    pub async fn get_book(&self, id: i64) -> AppResult<Book> {
        self.repository.books.get_by_id(id).await
    }

    pub async fn list_books(&self, page: PageRequest) -> AppResult<PagedResponse<Book>> {
        let (books, total) = self.repository.books.list(page).await?;
        Ok(PagedResponse::new(books, page, total))
    }

    pub async fn list_all_books(&self) -> AppResult<Vec<Book>> {
        self.repository.books.list_all().await
    }
}

/// Check the new stock level against `current`, then store the cover if one was sent.
/// The repository repeats the stock check under a row lock.
async fn stage_cover(
    storage: &dyn ImageStorage,
    current: &Book,
    fields: &BookUpdate,
    image: Option<ImageUpload>,
) -> AppResult<Option<String>> {
    inventory::resize(&mut current.clone(), fields.total_copies)?;

    match image {
        Some(image) => {
            check_image(&image)?;
            Ok(Some(storage.upload(image).await?))
        }
        None => Ok(None),
    }
}

fn check_image(image: &ImageUpload) -> AppResult<()> {
    if image.bytes.is_empty() {
        return Err(AppError::Validation("Image file is empty".to_string()));
    }
    match image.content_type.as_deref() {
        Some(ct) if !ct.starts_with("image/") => Err(AppError::Validation(format!(
            "Unsupported image content type: {}",
            ct
        ))),
        _ => Ok(()),
    }
}
