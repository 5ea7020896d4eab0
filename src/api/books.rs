//! Catalog endpoints

use std::collections::HashMap;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use axum_extra::extract::{multipart::MultipartError, Multipart};
use serde::Deserialize;
use utoipa::{IntoParams, ToSchema};

use crate::{
    error::{AppError, AppResult},
    models::{
        book::{Book, BookUpdate, ImageUpload, NewBook},
        page::{PageRequest, PagedBooks, PagedResponse},
    },
    AppState,
};

use super::AuthenticatedUser;

/// Page selection
#[derive(Debug, Deserialize, IntoParams)]
pub struct PageQuery {
    /// Zero-based page index
    pub page: Option<i64>,
    /// Page size (1 to 100)
    pub size: Option<i64>,
}

/// Multipart form for a new book
#[allow(dead_code)]
#[derive(Deserialize, ToSchema)]
pub struct AddBookForm {
    pub title: String,
    pub author: String,
    pub isbn: String,
    pub copies: i32,
    #[schema(value_type = String, format = Binary)]
    pub image: Vec<u8>,
}

/// Multipart form for a book update
#[allow(dead_code)]
#[derive(Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateBookForm {
    pub title: String,
    pub author: String,
    pub isbn: String,
    pub total_copies: i32,
    #[schema(value_type = Option<String>, format = Binary)]
    pub image: Option<Vec<u8>>,
}

/// Text fields and optional image read from a multipart body
struct BookForm {
    fields: HashMap<String, String>,
    image: Option<ImageUpload>,
}

impl BookForm {
    async fn read(mut multipart: Multipart) -> AppResult<Self> {
        let mut fields = HashMap::new();
        let mut image = None;

        while let Some(field) = multipart.next_field().await.map_err(invalid_form)? {
            let name = field.name().unwrap_or_default().to_string();
            if name == "image" {
                let file_name = field.file_name().map(str::to_string);
                let content_type = field.content_type().map(str::to_string);
                let bytes = field.bytes().await.map_err(invalid_form)?;
                // Browsers send an empty part when no file is chosen
                if !bytes.is_empty() {
                    image = Some(ImageUpload {
                        file_name,
                        content_type,
                        bytes: bytes.to_vec(),
                    });
                }
            } else {
                let value = field.text().await.map_err(invalid_form)?;
                fields.insert(name, value);
            }
        }

        Ok(Self { fields, image })
    }

    fn text(&self, name: &str) -> AppResult<String> {
        self.fields
            .get(name)
            .map(|value| value.trim().to_string())
            .ok_or_else(|| AppError::Validation(format!("{} is required", name)))
    }

    fn number(&self, name: &str) -> AppResult<i32> {
        self.text(name)?
            .parse()
            .map_err(|_| AppError::Validation(format!("{} must be a whole number", name)))
    }
}

fn invalid_form(e: MultipartError) -> AppError {
    AppError::BadRequest(format!("Invalid multipart body: {}", e))
}

/// Add a book to the catalog
#[utoipa::path(
    post,
    path = "/books",
    tag = "books",
    security(("bearer_auth" = [])),
    request_body(content = AddBookForm, content_type = "multipart/form-data"),
    responses(
        (status = 201, description = "Book added", body = Book),
        (status = 400, description = "Invalid input", body = crate::error::ErrorResponse),
        (status = 403, description = "Administrator required", body = crate::error::ErrorResponse),
        (status = 409, description = "ISBN already exists", body = crate::error::ErrorResponse)
    )
)]
pub async fn add_book(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    multipart: Multipart,
) -> AppResult<(StatusCode, Json<Book>)> {
    claims.require_admin()?;

    let form = BookForm::read(multipart).await?;
    let book = NewBook {
        title: form.text("title")?,
        author: form.text("author")?,
        isbn: form.text("isbn")?,
        copies: form.number("copies")?,
    };
    let image = form
        .image
        .ok_or_else(|| AppError::Validation("Cover image is required".to_string()))?;

    let created = state.services.catalog.add_book(book, image).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

/// Update a book; stock follows the new total
#[utoipa::path(
    put,
    path = "/books/{id}",
    tag = "books",
    security(("bearer_auth" = [])),
    params(("id" = i64, Path, description = "Book ID")),
    request_body(content = UpdateBookForm, content_type = "multipart/form-data"),
    responses(
        (status = 200, description = "Book updated", body = Book),
        (status = 404, description = "Book not found", body = crate::error::ErrorResponse),
        (status = 409, description = "Total below copies on loan, or ISBN taken", body = crate::error::ErrorResponse)
    )
)]
pub async fn update_book(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<i64>,
    multipart: Multipart,
) -> AppResult<Json<Book>> {
    claims.require_admin()?;

    let form = BookForm::read(multipart).await?;
    let fields = BookUpdate {
        title: form.text("title")?,
        author: form.text("author")?,
        isbn: form.text("isbn")?,
        total_copies: form.number("totalCopies")?,
    };

    let updated = state.services.catalog.update_book(id, fields, form.image).await?;
    Ok(Json(updated))
}

/// List books, paginated
#[utoipa::path(
    get,
    path = "/books",
    tag = "books",
    params(PageQuery),
    responses(
        (status = 200, description = "Page of books", body = PagedBooks)
    )
)]
pub async fn list_books(
    State(state): State<AppState>,
    Query(query): Query<PageQuery>,
) -> AppResult<Json<PagedResponse<Book>>> {
    let page = PageRequest::new(query.page, query.size)?;
    let books = state.services.catalog.list_books(page).await?;
    Ok(Json(books))
}

/// List every book
#[utoipa::path(
    get,
    path = "/books/all",
    tag = "books",
    responses(
        (status = 200, description = "All books", body = Vec<Book>)
    )
)]
pub async fn list_all_books(State(state): State<AppState>) -> AppResult<Json<Vec<Book>>> {
    let books = state.services.catalog.list_all_books().await?;
    Ok(Json(books))
}

/// Get book details by ID
#[utoipa::path(
    get,
    path = "/books/{id}",
    tag = "books",
    params(("id" = i64, Path, description = "Book ID")),
    responses(
        (status = 200, description = "Book details", body = Book),
        (status = 404, description = "Book not found", body = crate::error::ErrorResponse)
    )
)]
pub async fn get_book(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> AppResult<Json<Book>> {
    let book = state.services.catalog.get_book(id).await?;
    Ok(Json(book))
}
