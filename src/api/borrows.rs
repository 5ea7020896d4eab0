//! Borrow endpoints

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};

use crate::{
    error::AppResult,
    models::{
        borrow::{BorrowQuery, BorrowRecordDetails, OverrideQuery},
        page::{PageRequest, PagedBorrowRecords, PagedResponse},
    },
    AppState,
};

use super::AuthenticatedUser;

/// Borrow one copy of a book
#[utoipa::path(
    post,
    path = "/borrow/{book_id}",
    tag = "borrow",
    security(("bearer_auth" = [])),
    params(("book_id" = i64, Path, description = "Book ID")),
    responses(
        (status = 201, description = "Book borrowed", body = BorrowRecordDetails),
        (status = 404, description = "Book not found", body = crate::error::ErrorResponse),
        (status = 409, description = "No copy available", body = crate::error::ErrorResponse),
        (status = 422, description = "Borrowing limit reached", body = crate::error::ErrorResponse)
    )
)]
pub async fn borrow_book(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(book_id): Path<i64>,
) -> AppResult<(StatusCode, Json<BorrowRecordDetails>)> {
    claims.require_member()?;

    let record = state.services.borrows.borrow(&claims, book_id).await?;
    Ok((StatusCode::CREATED, Json(record)))
}

/// Return a borrowed book
#[utoipa::path(
    put,
    path = "/borrow/return/{record_id}",
    tag = "borrow",
    security(("bearer_auth" = [])),
    params(("record_id" = i64, Path, description = "Borrow record ID")),
    responses(
        (status = 200, description = "Book returned", body = BorrowRecordDetails),
        (status = 403, description = "Record belongs to another user", body = crate::error::ErrorResponse),
        (status = 404, description = "Record not found", body = crate::error::ErrorResponse),
        (status = 409, description = "Already returned", body = crate::error::ErrorResponse)
    )
)]
pub async fn return_book(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(record_id): Path<i64>,
) -> AppResult<Json<BorrowRecordDetails>> {
    claims.require_member()?;

    let record = state.services.borrows.return_book(&claims, record_id).await?;
    Ok(Json(record))
}

/// Borrow history of the current user, paginated
#[utoipa::path(
    get,
    path = "/borrow/my-history",
    tag = "borrow",
    security(("bearer_auth" = [])),
    params(BorrowQuery),
    responses(
        (status = 200, description = "Page of records", body = PagedBorrowRecords)
    )
)]
pub async fn my_history(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Query(query): Query<BorrowQuery>,
) -> AppResult<Json<PagedResponse<BorrowRecordDetails>>> {
    claims.require_member()?;

    let page = PageRequest::new(query.page, query.size)?;
    let records = state
        .services
        .borrows
        .my_history(&claims, page, query.status)
        .await?;
    Ok(Json(records))
}

/// Full borrow history of the current user
#[utoipa::path(
    get,
    path = "/borrow/my-history/all",
    tag = "borrow",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "All records of the user", body = Vec<BorrowRecordDetails>)
    )
)]
pub async fn my_history_all(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
) -> AppResult<Json<Vec<BorrowRecordDetails>>> {
    claims.require_member()?;

    let records = state.services.borrows.my_history_all(&claims).await?;
    Ok(Json(records))
}

/// Every borrow record, paginated
#[utoipa::path(
    get,
    path = "/borrow/all",
    tag = "borrow",
    security(("bearer_auth" = [])),
    params(BorrowQuery),
    responses(
        (status = 200, description = "Page of records", body = PagedBorrowRecords),
        (status = 403, description = "Administrator required", body = crate::error::ErrorResponse)
    )
)]
pub async fn all_records(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Query(query): Query<BorrowQuery>,
) -> AppResult<Json<PagedResponse<BorrowRecordDetails>>> {
    claims.require_admin()?;

    let page = PageRequest::new(query.page, query.size)?;
    let records = state.services.borrows.all_records(page, query.status).await?;
    Ok(Json(records))
}

/// Every borrow record
#[utoipa::path(
    get,
    path = "/borrow/all/records",
    tag = "borrow",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "All records", body = Vec<BorrowRecordDetails>),
        (status = 403, description = "Administrator required", body = crate::error::ErrorResponse)
    )
)]
pub async fn all_records_unpaged(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
) -> AppResult<Json<Vec<BorrowRecordDetails>>> {
    claims.require_admin()?;

    let records = state.services.borrows.all_records_unpaged().await?;
    Ok(Json(records))
}

/// Force the status of a record
#[utoipa::path(
    put,
    path = "/borrow/admin/override/{record_id}",
    tag = "borrow",
    security(("bearer_auth" = [])),
    params(
        ("record_id" = i64, Path, description = "Borrow record ID"),
        OverrideQuery
    ),
    responses(
        (status = 200, description = "Status overridden", body = BorrowRecordDetails),
        (status = 404, description = "Record not found", body = crate::error::ErrorResponse),
        (status = 409, description = "No copy available to re-borrow", body = crate::error::ErrorResponse)
    )
)]
pub async fn override_status(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(record_id): Path<i64>,
    Query(query): Query<OverrideQuery>,
) -> AppResult<Json<BorrowRecordDetails>> {
    claims.require_admin()?;

    let record = state
        .services
        .borrows
        .override_status(record_id, query.status)
        .await?;
    Ok(Json(record))
}

/// Number of borrow records
#[utoipa::path(
    get,
    path = "/borrow/count",
    tag = "borrow",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Record count", body = i64),
        (status = 403, description = "Administrator required", body = crate::error::ErrorResponse)
    )
)]
pub async fn count_records(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
) -> AppResult<Json<i64>> {
    claims.require_admin()?;

    let count = state.services.borrows.count().await?;
    Ok(Json(count))
}
