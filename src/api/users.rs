//! Admin user management endpoints

use axum::{
    extract::{Path, Query, State},
    Json,
};

use crate::{
    error::AppResult,
    models::{
        borrow::{BorrowRecordDetails, UpdateBorrowRecord},
        page::{PageRequest, PagedBorrowRecords, PagedResponse, PagedUsers},
        user::{UpdateUser, UserQuery, UserResponse},
    },
    AppState,
};

use super::{books::PageQuery, AuthenticatedUser};

/// List users with their active borrow counts
#[utoipa::path(
    get,
    path = "/admin/users",
    tag = "users",
    security(("bearer_auth" = [])),
    params(UserQuery),
    responses(
        (status = 200, description = "Page of users", body = PagedUsers),
        (status = 403, description = "Administrator required", body = crate::error::ErrorResponse)
    )
)]
pub async fn list_users(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Query(query): Query<UserQuery>,
) -> AppResult<Json<PagedResponse<UserResponse>>> {
    claims.require_admin()?;

    let page = PageRequest::new(query.page, query.size)?;
    let users = state.services.users.list_users(page, query.role).await?;
    Ok(Json(users))
}

/// Number of registered users
#[utoipa::path(
    get,
    path = "/admin/users/count",
    tag = "users",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "User count", body = i64)
    )
)]
pub async fn count_users(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
) -> AppResult<Json<i64>> {
    claims.require_admin()?;

    let count = state.services.users.count().await?;
    Ok(Json(count))
}

/// Get user details by ID
#[utoipa::path(
    get,
    path = "/admin/users/{id}",
    tag = "users",
    security(("bearer_auth" = [])),
    params(("id" = i64, Path, description = "User ID")),
    responses(
        (status = 200, description = "User details", body = UserResponse),
        (status = 404, description = "User not found", body = crate::error::ErrorResponse)
    )
)]
pub async fn get_user(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<i64>,
) -> AppResult<Json<UserResponse>> {
    claims.require_admin()?;

    let user = state.services.users.get_user(id).await?;
    Ok(Json(user))
}

/// Update name, role or verification flag of a user
#[utoipa::path(
    put,
    path = "/admin/users/{id}",
    tag = "users",
    security(("bearer_auth" = [])),
    params(("id" = i64, Path, description = "User ID")),
    request_body = UpdateUser,
    responses(
        (status = 200, description = "User updated", body = UserResponse),
        (status = 404, description = "User not found", body = crate::error::ErrorResponse)
    )
)]
pub async fn update_user(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<i64>,
    Json(update): Json<UpdateUser>,
) -> AppResult<Json<UserResponse>> {
    claims.require_admin()?;

    let user = state.services.users.update_user(id, update).await?;
    Ok(Json(user))
}

/// Borrow records of one user, paginated
#[utoipa::path(
    get,
    path = "/admin/users/{id}/records",
    tag = "users",
    security(("bearer_auth" = [])),
    params(
        ("id" = i64, Path, description = "User ID"),
        PageQuery
    ),
    responses(
        (status = 200, description = "Page of records", body = PagedBorrowRecords),
        (status = 404, description = "User not found", body = crate::error::ErrorResponse)
    )
)]
pub async fn user_records(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<i64>,
    Query(query): Query<PageQuery>,
) -> AppResult<Json<PagedResponse<BorrowRecordDetails>>> {
    claims.require_admin()?;

    let page = PageRequest::new(query.page, query.size)?;
    let records = state.services.borrows.user_records(id, page).await?;
    Ok(Json(records))
}

/// Edit status and due date of a borrow record
#[utoipa::path(
    put,
    path = "/admin/users/records/{record_id}",
    tag = "users",
    security(("bearer_auth" = [])),
    params(("record_id" = i64, Path, description = "Borrow record ID")),
    request_body = UpdateBorrowRecord,
    responses(
        (status = 200, description = "Record updated", body = BorrowRecordDetails),
        (status = 404, description = "Record not found", body = crate::error::ErrorResponse),
        (status = 409, description = "No copy available to re-borrow", body = crate::error::ErrorResponse)
    )
)]
pub async fn update_record(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(record_id): Path<i64>,
    Json(update): Json<UpdateBorrowRecord>,
) -> AppResult<Json<BorrowRecordDetails>> {
    claims.require_admin()?;

    let record = state.services.borrows.update_record(record_id, update).await?;
    Ok(Json(record))
}
