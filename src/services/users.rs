//! Admin user management service

use validator::Validate;

use crate::{
    error::AppResult,
    models::{
        enums::Role,
        page::{PageRequest, PagedResponse},
        user::{UpdateUser, UserResponse},
    },
    repository::Repository,
};

#[derive(Clone)]
pub struct UsersService {
    repository: Repository,
}

impl UsersService {
    pub fn new(repository: Repository) -> Self {
        Self { repository }
    }

    /// List users with their active borrow counts
    pub async fn list_users(
        &self,
        page: PageRequest,
        role: Option<Role>,
    ) -> AppResult<PagedResponse<UserResponse>> {
        let (users, total) = self.repository.users.list(page, role).await?;
        Ok(PagedResponse::new(users, page, total))
    }

    pub async fn count(&self) -> AppResult<i64> {
        self.repository.users.count().await
    }

    pub async fn get_user(&self, id: i64) -> AppResult<UserResponse> {
        self.repository.users.get_response(id).await
    }

    /// Partial update of name, role and verification flag
    pub async fn update_user(&self, id: i64, update: UpdateUser) -> AppResult<UserResponse> {
        update.validate()?;
        self.repository.users.update(id, &update).await?;
        tracing::info!("Updated user {}", id);
        self.repository.users.get_response(id).await
    }
}
