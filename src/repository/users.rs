//! Users repository for database operations

use chrono::{DateTime, Utc};
use sqlx::{Pool, Postgres};

use crate::{
    error::{AppError, AppResult},
    models::{
        enums::Role,
        page::PageRequest,
        user::{NewUser, UpdateUser, User, UserResponse},
    },
};

use super::is_unique_violation;

/// Projection shared by every `UserResponse` query
const USER_RESPONSE_SELECT: &str = r#"
    SELECT u.id, u.email, u.full_name, u.role, u.auth_provider, u.is_verified,
           (SELECT COUNT(*) FROM borrow_records b
             WHERE b.user_id = u.id AND b.status = 'BORROWED') AS active_borrows
    FROM users u
"#;

#[derive(Clone)]
pub struct UsersRepository {
    pool: Pool<Postgres>,
}

impl UsersRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    // =========================================================================
    // READ
    // =========================================================================

    /// Get user by ID
    pub async fn get_by_id(&self, id: i64) -> AppResult<User> {
        sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound("User not found".to_string()))
    }

    /// Find user by email, case-insensitively
    pub async fn find_by_email(&self, email: &str) -> AppResult<Option<User>> {
        let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE LOWER(email) = LOWER($1)")
            .bind(email)
            .fetch_optional(&self.pool)
            .await?;
        Ok(user)
    }

    pub async fn find_by_reset_token(&self, token: &str) -> AppResult<Option<User>> {
        let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE reset_password_token = $1")
            .bind(token)
            .fetch_optional(&self.pool)
            .await?;
        Ok(user)
    }

    pub async fn email_exists(&self, email: &str) -> AppResult<bool> {
        let exists = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM users WHERE LOWER(email) = LOWER($1))",
        )
        .bind(email)
        .fetch_one(&self.pool)
        .await?;
        Ok(exists)
    }

    /// Get the API view of a user with its active borrow count
    pub async fn get_response(&self, id: i64) -> AppResult<UserResponse> {
        let query = format!("{} WHERE u.id = $1", USER_RESPONSE_SELECT);
        sqlx::query_as::<_, UserResponse>(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound("User not found".to_string()))
    }

    /// Page through users, optionally filtered by role
    pub async fn list(
        &self,
        page: PageRequest,
        role: Option<Role>,
    ) -> AppResult<(Vec<UserResponse>, i64)> {
        let total = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM users WHERE ($1::TEXT IS NULL OR role = $1)",
        )
        .bind(role)
        .fetch_one(&self.pool)
        .await?;

        let query = format!(
            "{} WHERE ($1::TEXT IS NULL OR u.role = $1) ORDER BY u.id LIMIT $2 OFFSET $3",
            USER_RESPONSE_SELECT
        );
        let users = sqlx::query_as::<_, UserResponse>(&query)
            .bind(role)
            .bind(page.size)
            .bind(page.offset())
            .fetch_all(&self.pool)
            .await?;

        Ok((users, total))
    }

    pub async fn count(&self) -> AppResult<i64> {
        let count = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM users")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    // =========================================================================
    // WRITE
    // =========================================================================

    /// Create a new user
    pub async fn create(&self, user: &NewUser) -> AppResult<User> {
        sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (
                email, full_name, password, role, auth_provider,
                is_verified, otp_code, otp_expiry
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING *
            "#,
        )
        .bind(&user.email)
        .bind(&user.full_name)
        .bind(&user.password)
        .bind(user.role)
        .bind(user.auth_provider)
        .bind(user.is_verified)
        .bind(&user.otp_code)
        .bind(user.otp_expiry)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                AppError::Conflict("Email is already registered".to_string())
            } else {
                e.into()
            }
        })
    }

    /// Admin partial update; absent fields keep their value
    pub async fn update(&self, id: i64, update: &UpdateUser) -> AppResult<()> {
        let result = sqlx::query(
            r#"
            UPDATE users
            SET full_name = COALESCE($1, full_name),
                role = COALESCE($2, role),
                is_verified = COALESCE($3, is_verified)
            WHERE id = $4
            "#,
        )
        .bind(&update.full_name)
        .bind(update.role)
        .bind(update.is_verified)
        .bind(id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound("User not found".to_string()));
        }
        Ok(())
    }

    /// Store a fresh one-time code
    pub async fn set_otp(&self, id: i64, code: &str, expiry: DateTime<Utc>) -> AppResult<()> {
        sqlx::query("UPDATE users SET otp_code = $1, otp_expiry = $2 WHERE id = $3")
            .bind(code)
            .bind(expiry)
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    /// Mark the email verified and consume the one-time code
    pub async fn mark_verified(&self, id: i64) -> AppResult<()> {
        sqlx::query(
            "UPDATE users SET is_verified = TRUE, otp_code = NULL, otp_expiry = NULL WHERE id = $1",
        )
        .bind(id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn set_reset_token(&self, id: i64, token: &str, expiry: DateTime<Utc>) -> AppResult<()> {
        sqlx::query(
            "UPDATE users SET reset_password_token = $1, reset_token_expiry = $2 WHERE id = $3",
        )
        .bind(token)
        .bind(expiry)
        .bind(id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Replace the password hash and consume the reset token
    pub async fn reset_password(&self, id: i64, password_hash: &str) -> AppResult<()> {
        sqlx::query(
            r#"
            UPDATE users
            SET password = $1, reset_password_token = NULL, reset_token_expiry = NULL
            WHERE id = $2
            "#,
        )
        .bind(password_hash)
        .bind(id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}
