//! OpenAPI documentation

use axum::Router;
use utoipa::{
    openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
    Modify, OpenApi,
};
use utoipa_swagger_ui::SwaggerUi;

use crate::api::{auth, books, borrows, health, users};

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Bookaholic API",
        version = "1.0.0",
        description = "Library catalog, borrowing and member management REST API",
        license(name = "AGPL-3.0", url = "https://www.gnu.org/licenses/agpl-3.0.html")
    ),
    servers(
        (url = "/api", description = "API")
    ),
    paths(
        // Health
        health::health_check,
        health::readiness_check,
        // Auth
        auth::register,
        auth::authenticate,
        auth::google,
        auth::forgot_password,
        auth::reset_password,
        auth::verify_otp,
        auth::resend_otp,
        auth::me,
        // Books
        books::add_book,
        books::update_book,
        books::list_books,
        books::list_all_books,
        books::get_book,
        // Borrow
        borrows::borrow_book,
        borrows::return_book,
        borrows::my_history,
        borrows::my_history_all,
        borrows::all_records,
        borrows::all_records_unpaged,
        borrows::override_status,
        borrows::count_records,
        // Admin users
        users::list_users,
        users::count_users,
        users::get_user,
        users::update_user,
        users::user_records,
        users::update_record,
    ),
    components(
        schemas(
            // Auth
            crate::models::auth::RegisterRequest,
            crate::models::auth::LoginRequest,
            crate::models::auth::TokenResponse,
            crate::models::auth::GoogleLoginRequest,
            crate::models::auth::EmailRequest,
            crate::models::auth::ResetPasswordRequest,
            crate::models::auth::VerifyOtpRequest,
            crate::models::auth::MessageResponse,
            // Books
            crate::models::book::Book,
            books::AddBookForm,
            books::UpdateBookForm,
            crate::models::page::PagedBooks,
            // Borrow
            crate::models::borrow::BorrowRecordDetails,
            crate::models::borrow::UpdateBorrowRecord,
            crate::models::page::PagedBorrowRecords,
            // Users
            crate::models::user::UserResponse,
            crate::models::user::UpdateUser,
            crate::models::page::PagedUsers,
            // Enums
            crate::models::enums::Role,
            crate::models::enums::AuthProvider,
            crate::models::enums::BorrowStatus,
            // Health
            health::HealthResponse,
            // Errors
            crate::error::ErrorResponse,
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "health", description = "Health check endpoints"),
        (name = "auth", description = "Registration, login and account recovery"),
        (name = "books", description = "Catalog management"),
        (name = "borrow", description = "Borrowing and returns"),
        (name = "users", description = "Administration of members and records")
    )
)]
pub struct ApiDoc;

/// Registers the bearer JWT scheme referenced by secured paths
struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
        }
    }
}

/// Create the OpenAPI documentation router
pub fn create_openapi_router() -> Router {
    Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
}
