//! API handlers for Bookaholic REST endpoints

pub mod auth;
pub mod books;
pub mod borrows;
pub mod health;
pub mod openapi;
pub mod users;

use axum::{
    async_trait,
    extract::{DefaultBodyLimit, FromRequestParts},
    http::{header::AUTHORIZATION, request::Parts},
    routing::{get, post, put},
    Router,
};
use tower_governor::{
    governor::GovernorConfigBuilder, key_extractor::SmartIpKeyExtractor, GovernorLayer,
};
use tower_http::{
    cors::{Any, CorsLayer},
    services::ServeDir,
    trace::TraceLayer,
};

use crate::{config::StorageProvider, error::AppError, models::user::UserClaims, AppState};

/// Largest accepted multipart body for book forms
const MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;

/// Extractor for authenticated user from JWT token
pub struct AuthenticatedUser(pub UserClaims);

#[async_trait]
impl FromRequestParts<AppState> for AuthenticatedUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let auth_header = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .ok_or_else(|| AppError::Authentication("Missing authorization header".to_string()))?;

        let token = auth_header
            .strip_prefix("Bearer ")
            .ok_or_else(|| AppError::Authentication("Invalid authorization header format".to_string()))?;

        let claims = UserClaims::from_token(token, &state.config.auth.jwt_secret)
            .map_err(|e| AppError::Authentication(e.to_string()))?;

        Ok(AuthenticatedUser(claims))
    }
}

/// Build the application router with all routes
pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let mut auth_routes = Router::new()
        .route("/register", post(auth::register))
        .route("/authenticate", post(auth::authenticate))
        .route("/google", post(auth::google))
        .route("/forgot-password", post(auth::forgot_password))
        .route("/reset-password", post(auth::reset_password))
        .route("/verify-otp", post(auth::verify_otp))
        .route("/resend-otp", post(auth::resend_otp))
        .route("/me", get(auth::me));

    let server = &state.config.server;
    if let Some(per_second) = server.auth_rate_limit_per_second {
        // The governor is configured with the replenish interval
        let governor = 1000u64.checked_div(per_second).and_then(|interval_ms| {
            GovernorConfigBuilder::default()
                .key_extractor(SmartIpKeyExtractor)
                .per_millisecond(interval_ms.max(1))
                .burst_size(server.auth_rate_limit_burst)
                .finish()
        });
        match governor {
            Some(config) => {
                // tower_governor 0.3 layers borrow a `&'static` config; one leak per router build
                auth_routes = auth_routes.layer(GovernorLayer {
                    config: Box::leak(Box::new(config)),
                });
            }
            None => tracing::warn!("Invalid auth rate limit settings, rate limiting disabled"),
        }
    }

    let book_routes = Router::new()
        .route("/", get(books::list_books).post(books::add_book))
        .route("/all", get(books::list_all_books))
        .route("/:id", get(books::get_book).put(books::update_book))
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES));

    let borrow_routes = Router::new()
        .route("/:book_id", post(borrows::borrow_book))
        .route("/return/:record_id", put(borrows::return_book))
        .route("/my-history", get(borrows::my_history))
        .route("/my-history/all", get(borrows::my_history_all))
        .route("/all", get(borrows::all_records))
        .route("/all/records", get(borrows::all_records_unpaged))
        .route("/admin/override/:record_id", put(borrows::override_status))
        .route("/count", get(borrows::count_records));

    let admin_user_routes = Router::new()
        .route("/", get(users::list_users))
        .route("/count", get(users::count_users))
        .route("/:id", get(users::get_user).put(users::update_user))
        .route("/:id/records", get(users::user_records))
        .route("/records/:record_id", put(users::update_record));

    let api = Router::new()
        .route("/health", get(health::health_check))
        .route("/ready", get(health::readiness_check))
        .nest("/auth", auth_routes)
        .nest("/books", book_routes)
        .nest("/borrow", borrow_routes)
        .nest("/admin/users", admin_user_routes);

    let mut app = Router::new().nest("/api", api);

    let storage = &state.config.storage;
    if storage.provider == StorageProvider::Local {
        app = app.nest_service("/uploads", ServeDir::new(&storage.local_directory));
    }

    app.with_state(state)
        .merge(openapi::create_openapi_router())
        .layer(TraceLayer::new_for_http())
        .layer(cors)
}
