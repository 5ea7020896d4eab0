//! Business logic services

pub mod auth;
pub mod borrows;
pub mod catalog;
pub mod email;
pub mod google;
pub mod storage;
pub mod users;

use crate::{config::AppConfig, error::AppResult, inventory::BorrowPolicy, repository::Repository};

/// Container for all services
#[derive(Clone)]
pub struct Services {
    pub auth: auth::AuthService,
    pub catalog: catalog::CatalogService,
    pub borrows: borrows::BorrowService,
    pub users: users::UsersService,
}

impl Services {
    /// Create all services with the given repository
    pub fn new(repository: Repository, config: &AppConfig) -> AppResult<Self> {
        let email = email::EmailService::new(config.email.clone(), config.auth.otp_expiry_minutes);
        let google = google::GoogleVerifier::new(config.auth.google_client_id.clone());
        let storage = storage::from_config(&config.storage)?;

        Ok(Self {
            auth: auth::AuthService::new(repository.clone(), config.auth.clone(), email, google),
            catalog: catalog::CatalogService::new(repository.clone(), storage),
            borrows: borrows::BorrowService::new(
                repository.clone(),
                BorrowPolicy::from(&config.borrowing),
            ),
            users: users::UsersService::new(repository),
        })
    }
}
