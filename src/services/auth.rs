//! Authentication service: registration, login, email verification and
//! password recovery

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use chrono::{DateTime, Duration, Utc};
use rand::Rng;
use validator::Validate;

use crate::{
    config::AuthConfig,
    error::{AppError, AppResult},
    models::{
        auth::RegisterRequest,
        enums::{AuthProvider, Role},
        user::{NewUser, User, UserClaims, UserResponse},
    },
    repository::Repository,
};

use super::{email::EmailService, google::GoogleVerifier};

#[derive(Clone)]
pub struct AuthService {
    repository: Repository,
    config: AuthConfig,
    email: EmailService,
    google: GoogleVerifier,
}

impl AuthService {
    pub fn new(
        repository: Repository,
        config: AuthConfig,
        email: EmailService,
        google: GoogleVerifier,
    ) -> Self {
        Self {
            repository,
            config,
            email,
            google,
        }
    }

    /// Register a local account and email it a verification code
    pub async fn register(&self, request: RegisterRequest) -> AppResult<()> {
        request.validate()?;

        let role = request.role.unwrap_or_default();
        if role == Role::Admin
            && request.admin_code.as_deref() != Some(self.config.admin_registration_secret.as_str())
        {
            return Err(AppError::Authorization(
                "Invalid admin registration code".to_string(),
            ));
        }

        if self.repository.users.email_exists(&request.email).await? {
            return Err(AppError::Conflict("Email is already registered".to_string()));
        }

        let otp = generate_otp();
        let full_name = request.full_name();
        let user = self
            .repository
            .users
            .create(&NewUser {
                email: request.email.trim().to_string(),
                full_name: full_name.clone(),
                password: Some(hash_password(&request.password)?),
                role,
                auth_provider: AuthProvider::Local,
                is_verified: false,
                otp_code: Some(otp.clone()),
                otp_expiry: Some(Utc::now() + Duration::minutes(self.config.otp_expiry_minutes)),
            })
            .await?;

        tracing::info!("Registered user {} with role {}", user.id, user.role);

        // The account exists either way; the code can be resent
        if let Err(e) = self.email.send_otp_email(&user.email, &otp, &full_name).await {
            tracing::warn!("Failed to send verification code to {}: {}", user.email, e);
        }

        Ok(())
    }

    /// Check email and password and return a session token
    pub async fn authenticate(&self, email: &str, password: &str) -> AppResult<String> {
        let user = self
            .repository
            .users
            .find_by_email(email)
            .await?
            .ok_or_else(|| AppError::Authentication("Invalid email or password".to_string()))?;

        if !verify_password(&user, password)? {
            return Err(AppError::Authentication("Invalid email or password".to_string()));
        }

        if !user.is_verified {
            return Err(AppError::Authentication(
                "Email not verified. Please check your email for OTP.".to_string(),
            ));
        }

        self.create_token(&user)
    }

    /// Sign in with a Google ID token, provisioning a member account on first use
    pub async fn authenticate_google(&self, id_token: &str) -> AppResult<String> {
        let identity = self.google.verify(id_token).await?;

        let user = match self.repository.users.find_by_email(&identity.email).await? {
            Some(user) => user,
            None => {
                let full_name = identity.name.clone().unwrap_or_else(|| identity.email.clone());
                let user = self
                    .repository
                    .users
                    .create(&NewUser::google(identity.email.clone(), full_name))
                    .await?;
                tracing::info!("Provisioned Google account {}", user.id);
                user
            }
        };

        self.create_token(&user)
    }

    /// Email a reset link. Unknown addresses are ignored silently.
    pub async fn forgot_password(&self, email: &str) -> AppResult<()> {
        let Some(user) = self.repository.users.find_by_email(email).await? else {
            tracing::debug!("Password reset requested for unknown email");
            return Ok(());
        };

        let token = uuid::Uuid::new_v4().to_string();
        let expiry = Utc::now() + Duration::minutes(self.config.reset_token_expiry_minutes);
        self.repository.users.set_reset_token(user.id, &token, expiry).await?;

        self.email
            .send_password_reset_email(&user.email, &token)
            .await
            .map_err(|e| {
                tracing::error!("Failed to send password reset email to {}: {}", user.email, e);
                AppError::Internal("Failed to send password reset email".to_string())
            })
    }

    pub async fn reset_password(&self, token: &str, new_password: &str) -> AppResult<()> {
        let user = self
            .repository
            .users
            .find_by_reset_token(token)
            .await?
            .ok_or_else(|| AppError::Validation("Invalid or expired reset token".to_string()))?;

        if !not_expired(user.reset_token_expiry, Utc::now()) {
            return Err(AppError::Validation("Reset token has expired".to_string()));
        }

        let hash = hash_password(new_password)?;
        self.repository.users.reset_password(user.id, &hash).await?;
        tracing::info!("Password reset for user {}", user.id);
        Ok(())
    }

    /// Confirm the email address with the emailed code
    pub async fn verify_otp(&self, email: &str, otp: &str) -> AppResult<()> {
        let user = self.find_user(email).await?;
        if user.is_verified {
            return Ok(());
        }

        check_otp(&user, otp, Utc::now())?;
        self.repository.users.mark_verified(user.id).await?;
        tracing::info!("Email verified for user {}", user.id);
        Ok(())
    }

    pub async fn resend_otp(&self, email: &str) -> AppResult<()> {
        let user = self.find_user(email).await?;
        if user.is_verified {
            return Err(AppError::Validation("Email is already verified".to_string()));
        }

        let otp = generate_otp();
        let expiry = Utc::now() + Duration::minutes(self.config.otp_expiry_minutes);
        self.repository.users.set_otp(user.id, &otp, expiry).await?;

        self.email
            .send_otp_email(&user.email, &otp, &user.full_name)
            .await
            .map_err(|e| {
                tracing::error!("Failed to resend verification code to {}: {}", user.email, e);
                AppError::Internal("Failed to resend OTP email".to_string())
            })
    }

    /// Profile of the authenticated principal
    pub async fn me(&self, claims: &UserClaims) -> AppResult<UserResponse> {
        self.repository.users.get_response(claims.user_id).await
    }

    async fn find_user(&self, email: &str) -> AppResult<User> {
        self.repository
            .users
            .find_by_email(email)
            .await?
            .ok_or_else(|| AppError::NotFound("User not found".to_string()))
    }

    fn create_token(&self, user: &User) -> AppResult<String> {
        UserClaims::new(user, self.config.jwt_expiration_hours)
            .create_token(&self.config.jwt_secret)
            .map_err(|e| AppError::Internal(format!("Failed to create token: {}", e)))
    }
}

/// Six-digit numeric verification code
fn generate_otp() -> String {
    rand::thread_rng().gen_range(100_000..1_000_000).to_string()
}

fn not_expired(expiry: Option<DateTime<Utc>>, now: DateTime<Utc>) -> bool {
    expiry.is_some_and(|expiry| now <= expiry)
}

fn check_otp(user: &User, otp: &str, now: DateTime<Utc>) -> AppResult<()> {
    if user.otp_code.as_deref() != Some(otp.trim()) {
        return Err(AppError::Validation("Invalid OTP code".to_string()));
    }
    if !not_expired(user.otp_expiry, now) {
        return Err(AppError::Validation(
            "OTP has expired. Please request a new one.".to_string(),
        ));
    }
    Ok(())
}

/// Hash a password using Argon2
pub fn hash_password(password: &str) -> AppResult<String> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| AppError::Internal(format!("Failed to hash password: {}", e)))?;
    Ok(hash.to_string())
}

/// OAuth-only accounts have no password and never match
fn verify_password(user: &User, password: &str) -> AppResult<bool> {
    let Some(ref hash) = user.password else {
        return Ok(false);
    };
    let parsed_hash = PasswordHash::new(hash)
        .map_err(|_| AppError::Internal("Invalid password hash".to_string()))?;
    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .is_ok())
}
