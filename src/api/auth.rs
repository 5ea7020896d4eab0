//! Authentication endpoints

use axum::{extract::State, http::StatusCode, Json};
use validator::Validate;

use crate::{
    error::AppResult,
    models::{
        auth::{
            EmailRequest, GoogleLoginRequest, LoginRequest, MessageResponse, RegisterRequest,
            ResetPasswordRequest, TokenResponse, VerifyOtpRequest,
        },
        user::UserResponse,
    },
    AppState,
};

use super::AuthenticatedUser;

/// Register a new account
#[utoipa::path(
    post,
    path = "/auth/register",
    tag = "auth",
    request_body = RegisterRequest,
    responses(
        (status = 201, description = "Account created, verification code sent", body = MessageResponse),
        (status = 400, description = "Invalid input", body = crate::error::ErrorResponse),
        (status = 403, description = "Invalid admin registration code", body = crate::error::ErrorResponse),
        (status = 409, description = "Email already registered", body = crate::error::ErrorResponse)
    )
)]
pub async fn register(
    State(state): State<AppState>,
    Json(request): Json<RegisterRequest>,
) -> AppResult<(StatusCode, Json<MessageResponse>)> {
    state.services.auth.register(request).await?;
    Ok((
        StatusCode::CREATED,
        Json(MessageResponse::new(
            "Registration successful! Please check your email for OTP.",
        )),
    ))
}

/// Login with email and password
#[utoipa::path(
    post,
    path = "/auth/authenticate",
    tag = "auth",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Login successful", body = TokenResponse),
        (status = 401, description = "Invalid credentials or email not verified", body = crate::error::ErrorResponse)
    )
)]
pub async fn authenticate(
    State(state): State<AppState>,
    Json(request): Json<LoginRequest>,
) -> AppResult<Json<TokenResponse>> {
    let token = state
        .services
        .auth
        .authenticate(&request.email, &request.password)
        .await?;
    Ok(Json(TokenResponse { token }))
}

/// Login with a Google ID token
#[utoipa::path(
    post,
    path = "/auth/google",
    tag = "auth",
    request_body = GoogleLoginRequest,
    responses(
        (status = 200, description = "Login successful", body = TokenResponse),
        (status = 401, description = "Invalid Google token", body = crate::error::ErrorResponse)
    )
)]
pub async fn google(
    State(state): State<AppState>,
    Json(request): Json<GoogleLoginRequest>,
) -> AppResult<Json<TokenResponse>> {
    let token = state.services.auth.authenticate_google(&request.token).await?;
    Ok(Json(TokenResponse { token }))
}

/// Request a password reset link
#[utoipa::path(
    post,
    path = "/auth/forgot-password",
    tag = "auth",
    request_body = EmailRequest,
    responses(
        (status = 200, description = "Reset link sent if the account exists", body = MessageResponse)
    )
)]
pub async fn forgot_password(
    State(state): State<AppState>,
    Json(request): Json<EmailRequest>,
) -> AppResult<Json<MessageResponse>> {
    state.services.auth.forgot_password(&request.email).await?;
    Ok(Json(MessageResponse::new(
        "If the email exists, a password reset link has been sent",
    )))
}

/// Set a new password with a reset token
#[utoipa::path(
    post,
    path = "/auth/reset-password",
    tag = "auth",
    request_body = ResetPasswordRequest,
    responses(
        (status = 200, description = "Password changed", body = MessageResponse),
        (status = 400, description = "Invalid or expired token", body = crate::error::ErrorResponse)
    )
)]
pub async fn reset_password(
    State(state): State<AppState>,
    Json(request): Json<ResetPasswordRequest>,
) -> AppResult<Json<MessageResponse>> {
    request.validate()?;
    state
        .services
        .auth
        .reset_password(&request.token, &request.new_password)
        .await?;
    Ok(Json(MessageResponse::new("Password has been reset successfully")))
}

/// Verify the email address with the emailed code
#[utoipa::path(
    post,
    path = "/auth/verify-otp",
    tag = "auth",
    request_body = VerifyOtpRequest,
    responses(
        (status = 200, description = "Email verified", body = MessageResponse),
        (status = 400, description = "Wrong or expired code", body = crate::error::ErrorResponse),
        (status = 404, description = "User not found", body = crate::error::ErrorResponse)
    )
)]
pub async fn verify_otp(
    State(state): State<AppState>,
    Json(request): Json<VerifyOtpRequest>,
) -> AppResult<Json<MessageResponse>> {
    state.services.auth.verify_otp(&request.email, &request.otp).await?;
    Ok(Json(MessageResponse::new("Email verified successfully")))
}

/// Send a fresh verification code
#[utoipa::path(
    post,
    path = "/auth/resend-otp",
    tag = "auth",
    request_body = EmailRequest,
    responses(
        (status = 200, description = "Code sent", body = MessageResponse),
        (status = 400, description = "Email already verified", body = crate::error::ErrorResponse),
        (status = 404, description = "User not found", body = crate::error::ErrorResponse)
    )
)]
pub async fn resend_otp(
    State(state): State<AppState>,
    Json(request): Json<EmailRequest>,
) -> AppResult<Json<MessageResponse>> {
    state.services.auth.resend_otp(&request.email).await?;
    Ok(Json(MessageResponse::new("OTP has been resent to your email")))
}

/// Get current user profile
#[utoipa::path(
    get,
    path = "/auth/me",
    tag = "auth",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Current user", body = UserResponse),
        (status = 401, description = "Not authenticated", body = crate::error::ErrorResponse)
    )
)]
pub async fn me(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
) -> AppResult<Json<UserResponse>> {
    let user = state.services.auth.me(&claims).await?;
    Ok(Json(user))
}
