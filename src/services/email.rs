//! Email service for verification codes and password reset links

use lettre::{
    message::{header::ContentType, Mailbox, Message, MultiPart, SinglePart},
    transport::smtp::authentication::Credentials,
    SmtpTransport, Transport,
};
use std::str::FromStr;

use crate::{
    config::EmailConfig,
    error::{AppError, AppResult},
};

#[derive(Clone)]
pub struct EmailService {
    config: EmailConfig,
    otp_expiry_minutes: i64,
}

impl EmailService {
    pub fn new(config: EmailConfig, otp_expiry_minutes: i64) -> Self {
        Self {
            config,
            otp_expiry_minutes,
        }
    }

    /// Link the web client opens to choose a new password
    pub fn reset_link(&self, token: &str) -> String {
        format!(
            "{}/reset-password?token={}",
            self.config.frontend_url.trim_end_matches('/'),
            token
        )
    }

    /// Send the email verification code
    pub async fn send_otp_email(&self, to: &str, otp: &str, name: &str) -> AppResult<()> {
        let subject = "Verify Your Email - Bookaholic Library";
        let body = format!(
            r#"
Hello {name},

Thank you for registering with Bookaholic Library. Your verification code is: {otp}

This code will expire in {minutes} minutes.

If you didn't create an account with Bookaholic, you can safely ignore this email.
"#,
            name = name,
            otp = otp,
            minutes = self.otp_expiry_minutes
        );

        self.send_email(to, subject, &body).await?;
        tracing::info!("Verification code sent to {}", to);
        Ok(())
    }

    /// Send a password reset link
    pub async fn send_password_reset_email(&self, to: &str, token: &str) -> AppResult<()> {
        let subject = "Password Reset Request - Bookaholic Library";
        let body = format!(
            r#"
We received a request to reset the password of your Bookaholic Library account.

Open the following link to choose a new password:
{link}

If you didn't request a password reset, you can safely ignore this email.
"#,
            link = self.reset_link(token)
        );

        self.send_email(to, subject, &body).await?;
        tracing::info!("Password reset link sent to {}", to);
        Ok(())
    }

    /// Generic email sending function
    async fn send_email(&self, to: &str, subject: &str, body: &str) -> AppResult<()> {
        let from_name = self
            .config
            .smtp_from_name
            .as_deref()
            .unwrap_or("Bookaholic");
        let from_mailbox = Mailbox::from_str(&format!("{} <{}>", from_name, self.config.smtp_from))
            .map_err(|e| AppError::Internal(format!("Invalid from address: {}", e)))?;

        let to_mailbox = Mailbox::from_str(to)
            .map_err(|e| AppError::Internal(format!("Invalid to address: {}", e)))?;

        let email = Message::builder()
            .from(from_mailbox)
            .to(to_mailbox)
            .subject(subject)
            .multipart(
                MultiPart::alternative()
                    .singlepart(
                        SinglePart::builder()
                            .header(ContentType::TEXT_PLAIN)
                            .body(body.to_string()),
                    )
                    .singlepart(
                        SinglePart::builder()
                            .header(ContentType::TEXT_HTML)
                            .body(format!(
                                r#"<html><body><pre>{}</pre></body></html>"#,
                                body.replace('\n', "<br>")
                            )),
                    ),
            )
            .map_err(|e| AppError::Internal(format!("Failed to build email: {}", e)))?;

        let mailer = self.mailer()?;

        // SmtpTransport blocks on network I/O
        tokio::task::spawn_blocking(move || mailer.send(&email))
            .await
            .map_err(|e| AppError::Internal(format!("Email task failed: {}", e)))?
            .map_err(|e| AppError::Internal(format!("Failed to send email: {}", e)))?;

        Ok(())
    }

    fn mailer(&self) -> AppResult<SmtpTransport> {
        let mailer_builder = if self.config.smtp_use_tls {
            SmtpTransport::starttls_relay(&self.config.smtp_host)
                .map_err(|e| AppError::Internal(format!("Failed to create SMTP transport: {}", e)))?
        } else {
            SmtpTransport::builder_dangerous(&self.config.smtp_host)
        }
        .port(self.config.smtp_port);

        let mailer_builder = if let (Some(username), Some(password)) = (
            &self.config.smtp_username,
            &self.config.smtp_password,
        ) {
            mailer_builder.credentials(Credentials::new(username.clone(), password.clone()))
        } else {
            mailer_builder
        };

        Ok(mailer_builder.build())
    }
}
