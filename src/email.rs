//! Password-reset email delivery.
//!
//! SMTP settings come from the environment. When none are configured the
//! mailer runs in mock mode: the reset link is logged instead of sent, and
//! callers surface it directly in the response for local use.

use lettre::message::header::ContentType;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};

use crate::error::ApiError;

/// SMTP configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct MailConfig {
    pub smtp_host: Option<String>,
    pub smtp_port: u16,
    pub smtp_user: Option<String>,
    pub smtp_pass: Option<String>,
    pub from_address: String,
}

impl MailConfig {
    /// Load configuration from `EMAIL_HOST` / `EMAIL_PORT` / `EMAIL_USER` /
    /// `EMAIL_PASS`. Any missing credential leaves the mailer in mock mode.
    pub fn from_env() -> Self {
        let smtp_user = std::env::var("EMAIL_USER").ok();
        Self {
            smtp_host: std::env::var("EMAIL_HOST").ok(),
            smtp_port: std::env::var("EMAIL_PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(587),
            smtp_pass: std::env::var("EMAIL_PASS").ok(),
            from_address: smtp_user
                .clone()
                .unwrap_or_else(|| "noreply@townsquare.local".to_string()),
            smtp_user,
        }
    }
}

/// Outbound mailer — real SMTP transport or a logging mock.
#[derive(Clone)]
pub enum Mailer {
    Smtp {
        transport: AsyncSmtpTransport<Tokio1Executor>,
        from: String,
    },
    Mock,
}

impl Mailer {
    /// Build a mailer from config. Falls back to mock mode (with a warning)
    /// when host or credentials are missing or the transport can't be built.
    pub fn from_config(config: &MailConfig) -> Self {
        let (host, user, pass) = match (&config.smtp_host, &config.smtp_user, &config.smtp_pass) {
            (Some(h), Some(u), Some(p)) => (h, u, p),
            _ => {
                tracing::warn!(
                    "Email configuration not found. Password reset links will be logged only."
                );
                return Mailer::Mock;
            }
        };

        match AsyncSmtpTransport::<Tokio1Executor>::relay(host) {
            Ok(builder) => Mailer::Smtp {
                transport: builder
                    .port(config.smtp_port)
                    .credentials(Credentials::new(user.clone(), pass.clone()))
                    .build(),
                from: config.from_address.clone(),
            },
            Err(e) => {
                tracing::error!(error = %e, host = %host, "Failed to build SMTP transport, using mock mailer");
                Mailer::Mock
            }
        }
    }

    /// Whether this mailer only logs instead of sending.
    pub fn is_mock(&self) -> bool {
        matches!(self, Mailer::Mock)
    }

    /// Send the password-reset email. In mock mode the link is logged and
    /// the call succeeds.
    pub async fn send_password_reset(
        &self,
        to: &str,
        name: &str,
        reset_url: &str,
    ) -> Result<(), ApiError> {
        match self {
            Mailer::Mock => {
                tracing::info!(to, reset_url, "Password reset email (mock)");
                Ok(())
            }
            Mailer::Smtp { transport, from } => {
                let body = format!(
                    "Hello {name},\n\n\
                     You requested to reset your password for your Townsquare account.\n\n\
                     Open the link below to reset your password:\n{reset_url}\n\n\
                     This link will expire in 1 hour.\n\n\
                     If you didn't request this password reset, please ignore this email. \
                     Your password will remain unchanged.\n"
                );

                let message = Message::builder()
                    .from(
                        format!("Townsquare <{from}>")
                            .parse()
                            .map_err(|e| ApiError::Internal(format!("Invalid from address: {e}")))?,
                    )
                    .to(to
                        .parse()
                        .map_err(|e| ApiError::Internal(format!("Invalid recipient: {e}")))?)
                    .subject("Password Reset Request - Townsquare")
                    .header(ContentType::TEXT_PLAIN)
                    .body(body)
                    .map_err(|e| ApiError::Internal(format!("Failed to build email: {e}")))?;

                transport
                    .send(message)
                    .await
                    .map_err(|e| ApiError::Internal(format!("Failed to send email: {e}")))?;

                Ok(())
            }
        }
    }
}
