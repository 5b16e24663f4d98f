//! Email service for verification and password-reset messages
//!
//! Mail failures are logged and swallowed by callers on the forgot-password
//! path so the endpoint stays non-enumerating.

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
}

impl EmailService {
    pub fn new(config: EmailConfig) -> Self {
        Self { config }
    }

    /// Send the email-verification link. The raw token appears only here;
    /// the database holds its digest.
    pub async fn send_verification(&self, to: &str, token: &str) -> AppResult<()> {
        let subject = "Verify your OpenShelf email address";
        let body = format!(
            r#"
Welcome to OpenShelf!

Please verify your email address by opening the link below:

{base}/api/v1/auth/verify-email/{token}

If you didn't create an account, please ignore this email.
"#,
            base = self.config.public_base_url,
            token = token
        );

        self.send_email(to, subject, &body).await
    }

    /// Send the password-reset link. The token is valid for one hour and
    /// can be used once.
    pub async fn send_password_reset(&self, to: &str, token: &str) -> AppResult<()> {
        let subject = "Your OpenShelf password reset link";
        let body = format!(
            r#"
A password reset was requested for your OpenShelf account.

Open the link below to choose a new password. The link expires in one hour
and can be used once:

{base}/reset-password/{token}

If you didn't request a reset, you can safely ignore this email.
"#,
            base = self.config.public_base_url,
            token = token
        );

        self.send_email(to, subject, &body).await
    }

    /// Generic email sending function
    async fn send_email(&self, to: &str, subject: &str, body: &str) -> AppResult<()> {
        let from_name = self
            .config
            .smtp_from_name
            .as_deref()
            .unwrap_or("OpenShelf");
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

        let mailer_builder = if self.config.smtp_use_tls {
            // Use STARTTLS for secure connection
            SmtpTransport::starttls_relay(&self.config.smtp_host)
                .map_err(|e| AppError::Internal(format!("Failed to create SMTP transport: {}", e)))?
        } else {
            SmtpTransport::builder_dangerous(&self.config.smtp_host)
        }
        .port(self.config.smtp_port);

        let mailer_builder = if let (Some(username), Some(password)) =
            (&self.config.smtp_username, &self.config.smtp_password)
        {
            mailer_builder.credentials(Credentials::new(username.clone(), password.clone()))
        } else {
            mailer_builder
        };

        let mailer = mailer_builder.build();

        mailer
            .send(&email)
            .map_err(|e| AppError::Internal(format!("Failed to send email: {}", e)))?;

        Ok(())
    }
}
