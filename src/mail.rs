//! Outbound mail for the verification flow.
//!
//! Delivery goes through SMTP via lettre; the [`Mailer`] trait keeps the
//! workflows independent of the transport.

use async_trait::async_trait;
use lettre::{
    message::{header::ContentType, Mailbox, MultiPart, SinglePart},
    transport::smtp::{authentication::Credentials, Error as SmtpError},
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
};
use thiserror::Error;
use tracing::{error, info};
use url::Url;

use crate::config::MailConfig;

/// Errors that can occur when sending email.
#[derive(Debug, Error)]
pub enum MailError {
    #[error("SMTP error: {0}")]
    Smtp(#[from] SmtpError),

    #[error("Failed to build message: {0}")]
    MessageBuild(#[from] lettre::error::Error),

    #[error("Invalid email address: {0}")]
    InvalidAddress(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutgoingMail {
    pub to: String,
    pub subject: String,
    pub text: String,
    pub html: String,
}

#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, mail: OutgoingMail) -> Result<(), MailError>;
}

#[derive(Clone)]
pub struct SmtpMailer {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
}

impl SmtpMailer {
    /// Build a STARTTLS relay transport from configuration.
    ///
    /// # Errors
    ///
    /// Returns error if the relay host is unusable or the sender address does not parse.
    pub fn new(config: &MailConfig) -> Result<Self, MailError> {
        let from = config
            .from
            .parse::<Mailbox>()
            .map_err(|_| MailError::InvalidAddress(config.from.clone()))?;

        let mut builder = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.host)?
            .port(config.port);
        if !config.username.is_empty() {
            builder = builder.credentials(Credentials::new(
                config.username.clone(),
                config.password.clone(),
            ));
        }

        Ok(Self {
            transport: builder.build(),
            from,
        })
    }
}

#[async_trait]
impl Mailer for SmtpMailer {
    async fn send(&self, mail: OutgoingMail) -> Result<(), MailError> {
        let to = mail
            .to
            .parse::<Mailbox>()
            .map_err(|_| MailError::InvalidAddress(mail.to.clone()))?;

        let message = Message::builder()
            .from(self.from.clone())
            .to(to)
            .subject(mail.subject.as_str())
            .multipart(
                MultiPart::alternative()
                    .singlepart(
                        SinglePart::builder()
                            .header(ContentType::TEXT_PLAIN)
                            .body(mail.text),
                    )
                    .singlepart(
                        SinglePart::builder()
                            .header(ContentType::TEXT_HTML)
                            .body(mail.html),
                    ),
            )?;

        if let Err(e) = self.transport.send(message).await {
            error!(error = %e, to = %mail.to, "failed to send email");
            return Err(e.into());
        }

        info!(to = %mail.to, subject = %mail.subject, "email sent");
        Ok(())
    }
}

/// `<base>/email/verify?email=<address>&token=<token>`
pub fn verification_link(base: &Url, email: &str, token: &str) -> Url {
    let mut link = base.join("/email/verify").unwrap_or_else(|_| base.clone());
    link.query_pairs_mut()
        .clear()
        .append_pair("email", email)
        .append_pair("token", token);
    link
}

pub fn verification_email(to: &str, link: &Url) -> OutgoingMail {
    OutgoingMail {
        to: to.to_string(),
        subject: "Email Verification".into(),
        text: format!("Open the link below to verify your email:\n\n{link}\n"),
        html: format!(
            "<p>Click the link below to verify your email:</p>\n<a href=\"{link}\">Verify Email</a>\n"
        ),
    }
}
