//! Digest delivery over SMTP.
//!
//! # Architecture
//!
//! - [`Dispatch`]: Core trait for delivering one HTML message
//! - [`SmtpDispatcher`]: Sends through an implicit-TLS submission endpoint
//!   (Gmail on port 465 by default) using `lettre`
//!
//! Delivery is attempted exactly once. Any transport or authentication error
//! is returned to the caller, which treats it as fatal.

use crate::config::{MailConfig, Settings};
use lettre::message::header::ContentType;
use lettre::message::Mailbox;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use std::error::Error;
use std::time::Instant;
use thiserror::Error;
use tracing::{info, instrument};

/// Trait for delivering a rendered digest.
///
/// Implementors send one HTML message with the given subject. The pipeline
/// only depends on this trait, so the SMTP transport can be swapped out.
pub trait Dispatch {
    async fn dispatch(&self, subject: &str, html_body: &str) -> Result<(), Box<dyn Error>>;
}

#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("invalid {role} address {value:?}: {source}")]
    Address {
        role: &'static str,
        value: String,
        source: lettre::address::AddressError,
    },
    #[error("failed to build email message: {0}")]
    Message(#[from] lettre::error::Error),
    #[error("SMTP delivery failed: {0}")]
    Transport(#[from] lettre::transport::smtp::Error),
}

/// Sends the digest through an authenticated SMTP relay.
#[derive(Debug, Clone)]
pub struct SmtpDispatcher {
    mail: MailConfig,
    host: String,
    port: u16,
}

impl SmtpDispatcher {
    pub fn new(mail: MailConfig, settings: &Settings) -> Self {
        Self {
            mail,
            host: settings.smtp_host.clone(),
            port: settings.smtp_port,
        }
    }

    /// Build the single-part HTML message from sender to recipient.
    pub fn build_message(&self, subject: &str, html_body: &str) -> Result<Message, DispatchError> {
        let from = parse_mailbox("sender", &self.mail.sender)?;
        let to = parse_mailbox("recipient", &self.mail.recipient)?;

        let message = Message::builder()
            .from(from)
            .to(to)
            .subject(subject)
            .header(ContentType::TEXT_HTML)
            .body(html_body.to_string())?;
        Ok(message)
    }
}

impl Dispatch for SmtpDispatcher {
    #[instrument(level = "info", skip_all, fields(host = %self.host, port = self.port))]
    async fn dispatch(&self, subject: &str, html_body: &str) -> Result<(), Box<dyn Error>> {
        let t0 = Instant::now();
        let message = self.build_message(subject, html_body)?;

        let credentials = Credentials::new(self.mail.sender.clone(), self.mail.password.clone());
        let transport = AsyncSmtpTransport::<Tokio1Executor>::relay(&self.host)
            .map_err(DispatchError::Transport)?
            .port(self.port)
            .credentials(credentials)
            .build();

        transport
            .send(message)
            .await
            .map_err(DispatchError::Transport)?;

        info!(
            to = %self.mail.recipient,
            %subject,
            elapsed_ms = t0.elapsed().as_millis() as u64,
            "✅ Summary email sent"
        );
        Ok(())
    }
}

fn parse_mailbox(role: &'static str, value: &str) -> Result<Mailbox, DispatchError> {
    value.parse().map_err(|source| DispatchError::Address {
        role,
        value: value.to_string(),
        source,
    })
}
