use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use lettre::address::AddressError;
use lettre::message::{header::ContentType, Mailbox};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use santa_core::GiftLimit;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::config::MailConfig;
use crate::views::{display_limit, escape};

pub const SUBJECT: &str = "Your Secret Santa recipient";

#[derive(Debug, Clone, PartialEq)]
pub struct Notification {
    pub to: String,
    pub giver: String,
    pub receiver: String,
    pub gift_limit: GiftLimit,
    pub currency: String,
}

impl Notification {
    pub fn html_body(&self) -> String {
        format!(
            "<h2>Hello, {giver}!</h2>\n\
             <p>You are giving a gift to: <b>{receiver}</b></p>\n\
             <p>Gift limit: <b>{limit}</b></p>",
            giver = escape(&self.giver),
            receiver = escape(&self.receiver),
            limit = escape(&display_limit(&self.gift_limit, &self.currency)),
        )
    }
}

#[derive(Debug, Error)]
pub enum MailError {
    #[error("mail is not configured")]
    Disabled,

    #[error("invalid address {address:?}: {source}")]
    Address {
        address: String,
        #[source]
        source: AddressError,
    },

    #[error("cannot build message: {0}")]
    Build(#[from] lettre::error::Error),

    #[error("smtp error: {0}")]
    Smtp(#[from] lettre::transport::smtp::Error),
}

#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, notification: &Notification) -> Result<(), MailError>;
}

pub struct SmtpNotifier {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
}

impl SmtpNotifier {
    pub fn new(config: &MailConfig) -> Result<Self, MailError> {
        let from = parse_mailbox(&format!("Secret Santa <{}>", config.user))?;
        let transport = AsyncSmtpTransport::<Tokio1Executor>::relay(&config.smtp_host)?
            .credentials(Credentials::new(
                config.user.clone(),
                config.password.clone(),
            ))
            .build();
        Ok(Self { transport, from })
    }
}

#[async_trait]
impl Notifier for SmtpNotifier {
    async fn notify(&self, notification: &Notification) -> Result<(), MailError> {
        let message = Message::builder()
            .from(self.from.clone())
            .to(parse_mailbox(&notification.to)?)
            .subject(SUBJECT)
            .header(ContentType::TEXT_HTML)
            .body(notification.html_body())?;

        self.transport.send(message).await?;
        Ok(())
    }
}

pub struct DisabledNotifier;

#[async_trait]
impl Notifier for DisabledNotifier {
    async fn notify(&self, _notification: &Notification) -> Result<(), MailError> {
        Err(MailError::Disabled)
    }
}

pub fn notifier_from_config(config: Option<&MailConfig>) -> Arc<dyn Notifier> {
    let Some(config) = config else {
        return Arc::new(DisabledNotifier);
    };
    match SmtpNotifier::new(config) {
        Ok(notifier) => {
            info!("mail notifications via {}", config.smtp_host);
            Arc::new(notifier)
        }
        Err(err) => {
            warn!("mail notifications disabled: {err}");
            Arc::new(DisabledNotifier)
        }
    }
}

// Outcome of a best-effort send; never surfaced to the request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    Sent,
    Skipped,
    Failed,
    TimedOut,
}

pub async fn notify_best_effort(
    notifier: &dyn Notifier,
    notification: &Notification,
    timeout: Duration,
) -> Delivery {
    match tokio::time::timeout(timeout, notifier.notify(notification)).await {
        Ok(Ok(())) => {
            info!(giver = %notification.giver, "notification sent");
            Delivery::Sent
        }
        Ok(Err(MailError::Disabled)) => {
            debug!(giver = %notification.giver, "mail disabled, notification skipped");
            Delivery::Skipped
        }
        Ok(Err(err)) => {
            warn!(giver = %notification.giver, "failed to send notification: {err}");
            Delivery::Failed
        }
        Err(_) => {
            warn!(giver = %notification.giver, "notification timed out after {timeout:?}");
            Delivery::TimedOut
        }
    }
}

pub(crate) fn parse_mailbox(address: &str) -> Result<Mailbox, MailError> {
    address
        .trim()
        .parse()
        .map_err(|source| MailError::Address {
            address: address.to_string(),
            source,
        })
}
