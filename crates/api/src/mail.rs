//! Outbound email for login token delivery.
//!
//! [`SmtpMailer`] builds a `lettre` STARTTLS transport per message from the
//! newest stored [`EmailSettings`](gatekeep_db::models::email_settings::EmailSettings),
//! so saving new settings takes effect without a restart.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use gatekeep_core::crypto::{CryptoError, SettingsCipher};
use gatekeep_db::models::login_token::LoginToken;
use gatekeep_db::store::{AuthStore, StoreError};

use crate::config::env_or;

// ---------------------------------------------------------------------------
// Error
// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum MailError {
    /// No email settings have been saved yet.
    #[error("Email settings are not configured")]
    NotConfigured,

    #[error("SMTP transport error: {0}")]
    Transport(#[from] lettre::transport::smtp::Error),

    #[error("Email address parse error: {0}")]
    Address(#[from] lettre::address::AddressError),

    #[error("Email build error: {0}")]
    Build(String),

    #[error("Stored SMTP password could not be decrypted: {0}")]
    Secret(#[from] CryptoError),

    #[error("Could not load email settings: {0}")]
    Store(#[from] StoreError),

    #[error("Sending email timed out after {0:?}")]
    Timeout(Duration),
}

// ---------------------------------------------------------------------------
// Config
// ---------------------------------------------------------------------------

const DEFAULT_FROM_ADDRESS: &str = "noreply@gatekeep.local";
const DEFAULT_TIMEOUT_SECS: u64 = 10;
const DEFAULT_CONFIRM_URL: &str = "http://localhost:5173/login/confirm";

#[derive(Debug, Clone)]
pub struct MailConfig {
    /// RFC 5322 "From" address.
    pub from_address: String,
    /// Upper bound on a single send, including connection setup.
    pub timeout_secs: u64,
    /// Page that receives `?token=<approval token>` and lets the owner of the
    /// address approve or deny the sign-in.
    pub confirm_url: String,
}

impl MailConfig {
    /// | Env Var             | Default                               |
    /// |---------------------|---------------------------------------|
    /// | `MAIL_FROM`         | `noreply@gatekeep.local`              |
    /// | `MAIL_TIMEOUT_SECS` | `10`                                  |
    /// | `LOGIN_CONFIRM_URL` | `http://localhost:5173/login/confirm` |
    pub fn from_env() -> Self {
        Self {
            from_address: std::env::var("MAIL_FROM")
                .unwrap_or_else(|_| DEFAULT_FROM_ADDRESS.to_string()),
            timeout_secs: env_or("MAIL_TIMEOUT_SECS", DEFAULT_TIMEOUT_SECS),
            confirm_url: std::env::var("LOGIN_CONFIRM_URL")
                .unwrap_or_else(|_| DEFAULT_CONFIRM_URL.to_string()),
        }
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

// ---------------------------------------------------------------------------
// Transport
// ---------------------------------------------------------------------------

/// A rendered HTML message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutgoingMail {
    pub from: String,
    pub to: String,
    pub subject: String,
    pub html: String,
}

#[async_trait]
pub trait MailTransport: Send + Sync {
    async fn send(&self, mail: &OutgoingMail) -> Result<(), MailError>;
}

/// Send `mail`, giving up after `limit`.
pub async fn send_with_timeout(
    transport: &dyn MailTransport,
    mail: &OutgoingMail,
    limit: Duration,
) -> Result<(), MailError> {
    tokio::time::timeout(limit, transport.send(mail))
        .await
        .map_err(|_| MailError::Timeout(limit))?
}

/// SMTP delivery using the newest stored settings.
pub struct SmtpMailer {
    store: Arc<dyn AuthStore>,
    cipher: Arc<SettingsCipher>,
}

impl SmtpMailer {
    pub fn new(store: Arc<dyn AuthStore>, cipher: Arc<SettingsCipher>) -> Self {
        Self { store, cipher }
    }
}

#[async_trait]
impl MailTransport for SmtpMailer {
    async fn send(&self, mail: &OutgoingMail) -> Result<(), MailError> {
        use lettre::{
            message::header::ContentType, transport::smtp::authentication::Credentials,
            AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
        };

        let settings = self
            .store
            .latest_email_settings()
            .await?
            .ok_or(MailError::NotConfigured)?;
        let port = u16::try_from(settings.port)
            .map_err(|_| MailError::Build(format!("Invalid SMTP port {}", settings.port)))?;

        let email = Message::builder()
            .from(mail.from.parse()?)
            .to(mail.to.parse()?)
            .subject(mail.subject.clone())
            .header(ContentType::TEXT_HTML)
            .body(mail.html.clone())
            .map_err(|e| MailError::Build(e.to_string()))?;

        let mut transport_builder =
            AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&settings.host)?.port(port);

        if let Some(encrypted) = &settings.password_encrypted {
            let password = self.cipher.decrypt(encrypted)?;
            transport_builder =
                transport_builder.credentials(Credentials::new(settings.username.clone(), password));
        }

        transport_builder.build().send(email).await?;

        tracing::info!(to = %mail.to, host = %settings.host, "Email sent");
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Login email
// ---------------------------------------------------------------------------

/// Render the sign-in confirmation email for a freshly issued login token.
pub fn login_email(config: &MailConfig, login_token: &LoginToken, signed_token: &str) -> OutgoingMail {
    let separator = if config.confirm_url.contains('?') { '&' } else { '?' };
    let link = format!("{}{separator}token={signed_token}", config.confirm_url);
    let device = login_token.device_label.as_deref().unwrap_or("an unknown device");
    let ip = login_token.ip_address.as_deref().unwrap_or("an unknown address");

    let html = format!(
        "<p>Someone asked to sign in to your account from {device} ({ip}).</p>\
         <p><a href=\"{link}\">Review this sign-in request</a></p>\
         <p>The link expires at {expires} UTC. If this wasn't you, deny the request.</p>",
        device = escape_html(device),
        ip = escape_html(ip),
        link = escape_html(&link),
        expires = login_token.expires_at.format("%Y-%m-%d %H:%M"),
    );

    OutgoingMail {
        from: config.from_address.clone(),
        to: login_token.email.clone(),
        subject: "Confirm your sign-in".to_string(),
        html,
    }
}

fn escape_html(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            c => out.push(c),
        }
    }
    out
}
