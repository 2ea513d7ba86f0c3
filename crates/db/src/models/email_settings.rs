//! SMTP settings model and DTOs.

use gatekeep_core::types::{EntityId, Timestamp};
use serde::Serialize;
use sqlx::FromRow;

/// A row from `email_settings`. The newest row is the active configuration.
#[derive(Debug, Clone, FromRow)]
pub struct EmailSettings {
    pub id: EntityId,
    pub host: String,
    pub port: i32,
    pub username: String,
    /// AES-GCM ciphertext; see `gatekeep_core::crypto`.
    pub password_encrypted: Option<String>,
    pub created_at: Timestamp,
}

/// Settings as returned by the API. The password never leaves the server.
#[derive(Debug, Clone, Serialize)]
pub struct EmailSettingsResponse {
    pub host: String,
    pub port: i32,
    pub username: String,
    pub has_password: bool,
    pub updated_at: Timestamp,
}

impl From<&EmailSettings> for EmailSettingsResponse {
    fn from(settings: &EmailSettings) -> Self {
        Self {
            host: settings.host.clone(),
            port: settings.port,
            username: settings.username.clone(),
            has_password: settings.password_encrypted.is_some(),
            updated_at: settings.created_at,
        }
    }
}

/// DTO for saving a new settings revision.
///
/// `password_encrypted: None` carries the previous revision's password over.
#[derive(Debug, Clone)]
pub struct SaveEmailSettings {
    pub id: EntityId,
    pub host: String,
    pub port: i32,
    pub username: String,
    pub password_encrypted: Option<String>,
    pub created_at: Timestamp,
}
