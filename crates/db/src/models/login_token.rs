//! Login token model and DTOs.

use gatekeep_core::login_token::LoginTokenStatus;
use gatekeep_core::types::{EntityId, Timestamp};
use sqlx::FromRow;

/// A login token row from the `login_tokens` table.
#[derive(Debug, Clone, FromRow)]
pub struct LoginToken {
    pub id: EntityId,
    pub email: String,
    pub ip_address: Option<String>,
    pub device_label: Option<String>,
    pub authorized: bool,
    pub denied: bool,
    pub expires_at: Timestamp,
    pub created_at: Timestamp,
}

impl LoginToken {
    pub fn status(&self) -> LoginTokenStatus {
        LoginTokenStatus::from_flags(self.authorized, self.denied)
    }
}

/// DTO for creating a pending login token.
#[derive(Debug, Clone)]
pub struct CreateLoginToken {
    pub id: EntityId,
    pub email: String,
    pub ip_address: Option<String>,
    pub device_label: Option<String>,
    pub expires_at: Timestamp,
    pub created_at: Timestamp,
}

/// Recent login token activity for one email address.
#[derive(Debug, Clone, Copy, Default, FromRow)]
pub struct LoginTokenActivity {
    /// Tokens whose `expires_at` is still in the future.
    pub active: i64,
    /// Creation time of the newest token, expired or not.
    pub last_created_at: Option<Timestamp>,
}
