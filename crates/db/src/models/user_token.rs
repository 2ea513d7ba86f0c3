//! User token (session) model and DTOs.

use gatekeep_core::types::{EntityId, Timestamp};
use serde::Serialize;
use sqlx::FromRow;

/// A session row from the `user_tokens` table.
///
/// Exactly one of `from_login_token` / `from_user_token` is set: a session
/// either came from redeeming a login token or from renewing a parent
/// session.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct UserToken {
    pub id: EntityId,
    pub user_id: EntityId,
    pub from_login_token: Option<EntityId>,
    pub from_user_token: Option<EntityId>,
    pub ip_address: Option<String>,
    pub device_label: Option<String>,
    pub disconnected: bool,
    pub last_activity: Timestamp,
    pub expires_at: Timestamp,
    pub created_at: Timestamp,
}

/// Where a new session comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionOrigin {
    LoginToken(EntityId),
    Renewal { parent: EntityId },
}

impl SessionOrigin {
    /// Split into the two nullable origin columns.
    pub fn columns(self) -> (Option<EntityId>, Option<EntityId>) {
        match self {
            SessionOrigin::LoginToken(id) => (Some(id), None),
            SessionOrigin::Renewal { parent } => (None, Some(parent)),
        }
    }
}

/// DTO for inserting a session. `last_activity` starts at `created_at`.
#[derive(Debug, Clone)]
pub struct CreateUserToken {
    pub id: EntityId,
    pub user_id: EntityId,
    pub origin: SessionOrigin,
    pub ip_address: Option<String>,
    pub device_label: Option<String>,
    pub expires_at: Timestamp,
    pub created_at: Timestamp,
}
