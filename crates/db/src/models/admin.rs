//! Admin entity model and DTOs.

use gatekeep_core::types::{EntityId, Timestamp};
use serde::Serialize;
use sqlx::FromRow;

/// Full admin row from the `admins` table.
///
/// Contains the password hash -- NEVER serialize this to API responses directly.
/// Use [`AdminResponse`] for external-facing output.
#[derive(Debug, Clone, FromRow)]
pub struct Admin {
    pub id: EntityId,
    pub name: String,
    pub username: String,
    pub password_hash: String,
    pub created_by: Option<EntityId>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// Safe admin representation for API responses (no password hash).
#[derive(Debug, Clone, Serialize)]
pub struct AdminResponse {
    pub id: EntityId,
    pub name: String,
    pub username: String,
    pub created_by: Option<EntityId>,
    pub created_at: Timestamp,
}

impl From<&Admin> for AdminResponse {
    fn from(admin: &Admin) -> Self {
        Self {
            id: admin.id,
            name: admin.name.clone(),
            username: admin.username.clone(),
            created_by: admin.created_by,
            created_at: admin.created_at,
        }
    }
}

/// DTO for creating a new admin. The password is already hashed.
#[derive(Debug, Clone)]
pub struct CreateAdmin {
    pub id: EntityId,
    pub name: String,
    pub username: String,
    pub password_hash: String,
    pub created_by: Option<EntityId>,
    pub created_at: Timestamp,
}

/// DTO for updating an admin. `password_hash: None` keeps the current one.
#[derive(Debug, Clone)]
pub struct UpdateAdmin {
    pub name: String,
    pub username: String,
    pub password_hash: Option<String>,
    pub updated_at: Timestamp,
}
