//! End-user entity model and DTOs.

use gatekeep_core::types::{EntityId, Timestamp};
use serde::Serialize;
use sqlx::FromRow;

/// A user row from the `users` table. Users have no password; they sign in
/// through login tokens sent to their email address.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct User {
    pub id: EntityId,
    pub email: String,
    pub banned: bool,
    pub created_at: Timestamp,
}

/// DTO for creating a user on first sign-in.
#[derive(Debug, Clone)]
pub struct CreateUser {
    pub id: EntityId,
    pub email: String,
    pub created_at: Timestamp,
}
