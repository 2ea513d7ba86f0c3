//! Repository for the `user_tokens` (sessions) table.

use gatekeep_core::types::{EntityId, Timestamp};
use sqlx::PgPool;

use crate::models::user_token::{CreateUserToken, UserToken};

/// Column list shared across queries to avoid repetition.
const COLUMNS: &str = "id, user_id, from_login_token, from_user_token, ip_address, device_label, \
                        disconnected, last_activity, expires_at, created_at";

/// Provides session creation, lookup, activity touches and disconnects.
pub struct UserTokenRepo;

impl UserTokenRepo {
    /// Insert a new session, returning the created row.
    ///
    /// Fails with a unique violation (`uq_user_tokens_from_login_token` or
    /// `uq_user_tokens_from_user_token`) if the origin was already used.
    pub async fn create(pool: &PgPool, input: &CreateUserToken) -> Result<UserToken, sqlx::Error> {
        let (from_login_token, from_user_token) = input.origin.columns();
        let query = format!(
            "INSERT INTO user_tokens
                (id, user_id, from_login_token, from_user_token, ip_address, device_label,
                 last_activity, expires_at, created_at)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $7)
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, UserToken>(&query)
            .bind(input.id)
            .bind(input.user_id)
            .bind(from_login_token)
            .bind(from_user_token)
            .bind(&input.ip_address)
            .bind(&input.device_label)
            .bind(input.created_at)
            .bind(input.expires_at)
            .fetch_one(pool)
            .await
    }

    pub async fn find_by_id(pool: &PgPool, id: EntityId) -> Result<Option<UserToken>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM user_tokens WHERE id = $1");
        sqlx::query_as::<_, UserToken>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// The session that renewed `parent_id`, if any.
    pub async fn find_by_parent(
        pool: &PgPool,
        parent_id: EntityId,
    ) -> Result<Option<UserToken>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM user_tokens WHERE from_user_token = $1");
        sqlx::query_as::<_, UserToken>(&query)
            .bind(parent_id)
            .fetch_optional(pool)
            .await
    }

    /// Bump `last_activity`. Returns `true` if the row exists.
    pub async fn touch(pool: &PgPool, id: EntityId, at: Timestamp) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("UPDATE user_tokens SET last_activity = $2 WHERE id = $1")
            .bind(id)
            .bind(at)
            .execute(pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Disconnect a session. Returns `true` only if it was still connected.
    pub async fn disconnect(pool: &PgPool, id: EntityId) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE user_tokens SET disconnected = true WHERE id = $1 AND disconnected = false",
        )
        .bind(id)
        .execute(pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }
}
