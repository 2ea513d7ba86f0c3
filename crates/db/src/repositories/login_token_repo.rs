//! Repository for the `login_tokens` table.

use gatekeep_core::types::{EntityId, Timestamp};
use sqlx::PgPool;

use crate::models::login_token::{CreateLoginToken, LoginToken, LoginTokenActivity};

const COLUMNS: &str =
    "id, email, ip_address, device_label, authorized, denied, expires_at, created_at";

/// Provides creation, lookup and the one-shot decision update for login tokens.
pub struct LoginTokenRepo;

impl LoginTokenRepo {
    /// Insert a pending token unless `max_active` unexpired tokens already
    /// exist for the email. Returns `None` when the cap is reached.
    ///
    /// The count and the insert run in one transaction holding an advisory
    /// lock keyed on the email, so concurrent requests for the same address
    /// are serialized.
    pub async fn create_within_cap(
        pool: &PgPool,
        input: &CreateLoginToken,
        max_active: i64,
    ) -> Result<Option<LoginToken>, sqlx::Error> {
        let mut tx = pool.begin().await?;

        sqlx::query("SELECT pg_advisory_xact_lock(hashtext($1))")
            .bind(&input.email)
            .execute(&mut *tx)
            .await?;

        let active: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM login_tokens WHERE email = $1 AND expires_at > $2",
        )
        .bind(&input.email)
        .bind(input.created_at)
        .fetch_one(&mut *tx)
        .await?;
        if active >= max_active {
            tx.rollback().await?;
            return Ok(None);
        }

        let query = format!(
            "INSERT INTO login_tokens (id, email, ip_address, device_label, expires_at, created_at)
             VALUES ($1, $2, $3, $4, $5, $6)
             RETURNING {COLUMNS}"
        );
        let token = sqlx::query_as::<_, LoginToken>(&query)
            .bind(input.id)
            .bind(&input.email)
            .bind(&input.ip_address)
            .bind(&input.device_label)
            .bind(input.expires_at)
            .bind(input.created_at)
            .fetch_one(&mut *tx)
            .await?;
        tx.commit().await?;
        Ok(Some(token))
    }

    pub async fn find_by_id(pool: &PgPool, id: EntityId) -> Result<Option<LoginToken>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM login_tokens WHERE id = $1");
        sqlx::query_as::<_, LoginToken>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Count unexpired tokens and find the newest creation time for an email.
    pub async fn activity(
        pool: &PgPool,
        email: &str,
        now: Timestamp,
    ) -> Result<LoginTokenActivity, sqlx::Error> {
        sqlx::query_as::<_, LoginTokenActivity>(
            "SELECT COUNT(*) FILTER (WHERE expires_at > $2) AS active,
                    MAX(created_at) AS last_created_at
             FROM login_tokens
             WHERE email = $1",
        )
        .bind(email)
        .bind(now)
        .fetch_one(pool)
        .await
    }

    /// Set `authorized` or `denied` on a still-pending token.
    ///
    /// The pending condition lives in the `WHERE` clause so two concurrent
    /// decisions cannot both succeed. Returns `true` if this call won.
    pub async fn decide(pool: &PgPool, id: EntityId, approve: bool) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE login_tokens SET authorized = $2, denied = NOT $2
             WHERE id = $1 AND authorized = false AND denied = false",
        )
        .bind(id)
        .bind(approve)
        .execute(pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }
}
