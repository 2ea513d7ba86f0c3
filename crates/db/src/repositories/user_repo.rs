//! Repository for the `users` table.

use gatekeep_core::types::EntityId;
use sqlx::PgPool;

use crate::models::user::{CreateUser, User};

const COLUMNS: &str = "id, email, banned, created_at";

pub struct UserRepo;

impl UserRepo {
    pub async fn create(pool: &PgPool, input: &CreateUser) -> Result<User, sqlx::Error> {
        let query = format!(
            "INSERT INTO users (id, email, created_at)
             VALUES ($1, $2, $3)
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, User>(&query)
            .bind(input.id)
            .bind(&input.email)
            .bind(input.created_at)
            .fetch_one(pool)
            .await
    }

    pub async fn find_by_id(pool: &PgPool, id: EntityId) -> Result<Option<User>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM users WHERE id = $1");
        sqlx::query_as::<_, User>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    pub async fn find_by_email(pool: &PgPool, email: &str) -> Result<Option<User>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM users WHERE email = $1");
        sqlx::query_as::<_, User>(&query)
            .bind(email)
            .fetch_optional(pool)
            .await
    }

    /// Flip the ban flag. Returns `true` only if the flag actually changed,
    /// so a repeated ban (or unban) is distinguishable from a fresh one.
    pub async fn set_banned(pool: &PgPool, id: EntityId, banned: bool) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("UPDATE users SET banned = $2 WHERE id = $1 AND banned <> $2")
            .bind(id)
            .bind(banned)
            .execute(pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
