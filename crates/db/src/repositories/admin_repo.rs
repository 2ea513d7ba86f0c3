//! Repository for the `admins` table.

use gatekeep_core::types::EntityId;
use sqlx::PgPool;

use crate::models::admin::{Admin, CreateAdmin, UpdateAdmin};

/// Column list shared across queries to avoid repetition.
const COLUMNS: &str = "id, name, username, password_hash, created_by, created_at, updated_at";

/// Provides CRUD operations for admins.
pub struct AdminRepo;

impl AdminRepo {
    /// Insert a new admin, returning the created row.
    pub async fn create(pool: &PgPool, input: &CreateAdmin) -> Result<Admin, sqlx::Error> {
        let query = format!(
            "INSERT INTO admins (id, name, username, password_hash, created_by, created_at, updated_at)
             VALUES ($1, $2, $3, $4, $5, $6, $6)
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Admin>(&query)
            .bind(input.id)
            .bind(&input.name)
            .bind(&input.username)
            .bind(&input.password_hash)
            .bind(input.created_by)
            .bind(input.created_at)
            .fetch_one(pool)
            .await
    }

    /// Find an admin by ID.
    pub async fn find_by_id(pool: &PgPool, id: EntityId) -> Result<Option<Admin>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM admins WHERE id = $1");
        sqlx::query_as::<_, Admin>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Find an admin by username (case-sensitive).
    pub async fn find_by_username(
        pool: &PgPool,
        username: &str,
    ) -> Result<Option<Admin>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM admins WHERE username = $1");
        sqlx::query_as::<_, Admin>(&query)
            .bind(username)
            .fetch_optional(pool)
            .await
    }

    /// Number of registered admins.
    pub async fn count(pool: &PgPool) -> Result<i64, sqlx::Error> {
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM admins")
            .fetch_one(pool)
            .await?;
        Ok(count)
    }

    /// Update name, username and optionally the password hash.
    ///
    /// Returns `None` if no row with the given `id` exists.
    pub async fn update(
        pool: &PgPool,
        id: EntityId,
        input: &UpdateAdmin,
    ) -> Result<Option<Admin>, sqlx::Error> {
        let query = format!(
            "UPDATE admins SET
                name = $2,
                username = $3,
                password_hash = COALESCE($4, password_hash),
                updated_at = $5
             WHERE id = $1
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Admin>(&query)
            .bind(id)
            .bind(&input.name)
            .bind(&input.username)
            .bind(&input.password_hash)
            .bind(input.updated_at)
            .fetch_optional(pool)
            .await
    }
}
