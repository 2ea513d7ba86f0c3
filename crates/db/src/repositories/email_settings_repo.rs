//! Repository for the append-only `email_settings` table.

use sqlx::PgPool;

use crate::models::email_settings::{EmailSettings, SaveEmailSettings};

const COLUMNS: &str = "id, host, port, username, password_encrypted, created_at";

pub struct EmailSettingsRepo;

impl EmailSettingsRepo {
    /// The newest settings revision, if any.
    pub async fn latest(pool: &PgPool) -> Result<Option<EmailSettings>, sqlx::Error> {
        let query =
            format!("SELECT {COLUMNS} FROM email_settings ORDER BY created_at DESC, id DESC LIMIT 1");
        sqlx::query_as::<_, EmailSettings>(&query)
            .fetch_optional(pool)
            .await
    }

    /// Insert a new revision. A missing password keeps the previous one.
    pub async fn save(pool: &PgPool, input: &SaveEmailSettings) -> Result<EmailSettings, sqlx::Error> {
        let query = format!(
            "INSERT INTO email_settings (id, host, port, username, password_encrypted, created_at)
             VALUES ($1, $2, $3, $4,
                     COALESCE($5, (SELECT password_encrypted FROM email_settings
                                   ORDER BY created_at DESC, id DESC LIMIT 1)),
                     $6)
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, EmailSettings>(&query)
            .bind(input.id)
            .bind(&input.host)
            .bind(input.port)
            .bind(&input.username)
            .bind(&input.password_encrypted)
            .bind(input.created_at)
            .fetch_one(pool)
            .await
    }
}
