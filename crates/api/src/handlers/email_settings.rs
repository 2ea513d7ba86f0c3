//! Handlers for the `/email-settings` resource (SMTP configuration).
//!
//! Saving appends a row; the newest row is the active configuration. The
//! password is encrypted before it reaches the store and never returned.

use axum::extract::State;
use axum::Json;
use gatekeep_core::error::CoreError;
use gatekeep_core::validation::require_non_blank;
use gatekeep_db::models::email_settings::{EmailSettingsResponse, SaveEmailSettings};
use serde::Deserialize;

use crate::auth::with_fresh_id;
use crate::error::{AppError, AppResult};
use crate::middleware::auth::AuthAdmin;
use crate::response::DataResponse;
use crate::state::AppState;

/// Request body for `PUT /email-settings`. Omitting `password` keeps the
/// previously stored one.
#[derive(Debug, Deserialize)]
pub struct SaveEmailSettingsRequest {
    pub host: String,
    pub port: i64,
    pub username: String,
    pub password: Option<String>,
}

/// GET /api/v1/email-settings
pub async fn get(
    State(state): State<AppState>,
    AuthAdmin(_admin): AuthAdmin,
) -> AppResult<Json<DataResponse<EmailSettingsResponse>>> {
    let settings = state
        .store
        .latest_email_settings()
        .await?
        .ok_or_else(|| AppError::Core(CoreError::not_found("EmailSettings", "latest")))?;

    Ok(Json(DataResponse {
        data: EmailSettingsResponse::from(&settings),
    }))
}

/// PUT /api/v1/email-settings
pub async fn save(
    State(state): State<AppState>,
    AuthAdmin(admin): AuthAdmin,
    Json(input): Json<SaveEmailSettingsRequest>,
) -> AppResult<Json<DataResponse<EmailSettingsResponse>>> {
    require_non_blank("Host", &input.host)?;
    require_non_blank("Username", &input.username)?;
    let port = i32::try_from(input.port)
        .ok()
        .filter(|p| (1..=65535).contains(p))
        .ok_or_else(|| {
            AppError::Core(CoreError::Validation(
                "Port must be between 1 and 65535".into(),
            ))
        })?;

    let password_encrypted = input
        .password
        .as_deref()
        .filter(|p| !p.is_empty())
        .map(|p| state.cipher.encrypt(p))
        .transpose()
        .map_err(|e| AppError::InternalError(format!("SMTP password encryption failed: {e}")))?;

    let now = state.clock.now();
    let store = state.store.as_ref();
    let saved = with_fresh_id(state.ids.as_ref(), |id| {
        let dto = SaveEmailSettings {
            id,
            host: input.host.trim().to_string(),
            port,
            username: input.username.trim().to_string(),
            password_encrypted: password_encrypted.clone(),
            created_at: now,
        };
        async move { store.save_email_settings(&dto).await }
    })
    .await?;

    tracing::info!(
        admin_id = %admin.id,
        host = %saved.host,
        port = saved.port,
        "Email settings saved"
    );
    Ok(Json(DataResponse {
        data: EmailSettingsResponse::from(&saved),
    }))
}
