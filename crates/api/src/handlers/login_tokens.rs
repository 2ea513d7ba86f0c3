//! Handlers for the `/login-tokens` resource (passwordless sign-in).

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use gatekeep_core::types::{EntityId, Timestamp};
use serde::{Deserialize, Serialize};

use crate::auth::ClientInfo;
use crate::error::{AppError, AppResult};
use crate::mail::{login_email, send_with_timeout};
use crate::response::DataResponse;
use crate::state::AppState;

// ---------------------------------------------------------------------------
// Request / response types
// ---------------------------------------------------------------------------

/// Request body for `POST /login-tokens`.
#[derive(Debug, Deserialize)]
pub struct LoginTokenRequest {
    pub email: String,
}

/// A pending login token. `token` goes in the `X-Login-Token` header once
/// the request has been approved from the emailed link.
#[derive(Debug, Serialize)]
pub struct LoginTokenResponse {
    pub id: EntityId,
    pub token: String,
    pub expires_at: Timestamp,
}

/// Request body for `POST /login-tokens/decision`.
#[derive(Debug, Deserialize)]
pub struct DecisionRequest {
    /// Approval token from the emailed link.
    pub token: String,
    pub approve: bool,
}

#[derive(Debug, Serialize)]
pub struct DecisionResponse {
    pub id: EntityId,
    pub authorized: bool,
    pub denied: bool,
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// POST /api/v1/login-tokens
///
/// Issue a login token for an email address and mail the approval link.
pub async fn request(
    State(state): State<AppState>,
    client: ClientInfo,
    Json(input): Json<LoginTokenRequest>,
) -> AppResult<(StatusCode, Json<DataResponse<LoginTokenResponse>>)> {
    let issued = state.login_tokens.request_login(&input.email, &client).await?;

    let mail = login_email(&state.config.mail, &issued.login_token, &issued.approval_token);
    send_with_timeout(state.mailer.as_ref(), &mail, state.config.mail.timeout())
        .await
        .map_err(|e| {
            AppError::InternalError(format!(
                "Login email for {} could not be sent: {e}",
                issued.login_token.id
            ))
        })?;

    Ok((
        StatusCode::CREATED,
        Json(DataResponse {
            data: LoginTokenResponse {
                id: issued.login_token.id,
                token: issued.token,
                expires_at: issued.login_token.expires_at,
            },
        }),
    ))
}

/// POST /api/v1/login-tokens/decision
///
/// Approve or deny a pending sign-in from the emailed link.
pub async fn decide(
    State(state): State<AppState>,
    Json(input): Json<DecisionRequest>,
) -> AppResult<Json<DataResponse<DecisionResponse>>> {
    let decided = state.login_tokens.decide(&input.token, input.approve).await?;

    Ok(Json(DataResponse {
        data: DecisionResponse {
            id: decided.id,
            authorized: decided.authorized,
            denied: decided.denied,
        },
    }))
}
