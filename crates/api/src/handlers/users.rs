//! Handlers for the `/users` resource.

use axum::extract::{Path, State};
use axum::Json;
use gatekeep_core::error::CoreError;
use gatekeep_core::types::EntityId;
use gatekeep_db::models::user::User;
use serde::Serialize;

use crate::error::{AppError, AppResult};
use crate::middleware::auth::{AuthAdmin, AuthUser};
use crate::response::{DataResponse, ReissuedSession};
use crate::state::AppState;

/// The signed-in user. `session_token` is set when this request minted a
/// session (login handoff or grace renewal); the same value is sent in the
/// `X-Session-Token` header.
#[derive(Debug, Serialize)]
pub struct MeResponse {
    pub user: User,
    pub session_id: EntityId,
    pub session_token: Option<String>,
}

/// GET /api/v1/users/me
pub async fn me(auth: AuthUser) -> (ReissuedSession, Json<DataResponse<MeResponse>>) {
    let header = auth.reissued_header();
    (
        header,
        Json(DataResponse {
            data: MeResponse {
                session_id: auth.session.id,
                session_token: auth.reissued,
                user: auth.user,
            },
        }),
    )
}

/// PATCH /api/v1/users/{id}/ban
pub async fn ban(
    State(state): State<AppState>,
    AuthAdmin(admin): AuthAdmin,
    Path(id): Path<EntityId>,
) -> AppResult<Json<DataResponse<User>>> {
    set_banned(&state, admin.id, id, true).await
}

/// PATCH /api/v1/users/{id}/unban
pub async fn unban(
    State(state): State<AppState>,
    AuthAdmin(admin): AuthAdmin,
    Path(id): Path<EntityId>,
) -> AppResult<Json<DataResponse<User>>> {
    set_banned(&state, admin.id, id, false).await
}

async fn set_banned(
    state: &AppState,
    admin_id: EntityId,
    user_id: EntityId,
    banned: bool,
) -> AppResult<Json<DataResponse<User>>> {
    let user = state
        .store
        .find_user_by_id(user_id)
        .await?
        .ok_or_else(|| AppError::Core(CoreError::not_found("User", user_id)))?;

    if !state.store.set_user_banned(user.id, banned).await? {
        let msg = if banned {
            "User is already banned"
        } else {
            "User is not banned"
        };
        return Err(AppError::Core(CoreError::Conflict(msg.into())));
    }

    tracing::info!(%user_id, %admin_id, banned, "User ban state changed");
    Ok(Json(DataResponse {
        data: User { banned, ..user },
    }))
}
