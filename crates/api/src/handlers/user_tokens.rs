//! Handlers for the `/user-tokens` resource (sessions).

use axum::extract::{Path, State};
use axum::http::StatusCode;
use gatekeep_core::types::EntityId;

use crate::error::{AppError, AppResult};
use crate::middleware::auth::AuthUser;
use crate::response::ReissuedSession;
use crate::state::AppState;

/// PATCH /api/v1/user-tokens/{id}/disconnect
///
/// Sign out one of the caller's own sessions. Disconnecting the session that
/// authenticated this request is allowed. A session minted while
/// authenticating is returned on failures too.
pub async fn disconnect(
    State(state): State<AppState>,
    Path(id): Path<EntityId>,
    auth: AuthUser,
) -> (ReissuedSession, AppResult<StatusCode>) {
    let result = state
        .sessions
        .disconnect(auth.user.id, id)
        .await
        .map(|()| StatusCode::NO_CONTENT)
        .map_err(AppError::from);
    (auth.reissued_header(), result)
}
