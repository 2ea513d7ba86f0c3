//! Route definitions for the `/user-tokens` resource.

use axum::routing::patch;
use axum::Router;

use crate::handlers::user_tokens;
use crate::state::AppState;

/// Routes mounted at `/user-tokens`.
pub fn router() -> Router<AppState> {
    Router::new().route("/{id}/disconnect", patch(user_tokens::disconnect))
}
