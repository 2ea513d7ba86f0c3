//! Route definitions for the `/users` resource.

use axum::routing::{get, patch};
use axum::Router;

use crate::handlers::users;
use crate::state::AppState;

/// Routes mounted at `/users`.
///
/// ```text
/// GET   /me           -> me (user)
/// PATCH /{id}/ban     -> ban (admin)
/// PATCH /{id}/unban   -> unban (admin)
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/me", get(users::me))
        .route("/{id}/ban", patch(users::ban))
        .route("/{id}/unban", patch(users::unban))
}
