//! Route definitions for the `/admins` resource.

use axum::routing::{get, post};
use axum::Router;

use crate::handlers::admins;
use crate::state::AppState;

/// Routes mounted at `/admins`.
///
/// ```text
/// POST /        -> register (open until the first admin exists)
/// POST /login   -> login
/// GET  /me      -> me
/// PUT  /me      -> update_me
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", post(admins::register))
        .route("/login", post(admins::login))
        .route("/me", get(admins::me).put(admins::update_me))
}
