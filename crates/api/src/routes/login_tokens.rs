//! Route definitions for the `/login-tokens` resource.

use axum::routing::post;
use axum::Router;

use crate::handlers::login_tokens;
use crate::state::AppState;

/// Routes mounted at `/login-tokens`.
///
/// ```text
/// POST /           -> request
/// POST /decision   -> decide
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", post(login_tokens::request))
        .route("/decision", post(login_tokens::decide))
}
