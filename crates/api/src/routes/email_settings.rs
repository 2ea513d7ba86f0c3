//! Route definitions for the `/email-settings` resource.

use axum::routing::get;
use axum::Router;

use crate::handlers::email_settings;
use crate::state::AppState;

/// Routes mounted at `/email-settings`.
///
/// ```text
/// GET /   -> get (admin)
/// PUT /   -> save (admin)
/// ```
pub fn router() -> Router<AppState> {
    Router::new().route("/", get(email_settings::get).put(email_settings::save))
}
