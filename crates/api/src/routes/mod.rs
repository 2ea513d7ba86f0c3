pub mod admins;
pub mod email_settings;
pub mod health;
pub mod login_tokens;
pub mod user_tokens;
pub mod users;

use axum::Router;

use crate::state::AppState;

/// Build the `/api/v1` route tree.
///
/// Route hierarchy:
///
/// ```text
/// /admins                           register (open until the first admin)
/// /admins/login                     admin sign-in (public)
/// /admins/me                        get, update (admin)
///
/// /login-tokens                     request a login token (public)
/// /login-tokens/decision            approve or deny (approval token)
///
/// /users/me                         current user (session or handoff)
/// /users/{id}/ban                   ban (admin)
/// /users/{id}/unban                 unban (admin)
///
/// /user-tokens/{id}/disconnect      sign out a session (user)
///
/// /email-settings                   get, save (admin)
/// ```
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .nest("/admins", admins::router())
        .nest("/login-tokens", login_tokens::router())
        .nest("/users", users::router())
        .nest("/user-tokens", user_tokens::router())
        .nest("/email-settings", email_settings::router())
}
