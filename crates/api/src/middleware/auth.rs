//! Authentication extractors for Axum handlers.

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use axum::http::HeaderMap;
use gatekeep_core::error::CoreError;
use gatekeep_db::models::admin::Admin;
use gatekeep_db::models::user::User;
use gatekeep_db::models::user_token::UserToken;

use crate::auth::gate::UserCredential;
use crate::auth::ClientInfo;
use crate::error::AppError;
use crate::response::ReissuedSession;
use crate::state::AppState;

/// Request header carrying a signed login token for the first exchange.
pub const LOGIN_TOKEN_HEADER: &str = "x-login-token";

/// Extract the token from `Authorization: Bearer <token>`.
pub fn bearer_token(headers: &HeaderMap) -> Result<&str, AppError> {
    let auth_header = headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| {
            AppError::Core(CoreError::Unauthorized(
                "Missing Authorization header".into(),
            ))
        })?;

    auth_header.strip_prefix("Bearer ").ok_or_else(|| {
        AppError::Core(CoreError::Unauthorized(
            "Invalid Authorization format. Expected: Bearer <token>".into(),
        ))
    })
}

/// Authenticated admin resolved from an admin bearer token.
///
/// ```ignore
/// async fn my_handler(AuthAdmin(admin): AuthAdmin) -> AppResult<Json<()>> {
///     tracing::info!(admin_id = %admin.id, "handling request");
///     Ok(Json(()))
/// }
/// ```
#[derive(Debug, Clone)]
pub struct AuthAdmin(pub Admin);

impl FromRequestParts<AppState> for AuthAdmin {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token = bearer_token(&parts.headers)?;
        let admin = state.gate.authenticate_admin(token).await?;
        Ok(AuthAdmin(admin))
    }
}

/// Authenticated end user.
///
/// Accepts either the `X-Login-Token` handoff header (redeemed on the spot)
/// or a session bearer token. When a session was minted along the way, the
/// handler must return [`AuthUser::reissued_header`] on every outcome,
/// errors included, so the client receives the new token. Extractors that
/// can reject the request go before `AuthUser` in the handler signature.
///
/// ```ignore
/// async fn my_handler(
///     Path(id): Path<EntityId>,
///     auth: AuthUser,
/// ) -> (ReissuedSession, AppResult<StatusCode>) {
///     let result = do_work(auth.user.id, id).await;
///     (auth.reissued_header(), result)
/// }
/// ```
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub user: User,
    pub session: UserToken,
    pub reissued: Option<String>,
}

impl AuthUser {
    pub fn reissued_header(&self) -> ReissuedSession {
        ReissuedSession(self.reissued.clone())
    }
}

impl FromRequestParts<AppState> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let client = ClientInfo::from_parts(parts);

        let handoff = parts
            .headers
            .get(LOGIN_TOKEN_HEADER)
            .map(|v| {
                v.to_str().map_err(|_| {
                    AppError::Core(CoreError::Unauthorized("Invalid login token header".into()))
                })
            })
            .transpose()?;

        let credential = match handoff {
            Some(token) => UserCredential::Handoff(token),
            None => UserCredential::Session(bearer_token(&parts.headers)?),
        };

        let authed = state.gate.authenticate_user(credential, &client).await?;
        Ok(AuthUser {
            user: authed.user,
            session: authed.session,
            reissued: authed.reissued,
        })
    }
}
