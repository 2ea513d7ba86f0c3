//! Shared response envelope types for API handlers.
//!
//! All API responses use a `{ "data": ... }` envelope per project conventions.
//! Use [`DataResponse`] instead of ad-hoc `serde_json::json!({ "data": ... })`
//! to get compile-time type safety and consistent serialization.

use axum::http::{HeaderName, HeaderValue};
use axum::response::{IntoResponseParts, ResponseParts};
use serde::Serialize;

/// Response header carrying a newly minted session token.
pub const SESSION_TOKEN_HEADER: HeaderName = HeaderName::from_static("x-session-token");

/// Standard `{ "data": T }` response envelope.
#[derive(Debug, Serialize)]
pub struct DataResponse<T: Serialize> {
    pub data: T,
}

/// Adds `X-Session-Token` to the response when a session was minted while
/// authenticating the request. A no-op otherwise.
#[derive(Debug, Clone, Default)]
pub struct ReissuedSession(pub Option<String>);

impl IntoResponseParts for ReissuedSession {
    type Error = std::convert::Infallible;

    fn into_response_parts(self, mut res: ResponseParts) -> Result<ResponseParts, Self::Error> {
        if let Some(token) = self.0 {
            match HeaderValue::from_str(&token) {
                Ok(value) => {
                    res.headers_mut().insert(SESSION_TOKEN_HEADER, value);
                }
                Err(e) => tracing::error!(error = %e, "Session token is not a valid header value"),
            }
        }
        Ok(res)
    }
}
