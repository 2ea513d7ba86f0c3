use std::convert::Infallible;
use std::net::SocketAddr;

use axum::extract::{ConnectInfo, FromRequestParts};
use axum::http::header::USER_AGENT;
use axum::http::request::Parts;
use gatekeep_core::device::device_label;

use crate::auth::ClientInfo;

impl ClientInfo {
    /// Read the client IP and device label from a request.
    ///
    /// The IP is the first `X-Forwarded-For` entry, falling back to the
    /// socket peer address when the server was started with connect info.
    pub fn from_parts(parts: &Parts) -> Self {
        let forwarded = parts
            .headers
            .get("x-forwarded-for")
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.split(',').next())
            .map(str::trim)
            .filter(|ip| !ip.is_empty())
            .map(str::to_string);

        let ip_address = forwarded.or_else(|| {
            parts
                .extensions
                .get::<ConnectInfo<SocketAddr>>()
                .map(|ConnectInfo(addr)| addr.ip().to_string())
        });

        let device_label = parts
            .headers
            .get(USER_AGENT)
            .and_then(|v| v.to_str().ok())
            .and_then(device_label);

        Self {
            ip_address,
            device_label,
        }
    }
}

impl<S: Send + Sync> FromRequestParts<S> for ClientInfo {
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(ClientInfo::from_parts(parts))
    }
}

#[cfg(test)]
mod tests {
    use axum::http::Request;

    use super::*;

    const FIREFOX_LINUX: &str =
        "Mozilla/5.0 (X11; Linux x86_64; rv:121.0) Gecko/20100101 Firefox/121.0";

    fn parts(builder: axum::http::request::Builder) -> Parts {
        builder.body(()).unwrap().into_parts().0
    }

    #[test]
    fn forwarded_for_wins_over_peer_address() {
        let mut p = parts(
            Request::builder()
                .header("x-forwarded-for", " 203.0.113.9 , 10.0.0.1")
                .header(USER_AGENT, FIREFOX_LINUX),
        );
        p.extensions
            .insert(ConnectInfo(SocketAddr::from(([127, 0, 0, 1], 4000))));

        let info = ClientInfo::from_parts(&p);
        assert_eq!(info.ip_address.as_deref(), Some("203.0.113.9"));
        assert_eq!(info.device_label.as_deref(), Some("Linux:Mozilla Firefox"));
    }

    #[test]
    fn peer_address_is_the_fallback() {
        let mut p = parts(Request::builder());
        p.extensions
            .insert(ConnectInfo(SocketAddr::from(([192, 0, 2, 5], 4000))));

        let info = ClientInfo::from_parts(&p);
        assert_eq!(info.ip_address.as_deref(), Some("192.0.2.5"));
        assert_eq!(info.device_label, None);
    }

    #[test]
    fn nothing_known_yields_empty_info() {
        let info = ClientInfo::from_parts(&parts(Request::builder().header(USER_AGENT, "curl/8.0")));
        assert_eq!(info, ClientInfo::default());
    }
}
