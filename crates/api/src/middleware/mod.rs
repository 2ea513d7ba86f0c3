//! Request extractors for authentication and client metadata.
//!
//! - [`auth::AuthAdmin`] -- requires an admin bearer token.
//! - [`auth::AuthUser`] -- requires a user session (or the login handoff header).
//! - [`client`] -- derives [`ClientInfo`](crate::auth::ClientInfo) from headers and the peer address.

pub mod auth;
pub mod client;
