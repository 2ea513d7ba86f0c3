//! Request handlers, one submodule per resource.
//!
//! Handlers stay thin: they extract the principal, validate the request body,
//! delegate to the authorities in [`crate::auth`] or the store, and map
//! errors via [`AppError`](crate::error::AppError).

pub mod admins;
pub mod email_settings;
pub mod login_tokens;
pub mod user_tokens;
pub mod users;
