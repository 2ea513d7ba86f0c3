//! Row models and DTOs, one submodule per table.

pub mod admin;
pub mod email_settings;
pub mod login_token;
pub mod user;
pub mod user_token;
