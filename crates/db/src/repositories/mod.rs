//! Repository layer.
//!
//! Each repository is a zero-sized struct providing async methods
//! that accept `&PgPool` as the first argument.

pub mod admin_repo;
pub mod email_settings_repo;
pub mod login_token_repo;
pub mod user_repo;
pub mod user_token_repo;

pub use admin_repo::AdminRepo;
pub use email_settings_repo::EmailSettingsRepo;
pub use login_token_repo::LoginTokenRepo;
pub use user_repo::UserRepo;
pub use user_token_repo::UserTokenRepo;
