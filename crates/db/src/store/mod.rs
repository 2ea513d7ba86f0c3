//! The persistence seam used by the authorities.
//!
//! [`AuthStore`] lists every row operation the lifecycle engine needs.
//! [`PgStore`] implements it over the repositories; [`MemoryStore`] (behind
//! the `test-support` feature) implements the same contract, constraints
//! included, without a database.

use async_trait::async_trait;
use gatekeep_core::error::CoreError;
use gatekeep_core::types::{EntityId, Timestamp};

use crate::models::admin::{Admin, CreateAdmin, UpdateAdmin};
use crate::models::email_settings::{EmailSettings, SaveEmailSettings};
use crate::models::login_token::{CreateLoginToken, LoginToken, LoginTokenActivity};
use crate::models::user::{CreateUser, User};
use crate::models::user_token::{CreateUserToken, UserToken};

#[cfg(any(test, feature = "test-support"))]
mod memory;
mod pg;

#[cfg(any(test, feature = "test-support"))]
pub use memory::MemoryStore;
pub use pg::PgStore;

/// PostgreSQL SQLSTATE for `unique_violation`.
const UNIQUE_VIOLATION: &str = "23505";
/// PostgreSQL SQLSTATE for `check_violation`.
const CHECK_VIOLATION: &str = "23514";

/// Failure of a store operation.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// A freshly generated primary key already exists. Callers retry with a
    /// new id.
    #[error("Identifier collision on {0}")]
    IdCollision(String),

    /// A named `uq_*` constraint rejected the write.
    #[error("Unique constraint violated: {0}")]
    UniqueViolation(String),

    #[error("Check constraint violated: {0}")]
    CheckViolation(String),

    #[error("Database error: {0}")]
    Database(#[source] sqlx::Error),

    #[error("Store unavailable: {0}")]
    Unavailable(String),
}

pub type StoreResult<T> = Result<T, StoreError>;

impl StoreError {
    /// Name of the violated constraint, if any.
    pub fn constraint(&self) -> Option<&str> {
        match self {
            StoreError::IdCollision(c)
            | StoreError::UniqueViolation(c)
            | StoreError::CheckViolation(c) => Some(c),
            _ => None,
        }
    }
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        if let sqlx::Error::Database(db_err) = &err {
            let constraint = db_err.constraint().unwrap_or("unknown").to_string();
            match db_err.code().as_deref() {
                Some(UNIQUE_VIOLATION) if constraint.ends_with("_pkey") => {
                    return StoreError::IdCollision(constraint);
                }
                Some(UNIQUE_VIOLATION) if constraint.starts_with("uq_") => {
                    return StoreError::UniqueViolation(constraint);
                }
                Some(CHECK_VIOLATION) => return StoreError::CheckViolation(constraint),
                _ => {}
            }
        }
        match err {
            sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed => {
                StoreError::Unavailable(err.to_string())
            }
            other => StoreError::Database(other),
        }
    }
}

/// Flattens store failures for callers that have no specific handling.
///
/// Unique violations become conflicts; everything else is internal.
impl From<StoreError> for CoreError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::UniqueViolation(constraint) => {
                CoreError::Conflict(format!("Duplicate value violates {constraint}"))
            }
            other => CoreError::Internal(other.to_string()),
        }
    }
}

/// Row persistence for admins, users, login tokens, sessions and settings.
#[async_trait]
pub trait AuthStore: Send + Sync {
    /// Cheap round trip used by the health endpoint.
    async fn ping(&self) -> StoreResult<()>;

    // -- admins --

    async fn count_admins(&self) -> StoreResult<i64>;
    async fn find_admin_by_id(&self, id: EntityId) -> StoreResult<Option<Admin>>;
    async fn find_admin_by_username(&self, username: &str) -> StoreResult<Option<Admin>>;
    async fn insert_admin(&self, input: &CreateAdmin) -> StoreResult<Admin>;
    async fn update_admin(&self, id: EntityId, input: &UpdateAdmin) -> StoreResult<Option<Admin>>;

    // -- users --

    async fn find_user_by_id(&self, id: EntityId) -> StoreResult<Option<User>>;
    async fn find_user_by_email(&self, email: &str) -> StoreResult<Option<User>>;
    async fn insert_user(&self, input: &CreateUser) -> StoreResult<User>;
    /// Returns `true` only if the flag changed.
    async fn set_user_banned(&self, id: EntityId, banned: bool) -> StoreResult<bool>;

    // -- login tokens --

    /// Insert a pending token unless `max_active` unexpired tokens already
    /// exist for its email. The count and the insert are atomic per email;
    /// `None` means the cap was reached.
    async fn insert_login_token(
        &self,
        input: &CreateLoginToken,
        max_active: i64,
    ) -> StoreResult<Option<LoginToken>>;
    async fn find_login_token(&self, id: EntityId) -> StoreResult<Option<LoginToken>>;
    async fn login_token_activity(
        &self,
        email: &str,
        now: Timestamp,
    ) -> StoreResult<LoginTokenActivity>;
    /// Set exactly one decision flag on a pending token. Returns `false` if
    /// the token was no longer pending.
    async fn decide_login_token(&self, id: EntityId, approve: bool) -> StoreResult<bool>;

    // -- user tokens --

    async fn insert_user_token(&self, input: &CreateUserToken) -> StoreResult<UserToken>;
    async fn find_user_token(&self, id: EntityId) -> StoreResult<Option<UserToken>>;
    /// The session created by renewing `parent_id`.
    async fn find_user_token_by_parent(
        &self,
        parent_id: EntityId,
    ) -> StoreResult<Option<UserToken>>;
    async fn touch_user_token(&self, id: EntityId, at: Timestamp) -> StoreResult<bool>;
    /// Returns `false` if the session was already disconnected or missing.
    async fn disconnect_user_token(&self, id: EntityId) -> StoreResult<bool>;

    // -- email settings --

    async fn latest_email_settings(&self) -> StoreResult<Option<EmailSettings>>;
    async fn save_email_settings(&self, input: &SaveEmailSettings) -> StoreResult<EmailSettings>;
}
