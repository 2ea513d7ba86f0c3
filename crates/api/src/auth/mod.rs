//! Authentication and session lifecycle.
//!
//! - [`token`] -- signed bearer token codec.
//! - [`password`] -- Argon2id password hashing for admins.
//! - [`login_token`] -- login token issuance, decision and redemption.
//! - [`session`] -- session validation, renewal and disconnection.
//! - [`gate`] -- resolves request credentials to admins or users.

use std::future::Future;
use std::sync::Arc;

use gatekeep_core::clock::Clock;
use gatekeep_core::error::CoreError;
use gatekeep_core::ids::{IdGenerator, MAX_ID_ATTEMPTS};
use gatekeep_core::types::EntityId;
use gatekeep_db::store::{AuthStore, StoreError, StoreResult};

use self::token::TokenCodec;

pub mod gate;
pub mod login_token;
pub mod password;
pub mod session;
pub mod token;

/// Handles shared by the authorities.
#[derive(Clone)]
pub struct AuthContext {
    pub store: Arc<dyn AuthStore>,
    pub codec: Arc<TokenCodec>,
    pub clock: Arc<dyn Clock>,
    pub ids: Arc<dyn IdGenerator>,
}

/// Where a request came from, as far as the client tells us.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClientInfo {
    pub ip_address: Option<String>,
    pub device_label: Option<String>,
}

impl ClientInfo {
    /// Require both the IP address and the device label to be known.
    pub fn require_complete(&self) -> Result<(), CoreError> {
        if self.ip_address.is_none() {
            return Err(CoreError::Validation("Client IP address is required".into()));
        }
        if self.device_label.is_none() {
            return Err(CoreError::Validation("Unrecognized client device".into()));
        }
        Ok(())
    }
}

/// Run an insert with freshly generated ids until one does not collide.
///
/// Only primary-key collisions are retried. After [`MAX_ID_ATTEMPTS`]
/// collisions the last one is returned, which callers surface as an
/// internal error.
pub async fn with_fresh_id<T, F, Fut>(ids: &dyn IdGenerator, mut insert: F) -> StoreResult<T>
where
    F: FnMut(EntityId) -> Fut,
    Fut: Future<Output = StoreResult<T>>,
{
    let mut attempt = 0;
    loop {
        attempt += 1;
        match insert(ids.next_id()).await {
            Err(StoreError::IdCollision(constraint)) if attempt < MAX_ID_ATTEMPTS => {
                tracing::warn!(%constraint, attempt, "Generated id collided, retrying");
            }
            Err(StoreError::IdCollision(constraint)) => {
                tracing::error!(%constraint, attempt, "Gave up allocating a unique id");
                return Err(StoreError::IdCollision(constraint));
            }
            other => return other,
        }
    }
}
