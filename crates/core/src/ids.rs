//! Identifier generation.
//!
//! Identifiers are random UUIDs minted in the application. Collisions are
//! astronomically unlikely but not impossible, so inserts retry with a fresh
//! identifier up to [`MAX_ID_ATTEMPTS`] times before giving up with an
//! internal error instead of looping forever.

use uuid::Uuid;

/// Upper bound on insert attempts when the store reports an id collision.
pub const MAX_ID_ATTEMPTS: usize = 20;

/// Source of fresh row identifiers.
pub trait IdGenerator: Send + Sync {
    fn next_id(&self) -> Uuid;
}

/// UUID v4 from the operating system RNG.
#[derive(Debug, Clone, Copy, Default)]
pub struct RandomIds;

impl IdGenerator for RandomIds {
    fn next_id(&self) -> Uuid {
        Uuid::new_v4()
    }
}
