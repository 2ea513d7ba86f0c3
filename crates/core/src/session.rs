//! Session (user token) lifecycle rules.
//!
//! A session is `Active` until `expires_at`. After that it may still be
//! renewed for a bounded grace window, provided it was in use recently and
//! had not already gone stale when it died: both `last_activity` and
//! `expires_at` must fall inside the window.

use chrono::Duration;

use crate::error::CoreError;
use crate::types::Timestamp;

/// Default lifetime of a session.
pub const DEFAULT_SESSION_TTL_DAYS: i64 = 30;

/// Default lookback window for silent renewal of an expired session.
pub const DEFAULT_GRACE_DAYS: i64 = 3;

#[derive(Debug, Clone, Copy)]
pub struct SessionPolicy {
    pub ttl: Duration,
    pub grace: Duration,
}

impl Default for SessionPolicy {
    fn default() -> Self {
        Self {
            ttl: Duration::days(DEFAULT_SESSION_TTL_DAYS),
            grace: Duration::days(DEFAULT_GRACE_DAYS),
        }
    }
}

impl SessionPolicy {
    /// How long a signed session credential stays verifiable.
    ///
    /// The credential outlives the row's `expires_at` by the grace window.
    /// The row state decides whether it is actually renewed.
    pub fn credential_lifetime(&self) -> Duration {
        self.ttl + self.grace
    }
}

/// Where a (non-disconnected) session sits on its timeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
    Active,
    RenewableGrace,
    Expired,
}

/// Classify a session by its expiry and last activity.
pub fn classify(
    policy: &SessionPolicy,
    expires_at: Timestamp,
    last_activity: Timestamp,
    now: Timestamp,
) -> SessionPhase {
    if expires_at > now {
        return SessionPhase::Active;
    }

    let gap = now - policy.grace;
    if last_activity > gap && expires_at > gap {
        SessionPhase::RenewableGrace
    } else {
        SessionPhase::Expired
    }
}

/// Clock-integrity check: a session cannot have been created in the future.
pub fn check_created_at(created_at: Timestamp, now: Timestamp) -> Result<(), CoreError> {
    if created_at > now {
        return Err(CoreError::Unauthorized("Invalid user token date".into()));
    }
    Ok(())
}
