//! Login token lifecycle rules.
//!
//! A login token is created for an email address, approved or denied out of
//! band exactly once, and redeemed at most once into a session. These
//! functions hold the decisions; persistence and signing live elsewhere.

use chrono::Duration;

use crate::error::CoreError;
use crate::types::Timestamp;

// ---------------------------------------------------------------------------
// Policy
// ---------------------------------------------------------------------------

/// Default lifetime of a login token.
pub const DEFAULT_LOGIN_TOKEN_TTL_MINS: i64 = 10;

/// Default cap on unexpired login tokens per email address.
pub const DEFAULT_MAX_ACTIVE: i64 = 3;

/// Default minimum spacing between login token requests once the cap is hit.
pub const DEFAULT_MIN_GAP_SECS: i64 = 60;

/// Abuse-control and lifetime settings for login tokens.
#[derive(Debug, Clone, Copy)]
pub struct LoginPolicy {
    pub ttl: Duration,
    pub max_active: i64,
    pub min_gap: Duration,
}

impl Default for LoginPolicy {
    fn default() -> Self {
        Self {
            ttl: Duration::minutes(DEFAULT_LOGIN_TOKEN_TTL_MINS),
            max_active: DEFAULT_MAX_ACTIVE,
            min_gap: Duration::seconds(DEFAULT_MIN_GAP_SECS),
        }
    }
}

// ---------------------------------------------------------------------------
// Status
// ---------------------------------------------------------------------------

/// Decision state of a login token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoginTokenStatus {
    Pending,
    Authorized,
    Denied,
}

impl LoginTokenStatus {
    /// Derive the status from the two stored flags.
    ///
    /// Both flags set is rejected by a check constraint in the store; if it
    /// ever shows up it is treated as denied.
    pub fn from_flags(authorized: bool, denied: bool) -> Self {
        match (authorized, denied) {
            (_, true) => Self::Denied,
            (true, false) => Self::Authorized,
            (false, false) => Self::Pending,
        }
    }
}

// ---------------------------------------------------------------------------
// Rules
// ---------------------------------------------------------------------------

/// Decide whether another login token may be created for an email.
///
/// `active` is the number of unexpired tokens for the email and `last_created`
/// the creation time of the newest one. Below the cap every request passes;
/// at the cap the refusal names the cooldown when the newest token is still
/// inside `min_gap`, and the active cap otherwise.
pub fn check_request_allowance(
    policy: &LoginPolicy,
    active: i64,
    last_created: Option<Timestamp>,
    now: Timestamp,
) -> Result<(), CoreError> {
    if active < policy.max_active {
        return Ok(());
    }
    Err(request_refusal(policy, last_created, now))
}

/// The rate-limit error for an email that is at its active token cap.
pub fn request_refusal(
    policy: &LoginPolicy,
    last_created: Option<Timestamp>,
    now: Timestamp,
) -> CoreError {
    if let Some(last) = last_created {
        if now - last < policy.min_gap {
            return CoreError::RateLimited(format!(
                "Please wait {} seconds before requesting another login token",
                policy.min_gap.num_seconds()
            ));
        }
    }

    CoreError::RateLimited(format!(
        "Too many active login tokens for this email (maximum {})",
        policy.max_active
    ))
}

/// Check the stored validity window of a login token row.
pub fn check_token_window(
    expires_at: Timestamp,
    created_at: Timestamp,
    now: Timestamp,
) -> Result<(), CoreError> {
    if expires_at <= now {
        return Err(CoreError::Expired("Login token has expired".into()));
    }
    if created_at > now {
        return Err(CoreError::Unauthorized("Invalid login token date".into()));
    }
    Ok(())
}

/// A login token may be approved or denied only while pending.
pub fn check_decidable(status: LoginTokenStatus) -> Result<(), CoreError> {
    match status {
        LoginTokenStatus::Pending => Ok(()),
        LoginTokenStatus::Authorized => {
            Err(CoreError::Conflict("Login token was already authorized".into()))
        }
        LoginTokenStatus::Denied => {
            Err(CoreError::Conflict("Login token was already denied".into()))
        }
    }
}

/// Only an authorized login token may be exchanged for a session.
pub fn check_redeemable(status: LoginTokenStatus) -> Result<(), CoreError> {
    match status {
        LoginTokenStatus::Authorized => Ok(()),
        LoginTokenStatus::Denied => Err(CoreError::Unauthorized("Login token denied".into())),
        LoginTokenStatus::Pending => {
            Err(CoreError::Unauthorized("Login token not authorized".into()))
        }
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;
    use chrono::{TimeZone, Utc};

    use super::*;

    fn t0() -> Timestamp {
        Utc.with_ymd_and_hms(2024, 5, 1, 9, 0, 0).unwrap()
    }

    #[test]
    fn below_cap_is_always_allowed() {
        let policy = LoginPolicy::default();
        let now = t0();
        assert!(check_request_allowance(&policy, 0, None, now).is_ok());
        assert!(check_request_allowance(&policy, 2, Some(now), now).is_ok());
    }

    #[test]
    fn at_cap_inside_gap_cites_the_cooldown() {
        let policy = LoginPolicy::default();
        let now = t0();
        let last = now - Duration::seconds(10);
        assert_matches!(
            check_request_allowance(&policy, 3, Some(last), now),
            Err(CoreError::RateLimited(msg)) if msg.contains("60 seconds")
        );
    }

    #[test]
    fn at_cap_after_gap_cites_the_cap() {
        let policy = LoginPolicy::default();
        let now = t0();
        let last = now - Duration::minutes(2);
        assert_matches!(
            check_request_allowance(&policy, 3, Some(last), now),
            Err(CoreError::RateLimited(msg)) if msg.contains("maximum 3")
        );
    }

    #[test]
    fn window_rejects_expired_and_future_rows() {
        let now = t0();
        assert!(check_token_window(now + Duration::minutes(1), now, now).is_ok());
        assert_matches!(
            check_token_window(now, now - Duration::minutes(10), now),
            Err(CoreError::Expired(_))
        );
        assert_matches!(
            check_token_window(now + Duration::minutes(10), now + Duration::seconds(1), now),
            Err(CoreError::Unauthorized(_))
        );
    }

    #[test]
    fn status_from_flags() {
        assert_eq!(LoginTokenStatus::from_flags(false, false), LoginTokenStatus::Pending);
        assert_eq!(LoginTokenStatus::from_flags(true, false), LoginTokenStatus::Authorized);
        assert_eq!(LoginTokenStatus::from_flags(false, true), LoginTokenStatus::Denied);
        assert_eq!(LoginTokenStatus::from_flags(true, true), LoginTokenStatus::Denied);
    }

    #[test]
    fn only_pending_tokens_are_decidable() {
        assert!(check_decidable(LoginTokenStatus::Pending).is_ok());
        assert_matches!(
            check_decidable(LoginTokenStatus::Authorized),
            Err(CoreError::Conflict(_))
        );
        assert_matches!(check_decidable(LoginTokenStatus::Denied), Err(CoreError::Conflict(_)));
    }

    #[test]
    fn only_authorized_tokens_are_redeemable() {
        assert!(check_redeemable(LoginTokenStatus::Authorized).is_ok());
        assert_matches!(
            check_redeemable(LoginTokenStatus::Pending),
            Err(CoreError::Unauthorized(msg)) if msg.contains("not authorized")
        );
        assert_matches!(
            check_redeemable(LoginTokenStatus::Denied),
            Err(CoreError::Unauthorized(msg)) if msg.contains("denied")
        );
    }
}
