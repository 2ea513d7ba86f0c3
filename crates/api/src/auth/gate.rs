//! The single entry point that turns a presented credential into a verified
//! admin or user.

use gatekeep_core::error::CoreError;
use gatekeep_db::models::admin::Admin;
use gatekeep_db::models::user::User;
use gatekeep_db::models::user_token::UserToken;

use super::login_token::LoginTokenAuthority;
use super::session::SessionAuthority;
use super::{AuthContext, ClientInfo};

/// A credential presented by an end user.
#[derive(Debug, Clone, Copy)]
pub enum UserCredential<'a> {
    /// Signed login token from the `X-Login-Token` handoff header.
    Handoff(&'a str),
    /// Signed session token from `Authorization: Bearer`.
    Session(&'a str),
}

/// A user whose session passed every check.
#[derive(Debug, Clone)]
pub struct AuthenticatedUser {
    pub user: User,
    pub session: UserToken,
    /// Set when a new session credential was minted during this request
    /// (handoff redemption or grace renewal).
    pub reissued: Option<String>,
}

#[derive(Clone)]
pub struct AuthenticationGate {
    ctx: AuthContext,
    logins: LoginTokenAuthority,
    sessions: SessionAuthority,
}

impl AuthenticationGate {
    pub fn new(ctx: AuthContext, logins: LoginTokenAuthority, sessions: SessionAuthority) -> Self {
        Self {
            ctx,
            logins,
            sessions,
        }
    }

    /// Resolve an admin bearer token.
    ///
    /// A token for an admin that no longer exists is reported exactly like
    /// a bad token.
    pub async fn authenticate_admin(&self, token: &str) -> Result<Admin, CoreError> {
        let claims = self.ctx.codec.verify(token, self.ctx.clock.now())?;
        let admin_id = claims
            .admin_id()
            .ok_or_else(|| CoreError::Unauthorized("Invalid token".into()))?;

        self.ctx
            .store
            .find_admin_by_id(admin_id)
            .await?
            .ok_or_else(|| {
                tracing::debug!(%admin_id, "Admin token refers to a missing admin");
                CoreError::Unauthorized("Invalid token".into())
            })
    }

    /// Resolve a user credential, redeeming or renewing as needed.
    pub async fn authenticate_user(
        &self,
        credential: UserCredential<'_>,
        client: &ClientInfo,
    ) -> Result<AuthenticatedUser, CoreError> {
        let token = match credential {
            // A fresh redemption has passed every session check already;
            // nothing after the mint may fail.
            UserCredential::Handoff(token) => {
                let redeemed = self.logins.redeem(token, client).await?;
                return Ok(AuthenticatedUser {
                    user: redeemed.user,
                    session: redeemed.session.session,
                    reissued: Some(redeemed.session.token),
                });
            }
            UserCredential::Session(token) => token,
        };

        let claims = self.ctx.codec.verify(token, self.ctx.clock.now())?;
        let session_id = claims
            .session_id()
            .ok_or_else(|| CoreError::Unauthorized("Invalid token".into()))?;

        let validated = self
            .sessions
            .validate(session_id)
            .await
            .map_err(|e| match e {
                CoreError::NotFound { .. } => CoreError::Unauthorized("Invalid session".into()),
                other => other,
            })?;

        Ok(AuthenticatedUser {
            user: validated.user,
            session: validated.session,
            reissued: validated.reissued,
        })
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use assert_matches::assert_matches;
    use chrono::{Duration, TimeZone, Utc};
    use gatekeep_core::clock::ManualClock;
    use gatekeep_core::ids::RandomIds;
    use gatekeep_core::login_token::LoginPolicy;
    use gatekeep_core::session::SessionPolicy;
    use gatekeep_core::types::Timestamp;
    use gatekeep_db::models::admin::CreateAdmin;
    use gatekeep_db::store::{AuthStore, MemoryStore};
    use uuid::Uuid;

    use super::*;
    use crate::auth::token::{Subject, TokenCodec, TokenConfig};

    struct Harness {
        store: Arc<MemoryStore>,
        clock: Arc<ManualClock>,
        codec: Arc<TokenCodec>,
        logins: LoginTokenAuthority,
        gate: AuthenticationGate,
    }

    fn t0() -> Timestamp {
        Utc.with_ymd_and_hms(2024, 4, 2, 15, 0, 0).unwrap()
    }

    fn harness() -> Harness {
        let store = Arc::new(MemoryStore::new());
        let clock = Arc::new(ManualClock::new(t0()));
        let codec = Arc::new(TokenCodec::new(&TokenConfig {
            secret: "gate-test-secret".into(),
            clock_skew_secs: 0,
            admin_token_ttl_hours: 1,
        }));
        let ctx = AuthContext {
            store: store.clone(),
            codec: codec.clone(),
            clock: clock.clone(),
            ids: Arc::new(RandomIds),
        };
        let sessions = SessionAuthority::new(ctx.clone(), SessionPolicy::default());
        let logins =
            LoginTokenAuthority::new(ctx.clone(), LoginPolicy::default(), false, sessions.clone());
        Harness {
            store,
            clock,
            codec,
            logins: logins.clone(),
            gate: AuthenticationGate::new(ctx, logins, sessions),
        }
    }

    async fn authorized_login(h: &Harness) -> String {
        let issued = h
            .logins
            .request_login("a@b.com", &ClientInfo::default())
            .await
            .unwrap();
        h.logins.decide(&issued.approval_token, true).await.unwrap();
        issued.token
    }

    // -- admin path ----------------------------------------------------------

    #[tokio::test]
    async fn admin_token_resolves_admin() {
        let h = harness();
        let admin = h
            .store
            .insert_admin(&CreateAdmin {
                id: Uuid::new_v4(),
                name: "Root".into(),
                username: "root".into(),
                password_hash: "x".into(),
                created_by: None,
                created_at: t0(),
            })
            .await
            .unwrap();
        let token = h
            .codec
            .issue(Subject::Admin { admin_id: admin.id }, t0(), Duration::hours(1))
            .unwrap();

        assert_eq!(h.gate.authenticate_admin(&token).await.unwrap().id, admin.id);

        h.clock.advance(Duration::hours(1));
        assert_matches!(
            h.gate.authenticate_admin(&token).await,
            Err(CoreError::Expired(_))
        );
    }

    #[tokio::test]
    async fn unknown_admin_and_wrong_kind_are_unauthorized() {
        let h = harness();
        let ghost = h
            .codec
            .issue(
                Subject::Admin {
                    admin_id: Uuid::new_v4(),
                },
                t0(),
                Duration::hours(1),
            )
            .unwrap();
        assert_matches!(
            h.gate.authenticate_admin(&ghost).await,
            Err(CoreError::Unauthorized(_))
        );

        let login = authorized_login(&h).await;
        assert_matches!(
            h.gate.authenticate_admin(&login).await,
            Err(CoreError::Unauthorized(_))
        );
        assert_matches!(
            h.gate.authenticate_admin("garbage").await,
            Err(CoreError::Unauthorized(_))
        );
    }

    // -- user path -----------------------------------------------------------

    #[tokio::test]
    async fn handoff_redeems_and_returns_session_token() {
        let h = harness();
        let login = authorized_login(&h).await;

        let authed = h
            .gate
            .authenticate_user(UserCredential::Handoff(&login), &ClientInfo::default())
            .await
            .unwrap();
        let session_token = authed.reissued.expect("handoff must mint a session token");

        let again = h
            .gate
            .authenticate_user(UserCredential::Session(&session_token), &ClientInfo::default())
            .await
            .unwrap();
        assert_eq!(again.session.id, authed.session.id);
        assert!(again.reissued.is_none());

        assert_matches!(
            h.gate
                .authenticate_user(UserCredential::Handoff(&login), &ClientInfo::default())
                .await,
            Err(CoreError::Conflict(_))
        );
    }

    #[tokio::test]
    async fn session_token_for_missing_row_is_unauthorized() {
        let h = harness();
        let token = h
            .codec
            .issue(
                Subject::Session {
                    session_id: Uuid::new_v4(),
                },
                t0(),
                Duration::days(1),
            )
            .unwrap();
        assert_matches!(
            h.gate
                .authenticate_user(UserCredential::Session(&token), &ClientInfo::default())
                .await,
            Err(CoreError::Unauthorized(_))
        );
    }

    #[tokio::test]
    async fn login_token_is_not_a_session_token() {
        let h = harness();
        let login = authorized_login(&h).await;
        assert_matches!(
            h.gate
                .authenticate_user(UserCredential::Session(&login), &ClientInfo::default())
                .await,
            Err(CoreError::Unauthorized(_))
        );
    }
}
