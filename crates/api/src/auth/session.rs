//! Session authority: issues, validates, renews and disconnects user tokens.

use gatekeep_core::error::CoreError;
use gatekeep_core::session::{self, SessionPhase, SessionPolicy};
use gatekeep_core::types::EntityId;
use gatekeep_db::models::user::User;
use gatekeep_db::models::user_token::{CreateUserToken, SessionOrigin, UserToken};
use gatekeep_db::store::StoreError;

use super::token::Subject;
use super::{with_fresh_id, AuthContext, ClientInfo};

/// A session row together with the signed credential that refers to it.
#[derive(Debug, Clone)]
pub struct IssuedSession {
    pub session: UserToken,
    pub token: String,
}

/// Outcome of a successful validation.
///
/// When the presented session was renewed, `session` is the new row and
/// `reissued` carries its credential; the client must switch to it.
#[derive(Debug, Clone)]
pub struct ValidatedSession {
    pub session: UserToken,
    pub user: User,
    pub reissued: Option<String>,
}

#[derive(Clone)]
pub struct SessionAuthority {
    ctx: AuthContext,
    policy: SessionPolicy,
}

impl SessionAuthority {
    pub fn new(ctx: AuthContext, policy: SessionPolicy) -> Self {
        Self { ctx, policy }
    }

    pub fn policy(&self) -> &SessionPolicy {
        &self.policy
    }

    /// Insert a session for `user_id` and sign a credential for it.
    ///
    /// The origin's unique constraint makes this the single winner for a
    /// given login token or parent session; losers get `Conflict`.
    pub async fn issue(
        &self,
        user_id: EntityId,
        origin: SessionOrigin,
        client: &ClientInfo,
    ) -> Result<IssuedSession, CoreError> {
        let now = self.ctx.clock.now();
        let store = self.ctx.store.as_ref();

        let session = with_fresh_id(self.ctx.ids.as_ref(), |id| {
            let input = CreateUserToken {
                id,
                user_id,
                origin,
                ip_address: client.ip_address.clone(),
                device_label: client.device_label.clone(),
                expires_at: now + self.policy.ttl,
                created_at: now,
            };
            async move { store.insert_user_token(&input).await }
        })
        .await
        .map_err(|err| match err {
            StoreError::UniqueViolation(ref c) if c == "uq_user_tokens_from_login_token" => {
                CoreError::Conflict("Login token was already used".into())
            }
            StoreError::UniqueViolation(ref c) if c == "uq_user_tokens_from_user_token" => {
                CoreError::Conflict("Session was already renewed".into())
            }
            other => other.into(),
        })?;

        let token = self.ctx.codec.issue(
            Subject::Session {
                session_id: session.id,
            },
            now,
            self.policy.credential_lifetime(),
        )?;

        tracing::info!(
            session_id = %session.id,
            user_id = %user_id,
            origin = ?origin,
            "Session issued"
        );
        Ok(IssuedSession { session, token })
    }

    /// Check a session against its row, its owner and the clock.
    ///
    /// Checks run in order: disconnected, creation date, owner ban, then the
    /// expiry phase. A session in its grace window is renewed into a new row
    /// that points back at it. Every successful validation touches the
    /// resulting session.
    pub async fn validate(&self, session_id: EntityId) -> Result<ValidatedSession, CoreError> {
        let now = self.ctx.clock.now();

        let session = self
            .ctx
            .store
            .find_user_token(session_id)
            .await?
            .ok_or_else(|| CoreError::not_found("UserToken", session_id))?;

        if session.disconnected {
            return Err(CoreError::Forbidden("Session has been disconnected".into()));
        }
        session::check_created_at(session.created_at, now)?;

        let user = self
            .ctx
            .store
            .find_user_by_id(session.user_id)
            .await?
            .ok_or_else(|| CoreError::not_found("User", session.user_id))?;
        if user.banned {
            return Err(CoreError::Forbidden("User is banned".into()));
        }

        let validated = match session::classify(
            &self.policy,
            session.expires_at,
            session.last_activity,
            now,
        ) {
            SessionPhase::Active => ValidatedSession {
                session,
                user,
                reissued: None,
            },
            SessionPhase::RenewableGrace => self.renew(session, user).await?,
            SessionPhase::Expired => {
                return Err(CoreError::Expired("Session has expired".into()));
            }
        };

        self.touch(validated.session.id).await;
        Ok(validated)
    }

    /// Replace a session in its grace window with a fresh child row.
    ///
    /// A parent renews exactly once. When another request already renewed
    /// it, the caller is handed the existing child instead.
    async fn renew(&self, parent: UserToken, user: User) -> Result<ValidatedSession, CoreError> {
        let client = ClientInfo {
            ip_address: parent.ip_address.clone(),
            device_label: parent.device_label.clone(),
        };
        match self
            .issue(user.id, SessionOrigin::Renewal { parent: parent.id }, &client)
            .await
        {
            Ok(renewed) => {
                tracing::info!(
                    parent_id = %parent.id,
                    session_id = %renewed.session.id,
                    "Session renewed within grace window"
                );
                Ok(ValidatedSession {
                    session: renewed.session,
                    user,
                    reissued: Some(renewed.token),
                })
            }
            Err(CoreError::Conflict(msg)) => self.adopt_renewal(&parent, user, msg).await,
            Err(e) => Err(e),
        }
    }

    /// Resolve an already renewed parent to its child and sign a new
    /// credential for the child. The child must still be connected and
    /// active; otherwise the original conflict stands.
    async fn adopt_renewal(
        &self,
        parent: &UserToken,
        user: User,
        conflict: String,
    ) -> Result<ValidatedSession, CoreError> {
        let now = self.ctx.clock.now();
        let Some(child) = self.ctx.store.find_user_token_by_parent(parent.id).await? else {
            return Err(CoreError::Conflict(conflict));
        };
        if child.disconnected {
            return Err(CoreError::Forbidden("Session has been disconnected".into()));
        }
        let phase = session::classify(&self.policy, child.expires_at, child.last_activity, now);
        if phase != SessionPhase::Active {
            return Err(CoreError::Conflict(conflict));
        }

        let token = self.ctx.codec.issue(
            Subject::Session {
                session_id: child.id,
            },
            now,
            self.policy.credential_lifetime(),
        )?;
        tracing::info!(
            parent_id = %parent.id,
            session_id = %child.id,
            "Renewed session credential reissued"
        );
        Ok(ValidatedSession {
            session: child,
            user,
            reissued: Some(token),
        })
    }

    /// Record activity on a session. Failures are logged and swallowed.
    pub async fn touch(&self, session_id: EntityId) {
        let now = self.ctx.clock.now();
        match self.ctx.store.touch_user_token(session_id, now).await {
            Ok(true) => {}
            Ok(false) => tracing::warn!(%session_id, "Touched session no longer exists"),
            Err(e) => tracing::warn!(%session_id, error = %e, "Failed to record session activity"),
        }
    }

    /// Disconnect a session on behalf of its owner. Irreversible.
    pub async fn disconnect(
        &self,
        owner_id: EntityId,
        session_id: EntityId,
    ) -> Result<(), CoreError> {
        let session = self
            .ctx
            .store
            .find_user_token(session_id)
            .await?
            .ok_or_else(|| CoreError::not_found("UserToken", session_id))?;

        if session.user_id != owner_id {
            return Err(CoreError::Forbidden(
                "Session belongs to another user".into(),
            ));
        }
        if session.disconnected {
            return Err(CoreError::Conflict("Session is already disconnected".into()));
        }
        if !self.ctx.store.disconnect_user_token(session_id).await? {
            return Err(CoreError::Conflict("Session is already disconnected".into()));
        }

        tracing::info!(%session_id, user_id = %owner_id, "Session disconnected");
        Ok(())
    }
}
