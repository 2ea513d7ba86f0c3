//! Login token authority.
//!
//! A login token is requested for an email address, approved or denied from
//! the link mailed to that address, and finally redeemed by the requesting
//! device into a session.

use gatekeep_core::error::CoreError;
use gatekeep_core::login_token::{self as rules, LoginPolicy};
use gatekeep_core::types::{EntityId, Timestamp};
use gatekeep_core::validation::normalize_email;
use gatekeep_db::models::login_token::{CreateLoginToken, LoginToken};
use gatekeep_db::models::user::{CreateUser, User};
use gatekeep_db::models::user_token::SessionOrigin;
use gatekeep_db::store::StoreError;

use super::session::{IssuedSession, SessionAuthority};
use super::token::{Claims, Subject};
use super::{with_fresh_id, AuthContext, ClientInfo};

/// A stored login token and its two signed credentials.
#[derive(Debug, Clone)]
pub struct IssuedLoginToken {
    pub login_token: LoginToken,
    /// Returned to the requesting device for the handoff.
    pub token: String,
    /// Mailed to the address owner for [`LoginTokenAuthority::decide`].
    pub approval_token: String,
}

/// A login token exchanged for a session.
#[derive(Debug, Clone)]
pub struct RedeemedLogin {
    pub user: User,
    pub session: IssuedSession,
}

#[derive(Clone)]
pub struct LoginTokenAuthority {
    ctx: AuthContext,
    policy: LoginPolicy,
    require_client_fingerprint: bool,
    sessions: SessionAuthority,
}

impl LoginTokenAuthority {
    pub fn new(
        ctx: AuthContext,
        policy: LoginPolicy,
        require_client_fingerprint: bool,
        sessions: SessionAuthority,
    ) -> Self {
        Self {
            ctx,
            policy,
            require_client_fingerprint,
            sessions,
        }
    }

    /// Create a pending login token for `email`.
    pub async fn request_login(
        &self,
        email: &str,
        client: &ClientInfo,
    ) -> Result<IssuedLoginToken, CoreError> {
        if self.require_client_fingerprint {
            client.require_complete()?;
        }
        let email = normalize_email(email)?;
        let store = self.ctx.store.as_ref();

        if let Some(user) = store.find_user_by_email(&email).await? {
            if user.banned {
                return Err(CoreError::Forbidden("User is banned".into()));
            }
        }

        let now = self.ctx.clock.now();
        let activity = store.login_token_activity(&email, now).await?;
        if let Err(e) =
            rules::check_request_allowance(&self.policy, activity.active, activity.last_created_at, now)
        {
            tracing::warn!(%email, active = activity.active, "Login token request rate limited");
            return Err(e);
        }

        let max_active = self.policy.max_active;
        let inserted = with_fresh_id(self.ctx.ids.as_ref(), |id| {
            let input = CreateLoginToken {
                id,
                email: email.clone(),
                ip_address: client.ip_address.clone(),
                device_label: client.device_label.clone(),
                expires_at: now + self.policy.ttl,
                created_at: now,
            };
            async move { store.insert_login_token(&input, max_active).await }
        })
        .await?;

        // A concurrent request for the same email filled the last slot.
        let Some(login_token) = inserted else {
            let activity = store.login_token_activity(&email, now).await?;
            tracing::warn!(%email, active = activity.active, "Login token request rate limited");
            return Err(rules::request_refusal(
                &self.policy,
                activity.last_created_at,
                now,
            ));
        };

        let login_token_id = login_token.id;
        let token = self
            .ctx
            .codec
            .issue(Subject::Login { login_token_id }, now, self.policy.ttl)?;
        let approval_token =
            self.ctx
                .codec
                .issue(Subject::Approval { login_token_id }, now, self.policy.ttl)?;

        tracing::info!(%login_token_id, %email, "Login token issued");
        Ok(IssuedLoginToken {
            login_token,
            token,
            approval_token,
        })
    }

    /// Approve or deny a pending login token with its approval credential.
    /// Each token is decided once.
    pub async fn decide(&self, approval_token: &str, approve: bool) -> Result<LoginToken, CoreError> {
        let (login_token, now) = self.load(approval_token, Claims::approval_id).await?;
        rules::check_token_window(login_token.expires_at, login_token.created_at, now)?;
        rules::check_decidable(login_token.status())?;

        if !self.ctx.store.decide_login_token(login_token.id, approve).await? {
            return Err(CoreError::Conflict("Login token was already decided".into()));
        }

        tracing::info!(login_token_id = %login_token.id, approve, "Login token decided");
        Ok(LoginToken {
            authorized: approve,
            denied: !approve,
            ..login_token
        })
    }

    /// Exchange an authorized login token for a session.
    ///
    /// The user is created on first sign-in. A login token yields at most
    /// one session; later attempts fail with `Conflict`.
    pub async fn redeem(&self, token: &str, client: &ClientInfo) -> Result<RedeemedLogin, CoreError> {
        if self.require_client_fingerprint {
            client.require_complete()?;
        }
        let (login_token, now) = self.load(token, Claims::login_token_id).await?;
        rules::check_token_window(login_token.expires_at, login_token.created_at, now)?;
        rules::check_redeemable(login_token.status())?;

        let user = self.find_or_create_user(&login_token.email, now).await?;
        if user.banned {
            return Err(CoreError::Forbidden("User is banned".into()));
        }

        let session = self
            .sessions
            .issue(user.id, SessionOrigin::LoginToken(login_token.id), client)
            .await?;

        tracing::info!(
            login_token_id = %login_token.id,
            user_id = %user.id,
            "Login token redeemed"
        );
        Ok(RedeemedLogin { user, session })
    }

    /// Verify a signed credential of the expected kind and load the row it
    /// names.
    async fn load(
        &self,
        token: &str,
        kind: fn(&Claims) -> Option<EntityId>,
    ) -> Result<(LoginToken, Timestamp), CoreError> {
        let now = self.ctx.clock.now();
        let claims = self.ctx.codec.verify(token, now)?;
        let id = kind(&claims).ok_or_else(|| CoreError::Unauthorized("Invalid token".into()))?;

        let login_token = self
            .ctx
            .store
            .find_login_token(id)
            .await?
            .ok_or_else(|| CoreError::not_found("LoginToken", id))?;
        Ok((login_token, now))
    }

    async fn find_or_create_user(&self, email: &str, now: Timestamp) -> Result<User, CoreError> {
        let store = self.ctx.store.as_ref();
        if let Some(user) = store.find_user_by_email(email).await? {
            return Ok(user);
        }

        let created = with_fresh_id(self.ctx.ids.as_ref(), |id| {
            let input = CreateUser {
                id,
                email: email.to_string(),
                created_at: now,
            };
            async move { store.insert_user(&input).await }
        })
        .await;

        match created {
            Ok(user) => {
                tracing::info!(user_id = %user.id, %email, "User created on first sign-in");
                Ok(user)
            }
            // Another redemption for the same address created the user first.
            Err(StoreError::UniqueViolation(_)) => store
                .find_user_by_email(email)
                .await?
                .ok_or_else(|| CoreError::Internal(format!("User {email} vanished after insert"))),
            Err(e) => Err(e.into()),
        }
    }
}
