use std::sync::Arc;

use gatekeep_core::clock::Clock;
use gatekeep_core::crypto::SettingsCipher;
use gatekeep_core::ids::IdGenerator;
use gatekeep_db::store::AuthStore;

use crate::auth::gate::AuthenticationGate;
use crate::auth::login_token::LoginTokenAuthority;
use crate::auth::password::Passwords;
use crate::auth::session::SessionAuthority;
use crate::auth::token::TokenCodec;
use crate::auth::AuthContext;
use crate::config::ServerConfig;
use crate::mail::MailTransport;

/// The swappable backends behind [`AppState`].
///
/// Production wires PostgreSQL, SMTP and the system clock; tests substitute
/// in-memory versions.
pub struct Backends {
    pub store: Arc<dyn AuthStore>,
    pub mailer: Arc<dyn MailTransport>,
    pub clock: Arc<dyn Clock>,
    pub ids: Arc<dyn IdGenerator>,
}

/// Shared application state available to all Axum handlers via `State<AppState>`.
///
/// This is cheaply cloneable (inner data is behind `Arc` or is already `Clone`).
#[derive(Clone)]
pub struct AppState {
    /// Row persistence.
    pub store: Arc<dyn AuthStore>,
    /// Server configuration.
    pub config: Arc<ServerConfig>,
    pub clock: Arc<dyn Clock>,
    pub ids: Arc<dyn IdGenerator>,
    pub codec: Arc<TokenCodec>,
    pub passwords: Arc<Passwords>,
    /// Encrypts settings secrets at rest.
    pub cipher: Arc<SettingsCipher>,
    pub mailer: Arc<dyn MailTransport>,
    pub login_tokens: LoginTokenAuthority,
    pub sessions: SessionAuthority,
    pub gate: AuthenticationGate,
}

impl AppState {
    /// Wire the authorities on top of the given backends.
    pub fn new(config: ServerConfig, passwords: Passwords, backends: Backends) -> Self {
        let Backends {
            store,
            mailer,
            clock,
            ids,
        } = backends;

        let codec = Arc::new(TokenCodec::new(&config.token));
        let cipher = Arc::new(SettingsCipher::new(&config.settings_key.0));

        let ctx = AuthContext {
            store: Arc::clone(&store),
            codec: Arc::clone(&codec),
            clock: Arc::clone(&clock),
            ids: Arc::clone(&ids),
        };
        let sessions = SessionAuthority::new(ctx.clone(), config.session);
        let login_tokens = LoginTokenAuthority::new(
            ctx.clone(),
            config.login,
            config.require_client_fingerprint,
            sessions.clone(),
        );
        let gate = AuthenticationGate::new(ctx, login_tokens.clone(), sessions.clone());

        Self {
            store,
            config: Arc::new(config),
            clock,
            ids,
            codec,
            passwords: Arc::new(passwords),
            cipher,
            mailer,
            login_tokens,
            sessions,
            gate,
        }
    }
}
