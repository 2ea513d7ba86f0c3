use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use gatekeep_core::types::{EntityId, Timestamp};

use super::{AuthStore, StoreError, StoreResult};
use crate::models::admin::{Admin, CreateAdmin, UpdateAdmin};
use crate::models::email_settings::{EmailSettings, SaveEmailSettings};
use crate::models::login_token::{CreateLoginToken, LoginToken, LoginTokenActivity};
use crate::models::user::{CreateUser, User};
use crate::models::user_token::{CreateUserToken, UserToken};

#[derive(Debug, Default)]
struct Tables {
    admins: HashMap<EntityId, Admin>,
    users: HashMap<EntityId, User>,
    login_tokens: HashMap<EntityId, LoginToken>,
    user_tokens: HashMap<EntityId, UserToken>,
    email_settings: Vec<EmailSettings>,
    fail_touches: bool,
}

/// In-memory [`AuthStore`] that enforces the same primary key, `uq_*` and
/// single-decision rules as the PostgreSQL schema.
#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent `touch_user_token` fail as if the database
    /// were unreachable.
    pub fn fail_touches(&self, fail: bool) {
        self.lock().fail_touches = fail;
    }

    /// Number of stored sessions, for asserting that nothing was minted.
    pub fn user_token_count(&self) -> usize {
        self.lock().user_tokens.len()
    }

    /// Overwrite a stored session, for arranging time-window scenarios.
    pub fn put_user_token(&self, token: UserToken) {
        self.lock().user_tokens.insert(token.id, token);
    }

    /// Overwrite a stored login token.
    pub fn put_login_token(&self, token: LoginToken) {
        self.lock().login_tokens.insert(token.id, token);
    }

    fn lock(&self) -> MutexGuard<'_, Tables> {
        self.tables.lock().unwrap_or_else(|e| e.into_inner())
    }
}

fn collision(table: &str) -> StoreError {
    StoreError::IdCollision(format!("{table}_pkey"))
}

#[async_trait]
impl AuthStore for MemoryStore {
    async fn ping(&self) -> StoreResult<()> {
        Ok(())
    }

    async fn count_admins(&self) -> StoreResult<i64> {
        Ok(self.lock().admins.len() as i64)
    }

    async fn find_admin_by_id(&self, id: EntityId) -> StoreResult<Option<Admin>> {
        Ok(self.lock().admins.get(&id).cloned())
    }

    async fn find_admin_by_username(&self, username: &str) -> StoreResult<Option<Admin>> {
        Ok(self
            .lock()
            .admins
            .values()
            .find(|a| a.username == username)
            .cloned())
    }

    async fn insert_admin(&self, input: &CreateAdmin) -> StoreResult<Admin> {
        let mut tables = self.lock();
        if tables.admins.contains_key(&input.id) {
            return Err(collision("admins"));
        }
        if tables.admins.values().any(|a| a.username == input.username) {
            return Err(StoreError::UniqueViolation("uq_admins_username".into()));
        }
        let admin = Admin {
            id: input.id,
            name: input.name.clone(),
            username: input.username.clone(),
            password_hash: input.password_hash.clone(),
            created_by: input.created_by,
            created_at: input.created_at,
            updated_at: input.created_at,
        };
        tables.admins.insert(admin.id, admin.clone());
        Ok(admin)
    }

    async fn update_admin(&self, id: EntityId, input: &UpdateAdmin) -> StoreResult<Option<Admin>> {
        let mut tables = self.lock();
        if tables
            .admins
            .values()
            .any(|a| a.id != id && a.username == input.username)
        {
            return Err(StoreError::UniqueViolation("uq_admins_username".into()));
        }
        let Some(admin) = tables.admins.get_mut(&id) else {
            return Ok(None);
        };
        admin.name = input.name.clone();
        admin.username = input.username.clone();
        if let Some(hash) = &input.password_hash {
            admin.password_hash = hash.clone();
        }
        admin.updated_at = input.updated_at;
        Ok(Some(admin.clone()))
    }

    async fn find_user_by_id(&self, id: EntityId) -> StoreResult<Option<User>> {
        Ok(self.lock().users.get(&id).cloned())
    }

    async fn find_user_by_email(&self, email: &str) -> StoreResult<Option<User>> {
        Ok(self.lock().users.values().find(|u| u.email == email).cloned())
    }

    async fn insert_user(&self, input: &CreateUser) -> StoreResult<User> {
        let mut tables = self.lock();
        if tables.users.contains_key(&input.id) {
            return Err(collision("users"));
        }
        if tables.users.values().any(|u| u.email == input.email) {
            return Err(StoreError::UniqueViolation("uq_users_email".into()));
        }
        let user = User {
            id: input.id,
            email: input.email.clone(),
            banned: false,
            created_at: input.created_at,
        };
        tables.users.insert(user.id, user.clone());
        Ok(user)
    }

    async fn set_user_banned(&self, id: EntityId, banned: bool) -> StoreResult<bool> {
        let mut tables = self.lock();
        match tables.users.get_mut(&id) {
            Some(user) if user.banned != banned => {
                user.banned = banned;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn insert_login_token(
        &self,
        input: &CreateLoginToken,
        max_active: i64,
    ) -> StoreResult<Option<LoginToken>> {
        let mut tables = self.lock();
        if tables.login_tokens.contains_key(&input.id) {
            return Err(collision("login_tokens"));
        }
        let active = tables
            .login_tokens
            .values()
            .filter(|t| t.email == input.email && t.expires_at > input.created_at)
            .count() as i64;
        if active >= max_active {
            return Ok(None);
        }
        let token = LoginToken {
            id: input.id,
            email: input.email.clone(),
            ip_address: input.ip_address.clone(),
            device_label: input.device_label.clone(),
            authorized: false,
            denied: false,
            expires_at: input.expires_at,
            created_at: input.created_at,
        };
        tables.login_tokens.insert(token.id, token.clone());
        Ok(Some(token))
    }

    async fn find_login_token(&self, id: EntityId) -> StoreResult<Option<LoginToken>> {
        Ok(self.lock().login_tokens.get(&id).cloned())
    }

    async fn login_token_activity(
        &self,
        email: &str,
        now: Timestamp,
    ) -> StoreResult<LoginTokenActivity> {
        let tables = self.lock();
        let mut activity = LoginTokenActivity::default();
        for token in tables.login_tokens.values().filter(|t| t.email == email) {
            if token.expires_at > now {
                activity.active += 1;
            }
            if activity.last_created_at.map_or(true, |last| token.created_at > last) {
                activity.last_created_at = Some(token.created_at);
            }
        }
        Ok(activity)
    }

    async fn decide_login_token(&self, id: EntityId, approve: bool) -> StoreResult<bool> {
        let mut tables = self.lock();
        match tables.login_tokens.get_mut(&id) {
            Some(token) if !token.authorized && !token.denied => {
                token.authorized = approve;
                token.denied = !approve;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn insert_user_token(&self, input: &CreateUserToken) -> StoreResult<UserToken> {
        let mut tables = self.lock();
        if tables.user_tokens.contains_key(&input.id) {
            return Err(collision("user_tokens"));
        }
        let (from_login_token, from_user_token) = input.origin.columns();
        for existing in tables.user_tokens.values() {
            if from_login_token.is_some() && existing.from_login_token == from_login_token {
                return Err(StoreError::UniqueViolation(
                    "uq_user_tokens_from_login_token".into(),
                ));
            }
            if from_user_token.is_some() && existing.from_user_token == from_user_token {
                return Err(StoreError::UniqueViolation(
                    "uq_user_tokens_from_user_token".into(),
                ));
            }
        }
        let token = UserToken {
            id: input.id,
            user_id: input.user_id,
            from_login_token,
            from_user_token,
            ip_address: input.ip_address.clone(),
            device_label: input.device_label.clone(),
            disconnected: false,
            last_activity: input.created_at,
            expires_at: input.expires_at,
            created_at: input.created_at,
        };
        tables.user_tokens.insert(token.id, token.clone());
        Ok(token)
    }

    async fn find_user_token(&self, id: EntityId) -> StoreResult<Option<UserToken>> {
        Ok(self.lock().user_tokens.get(&id).cloned())
    }

    async fn find_user_token_by_parent(
        &self,
        parent_id: EntityId,
    ) -> StoreResult<Option<UserToken>> {
        Ok(self
            .lock()
            .user_tokens
            .values()
            .find(|t| t.from_user_token == Some(parent_id))
            .cloned())
    }

    async fn touch_user_token(&self, id: EntityId, at: Timestamp) -> StoreResult<bool> {
        let mut tables = self.lock();
        if tables.fail_touches {
            return Err(StoreError::Unavailable("touches disabled".into()));
        }
        match tables.user_tokens.get_mut(&id) {
            Some(token) => {
                token.last_activity = at;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn disconnect_user_token(&self, id: EntityId) -> StoreResult<bool> {
        let mut tables = self.lock();
        match tables.user_tokens.get_mut(&id) {
            Some(token) if !token.disconnected => {
                token.disconnected = true;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn latest_email_settings(&self) -> StoreResult<Option<EmailSettings>> {
        Ok(self
            .lock()
            .email_settings
            .iter()
            .max_by_key(|s| s.created_at)
            .cloned())
    }

    async fn save_email_settings(&self, input: &SaveEmailSettings) -> StoreResult<EmailSettings> {
        let mut tables = self.lock();
        if tables.email_settings.iter().any(|s| s.id == input.id) {
            return Err(collision("email_settings"));
        }
        let previous_password = tables
            .email_settings
            .iter()
            .max_by_key(|s| s.created_at)
            .and_then(|s| s.password_encrypted.clone());
        let settings = EmailSettings {
            id: input.id,
            host: input.host.clone(),
            port: input.port,
            username: input.username.clone(),
            password_encrypted: input.password_encrypted.clone().or(previous_password),
            created_at: input.created_at,
        };
        tables.email_settings.push(settings.clone());
        Ok(settings)
    }
}
