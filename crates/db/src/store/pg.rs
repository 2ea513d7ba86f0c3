use async_trait::async_trait;
use gatekeep_core::types::{EntityId, Timestamp};

use super::{AuthStore, StoreResult};
use crate::models::admin::{Admin, CreateAdmin, UpdateAdmin};
use crate::models::email_settings::{EmailSettings, SaveEmailSettings};
use crate::models::login_token::{CreateLoginToken, LoginToken, LoginTokenActivity};
use crate::models::user::{CreateUser, User};
use crate::models::user_token::{CreateUserToken, UserToken};
use crate::repositories::{
    AdminRepo, EmailSettingsRepo, LoginTokenRepo, UserRepo, UserTokenRepo,
};
use crate::DbPool;

/// [`AuthStore`] backed by a PostgreSQL pool.
///
/// The pool is handed in by the caller and owned here; cloning the store
/// clones the pool handle.
#[derive(Debug, Clone)]
pub struct PgStore {
    pool: DbPool,
}

impl PgStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &DbPool {
        &self.pool
    }
}

#[async_trait]
impl AuthStore for PgStore {
    async fn ping(&self) -> StoreResult<()> {
        Ok(crate::health_check(&self.pool).await?)
    }

    async fn count_admins(&self) -> StoreResult<i64> {
        Ok(AdminRepo::count(&self.pool).await?)
    }

    async fn find_admin_by_id(&self, id: EntityId) -> StoreResult<Option<Admin>> {
        Ok(AdminRepo::find_by_id(&self.pool, id).await?)
    }

    async fn find_admin_by_username(&self, username: &str) -> StoreResult<Option<Admin>> {
        Ok(AdminRepo::find_by_username(&self.pool, username).await?)
    }

    async fn insert_admin(&self, input: &CreateAdmin) -> StoreResult<Admin> {
        Ok(AdminRepo::create(&self.pool, input).await?)
    }

    async fn update_admin(&self, id: EntityId, input: &UpdateAdmin) -> StoreResult<Option<Admin>> {
        Ok(AdminRepo::update(&self.pool, id, input).await?)
    }

    async fn find_user_by_id(&self, id: EntityId) -> StoreResult<Option<User>> {
        Ok(UserRepo::find_by_id(&self.pool, id).await?)
    }

    async fn find_user_by_email(&self, email: &str) -> StoreResult<Option<User>> {
        Ok(UserRepo::find_by_email(&self.pool, email).await?)
    }

    async fn insert_user(&self, input: &CreateUser) -> StoreResult<User> {
        Ok(UserRepo::create(&self.pool, input).await?)
    }

    async fn set_user_banned(&self, id: EntityId, banned: bool) -> StoreResult<bool> {
        Ok(UserRepo::set_banned(&self.pool, id, banned).await?)
    }

    async fn insert_login_token(
        &self,
        input: &CreateLoginToken,
        max_active: i64,
    ) -> StoreResult<Option<LoginToken>> {
        Ok(LoginTokenRepo::create_within_cap(&self.pool, input, max_active).await?)
    }

    async fn find_login_token(&self, id: EntityId) -> StoreResult<Option<LoginToken>> {
        Ok(LoginTokenRepo::find_by_id(&self.pool, id).await?)
    }

    async fn login_token_activity(
        &self,
        email: &str,
        now: Timestamp,
    ) -> StoreResult<LoginTokenActivity> {
        Ok(LoginTokenRepo::activity(&self.pool, email, now).await?)
    }

    async fn decide_login_token(&self, id: EntityId, approve: bool) -> StoreResult<bool> {
        Ok(LoginTokenRepo::decide(&self.pool, id, approve).await?)
    }

    async fn insert_user_token(&self, input: &CreateUserToken) -> StoreResult<UserToken> {
        Ok(UserTokenRepo::create(&self.pool, input).await?)
    }

    async fn find_user_token(&self, id: EntityId) -> StoreResult<Option<UserToken>> {
        Ok(UserTokenRepo::find_by_id(&self.pool, id).await?)
    }

    async fn find_user_token_by_parent(
        &self,
        parent_id: EntityId,
    ) -> StoreResult<Option<UserToken>> {
        Ok(UserTokenRepo::find_by_parent(&self.pool, parent_id).await?)
    }

    async fn touch_user_token(&self, id: EntityId, at: Timestamp) -> StoreResult<bool> {
        Ok(UserTokenRepo::touch(&self.pool, id, at).await?)
    }

    async fn disconnect_user_token(&self, id: EntityId) -> StoreResult<bool> {
        Ok(UserTokenRepo::disconnect(&self.pool, id).await?)
    }

    async fn latest_email_settings(&self) -> StoreResult<Option<EmailSettings>> {
        Ok(EmailSettingsRepo::latest(&self.pool).await?)
    }

    async fn save_email_settings(&self, input: &SaveEmailSettings) -> StoreResult<EmailSettings> {
        Ok(EmailSettingsRepo::save(&self.pool, input).await?)
    }
}
