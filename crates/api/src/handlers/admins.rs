//! Handlers for the `/admins` resource (sign-in, registration, profile).

use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::Json;
use gatekeep_core::error::CoreError;
use gatekeep_core::validation::{check_password_confirmation, require_non_blank};
use gatekeep_db::models::admin::{AdminResponse, CreateAdmin, UpdateAdmin};
use gatekeep_db::store::StoreError;
use serde::{Deserialize, Serialize};

use crate::auth::token::Subject;
use crate::auth::with_fresh_id;
use crate::error::{AppError, AppResult};
use crate::middleware::auth::{bearer_token, AuthAdmin};
use crate::response::DataResponse;
use crate::state::AppState;

// ---------------------------------------------------------------------------
// Request / response types
// ---------------------------------------------------------------------------

/// Request body for `POST /admins/login`.
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

/// Successful admin sign-in.
#[derive(Debug, Serialize)]
pub struct AuthResponse {
    pub token: String,
    /// Token lifetime in seconds.
    pub expires_in: i64,
    pub admin: AdminResponse,
}

/// Request body for `POST /admins`.
#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub name: String,
    pub username: String,
    pub password: String,
    pub repeat_password: String,
}

/// Request body for `PUT /admins/me`. The password is only changed when
/// `password` is present.
#[derive(Debug, Deserialize)]
pub struct UpdateMeRequest {
    pub name: String,
    pub username: String,
    pub password: Option<String>,
    pub repeat_password: Option<String>,
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// POST /api/v1/admins/login
///
/// Authenticate with username + password and return a signed admin token.
pub async fn login(
    State(state): State<AppState>,
    Json(input): Json<LoginRequest>,
) -> AppResult<Json<AuthResponse>> {
    require_non_blank("Username", &input.username)?;
    require_non_blank("Password", &input.password)?;

    let invalid = || AppError::Core(CoreError::Unauthorized("Invalid username or password".into()));

    let Some(admin) = state
        .store
        .find_admin_by_username(input.username.trim())
        .await?
    else {
        state.passwords.verify_absent(&input.password);
        return Err(invalid());
    };

    let password_valid = state
        .passwords
        .verify(&input.password, &admin.password_hash)
        .map_err(|e| AppError::InternalError(format!("Password verification error: {e}")))?;
    if !password_valid {
        tracing::info!(username = %admin.username, "Admin sign-in rejected");
        return Err(invalid());
    }

    let ttl = state.config.token.admin_token_ttl();
    let token = state
        .codec
        .issue(Subject::Admin { admin_id: admin.id }, state.clock.now(), ttl)
        .map_err(CoreError::from)?;

    tracing::info!(admin_id = %admin.id, "Admin signed in");
    Ok(Json(AuthResponse {
        token,
        expires_in: ttl.num_seconds(),
        admin: AdminResponse::from(&admin),
    }))
}

/// POST /api/v1/admins
///
/// Register an admin. Open while no admin exists so the first one can be
/// created; afterwards an admin token is required and recorded as creator.
pub async fn register(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(input): Json<RegisterRequest>,
) -> AppResult<(StatusCode, Json<DataResponse<AdminResponse>>)> {
    let created_by = if state.store.count_admins().await? == 0 {
        None
    } else {
        let token = bearer_token(&headers)?;
        Some(state.gate.authenticate_admin(token).await?.id)
    };

    require_non_blank("Name", &input.name)?;
    require_non_blank("Username", &input.username)?;
    check_password_confirmation(&input.password, &input.repeat_password)?;
    state.passwords.check_strength(&input.password)?;

    let password_hash = hash_password(&state, &input.password)?;
    let now = state.clock.now();
    let store = state.store.as_ref();

    let created = with_fresh_id(state.ids.as_ref(), |id| {
        let dto = CreateAdmin {
            id,
            name: input.name.trim().to_string(),
            username: input.username.trim().to_string(),
            password_hash: password_hash.clone(),
            created_by,
            created_at: now,
        };
        async move { store.insert_admin(&dto).await }
    })
    .await
    .map_err(username_taken)?;

    tracing::info!(admin_id = %created.id, created_by = ?created_by, "Admin registered");
    Ok((
        StatusCode::CREATED,
        Json(DataResponse {
            data: AdminResponse::from(&created),
        }),
    ))
}

/// GET /api/v1/admins/me
pub async fn me(AuthAdmin(admin): AuthAdmin) -> Json<DataResponse<AdminResponse>> {
    Json(DataResponse {
        data: AdminResponse::from(&admin),
    })
}

/// PUT /api/v1/admins/me
///
/// Update the signed-in admin's name, username and, optionally, password.
pub async fn update_me(
    State(state): State<AppState>,
    AuthAdmin(admin): AuthAdmin,
    Json(input): Json<UpdateMeRequest>,
) -> AppResult<Json<DataResponse<AdminResponse>>> {
    require_non_blank("Name", &input.name)?;
    require_non_blank("Username", &input.username)?;

    let password_hash = match input.password.as_deref().filter(|p| !p.is_empty()) {
        Some(password) => {
            check_password_confirmation(password, input.repeat_password.as_deref().unwrap_or(""))?;
            state.passwords.check_strength(password)?;
            Some(hash_password(&state, password)?)
        }
        None => None,
    };

    let dto = UpdateAdmin {
        name: input.name.trim().to_string(),
        username: input.username.trim().to_string(),
        password_hash,
        updated_at: state.clock.now(),
    };

    let updated = state
        .store
        .update_admin(admin.id, &dto)
        .await
        .map_err(username_taken)?
        .ok_or_else(|| AppError::Core(CoreError::not_found("Admin", admin.id)))?;

    tracing::info!(
        admin_id = %admin.id,
        password_changed = dto.password_hash.is_some(),
        "Admin profile updated"
    );
    Ok(Json(DataResponse {
        data: AdminResponse::from(&updated),
    }))
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn hash_password(state: &AppState, password: &str) -> AppResult<String> {
    state
        .passwords
        .hash(password)
        .map_err(|e| AppError::InternalError(format!("Password hashing error: {e}")))
}

fn username_taken(err: StoreError) -> AppError {
    match err {
        StoreError::UniqueViolation(ref c) if c == "uq_admins_username" => {
            AppError::Core(CoreError::Conflict("Username is already taken".into()))
        }
        other => other.into(),
    }
}
