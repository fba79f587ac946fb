use axum::{
    extract::{FromRef, Path, State},
    http::StatusCode,
    routing::{post, put},
    Json, Router,
};
use lazy_static::lazy_static;
use regex::Regex;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::{
    accounts::{
        account::{AccountPatch, NewAccount},
        dto::{
            AccountResponse, AuthResponse, LoginRequest, MessageResponse, RegisterRequest,
            UpdateRequest,
        },
        password::{hash_password, verify_password},
        token::{AuthAccount, SessionKeys},
    },
    error::ApiError,
    state::AppState,
};

pub fn account_routes() -> Router<AppState> {
    Router::new()
        .route("/auth/register", post(register))
        .route("/auth/login", post(login))
        .route(
            "/auth/users/:id",
            put(update_account).delete(delete_account),
        )
}

fn is_valid_email(email: &str) -> bool {
    lazy_static! {
        static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
    }
    EMAIL_RE.is_match(email)
}

#[instrument(skip(state, payload))]
pub async fn register(
    State(state): State<AppState>,
    Json(mut payload): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<AuthResponse>), ApiError> {
    payload.username = payload.username.trim().to_string();
    payload.email = payload.email.trim().to_lowercase();

    if payload.username.is_empty() {
        warn!("registration missing username");
        return Err(ApiError::Validation("Username is required".into()));
    }
    if payload.email.is_empty() {
        warn!("registration missing email");
        return Err(ApiError::Validation("Email is required".into()));
    }
    if !is_valid_email(&payload.email) {
        warn!(email = %payload.email, "invalid email");
        return Err(ApiError::Validation("Invalid email".into()));
    }
    if payload.password.is_empty() {
        warn!("registration missing password");
        return Err(ApiError::Validation("Password is required".into()));
    }

    // Ensure email is not taken
    if state.store.find_by_email(&payload.email).await?.is_some() {
        warn!(email = %payload.email, "email already registered");
        return Err(ApiError::Conflict("Email already registered".into()));
    }

    let password_hash = hash_password(&payload.password)?;
    let account = state
        .store
        .create(NewAccount {
            username: payload.username,
            email: payload.email,
            password_hash,
        })
        .await?;

    let token = SessionKeys::from_ref(&state).sign(account.id)?;

    info!(account_id = %account.id, email = %account.email, "account registered");
    Ok((
        StatusCode::CREATED,
        Json(AuthResponse {
            token,
            user: account.into(),
        }),
    ))
}

#[instrument(skip(state, payload))]
pub async fn login(
    State(state): State<AppState>,
    Json(mut payload): Json<LoginRequest>,
) -> Result<Json<AuthResponse>, ApiError> {
    payload.email = payload.email.trim().to_lowercase();

    // Unknown email and wrong password get the same answer so callers
    // cannot probe which emails exist.
    let Some(account) = state.store.find_by_email(&payload.email).await? else {
        warn!(email = %payload.email, "login unknown email");
        return Err(ApiError::Auth("Invalid credentials".into()));
    };

    if !verify_password(&payload.password, &account.password_hash)? {
        warn!(account_id = %account.id, "login invalid password");
        return Err(ApiError::Auth("Invalid credentials".into()));
    }

    let token = SessionKeys::from_ref(&state).sign(account.id)?;

    info!(account_id = %account.id, email = %account.email, "user logged in");
    Ok(Json(AuthResponse {
        token,
        user: account.into(),
    }))
}

#[instrument(skip(state, payload))]
pub async fn update_account(
    State(state): State<AppState>,
    AuthAccount(caller): AuthAccount,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateRequest>,
) -> Result<Json<AccountResponse>, ApiError> {
    if caller != id {
        warn!(%caller, %id, "session token does not match account");
        return Err(ApiError::Auth("You can only modify your own account".into()));
    }

    let Some(existing) = state.store.find_by_id(id).await? else {
        warn!(%id, "update for unknown account");
        return Err(ApiError::NotFound("Account not found".into()));
    };

    // Empty-after-trim fields count as "not supplied"; the reference
    // client always posts password: "" when it is unchanged.
    let mut patch = AccountPatch::default();

    if let Some(username) = payload.username {
        let username = username.trim().to_string();
        if !username.is_empty() {
            patch.username = Some(username);
        }
    }

    if let Some(email) = payload.email {
        let email = email.trim().to_lowercase();
        if !email.is_empty() && email != existing.email {
            if !is_valid_email(&email) {
                warn!(email = %email, "invalid email");
                return Err(ApiError::Validation("Invalid email".into()));
            }
            if state.store.find_by_email(&email).await?.is_some() {
                warn!(email = %email, "email already registered");
                return Err(ApiError::Conflict("Email already registered".into()));
            }
            patch.email = Some(email);
        }
    }

    if let Some(password) = payload.password {
        if !password.is_empty() {
            patch.password_hash = Some(hash_password(&password)?);
        }
    }

    let Some(account) = state.store.update(id, patch).await? else {
        return Err(ApiError::NotFound("Account not found".into()));
    };

    info!(account_id = %account.id, "account updated");
    Ok(Json(AccountResponse {
        user: account.into(),
    }))
}

#[instrument(skip(state))]
pub async fn delete_account(
    State(state): State<AppState>,
    AuthAccount(caller): AuthAccount,
    Path(id): Path<Uuid>,
) -> Result<Json<MessageResponse>, ApiError> {
    if caller != id {
        warn!(%caller, %id, "session token does not match account");
        return Err(ApiError::Auth("You can only modify your own account".into()));
    }

    if !state.store.delete(id).await? {
        warn!(%id, "delete for unknown account");
        return Err(ApiError::NotFound("Account not found".into()));
    }

    info!(account_id = %id, "account deleted");
    Ok(Json(MessageResponse {
        message: "Account deleted".into(),
    }))
}
