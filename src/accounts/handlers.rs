use axum::{
    extract::{FromRef, State},
    http::StatusCode,
    routing::{get, post, put},
    Json, Router,
};
use tracing::{error, info, instrument, warn};

use crate::state::AppState;

use super::{
    dto::{
        AccountDetails, AuthResponse, LoginRequest, PublicAccount, RefreshRequest,
        RegisterRequest, UpdateProfileRequest,
    },
    extractors::AuthAccount,
    repo::{Account, AccountProfile, NewAccount, ProfileChanges},
    services::{
        hash_password, is_valid_email, register_account, verify_password, JwtKeys,
    },
};

pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/auth/register", post(register))
        .route("/auth/login", post(login))
        .route("/auth/refresh", post(refresh))
}

pub fn me_routes() -> Router<AppState> {
    Router::new()
        .route("/me", get(get_me))
        .route("/me/profile", put(update_profile))
}

#[instrument(skip(state, payload))]
pub async fn register(
    State(state): State<AppState>,
    Json(mut payload): Json<RegisterRequest>,
) -> Result<Json<AuthResponse>, (StatusCode, String)> {
    payload.email = payload.email.trim().to_lowercase();
    payload.username = payload.username.trim().to_string();

    if payload.username.is_empty() {
        warn!("empty username");
        return Err((StatusCode::BAD_REQUEST, "Username is required".into()));
    }

    if !is_valid_email(&payload.email) {
        warn!(email = %payload.email, "invalid email");
        return Err((StatusCode::BAD_REQUEST, "Invalid email".into()));
    }

    if payload.password.len() < 8 {
        warn!("password too short");
        return Err((StatusCode::BAD_REQUEST, "Password too short".into()));
    }

    // Ensure email is not taken
    if let Ok(Some(_)) = Account::find_by_email(&state.db, &payload.email).await {
        warn!(email = %payload.email, "email already registered");
        return Err((StatusCode::CONFLICT, "Email already registered".into()));
    }

    let hash = match hash_password(&payload.password) {
        Ok(h) => h,
        Err(e) => {
            error!(error = %e, "hash_password failed");
            return Err((StatusCode::INTERNAL_SERVER_ERROR, e.to_string()));
        }
    };

    let new = NewAccount {
        username: &payload.username,
        email: &payload.email,
        first_name: payload.first_name.trim(),
        last_name: payload.last_name.trim(),
        password_hash: &hash,
    };
    let (account, _profile) = match register_account(&state.db, new).await {
        Ok(pair) => pair,
        Err(e) => {
            error!(error = %e, "create account failed");
            return Err((StatusCode::INTERNAL_SERVER_ERROR, e.to_string()));
        }
    };

    let keys = JwtKeys::from_ref(&state);
    let access_token = match keys.sign_access(account.id) {
        Ok(t) => t,
        Err(e) => {
            error!(error = %e, "jwt sign access failed");
            return Err((StatusCode::INTERNAL_SERVER_ERROR, e.to_string()));
        }
    };
    let refresh_token = match keys.sign_refresh(account.id) {
        Ok(t) => t,
        Err(e) => {
            error!(error = %e, "jwt sign refresh failed");
            return Err((StatusCode::INTERNAL_SERVER_ERROR, e.to_string()));
        }
    };

    info!(account_id = %account.id, email = %account.email, "account registered");
    Ok(Json(AuthResponse {
        access_token,
        refresh_token,
        account: public(account),
    }))
}

#[instrument(skip(state, payload))]
pub async fn login(
    State(state): State<AppState>,
    Json(mut payload): Json<LoginRequest>,
) -> Result<Json<AuthResponse>, (StatusCode, String)> {
    payload.email = payload.email.trim().to_lowercase();

    if !is_valid_email(&payload.email) {
        warn!(email = %payload.email, "invalid email");
        return Err((StatusCode::BAD_REQUEST, "Invalid email".into()));
    }

    let account = match Account::find_by_email(&state.db, &payload.email).await {
        Ok(Some(a)) => a,
        Ok(None) => {
            warn!(email = %payload.email, "login unknown email");
            return Err((StatusCode::UNAUTHORIZED, "Invalid credentials".into()));
        }
        Err(e) => {
            error!(error = %e, "find_by_email failed");
            return Err((StatusCode::INTERNAL_SERVER_ERROR, e.to_string()));
        }
    };

    let ok = match verify_password(&payload.password, &account.password_hash) {
        Ok(v) => v,
        Err(e) => {
            error!(error = %e, "verify_password failed");
            return Err((StatusCode::INTERNAL_SERVER_ERROR, e.to_string()));
        }
    };

    if !ok {
        warn!(email = %payload.email, account_id = %account.id, "login invalid password");
        return Err((StatusCode::UNAUTHORIZED, "Invalid credentials".into()));
    }

    let keys = JwtKeys::from_ref(&state);
    let access_token = match keys.sign_access(account.id) {
        Ok(t) => t,
        Err(e) => {
            error!(error = %e, "jwt sign access failed");
            return Err((StatusCode::INTERNAL_SERVER_ERROR, e.to_string()));
        }
    };
    let refresh_token = match keys.sign_refresh(account.id) {
        Ok(t) => t,
        Err(e) => {
            error!(error = %e, "jwt sign refresh failed");
            return Err((StatusCode::INTERNAL_SERVER_ERROR, e.to_string()));
        }
    };

    info!(account_id = %account.id, email = %account.email, "account logged in");
    Ok(Json(AuthResponse {
        access_token,
        refresh_token,
        account: public(account),
    }))
}

#[instrument(skip(state, payload))]
pub async fn refresh(
    State(state): State<AppState>,
    Json(payload): Json<RefreshRequest>,
) -> Result<Json<AuthResponse>, (StatusCode, String)> {
    let keys = JwtKeys::from_ref(&state);
    let claims = keys
        .verify_refresh(&payload.refresh_token)
        .map_err(|e| (StatusCode::UNAUTHORIZED, format!("{}", e)))?;

    // Issue new pair
    let access_token = keys
        .sign_access(claims.sub)
        .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))?;
    let refresh_token = keys
        .sign_refresh(claims.sub)
        .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))?;

    let account = Account::find_by_id(&state.db, claims.sub)
        .await
        .ok()
        .flatten()
        .ok_or((StatusCode::UNAUTHORIZED, "Account not found".to_string()))?;

    Ok(Json(AuthResponse {
        access_token,
        refresh_token,
        account: public(account),
    }))
}

#[instrument(skip(state))]
pub async fn get_me(
    State(state): State<AppState>,
    AuthAccount(account_id): AuthAccount,
) -> Result<Json<AccountDetails>, (StatusCode, String)> {
    let account = Account::find_by_id(&state.db, account_id)
        .await
        .map_err(|e| {
            error!(error = %e, account_id = %account_id, "find_by_id failed");
            (StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
        })?
        .ok_or((StatusCode::UNAUTHORIZED, "Account not found".to_string()))?;

    let profile = AccountProfile::find_by_account(&state.db, account_id)
        .await
        .map_err(|e| {
            error!(error = %e, account_id = %account_id, "load profile failed");
            (StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
        })?
        .ok_or((StatusCode::NOT_FOUND, "Profile not found".to_string()))?;

    Ok(Json(details(account, profile)))
}

#[instrument(skip(state, payload))]
pub async fn update_profile(
    State(state): State<AppState>,
    AuthAccount(account_id): AuthAccount,
    Json(payload): Json<UpdateProfileRequest>,
) -> Result<Json<AccountDetails>, (StatusCode, String)> {
    if let Some(bio) = &payload.bio {
        if bio.len() > 500 {
            warn!(account_id = %account_id, "bio too long");
            return Err((StatusCode::BAD_REQUEST, "Bio too long (max 500)".into()));
        }
    }

    let changes = ProfileChanges {
        phone_number: payload.phone_number,
        date_of_birth: payload.date_of_birth,
        profile_picture: payload.profile_picture,
        bio: payload.bio,
    };

    let profile = AccountProfile::update(&state.db, account_id, &changes)
        .await
        .map_err(|e| {
            error!(error = %e, account_id = %account_id, "update profile failed");
            (StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
        })?
        .ok_or((StatusCode::NOT_FOUND, "Profile not found".to_string()))?;

    let account = Account::find_by_id(&state.db, account_id)
        .await
        .ok()
        .flatten()
        .ok_or((StatusCode::UNAUTHORIZED, "Account not found".to_string()))?;

    info!(account_id = %account_id, "profile updated");
    Ok(Json(details(account, profile)))
}

fn public(account: Account) -> PublicAccount {
    let full_name = account.full_name();
    PublicAccount {
        id: account.id,
        username: account.username,
        email: account.email,
        full_name,
    }
}

fn details(account: Account, profile: AccountProfile) -> AccountDetails {
    AccountDetails {
        full_name: account.full_name(),
        short_name: account.short_name().to_string(),
        id: account.id,
        username: account.username,
        email: account.email,
        created_at: account.created_at,
        profile: profile.into(),
    }
}

#[cfg(test)]
mod response_tests {
    use super::*;
    use uuid::Uuid;

    #[test]
    fn public_account_serialization_uses_computed_full_name() {
        let account = Account {
            id: Uuid::new_v4(),
            username: "ada".into(),
            email: "ada@example.com".into(),
            first_name: "Ada".into(),
            last_name: "Lovelace".into(),
            password_hash: "secret".into(),
            created_at: time::OffsetDateTime::now_utc(),
        };

        let json = serde_json::to_string(&public(account)).unwrap();
        assert!(json.contains("Ada Lovelace"));
        assert!(json.contains("ada@example.com"));
        assert!(!json.contains("secret"));
    }
}
