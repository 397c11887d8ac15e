use jsonwebtoken::{DecodingKey, EncodingKey};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use time::{Date, OffsetDateTime};
use uuid::Uuid;

use super::repo::AccountProfile;

/// Token type used to distinguish Access and Refresh JWTs.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum TokenKind {
    #[serde(alias = "Access")]
    Access,
    #[serde(alias = "Refresh")]
    Refresh,
}

/// Standard JWT claims used in the app.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    pub sub: Uuid,       // account ID
    pub exp: usize,      // expiration time
    pub iat: usize,      // issued at
    pub iss: String,     // issuer
    pub aud: String,     // audience
    pub kind: TokenKind, // access or refresh
}

/// Holds JWT signing and verification keys with config data.
#[derive(Clone)]
pub struct JwtKeys {
    pub encoding: EncodingKey,
    pub decoding: DecodingKey,
    pub issuer: String,
    pub audience: String,
    pub access_ttl: Duration,
    pub refresh_ttl: Duration,
}

/// Request body for account registration.
#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub username: String,
    pub email: String,
    pub password: String,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
}

/// Request body for login.
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// Request body for token refresh.
#[derive(Debug, Deserialize)]
pub struct RefreshRequest {
    pub refresh_token: String,
}

/// Partial profile edit; absent fields are left untouched.
#[derive(Debug, Deserialize)]
pub struct UpdateProfileRequest {
    pub phone_number: Option<String>,
    pub date_of_birth: Option<Date>,
    pub profile_picture: Option<String>,
    pub bio: Option<String>,
}

/// Response returned after login, register or refresh.
#[derive(Debug, Serialize)]
pub struct AuthResponse {
    pub access_token: String,
    pub refresh_token: String,
    pub account: PublicAccount,
}

/// Public part of the account returned to the client.
#[derive(Debug, Serialize)]
pub struct PublicAccount {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub full_name: String,
}

#[derive(Debug, Serialize)]
pub struct ProfileResponse {
    pub phone_number: Option<String>,
    pub date_of_birth: Option<Date>,
    pub profile_picture: Option<String>,
    pub bio: Option<String>,
    pub is_verified: bool,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

impl From<AccountProfile> for ProfileResponse {
    fn from(p: AccountProfile) -> Self {
        Self {
            phone_number: p.phone_number,
            date_of_birth: p.date_of_birth,
            profile_picture: p.profile_picture,
            bio: p.bio,
            is_verified: p.is_verified,
            created_at: p.created_at,
            updated_at: p.updated_at,
        }
    }
}

/// Account plus its profile attributes, as served by /me.
#[derive(Debug, Serialize)]
pub struct AccountDetails {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub full_name: String,
    pub short_name: String,
    pub created_at: OffsetDateTime,
    pub profile: ProfileResponse,
}
