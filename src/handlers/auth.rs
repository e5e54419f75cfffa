//! Authentication handlers

use crate::error::{AppError, AppResult};
use crate::models::*;
use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use axum::{extract::State, http::StatusCode, Extension, Json};
use chrono::{Duration, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;
use uuid::Uuid;
use validator::Validate;

use super::extract::ApiJson;
use super::AppState;
use crate::policy::Identity;

const INVALID_CREDENTIALS: &str = "Invalid email or password";

// =============================================================================
// Bearer Tokens
// =============================================================================

/// Claims carried by every bearer token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// User id
    pub sub: String,
    pub email: String,
    pub iat: i64,
    pub exp: i64,
}

/// HS256 signing material plus token lifetime.
pub struct TokenKeys {
    encoding: EncodingKey,
    decoding: DecodingKey,
    ttl: Duration,
}

impl TokenKeys {
    pub fn new(secret: &str, ttl_hours: i64) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            ttl: Duration::hours(ttl_hours),
        }
    }

    pub fn issue(&self, user_id: Uuid, email: &str) -> AppResult<String> {
        let now = Utc::now();
        let claims = Claims {
            sub: user_id.to_string(),
            email: email.to_string(),
            iat: now.timestamp(),
            exp: (now + self.ttl).timestamp(),
        };
        jsonwebtoken::encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
            .map_err(|e| AppError::internal(format!("Failed to sign token: {}", e)))
    }

    /// Verify signature and expiry and return the user id.
    pub fn verify(&self, token: &str) -> AppResult<Uuid> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_required_spec_claims(&["sub", "exp", "iat"]);

        let data = jsonwebtoken::decode::<Claims>(token, &self.decoding, &validation).map_err(
            |e| match e.kind() {
                jsonwebtoken::errors::ErrorKind::ExpiredSignature => {
                    AppError::Unauthorized("Session expired, please log in again".to_string())
                }
                _ => AppError::Unauthorized("Invalid token".to_string()),
            },
        )?;

        Uuid::parse_str(&data.claims.sub)
            .map_err(|_| AppError::Unauthorized("Invalid token".to_string()))
    }
}

// =============================================================================
// Endpoints
// =============================================================================

/// Register a citizen account
pub async fn register(
    State(state): State<AppState>,
    ApiJson(input): ApiJson<RegisterRequest>,
) -> AppResult<(StatusCode, Json<ApiResponse<AuthResponse>>)> {
    input.validate()?;

    let email = input.email.trim().to_lowercase();
    if state.store.get_user_by_email(&email).await?.is_some() {
        return Err(AppError::conflict("Email is already registered"));
    }

    let password_hash = hash_password(&input.password)?;
    let user = User::new(
        email,
        password_hash,
        input.full_name.trim().to_string(),
        Role::Citizen,
        None,
    );
    let user = state.store.create_user(&user).await?;
    let token = state.tokens.issue(user.id, &user.email)?;

    tracing::info!("Registered citizen {}", user.id);

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::success(AuthResponse {
            token,
            user: user.into(),
        })),
    ))
}

/// Exchange credentials for a bearer token
pub async fn login(
    State(state): State<AppState>,
    ApiJson(input): ApiJson<LoginRequest>,
) -> AppResult<Json<ApiResponse<AuthResponse>>> {
    let email = input.email.trim().to_lowercase();

    // Don't reveal whether the email exists, not even through response time
    let Some(user) = state.store.get_user_by_email(&email).await? else {
        if let Some(hash) = unknown_user_hash() {
            let _ = verify_password(&input.password, hash);
        }
        return Err(AppError::Unauthorized(INVALID_CREDENTIALS.to_string()));
    };

    if !verify_password(&input.password, &user.password_hash)? {
        tracing::warn!("Failed login for user {}", user.id);
        return Err(AppError::Unauthorized(INVALID_CREDENTIALS.to_string()));
    }

    let token = state.tokens.issue(user.id, &user.email)?;
    tracing::info!("User {} logged in", user.id);

    Ok(Json(ApiResponse::success(AuthResponse {
        token,
        user: user.into(),
    })))
}

/// Current user
pub async fn me(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
) -> AppResult<Json<ApiResponse<UserResponse>>> {
    let user = state
        .store
        .get_user(identity.id)
        .await?
        .ok_or_else(|| AppError::not_found("User not found"))?;
    Ok(Json(ApiResponse::success(user.into())))
}

// =============================================================================
// Password Utilities
// =============================================================================

/// Hash a password using Argon2
pub fn hash_password(password: &str) -> AppResult<String> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| AppError::internal(format!("Failed to hash password: {}", e)))
}

/// Hash checked when the email is unknown, so the Argon2 cost is paid either way.
fn unknown_user_hash() -> Option<&'static str> {
    static HASH: OnceLock<Option<String>> = OnceLock::new();
    HASH.get_or_init(|| hash_password("no-such-user").ok()).as_deref()
}

/// Check a password against a stored PHC string
pub fn verify_password(password: &str, stored_hash: &str) -> AppResult<bool> {
    let parsed = PasswordHash::new(stored_hash).map_err(|e| {
        tracing::error!("Invalid password hash in store: {}", e);
        AppError::internal("Authentication error")
    })?;
    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_roundtrip() {
        let keys = TokenKeys::new("test-secret", 1);
        let id = Uuid::new_v4();
        let token = keys.issue(id, "a@x.com").unwrap();
        assert_eq!(keys.verify(&token).unwrap(), id);
    }

    #[test]
    fn test_token_from_other_secret_rejected() {
        let token = TokenKeys::new("one", 1).issue(Uuid::new_v4(), "a@x.com").unwrap();
        assert!(matches!(
            TokenKeys::new("two", 1).verify(&token),
            Err(AppError::Unauthorized(_))
        ));
    }

    #[test]
    fn test_expired_token_rejected() {
        // Negative lifetime puts `exp` well past the default leeway
        let keys = TokenKeys::new("test-secret", -2);
        let token = keys.issue(Uuid::new_v4(), "a@x.com").unwrap();
        assert!(matches!(keys.verify(&token), Err(AppError::Unauthorized(ref m)) if m.contains("expired")));
    }

    #[test]
    fn test_garbage_token_rejected() {
        let keys = TokenKeys::new("test-secret", 1);
        assert!(keys.verify("not.a.jwt").is_err());
    }

    #[test]
    fn test_password_hash_and_verify() {
        let hash = hash_password("secret1").unwrap();
        assert_ne!(hash, "secret1");
        assert!(verify_password("secret1", &hash).unwrap());
        assert!(!verify_password("wrong", &hash).unwrap());
    }

    #[test]
    fn test_unknown_user_hash_is_a_valid_phc_string() {
        let hash = unknown_user_hash().unwrap();
        assert!(hash.starts_with("$argon2"));
        assert!(!verify_password("password1", hash).unwrap());
        assert_eq!(unknown_user_hash(), Some(hash));
    }

    #[test]
    fn test_corrupt_hash_is_internal_error() {
        assert!(matches!(
            verify_password("secret1", "not-a-phc-string"),
            Err(AppError::Internal(_))
        ));
    }
}
