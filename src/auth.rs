use argon2::{Argon2, PasswordHash, PasswordHasher, PasswordVerifier};
use axum::{
    extract::{FromRef, FromRequestParts},
    http::{header, request::Parts},
};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode, errors::ErrorKind};
use password_hash::{SaltString, rand_core::OsRng};
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;
use uuid::Uuid;

use crate::{
    config::AppConfig,
    error::ApiError,
    models::{Role, User},
    repository::RepositoryState,
};

/// Claims
///
/// Payload of the bearer tokens issued at signup and login.
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    /// Subject (sub): the user's id.
    pub sub: Uuid,
    /// Role at issue time. Informational for the client; the server re-reads the stored role.
    pub role: Role,
    /// Expiration Time (exp): fixed at issue, there is no refresh.
    pub exp: usize,
    /// Issued At (iat).
    pub iat: usize,
}

/// AuthUser
///
/// The resolved identity of an authenticated request, as attached to the request context
/// by the access-control middleware.
#[derive(Debug, Clone, PartialEq)]
pub struct AuthUser {
    pub id: Uuid,
    pub role: Role,
}

/// issue_token
///
/// Signs an HS256 token for `user` that expires `jwt_ttl_seconds` after now.
pub fn issue_token(config: &AppConfig, user: &User) -> Result<String, ApiError> {
    let now = chrono::Utc::now().timestamp().max(0) as usize;
    let exp = usize::try_from(config.jwt_ttl_seconds)
        .ok()
        .and_then(|ttl| now.checked_add(ttl))
        .ok_or_else(|| ApiError::Internal("token lifetime out of range".to_string()))?;
    let claims = Claims {
        sub: user.id,
        role: user.role,
        iat: now,
        exp,
    };
    let key = EncodingKey::from_secret(config.jwt_secret.as_bytes());
    Ok(encode(&Header::default(), &claims, &key)?)
}

/// decode_token
///
/// Verifies signature and expiry. Every failure kind collapses to the same 401.
pub fn decode_token(config: &AppConfig, token: &str) -> Result<Claims, ApiError> {
    let decoding_key = DecodingKey::from_secret(config.jwt_secret.as_bytes());
    let mut validation = Validation::default();
    validation.validate_exp = true;
    // Expiry is not negotiable: no grace period.
    validation.leeway = 0;

    decode::<Claims>(token, &decoding_key, &validation)
        .map(|data| data.claims)
        .map_err(|e| match e.kind() {
            ErrorKind::ExpiredSignature => ApiError::Unauthenticated("Token expired"),
            _ => ApiError::Unauthenticated("Invalid token"),
        })
}

/// hash_password
///
/// Argon2 hash with a fresh random salt, encoded as a PHC string.
pub fn hash_password(password: &str) -> Result<String, ApiError> {
    let salt = SaltString::generate(&mut OsRng);
    Ok(Argon2::default()
        .hash_password(password.as_bytes(), &salt)?
        .to_string())
}

/// verify_password
///
/// False for a wrong password and for a hash that cannot be parsed.
pub fn verify_password(password: &str, hashed: &str) -> bool {
    let Ok(hashed) = PasswordHash::new(hashed) else {
        return false;
    };
    Argon2::default()
        .verify_password(password.as_bytes(), &hashed)
        .is_ok()
}

/// Stand-in hash verified when a login names an unknown email, so that path costs the
/// same Argon2 work as a wrong password.
static DUMMY_HASH: LazyLock<Option<String>> =
    LazyLock::new(|| hash_password("not-the-password-of-anyone").ok());

/// hash_password_blocking
///
/// [`hash_password`] on the blocking pool, off the async workers.
pub async fn hash_password_blocking(password: String) -> Result<String, ApiError> {
    tokio::task::spawn_blocking(move || hash_password(&password)).await?
}

/// verify_password_blocking
///
/// [`verify_password`] on the blocking pool. With no stored hash the dummy hash is
/// verified instead and the result is always false.
pub async fn verify_password_blocking(
    password: String,
    stored: Option<String>,
) -> Result<bool, ApiError> {
    let verified = tokio::task::spawn_blocking(move || match stored {
        Some(hashed) => verify_password(&password, &hashed),
        None => {
            if let Some(dummy) = DUMMY_HASH.as_deref() {
                verify_password(&password, dummy);
            }
            false
        }
    })
    .await?;
    Ok(verified)
}

/// AuthUser Extractor Implementation
///
/// Resolution order:
/// 1. Context: an identity already attached by the access-control middleware is reused.
/// 2. Token extraction: `Authorization: Bearer <token>`.
/// 3. Token validation: signature and expiry.
/// 4. Store lookup: the user must still exist; the stored role is authoritative.
///
/// Rejection: `ApiError::Unauthenticated` (401) on any failure.
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
    RepositoryState: FromRef<S>,
    AppConfig: FromRef<S>,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        if let Some(user) = parts.extensions.get::<AuthUser>() {
            return Ok(user.clone());
        }

        let repo = RepositoryState::from_ref(state);
        let config = AppConfig::from_ref(state);

        let auth_header = parts
            .headers
            .get(header::AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .ok_or(ApiError::Unauthenticated("No token, authorization denied"))?;

        let token = auth_header
            .strip_prefix("Bearer ")
            .ok_or(ApiError::Unauthenticated("No token, authorization denied"))?;

        let claims = decode_token(&config, token)?;

        let user = repo
            .get_user(claims.sub)
            .await?
            .ok_or(ApiError::Unauthenticated("Invalid token"))?;

        let auth_user = AuthUser {
            id: user.id,
            role: user.role,
        };
        parts.extensions.insert(auth_user.clone());
        Ok(auth_user)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn user(role: Role) -> User {
        User {
            id: Uuid::new_v4(),
            name: "Test".into(),
            email: "test@example.com".into(),
            password_hash: String::new(),
            role,
            items_owned: vec![],
            cart_items: vec![],
            created_at: Utc::now(),
        }
    }

    #[test]
    fn issued_tokens_decode_with_the_same_secret() {
        let config = AppConfig::default();
        let owner = user(Role::Owner);
        let token = issue_token(&config, &owner).unwrap();

        let claims = decode_token(&config, &token).unwrap();
        assert_eq!(claims.sub, owner.id);
        assert_eq!(claims.role, Role::Owner);
        assert_eq!(claims.exp - claims.iat, config.jwt_ttl_seconds as usize);
    }

    #[test]
    fn tokens_signed_elsewhere_are_rejected() {
        let token = issue_token(
            &AppConfig {
                jwt_secret: "another-secret".into(),
                ..AppConfig::default()
            },
            &user(Role::Renter),
        )
        .unwrap();

        let err = decode_token(&AppConfig::default(), &token).unwrap_err();
        assert!(matches!(err, ApiError::Unauthenticated(_)));
    }

    #[test]
    fn password_round_trip() {
        let hashed = hash_password("hunter22").unwrap();
        assert!(hashed.starts_with("$argon2"));
        assert!(verify_password("hunter22", &hashed));
        assert!(!verify_password("hunter23", &hashed));
        assert!(!verify_password("hunter22", "not-a-phc-string"));
    }

    #[test]
    fn oversized_lifetime_is_an_error_not_a_panic() {
        let config = AppConfig {
            jwt_ttl_seconds: u64::MAX,
            ..AppConfig::default()
        };
        let err = issue_token(&config, &user(Role::Owner)).unwrap_err();
        assert!(matches!(err, ApiError::Internal(_)));
    }

    #[tokio::test]
    async fn blocking_helpers_hash_and_verify() {
        let hashed = hash_password_blocking("hunter22".to_string()).await.unwrap();
        assert!(
            verify_password_blocking("hunter22".to_string(), Some(hashed.clone()))
                .await
                .unwrap()
        );
        assert!(
            !verify_password_blocking("hunter23".to_string(), Some(hashed))
                .await
                .unwrap()
        );
    }

    #[tokio::test]
    async fn unknown_account_never_verifies() {
        assert!(
            !verify_password_blocking("not-the-password-of-anyone".to_string(), None)
                .await
                .unwrap()
        );
    }
}
