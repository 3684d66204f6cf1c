use std::sync::LazyLock;

use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use axum::{
    extract::{FromRef, FromRequestParts},
    http::{HeaderMap, header, request::Parts},
};
use base64::{Engine, engine::general_purpose::STANDARD};
use uuid::Uuid;

use crate::{
    error::{ApiError, ApiResult},
    models::User,
    repository::{RepositoryState, UserRepository},
};

/// AuthUser
///
/// The resolved identity of an authenticated request. It is produced once per request by
/// the auth middleware, stored in the request extensions, and then passed explicitly to
/// the ownership policy and the artifact coordinator.
#[derive(Debug, Clone, PartialEq)]
pub struct AuthUser {
    pub id: Uuid,
    pub username: String,
}

impl From<&User> for AuthUser {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            username: user.username.clone(),
        }
    }
}

// --- Secret Hashing ---

/// Hash a secret using Argon2id with a fresh random salt.
///
/// Returns the PHC-formatted string (algorithm, parameters, salt and digest).
pub fn hash_password(password: &str) -> ApiResult<String> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| ApiError::Internal(format!("failed to hash password: {e}")))
}

/// Verify a secret against a stored PHC hash.
///
/// The digest comparison inside `verify_password` is constant-time. An unparseable
/// stored hash never verifies.
pub fn verify_password(password: &str, hash: &str) -> bool {
    match PasswordHash::new(hash) {
        Ok(parsed) => Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok(),
        Err(_) => false,
    }
}

// Verified against when the username is unknown, so both failure paths cost one Argon2 run.
static DUMMY_HASH: LazyLock<String> =
    LazyLock::new(|| hash_password("course-trace-api/unknown-user").unwrap_or_default());

// --- Credential Parsing & Verification ---

/// parse_basic_credentials
///
/// Decodes `Authorization: Basic base64(username:secret)`. The payload is split on the
/// first `:` only, so secrets may themselves contain colons.
pub fn parse_basic_credentials(headers: &HeaderMap) -> ApiResult<(String, String)> {
    let value = headers
        .get(header::AUTHORIZATION)
        .ok_or(ApiError::MissingCredentials)?;

    let value = value.to_str().map_err(|_| ApiError::MalformedCredentials)?;

    let encoded = value
        .strip_prefix("Basic ")
        .ok_or(ApiError::MalformedCredentials)?;

    let decoded = STANDARD
        .decode(encoded.trim())
        .map_err(|_| ApiError::MalformedCredentials)?;
    let decoded = String::from_utf8(decoded).map_err(|_| ApiError::MalformedCredentials)?;

    let (username, password) = decoded
        .split_once(':')
        .ok_or(ApiError::MalformedCredentials)?;

    Ok((username.to_string(), password.to_string()))
}

/// verify_credentials
///
/// The credential verifier. An unknown username and a wrong secret both surface as
/// `InvalidCredentials`; only a store failure surfaces as something else.
pub async fn verify_credentials<R>(repo: &R, username: &str, password: &str) -> ApiResult<User>
where
    R: UserRepository + ?Sized,
{
    match repo.get_user_by_username(username).await? {
        Some(user) if verify_password(password, &user.password_hash) => Ok(user),
        Some(_) => {
            tracing::debug!(username, "credential check failed");
            Err(ApiError::InvalidCredentials)
        }
        None => {
            let _ = verify_password(password, &DUMMY_HASH);
            tracing::debug!(username, "credential check failed");
            Err(ApiError::InvalidCredentials)
        }
    }
}

/// authenticate
///
/// Identity resolution for one request: header parsing followed by credential verification.
pub async fn authenticate<R>(repo: &R, headers: &HeaderMap) -> ApiResult<AuthUser>
where
    R: UserRepository + ?Sized,
{
    let (username, password) = parse_basic_credentials(headers)?;
    let user = verify_credentials(repo, &username, &password).await?;
    Ok(AuthUser::from(&user))
}

/// AuthUser Extractor Implementation
///
/// Reuses the identity already attached by the auth middleware when present. Outside
/// the protected router (or in tests invoking the extractor directly) it authenticates
/// from the request headers itself.
///
/// Rejection: an `ApiError` from the authentication taxonomy (401) or a store failure (500).
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
    RepositoryState: FromRef<S>,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        if let Some(user) = parts.extensions.get::<AuthUser>() {
            return Ok(user.clone());
        }

        let repo = RepositoryState::from_ref(state);
        authenticate(repo.as_ref(), &parts.headers).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn headers_with(value: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(header::AUTHORIZATION, HeaderValue::from_str(value).unwrap());
        headers
    }

    #[test]
    fn test_hash_and_verify() {
        let hash = hash_password("p@ss1").unwrap();

        assert!(hash.starts_with("$argon2"));
        assert_ne!(hash, "p@ss1");
        assert!(verify_password("p@ss1", &hash));
        assert!(!verify_password("p@ss2", &hash));
    }

    #[test]
    fn test_different_salts() {
        let hash1 = hash_password("same-password").unwrap();
        let hash2 = hash_password("same-password").unwrap();
        assert_ne!(hash1, hash2);
    }

    #[test]
    fn test_unparseable_hash_never_verifies() {
        assert!(!verify_password("anything", "not-a-valid-hash"));
    }

    #[test]
    fn test_parse_basic_credentials() {
        // "alice:hunter2"
        let headers = headers_with("Basic YWxpY2U6aHVudGVyMg==");
        let (user, pass) = parse_basic_credentials(&headers).unwrap();
        assert_eq!(user, "alice");
        assert_eq!(pass, "hunter2");
    }

    #[test]
    fn test_secret_may_contain_colon() {
        let encoded = STANDARD.encode("bob:a:b:c");
        let headers = headers_with(&format!("Basic {encoded}"));
        let (user, pass) = parse_basic_credentials(&headers).unwrap();
        assert_eq!(user, "bob");
        assert_eq!(pass, "a:b:c");
    }

    #[test]
    fn test_missing_header() {
        let err = parse_basic_credentials(&HeaderMap::new()).unwrap_err();
        assert!(matches!(err, ApiError::MissingCredentials));
    }

    #[test]
    fn test_malformed_headers() {
        let no_colon = format!("Basic {}", STANDARD.encode("justausername"));
        for value in ["Bearer abc.def", "Basic !!!not-base64!!!", no_colon.as_str()] {
            let err = parse_basic_credentials(&headers_with(value)).unwrap_err();
            assert!(
                matches!(err, ApiError::MalformedCredentials),
                "{value} should be malformed"
            );
        }
    }
}
