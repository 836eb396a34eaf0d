use crate::{
    error::{AppError, AppResult},
    models::Club,
    AppState,
};
use anyhow::Context;
use argon2::Argon2;
use axum::{
    async_trait,
    extract::{ConnectInfo, Extension, FromRequest, RequestParts, TypedHeader},
    headers::{authorization::Bearer, Authorization},
    http::Request,
    middleware::Next,
    response::Response,
};
use jsonwebtoken::{
    errors::Result as JwtResult, DecodingKey, EncodingKey, Header, TokenData, Validation,
};
use password_hash::{
    self, rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString,
};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::{convert::Infallible, net::SocketAddr, time::Duration};

pub const API_KEY_HEADER: &str = "x-api-key";

pub fn hash_password(password: impl AsRef<[u8]>) -> password_hash::Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_ref(), &salt)
        .map(|h| h.to_string())
}

pub fn verify_password(
    password: impl AsRef<[u8]>,
    password_hash: impl AsRef<str>,
) -> password_hash::Result<bool> {
    let parsed_hash = PasswordHash::new(password_hash.as_ref())?;
    Ok(Argon2::default()
        .verify_password(password.as_ref(), &parsed_hash)
        .is_ok())
}

#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    /// Club id.
    pub sub: String,
    pub exp: u64,
}

/// Signing keys derived once from the configured base64 secret.
pub struct TokenKeys {
    encoding: EncodingKey,
    decoding: DecodingKey,
    ttl: Duration,
}

impl TokenKeys {
    pub fn from_base64_secret(secret: &str, ttl: Duration) -> anyhow::Result<Self> {
        Ok(TokenKeys {
            encoding: EncodingKey::from_base64_secret(secret)
                .context("JWT_SECRET is not valid base64")?,
            decoding: DecodingKey::from_base64_secret(secret)
                .context("JWT_SECRET is not valid base64")?,
            ttl,
        })
    }

    pub fn issue(&self, club_id: &str) -> JwtResult<String> {
        jsonwebtoken::encode(
            &Header::default(),
            &Claims {
                sub: club_id.to_string(),
                exp: jsonwebtoken::get_current_timestamp() + self.ttl.as_secs(),
            },
            &self.encoding,
        )
    }

    pub fn validate(&self, token: &str) -> JwtResult<TokenData<Claims>> {
        jsonwebtoken::decode::<Claims>(token, &self.decoding, &Validation::default())
    }
}

/// Shared service secret, kept only as a digest so comparison time does not
/// depend on how much of the key a caller guessed right.
pub struct ApiKey([u8; 32]);

impl ApiKey {
    pub fn new(key: &str) -> Self {
        ApiKey(Sha256::digest(key.as_bytes()).into())
    }

    pub fn matches(&self, candidate: Option<&str>) -> bool {
        candidate.map_or(false, |c| {
            let digest: [u8; 32] = Sha256::digest(c.as_bytes()).into();
            digest == self.0
        })
    }
}

pub async fn require_api_key<B>(req: Request<B>, next: Next<B>) -> AppResult<Response> {
    let allowed = {
        let state = req
            .extensions()
            .get::<AppState>()
            .context("application state is not installed")?;
        let provided = req
            .headers()
            .get(API_KEY_HEADER)
            .and_then(|v| v.to_str().ok());
        state.api_key.matches(provided)
    };

    if !allowed {
        return Err(AppError::unauthorized("missing or invalid API key"));
    }
    Ok(next.run(req).await)
}

/// The authenticated club (or admin) behind the bearer token.
pub struct ExtractAuth(pub Club);

#[async_trait]
impl<B: Send> FromRequest<B> for ExtractAuth {
    type Rejection = AppError;

    async fn from_request(req: &mut RequestParts<B>) -> Result<Self, Self::Rejection> {
        let TypedHeader(Authorization(bearer)) =
            TypedHeader::<Authorization<Bearer>>::from_request(req)
                .await
                .map_err(|_| AppError::unauthorized("missing bearer token"))?;
        let Extension(state) = Extension::<AppState>::from_request(req)
            .await
            .map_err(|_| anyhow::anyhow!("application state is not installed"))?;

        let claims = state
            .tokens
            .validate(bearer.token())
            .map_err(|_| AppError::unauthorized("Could not validate credentials"))?
            .claims;

        let club = state
            .store
            .club(&claims.sub)
            .await?
            .ok_or_else(|| AppError::unauthorized("Could not validate credentials"))?;

        Ok(ExtractAuth(club))
    }
}

/// Client address used for rate limiting: the peer address, or the
/// `X-Forwarded-For` entry written by the outermost trusted proxy.
pub struct ClientAddr(pub String);

/// Each trusted proxy appends the address it saw, so the client sits `hops`
/// entries from the right. Entries further left are caller supplied.
pub fn forwarded_client(header: &str, hops: usize) -> Option<&str> {
    if hops == 0 {
        return None;
    }
    let entries: Vec<&str> = header.split(',').map(str::trim).collect();
    let index = entries.len().checked_sub(hops)?;
    entries.get(index).copied().filter(|ip| !ip.is_empty())
}

#[async_trait]
impl<B: Send> FromRequest<B> for ClientAddr {
    type Rejection = Infallible;

    async fn from_request(req: &mut RequestParts<B>) -> Result<Self, Self::Rejection> {
        let hops = req
            .extensions()
            .get::<AppState>()
            .map_or(0, |state| state.settings.trusted_proxy_hops);
        let forwarded = req
            .headers()
            .get("x-forwarded-for")
            .and_then(|v| v.to_str().ok())
            .and_then(|v| forwarded_client(v, hops))
            .map(String::from);

        let addr = forwarded.unwrap_or_else(|| {
            req.extensions()
                .get::<ConnectInfo<SocketAddr>>()
                .map(|ci| ci.0.ip().to_string())
                .unwrap_or_else(|| "unknown".to_string())
        });
        Ok(ClientAddr(addr))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "Y2x1Yi1kaXJlY3RvcnktdGVzdC1zaWduaW5nLWtleS0wMTIzNDU2Nzg5";

    #[test]
    fn password_round_trip() {
        let digest = hash_password("hunter22").unwrap();
        assert_ne!(digest, "hunter22");
        assert!(verify_password("hunter22", &digest).unwrap());
        assert!(!verify_password("hunter23", &digest).unwrap());
    }

    #[test]
    fn tokens_carry_the_club_id() {
        let keys = TokenKeys::from_base64_secret(SECRET, Duration::from_secs(60)).unwrap();
        let token = keys.issue("club-1").unwrap();
        assert_eq!(keys.validate(&token).unwrap().claims.sub, "club-1");
    }

    #[test]
    fn tokens_from_another_secret_are_rejected() {
        let keys = TokenKeys::from_base64_secret(SECRET, Duration::from_secs(60)).unwrap();
        let other = TokenKeys::from_base64_secret("b3RoZXItc2VjcmV0", Duration::from_secs(60))
            .unwrap();
        let token = other.issue("club-1").unwrap();
        assert!(keys.validate(&token).is_err());
    }

    #[test]
    fn bad_base64_secret_is_a_startup_error() {
        assert!(TokenKeys::from_base64_secret("not base64!!", Duration::from_secs(1)).is_err());
    }

    #[test]
    fn forwarded_for_is_ignored_without_trusted_proxies() {
        assert_eq!(forwarded_client("9.9.9.9", 0), None);
    }

    #[test]
    fn forwarded_for_is_read_from_the_right() {
        let header = "6.6.6.6, 1.2.3.4, 10.0.0.2";
        assert_eq!(forwarded_client(header, 1), Some("10.0.0.2"));
        assert_eq!(forwarded_client(header, 2), Some("1.2.3.4"));
        assert_eq!(forwarded_client(header, 4), None);
        assert_eq!(forwarded_client("1.2.3.4,", 1), None);
    }

    #[test]
    fn api_key_comparison() {
        let key = ApiKey::new("s3cret");
        assert!(key.matches(Some("s3cret")));
        assert!(!key.matches(Some("s3cre")));
        assert!(!key.matches(None));
    }
}
