//! Auth cookie verification.
//!
//! The identity service issues an HS256 JWT whose `sub` is the user id and
//! stores it in a cookie. Handlers take an [`AuthUser`] argument to require it.

use axum::extract::{FromRef, FromRequestParts};
use axum::http::header::{AUTHORIZATION, COOKIE};
use axum::http::request::Parts;
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

use crate::api::error::ApiError;

#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Uuid,
    pub exp: usize,
    pub iat: usize,
}

pub struct TokenVerifier {
    decoding: DecodingKey,
    cookie_name: String,
}

impl TokenVerifier {
    pub fn new(secret: &str, cookie_name: impl Into<String>) -> Self {
        Self { decoding: DecodingKey::from_secret(secret.as_bytes()), cookie_name: cookie_name.into() }
    }

    pub fn verify(&self, token: &str) -> Result<Claims, jsonwebtoken::errors::Error> {
        jsonwebtoken::decode::<Claims>(token, &self.decoding, &Validation::default()).map(|d| d.claims)
    }

    /// Cookie first, then `Authorization: Bearer`.
    fn token_from<'a>(&self, parts: &'a Parts) -> Option<&'a str> {
        parts
            .headers
            .get_all(COOKIE)
            .iter()
            .filter_map(|v| v.to_str().ok())
            .flat_map(|v| v.split(';'))
            .filter_map(|pair| pair.trim().split_once('='))
            .find(|(name, _)| *name == self.cookie_name)
            .map(|(_, value)| value)
            .or_else(|| parts.headers.get(AUTHORIZATION)?.to_str().ok()?.strip_prefix("Bearer "))
            .filter(|t| !t.is_empty())
    }
}

/// Issues a token the verifier accepts.
pub fn create_token(user_id: Uuid, secret: &str, ttl: chrono::Duration) -> Result<String, jsonwebtoken::errors::Error> {
    let now = chrono::Utc::now();
    let claims = Claims { sub: user_id, exp: (now + ttl).timestamp() as usize, iat: now.timestamp() as usize };
    jsonwebtoken::encode(&Header::default(), &claims, &EncodingKey::from_secret(secret.as_bytes()))
}

/// The authenticated caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuthUser {
    pub user_id: Uuid,
}

#[axum::async_trait]
impl<S> FromRequestParts<S> for AuthUser
where
    Arc<TokenVerifier>: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let verifier = Arc::<TokenVerifier>::from_ref(state);
        let token = verifier.token_from(parts).ok_or(ApiError::Unauthorized("not signed in"))?;
        let claims = verifier.verify(token).map_err(|e| {
            tracing::debug!(error = %e, "auth token rejected");
            ApiError::Unauthorized("invalid or expired session")
        })?;
        Ok(AuthUser { user_id: claims.sub })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::Request;

    fn parts(header: (&str, &str)) -> Parts {
        Request::builder().header(header.0, header.1).body(()).unwrap().into_parts().0
    }

    #[test]
    fn test_token_from_cookie_and_bearer() {
        let verifier = TokenVerifier::new("secret", "token");
        let user = Uuid::new_v4();
        let token = create_token(user, "secret", chrono::Duration::hours(1)).unwrap();

        let cookie = format!("theme=dark; token={token}");
        let cookie_parts = parts(("cookie", &cookie));
        let found = verifier.token_from(&cookie_parts).unwrap();
        assert_eq!(verifier.verify(found).unwrap().sub, user);

        let bearer = format!("Bearer {token}");
        assert_eq!(verifier.token_from(&parts(("authorization", &bearer))), Some(token.as_str()));
        assert_eq!(verifier.token_from(&parts(("cookie", "theme=dark"))), None);
    }

    #[test]
    fn test_rejects_wrong_secret_and_expired() {
        let verifier = TokenVerifier::new("secret", "token");
        let forged = create_token(Uuid::new_v4(), "other", chrono::Duration::hours(1)).unwrap();
        assert!(verifier.verify(&forged).is_err());
        let expired = create_token(Uuid::new_v4(), "secret", chrono::Duration::hours(-2)).unwrap();
        assert!(verifier.verify(&expired).is_err());
    }
}
