//! Bearer-token gate for mutating endpoints.
//!
//! Tokens are compact JWS strings signed with HMAC-SHA256:
//!
//! ```text
//! base64url(header) "." base64url(claims) "." base64url(signature)
//! ```
//!
//! The header must name `HS256`. An `exp` claim, when present, is checked
//! against the current time.

use std::time::Duration;

use async_trait::async_trait;
use axum::extract::{Request, State};
use axum::http::{header, HeaderMap};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine as _;
use hmac::{Hmac, Mac};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use tracing::debug;

use crate::api::ApiResponse;
use crate::error::{ServerError, ServerResult};
use crate::state::AppState;

type HmacSha256 = Hmac<Sha256>;

pub const TOKEN_MISSING: &str = "Auth Error | Token is missing.";
pub const TOKEN_INVALID: &str = "Auth Error | Token is invalid.";

#[derive(Clone, Debug)]
pub struct Identity {
    pub name: String,
}

impl Identity {
    pub fn anonymous() -> Self { Self { name: "anonymous".into() } }
    pub fn user(name: impl Into<String>) -> Self { Self { name: name.into() } }
}

#[derive(Clone, Debug)]
pub enum Credentials {
    Bearer(String),
    Anonymous,
}

impl Credentials {
    /// Extract credentials from an `Authorization: Bearer <token>` header.
    pub fn from_headers(headers: &HeaderMap) -> Self {
        headers
            .get(header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.strip_prefix("Bearer "))
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .map(|t| Self::Bearer(t.to_string()))
            .unwrap_or(Self::Anonymous)
    }
}

#[async_trait]
pub trait AuthProvider: Send + Sync {
    /// Resolve credentials to an identity, or fail with
    /// [`ServerError::TokenMissing`] / [`ServerError::TokenInvalid`].
    async fn authenticate(&self, credentials: &Credentials) -> ServerResult<Identity>;
}

/// Accepts every request. Used when no token secret is configured.
pub struct AllowAllAuth;

#[async_trait]
impl AuthProvider for AllowAllAuth {
    async fn authenticate(&self, credentials: &Credentials) -> ServerResult<Identity> {
        match credentials {
            Credentials::Bearer(token) => {
                let prefix: String = token.chars().take(8).collect();
                Ok(Identity::user(format!("bearer:{prefix}")))
            }
            Credentials::Anonymous => Ok(Identity::anonymous()),
        }
    }
}

/// Token claims.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sub: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iat: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exp: Option<i64>,
}

#[derive(Debug, Serialize, Deserialize)]
struct TokenHeader {
    alg: String,
    #[serde(default)]
    typ: Option<String>,
}

/// HS256 token issuer and verifier over a shared secret.
pub struct Hs256Auth {
    secret: Vec<u8>,
}

impl Hs256Auth {
    pub fn new(secret: impl AsRef<[u8]>) -> Self {
        Self { secret: secret.as_ref().to_vec() }
    }

    /// Sign a token for `subject`, expiring after `ttl` if given.
    pub fn issue(&self, subject: &str, ttl: Option<Duration>) -> ServerResult<String> {
        let now = chrono::Utc::now().timestamp();
        let claims = Claims {
            sub: Some(subject.to_string()),
            iat: Some(now),
            exp: ttl.map(|ttl| now.saturating_add(ttl.as_secs() as i64)),
        };
        let header = TokenHeader { alg: "HS256".into(), typ: Some("JWT".into()) };
        let signing_input = format!("{}.{}", encode_segment(&header)?, encode_segment(&claims)?);
        let signature = self.sign(signing_input.as_bytes())?;
        Ok(format!("{signing_input}.{}", URL_SAFE_NO_PAD.encode(signature)))
    }

    /// Check a token's structure, signature and expiry.
    pub fn verify(&self, token: &str) -> ServerResult<Claims> {
        let mut parts = token.split('.');
        let (Some(header_b64), Some(claims_b64), Some(signature_b64), None) =
            (parts.next(), parts.next(), parts.next(), parts.next())
        else {
            return Err(invalid("token must have three segments"));
        };

        let header: TokenHeader = decode_segment(header_b64)?;
        if header.alg != "HS256" {
            return Err(invalid(format!("unsupported algorithm {:?}", header.alg)));
        }

        let signature = URL_SAFE_NO_PAD
            .decode(signature_b64)
            .map_err(|e| invalid(format!("signature encoding: {e}")))?;
        let signing_input = &token[..header_b64.len() + 1 + claims_b64.len()];
        let mut mac = self.mac()?;
        mac.update(signing_input.as_bytes());
        mac.verify_slice(&signature)
            .map_err(|_| invalid("signature mismatch"))?;

        let claims: Claims = decode_segment(claims_b64)?;
        if let Some(exp) = claims.exp {
            if exp <= chrono::Utc::now().timestamp() {
                return Err(invalid("token expired"));
            }
        }
        Ok(claims)
    }

    fn sign(&self, data: &[u8]) -> ServerResult<Vec<u8>> {
        let mut mac = self.mac()?;
        mac.update(data);
        Ok(mac.finalize().into_bytes().to_vec())
    }

    fn mac(&self) -> ServerResult<HmacSha256> {
        HmacSha256::new_from_slice(&self.secret)
            .map_err(|e| ServerError::Internal(format!("failed to initialize HMAC: {e}")))
    }
}

#[async_trait]
impl AuthProvider for Hs256Auth {
    async fn authenticate(&self, credentials: &Credentials) -> ServerResult<Identity> {
        match credentials {
            Credentials::Anonymous => Err(ServerError::TokenMissing),
            Credentials::Bearer(token) => {
                let claims = self.verify(token)?;
                Ok(Identity::user(claims.sub.unwrap_or_else(|| "token".into())))
            }
        }
    }
}

/// Middleware guarding mutating routes.
pub async fn require_token(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Response {
    let credentials = Credentials::from_headers(request.headers());
    match state.auth().authenticate(&credentials).await {
        Ok(identity) => {
            debug!(identity = %identity.name, path = %request.uri().path(), "authorized");
            next.run(request).await
        }
        Err(ServerError::TokenMissing) => ApiResponse::unauthorized(TOKEN_MISSING).into_response(),
        Err(e) => {
            debug!(error = %e, "token rejected");
            ApiResponse::unauthorized(TOKEN_INVALID).into_response()
        }
    }
}

fn invalid(reason: impl Into<String>) -> ServerError {
    ServerError::TokenInvalid(reason.into())
}

fn encode_segment<T: Serialize>(value: &T) -> ServerResult<String> {
    let json = serde_json::to_vec(value).map_err(|e| ServerError::Internal(e.to_string()))?;
    Ok(URL_SAFE_NO_PAD.encode(json))
}

fn decode_segment<T: DeserializeOwned>(segment: &str) -> ServerResult<T> {
    let bytes = URL_SAFE_NO_PAD
        .decode(segment)
        .map_err(|e| invalid(format!("segment encoding: {e}")))?;
    serde_json::from_slice(&bytes).map_err(|e| invalid(format!("segment json: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn credentials_from_bearer_header() {
        let mut headers = HeaderMap::new();
        assert!(matches!(Credentials::from_headers(&headers), Credentials::Anonymous));

        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Bearer abc.def.ghi"));
        assert!(matches!(
            Credentials::from_headers(&headers),
            Credentials::Bearer(t) if t == "abc.def.ghi"
        ));

        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Basic dXNlcg=="));
        assert!(matches!(Credentials::from_headers(&headers), Credentials::Anonymous));

        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Bearer "));
        assert!(matches!(Credentials::from_headers(&headers), Credentials::Anonymous));
    }

    #[test]
    fn issue_then_verify() {
        let auth = Hs256Auth::new("secret");
        let token = auth.issue("alice", Some(Duration::from_secs(60))).unwrap();
        let claims = auth.verify(&token).unwrap();
        assert_eq!(claims.sub.as_deref(), Some("alice"));
        assert!(claims.exp.unwrap() > claims.iat.unwrap());
    }

    #[test]
    fn wrong_secret_is_rejected() {
        let token = Hs256Auth::new("one").issue("alice", None).unwrap();
        let err = Hs256Auth::new("two").verify(&token).unwrap_err();
        assert!(matches!(err, ServerError::TokenInvalid(_)));
    }

    #[test]
    fn tampered_claims_are_rejected() {
        let auth = Hs256Auth::new("secret");
        let token = auth.issue("alice", None).unwrap();
        let parts: Vec<&str> = token.split('.').collect();
        let forged = URL_SAFE_NO_PAD.encode(br#"{"sub":"mallory"}"#);
        let tampered = format!("{}.{}.{}", parts[0], forged, parts[2]);
        assert!(auth.verify(&tampered).is_err());
    }

    #[test]
    fn expired_token_is_rejected() {
        let auth = Hs256Auth::new("secret");
        let header = encode_segment(&TokenHeader { alg: "HS256".into(), typ: None }).unwrap();
        let claims = encode_segment(&Claims { sub: None, iat: None, exp: Some(1) }).unwrap();
        let input = format!("{header}.{claims}");
        let sig = URL_SAFE_NO_PAD.encode(auth.sign(input.as_bytes()).unwrap());
        let err = auth.verify(&format!("{input}.{sig}")).unwrap_err();
        assert!(err.to_string().contains("expired"));
    }

    #[test]
    fn unsigned_and_malformed_tokens_are_rejected() {
        let auth = Hs256Auth::new("secret");
        let header = URL_SAFE_NO_PAD.encode(br#"{"alg":"none"}"#);
        let claims = URL_SAFE_NO_PAD.encode(br#"{"sub":"x"}"#);
        assert!(auth.verify(&format!("{header}.{claims}.")).is_err());
        assert!(auth.verify("not-a-token").is_err());
        assert!(auth.verify("a.b.c.d").is_err());
    }

    #[tokio::test]
    async fn hs256_requires_token() {
        let auth = Hs256Auth::new("secret");
        let err = auth.authenticate(&Credentials::Anonymous).await.unwrap_err();
        assert!(matches!(err, ServerError::TokenMissing));

        let token = auth.issue("bob", None).unwrap();
        let id = auth.authenticate(&Credentials::Bearer(token)).await.unwrap();
        assert_eq!(id.name, "bob");
    }

    #[tokio::test]
    async fn allow_all_auth() {
        let auth = AllowAllAuth;
        let id = auth.authenticate(&Credentials::Anonymous).await.unwrap();
        assert_eq!(id.name, "anonymous");
        let id = auth.authenticate(&Credentials::Bearer("mytoken123".into())).await.unwrap();
        assert!(id.name.starts_with("bearer:"));
    }
}
