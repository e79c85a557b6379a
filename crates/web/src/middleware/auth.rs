//! Bearer-token authentication guard.

use async_trait::async_trait;
use rivet_http::protocol::{Request, Response};
use serde_json::{json, Value};
use thiserror::Error;

use crate::error::HandlerError;
use crate::pipeline::Middleware;

/// Raised by [`TokenVerifier`] implementations for bad tokens.
#[derive(Debug, Error)]
#[error("{0}")]
pub struct TokenError(pub String);

/// Verification seam.
///
/// The signed-token scheme itself (issuance, HMAC verification) lives
/// outside this crate; the guard only consumes the verdict and the claims.
pub trait TokenVerifier: Send + Sync {
    fn verify(&self, token: &str, secret: &str) -> Result<Value, TokenError>;
}

#[derive(Debug, Clone, Default)]
pub struct AuthGuardConfig {
    /// Token secret; when unset, the `TOKEN_SECRET` environment variable is
    /// consulted at construction.
    pub secret: Option<String>,
}

/// Rejects requests without a valid `authorization: Bearer` token and
/// attaches the verified claims as `request.user`.
pub struct AuthGuard {
    secret: String,
    verifier: Box<dyn TokenVerifier>,
}

impl AuthGuard {
    pub fn new(config: AuthGuardConfig, verifier: impl TokenVerifier + 'static) -> Self {
        let secret = config.secret.or_else(|| std::env::var("TOKEN_SECRET").ok()).unwrap_or_default();
        Self { secret, verifier: Box::new(verifier) }
    }
}

#[async_trait]
impl Middleware for AuthGuard {
    async fn handle(&self, request: &mut Request, response: &mut Response) -> Result<(), HandlerError> {
        let token = request
            .header("authorization")
            .and_then(|value| value.strip_prefix("Bearer "))
            .map(str::trim)
            .filter(|token| !token.is_empty())
            .map(str::to_owned);

        let token = match token {
            Some(token) => token,
            None => {
                response.status(401).json(&json!({ "error": "Authentication required" }));
                return Ok(());
            }
        };

        match self.verifier.verify(&token, &self.secret) {
            Ok(claims) => {
                request.set_user(claims);
                Ok(())
            }
            Err(_) => {
                response.status(401).json(&json!({ "error": "Invalid or expired token" }));
                Ok(())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rivet_http::codec::{parse, ParseOutcome};

    struct SecretEquals;

    impl TokenVerifier for SecretEquals {
        fn verify(&self, token: &str, secret: &str) -> Result<Value, TokenError> {
            if token == secret {
                Ok(json!({ "sub": "user-1" }))
            } else {
                Err(TokenError("signature mismatch".to_owned()))
            }
        }
    }

    fn guard() -> AuthGuard {
        AuthGuard::new(AuthGuardConfig { secret: Some("s3cret".to_owned()) }, SecretEquals)
    }

    fn request(bytes: &[u8]) -> Request {
        match parse(bytes).unwrap() {
            ParseOutcome::Parsed { request, .. } => request,
            ParseOutcome::Incomplete => unreachable!(),
        }
    }

    fn body_of(response: &mut Response) -> String {
        let output = response.take_output().unwrap();
        let text = String::from_utf8_lossy(&output);
        text.split("\r\n\r\n").nth(1).unwrap_or_default().to_owned()
    }

    #[tokio::test]
    async fn missing_token_is_rejected() {
        let mut req = request(b"GET /private HTTP/1.1\r\n\r\n");
        let mut res = Response::new();

        guard().handle(&mut req, &mut res).await.unwrap();

        assert_eq!(res.status_code(), 401);
        assert_eq!(body_of(&mut res), r#"{"error":"Authentication required"}"#);
    }

    #[tokio::test]
    async fn non_bearer_scheme_is_rejected() {
        let mut req = request(b"GET /private HTTP/1.1\r\nAuthorization: Basic abc\r\n\r\n");
        let mut res = Response::new();

        guard().handle(&mut req, &mut res).await.unwrap();
        assert_eq!(res.status_code(), 401);
    }

    #[tokio::test]
    async fn bad_token_is_rejected() {
        let mut req = request(b"GET /private HTTP/1.1\r\nAuthorization: Bearer nope\r\n\r\n");
        let mut res = Response::new();

        guard().handle(&mut req, &mut res).await.unwrap();

        assert_eq!(res.status_code(), 401);
        assert_eq!(body_of(&mut res), r#"{"error":"Invalid or expired token"}"#);
        assert!(req.user().is_none());
    }

    #[tokio::test]
    async fn valid_token_attaches_the_claims() {
        let mut req = request(b"GET /private HTTP/1.1\r\nAuthorization: Bearer s3cret\r\n\r\n");
        let mut res = Response::new();

        guard().handle(&mut req, &mut res).await.unwrap();

        assert!(!res.headers_sent());
        assert_eq!(req.user().unwrap()["sub"], "user-1");
    }
}
