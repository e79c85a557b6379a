//! Hardening headers applied to every response.

use async_trait::async_trait;
use rivet_http::protocol::{Request, Response};

use crate::error::HandlerError;
use crate::pipeline::Middleware;

#[derive(Debug, Clone)]
pub struct SecurityHeadersConfig {
    pub hsts: bool,
    /// Seconds advertised in `strict-transport-security`.
    pub hsts_max_age: u64,
}

impl Default for SecurityHeadersConfig {
    fn default() -> Self {
        Self { hsts: true, hsts_max_age: 31_536_000 }
    }
}

pub struct SecurityHeaders {
    config: SecurityHeadersConfig,
}

impl SecurityHeaders {
    pub fn new(config: SecurityHeadersConfig) -> Self {
        Self { config }
    }
}

impl Default for SecurityHeaders {
    fn default() -> Self {
        Self::new(SecurityHeadersConfig::default())
    }
}

#[async_trait]
impl Middleware for SecurityHeaders {
    async fn handle(&self, _request: &mut Request, response: &mut Response) -> Result<(), HandlerError> {
        response
            .set_header("x-content-type-options", "nosniff")
            .set_header("x-frame-options", "DENY")
            .set_header("x-xss-protection", "1; mode=block")
            .set_header("referrer-policy", "strict-origin-when-cross-origin")
            .set_header("permissions-policy", "camera=(), microphone=(), geolocation=()");
        if self.config.hsts {
            response.set_header("strict-transport-security", format!("max-age={}", self.config.hsts_max_age));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rivet_http::codec::{parse, ParseOutcome};

    fn request() -> Request {
        match parse(b"GET / HTTP/1.1\r\n\r\n").unwrap() {
            ParseOutcome::Parsed { request, .. } => request,
            ParseOutcome::Incomplete => unreachable!(),
        }
    }

    #[tokio::test]
    async fn sets_the_full_header_set() {
        let mut req = request();
        let mut res = Response::new();

        SecurityHeaders::default().handle(&mut req, &mut res).await.unwrap();

        assert_eq!(res.get_header("x-content-type-options"), Some("nosniff"));
        assert_eq!(res.get_header("x-frame-options"), Some("DENY"));
        assert_eq!(res.get_header("x-xss-protection"), Some("1; mode=block"));
        assert_eq!(res.get_header("referrer-policy"), Some("strict-origin-when-cross-origin"));
        assert_eq!(res.get_header("permissions-policy"), Some("camera=(), microphone=(), geolocation=()"));
        assert_eq!(res.get_header("strict-transport-security"), Some("max-age=31536000"));
        assert!(!res.headers_sent());
    }

    #[tokio::test]
    async fn hsts_can_be_disabled() {
        let mut req = request();
        let mut res = Response::new();

        SecurityHeaders::new(SecurityHeadersConfig { hsts: false, ..SecurityHeadersConfig::default() })
            .handle(&mut req, &mut res)
            .await
            .unwrap();

        assert_eq!(res.get_header("strict-transport-security"), None);
    }
}
