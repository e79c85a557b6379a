//! Cross-origin resource sharing.

use async_trait::async_trait;
use bytes::Bytes;
use rivet_http::protocol::{Method, Request, Response};

use crate::error::HandlerError;
use crate::pipeline::Middleware;

/// Allowed-origin policy.
#[derive(Debug, Clone)]
pub enum CorsOrigin {
    /// `access-control-allow-origin: *`
    Any,
    /// One fixed origin, sent verbatim.
    Exact(String),
    /// Echo the request origin when it appears in the list.
    List(Vec<String>),
}

#[derive(Debug, Clone)]
pub struct CorsConfig {
    pub origin: CorsOrigin,
    pub methods: Vec<Method>,
    /// Headers advertised on preflight. When empty, the request's
    /// `access-control-request-headers` is echoed instead.
    pub allowed_headers: Vec<String>,
    pub exposed_headers: Vec<String>,
    pub credentials: bool,
    /// Preflight cache lifetime in seconds.
    pub max_age: u64,
}

impl Default for CorsConfig {
    fn default() -> Self {
        Self {
            origin: CorsOrigin::Any,
            methods: Method::ALL.to_vec(),
            allowed_headers: vec!["content-type".to_owned(), "authorization".to_owned()],
            exposed_headers: Vec::new(),
            credentials: false,
            max_age: 86_400,
        }
    }
}

/// Sets CORS headers on every response and answers `OPTIONS` preflights
/// with an empty 204, ending the walk.
pub struct Cors {
    config: CorsConfig,
}

impl Cors {
    pub fn new(config: CorsConfig) -> Self {
        Self { config }
    }

    /// Resolved allow-origin value plus whether `vary: origin` applies.
    fn allow_origin(&self, request: &Request) -> Option<(String, bool)> {
        match &self.config.origin {
            CorsOrigin::Any => Some(("*".to_owned(), false)),
            CorsOrigin::Exact(origin) => Some((origin.clone(), false)),
            CorsOrigin::List(origins) => {
                let origin = request.header("origin")?;
                origins.iter().any(|allowed| allowed == origin).then(|| (origin.to_owned(), true))
            }
        }
    }
}

impl Default for Cors {
    fn default() -> Self {
        Self::new(CorsConfig::default())
    }
}

#[async_trait]
impl Middleware for Cors {
    async fn handle(&self, request: &mut Request, response: &mut Response) -> Result<(), HandlerError> {
        if let Some((origin, vary)) = self.allow_origin(request) {
            response.set_header("access-control-allow-origin", origin);
            if vary {
                response.set_header("vary", "origin");
            }
        }
        if self.config.credentials {
            response.set_header("access-control-allow-credentials", "true");
        }
        if !self.config.exposed_headers.is_empty() {
            response.set_header("access-control-expose-headers", self.config.exposed_headers.join(", "));
        }

        if request.method() == Method::Options {
            let methods = self.config.methods.iter().map(Method::as_str).collect::<Vec<_>>().join(", ");
            response.set_header("access-control-allow-methods", methods);

            let allowed = if self.config.allowed_headers.is_empty() {
                request.header("access-control-request-headers").unwrap_or_default().to_owned()
            } else {
                self.config.allowed_headers.join(", ")
            };
            if !allowed.is_empty() {
                response.set_header("access-control-allow-headers", allowed);
            }

            response.set_header("access-control-max-age", self.config.max_age.to_string());
            response.status(204).send(Bytes::new());
        }
        Ok(())
    }
}
