//! Method + pattern routing with static-over-dynamic precedence.
//!
//! Patterns are split on `/` with empty segments elided; `:name` segments
//! capture path parameters, everything else matches byte-exactly. Among the
//! routes whose method and pattern both match, a fully static pattern beats
//! one with parameters; ties go to the earliest registration. A path that
//! only matches routes of other methods resolves to 405 with the set of
//! those methods.

use std::collections::HashMap;
use std::sync::Arc;

use rivet_http::protocol::{percent_decode, Method};

use crate::handler::RouteHandler;
use crate::pipeline::Middleware;

/// One segment of a registered pattern.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    Literal(String),
    Param(String),
}

/// A registered (method, pattern, handler) entry plus its route-scoped
/// middleware. Created at startup, immutable afterwards.
pub struct Route {
    method: Method,
    pattern: String,
    segments: Vec<Segment>,
    is_static: bool,
    middleware: Vec<Arc<dyn Middleware>>,
    handler: Arc<dyn RouteHandler>,
}

impl Route {
    fn new(
        method: Method,
        pattern: &str,
        middleware: Vec<Arc<dyn Middleware>>,
        handler: Arc<dyn RouteHandler>,
    ) -> Self {
        let segments = split_pattern(pattern);
        let is_static = segments.iter().all(|segment| matches!(segment, Segment::Literal(_)));
        Self { method, pattern: pattern.to_owned(), segments, is_static, middleware, handler }
    }

    pub fn method(&self) -> Method {
        self.method
    }

    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    pub fn is_static(&self) -> bool {
        self.is_static
    }

    pub fn middleware(&self) -> &[Arc<dyn Middleware>] {
        &self.middleware
    }

    pub fn handler(&self) -> &dyn RouteHandler {
        self.handler.as_ref()
    }

    /// Segment-by-segment match. Parameter captures are percent-decoded;
    /// literals compare raw.
    fn matches(&self, path_segments: &[&str]) -> Option<HashMap<String, String>> {
        if self.segments.len() != path_segments.len() {
            return None;
        }
        let mut params = HashMap::new();
        for (segment, part) in self.segments.iter().zip(path_segments) {
            match segment {
                Segment::Literal(literal) => {
                    if literal != part {
                        return None;
                    }
                }
                Segment::Param(name) => {
                    params.insert(name.clone(), percent_decode(part));
                }
            }
        }
        Some(params)
    }
}

fn split_pattern(pattern: &str) -> Vec<Segment> {
    pattern
        .split('/')
        .filter(|segment| !segment.is_empty())
        .map(|segment| match segment.strip_prefix(':') {
            Some(name) => Segment::Param(name.to_owned()),
            None => Segment::Literal(segment.to_owned()),
        })
        .collect()
}

fn split_path(path: &str) -> Vec<&str> {
    path.split('/').filter(|segment| !segment.is_empty()).collect()
}

/// Outcome of resolving a request against the registry.
pub enum Resolution<'router> {
    Matched { route: &'router Route, params: HashMap<String, String> },
    MethodNotAllowed { allowed: Vec<Method> },
    NotFound,
}

/// Registry of routes.
#[derive(Default)]
pub struct Router {
    routes: Vec<Route>,
}

macro_rules! method_route {
    ($name:ident, $method:expr) => {
        /// Registers a handler for this method; chainable.
        pub fn $name<H: RouteHandler + 'static>(self, pattern: &str, handler: H) -> Self {
            self.add($method, pattern, handler)
        }
    };
}

impl Router {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    /// Registers a route without route-scoped middleware.
    pub fn add<H: RouteHandler + 'static>(mut self, method: Method, pattern: &str, handler: H) -> Self {
        self.routes.push(Route::new(method, pattern, Vec::new(), Arc::new(handler)));
        self
    }

    /// Registers a route with its own middleware stack, run after the
    /// global pipeline and before the handler.
    pub fn add_with<H: RouteHandler + 'static>(
        mut self,
        method: Method,
        pattern: &str,
        middleware: Vec<Arc<dyn Middleware>>,
        handler: H,
    ) -> Self {
        self.routes.push(Route::new(method, pattern, middleware, Arc::new(handler)));
        self
    }

    method_route!(get, Method::Get);
    method_route!(post, Method::Post);
    method_route!(put, Method::Put);
    method_route!(delete, Method::Delete);
    method_route!(patch, Method::Patch);
    method_route!(head, Method::Head);
    method_route!(options, Method::Options);

    /// Resolves a method and path against every registered route.
    pub fn resolve(&self, method: Method, path: &str) -> Resolution<'_> {
        let path_segments = split_path(path);

        let mut static_hit: Option<(&Route, HashMap<String, String>)> = None;
        let mut dynamic_hit: Option<(&Route, HashMap<String, String>)> = None;
        let mut allowed: Vec<Method> = Vec::new();

        for route in &self.routes {
            let params = match route.matches(&path_segments) {
                Some(params) => params,
                None => continue,
            };
            if route.method != method {
                if !allowed.contains(&route.method) {
                    allowed.push(route.method);
                }
                continue;
            }
            if route.is_static {
                if static_hit.is_none() {
                    static_hit = Some((route, params));
                }
            } else if dynamic_hit.is_none() {
                dynamic_hit = Some((route, params));
            }
        }

        match static_hit.or(dynamic_hit) {
            Some((route, params)) => Resolution::Matched { route, params },
            None if !allowed.is_empty() => Resolution::MethodNotAllowed { allowed },
            None => Resolution::NotFound,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use rivet_http::protocol::{Request, Response};

    use crate::error::HandlerError;

    struct Noop;

    #[async_trait]
    impl RouteHandler for Noop {
        async fn invoke(&self, _req: &mut Request, _res: &mut Response) -> Result<(), HandlerError> {
            Ok(())
        }
    }

    fn matched<'r>(resolution: Resolution<'r>) -> (&'r Route, HashMap<String, String>) {
        match resolution {
            Resolution::Matched { route, params } => (route, params),
            Resolution::MethodNotAllowed { .. } => panic!("unexpected 405"),
            Resolution::NotFound => panic!("unexpected 404"),
        }
    }

    #[test]
    fn static_route_matches_exactly() {
        let router = Router::new().get("/users/me", Noop);

        let (route, params) = matched(router.resolve(Method::Get, "/users/me"));
        assert_eq!(route.pattern(), "/users/me");
        assert!(params.is_empty());

        assert!(matches!(router.resolve(Method::Get, "/users/you"), Resolution::NotFound));
    }

    #[test]
    fn params_are_captured_and_decoded() {
        let router = Router::new().get("/users/:id/posts/:post", Noop);

        let (_, params) = matched(router.resolve(Method::Get, "/users/42/posts/caf%C3%A9"));
        assert_eq!(params.get("id").map(String::as_str), Some("42"));
        assert_eq!(params.get("post").map(String::as_str), Some("café"));
    }

    #[test]
    fn static_beats_dynamic_in_either_registration_order() {
        let router = Router::new().get("/users/:id", Noop).get("/users/me", Noop);
        let (route, _) = matched(router.resolve(Method::Get, "/users/me"));
        assert_eq!(route.pattern(), "/users/me");

        let router = Router::new().get("/users/me", Noop).get("/users/:id", Noop);
        let (route, _) = matched(router.resolve(Method::Get, "/users/me"));
        assert_eq!(route.pattern(), "/users/me");

        // other paths still reach the dynamic route
        let (route, params) = matched(router.resolve(Method::Get, "/users/42"));
        assert_eq!(route.pattern(), "/users/:id");
        assert_eq!(params.get("id").map(String::as_str), Some("42"));
    }

    #[test]
    fn first_registration_wins_among_equal_precedence() {
        let router = Router::new().get("/items/:a", Noop).get("/items/:b", Noop);
        let (route, _) = matched(router.resolve(Method::Get, "/items/7"));
        assert_eq!(route.pattern(), "/items/:a");
    }

    #[test]
    fn wrong_method_yields_405_with_the_allowed_set() {
        let router = Router::new().get("/x", Noop).post("/x", Noop);

        match router.resolve(Method::Delete, "/x") {
            Resolution::MethodNotAllowed { allowed } => {
                assert_eq!(allowed.len(), 2);
                assert!(allowed.contains(&Method::Get));
                assert!(allowed.contains(&Method::Post));
            }
            _ => panic!("expected 405"),
        }
    }

    #[test]
    fn unknown_path_yields_404() {
        let router = Router::new().get("/x", Noop);
        assert!(matches!(router.resolve(Method::Get, "/nope"), Resolution::NotFound));
    }

    #[test]
    fn resolve_always_lands_in_one_of_three_outcomes() {
        let router = Router::new().get("/a/:b", Noop).post("/c", Noop);
        for method in Method::ALL {
            for path in ["/a/1", "/c", "/missing", "/", "/a/1/2"] {
                // exhaustive match doubles as the assertion
                match router.resolve(method, path) {
                    Resolution::Matched { .. } | Resolution::MethodNotAllowed { .. } | Resolution::NotFound => {}
                }
            }
        }
    }

    #[test]
    fn empty_segments_are_elided() {
        let router = Router::new().get("/users/", Noop);

        assert!(matches!(router.resolve(Method::Get, "/users"), Resolution::Matched { .. }));
        assert!(matches!(router.resolve(Method::Get, "//users//"), Resolution::Matched { .. }));
    }

    #[test]
    fn root_pattern_matches_the_root_path() {
        let router = Router::new().get("/", Noop);
        assert!(matches!(router.resolve(Method::Get, "/"), Resolution::Matched { .. }));
        assert!(matches!(router.resolve(Method::Get, "/x"), Resolution::NotFound));
    }

    #[test]
    fn literal_segments_are_not_decoded() {
        let router = Router::new().get("/caf%C3%A9", Noop);

        assert!(matches!(router.resolve(Method::Get, "/caf%C3%A9"), Resolution::Matched { .. }));
        assert!(matches!(router.resolve(Method::Get, "/café"), Resolution::NotFound));
    }
}
