//! An in-memory REST API exercising the whole surface: routing with path
//! parameters, the body parser, CORS, rate limiting, a route-scoped auth
//! guard and an error-handling middleware.
//!
//! Storage and token verification are toy stand-ins for the real
//! collaborators (a database, an HMAC token scheme) that live outside the
//! framework.
//!
//! To run this example:
//! ```bash
//! TOKEN_SECRET=letmein cargo run --example rest_api
//! curl http://127.0.0.1:8080/users
//! curl -X POST http://127.0.0.1:8080/users \
//!      -H 'Authorization: Bearer letmein' \
//!      -H 'Content-Type: application/json' \
//!      -d '{"name":"ada"}'
//! ```

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use rivet_http::protocol::{Request, Response};
use rivet_web::middleware::{
    AuthGuard, AuthGuardConfig, BodyParser, Cors, Logger, RateLimiter, SecurityHeaders, TokenError,
    TokenVerifier,
};
use rivet_web::{
    ErrorMiddleware, HandlerError, Middleware, RouteHandler, Router, Server,
};
use serde::Serialize;
use serde_json::{json, Value};

#[derive(Debug, Clone, Serialize)]
struct User {
    id: u64,
    name: String,
}

#[derive(Default)]
struct UserStore {
    next_id: u64,
    users: HashMap<u64, User>,
}

type Store = Arc<Mutex<UserStore>>;

/// Stand-in for the real signed-token verifier: accepts a token equal to
/// the configured secret.
struct SharedSecretVerifier;

impl TokenVerifier for SharedSecretVerifier {
    fn verify(&self, token: &str, secret: &str) -> Result<Value, TokenError> {
        if !secret.is_empty() && token == secret {
            Ok(json!({ "sub": "demo-user" }))
        } else {
            Err(TokenError("unknown token".to_owned()))
        }
    }
}

struct ListUsers(Store);

#[async_trait]
impl RouteHandler for ListUsers {
    async fn invoke(&self, _request: &mut Request, response: &mut Response) -> Result<(), HandlerError> {
        let users: Vec<User> = self.0.lock().unwrap().users.values().cloned().collect();
        response.json(&users);
        Ok(())
    }
}

struct GetUser(Store);

#[async_trait]
impl RouteHandler for GetUser {
    async fn invoke(&self, request: &mut Request, response: &mut Response) -> Result<(), HandlerError> {
        let id: u64 = request.param("id").unwrap_or_default().parse().map_err(|_| "invalid user id")?;
        match self.0.lock().unwrap().users.get(&id) {
            Some(user) => response.json(user),
            None => {
                response.status(404).json(&json!({ "error": "No such user" }));
            }
        }
        Ok(())
    }
}

struct CreateUser(Store);

#[async_trait]
impl RouteHandler for CreateUser {
    async fn invoke(&self, request: &mut Request, response: &mut Response) -> Result<(), HandlerError> {
        let name = request
            .parsed_body()
            .as_json()
            .and_then(|body| body["name"].as_str())
            .ok_or("body must carry a name")?
            .to_owned();

        let mut store = self.0.lock().unwrap();
        store.next_id += 1;
        let user = User { id: store.next_id, name };
        store.users.insert(user.id, user.clone());

        response.status(201).json(&user);
        Ok(())
    }
}

struct DeleteUser(Store);

#[async_trait]
impl RouteHandler for DeleteUser {
    async fn invoke(&self, request: &mut Request, response: &mut Response) -> Result<(), HandlerError> {
        let id: u64 = request.param("id").unwrap_or_default().parse().map_err(|_| "invalid user id")?;
        match self.0.lock().unwrap().users.remove(&id) {
            Some(_) => response.status(204).send(bytes::Bytes::new()),
            None => {
                response.status(404).json(&json!({ "error": "No such user" }));
            }
        }
        Ok(())
    }
}

/// Turns every unhandled error into a JSON response.
struct JsonErrors;

#[async_trait]
impl ErrorMiddleware for JsonErrors {
    async fn handle(
        &self,
        error: HandlerError,
        _request: &mut Request,
        response: &mut Response,
    ) -> Result<(), HandlerError> {
        response.status(400).json(&json!({ "error": error.message() }));
        Ok(())
    }
}

#[tokio::main]
async fn main() {
    let store: Store = Store::default();
    let guard: Arc<dyn Middleware> =
        Arc::new(AuthGuard::new(AuthGuardConfig::default(), SharedSecretVerifier));

    use rivet_http::protocol::Method;
    let router = Router::new()
        .get("/users", ListUsers(store.clone()))
        .get("/users/:id", GetUser(store.clone()))
        .add_with(Method::Post, "/users", vec![guard.clone()], CreateUser(store.clone()))
        .add_with(Method::Delete, "/users/:id", vec![guard], DeleteUser(store));

    Server::builder()
        .address("127.0.0.1:8080")
        .middleware(Logger)
        .middleware(SecurityHeaders::default())
        .middleware(Cors::default())
        .middleware(RateLimiter::default())
        .middleware(BodyParser)
        .error_middleware(JsonErrors)
        .router(router)
        .build()
        .unwrap()
        .start()
        .await;
}
