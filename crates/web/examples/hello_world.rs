//! Minimal server: one route plus the common middleware stack.
//!
//! To run this example:
//! ```bash
//! cargo run --example hello_world
//! curl http://127.0.0.1:8080/hello
//! ```

use rivet_http::protocol::{Request, Response};
use rivet_web::middleware::{BodyParser, Logger, SecurityHeaders};
use rivet_web::{handler_fn, HandlerFuture, Router, Server};
use serde_json::json;

fn hello<'a>(_request: &'a mut Request, response: &'a mut Response) -> HandlerFuture<'a> {
    Box::pin(async move {
        response.json(&json!({ "message": "ok" }));
        Ok(())
    })
}

fn greet<'a>(request: &'a mut Request, response: &'a mut Response) -> HandlerFuture<'a> {
    Box::pin(async move {
        let name = request.param("name").unwrap_or("world").to_owned();
        response.text(format!("hello, {name}\n"));
        Ok(())
    })
}

#[tokio::main]
async fn main() {
    let router = Router::new()
        .get("/hello", handler_fn(hello))
        .get("/greet/:name", handler_fn(greet));

    Server::builder()
        .address("127.0.0.1:8080")
        .middleware(Logger)
        .middleware(SecurityHeaders::default())
        .middleware(BodyParser)
        .router(router)
        .build()
        .unwrap()
        .start()
        .await;
}
