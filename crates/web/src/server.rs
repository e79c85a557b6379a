//! Server bootstrap and router dispatch.

use std::net::{SocketAddr, ToSocketAddrs};
use std::sync::Arc;

use async_trait::async_trait;
use rivet_http::connection::HttpConnection;
use rivet_http::handler::Handler;
use rivet_http::protocol::{Method, Request, Response};
use serde_json::json;
use thiserror::Error;
use tokio::net::TcpListener;
use tracing::{error, info, warn, Level};
use tracing_subscriber::FmtSubscriber;

use crate::error::HandlerError;
use crate::handler::RouteHandler;
use crate::pipeline::{run_route_stack, ErrorMiddleware, Middleware, Pipeline};
use crate::router::{Resolution, Router};

pub struct ServerBuilder {
    address: Option<Vec<SocketAddr>>,
    router: Router,
    pipeline: Pipeline,
    fallback: Option<Arc<dyn RouteHandler>>,
}

impl ServerBuilder {
    fn new() -> Self {
        Self { address: None, router: Router::new(), pipeline: Pipeline::new(), fallback: None }
    }

    pub fn address<A: ToSocketAddrs>(mut self, address: A) -> Self {
        self.address = Some(address.to_socket_addrs().expect("invalid bind address").collect::<Vec<_>>());
        self
    }

    pub fn router(mut self, router: Router) -> Self {
        self.router = router;
        self
    }

    /// Appends a global middleware; registration order is execution order.
    pub fn middleware<M: Middleware + 'static>(mut self, middleware: M) -> Self {
        self.pipeline.use_middleware(middleware);
        self
    }

    /// Appends a global error handler.
    pub fn error_middleware<M: ErrorMiddleware + 'static>(mut self, middleware: M) -> Self {
        self.pipeline.use_error(middleware);
        self
    }

    /// Fallback handler used when no routes are registered.
    pub fn on_request<H: RouteHandler + 'static>(mut self, handler: H) -> Self {
        self.fallback = Some(Arc::new(handler));
        self
    }

    pub fn build(self) -> Result<Server, ServerBuildError> {
        let address = self.address.ok_or(ServerBuildError::MissingAddress)?;
        Ok(Server {
            address,
            pipeline: self.pipeline,
            dispatch: Dispatch { router: self.router, fallback: self.fallback },
        })
    }
}

#[derive(Error, Debug)]
pub enum ServerBuildError {
    #[error("address must be set")]
    MissingAddress,
}

pub struct Server {
    address: Vec<SocketAddr>,
    pipeline: Pipeline,
    dispatch: Dispatch,
}

impl Server {
    pub fn builder() -> ServerBuilder {
        ServerBuilder::new()
    }

    /// Binds and serves until the process exits.
    pub async fn start(self) {
        let subscriber = FmtSubscriber::builder().with_max_level(Level::INFO).finish();
        tracing::subscriber::set_global_default(subscriber).expect("setting default subscriber failed");

        info!("start listening at {:?}", self.address);
        let tcp_listener = match TcpListener::bind(self.address.as_slice()).await {
            Ok(tcp_listener) => tcp_listener,
            Err(e) => {
                error!(cause = %e, "bind server error");
                return;
            }
        };

        let handler = Arc::new(self);
        loop {
            let (tcp_stream, peer_addr) = match tcp_listener.accept().await {
                Ok(stream_and_addr) => stream_and_addr,
                Err(e) => {
                    warn!(cause = %e, "failed to accept");
                    continue;
                }
            };

            let handler = handler.clone();
            tokio::spawn(async move {
                let (reader, writer) = tcp_stream.into_split();
                let connection = HttpConnection::new(reader, writer, peer_addr);
                match connection.process(handler).await {
                    Ok(()) => info!(peer = %peer_addr, "connection shutdown"),
                    Err(e) => warn!(peer = %peer_addr, "connection closed with error: {e}"),
                }
            });
        }
    }
}

#[async_trait]
impl Handler for Server {
    async fn call(&self, request: &mut Request, response: &mut Response) {
        self.pipeline.execute(request, response, &self.dispatch).await;
    }
}

/// The pipeline's final handler: resolves the route table or answers
/// 404/405 with the canonical error JSON.
struct Dispatch {
    router: Router,
    fallback: Option<Arc<dyn RouteHandler>>,
}

#[async_trait]
impl RouteHandler for Dispatch {
    async fn invoke(&self, request: &mut Request, response: &mut Response) -> Result<(), HandlerError> {
        if self.router.is_empty() {
            match &self.fallback {
                Some(handler) => return handler.invoke(request, response).await,
                None => {
                    response.send("OK");
                    return Ok(());
                }
            }
        }

        match self.router.resolve(request.method(), request.path()) {
            Resolution::NotFound => {
                response.status(404).json(&json!({ "error": "Not Found" }));
                Ok(())
            }
            Resolution::MethodNotAllowed { allowed } => {
                let allow = allowed.iter().map(Method::as_str).collect::<Vec<_>>().join(", ");
                response.set_header("allow", allow);
                response.status(405).json(&json!({ "error": "Method Not Allowed" }));
                Ok(())
            }
            Resolution::Matched { route, params } => {
                request.set_params(params);
                // route middleware errors and handler raises both surface to
                // the caller, which re-enters the pipeline's error flow
                run_route_stack(route.middleware(), request, response).await?;
                if response.headers_sent() {
                    return Ok(());
                }
                route.handler().invoke(request, response).await
            }
        }
    }
}
