//! The request-processing pipeline.
//!
//! A [`Pipeline`] is an ordered chain of normal and error-handling
//! middleware walked once per request. The walk carries an error state:
//!
//! | state | entry  | action                                   |
//! |-------|--------|------------------------------------------|
//! | ok    | normal | invoke; `Err` switches to error state    |
//! | ok    | error  | skip                                     |
//! | err   | normal | skip                                     |
//! | err   | error  | invoke; `Ok` clears, `Err` replaces      |
//!
//! Whenever a middleware emits a response the walk ends silently. On
//! ok-exhaustion the final handler runs once; on err-exhaustion a default
//! 500 carries the error message to the client.

use std::sync::Arc;

use async_trait::async_trait;
use rivet_http::protocol::{Request, Response};
use serde_json::json;
use tracing::debug;

use crate::error::HandlerError;
use crate::handler::RouteHandler;

/// A pass-through pipeline stage.
///
/// Returning `Ok(())` advances the walk (the `next()` of callback stacks);
/// returning `Err` switches the walk into error state; emitting a response
/// terminates it.
#[async_trait]
pub trait Middleware: Send + Sync {
    async fn handle(&self, request: &mut Request, response: &mut Response) -> Result<(), HandlerError>;
}

/// An error-state pipeline stage, run only while an error is in flight.
///
/// Returning `Ok(())` clears the error; returning `Err` keeps the walk in
/// error state with the new error.
#[async_trait]
pub trait ErrorMiddleware: Send + Sync {
    async fn handle(
        &self,
        error: HandlerError,
        request: &mut Request,
        response: &mut Response,
    ) -> Result<(), HandlerError>;
}

enum Entry {
    Normal(Arc<dyn Middleware>),
    Error(Arc<dyn ErrorMiddleware>),
}

/// Ordered middleware chain applied to every request.
#[derive(Default)]
pub struct Pipeline {
    entries: Vec<Entry>,
}

impl Pipeline {
    pub fn new() -> Self {
        Self { entries: Vec::new() }
    }

    /// Appends a normal middleware; registration order is execution order.
    pub fn use_middleware<M: Middleware + 'static>(&mut self, middleware: M) {
        self.entries.push(Entry::Normal(Arc::new(middleware)));
    }

    /// Appends an error handler.
    pub fn use_error<M: ErrorMiddleware + 'static>(&mut self, middleware: M) {
        self.entries.push(Entry::Error(Arc::new(middleware)));
    }

    /// Walks the chain and, if nothing terminated it, hands the request to
    /// the final handler.
    pub async fn execute(&self, request: &mut Request, response: &mut Response, final_handler: &dyn RouteHandler) {
        let mut error: Option<HandlerError> = None;

        for entry in &self.entries {
            match entry {
                Entry::Normal(middleware) if error.is_none() => {
                    if let Err(e) = middleware.handle(request, response).await {
                        error = Some(e);
                    }
                }
                Entry::Error(handler) => {
                    if let Some(current) = error.take() {
                        if let Err(e) = handler.handle(current, request, response).await {
                            error = Some(e);
                        }
                    }
                }
                _ => {}
            }
            if response.headers_sent() {
                return;
            }
        }

        match error {
            None => {
                if let Err(e) = final_handler.invoke(request, response).await {
                    self.handle_error(e, request, response).await;
                }
            }
            Some(e) => default_error_response(&e, response),
        }
    }

    /// Runs only the error handlers; used when a failure surfaces after the
    /// normal walk is already over (route middleware or the route handler).
    pub async fn handle_error(&self, error: HandlerError, request: &mut Request, response: &mut Response) {
        if response.headers_sent() {
            // a raise after emission is logged but never forwarded
            debug!("error raised after response emission: {error}");
            return;
        }

        let mut error = Some(error);
        for entry in &self.entries {
            let handler = match entry {
                Entry::Error(handler) => handler,
                Entry::Normal(_) => continue,
            };
            let current = match error.take() {
                Some(current) => current,
                None => break,
            };
            if let Err(e) = handler.handle(current, request, response).await {
                error = Some(e);
            }
            if response.headers_sent() {
                return;
            }
        }

        default_error_response(&error.unwrap_or_else(|| HandlerError::new("")), response);
    }
}

/// Runs a route-scoped list of normal middleware.
///
/// Stops at the first error, which is returned to the caller: the
/// dispatcher, not this helper, forwards it into the pipeline's error flow.
/// A middleware emitting a response also ends the stack.
pub async fn run_route_stack(
    stack: &[Arc<dyn Middleware>],
    request: &mut Request,
    response: &mut Response,
) -> Result<(), HandlerError> {
    for middleware in stack {
        middleware.handle(request, response).await?;
        if response.headers_sent() {
            break;
        }
    }
    Ok(())
}

/// Last-resort 500 when no error handler produced a response.
fn default_error_response(error: &HandlerError, response: &mut Response) {
    let message = if error.message().is_empty() { "Internal Server Error" } else { error.message() };
    debug!("unhandled pipeline error: {message}");
    response.status(500).json(&json!({ "error": message }));
}
