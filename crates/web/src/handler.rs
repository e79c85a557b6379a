//! Route handler abstractions.

use std::future::Future;
use std::pin::Pin;

use async_trait::async_trait;
use rivet_http::protocol::{Request, Response};

use crate::error::HandlerError;

/// Boxed future returned by function handlers.
pub type HandlerFuture<'a> = Pin<Box<dyn Future<Output = Result<(), HandlerError>> + Send + 'a>>;

/// A terminal request handler.
///
/// Expected to emit the response; an `Err` return is routed into the
/// pipeline's error flow instead.
#[async_trait]
pub trait RouteHandler: Send + Sync {
    async fn invoke(&self, request: &mut Request, response: &mut Response) -> Result<(), HandlerError>;
}

/// Adapter turning a plain function into a [`RouteHandler`].
///
/// Handlers are written as functions returning a [`HandlerFuture`]:
///
/// ```ignore
/// fn hello<'a>(_req: &'a mut Request, res: &'a mut Response) -> HandlerFuture<'a> {
///     Box::pin(async move {
///         res.text("hello");
///         Ok(())
///     })
/// }
///
/// let router = Router::new().get("/hello", handler_fn(hello));
/// ```
pub struct FnHandler<F>(F);

#[async_trait]
impl<F> RouteHandler for FnHandler<F>
where
    F: for<'a> Fn(&'a mut Request, &'a mut Response) -> HandlerFuture<'a> + Send + Sync,
{
    async fn invoke(&self, request: &mut Request, response: &mut Response) -> Result<(), HandlerError> {
        (self.0)(request, response).await
    }
}

pub fn handler_fn<F>(f: F) -> FnHandler<F>
where
    F: for<'a> Fn(&'a mut Request, &'a mut Response) -> HandlerFuture<'a> + Send + Sync,
{
    FnHandler(f)
}
