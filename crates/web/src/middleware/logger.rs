use async_trait::async_trait;
use rivet_http::protocol::{Request, Response};
use tracing::info;

use crate::error::HandlerError;
use crate::pipeline::Middleware;

/// Logs one line per request as it enters the pipeline.
pub struct Logger;

#[async_trait]
impl Middleware for Logger {
    async fn handle(&self, request: &mut Request, _response: &mut Response) -> Result<(), HandlerError> {
        match request.remote_addr() {
            Some(remote) => info!(method = %request.method(), path = request.path(), %remote, "request"),
            None => info!(method = %request.method(), path = request.path(), "request"),
        }
        Ok(())
    }
}
