//! The seam between the connection driver and the application layer.

use async_trait::async_trait;

use crate::protocol::{Request, Response};

/// Per-request entry point invoked by the connection driver.
///
/// Implementations are expected to leave the response emitted before
/// returning; the driver writes whatever was produced and moves on to the
/// next pipelined request.
#[async_trait]
pub trait Handler: Send + Sync {
    async fn call(&self, request: &mut Request, response: &mut Response);
}
