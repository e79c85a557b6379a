//! The per-connection driver.
//!
//! One [`HttpConnection`] owns an accepted socket for its whole life. It
//! drains complete requests from the read half in arrival order (pipelined
//! requests already buffered are dispatched before the socket is read
//! again), hands each one to the [`Handler`], writes the emitted response
//! back, and keeps going while the connection disposition allows it.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use futures::StreamExt;
use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt};
use tokio::time::timeout;
use tokio_util::codec::FramedRead;
use tracing::{debug, info, warn};

use crate::codec::{RequestDecoder, MAX_HEADER_BYTES};
use crate::handler::Handler;
use crate::protocol::{status_phrase, HttpError, ParseError, Request, Response};

/// Connections that receive no bytes for this long are closed.
pub const IDLE_TIMEOUT: Duration = Duration::from_secs(30);

/// Drives one accepted connection to completion.
pub struct HttpConnection<R, W> {
    framed_read: FramedRead<R, RequestDecoder>,
    writer: W,
    peer_addr: SocketAddr,
}

impl<R, W> HttpConnection<R, W>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    pub fn new(reader: R, writer: W, peer_addr: SocketAddr) -> Self {
        Self {
            framed_read: FramedRead::with_capacity(reader, RequestDecoder::new(), MAX_HEADER_BYTES),
            writer,
            peer_addr,
        }
    }

    /// Request loop; returns when the connection winds down.
    pub async fn process<H>(mut self, handler: Arc<H>) -> Result<(), HttpError>
    where
        H: Handler,
    {
        loop {
            let next = match timeout(IDLE_TIMEOUT, self.framed_read.next()).await {
                Ok(next) => next,
                Err(_) => {
                    info!(peer = %self.peer_addr, "idle timeout, closing connection");
                    return Ok(());
                }
            };

            match next {
                Some(Ok(request)) => {
                    let keep_alive = self.dispatch(request, &handler).await?;
                    if !keep_alive {
                        self.writer.shutdown().await?;
                        return Ok(());
                    }
                }

                Some(Err(e)) => {
                    warn!(peer = %self.peer_addr, "framing error: {e}");
                    // framing trust is gone; answer raw and drop the socket
                    let bytes = framing_error_response(&e);
                    let _ = self.writer.write_all(&bytes).await;
                    let _ = self.writer.flush().await;
                    return Err(e.into());
                }

                None => {
                    debug!(peer = %self.peer_addr, "peer closed connection");
                    return Ok(());
                }
            }
        }
    }

    async fn dispatch<H: Handler>(&mut self, mut request: Request, handler: &Arc<H>) -> Result<bool, HttpError> {
        request.set_remote_addr(self.peer_addr);
        let keep_alive = request.keep_alive();

        let mut response = Response::new();
        response.set_header("connection", if keep_alive { "keep-alive" } else { "close" });

        handler.call(&mut request, &mut response).await;

        match response.take_output() {
            Some(bytes) => {
                self.writer.write_all(&bytes).await?;
                self.writer.flush().await?;
                debug!(peer = %self.peer_addr, status = response.status_code(), "response written");
            }
            None => {
                warn!(peer = %self.peer_addr, path = request.path(), "handler finished without emitting a response");
            }
        }

        Ok(keep_alive)
    }
}

/// Raw writer for framing failures: no response object exists yet, but the
/// body keeps the canonical `{"error": ...}` shape.
fn framing_error_response(error: &ParseError) -> Bytes {
    let status = error.status();
    let body = serde_json::json!({ "error": error.to_string() }).to_string();
    let text = format!(
        "HTTP/1.1 {} {}\r\ncontent-type: application/json; charset=utf-8\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{}",
        status,
        status_phrase(status),
        body.len(),
        body,
    );
    Bytes::from(text.into_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use serde_json::json;
    use tokio::io::{duplex, split, AsyncReadExt};

    struct JsonHandler;

    #[async_trait]
    impl Handler for JsonHandler {
        async fn call(&self, request: &mut Request, response: &mut Response) {
            response.json(&json!({ "path": request.path() }));
        }
    }

    fn peer() -> SocketAddr {
        "127.0.0.1:42000".parse().unwrap()
    }

    async fn drive(input: &[u8]) -> String {
        let (mut client, remote) = duplex(64 * 1024);
        let (reader, writer) = split(remote);

        let task = tokio::spawn(async move {
            let _ = HttpConnection::new(reader, writer, peer()).process(Arc::new(JsonHandler)).await;
        });

        client.write_all(input).await.unwrap();
        client.shutdown().await.unwrap();

        let mut output = Vec::new();
        client.read_to_end(&mut output).await.unwrap();
        task.await.unwrap();

        String::from_utf8_lossy(&output).into_owned()
    }

    #[tokio::test]
    async fn single_request_round_trip() {
        let output = drive(b"GET /hello HTTP/1.1\r\nHost: localhost\r\nConnection: close\r\n\r\n").await;

        assert!(output.starts_with("HTTP/1.1 200 OK\r\n"));
        assert!(output.contains("connection: close\r\n"));
        assert!(output.ends_with(r#"{"path":"/hello"}"#));
    }

    #[tokio::test]
    async fn pipelined_requests_are_answered_in_order() {
        let output = drive(b"GET /a HTTP/1.1\r\n\r\nGET /b HTTP/1.1\r\n\r\n").await;

        assert_eq!(output.matches("HTTP/1.1 200 OK").count(), 2);
        let first = output.find(r#"{"path":"/a"}"#).unwrap();
        let second = output.find(r#"{"path":"/b"}"#).unwrap();
        assert!(first < second);
        assert!(output.contains("connection: keep-alive\r\n"));
    }

    #[tokio::test]
    async fn framing_error_gets_a_raw_response_and_a_closed_socket() {
        let output = drive(b"BREW / HTTP/1.1\r\nHost: localhost\r\n\r\nGET /next HTTP/1.1\r\n\r\n").await;

        assert!(output.starts_with("HTTP/1.1 400 Bad Request\r\n"));
        assert!(output.contains("connection: close\r\n"));
        assert!(output.contains(r#"{"error":"Unsupported HTTP method"}"#));
        // nothing after the error response: the pipelined request was dropped
        assert_eq!(output.matches("HTTP/1.1").count(), 1);
    }

    #[tokio::test]
    async fn connection_close_stops_the_loop() {
        let output = drive(b"GET /a HTTP/1.1\r\nConnection: close\r\n\r\nGET /b HTTP/1.1\r\n\r\n").await;

        assert_eq!(output.matches("HTTP/1.1 200 OK").count(), 1);
        assert!(output.contains(r#"{"path":"/a"}"#));
    }

    #[tokio::test]
    async fn partial_request_at_eof_is_abandoned() {
        let output = drive(b"GET /incomplete HTTP/1.1\r\nHost: local").await;
        assert!(output.is_empty());
    }
}
