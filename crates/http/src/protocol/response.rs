//! Response building and serialization.
//!
//! A [`Response`] accumulates a status, headers and a body, then serializes
//! the whole message in one shot. The `headers_sent` latch flips on the
//! first terminal call and every later terminal is a silent no-op: that
//! single-transition flag is what guarantees at most one response per
//! request, however many middleware try to answer.

use std::time::SystemTime;

use bytes::{BufMut, Bytes, BytesMut};
use serde::Serialize;
use tracing::error;

use crate::protocol::HeaderMap;

/// Reason phrase for a status code; codes outside the table render as
/// "Unknown".
pub fn status_phrase(code: u16) -> &'static str {
    match code {
        200 => "OK",
        201 => "Created",
        204 => "No Content",
        301 => "Moved Permanently",
        302 => "Found",
        304 => "Not Modified",
        400 => "Bad Request",
        401 => "Unauthorized",
        403 => "Forbidden",
        404 => "Not Found",
        405 => "Method Not Allowed",
        408 => "Request Timeout",
        413 => "Payload Too Large",
        429 => "Too Many Requests",
        500 => "Internal Server Error",
        502 => "Bad Gateway",
        503 => "Service Unavailable",
        _ => "Unknown",
    }
}

/// A single response, created per request by the connection driver.
#[derive(Debug)]
pub struct Response {
    status: u16,
    headers: HeaderMap,
    headers_sent: bool,
    output: Option<Bytes>,
}

impl Default for Response {
    fn default() -> Self {
        Self::new()
    }
}

impl Response {
    pub fn new() -> Self {
        Self { status: 200, headers: HeaderMap::new(), headers_sent: false, output: None }
    }

    /// Sets the status code; chainable.
    pub fn status(&mut self, code: u16) -> &mut Self {
        self.status = code;
        self
    }

    pub fn status_code(&self) -> u16 {
        self.status
    }

    /// Records a header under its lowercase name; chainable.
    pub fn set_header(&mut self, name: impl AsRef<str>, value: impl Into<String>) -> &mut Self {
        self.headers.insert(name, value);
        self
    }

    pub fn get_header(&self, name: &str) -> Option<&str> {
        self.headers.get(name)
    }

    pub fn remove_header(&mut self, name: &str) -> Option<String> {
        self.headers.remove(name)
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// True once a terminal has run; the request counts as resolved.
    pub fn headers_sent(&self) -> bool {
        self.headers_sent
    }

    /// Emits the response. The first call wins; later calls are dropped.
    ///
    /// Before serialization the missing defaults are filled in:
    /// `content-length` from the body, `content-type` (plain text, only for
    /// a non-empty body) and `date`.
    pub fn send(&mut self, body: impl Into<Bytes>) {
        if self.headers_sent {
            return;
        }
        self.headers_sent = true;

        let body = body.into();
        if !self.headers.contains("content-length") {
            self.headers.insert("content-length", body.len().to_string());
        }
        if !body.is_empty() && !self.headers.contains("content-type") {
            self.headers.insert("content-type", "text/plain; charset=utf-8");
        }
        if !self.headers.contains("date") {
            self.headers.insert("date", httpdate::fmt_http_date(SystemTime::now()));
        }

        let mut buf = BytesMut::with_capacity(128 + body.len());
        buf.put_slice(format!("HTTP/1.1 {} {}\r\n", self.status, status_phrase(self.status)).as_bytes());
        for (name, value) in self.headers.iter() {
            buf.put_slice(name.as_bytes());
            buf.put_slice(b": ");
            buf.put_slice(value.as_bytes());
            buf.put_slice(b"\r\n");
        }
        buf.put_slice(b"\r\n");
        buf.put_slice(&body);
        self.output = Some(buf.freeze());
    }

    /// Serializes `value` and emits it as `application/json`.
    pub fn json<T: Serialize>(&mut self, value: &T) {
        self.set_header("content-type", "application/json; charset=utf-8");
        match serde_json::to_vec(value) {
            Ok(body) => self.send(body),
            Err(e) => {
                error!("response body serialization failed: {e}");
                self.status(500).send(&br#"{"error":"Internal Server Error"}"#[..]);
            }
        }
    }

    pub fn text(&mut self, body: impl Into<String>) {
        self.set_header("content-type", "text/plain; charset=utf-8");
        self.send(body.into().into_bytes());
    }

    pub fn html(&mut self, body: impl Into<String>) {
        self.set_header("content-type", "text/html; charset=utf-8");
        self.send(body.into().into_bytes());
    }

    /// Sets `code` and emits its reason phrase as a plain-text body.
    pub fn send_status(&mut self, code: u16) {
        self.status(code).send(status_phrase(code));
    }

    /// Hands the serialized message to the connection driver.
    pub fn take_output(&mut self) -> Option<Bytes> {
        self.output.take()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serializes_status_line_headers_and_body() {
        let mut response = Response::new();
        response.status(201).set_header("X-Request-Id", "abc");
        response.send("hello");

        let output = response.take_output().unwrap();
        let text = std::str::from_utf8(&output).unwrap();

        assert!(text.starts_with("HTTP/1.1 201 Created\r\n"));
        assert!(text.contains("x-request-id: abc\r\n"));
        assert!(text.contains("content-length: 5\r\n"));
        assert!(text.contains("content-type: text/plain; charset=utf-8\r\n"));
        assert!(text.contains("date: "));
        assert!(text.ends_with("\r\n\r\nhello"));
    }

    #[test]
    fn empty_body_gets_no_content_type() {
        let mut response = Response::new();
        response.status(204).send(Bytes::new());

        let output = response.take_output().unwrap();
        let text = std::str::from_utf8(&output).unwrap();

        assert!(text.starts_with("HTTP/1.1 204 No Content\r\n"));
        assert!(text.contains("content-length: 0\r\n"));
        assert!(!text.contains("content-type"));
    }

    #[test]
    fn explicit_content_length_is_kept() {
        let mut response = Response::new();
        response.set_header("content-length", "11");
        response.send("hello");

        let output = response.take_output().unwrap();
        let text = std::str::from_utf8(&output).unwrap();
        assert!(text.contains("content-length: 11\r\n"));
    }

    #[test]
    fn second_send_is_a_no_op() {
        let mut response = Response::new();
        response.send("first");
        assert!(response.headers_sent());

        response.status(500).send("second");
        response.json(&serde_json::json!({ "ignored": true }));

        let output = response.take_output().unwrap();
        let text = std::str::from_utf8(&output).unwrap();
        assert!(text.starts_with("HTTP/1.1 200 OK\r\n"));
        assert!(text.ends_with("first"));
        assert!(response.take_output().is_none());
    }

    #[test]
    fn json_sets_content_type_and_serializes() {
        let mut response = Response::new();
        response.json(&serde_json::json!({ "message": "ok" }));

        let output = response.take_output().unwrap();
        let text = std::str::from_utf8(&output).unwrap();
        assert!(text.contains("content-type: application/json; charset=utf-8\r\n"));
        assert!(text.ends_with(r#"{"message":"ok"}"#));
    }

    #[test]
    fn send_status_uses_the_phrase_as_body() {
        let mut response = Response::new();
        response.send_status(404);

        let output = response.take_output().unwrap();
        let text = std::str::from_utf8(&output).unwrap();
        assert!(text.starts_with("HTTP/1.1 404 Not Found\r\n"));
        assert!(text.ends_with("Not Found"));
    }

    #[test]
    fn unknown_status_phrase() {
        assert_eq!(status_phrase(299), "Unknown");
        assert_eq!(status_phrase(418), "Unknown");
    }
}
