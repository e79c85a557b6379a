//! The parsed request record.

use std::collections::HashMap;
use std::net::SocketAddr;

use bytes::Bytes;
use serde_json::Value;

use crate::protocol::{HeaderMap, Method, ParsedBody};

/// One complete request, owned for the span of a single dispatch.
///
/// The parser fills the wire-level fields. `params` is populated by the
/// router once a route matches, `parsed_body` by the body-parsing middleware
/// and `user` by the auth guard; all three start empty.
#[derive(Debug, PartialEq)]
pub struct Request {
    pub(crate) method: Method,
    pub(crate) url: String,
    pub(crate) path: String,
    pub(crate) query: HashMap<String, String>,
    pub(crate) http_version: String,
    pub(crate) headers: HeaderMap,
    pub(crate) body: Bytes,
    pub(crate) consumed_bytes: usize,
    pub(crate) params: HashMap<String, String>,
    pub(crate) parsed_body: ParsedBody,
    pub(crate) user: Option<Value>,
    pub(crate) remote_addr: Option<SocketAddr>,
}

impl Request {
    pub fn method(&self) -> Method {
        self.method
    }

    /// Raw request-target from the request line, query string included.
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Request-target before `?`, as received (not percent-decoded).
    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn query(&self) -> &HashMap<String, String> {
        &self.query
    }

    pub fn query_param(&self, name: &str) -> Option<&str> {
        self.query.get(name).map(String::as_str)
    }

    pub fn http_version(&self) -> &str {
        &self.http_version
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// Case-insensitive header lookup.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name)
    }

    /// Body bytes; for chunked transfer, the decoded chunk concatenation.
    pub fn body(&self) -> &Bytes {
        &self.body
    }

    /// Bytes this request consumed from the connection buffer.
    pub fn consumed_bytes(&self) -> usize {
        self.consumed_bytes
    }

    pub fn params(&self) -> &HashMap<String, String> {
        &self.params
    }

    pub fn param(&self, name: &str) -> Option<&str> {
        self.params.get(name).map(String::as_str)
    }

    pub fn set_params(&mut self, params: HashMap<String, String>) {
        self.params = params;
    }

    pub fn parsed_body(&self) -> &ParsedBody {
        &self.parsed_body
    }

    pub fn set_parsed_body(&mut self, parsed_body: ParsedBody) {
        self.parsed_body = parsed_body;
    }

    /// Verified token claims, present once the auth guard has admitted the
    /// request.
    pub fn user(&self) -> Option<&Value> {
        self.user.as_ref()
    }

    pub fn set_user(&mut self, claims: Value) {
        self.user = Some(claims);
    }

    /// Peer address of the connection this request arrived on.
    pub fn remote_addr(&self) -> Option<SocketAddr> {
        self.remote_addr
    }

    pub fn set_remote_addr(&mut self, addr: SocketAddr) {
        self.remote_addr = Some(addr);
    }

    /// Connection disposition after this request.
    ///
    /// HTTP/1.1 defaults to keep-alive unless the client sent
    /// `connection: close`; HTTP/1.0 defaults to close unless it sent
    /// `connection: keep-alive`.
    pub fn keep_alive(&self) -> bool {
        let connection = self.header("connection").map(str::trim);
        if self.http_version == "HTTP/1.0" {
            matches!(connection, Some(value) if value.eq_ignore_ascii_case("keep-alive"))
        } else {
            !matches!(connection, Some(value) if value.eq_ignore_ascii_case("close"))
        }
    }
}
