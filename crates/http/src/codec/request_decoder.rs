//! HTTP request recognition.
//!
//! [`parse`] is a pure function over the connection's accumulated bytes: it
//! inspects only the prefix that could be the next request and reports one of
//! three outcomes: the prefix is still incomplete, it is a complete request
//! (plus the exact byte count it consumed), or the framing is broken beyond
//! recovery. It never mutates its input, which is what makes pipelined
//! requests safe: the caller drops exactly `consumed` bytes and parses again.
//!
//! [`RequestDecoder`] adapts `parse` to [`tokio_util::codec::Decoder`] so the
//! connection driver can run it under a `FramedRead`.

use bytes::{Buf, Bytes, BytesMut};
use memchr::memmem;
use tokio_util::codec::Decoder;
use tracing::trace;

use crate::codec::chunked_decoder::decode_chunked;
use crate::ensure;
use crate::protocol::{parse_query, HeaderMap, Method, ParseError, ParsedBody, Request};

/// Largest permitted buffer without a complete header section.
pub const MAX_HEADER_BYTES: usize = 8 * 1024;

/// Largest permitted declared content-length.
pub const MAX_BODY_BYTES: usize = 1024 * 1024;

const BOUNDARY: &[u8] = b"\r\n\r\n";

/// Outcome of inspecting the buffer prefix for one request.
#[derive(Debug)]
pub enum ParseOutcome {
    /// More bytes are needed before the next request can be recognized.
    Incomplete,
    /// One complete request; the first `consumed` buffer bytes belong to it.
    Parsed { request: Request, consumed: usize },
}

/// Recognizes the next request in `buffer` without consuming it.
pub fn parse(buffer: &[u8]) -> Result<ParseOutcome, ParseError> {
    let header_end = match memmem::find(buffer, BOUNDARY) {
        Some(offset) => offset,
        None => {
            ensure!(buffer.len() <= MAX_HEADER_BYTES, ParseError::HeadersTooLarge);
            return Ok(ParseOutcome::Incomplete);
        }
    };
    ensure!(header_end > 0, ParseError::EmptyRequest);

    let head = String::from_utf8_lossy(&buffer[..header_end]);
    let mut lines = head.split("\r\n");
    let request_line = lines.next().unwrap_or_default();

    let fields: Vec<&str> = request_line.split(' ').collect();
    ensure!(fields.len() == 3 && fields.iter().all(|f| !f.is_empty()), ParseError::MalformedRequestLine);

    let method = Method::try_from(fields[0])?;
    let url = fields[1];
    let version = fields[2];
    ensure!(version.starts_with("HTTP/"), ParseError::MalformedVersion);

    let (path, raw_query) = match url.split_once('?') {
        Some((path, query)) => (path, query),
        None => (url, ""),
    };
    let query = parse_query(raw_query);

    let mut headers = HeaderMap::new();
    for line in lines {
        // only the first colon splits, so values may contain colons
        let (name, value) = line.split_once(':').ok_or(ParseError::MalformedHeaderLine)?;
        headers.insert(name.trim(), value.trim().to_owned());
    }

    let body_start = header_end + BOUNDARY.len();
    let (body, consumed) = match body_framing(&headers) {
        BodyFraming::Chunked => match decode_chunked(&buffer[body_start..])? {
            Some((body, used)) => (body, body_start + used),
            None => return Ok(ParseOutcome::Incomplete),
        },
        BodyFraming::Length(length) => {
            ensure!(length <= MAX_BODY_BYTES, ParseError::PayloadTooLarge);
            if buffer.len() - body_start < length {
                return Ok(ParseOutcome::Incomplete);
            }
            (Bytes::copy_from_slice(&buffer[body_start..body_start + length]), body_start + length)
        }
        BodyFraming::None => (Bytes::new(), body_start),
    };

    trace!(method = %method, path, consumed, "recognized request");

    let request = Request {
        method,
        url: url.to_owned(),
        path: path.to_owned(),
        query,
        http_version: version.to_owned(),
        headers,
        body,
        consumed_bytes: consumed,
        params: Default::default(),
        parsed_body: ParsedBody::Empty,
        user: None,
        remote_addr: None,
    };
    Ok(ParseOutcome::Parsed { request, consumed })
}

enum BodyFraming {
    Chunked,
    Length(usize),
    None,
}

fn body_framing(headers: &HeaderMap) -> BodyFraming {
    if let Some(te) = headers.get("transfer-encoding") {
        if te.trim().eq_ignore_ascii_case("chunked") {
            return BodyFraming::Chunked;
        }
    }
    match headers.get("content-length").and_then(|value| value.trim().parse::<usize>().ok()) {
        Some(length) if length > 0 => BodyFraming::Length(length),
        _ => BodyFraming::None,
    }
}

/// [`Decoder`] adapter over [`parse`]: advances the buffer by exactly the
/// consumed byte count of each recognized request.
pub struct RequestDecoder;

impl RequestDecoder {
    pub fn new() -> Self {
        Self
    }
}

impl Default for RequestDecoder {
    fn default() -> Self {
        Self::new()
    }
}

impl Decoder for RequestDecoder {
    type Item = Request;
    type Error = ParseError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        if src.is_empty() {
            return Ok(None);
        }
        match parse(src)? {
            ParseOutcome::Incomplete => Ok(None),
            ParseOutcome::Parsed { request, consumed } => {
                src.advance(consumed);
                Ok(Some(request))
            }
        }
    }

    // A peer closing mid-request abandons the buffered partial bytes; no
    // error response can be framed for a request that never completed.
    fn decode_eof(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        match self.decode(src)? {
            Some(request) => Ok(Some(request)),
            None => {
                src.clear();
                Ok(None)
            }
        }
    }
}
