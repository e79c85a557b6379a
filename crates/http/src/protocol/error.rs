//! Error types for HTTP protocol handling
//!
//! [`ParseError`] covers everything that can go wrong while recognizing a
//! request in the input buffer. Each variant's display text is the exact
//! message carried in the wire-level error response, and [`ParseError::status`]
//! supplies the matching status code. [`HttpError`] is the top-level error a
//! connection can end with: a framing failure or a socket failure.

use std::io;
use thiserror::Error;

/// Errors raised while recognizing a request in the input buffer.
///
/// Framing errors are terminal for the connection: once the byte stream can
/// no longer be trusted, the driver answers with a minimal error response and
/// closes the socket.
#[derive(Debug, Error)]
pub enum ParseError {
    /// Buffer grew past the header cap without a complete header section
    #[error("Headers too large")]
    HeadersTooLarge,

    /// Declared content-length exceeds the body cap
    #[error("Payload too large")]
    PayloadTooLarge,

    /// Header boundary found at offset zero
    #[error("Empty request")]
    EmptyRequest,

    /// Request line did not tokenize to method, target and version
    #[error("Malformed request line")]
    MalformedRequestLine,

    /// Method outside the recognized set
    #[error("Unsupported HTTP method")]
    UnsupportedMethod,

    /// Version field missing the `HTTP/` prefix
    #[error("Malformed HTTP version")]
    MalformedVersion,

    /// Header line without a `:` separator
    #[error("Malformed header line")]
    MalformedHeaderLine,

    /// Chunk size line is not hexadecimal
    #[error("Invalid chunk size")]
    InvalidChunkSize,

    /// Chunk framing ends before the declared chunk data does
    #[error("Incomplete chunk data")]
    IncompleteChunkData,

    /// I/O error surfaced through the framed reader
    #[error("io error: {source}")]
    Io {
        #[from]
        source: io::Error,
    },
}

impl ParseError {
    /// Status code of the wire response this error maps to.
    pub fn status(&self) -> u16 {
        match self {
            ParseError::HeadersTooLarge | ParseError::PayloadTooLarge => 413,
            _ => 400,
        }
    }
}

/// The top-level error a connection can end with.
#[derive(Debug, Error)]
pub enum HttpError {
    /// Request framing could not be trusted any further
    #[error("parse error: {source}")]
    Parse {
        #[from]
        source: ParseError,
    },

    /// The socket failed while reading or writing
    #[error("io error: {source}")]
    Io {
        #[from]
        source: io::Error,
    },
}
