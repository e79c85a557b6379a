//! Wire-level codec: turning the connection's byte stream into request
//! records.
//!
//! [`parse`] recognizes one request in a byte buffer; [`RequestDecoder`]
//! adapts it to [`tokio_util::codec::Decoder`] for use under a `FramedRead`.
//! Chunked transfer decoding lives in its own submodule.

mod chunked_decoder;
mod request_decoder;

pub use request_decoder::parse;
pub use request_decoder::ParseOutcome;
pub use request_decoder::RequestDecoder;
pub use request_decoder::MAX_BODY_BYTES;
pub use request_decoder::MAX_HEADER_BYTES;
