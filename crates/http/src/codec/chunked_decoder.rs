//! Chunked transfer decoding over a buffered body region.
//!
//! Chunked bodies are decoded only once the whole encoding is buffered: the
//! decoder first scans for the terminating zero-size chunk, then walks the
//! size-line/data framing inside that region. Until the terminator arrives
//! the request simply stays incomplete.

use bytes::Bytes;
use memchr::memmem;

use crate::ensure;
use crate::protocol::ParseError;

/// Byte sequence closing a chunked body: the zero-size chunk followed by
/// the blank line.
const TERMINATOR: &[u8] = b"0\r\n\r\n";

/// Decodes a chunked body from the bytes following the header section.
///
/// Returns `None` while the terminator has not arrived. On success, yields
/// the concatenated chunk data plus the wire length of the whole encoding,
/// terminator included.
pub(crate) fn decode_chunked(input: &[u8]) -> Result<Option<(Bytes, usize)>, ParseError> {
    let terminator = match memmem::find(input, TERMINATOR) {
        Some(offset) => offset,
        None => return Ok(None),
    };
    let end = terminator + TERMINATOR.len();
    let region = &input[..end];

    let mut decoded = Vec::new();
    let mut offset = 0;
    loop {
        let line_end = memmem::find(&region[offset..], b"\r\n").ok_or(ParseError::IncompleteChunkData)?;
        let size = parse_chunk_size(&region[offset..offset + line_end])?;
        offset += line_end + 2;

        if size == 0 {
            break;
        }

        ensure!(offset + size + 2 <= region.len(), ParseError::IncompleteChunkData);
        decoded.extend_from_slice(&region[offset..offset + size]);
        ensure!(&region[offset + size..offset + size + 2] == b"\r\n", ParseError::IncompleteChunkData);
        offset += size + 2;
    }

    Ok(Some((Bytes::from(decoded), end)))
}

fn parse_chunk_size(line: &[u8]) -> Result<usize, ParseError> {
    let text = std::str::from_utf8(line).map_err(|_| ParseError::InvalidChunkSize)?;
    usize::from_str_radix(text.trim(), 16).map_err(|_| ParseError::InvalidChunkSize)
}
