//! Query-string parsing and percent-decoding.

use std::collections::HashMap;

use percent_encoding::percent_decode_str;

/// Percent-decodes one URL component. Invalid sequences decode lossily
/// instead of failing the request.
pub fn percent_decode(input: &str) -> String {
    percent_decode_str(input).decode_utf8_lossy().into_owned()
}

/// Parses a raw query string into a map.
///
/// Later duplicates win and a bare key maps to the empty string. `+` is left
/// untouched here: only form bodies convert it to a space.
pub fn parse_query(raw: &str) -> HashMap<String, String> {
    let mut query = HashMap::new();
    if raw.is_empty() {
        return query;
    }

    for token in raw.split('&') {
        if token.is_empty() {
            continue;
        }
        match token.split_once('=') {
            Some((key, value)) => query.insert(percent_decode(key), percent_decode(value)),
            None => query.insert(percent_decode(token), String::new()),
        };
    }

    query
}
