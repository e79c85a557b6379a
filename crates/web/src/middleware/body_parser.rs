//! Request body parsing.

use std::collections::HashMap;

use async_trait::async_trait;
use rivet_http::protocol::{percent_decode, ParsedBody, Request, Response};
use serde_json::{json, Value};

use crate::error::HandlerError;
use crate::pipeline::Middleware;

/// Populates `request.parsed_body` from the request content-type.
///
/// JSON bodies that fail to decode answer 400 directly and end the walk;
/// everything else degrades to the raw text.
pub struct BodyParser;

#[async_trait]
impl Middleware for BodyParser {
    async fn handle(&self, request: &mut Request, response: &mut Response) -> Result<(), HandlerError> {
        if request.body().is_empty() {
            request.set_parsed_body(ParsedBody::Empty);
            return Ok(());
        }

        match content_type_base(request).as_deref() {
            Some("application/json") => {
                let parsed: Result<Value, _> = serde_json::from_slice(request.body());
                match parsed {
                    Ok(value) => request.set_parsed_body(ParsedBody::Json(value)),
                    Err(_) => {
                        response.status(400).json(&json!({ "error": "Invalid JSON in request body" }));
                    }
                }
            }
            Some("application/x-www-form-urlencoded") => {
                let text = String::from_utf8_lossy(request.body()).into_owned();
                request.set_parsed_body(ParsedBody::Form(parse_form(&text)));
            }
            _ => {
                let text = String::from_utf8_lossy(request.body()).into_owned();
                request.set_parsed_body(ParsedBody::Raw(text));
            }
        }
        Ok(())
    }
}

fn content_type_base(request: &Request) -> Option<String> {
    request
        .header("content-type")
        .and_then(|value| value.split(';').next())
        .map(|value| value.trim().to_ascii_lowercase())
}

/// Form bodies convert `+` to a space in values before percent-decoding;
/// query strings never do.
fn parse_form(body: &str) -> HashMap<String, String> {
    let mut form = HashMap::new();
    for pair in body.split('&') {
        if pair.is_empty() {
            continue;
        }
        match pair.split_once('=') {
            Some((key, value)) => {
                form.insert(percent_decode(key), percent_decode(&value.replace('+', " ")));
            }
            None => {
                form.insert(percent_decode(pair), String::new());
            }
        }
    }
    form
}
