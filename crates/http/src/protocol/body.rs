use std::collections::HashMap;

use serde_json::Value;

/// Decoded request body, shaped by the request content-type.
///
/// Populated by the body-parsing middleware; handlers inspect the tag.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum ParsedBody {
    /// `application/json`
    Json(Value),
    /// `application/x-www-form-urlencoded`
    Form(HashMap<String, String>),
    /// Any other content-type with a non-empty body
    Raw(String),
    /// No body, or the parser has not run
    #[default]
    Empty,
}

impl ParsedBody {
    pub fn as_json(&self) -> Option<&Value> {
        match self {
            ParsedBody::Json(value) => Some(value),
            _ => None,
        }
    }

    pub fn as_form(&self) -> Option<&HashMap<String, String>> {
        match self {
            ParsedBody::Form(form) => Some(form),
            _ => None,
        }
    }

    pub fn as_raw(&self) -> Option<&str> {
        match self {
            ParsedBody::Raw(text) => Some(text),
            _ => None,
        }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, ParsedBody::Empty)
    }
}
