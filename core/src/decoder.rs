//! Content decoders: wire bytes to values, error bodies to messages.
//!
//! # Design
//! The pipeline only talks to `ContentDecoder`, so a new response format is a
//! new implementor and never a change to `Client`. `parse_error` returns a
//! plain `String` because reporting an API error must not itself fail; every
//! decoder falls back to the raw body when it cannot make sense of it.

use std::fmt;

use serde_json::Value;

use crate::config::ResponseFormat;
use crate::error::ClientError;

/// A successful response body.
#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    /// A body decoded into a structured value.
    Structured(Value),
    /// Body bytes passed through untouched.
    Raw(Vec<u8>),
}

impl Payload {
    pub fn as_structured(&self) -> Option<&Value> {
        match self {
            Self::Structured(value) => Some(value),
            Self::Raw(_) => None,
        }
    }

    pub fn into_structured(self) -> Option<Value> {
        match self {
            Self::Structured(value) => Some(value),
            Self::Raw(_) => None,
        }
    }

    pub fn as_raw(&self) -> Option<&[u8]> {
        match self {
            Self::Raw(bytes) => Some(bytes),
            Self::Structured(_) => None,
        }
    }
}

/// Format-specific translation of response bodies.
pub trait ContentDecoder: fmt::Debug + Send + Sync {
    /// Decode a successful response body.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Decode`] when the body is not well-formed for
    /// this decoder's format.
    fn parse_content(&self, content: &[u8]) -> Result<Payload, ClientError>;

    /// Extract a human-readable message from an error response body.
    fn parse_error(&self, content: &[u8]) -> String;

    /// Whether this decoder understands `format`.
    fn supports_format(&self, format: ResponseFormat) -> bool;
}

/// Decodes JSON bodies into `serde_json::Value`.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonDecoder;

impl ContentDecoder for JsonDecoder {
    fn parse_content(&self, content: &[u8]) -> Result<Payload, ClientError> {
        serde_json::from_slice(content)
            .map(Payload::Structured)
            .map_err(|e| ClientError::Decode {
                message: format!("JSON parse error: {e}"),
                payload: String::from_utf8_lossy(content).into_owned(),
            })
    }

    fn parse_error(&self, content: &[u8]) -> String {
        let raw = String::from_utf8_lossy(content);
        let Ok(value) = serde_json::from_slice::<Value>(content) else {
            return raw.into_owned();
        };
        match value.get("error") {
            Some(Value::String(message)) => message.clone(),
            Some(other) => other.to_string(),
            None => format!("Unknown: {raw}"),
        }
    }

    fn supports_format(&self, format: ResponseFormat) -> bool {
        format == ResponseFormat::Json
    }
}

/// Passes bodies through undecoded, for callers that want the raw response
/// in whatever format they requested (xml, rss, atom, or json).
#[derive(Debug, Clone, Copy, Default)]
pub struct RawDecoder;

impl ContentDecoder for RawDecoder {
    fn parse_content(&self, content: &[u8]) -> Result<Payload, ClientError> {
        Ok(Payload::Raw(content.to_vec()))
    }

    fn parse_error(&self, content: &[u8]) -> String {
        String::from_utf8_lossy(content).into_owned()
    }

    fn supports_format(&self, _format: ResponseFormat) -> bool {
        true
    }
}
