//! Error types for the chirp client pipeline.
//!
//! # Design
//! Every failure a call can produce is a `ClientError`. The pipeline never
//! retries and never distinguishes transient from permanent failures, so the
//! variants describe *where* the call failed rather than what to do about it:
//! before any request (`Configuration`, `Attachment`), on the wire
//! (`Transport`), at the API (`Api`), or while decoding a 200 body (`Decode`).
//!
//! `status()` flattens the taxonomy into the HTTP status the caller saw, with
//! `0` as the sentinel for "no HTTP response".

use std::path::PathBuf;

use thiserror::Error;

/// Status reported for failures that never produced an HTTP response.
pub const NO_STATUS: u16 = 0;

/// Errors returned by `Client` construction and `Client::execute`.
#[derive(Debug, Error)]
pub enum ClientError {
    /// The client configuration is unusable, e.g. the decoder does not
    /// support the configured response format.
    #[error("configuration error: {message}")]
    Configuration { message: String },

    /// The request never got an HTTP response (DNS, TLS, refused, timeout).
    #[error("request error: {message}")]
    Transport { message: String },

    /// The server answered with a status other than 200.
    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },

    /// The server answered 200 but the body is not valid for the decoder.
    #[error("{message}\ncontent:\n{payload}")]
    Decode { message: String, payload: String },

    /// An attachment file could not be read.
    #[error("cannot read attachment {}: {source}", .path.display())]
    Attachment {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl ClientError {
    pub(crate) fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    /// HTTP status of the failed call, or [`NO_STATUS`] when the server was
    /// never reached or the failure is not an API response.
    #[must_use]
    pub const fn status(&self) -> u16 {
        match self {
            Self::Api { status, .. } => *status,
            _ => NO_STATUS,
        }
    }
}

/// A transport-level failure, carrying the underlying client's message.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("{message}")]
pub struct TransportError {
    pub message: String,
}

impl TransportError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl From<TransportError> for ClientError {
    fn from(err: TransportError) -> Self {
        Self::Transport {
            message: err.message,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn api_error_reports_its_status() {
        let err = ClientError::Api {
            status: 403,
            message: "rate limit".to_string(),
        };
        assert_eq!(err.status(), 403);
        assert_eq!(err.to_string(), "API error (403): rate limit");
    }

    #[test]
    fn non_api_errors_report_sentinel_status() {
        let transport: ClientError = TransportError::new("connection refused").into();
        assert_eq!(transport.status(), NO_STATUS);
        assert_eq!(transport.to_string(), "request error: connection refused");

        let decode = ClientError::Decode {
            message: "JSON parse error: expected value".to_string(),
            payload: "nope".to_string(),
        };
        assert_eq!(decode.status(), NO_STATUS);
        assert!(decode.to_string().ends_with("content:\nnope"));

        assert_eq!(ClientError::configuration("bad").status(), NO_STATUS);
    }

    #[test]
    fn attachment_error_names_the_path() {
        let err = ClientError::Attachment {
            path: PathBuf::from("/tmp/missing.png"),
            source: std::io::Error::new(std::io::ErrorKind::NotFound, "no such file"),
        };
        let text = err.to_string();
        assert!(text.contains("/tmp/missing.png"));
        assert!(text.contains("no such file"));
    }
}
