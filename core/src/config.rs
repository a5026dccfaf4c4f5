//! Client configuration.
//!
//! This module provides:
//! - `ResponseFormat`, the extension appended to every API path
//! - `ClientConfig` with defaults and builder-style setters
//! - Loading from `CHIRP_*` environment variables

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use crate::decoder::{ContentDecoder, JsonDecoder};
use crate::error::ClientError;

/// Default API host. Requests go to `{subdomain}.{host}`.
pub const DEFAULT_HOST: &str = "twitter.com";
/// Default API version path segment.
pub const DEFAULT_API_VERSION: &str = "1";
/// Default transport timeout in milliseconds.
pub const DEFAULT_TIMEOUT_MS: u64 = 30_000;

/// Response formats the API can serve.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum ResponseFormat {
    #[default]
    Json,
    Xml,
    Rss,
    Atom,
}

impl ResponseFormat {
    /// Path extension for this format, without the dot.
    pub const fn extension(self) -> &'static str {
        match self {
            Self::Json => "json",
            Self::Xml => "xml",
            Self::Rss => "rss",
            Self::Atom => "atom",
        }
    }
}

impl fmt::Display for ResponseFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

impl FromStr for ResponseFormat {
    type Err = ClientError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "json" => Ok(Self::Json),
            "xml" => Ok(Self::Xml),
            "rss" => Ok(Self::Rss),
            "atom" => Ok(Self::Atom),
            other => Err(ClientError::configuration(format!(
                "unknown response format: {other}"
            ))),
        }
    }
}

/// Configuration fixed at client construction.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// API host without subdomain, e.g. `twitter.com`.
    pub host: String,
    /// Use `https` (default) or plain `http`.
    pub secure: bool,
    /// Version segment inserted before every path.
    pub api_version: String,
    /// Format requested from the API and appended to every path.
    pub response_format: ResponseFormat,
    /// Decoder for response bodies; must support `response_format`.
    pub decoder: Arc<dyn ContentDecoder>,
    /// Transport timeout in milliseconds.
    pub timeout_ms: u64,
}

impl ClientConfig {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_host(mut self, host: impl Into<String>) -> Self {
        self.host = host.into();
        self
    }

    #[must_use]
    pub const fn with_secure(mut self, secure: bool) -> Self {
        self.secure = secure;
        self
    }

    #[must_use]
    pub fn with_api_version(mut self, api_version: impl Into<String>) -> Self {
        self.api_version = api_version.into();
        self
    }

    #[must_use]
    pub const fn with_response_format(mut self, format: ResponseFormat) -> Self {
        self.response_format = format;
        self
    }

    #[must_use]
    pub fn with_decoder(mut self, decoder: impl ContentDecoder + 'static) -> Self {
        self.decoder = Arc::new(decoder);
        self
    }

    #[must_use]
    pub const fn with_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.timeout_ms = timeout_ms;
        self
    }

    /// `https` or `http`.
    pub const fn scheme(&self) -> &'static str {
        if self.secure {
            "https"
        } else {
            "http"
        }
    }

    /// Check that the decoder can handle the configured format.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Configuration`] on a decoder/format mismatch or
    /// an empty host.
    pub fn validate(&self) -> Result<(), ClientError> {
        if self.host.trim().is_empty() {
            return Err(ClientError::configuration("host must not be empty"));
        }
        if !self.decoder.supports_format(self.response_format) {
            return Err(ClientError::configuration(format!(
                "decoder {:?} does not support response format {}",
                self.decoder, self.response_format
            )));
        }
        Ok(())
    }

    /// Load configuration from the environment, reading `.env` if present.
    ///
    /// Optional variables (defaults in parentheses):
    /// - `CHIRP_HOST` (`twitter.com`)
    /// - `CHIRP_SECURE` (`true`)
    /// - `CHIRP_API_VERSION` (`1`)
    /// - `CHIRP_FORMAT` (`json`); a non-json format selects the raw decoder
    /// - `CHIRP_TIMEOUT_MS` (`30000`)
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Configuration`] for unparsable values.
    pub fn from_env() -> Result<Self, ClientError> {
        let _ = dotenvy::dotenv();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`ClientConfig::from_env`] with an explicit variable source.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Configuration`] for unparsable values.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ClientError> {
        let mut config = Self::default();
        if let Some(host) = lookup("CHIRP_HOST") {
            config.host = host;
        }
        if let Some(secure) = lookup("CHIRP_SECURE") {
            config.secure = parse_bool("CHIRP_SECURE", &secure)?;
        }
        if let Some(version) = lookup("CHIRP_API_VERSION") {
            config.api_version = version;
        }
        if let Some(format) = lookup("CHIRP_FORMAT") {
            config.response_format = format.parse()?;
            if config.response_format != ResponseFormat::Json {
                config.decoder = Arc::new(crate::decoder::RawDecoder);
            }
        }
        if let Some(timeout) = lookup("CHIRP_TIMEOUT_MS") {
            config.timeout_ms = timeout.trim().parse().map_err(|_| {
                ClientError::configuration(format!("CHIRP_TIMEOUT_MS is not a valid integer: {timeout}"))
            })?;
        }
        config.validate()?;
        Ok(config)
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            secure: true,
            api_version: DEFAULT_API_VERSION.to_string(),
            response_format: ResponseFormat::Json,
            decoder: Arc::new(JsonDecoder),
            timeout_ms: DEFAULT_TIMEOUT_MS,
        }
    }
}

fn parse_bool(var: &str, value: &str) -> Result<bool, ClientError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ClientError::configuration(format!(
            "{var} is not a valid boolean: {value}"
        ))),
    }
}
