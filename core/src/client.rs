//! The request/response pipeline.
//!
//! # Design
//! `Client` holds immutable configuration, one signing strategy, and one
//! transport, so a single instance can serve concurrent callers without
//! locking. A call is split the same way at every step:
//! `build_request` (URL, parameters, attachment) produces an `HttpRequest`,
//! the signer decorates it, the transport sends it once, and
//! `parse_response` classifies the status and decodes the body. Building and
//! parsing touch no I/O besides reading an attachment file, so both are
//! usable and testable on their own.

use std::fmt;
use std::sync::Arc;
use std::time::Instant;

use crate::auth::{Credential, SignRequest};
use crate::config::ClientConfig;
use crate::decoder::{ContentDecoder, Payload};
use crate::error::ClientError;
use crate::http::{HttpMethod, HttpRequest, HttpResponse, MultipartPart, RequestBody};
use crate::params::Params;
use crate::request::RequestSpec;
use crate::transport::{Transport, UreqTransport};

/// Subdomain used when a request does not override it.
pub const DEFAULT_SUBDOMAIN: &str = "api";

/// Result of one API call.
pub type ResponseOutcome = Result<Payload, ClientError>;

/// Typed entry point to the API.
pub struct Client {
    config: ClientConfig,
    signer: Arc<dyn SignRequest>,
    transport: Box<dyn Transport>,
}

impl fmt::Debug for Client {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Client")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl Client {
    /// Create a client that sends requests with [`UreqTransport`].
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Configuration`] if the configured decoder does
    /// not support the configured response format.
    pub fn new(
        signer: impl SignRequest + 'static,
        config: ClientConfig,
    ) -> Result<Self, ClientError> {
        let transport = UreqTransport::new(config.timeout_ms);
        Self::with_transport(signer, config, transport)
    }

    /// Create a client with an explicit transport.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Configuration`] on an invalid configuration;
    /// no request is attempted.
    pub fn with_transport(
        signer: impl SignRequest + 'static,
        config: ClientConfig,
        transport: impl Transport + 'static,
    ) -> Result<Self, ClientError> {
        config.validate()?;
        Ok(Self {
            config,
            signer: Arc::new(signer),
            transport: Box::new(transport),
        })
    }

    /// Create a client from `CHIRP_*` environment variables.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Configuration`] for invalid or partial
    /// settings.
    pub fn from_env() -> Result<Self, ClientError> {
        let config = ClientConfig::from_env()?;
        let credential = Credential::from_env()?;
        Self::new(credential, config)
    }

    pub const fn config(&self) -> &ClientConfig {
        &self.config
    }

    fn decoder(&self) -> &dyn ContentDecoder {
        self.config.decoder.as_ref()
    }

    /// Absolute URL for `path`:
    /// `{scheme}://{subdomain}.{host}/{version}/{path}.{format}`.
    ///
    /// An empty `subdomain` addresses `host` directly.
    pub fn url_for(&self, path: &str, subdomain: Option<&str>) -> String {
        let subdomain = subdomain.unwrap_or(DEFAULT_SUBDOMAIN);
        let authority = if subdomain.is_empty() {
            self.config.host.clone()
        } else {
            format!("{subdomain}.{}", self.config.host)
        };

        let mut url = format!("{}://{authority}/", self.config.scheme());
        let version = self.config.api_version.trim_matches('/');
        if !version.is_empty() {
            url.push_str(version);
            url.push('/');
        }
        url.push_str(path.trim_matches('/'));
        url.push('.');
        url.push_str(self.config.response_format.extension());
        url
    }

    /// Build the unsigned request for `spec`.
    ///
    /// GET parameters go to the query string, POST parameters to a
    /// urlencoded body, and an attachment turns the body into multipart with
    /// every parameter as a text field. Null parameters are dropped.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Attachment`] if an attachment file cannot be
    /// read.
    pub fn build_request(&self, spec: &RequestSpec) -> Result<HttpRequest, ClientError> {
        let method = spec.effective_method();
        let url = self.url_for(&spec.path, spec.subdomain.as_deref());
        let pairs = spec.params.wire_pairs();
        let mut request = HttpRequest::new(method, url);

        match (&spec.attachment, method) {
            (Some(attachment), _) => {
                let (filename, data) = attachment.load()?;
                let mut parts: Vec<MultipartPart> = pairs
                    .into_iter()
                    .map(|(name, value)| MultipartPart::text(name, value))
                    .collect();
                parts.push(MultipartPart::file(&attachment.field_name, filename, data));
                request.body = Some(RequestBody::Multipart {
                    boundary: new_boundary(),
                    parts,
                });
            }
            (None, HttpMethod::Get) => request.query = pairs,
            (None, HttpMethod::Post) => request.body = Some(RequestBody::Form(pairs)),
        }

        if let Some(content_type) = request.body.as_ref().map(RequestBody::content_type) {
            request.set_header("Content-Type", content_type);
        }
        Ok(request)
    }

    /// Classify `response` and decode its body.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Api`] for any status other than 200 and
    /// [`ClientError::Decode`] when a 200 body does not decode.
    pub fn parse_response(&self, response: HttpResponse) -> ResponseOutcome {
        check_status(&response, self.decoder())?;
        if response.body.is_empty() {
            return Ok(Payload::Raw(response.body));
        }
        self.decoder().parse_content(&response.body)
    }

    /// Run one API call: build, sign, send once, classify, decode.
    ///
    /// # Errors
    ///
    /// Any [`ClientError`]; nothing is retried.
    pub fn execute(&self, spec: RequestSpec) -> ResponseOutcome {
        let mut request = self.build_request(&spec)?;
        self.signer.sign(&mut request)?;

        tracing::debug!(
            method = %request.method,
            url = %request.url,
            subdomain = spec.subdomain.as_deref().unwrap_or(DEFAULT_SUBDOMAIN),
            params = spec.params.len(),
            attachment = spec.attachment.is_some(),
            "sending API request"
        );
        tracing::trace!(request = ?request.body, query = ?request.query, "request payload");

        let start = Instant::now();
        let response = self.transport.send(&request).map_err(|e| {
            tracing::error!(url = %request.url, error = %e, "API request failed");
            ClientError::from(e)
        })?;

        tracing::debug!(
            url = %request.url,
            status = response.status,
            bytes = response.body.len(),
            elapsed_ms = u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX),
            "API response received"
        );
        tracing::trace!(body = %String::from_utf8_lossy(&response.body), "response payload");

        self.parse_response(response)
    }

    /// `execute` a GET of `path` with `params`.
    ///
    /// # Errors
    ///
    /// See [`Client::execute`].
    pub fn get(&self, path: &str, params: Params) -> ResponseOutcome {
        self.execute(RequestSpec::get(path).params(params))
    }

    /// `execute` a POST of `path` with `params`.
    ///
    /// # Errors
    ///
    /// See [`Client::execute`].
    pub fn post(&self, path: &str, params: Params) -> ResponseOutcome {
        self.execute(RequestSpec::post(path).params(params))
    }
}

/// Anything but 200 is an API error carrying the decoder's message.
fn check_status(response: &HttpResponse, decoder: &dyn ContentDecoder) -> Result<(), ClientError> {
    if response.status == 200 {
        return Ok(());
    }
    let message = decoder.parse_error(&response.body);
    tracing::warn!(status = response.status, message = %message, "API returned an error");
    Err(ClientError::Api {
        status: response.status,
        message,
    })
}

fn new_boundary() -> String {
    format!("chirp-{}", uuid::Uuid::new_v4().simple())
}
