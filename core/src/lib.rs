//! Blocking client pipeline for a social-network HTTP API.
//!
//! # Overview
//! Endpoint methods describe a call as a [`RequestSpec`] (verb, path,
//! parameters, optional attachment and subdomain). [`Client::execute`] turns
//! it into a URL of the form `{scheme}://{subdomain}.{host}/{version}/{path}.{format}`,
//! encodes the parameters, signs the request with the configured
//! [`Credential`], sends it once through a [`Transport`], and decodes the
//! response with the configured [`ContentDecoder`].
//!
//! # Design
//! - One synchronous attempt per call. No retries, caching, or rate-limit
//!   handling.
//! - Any status other than 200 is an API error; the decoder extracts the
//!   message and never fails while doing so.
//! - Null parameters are dropped before encoding.
//! - Decoders and signers are traits, so new formats and auth schemes plug in
//!   without touching the pipeline.
//!
//! # Example
//!
//! ```no_run
//! use chirp_core::{Client, ClientConfig, Credential, RequestSpec};
//!
//! let client = Client::new(Credential::None, ClientConfig::new())?;
//! let results = client.execute(
//!     RequestSpec::get("search").param("q", "rust").subdomain("search"),
//! )?;
//! println!("{results:?}");
//! # Ok::<(), chirp_core::ClientError>(())
//! ```

pub mod auth;
pub mod client;
pub mod config;
pub mod decoder;
pub mod error;
pub mod http;
pub mod params;
pub mod request;
pub mod transport;

pub use auth::{Credential, NonceSource, NoncedCredential, SignRequest, SystemNonceSource};
pub use client::{Client, ResponseOutcome, DEFAULT_SUBDOMAIN};
pub use config::{ClientConfig, ResponseFormat};
pub use decoder::{ContentDecoder, JsonDecoder, Payload, RawDecoder};
pub use error::{ClientError, TransportError};
pub use http::{HttpMethod, HttpRequest, HttpResponse, MultipartPart, RequestBody};
pub use params::{ParamValue, Params};
pub use request::{Attachment, AttachmentSource, RequestSpec};
pub use transport::{Transport, UreqTransport};
