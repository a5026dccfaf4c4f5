//! Request credentials.
//!
//! # Design
//! `Credential` is a closed set of strategies behind one capability,
//! [`SignRequest`]. The client hands every fully-built request to `sign` and
//! never looks at which variant it holds. OAuth 1.0a signing is split into a
//! pure `oauth1_authorization` function (nonce and timestamp as inputs) so
//! the signature can be checked against known vectors. Nonces and timestamps
//! come from a [`NonceSource`]; `Credential` itself uses the system clock and
//! random UUIDs, and [`Credential::with_nonces`] swaps in another source.

use std::fmt;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use hmac::{Hmac, Mac};
use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use sha1::Sha1;

use crate::error::ClientError;
use crate::http::HttpRequest;

type HmacSha1 = Hmac<Sha1>;

/// RFC 3986 unreserved characters stay as-is; everything else is encoded.
const OAUTH_ENCODE_SET: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'.')
    .remove(b'_')
    .remove(b'~');

/// Adds authentication to an outbound request.
pub trait SignRequest: Send + Sync {
    /// Decorate `request` with whatever headers authenticate it.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Configuration`] if the credential material
    /// cannot be used to sign.
    fn sign(&self, request: &mut HttpRequest) -> Result<(), ClientError>;
}

/// Supplies the per-request nonce and timestamp for OAuth 1.0a signing.
#[cfg_attr(test, mockall::automock)]
pub trait NonceSource: Send + Sync {
    fn nonce(&self) -> String;
    /// Seconds since the Unix epoch.
    fn timestamp(&self) -> i64;
}

/// Random UUID nonces and the system clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemNonceSource;

impl NonceSource for SystemNonceSource {
    fn nonce(&self) -> String {
        uuid::Uuid::new_v4().simple().to_string()
    }

    fn timestamp(&self) -> i64 {
        chrono::Utc::now().timestamp()
    }
}

/// Authentication material for the API.
#[derive(Clone, Default, PartialEq, Eq)]
pub enum Credential {
    /// Unauthenticated requests.
    #[default]
    None,
    /// HTTP basic authentication.
    Basic { username: String, password: String },
    /// OAuth 1.0a with HMAC-SHA1 request signing.
    OAuth1 {
        consumer_key: String,
        consumer_secret: String,
        token_key: String,
        token_secret: String,
    },
}

impl Credential {
    pub fn basic(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self::Basic {
            username: username.into(),
            password: password.into(),
        }
    }

    pub fn oauth1(
        consumer_key: impl Into<String>,
        consumer_secret: impl Into<String>,
        token_key: impl Into<String>,
        token_secret: impl Into<String>,
    ) -> Self {
        Self::OAuth1 {
            consumer_key: consumer_key.into(),
            consumer_secret: consumer_secret.into(),
            token_key: token_key.into(),
            token_secret: token_secret.into(),
        }
    }

    /// Load credentials from the environment, reading `.env` if present.
    ///
    /// `CHIRP_CONSUMER_KEY`, `CHIRP_CONSUMER_SECRET`, `CHIRP_TOKEN_KEY` and
    /// `CHIRP_TOKEN_SECRET` select OAuth; `CHIRP_USERNAME` and
    /// `CHIRP_PASSWORD` select basic auth; with neither set the result is
    /// [`Credential::None`].
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Configuration`] when only some of a variant's
    /// variables are set.
    pub fn from_env() -> Result<Self, ClientError> {
        let _ = dotenvy::dotenv();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`Credential::from_env`] with an explicit variable source.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Configuration`] for partial credentials.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ClientError> {
        const OAUTH_VARS: [&str; 4] = [
            "CHIRP_CONSUMER_KEY",
            "CHIRP_CONSUMER_SECRET",
            "CHIRP_TOKEN_KEY",
            "CHIRP_TOKEN_SECRET",
        ];
        const BASIC_VARS: [&str; 2] = ["CHIRP_USERNAME", "CHIRP_PASSWORD"];

        let oauth = OAUTH_VARS.map(|var| lookup(var));
        if oauth.iter().any(Option::is_some) {
            let [Some(ck), Some(cs), Some(tk), Some(ts)] = oauth else {
                return Err(missing(&OAUTH_VARS, &oauth));
            };
            return Ok(Self::oauth1(ck, cs, tk, ts));
        }

        let basic = BASIC_VARS.map(|var| lookup(var));
        if basic.iter().any(Option::is_some) {
            let [Some(username), Some(password)] = basic else {
                return Err(missing(&BASIC_VARS, &basic));
            };
            return Ok(Self::basic(username, password));
        }

        Ok(Self::None)
    }

    const fn kind(&self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Basic { .. } => "basic",
            Self::OAuth1 { .. } => "oauth1",
        }
    }
}

fn missing(vars: &[&str], values: &[Option<String>]) -> ClientError {
    let absent: Vec<&str> = vars
        .iter()
        .zip(values)
        .filter(|(_, value)| value.is_none())
        .map(|(var, _)| *var)
        .collect();
    ClientError::configuration(format!("incomplete credentials, missing {}", absent.join(", ")))
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::None => f.write_str("Credential::None"),
            Self::Basic { username, .. } => f
                .debug_struct("Credential::Basic")
                .field("username", username)
                .field("password", &"<REDACTED>")
                .finish(),
            Self::OAuth1 { consumer_key, .. } => f
                .debug_struct("Credential::OAuth1")
                .field("consumer_key", consumer_key)
                .field("consumer_secret", &"<REDACTED>")
                .field("token_key", &"<REDACTED>")
                .field("token_secret", &"<REDACTED>")
                .finish(),
        }
    }
}

impl Credential {
    /// Pair this credential with a custom nonce source.
    pub fn with_nonces<N: NonceSource>(self, nonces: N) -> NoncedCredential<N> {
        NoncedCredential {
            credential: self,
            nonces,
        }
    }

    /// Sign `request`, drawing OAuth nonce and timestamp from `nonces`.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Configuration`] if the HMAC key is rejected.
    pub fn sign_with(
        &self,
        request: &mut HttpRequest,
        nonces: &dyn NonceSource,
    ) -> Result<(), ClientError> {
        match self {
            Self::None => {}
            Self::Basic { username, password } => {
                let token = STANDARD.encode(format!("{username}:{password}"));
                request.set_header("Authorization", format!("Basic {token}"));
            }
            Self::OAuth1 {
                consumer_key,
                consumer_secret,
                token_key,
                token_secret,
            } => {
                let header = oauth1_authorization(
                    request,
                    &OAuth1Keys {
                        consumer_key,
                        consumer_secret,
                        token_key,
                        token_secret,
                    },
                    &nonces.nonce(),
                    nonces.timestamp(),
                )?;
                request.set_header("Authorization", header);
            }
        }
        tracing::trace!(kind = self.kind(), url = %request.url, "signed request");
        Ok(())
    }
}

impl SignRequest for Credential {
    fn sign(&self, request: &mut HttpRequest) -> Result<(), ClientError> {
        self.sign_with(request, &SystemNonceSource)
    }
}

/// A [`Credential`] that signs with its own [`NonceSource`].
pub struct NoncedCredential<N> {
    credential: Credential,
    nonces: N,
}

impl<N> NoncedCredential<N> {
    pub const fn credential(&self) -> &Credential {
        &self.credential
    }
}

impl<N> fmt::Debug for NoncedCredential<N> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NoncedCredential")
            .field("credential", &self.credential)
            .finish_non_exhaustive()
    }
}

impl<N: NonceSource> SignRequest for NoncedCredential<N> {
    fn sign(&self, request: &mut HttpRequest) -> Result<(), ClientError> {
        self.credential.sign_with(request, &self.nonces)
    }
}

/// Borrowed OAuth 1.0a key material.
#[derive(Debug, Clone, Copy)]
pub struct OAuth1Keys<'a> {
    pub consumer_key: &'a str,
    pub consumer_secret: &'a str,
    pub token_key: &'a str,
    pub token_secret: &'a str,
}

fn enc(value: &str) -> String {
    utf8_percent_encode(value, OAUTH_ENCODE_SET).to_string()
}

/// Signature base string for `request` with the given protocol parameters.
pub fn oauth1_base_string(request: &HttpRequest, oauth_params: &[(String, String)]) -> String {
    let body_pairs = request
        .body
        .as_ref()
        .map(|body| body.form_pairs())
        .unwrap_or_default();

    let mut pairs: Vec<(String, String)> = request
        .query
        .iter()
        .chain(body_pairs)
        .chain(oauth_params)
        .map(|(k, v)| (enc(k), enc(v)))
        .collect();
    pairs.sort();

    let normalized = pairs
        .iter()
        .map(|(k, v)| format!("{k}={v}"))
        .collect::<Vec<_>>()
        .join("&");

    format!(
        "{}&{}&{}",
        request.method.as_str(),
        enc(&request.url),
        enc(&normalized)
    )
}

/// Build the `Authorization: OAuth ...` header value for `request`.
///
/// # Errors
///
/// Returns [`ClientError::Configuration`] if the HMAC key is rejected.
pub fn oauth1_authorization(
    request: &HttpRequest,
    keys: &OAuth1Keys<'_>,
    nonce: &str,
    timestamp: i64,
) -> Result<String, ClientError> {
    let mut oauth_params = vec![
        ("oauth_consumer_key".to_string(), keys.consumer_key.to_string()),
        ("oauth_nonce".to_string(), nonce.to_string()),
        ("oauth_signature_method".to_string(), "HMAC-SHA1".to_string()),
        ("oauth_timestamp".to_string(), timestamp.to_string()),
        ("oauth_token".to_string(), keys.token_key.to_string()),
        ("oauth_version".to_string(), "1.0".to_string()),
    ];

    let base = oauth1_base_string(request, &oauth_params);
    let signing_key = format!("{}&{}", enc(keys.consumer_secret), enc(keys.token_secret));

    let mut mac = HmacSha1::new_from_slice(signing_key.as_bytes())
        .map_err(|e| ClientError::configuration(format!("invalid OAuth signing key: {e}")))?;
    mac.update(base.as_bytes());
    let signature = STANDARD.encode(mac.finalize().into_bytes());

    oauth_params.push(("oauth_signature".to_string(), signature));
    oauth_params.sort();

    let fields = oauth_params
        .iter()
        .map(|(k, v)| format!("{}=\"{}\"", enc(k), enc(v)))
        .collect::<Vec<_>>()
        .join(", ");
    Ok(format!("OAuth {fields}"))
}
