//! HTTP request and response values exchanged with a `Transport`.
//!
//! # Design
//! Requests are plain data until the transport sends them. The pipeline
//! fills in URL, query pairs, and body; the credential then adds its
//! headers; the transport only has to serialize what it is given. Query and
//! form pairs stay structured (not pre-encoded) so request signing can see
//! the exact parameters that will go on the wire.

use url::form_urlencoded;

/// HTTP method for a request. The API only uses GET and POST.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpMethod {
    Get,
    Post,
}

impl HttpMethod {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
        }
    }
}

impl std::fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One part of a `multipart/form-data` body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MultipartPart {
    pub name: String,
    pub filename: Option<String>,
    pub content_type: Option<String>,
    pub data: Vec<u8>,
}

impl MultipartPart {
    pub fn text(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            filename: None,
            content_type: None,
            data: value.into().into_bytes(),
        }
    }

    pub fn file(name: impl Into<String>, filename: impl Into<String>, data: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            filename: Some(filename.into()),
            content_type: Some("application/octet-stream".to_string()),
            data,
        }
    }
}

/// Request body. GET requests carry none.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RequestBody {
    /// `application/x-www-form-urlencoded` pairs.
    Form(Vec<(String, String)>),
    /// `multipart/form-data` parts separated by `boundary`.
    Multipart {
        boundary: String,
        parts: Vec<MultipartPart>,
    },
}

impl RequestBody {
    pub fn content_type(&self) -> String {
        match self {
            Self::Form(_) => "application/x-www-form-urlencoded".to_string(),
            Self::Multipart { boundary, .. } => format!("multipart/form-data; boundary={boundary}"),
        }
    }

    /// Serialize the body into the bytes sent on the wire.
    pub fn to_bytes(&self) -> Vec<u8> {
        match self {
            Self::Form(pairs) => encode_pairs(pairs).into_bytes(),
            Self::Multipart { boundary, parts } => {
                let mut out = Vec::new();
                for part in parts {
                    out.extend_from_slice(format!("--{boundary}\r\n").as_bytes());
                    let mut disposition = format!(
                        "Content-Disposition: form-data; name=\"{}\"",
                        encode_disposition_value(&part.name)
                    );
                    if let Some(filename) = &part.filename {
                        disposition.push_str(&format!("; filename=\"{}\"", encode_disposition_value(filename)));
                    }
                    out.extend_from_slice(disposition.as_bytes());
                    out.extend_from_slice(b"\r\n");
                    if let Some(content_type) = &part.content_type {
                        out.extend_from_slice(format!("Content-Type: {content_type}\r\n").as_bytes());
                    }
                    out.extend_from_slice(b"\r\n");
                    out.extend_from_slice(&part.data);
                    out.extend_from_slice(b"\r\n");
                }
                out.extend_from_slice(format!("--{boundary}--\r\n").as_bytes());
                out
            }
        }
    }

    /// Pairs that take part in OAuth signing; multipart bodies contribute none.
    pub fn form_pairs(&self) -> &[(String, String)] {
        match self {
            Self::Form(pairs) => pairs,
            Self::Multipart { .. } => &[],
        }
    }
}

/// Encode a `Content-Disposition` name or filename the way browsers do:
/// `"`, CR and LF become `%22`, `%0D` and `%0A`, so the value can neither
/// close the quoted string nor end the header line.
fn encode_disposition_value(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '"' => out.push_str("%22"),
            '\r' => out.push_str("%0D"),
            '\n' => out.push_str("%0A"),
            c => out.push(c),
        }
    }
    out
}

/// Encode pairs as `application/x-www-form-urlencoded`.
pub fn encode_pairs(pairs: &[(String, String)]) -> String {
    form_urlencoded::Serializer::new(String::new())
        .extend_pairs(pairs)
        .finish()
}

/// An outbound request. `url` never contains the query; see `full_url`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpRequest {
    pub method: HttpMethod,
    pub url: String,
    pub query: Vec<(String, String)>,
    pub headers: Vec<(String, String)>,
    pub body: Option<RequestBody>,
}

impl HttpRequest {
    pub fn new(method: HttpMethod, url: impl Into<String>) -> Self {
        Self {
            method,
            url: url.into(),
            query: Vec::new(),
            headers: Vec::new(),
            body: None,
        }
    }

    /// URL with the encoded query string appended, as sent on the wire.
    pub fn full_url(&self) -> String {
        if self.query.is_empty() {
            self.url.clone()
        } else {
            format!("{}?{}", self.url, encode_pairs(&self.query))
        }
    }

    /// Case-insensitive header lookup.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    /// Set a header, replacing any existing value with the same name.
    pub fn set_header(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        self.headers.retain(|(key, _)| !key.eq_ignore_ascii_case(&name));
        self.headers.push((name, value.into()));
    }
}

/// A response as returned by the transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
}

impl HttpResponse {
    pub fn new(status: u16, body: impl Into<Vec<u8>>) -> Self {
        Self {
            status,
            headers: Vec::new(),
            body: body.into(),
        }
    }
}
