//! Per-call request descriptions.
//!
//! A `RequestSpec` is what an endpoint method hands to the client: a verb, a
//! path relative to the version segment, parameters, and optionally a file
//! attachment and a subdomain other than `api`.

use std::path::{Path, PathBuf};

use crate::error::ClientError;
use crate::http::HttpMethod;
use crate::params::{ParamValue, Params};

/// Where attachment bytes come from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttachmentSource {
    /// A local file, read when the request is encoded.
    Path(PathBuf),
    /// Bytes already in memory.
    Bytes { filename: String, data: Vec<u8> },
}

/// A file uploaded as one `multipart/form-data` field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attachment {
    pub field_name: String,
    pub source: AttachmentSource,
}

impl Attachment {
    /// Upload the file at `path`; the part's filename is the path's last
    /// component.
    pub fn from_path(field_name: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        Self {
            field_name: field_name.into(),
            source: AttachmentSource::Path(path.into()),
        }
    }

    pub fn from_bytes(
        field_name: impl Into<String>,
        filename: impl Into<String>,
        data: impl Into<Vec<u8>>,
    ) -> Self {
        Self {
            field_name: field_name.into(),
            source: AttachmentSource::Bytes {
                filename: filename.into(),
                data: data.into(),
            },
        }
    }

    /// Resolve the attachment into `(filename, bytes)`, reading the file if
    /// the source is a path. The file is closed before this returns.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Attachment`] if the file cannot be read.
    pub fn load(&self) -> Result<(String, Vec<u8>), ClientError> {
        match &self.source {
            AttachmentSource::Bytes { filename, data } => Ok((filename.clone(), data.clone())),
            AttachmentSource::Path(path) => {
                let data = std::fs::read(path).map_err(|source| ClientError::Attachment {
                    path: path.clone(),
                    source,
                })?;
                Ok((file_name(path), data))
            }
        }
    }
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map_or_else(|| path.display().to_string(), |name| name.to_string_lossy().into_owned())
}

/// One API call as described by an endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestSpec {
    pub method: HttpMethod,
    pub path: String,
    pub params: Params,
    pub attachment: Option<Attachment>,
    pub subdomain: Option<String>,
}

impl RequestSpec {
    pub fn new(method: HttpMethod, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            params: Params::new(),
            attachment: None,
            subdomain: None,
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(HttpMethod::Get, path)
    }

    pub fn post(path: impl Into<String>) -> Self {
        Self::new(HttpMethod::Post, path)
    }

    #[must_use]
    pub fn param(mut self, key: impl Into<String>, value: impl Into<ParamValue>) -> Self {
        self.params.insert(key, value);
        self
    }

    #[must_use]
    pub fn params(mut self, params: Params) -> Self {
        for (key, value) in params.iter() {
            self.params.insert(key, value.clone());
        }
        self
    }

    /// Attach a file. The request is sent as a multipart POST.
    #[must_use]
    pub fn attachment(mut self, attachment: Attachment) -> Self {
        self.attachment = Some(attachment);
        self
    }

    /// Send to `{subdomain}.{host}` instead of `api.{host}`.
    #[must_use]
    pub fn subdomain(mut self, subdomain: impl Into<String>) -> Self {
        self.subdomain = Some(subdomain.into());
        self
    }

    /// Verb actually used on the wire; attachments force POST.
    pub const fn effective_method(&self) -> HttpMethod {
        if self.attachment.is_some() {
            HttpMethod::Post
        } else {
            self.method
        }
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    #[test]
    fn builder_collects_everything() {
        let spec = RequestSpec::get("search")
            .param("q", "hello")
            .param("page", 2)
            .subdomain("search");
        assert_eq!(spec.method, HttpMethod::Get);
        assert_eq!(spec.path, "search");
        assert_eq!(spec.params.len(), 2);
        assert_eq!(spec.subdomain.as_deref(), Some("search"));
        assert!(spec.attachment.is_none());
    }

    #[test]
    fn params_merge_overwrites_existing_keys() {
        let spec = RequestSpec::get("statuses/user_timeline")
            .param("id", "first")
            .params(Params::new().with("id", "second").with("count", 5));
        assert_eq!(spec.params.get("id"), Some(&ParamValue::Text("second".into())));
        assert_eq!(spec.params.len(), 2);
    }

    #[test]
    fn attachment_forces_post() {
        let spec = RequestSpec::get("statuses/update_with_media")
            .attachment(Attachment::from_bytes("media[]", "a.png", vec![0u8; 4]));
        assert_eq!(spec.method, HttpMethod::Get);
        assert_eq!(spec.effective_method(), HttpMethod::Post);
        assert_eq!(RequestSpec::get("x").effective_method(), HttpMethod::Get);
    }

    #[test]
    fn bytes_attachment_loads_as_is() {
        let attachment = Attachment::from_bytes("image", "me.jpg", b"jpeg".to_vec());
        assert_eq!(attachment.load().unwrap(), ("me.jpg".to_string(), b"jpeg".to_vec()));
    }

    #[test]
    fn path_attachment_reads_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"\x89PNG").unwrap();
        let attachment = Attachment::from_path("media[]", file.path());
        let (filename, data) = attachment.load().unwrap();
        assert_eq!(data, b"\x89PNG".to_vec());
        assert_eq!(
            filename,
            file.path().file_name().unwrap().to_string_lossy().into_owned()
        );
    }

    #[test]
    fn missing_file_is_an_attachment_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nope.png");
        let err = Attachment::from_path("media[]", &path).load().unwrap_err();
        match err {
            ClientError::Attachment { path: reported, .. } => assert_eq!(reported, path),
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
