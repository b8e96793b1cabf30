//! Responses returned to the client, from the network or from a generation.

use bytes::Bytes;
use reqwest::StatusCode;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use shellcache_core::{Error, StoredResponse};
use url::Url;

/// A complete, buffered response.
///
/// Cloning is cheap (the body is reference counted), so the worker can hand
/// one copy to the client and store another.
#[derive(Debug, Clone, PartialEq)]
pub struct Response {
    /// Final URL after redirects; None for opaque cross-origin responses.
    pub url: Option<Url>,
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Bytes,
}

impl Response {
    pub fn new(url: Option<Url>, status: StatusCode, headers: HeaderMap, body: impl Into<Bytes>) -> Self {
        Self { url, status, headers, body: body.into() }
    }

    pub fn is_opaque(&self) -> bool {
        self.url.is_none()
    }

    pub fn text_lossy(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    /// Snapshot the response for storage.
    pub fn to_stored(&self) -> StoredResponse {
        let headers = self
            .headers
            .iter()
            .map(|(name, value)| (name.as_str().to_string(), String::from_utf8_lossy(value.as_bytes()).into_owned()))
            .collect();

        StoredResponse {
            url: self.url.as_ref().map(Url::to_string),
            status_code: self.status.as_u16(),
            headers,
            body: self.body.to_vec(),
            stored_at: chrono::Utc::now().to_rfc3339(),
        }
    }

    /// Rebuild a response from a stored snapshot.
    pub fn from_stored(stored: StoredResponse) -> Result<Self, Error> {
        let status = StatusCode::from_u16(stored.status_code)
            .map_err(|_| Error::CorruptEntry(format!("invalid status code {}", stored.status_code)))?;

        let url = stored
            .url
            .as_deref()
            .map(Url::parse)
            .transpose()
            .map_err(|e| Error::CorruptEntry(format!("invalid response url: {e}")))?;

        let mut headers = HeaderMap::new();
        for (name, value) in &stored.headers {
            let name = HeaderName::from_bytes(name.as_bytes())
                .map_err(|e| Error::CorruptEntry(format!("invalid header name {name}: {e}")))?;
            let value =
                HeaderValue::from_str(value).map_err(|e| Error::CorruptEntry(format!("invalid header value: {e}")))?;
            headers.append(name, value);
        }

        Ok(Self { url, status, headers, body: Bytes::from(stored.body) })
    }
}
