//! CloudFront Lambda@Edge record shapes.

use std::collections::BTreeMap;

use base64::{engine::general_purpose::STANDARD, Engine};
use polyedge_core::{PlatformError, Result};
use serde::{Deserialize, Serialize};

use super::{validate_header, NativeHeaders};

/// One `{key, value}` header object.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HeaderEntry {
    /// Header name with its original casing.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,
    /// Header value.
    pub value: String,
}

/// Lowercase header name mapped to its `{key, value}` objects.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct KeyValueHeaders(pub BTreeMap<String, Vec<HeaderEntry>>);

impl KeyValueHeaders {
    /// Create an empty header set.
    pub fn new() -> Self {
        Self::default()
    }
}

impl NativeHeaders for KeyValueHeaders {
    fn header_values(&self, name: &str) -> Vec<String> {
        self.0
            .get(&name.to_ascii_lowercase())
            .map(|entries| entries.iter().map(|e| e.value.clone()).collect())
            .unwrap_or_default()
    }

    fn set_header(&mut self, name: &str, value: &str) -> Result<()> {
        validate_header(name, value)?;
        self.0.insert(
            name.to_ascii_lowercase(),
            vec![HeaderEntry {
                key: Some(name.to_string()),
                value: value.to_string(),
            }],
        );
        Ok(())
    }

    fn append_header(&mut self, name: &str, value: &str) -> Result<()> {
        validate_header(name, value)?;
        self.0
            .entry(name.to_ascii_lowercase())
            .or_default()
            .push(HeaderEntry {
                key: Some(name.to_string()),
                value: value.to_string(),
            });
        Ok(())
    }

    fn remove_header(&mut self, name: &str) {
        self.0.remove(&name.to_ascii_lowercase());
    }

    fn header_pairs(&self) -> Vec<(String, String)> {
        self.0
            .iter()
            .flat_map(|(lower, entries)| {
                entries.iter().map(move |e| {
                    (
                        e.key.clone().unwrap_or_else(|| lower.clone()),
                        e.value.clone(),
                    )
                })
            })
            .collect()
    }
}

/// Body attached to a Lambda@Edge request when body inclusion is enabled.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CloudFrontBody {
    /// Whether CloudFront truncated the body.
    #[serde(default)]
    pub input_truncated: bool,
    /// `read-only` or `replace`.
    #[serde(default)]
    pub action: String,
    /// `base64` or `text`.
    pub encoding: String,
    /// Encoded body.
    pub data: String,
}

/// `Records[0].cf.request` of a Lambda@Edge event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CloudFrontRequest {
    /// Viewer address.
    #[serde(default)]
    pub client_ip: String,
    /// Request method.
    pub method: String,
    /// Path without the query string.
    pub uri: String,
    /// Raw query string without `?`.
    #[serde(default)]
    pub querystring: String,
    /// Headers.
    #[serde(default)]
    pub headers: KeyValueHeaders,
    /// Body, if included.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<CloudFrontBody>,
    /// Origin configuration (origin-facing triggers only).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub origin: Option<serde_json::Value>,
}

impl CloudFrontRequest {
    /// Create a request record.
    pub fn new(method: impl Into<String>, uri: impl Into<String>) -> Self {
        Self {
            client_ip: String::new(),
            method: method.into(),
            uri: uri.into(),
            querystring: String::new(),
            headers: KeyValueHeaders::new(),
            body: None,
            origin: None,
        }
    }

    /// Set the query string, builder style.
    pub fn with_querystring(mut self, querystring: impl Into<String>) -> Self {
        self.querystring = querystring.into();
        self
    }

    /// Add a header, builder style.
    pub fn with_header(mut self, name: &str, value: &str) -> Result<Self> {
        self.headers.append_header(name, value)?;
        Ok(self)
    }

    /// Attach a text body, builder style.
    pub fn with_text_body(mut self, data: impl Into<String>) -> Self {
        self.body = Some(CloudFrontBody {
            input_truncated: false,
            action: "read-only".to_string(),
            encoding: "text".to_string(),
            data: data.into(),
        });
        self
    }

    /// Attach a base64 body, builder style.
    pub fn with_base64_body(mut self, data: &[u8]) -> Self {
        self.body = Some(CloudFrontBody {
            input_truncated: false,
            action: "read-only".to_string(),
            encoding: "base64".to_string(),
            data: STANDARD.encode(data),
        });
        self
    }

    /// Set the viewer address, builder style.
    pub fn with_client_ip(mut self, ip: impl Into<String>) -> Self {
        self.client_ip = ip.into();
        self
    }

    pub(crate) fn full_url(&self) -> String {
        let host = self
            .headers
            .header_values("host")
            .into_iter()
            .next()
            .unwrap_or_else(|| "localhost".to_string());
        if self.querystring.is_empty() {
            format!("https://{}{}", host, self.uri)
        } else {
            format!("https://{}{}?{}", host, self.uri, self.querystring)
        }
    }

    pub(crate) fn decoded_body(&self) -> Result<Option<Vec<u8>>> {
        match &self.body {
            None => Ok(None),
            Some(body) => decode(&body.encoding, &body.data).map(Some),
        }
    }

    pub(crate) fn reduced_clone(&self) -> Self {
        Self {
            origin: None,
            ..self.clone()
        }
    }
}

/// Lambda@Edge response record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CloudFrontResponse {
    /// Status code as a string.
    pub status: String,
    /// Reason phrase.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status_description: Option<String>,
    /// Headers.
    #[serde(default)]
    pub headers: KeyValueHeaders,
    /// Body, text or base64.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,
    /// `text` or `base64`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body_encoding: Option<String>,
}

impl CloudFrontResponse {
    pub(crate) fn decoded_body(&self) -> Result<Vec<u8>> {
        match &self.body {
            None => Ok(Vec::new()),
            Some(data) => decode(self.body_encoding.as_deref().unwrap_or("text"), data),
        }
    }
}

fn decode(encoding: &str, data: &str) -> Result<Vec<u8>> {
    if encoding.eq_ignore_ascii_case("base64") {
        STANDARD
            .decode(data)
            .map_err(|e| PlatformError::InvalidBody(format!("base64: {}", e)))
    } else {
        Ok(data.as_bytes().to_vec())
    }
}
