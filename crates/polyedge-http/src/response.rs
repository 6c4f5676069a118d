//! Normalized response building and conversion to native shapes.

use base64::{engine::general_purpose::STANDARD, Engine};
use http::{HeaderMap, StatusCode};
use polyedge_core::{cookie, CookieOptions, HeaderShape, Headers, PlatformError, Provider, Result};
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::body::is_json;
use crate::native::{
    AccessorHeaders, AkamaiResponse, CloudFrontResponse, FetchResponse, KeyValueHeaders,
    NativeHeaders, NativeResponse,
};

const JSON_CONTENT_TYPE: &str = "application/json";
const TEXT_CONTENT_TYPE: &str = "text/plain; charset=utf-8";
const BINARY_CONTENT_TYPE: &str = "application/octet-stream";

/// Body handed to [`NormalizedResponse::create`].
#[derive(Debug, Clone, Default, PartialEq)]
pub enum ResponseBody {
    /// No body.
    #[default]
    Empty,
    /// Text, sent as is.
    Text(String),
    /// Raw bytes, sent as is.
    Bytes(Vec<u8>),
    /// Structured body, serialized as JSON.
    Json(serde_json::Value),
}

impl ResponseBody {
    /// Structured body from any serializable value.
    pub fn json<T: Serialize>(value: &T) -> Result<Self> {
        Ok(Self::Json(serde_json::to_value(value)?))
    }
}

impl From<&str> for ResponseBody {
    fn from(text: &str) -> Self {
        Self::Text(text.to_string())
    }
}

impl From<String> for ResponseBody {
    fn from(text: String) -> Self {
        Self::Text(text)
    }
}

impl From<Vec<u8>> for ResponseBody {
    fn from(bytes: Vec<u8>) -> Self {
        Self::Bytes(bytes)
    }
}

impl From<serde_json::Value> for ResponseBody {
    fn from(value: serde_json::Value) -> Self {
        Self::Json(value)
    }
}

/// A cookie to send with the response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResponseCookie {
    pub name: String,
    pub value: String,
    pub options: CookieOptions,
}

impl ResponseCookie {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
            options: CookieOptions::default(),
        }
    }

    pub fn with_options(mut self, options: CookieOptions) -> Self {
        self.options = options;
        self
    }

    fn serialize(&self) -> String {
        cookie::serialize_cookie(&self.name, &self.value, &self.options)
    }
}

/// Inputs of [`NormalizedResponse::create`].
#[derive(Debug, Clone, PartialEq)]
pub struct ResponseInit {
    /// Status code (default 200).
    pub status: u16,
    /// Reason phrase; the canonical one is used when absent.
    pub status_text: Option<String>,
    pub body: ResponseBody,
    /// Caller headers. These win over defaults.
    pub headers: Headers,
    pub cookies: Vec<ResponseCookie>,
}

impl Default for ResponseInit {
    fn default() -> Self {
        Self {
            status: 200,
            status_text: None,
            body: ResponseBody::Empty,
            headers: Headers::new(),
            cookies: Vec::new(),
        }
    }
}

impl ResponseInit {
    /// Start from a status code.
    pub fn new(status: u16) -> Self {
        Self {
            status,
            ..Default::default()
        }
    }

    /// `200 OK` with a structured body.
    pub fn json<T: Serialize>(value: &T) -> Result<Self> {
        Ok(Self::new(200).with_body(ResponseBody::json(value)?))
    }

    pub fn with_status_text(mut self, text: impl Into<String>) -> Self {
        self.status_text = Some(text.into());
        self
    }

    pub fn with_body(mut self, body: impl Into<ResponseBody>) -> Self {
        self.body = body.into();
        self
    }

    /// Append a caller header.
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.append(name, value);
        self
    }

    pub fn with_cookie(mut self, cookie: ResponseCookie) -> Self {
        self.cookies.push(cookie);
        self
    }
}

/// A response built once per request cycle.
///
/// Immutable after [`NormalizedResponse::create`]; only converted into the
/// native shape of a provider.
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedResponse {
    status: u16,
    status_text: String,
    headers: Headers,
    body: Vec<u8>,
}

impl NormalizedResponse {
    /// Build a response from `init`.
    ///
    /// Structured bodies get `Content-Type: application/json` unless the
    /// caller declared another type; then strings are sent raw and other
    /// values as JSON text.
    pub fn create(init: ResponseInit) -> Result<Self> {
        let status =
            StatusCode::from_u16(init.status).map_err(|_| PlatformError::InvalidStatus(init.status))?;
        let status_text = init
            .status_text
            .unwrap_or_else(|| status.canonical_reason().unwrap_or_default().to_string());

        let caller_type = init.headers.get("content-type");
        let (body, default_type) = match init.body {
            ResponseBody::Empty => (Vec::new(), None),
            ResponseBody::Text(text) => (text.into_bytes(), Some(TEXT_CONTENT_TYPE)),
            ResponseBody::Bytes(bytes) => (bytes, Some(BINARY_CONTENT_TYPE)),
            ResponseBody::Json(value) => {
                let raw = match (&value, caller_type) {
                    (serde_json::Value::String(text), Some(ct)) if !is_json(ct) => {
                        text.clone().into_bytes()
                    }
                    _ => serde_json::to_vec(&value)?,
                };
                (raw, Some(JSON_CONTENT_TYPE))
            }
        };

        let mut headers = Headers::new();
        if let Some(content_type) = default_type {
            headers.set("Content-Type", content_type);
        }
        headers.merge(&init.headers);
        for cookie in &init.cookies {
            headers.append("Set-Cookie", cookie.serialize());
        }

        Ok(Self {
            status: status.as_u16(),
            status_text,
            headers,
            body,
        })
    }

    /// Read a native response into normalized form.
    pub fn from_native(native: &NativeResponse) -> Result<Self> {
        let status = native.status()?;
        let status_text = match native {
            NativeResponse::Fetch(resp) => resp.status_text.clone(),
            NativeResponse::CloudFront(resp) => resp.status_description.clone().unwrap_or_default(),
            NativeResponse::Akamai(_) => StatusCode::from_u16(status)
                .ok()
                .and_then(|s| s.canonical_reason())
                .unwrap_or_default()
                .to_string(),
        };

        Ok(Self {
            status,
            status_text,
            headers: native.headers().header_pairs().into_iter().collect(),
            body: native.body()?,
        })
    }

    pub fn status(&self) -> u16 {
        self.status
    }

    pub fn status_text(&self) -> &str {
        &self.status_text
    }

    pub fn headers(&self) -> &Headers {
        &self.headers
    }

    /// First value of a header (case-insensitive).
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name)
    }

    /// `Set-Cookie` values, one per cookie.
    pub fn set_cookies(&self) -> Vec<&str> {
        self.headers.get_all("set-cookie")
    }

    pub fn body(&self) -> &[u8] {
        &self.body
    }

    /// Body as UTF-8 text, if it is valid UTF-8.
    pub fn body_text(&self) -> Option<&str> {
        std::str::from_utf8(&self.body).ok()
    }

    /// Deserialize the body as JSON.
    pub fn json<T: DeserializeOwned>(&self) -> Result<T> {
        Ok(serde_json::from_slice(&self.body)?)
    }

    /// Convert into the native shape `provider` returns to its runtime.
    pub fn into_native(self, provider: Provider) -> Result<NativeResponse> {
        match provider.header_shape() {
            HeaderShape::Flat => {
                let mut headers = HeaderMap::new();
                self.copy_headers(&mut headers)?;
                Ok(NativeResponse::Fetch(FetchResponse {
                    status: self.status,
                    status_text: self.status_text,
                    headers,
                    body: self.body,
                }))
            }
            HeaderShape::Accessor => {
                let mut headers = AccessorHeaders::new();
                self.copy_headers(&mut headers)?;
                Ok(NativeResponse::Akamai(AkamaiResponse {
                    status: self.status,
                    headers,
                    body: self.body,
                }))
            }
            HeaderShape::KeyValueArray => {
                let mut headers = KeyValueHeaders::new();
                self.copy_headers(&mut headers)?;
                let (body, body_encoding) = if self.body.is_empty() {
                    (None, None)
                } else {
                    match String::from_utf8(self.body) {
                        Ok(text) => (Some(text), Some("text".to_string())),
                        Err(e) => (
                            Some(STANDARD.encode(e.into_bytes())),
                            Some("base64".to_string()),
                        ),
                    }
                };
                Ok(NativeResponse::CloudFront(CloudFrontResponse {
                    status: self.status.to_string(),
                    status_description: Some(self.status_text).filter(|s| !s.is_empty()),
                    headers,
                    body,
                    body_encoding,
                }))
            }
        }
    }

    fn copy_headers(&self, target: &mut dyn NativeHeaders) -> Result<()> {
        for (name, value) in self.headers.iter() {
            target.append_header(name, value)?;
        }
        Ok(())
    }
}
