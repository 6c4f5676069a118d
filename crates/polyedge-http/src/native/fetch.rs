//! Fetch-API shapes (Cloudflare Workers, Fastly Compute, Vercel Edge).

use http::{HeaderMap, HeaderName, HeaderValue, Method};
use polyedge_core::{PlatformError, Result};

use super::NativeHeaders;

fn parse_pair(name: &str, value: &str) -> Result<(HeaderName, HeaderValue)> {
    let name = HeaderName::from_bytes(name.as_bytes())
        .map_err(|_| PlatformError::InvalidHeader(format!("name {:?}", name)))?;
    let value = HeaderValue::from_str(value)
        .map_err(|_| PlatformError::InvalidHeader(format!("value for {}", name)))?;
    Ok((name, value))
}

impl NativeHeaders for HeaderMap {
    fn header_values(&self, name: &str) -> Vec<String> {
        self.get_all(name)
            .iter()
            .filter_map(|v| v.to_str().ok())
            .map(String::from)
            .collect()
    }

    fn set_header(&mut self, name: &str, value: &str) -> Result<()> {
        let (name, value) = parse_pair(name, value)?;
        self.insert(name, value);
        Ok(())
    }

    fn append_header(&mut self, name: &str, value: &str) -> Result<()> {
        let (name, value) = parse_pair(name, value)?;
        self.append(name, value);
        Ok(())
    }

    fn remove_header(&mut self, name: &str) {
        self.remove(name);
    }

    fn header_pairs(&self) -> Vec<(String, String)> {
        self.iter()
            .filter_map(|(k, v)| {
                v.to_str()
                    .ok()
                    .map(|v| (k.as_str().to_string(), v.to_string()))
            })
            .collect()
    }
}

/// Request options a fetch-style runtime accepts next to method, headers
/// and body.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FetchOptions {
    /// `redirect` mode (follow, manual, error).
    pub redirect: Option<String>,
    /// `cache` mode.
    pub cache: Option<String>,
    /// Subresource integrity value.
    pub integrity: Option<String>,
    /// Keep the connection alive past the handler.
    pub keepalive: bool,
    /// Fastly named backend.
    pub backend: Option<String>,
    /// Cloudflare `cf` request properties.
    pub cf: Option<serde_json::Value>,
}

/// Fetch-API request.
#[derive(Debug, Clone)]
pub struct FetchRequest {
    /// Absolute URL.
    pub url: String,
    /// Request method.
    pub method: Method,
    /// Flat header map.
    pub headers: HeaderMap,
    /// Body bytes.
    pub body: Option<Vec<u8>>,
    /// Client address reported by the runtime.
    pub client_ip: Option<String>,
    /// Remaining fetch options.
    pub options: FetchOptions,
}

impl FetchRequest {
    /// Create a request with no headers or body.
    pub fn new(method: Method, url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            method,
            headers: HeaderMap::new(),
            body: None,
            client_ip: None,
            options: FetchOptions::default(),
        }
    }

    /// Create a GET request.
    pub fn get(url: impl Into<String>) -> Self {
        Self::new(Method::GET, url)
    }

    /// Create a POST request.
    pub fn post(url: impl Into<String>) -> Self {
        Self::new(Method::POST, url)
    }

    /// Add a header.
    pub fn with_header(mut self, name: &str, value: &str) -> Result<Self> {
        self.headers.append_header(name, value)?;
        Ok(self)
    }

    /// Set the body.
    pub fn with_body(mut self, body: impl Into<Vec<u8>>) -> Self {
        self.body = Some(body.into());
        self
    }

    /// Set the client address.
    pub fn with_client_ip(mut self, ip: impl Into<String>) -> Self {
        self.client_ip = Some(ip.into());
        self
    }

    /// Set the fetch options.
    pub fn with_options(mut self, options: FetchOptions) -> Self {
        self.options = options;
        self
    }
}

/// Fetch-API response.
#[derive(Debug, Clone)]
pub struct FetchResponse {
    /// Status code.
    pub status: u16,
    /// Reason phrase.
    pub status_text: String,
    /// Flat header map.
    pub headers: HeaderMap,
    /// Body bytes.
    pub body: Vec<u8>,
}

impl FetchResponse {
    /// Create an empty response.
    pub fn new(status: u16) -> Self {
        Self {
            status,
            status_text: String::new(),
            headers: HeaderMap::new(),
            body: Vec::new(),
        }
    }

    /// Add a header.
    pub fn with_header(mut self, name: &str, value: &str) -> Result<Self> {
        self.headers.append_header(name, value)?;
        Ok(self)
    }

    /// Set the body.
    pub fn with_body(mut self, body: impl Into<Vec<u8>>) -> Self {
        self.body = body.into();
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_header_map_pairs_lowercase() {
        let req = FetchRequest::get("https://example.com")
            .with_header("X-Forwarded-For", "1.1.1.1")
            .unwrap();
        assert_eq!(
            req.headers.header_pairs(),
            vec![("x-forwarded-for".to_string(), "1.1.1.1".to_string())]
        );
    }

    #[test]
    fn test_builder() {
        let req = FetchRequest::post("https://example.com/api")
            .with_body("{}")
            .with_client_ip("10.0.0.1")
            .with_options(FetchOptions {
                backend: Some("origin".to_string()),
                ..Default::default()
            });
        assert_eq!(req.method, Method::POST);
        assert_eq!(req.body.as_deref(), Some(b"{}".as_slice()));
        assert_eq!(req.options.backend.as_deref(), Some("origin"));
    }
}
