//! Provider-independent view of an inbound request.

use std::collections::BTreeMap;

use http::Method;
use polyedge_core::{cookie, CookieOptions, Headers, PlatformError, Provider, Result};
use url::Url;

use crate::body::{decode_body, BodyContent};
use crate::native::NativeRequest;

/// An inbound request normalized for one provider.
///
/// Everything is parsed at construction: URL, query parameters and headers.
/// Header writes go to both the normalized view and the native request, so
/// the native object stays usable for re-sending.
#[derive(Debug)]
pub struct NormalizedRequest {
    provider: Provider,
    url: Url,
    method: Method,
    headers: Headers,
    query: BTreeMap<String, String>,
    body: Option<Vec<u8>>,
    client_ip: Option<String>,
    set_cookies: Vec<String>,
    native: NativeRequest,
}

impl NormalizedRequest {
    /// Normalize `native` for `provider`.
    ///
    /// Fails with [`PlatformError::NativeShapeMismatch`] when the native
    /// object is not the shape `provider` produces.
    pub fn new(provider: Provider, native: NativeRequest) -> Result<Self> {
        if native.shape() != provider.header_shape() {
            return Err(PlatformError::NativeShapeMismatch {
                provider,
                kind: "request",
            });
        }

        let raw_url = native.url();
        let url = Url::parse(&raw_url)
            .map_err(|e| PlatformError::InvalidUrl(format!("{}: {}", raw_url, e)))?;
        let method = Method::from_bytes(native.method().to_ascii_uppercase().as_bytes())
            .map_err(|_| PlatformError::InvalidRequest(format!("method {:?}", native.method())))?;

        let query = url.query_pairs().into_owned().collect();
        let headers: Headers = native.headers().header_pairs().into_iter().collect();
        let body = native.body()?;

        let client_ip = native.client_ip().or_else(|| {
            provider
                .client_ip_header()
                .and_then(|name| headers.get(name))
                .map(String::from)
        });

        Ok(Self {
            provider,
            url,
            method,
            headers,
            query,
            body,
            client_ip,
            set_cookies: Vec::new(),
            native,
        })
    }

    /// Provider the request was normalized for.
    pub fn provider(&self) -> Provider {
        self.provider
    }

    /// Parsed URL.
    pub fn url(&self) -> &Url {
        &self.url
    }

    /// Request method.
    pub fn method(&self) -> &Method {
        &self.method
    }

    /// URL path.
    pub fn path(&self) -> &str {
        self.url.path()
    }

    /// A query parameter (last occurrence wins).
    pub fn query_param(&self, name: &str) -> Option<&str> {
        self.query.get(name).map(String::as_str)
    }

    /// All query parameters.
    pub fn query_params(&self) -> &BTreeMap<String, String> {
        &self.query
    }

    /// Normalized headers.
    pub fn headers(&self) -> &Headers {
        &self.headers
    }

    /// A header value (case-insensitive).
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name)
    }

    /// Replace a header on both the normalized view and the native request.
    pub fn set_header(&mut self, name: &str, value: &str) -> Result<()> {
        self.native.headers_mut().set_header(name, value)?;
        self.headers.set(name, value);
        Ok(())
    }

    /// Remove a header everywhere.
    pub fn remove_header(&mut self, name: &str) {
        self.native.headers_mut().remove_header(name);
        self.headers.remove(name);
    }

    /// A cookie from the `Cookie` header(s).
    pub fn cookie(&self, name: &str) -> Option<String> {
        let header = self.cookie_header()?;
        cookie::find_cookie(&header, name)
    }

    /// Every cookie from the `Cookie` header(s).
    pub fn cookies(&self) -> BTreeMap<String, String> {
        self.cookie_header()
            .map(|header| cookie::parse_cookie_header(&header))
            .unwrap_or_default()
    }

    // Some runtimes split cookies across several header entries.
    fn cookie_header(&self) -> Option<String> {
        let values = self.headers.get_all("cookie");
        if values.is_empty() {
            None
        } else {
            Some(values.join("; "))
        }
    }

    /// Append a `Set-Cookie` value through the native append mechanism.
    ///
    /// The value is not escaped; callers pass sanitized names and values.
    pub fn set_cookie(&mut self, name: &str, value: &str, options: &CookieOptions) -> Result<()> {
        let serialized = cookie::serialize_cookie(name, value, options);
        self.native
            .headers_mut()
            .append_header("Set-Cookie", &serialized)?;
        self.headers.append("Set-Cookie", serialized.clone());
        self.set_cookies.push(serialized);
        Ok(())
    }

    /// `Set-Cookie` values appended through [`NormalizedRequest::set_cookie`].
    ///
    /// `Set-Cookie` headers that arrived on the inbound request are not
    /// included.
    pub fn pending_set_cookies(&self) -> Vec<&str> {
        self.set_cookies.iter().map(String::as_str).collect()
    }

    /// Raw body bytes.
    pub fn body(&self) -> Option<&[u8]> {
        self.body.as_deref()
    }

    /// Client address.
    pub fn client_ip(&self) -> Option<&str> {
        self.client_ip.as_deref()
    }

    /// `User-Agent` header.
    pub fn user_agent(&self) -> Option<&str> {
        self.header("user-agent")
    }

    /// `Content-Type` header.
    pub fn content_type(&self) -> Option<&str> {
        self.header("content-type")
    }

    /// JSON body of a POST request.
    ///
    /// Returns `None` for other methods, an empty body or invalid JSON. The
    /// body is read by reference, so the request stays intact.
    pub fn json_payload(&self) -> Option<serde_json::Value> {
        if self.method != Method::POST {
            return None;
        }
        let body = self.body.as_deref().filter(|b| !b.is_empty())?;
        serde_json::from_slice(body).ok()
    }

    /// Decode the body according to its `Content-Type`.
    ///
    /// Returns `Ok(None)` when no content type is declared.
    pub fn read_body(&self) -> Result<Option<BodyContent>> {
        decode_body(self.content_type(), self.body.as_deref().unwrap_or_default())
    }

    /// An independent copy, see [`NativeRequest::clone_for_resend`].
    pub fn clone_request(&self) -> Self {
        Self {
            provider: self.provider,
            url: self.url.clone(),
            method: self.method.clone(),
            headers: self.headers.clone(),
            query: self.query.clone(),
            body: self.body.clone(),
            client_ip: self.client_ip.clone(),
            set_cookies: self.set_cookies.clone(),
            native: self.native.clone_for_resend(),
        }
    }

    /// Native request, including any header writes.
    pub fn native(&self) -> &NativeRequest {
        &self.native
    }

    /// Consume into the native request.
    pub fn into_native(self) -> NativeRequest {
        self.native
    }
}
