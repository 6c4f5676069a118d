//! Native request and response shapes of the supported runtimes.
//!
//! Three header encodings exist in the wild:
//! - a flat `Headers` map (Cloudflare, Fastly, Vercel) - [`http::HeaderMap`]
//! - getter/setter methods returning value lists (Akamai) - [`AccessorHeaders`]
//! - lowercase name to `[{key, value}]` arrays (CloudFront) - [`KeyValueHeaders`]
//!
//! [`NativeHeaders`] gives the normalizing layer one way to read and write
//! all of them.

mod akamai;
mod cloudfront;
mod fetch;

pub use akamai::*;
pub use cloudfront::*;
pub use fetch::*;

use polyedge_core::{HeaderShape, PlatformError, Result};

/// Uniform access to a native header container.
pub trait NativeHeaders {
    /// Every value stored for `name` (case-insensitive).
    fn header_values(&self, name: &str) -> Vec<String>;

    /// Replace every value for `name`.
    fn set_header(&mut self, name: &str, value: &str) -> Result<()>;

    /// Add a value, keeping existing ones.
    fn append_header(&mut self, name: &str, value: &str) -> Result<()>;

    /// Drop every value for `name`.
    fn remove_header(&mut self, name: &str);

    /// All `(name, value)` pairs.
    fn header_pairs(&self) -> Vec<(String, String)>;
}

pub(crate) fn validate_header(name: &str, value: &str) -> Result<()> {
    http::HeaderName::from_bytes(name.as_bytes())
        .map_err(|_| PlatformError::InvalidHeader(format!("name {:?}", name)))?;
    http::HeaderValue::from_str(value)
        .map_err(|_| PlatformError::InvalidHeader(format!("value for {}", name)))?;
    Ok(())
}

/// An inbound request as handed over by the runtime.
#[derive(Debug, Clone)]
pub enum NativeRequest {
    /// Fetch-API request (Cloudflare, Fastly, Vercel).
    Fetch(FetchRequest),
    /// EdgeWorkers request (Akamai).
    Akamai(AkamaiRequest),
    /// Lambda@Edge request record (CloudFront).
    CloudFront(CloudFrontRequest),
}

impl NativeRequest {
    /// Header encoding of this request.
    pub fn shape(&self) -> HeaderShape {
        match self {
            Self::Fetch(_) => HeaderShape::Flat,
            Self::Akamai(_) => HeaderShape::Accessor,
            Self::CloudFront(_) => HeaderShape::KeyValueArray,
        }
    }

    /// Native header container.
    pub fn headers(&self) -> &dyn NativeHeaders {
        match self {
            Self::Fetch(req) => &req.headers,
            Self::Akamai(req) => req.headers(),
            Self::CloudFront(req) => &req.headers,
        }
    }

    /// Mutable native header container.
    pub fn headers_mut(&mut self) -> &mut dyn NativeHeaders {
        match self {
            Self::Fetch(req) => &mut req.headers,
            Self::Akamai(req) => req.headers_mut(),
            Self::CloudFront(req) => &mut req.headers,
        }
    }

    /// Absolute URL.
    pub fn url(&self) -> String {
        match self {
            Self::Fetch(req) => req.url.clone(),
            Self::Akamai(req) => req.full_url(),
            Self::CloudFront(req) => req.full_url(),
        }
    }

    /// Request method as sent by the runtime.
    pub fn method(&self) -> &str {
        match self {
            Self::Fetch(req) => req.method.as_str(),
            Self::Akamai(req) => &req.method,
            Self::CloudFront(req) => &req.method,
        }
    }

    /// Raw body bytes, decoded from the transport encoding if needed.
    pub fn body(&self) -> Result<Option<Vec<u8>>> {
        match self {
            Self::Fetch(req) => Ok(req.body.clone()),
            Self::Akamai(req) => Ok(req.body.clone()),
            Self::CloudFront(req) => req.decoded_body(),
        }
    }

    /// Client address when the runtime reports it outside the headers.
    pub fn client_ip(&self) -> Option<String> {
        match self {
            Self::Fetch(req) => req.client_ip.clone(),
            Self::Akamai(req) => req.client_ip.clone(),
            Self::CloudFront(req) => Some(req.client_ip.clone()).filter(|ip| !ip.is_empty()),
        }
    }

    /// Copy suitable for re-sending.
    ///
    /// Fetch requests keep every fetch option. Akamai and CloudFront objects
    /// only support a reduced option set, so request variables and origin
    /// configuration are not carried over.
    pub fn clone_for_resend(&self) -> Self {
        match self {
            Self::Fetch(req) => Self::Fetch(req.clone()),
            Self::Akamai(req) => Self::Akamai(req.reduced_clone()),
            Self::CloudFront(req) => Self::CloudFront(req.reduced_clone()),
        }
    }
}

/// An outbound or fetched response in a runtime's native shape.
#[derive(Debug, Clone)]
pub enum NativeResponse {
    /// Fetch-API response (Cloudflare, Fastly, Vercel).
    Fetch(FetchResponse),
    /// EdgeWorkers response (Akamai).
    Akamai(AkamaiResponse),
    /// Lambda@Edge response record (CloudFront).
    CloudFront(CloudFrontResponse),
}

impl NativeResponse {
    /// Header encoding of this response.
    pub fn shape(&self) -> HeaderShape {
        match self {
            Self::Fetch(_) => HeaderShape::Flat,
            Self::Akamai(_) => HeaderShape::Accessor,
            Self::CloudFront(_) => HeaderShape::KeyValueArray,
        }
    }

    /// Native header container.
    pub fn headers(&self) -> &dyn NativeHeaders {
        match self {
            Self::Fetch(resp) => &resp.headers,
            Self::Akamai(resp) => &resp.headers,
            Self::CloudFront(resp) => &resp.headers,
        }
    }

    /// First value of a header.
    pub fn header(&self, name: &str) -> Option<String> {
        self.headers().header_values(name).into_iter().next()
    }

    /// Status code.
    pub fn status(&self) -> Result<u16> {
        match self {
            Self::Fetch(resp) => Ok(resp.status),
            Self::Akamai(resp) => Ok(resp.status),
            Self::CloudFront(resp) => resp
                .status
                .parse()
                .map_err(|_| PlatformError::InvalidBody(format!("status {:?}", resp.status))),
        }
    }

    /// Raw body bytes.
    pub fn body(&self) -> Result<Vec<u8>> {
        match self {
            Self::Fetch(resp) => Ok(resp.body.clone()),
            Self::Akamai(resp) => Ok(resp.body.clone()),
            Self::CloudFront(resp) => resp.decoded_body(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn shapes() -> Vec<NativeRequest> {
        vec![
            NativeRequest::Fetch(FetchRequest::get("https://example.com/")),
            NativeRequest::Akamai(AkamaiRequest::new("GET", "https", "example.com", "/")),
            NativeRequest::CloudFront(CloudFrontRequest::new("GET", "/")),
        ]
    }

    #[test]
    fn test_headers_round_trip_every_shape() {
        for mut native in shapes() {
            native.headers_mut().set_header("X-Test", "1").unwrap();
            native.headers_mut().set_header("x-test", "2").unwrap();
            assert_eq!(native.headers().header_values("X-TEST"), vec!["2".to_string()]);

            native.headers_mut().append_header("X-Test", "3").unwrap();
            assert_eq!(native.headers().header_values("x-test").len(), 2);

            native.headers_mut().remove_header("X-Test");
            assert!(native.headers().header_values("x-test").is_empty());
        }
    }

    #[test]
    fn test_invalid_header_rejected_every_shape() {
        for mut native in shapes() {
            let err = native.headers_mut().set_header("bad header", "v").unwrap_err();
            assert!(matches!(err, PlatformError::InvalidHeader(_)));
            let err = native.headers_mut().set_header("ok", "line\nbreak").unwrap_err();
            assert!(matches!(err, PlatformError::InvalidHeader(_)));
        }
    }

    #[test]
    fn test_shapes() {
        let shapes: Vec<HeaderShape> = shapes().iter().map(NativeRequest::shape).collect();
        assert_eq!(
            shapes,
            vec![HeaderShape::Flat, HeaderShape::Accessor, HeaderShape::KeyValueArray]
        );
    }
}
