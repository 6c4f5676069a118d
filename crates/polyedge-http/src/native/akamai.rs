//! Akamai EdgeWorkers shapes.

use std::collections::{BTreeMap, HashMap};

use polyedge_core::Result;
use serde::{Deserialize, Serialize};

use super::{validate_header, NativeHeaders};

/// Header container reached through getter and setter methods.
///
/// Names are stored lowercased; every name maps to its list of values.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AccessorHeaders(BTreeMap<String, Vec<String>>);

impl AccessorHeaders {
    /// Create an empty container.
    pub fn new() -> Self {
        Self::default()
    }

    /// `getHeader(name)`: every value, or `None` when absent.
    pub fn get_header(&self, name: &str) -> Option<&[String]> {
        self.0
            .get(&name.to_ascii_lowercase())
            .map(Vec::as_slice)
            .filter(|values| !values.is_empty())
    }

    /// `setHeader(name, value)`.
    pub fn set_header(&mut self, name: &str, value: impl Into<String>) {
        self.0.insert(name.to_ascii_lowercase(), vec![value.into()]);
    }

    /// `addHeader(name, value)`.
    pub fn add_header(&mut self, name: &str, value: impl Into<String>) {
        self.0
            .entry(name.to_ascii_lowercase())
            .or_default()
            .push(value.into());
    }

    /// `removeHeader(name)`.
    pub fn remove_header(&mut self, name: &str) {
        self.0.remove(&name.to_ascii_lowercase());
    }

    /// Stored header names.
    pub fn header_names(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }
}

impl NativeHeaders for AccessorHeaders {
    fn header_values(&self, name: &str) -> Vec<String> {
        self.get_header(name).map(<[String]>::to_vec).unwrap_or_default()
    }

    fn set_header(&mut self, name: &str, value: &str) -> Result<()> {
        validate_header(name, value)?;
        AccessorHeaders::set_header(self, name, value);
        Ok(())
    }

    fn append_header(&mut self, name: &str, value: &str) -> Result<()> {
        validate_header(name, value)?;
        self.add_header(name, value);
        Ok(())
    }

    fn remove_header(&mut self, name: &str) {
        AccessorHeaders::remove_header(self, name);
    }

    fn header_pairs(&self) -> Vec<(String, String)> {
        self.0
            .iter()
            .flat_map(|(name, values)| values.iter().map(move |v| (name.clone(), v.clone())))
            .collect()
    }
}

/// EdgeWorkers request object.
#[derive(Debug, Clone)]
pub struct AkamaiRequest {
    /// `http` or `https`.
    pub scheme: String,
    /// Host the request was addressed to.
    pub host: String,
    /// Path plus query string.
    pub url: String,
    /// Request method.
    pub method: String,
    /// Body bytes, when the handler was allowed to read them.
    pub body: Option<Vec<u8>>,
    /// Client address.
    pub client_ip: Option<String>,
    headers: AccessorHeaders,
    variables: HashMap<String, String>,
}

impl AkamaiRequest {
    /// Create a request.
    pub fn new(
        method: impl Into<String>,
        scheme: impl Into<String>,
        host: impl Into<String>,
        url: impl Into<String>,
    ) -> Self {
        Self {
            scheme: scheme.into(),
            host: host.into(),
            url: url.into(),
            method: method.into(),
            body: None,
            client_ip: None,
            headers: AccessorHeaders::new(),
            variables: HashMap::new(),
        }
    }

    /// `getHeader(name)`.
    pub fn get_header(&self, name: &str) -> Option<&[String]> {
        self.headers.get_header(name)
    }

    /// `setHeader(name, value)`.
    pub fn set_header(&mut self, name: &str, value: impl Into<String>) {
        self.headers.set_header(name, value);
    }

    /// `addHeader(name, value)`.
    pub fn add_header(&mut self, name: &str, value: impl Into<String>) {
        self.headers.add_header(name, value);
    }

    /// `removeHeader(name)`.
    pub fn remove_header(&mut self, name: &str) {
        self.headers.remove_header(name);
    }

    /// `getVariable(name)` for `PMUSER_` metadata variables.
    pub fn get_variable(&self, name: &str) -> Option<&str> {
        self.variables.get(name).map(String::as_str)
    }

    /// `setVariable(name, value)`.
    pub fn set_variable(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.variables.insert(name.into(), value.into());
    }

    /// Add a header, builder style.
    pub fn with_header(mut self, name: &str, value: &str) -> Result<Self> {
        NativeHeaders::append_header(&mut self.headers, name, value)?;
        Ok(self)
    }

    /// Set the body, builder style.
    pub fn with_body(mut self, body: impl Into<Vec<u8>>) -> Self {
        self.body = Some(body.into());
        self
    }

    /// Set the client address, builder style.
    pub fn with_client_ip(mut self, ip: impl Into<String>) -> Self {
        self.client_ip = Some(ip.into());
        self
    }

    pub(crate) fn headers(&self) -> &AccessorHeaders {
        &self.headers
    }

    pub(crate) fn headers_mut(&mut self) -> &mut AccessorHeaders {
        &mut self.headers
    }

    pub(crate) fn full_url(&self) -> String {
        let slash = if self.url.starts_with('/') { "" } else { "/" };
        format!("{}://{}{}{}", self.scheme, self.host, slash, self.url)
    }

    pub(crate) fn reduced_clone(&self) -> Self {
        Self {
            variables: HashMap::new(),
            ..self.clone()
        }
    }
}

/// EdgeWorkers `createResponse(status, headers, body)` arguments.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AkamaiResponse {
    /// Status code.
    pub status: u16,
    /// Headers as name to value list.
    pub headers: AccessorHeaders,
    /// Body bytes.
    pub body: Vec<u8>,
}

impl AkamaiResponse {
    /// Create an empty response.
    pub fn new(status: u16) -> Self {
        Self {
            status,
            headers: AccessorHeaders::new(),
            body: Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_getter_methods() {
        let mut req = AkamaiRequest::new("GET", "https", "www.example.com", "/p?q=1");
        req.add_header("Accept", "text/html");
        req.add_header("accept", "application/json");

        assert_eq!(
            req.get_header("ACCEPT"),
            Some(["text/html".to_string(), "application/json".to_string()].as_slice())
        );

        req.set_header("Accept", "*/*");
        assert_eq!(req.get_header("accept"), Some(["*/*".to_string()].as_slice()));

        req.remove_header("accept");
        assert_eq!(req.get_header("accept"), None);
    }

    #[test]
    fn test_full_url() {
        let req = AkamaiRequest::new("GET", "https", "www.example.com", "/p?q=1");
        assert_eq!(req.full_url(), "https://www.example.com/p?q=1");

        let relative = AkamaiRequest::new("GET", "https", "www.example.com", "p?q=1");
        assert_eq!(relative.full_url(), "https://www.example.com/p?q=1");
    }

    #[test]
    fn test_reduced_clone_drops_variables() {
        let mut req = AkamaiRequest::new("GET", "https", "h", "/")
            .with_header("X-A", "1")
            .unwrap();
        req.set_variable("PMUSER_SEGMENT", "beta");

        let cloned = req.reduced_clone();
        assert_eq!(cloned.get_variable("PMUSER_SEGMENT"), None);
        assert_eq!(cloned.get_header("x-a"), Some(["1".to_string()].as_slice()));
        assert_eq!(req.get_variable("PMUSER_SEGMENT"), Some("beta"));
    }
}
