//! `Cookie` header parsing and `Set-Cookie` serialization.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};

/// Parse a `Cookie` header into a name/value map.
///
/// Pairs are split on `;`, trimmed, and split on the first `=`. Pairs without
/// `=` are skipped. When a name repeats, the first occurrence wins.
pub fn parse_cookie_header(header: &str) -> BTreeMap<String, String> {
    let mut cookies = BTreeMap::new();
    for pair in header.split(';') {
        if let Some((name, value)) = split_pair(pair) {
            cookies.entry(name.to_string()).or_insert_with(|| value.to_string());
        }
    }
    cookies
}

/// Look up a single cookie in a `Cookie` header.
pub fn find_cookie(header: &str, name: &str) -> Option<String> {
    header
        .split(';')
        .filter_map(split_pair)
        .find(|(key, _)| *key == name)
        .map(|(_, value)| value.to_string())
}

fn split_pair(pair: &str) -> Option<(&str, &str)> {
    let (name, value) = pair.trim().split_once('=')?;
    let name = name.trim();
    if name.is_empty() {
        return None;
    }
    Some((name, value.trim()))
}

/// A single `Set-Cookie` attribute.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CookieAttribute {
    /// Serialized as `; key=value`.
    Value(String, String),
    /// Serialized as `; key`.
    Flag(String),
}

/// Ordered `Set-Cookie` attributes.
///
/// Values are concatenated verbatim; nothing is escaped.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CookieOptions {
    attributes: Vec<CookieAttribute>,
}

impl CookieOptions {
    /// Create empty options.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an arbitrary `key=value` attribute.
    pub fn attribute(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes
            .push(CookieAttribute::Value(key.into(), value.into()));
        self
    }

    /// Add a valueless attribute.
    pub fn flag(mut self, key: impl Into<String>) -> Self {
        self.attributes.push(CookieAttribute::Flag(key.into()));
        self
    }

    /// Set `Path`.
    pub fn path(self, path: impl Into<String>) -> Self {
        self.attribute("Path", path)
    }

    /// Set `Domain`.
    pub fn domain(self, domain: impl Into<String>) -> Self {
        self.attribute("Domain", domain)
    }

    /// Set `Max-Age` in seconds.
    pub fn max_age(self, seconds: i64) -> Self {
        self.attribute("Max-Age", seconds.to_string())
    }

    /// Set `Expires` as an HTTP date.
    pub fn expires(self, at: DateTime<Utc>) -> Self {
        self.attribute("Expires", at.format("%a, %d %b %Y %H:%M:%S GMT").to_string())
    }

    /// Set `SameSite`.
    pub fn same_site(self, value: impl Into<String>) -> Self {
        self.attribute("SameSite", value)
    }

    /// Add `Secure`.
    pub fn secure(self) -> Self {
        self.flag("Secure")
    }

    /// Add `HttpOnly`.
    pub fn http_only(self) -> Self {
        self.flag("HttpOnly")
    }

    /// Attributes in insertion order.
    pub fn attributes(&self) -> &[CookieAttribute] {
        &self.attributes
    }
}

/// Serialize a `Set-Cookie` value.
pub fn serialize_cookie(name: &str, value: &str, options: &CookieOptions) -> String {
    let mut cookie = format!("{}={}", name, value);
    for attribute in &options.attributes {
        match attribute {
            CookieAttribute::Value(key, value) => {
                cookie.push_str(&format!("; {}={}", key, value));
            }
            CookieAttribute::Flag(key) => {
                cookie.push_str("; ");
                cookie.push_str(key);
            }
        }
    }
    cookie
}
