//! Edge providers and the native shapes they expose.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::PlatformError;

/// An edge/CDN runtime the layer can run on.
///
/// Selected once per deployment and never changed for the process lifetime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Provider {
    Cloudflare,
    Fastly,
    Vercel,
    Akamai,
    CloudFront,
}

/// How a provider represents request and response headers natively.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeaderShape {
    /// A flat `Headers`-like map with `get`/`set`/`append`.
    Flat,
    /// Getter and setter methods returning value lists.
    Accessor,
    /// Lowercase name mapped to an array of `{key, value}` objects.
    KeyValueArray,
}

/// The background-work primitive a provider's context object exposes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContextPrimitive {
    /// A `waitUntil(promise)` registration function.
    WaitUntil,
    /// A differently named registration function.
    ExtendLifetime,
    /// A boolean "wait for the empty event loop" flag.
    EventLoopFlag,
    /// Nothing; background work falls back to a local runner.
    None,
}

impl Provider {
    /// Every supported provider.
    pub const ALL: [Provider; 5] = [
        Provider::Cloudflare,
        Provider::Fastly,
        Provider::Vercel,
        Provider::Akamai,
        Provider::CloudFront,
    ];

    /// Canonical lowercase name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Cloudflare => "cloudflare",
            Self::Fastly => "fastly",
            Self::Vercel => "vercel",
            Self::Akamai => "akamai",
            Self::CloudFront => "cloudfront",
        }
    }

    /// Native header representation used by this provider.
    pub fn header_shape(&self) -> HeaderShape {
        match self {
            Self::Cloudflare | Self::Fastly | Self::Vercel => HeaderShape::Flat,
            Self::Akamai => HeaderShape::Accessor,
            Self::CloudFront => HeaderShape::KeyValueArray,
        }
    }

    /// Native background-task primitive used by this provider.
    pub fn context_primitive(&self) -> ContextPrimitive {
        match self {
            Self::Cloudflare | Self::Fastly => ContextPrimitive::WaitUntil,
            Self::Vercel => ContextPrimitive::ExtendLifetime,
            Self::CloudFront => ContextPrimitive::EventLoopFlag,
            Self::Akamai => ContextPrimitive::None,
        }
    }

    /// Header carrying the client address on this provider, if any.
    pub fn client_ip_header(&self) -> Option<&'static str> {
        match self {
            Self::Cloudflare => Some("cf-connecting-ip"),
            Self::Fastly => Some("fastly-client-ip"),
            Self::Vercel => Some("x-real-ip"),
            Self::Akamai => Some("true-client-ip"),
            Self::CloudFront => None,
        }
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Provider {
    type Err = PlatformError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "cloudflare" => Ok(Self::Cloudflare),
            "fastly" => Ok(Self::Fastly),
            "vercel" => Ok(Self::Vercel),
            "akamai" => Ok(Self::Akamai),
            "cloudfront" => Ok(Self::CloudFront),
            _ => Err(PlatformError::UnsupportedProvider(s.to_string())),
        }
    }
}

impl TryFrom<String> for Provider {
    type Error = PlatformError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Provider> for String {
    fn from(provider: Provider) -> Self {
        provider.as_str().to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_all_providers() {
        for provider in Provider::ALL {
            assert_eq!(provider.as_str().parse::<Provider>().unwrap(), provider);
        }
    }

    #[test]
    fn test_parse_is_case_insensitive() {
        assert_eq!("CloudFlare".parse::<Provider>().unwrap(), Provider::Cloudflare);
        assert_eq!(" FASTLY ".parse::<Provider>().unwrap(), Provider::Fastly);
    }

    #[test]
    fn test_parse_unsupported() {
        let err = "netlify".parse::<Provider>().unwrap_err();
        assert!(matches!(err, PlatformError::UnsupportedProvider(name) if name == "netlify"));
    }

    #[test]
    fn test_serde_round_trip() {
        let json = serde_json::to_string(&Provider::CloudFront).unwrap();
        assert_eq!(json, r#""cloudfront""#);
        let parsed: Provider = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, Provider::CloudFront);
    }

    #[test]
    fn test_serde_rejects_unknown() {
        let result: Result<Provider, _> = serde_json::from_str(r#""deno""#);
        let err = result.unwrap_err().to_string();
        assert!(err.contains("Unsupported provider: deno"));
    }

    #[test]
    fn test_native_shapes() {
        assert_eq!(Provider::Cloudflare.header_shape(), HeaderShape::Flat);
        assert_eq!(Provider::Akamai.header_shape(), HeaderShape::Accessor);
        assert_eq!(Provider::CloudFront.header_shape(), HeaderShape::KeyValueArray);

        assert_eq!(Provider::Fastly.context_primitive(), ContextPrimitive::WaitUntil);
        assert_eq!(Provider::Vercel.context_primitive(), ContextPrimitive::ExtendLifetime);
        assert_eq!(Provider::CloudFront.context_primitive(), ContextPrimitive::EventLoopFlag);
        assert_eq!(Provider::Akamai.context_primitive(), ContextPrimitive::None);
    }
}
