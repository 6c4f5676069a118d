//! CDN cache policies.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Who may cache a response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CacheScope {
    /// Browser and CDN.
    Public,
    /// Browser only.
    Private,
    /// Nobody.
    #[default]
    NoStore,
}

impl CacheScope {
    /// `Cache-Control` directive for this scope.
    pub fn cache_control_directive(&self) -> &'static str {
        match self {
            Self::Public => "public",
            Self::Private => "private",
            Self::NoStore => "no-store",
        }
    }

    /// Whether a shared cache may store the response.
    pub fn allows_cdn_caching(&self) -> bool {
        matches!(self, Self::Public)
    }
}

/// Caching rules for one response, rendered into provider-specific headers
/// by each adapter.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CdnCachePolicy {
    pub scope: CacheScope,
    /// Browser TTL (`max-age`).
    pub browser_ttl: Duration,
    /// Shared-cache TTL.
    pub cdn_ttl: Duration,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stale_while_revalidate: Option<Duration>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stale_if_error: Option<Duration>,
    /// Purge tags.
    #[serde(default)]
    pub tags: Vec<String>,
}

impl CdnCachePolicy {
    /// Cacheable everywhere.
    pub fn public(browser_ttl: Duration, cdn_ttl: Duration) -> Self {
        Self {
            scope: CacheScope::Public,
            browser_ttl,
            cdn_ttl,
            ..Default::default()
        }
    }

    /// Cacheable by the browser only.
    pub fn private(browser_ttl: Duration) -> Self {
        Self {
            scope: CacheScope::Private,
            browser_ttl,
            ..Default::default()
        }
    }

    /// Not cacheable.
    pub fn no_store() -> Self {
        Self::default()
    }

    pub fn with_stale_while_revalidate(mut self, window: Duration) -> Self {
        self.stale_while_revalidate = Some(window);
        self
    }

    pub fn with_stale_if_error(mut self, window: Duration) -> Self {
        self.stale_if_error = Some(window);
        self
    }

    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tags.push(tag.into());
        self
    }

    /// Browser-facing `Cache-Control` value.
    pub fn browser_directive(&self) -> String {
        match self.scope {
            CacheScope::NoStore => "no-store".to_string(),
            scope => format!(
                "{}, max-age={}",
                scope.cache_control_directive(),
                self.browser_ttl.as_secs()
            ),
        }
    }

    /// Value for a CDN-targeted cache-control header, `None` unless the
    /// scope is public.
    pub fn cdn_directive(&self) -> Option<String> {
        if !self.scope.allows_cdn_caching() {
            return None;
        }
        let mut directive = format!("max-age={}", self.cdn_ttl.as_secs());
        self.push_stale_windows(&mut directive);
        Some(directive)
    }

    /// `Cache-Control` carrying the shared-cache TTL as `s-maxage`, for CDNs
    /// without a dedicated header.
    pub fn shared_directive(&self) -> String {
        let mut directive = self.browser_directive();
        if self.scope.allows_cdn_caching() {
            directive.push_str(&format!(", s-maxage={}", self.cdn_ttl.as_secs()));
            self.push_stale_windows(&mut directive);
        }
        directive
    }

    fn push_stale_windows(&self, directive: &mut String) {
        if let Some(window) = self.stale_while_revalidate {
            directive.push_str(&format!(", stale-while-revalidate={}", window.as_secs()));
        }
        if let Some(window) = self.stale_if_error {
            directive.push_str(&format!(", stale-if-error={}", window.as_secs()));
        }
    }
}
