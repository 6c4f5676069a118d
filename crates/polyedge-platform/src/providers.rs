//! One adapter per supported provider.

use polyedge_core::{Headers, Provider};
use polyedge_kv::KvBinding;

use crate::adapter::{AdapterOptions, PlatformAdapter};
use crate::cache::CdnCachePolicy;

fn cache_headers(policy: &CdnCachePolicy, cdn_header: &str) -> Headers {
    let mut headers = Headers::new();
    headers.set("Cache-Control", policy.browser_directive());
    if let Some(directive) = policy.cdn_directive() {
        headers.set(cdn_header, directive);
    }
    headers
}

/// Cloudflare Workers.
#[derive(Debug, Clone, Default)]
pub struct CloudflareAdapter {
    options: AdapterOptions,
}

impl CloudflareAdapter {
    pub fn new(options: AdapterOptions) -> Self {
        Self { options }
    }
}

impl PlatformAdapter for CloudflareAdapter {
    fn provider(&self) -> Provider {
        Provider::Cloudflare
    }

    fn options(&self) -> &AdapterOptions {
        &self.options
    }

    fn cdn_cache_headers(&self, policy: &CdnCachePolicy) -> Headers {
        let mut headers = cache_headers(policy, "Cloudflare-CDN-Cache-Control");
        if policy.scope.allows_cdn_caching() && !policy.tags.is_empty() {
            headers.set("Cache-Tag", policy.tags.join(","));
        }
        headers
    }
}

/// Fastly Compute.
#[derive(Debug, Clone, Default)]
pub struct FastlyAdapter {
    options: AdapterOptions,
}

impl FastlyAdapter {
    pub fn new(options: AdapterOptions) -> Self {
        Self { options }
    }
}

impl PlatformAdapter for FastlyAdapter {
    fn provider(&self) -> Provider {
        Provider::Fastly
    }

    fn options(&self) -> &AdapterOptions {
        &self.options
    }

    fn cdn_cache_headers(&self, policy: &CdnCachePolicy) -> Headers {
        let mut headers = cache_headers(policy, "Surrogate-Control");
        if policy.scope.allows_cdn_caching() && !policy.tags.is_empty() {
            headers.set("Surrogate-Key", policy.tags.join(" "));
        }
        headers
    }
}

/// Vercel Edge Functions.
#[derive(Debug, Clone, Default)]
pub struct VercelAdapter {
    options: AdapterOptions,
}

impl VercelAdapter {
    pub fn new(options: AdapterOptions) -> Self {
        Self { options }
    }
}

impl PlatformAdapter for VercelAdapter {
    fn provider(&self) -> Provider {
        Provider::Vercel
    }

    fn options(&self) -> &AdapterOptions {
        &self.options
    }

    fn cdn_cache_headers(&self, policy: &CdnCachePolicy) -> Headers {
        cache_headers(policy, "Vercel-CDN-Cache-Control")
    }
}

/// Akamai EdgeWorkers.
#[derive(Debug, Clone, Default)]
pub struct AkamaiAdapter {
    options: AdapterOptions,
}

impl AkamaiAdapter {
    pub fn new(options: AdapterOptions) -> Self {
        Self { options }
    }
}

impl PlatformAdapter for AkamaiAdapter {
    fn provider(&self) -> Provider {
        Provider::Akamai
    }

    fn options(&self) -> &AdapterOptions {
        &self.options
    }

    fn cdn_cache_headers(&self, policy: &CdnCachePolicy) -> Headers {
        let mut headers = Headers::new();
        headers.set("Cache-Control", policy.browser_directive());
        if policy.scope.allows_cdn_caching() {
            // Edge-Control takes TTLs with a unit suffix.
            headers.set(
                "Edge-Control",
                format!("!no-store, max-age={}s", policy.cdn_ttl.as_secs()),
            );
            if !policy.tags.is_empty() {
                headers.set("Edge-Cache-Tag", policy.tags.join(","));
            }
        } else {
            headers.set("Edge-Control", "no-store");
        }
        headers
    }
}

/// CloudFront Lambda@Edge.
///
/// CloudFront has no key-value implementation; every store operation fails
/// with `NotImplemented`, even when a backend was supplied.
#[derive(Debug, Clone, Default)]
pub struct CloudFrontAdapter {
    options: AdapterOptions,
}

impl CloudFrontAdapter {
    pub fn new(options: AdapterOptions) -> Self {
        Self { options }
    }
}

impl PlatformAdapter for CloudFrontAdapter {
    fn provider(&self) -> Provider {
        Provider::CloudFront
    }

    fn options(&self) -> &AdapterOptions {
        &self.options
    }

    fn cdn_cache_headers(&self, policy: &CdnCachePolicy) -> Headers {
        let mut headers = Headers::new();
        headers.set("Cache-Control", policy.shared_directive());
        headers
    }

    fn kv_binding(&self) -> KvBinding {
        KvBinding::Unimplemented
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use polyedge_core::PlatformError;
    use polyedge_kv::MemoryKv;
    use std::time::Duration;

    fn policy() -> CdnCachePolicy {
        CdnCachePolicy::public(Duration::from_secs(60), Duration::from_secs(600))
            .with_tag("product-1")
            .with_tag("catalog")
    }

    // === Cache headers ===

    #[test]
    fn test_cloudflare_cache_headers() {
        let headers = CloudflareAdapter::default().cdn_cache_headers(&policy());
        assert_eq!(headers.get("cache-control"), Some("public, max-age=60"));
        assert_eq!(headers.get("cloudflare-cdn-cache-control"), Some("max-age=600"));
        assert_eq!(headers.get("cache-tag"), Some("product-1,catalog"));
    }

    #[test]
    fn test_fastly_cache_headers() {
        let headers = FastlyAdapter::default().cdn_cache_headers(&policy());
        assert_eq!(headers.get("surrogate-control"), Some("max-age=600"));
        assert_eq!(headers.get("surrogate-key"), Some("product-1 catalog"));
    }

    #[test]
    fn test_vercel_cache_headers() {
        let headers = VercelAdapter::default().cdn_cache_headers(&policy());
        assert_eq!(headers.get("vercel-cdn-cache-control"), Some("max-age=600"));
        assert_eq!(headers.len(), 2);
    }

    #[test]
    fn test_akamai_cache_headers() {
        let headers = AkamaiAdapter::default().cdn_cache_headers(&policy());
        assert_eq!(headers.get("edge-control"), Some("!no-store, max-age=600s"));
        assert_eq!(headers.get("edge-cache-tag"), Some("product-1,catalog"));

        let headers = AkamaiAdapter::default().cdn_cache_headers(&CdnCachePolicy::no_store());
        assert_eq!(headers.get("edge-control"), Some("no-store"));
    }

    #[test]
    fn test_cloudfront_cache_headers_use_s_maxage() {
        let headers = CloudFrontAdapter::default().cdn_cache_headers(&policy());
        assert_eq!(
            headers.get("cache-control"),
            Some("public, max-age=60, s-maxage=600")
        );
        assert_eq!(headers.len(), 1);
    }

    #[test]
    fn test_private_policy_has_no_cdn_header() {
        let private = CdnCachePolicy::private(Duration::from_secs(30)).with_tag("user");
        let headers = CloudflareAdapter::default().cdn_cache_headers(&private);
        assert_eq!(headers.get("cache-control"), Some("private, max-age=30"));
        assert!(!headers.contains("cloudflare-cdn-cache-control"));
        assert!(!headers.contains("cache-tag"));
    }

    // === Key-value ===

    #[test]
    fn test_kv_store_with_backend() {
        let adapter = FastlyAdapter::new(AdapterOptions::new().with_kv(MemoryKv::new()));
        let store = adapter.kv_store().unwrap();
        assert_eq!(store.provider(), Provider::Fastly);
    }

    #[test]
    fn test_kv_store_without_backend() {
        let err = VercelAdapter::default().kv_store().unwrap_err();
        assert!(matches!(err, PlatformError::NotImplemented { provider: Provider::Vercel, .. }));
    }

    #[test]
    fn test_cloudfront_kv_is_unimplemented() {
        let adapter = CloudFrontAdapter::new(AdapterOptions::new().with_kv(MemoryKv::new()));
        assert!(!adapter.kv_binding().is_implemented());
        let err = adapter.kv_store().unwrap_err();
        assert!(matches!(
            err,
            PlatformError::NotImplemented {
                provider: Provider::CloudFront,
                ..
            }
        ));
    }
}
