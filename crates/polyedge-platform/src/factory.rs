//! Named adapter constructors.

use std::collections::BTreeMap;
use std::sync::{Arc, PoisonError, RwLock};

use polyedge_core::{PlatformError, Provider, Result};

use crate::adapter::{AdapterOptions, PlatformAdapter};
use crate::providers::{
    AkamaiAdapter, CloudFrontAdapter, CloudflareAdapter, FastlyAdapter, VercelAdapter,
};

/// Builds an adapter from its options.
pub type AdapterConstructor = Arc<dyn Fn(AdapterOptions) -> Arc<dyn PlatformAdapter> + Send + Sync>;

fn constructor<A, F>(build: F) -> AdapterConstructor
where
    A: PlatformAdapter + 'static,
    F: Fn(AdapterOptions) -> A + Send + Sync + 'static,
{
    Arc::new(move |options| Arc::new(build(options)) as Arc<dyn PlatformAdapter>)
}

/// Name to constructor table with uniqueness enforcement.
///
/// Register at startup only; afterwards the table is read concurrently by
/// every request.
#[derive(Default)]
pub struct AdapterFactory {
    constructors: RwLock<BTreeMap<String, AdapterConstructor>>,
}

impl AdapterFactory {
    /// An empty factory.
    pub fn new() -> Self {
        Self::default()
    }

    /// A factory with every built-in provider registered under its canonical
    /// name.
    pub fn with_builtin() -> Self {
        let factory = Self::new();
        for provider in Provider::ALL {
            let constructor = match provider {
                Provider::Cloudflare => constructor(CloudflareAdapter::new),
                Provider::Fastly => constructor(FastlyAdapter::new),
                Provider::Vercel => constructor(VercelAdapter::new),
                Provider::Akamai => constructor(AkamaiAdapter::new),
                Provider::CloudFront => constructor(CloudFrontAdapter::new),
            };
            factory
                .constructors
                .write()
                .unwrap_or_else(PoisonError::into_inner)
                .insert(provider.as_str().to_string(), constructor);
        }
        factory
    }

    /// Register a constructor.
    ///
    /// Fails with `DuplicateAdapter` when `name` is taken.
    pub fn register<F>(&self, name: impl Into<String>, constructor: F) -> Result<()>
    where
        F: Fn(AdapterOptions) -> Arc<dyn PlatformAdapter> + Send + Sync + 'static,
    {
        let name = name.into();
        let mut constructors = self
            .constructors
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        if constructors.contains_key(&name) {
            return Err(PlatformError::DuplicateAdapter(name));
        }
        constructors.insert(name, Arc::new(constructor));
        Ok(())
    }

    /// Build a new adapter instance. Instances are never shared between
    /// calls.
    ///
    /// Fails with `UnknownAdapter` when `name` was never registered.
    pub fn create(&self, name: &str, options: AdapterOptions) -> Result<Arc<dyn PlatformAdapter>> {
        let constructor = self
            .constructors
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(name)
            .cloned()
            .ok_or_else(|| PlatformError::UnknownAdapter(name.to_string()))?;
        Ok(constructor(options))
    }

    /// Build the adapter registered under `provider`'s canonical name.
    pub fn create_for(&self, provider: Provider, options: AdapterOptions) -> Result<Arc<dyn PlatformAdapter>> {
        self.create(provider.as_str(), options)
    }

    pub fn has(&self, name: &str) -> bool {
        self.constructors
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(name)
    }

    /// Registered names, sorted.
    pub fn list_registered(&self) -> Vec<String> {
        self.constructors
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .keys()
            .cloned()
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_providers() {
        let factory = AdapterFactory::with_builtin();
        assert_eq!(
            factory.list_registered(),
            vec!["akamai", "cloudflare", "cloudfront", "fastly", "vercel"]
        );
        for provider in Provider::ALL {
            let adapter = factory.create_for(provider, AdapterOptions::new()).unwrap();
            assert_eq!(adapter.provider(), provider);
        }
    }

    #[test]
    fn test_duplicate_registration() {
        let factory = AdapterFactory::new();
        factory
            .register("edge", |o| Arc::new(CloudflareAdapter::new(o)))
            .unwrap();
        let err = factory
            .register("edge", |o| Arc::new(FastlyAdapter::new(o)))
            .unwrap_err();
        assert!(matches!(err, PlatformError::DuplicateAdapter(ref n) if n == "edge"));

        // The first registration is kept.
        let adapter = factory.create("edge", AdapterOptions::new()).unwrap();
        assert_eq!(adapter.provider(), Provider::Cloudflare);
    }

    #[test]
    fn test_duplicate_builtin() {
        let factory = AdapterFactory::with_builtin();
        assert!(factory
            .register("fastly", |o| Arc::new(FastlyAdapter::new(o)))
            .is_err());
    }

    #[test]
    fn test_unknown_adapter() {
        let factory = AdapterFactory::with_builtin();
        let err = factory.create("netlify", AdapterOptions::new()).err().unwrap();
        assert!(matches!(err, PlatformError::UnknownAdapter(ref n) if n == "netlify"));
        assert!(!factory.has("netlify"));
        assert!(factory.has("akamai"));
    }

    #[test]
    fn test_create_returns_new_instances() {
        let factory = AdapterFactory::with_builtin();
        let a = factory.create("vercel", AdapterOptions::new()).unwrap();
        let b = factory.create("vercel", AdapterOptions::new()).unwrap();
        assert!(!Arc::ptr_eq(&a, &b));
    }
}
