//! Per-provider capability set.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use polyedge_core::{CookieOptions, Headers, PlatformError, Provider, Result};
use polyedge_http::{NativeRequest, NormalizedRequest};
use polyedge_kv::{KeyValueStore, KvBackend, KvBinding};
use polyedge_observability::StructuredLogger;

use crate::cache::CdnCachePolicy;
use crate::context::{ExecutionContext, NativeContext};

/// Provider-side secret storage, consulted last when resolving environment
/// values.
pub trait SecretStore: Send + Sync {
    fn secret(&self, name: &str) -> Option<String>;
}

/// Secrets held in memory.
#[derive(Debug, Clone, Default)]
pub struct MapSecrets(HashMap<String, String>);

impl MapSecrets {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.0.insert(name.into(), value.into());
        self
    }
}

impl SecretStore for MapSecrets {
    fn secret(&self, name: &str) -> Option<String> {
        self.0.get(name).cloned()
    }
}

/// What an adapter is built with.
#[derive(Clone, Default)]
pub struct AdapterOptions {
    /// Key-value backend bound in the runtime.
    pub kv: Option<Arc<dyn KvBackend>>,
    /// Provider secret store.
    pub secrets: Option<Arc<dyn SecretStore>>,
}

impl AdapterOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_kv<B: KvBackend + 'static>(mut self, backend: B) -> Self {
        self.kv = Some(Arc::new(backend));
        self
    }

    pub fn with_secrets<S: SecretStore + 'static>(mut self, secrets: S) -> Self {
        self.secrets = Some(Arc::new(secrets));
        self
    }
}

impl fmt::Debug for AdapterOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AdapterOptions")
            .field("kv", &self.kv.is_some())
            .field("secrets", &self.secrets.is_some())
            .finish()
    }
}

/// Everything that differs between edge runtimes, implemented once per
/// provider and selected at startup through the
/// [`AdapterFactory`](crate::AdapterFactory).
///
/// Request-level operations default to the normalized request, which already
/// writes through to the native shape of the adapter's provider.
pub trait PlatformAdapter: Send + Sync {
    /// Provider this adapter speaks to.
    fn provider(&self) -> Provider;

    /// Options the adapter was built with.
    fn options(&self) -> &AdapterOptions;

    /// `Cache-Control` family headers for `policy`.
    fn cdn_cache_headers(&self, policy: &CdnCachePolicy) -> Headers;

    /// Wrap a native request.
    fn normalize_request(&self, native: NativeRequest) -> Result<NormalizedRequest> {
        NormalizedRequest::new(self.provider(), native)
    }

    /// Wrap a native context object.
    fn execution_context(&self, native: NativeContext, logger: StructuredLogger) -> ExecutionContext {
        ExecutionContext::new(self.provider(), native, logger)
    }

    fn header(&self, request: &NormalizedRequest, name: &str) -> Option<String> {
        request.header(name).map(String::from)
    }

    fn set_header(&self, request: &mut NormalizedRequest, name: &str, value: &str) -> Result<()> {
        request.set_header(name, value)
    }

    fn cookie(&self, request: &NormalizedRequest, name: &str) -> Option<String> {
        request.cookie(name)
    }

    fn set_cookie(
        &self,
        request: &mut NormalizedRequest,
        name: &str,
        value: &str,
        options: &CookieOptions,
    ) -> Result<()> {
        request.set_cookie(name, value, options)
    }

    fn clone_request(&self, request: &NormalizedRequest) -> NormalizedRequest {
        request.clone_request()
    }

    /// Key-value capability of this provider.
    fn kv_binding(&self) -> KvBinding {
        match &self.options().kv {
            Some(backend) => KvBinding::Backend(Arc::clone(backend)),
            None => KvBinding::Unimplemented,
        }
    }

    /// Key-value store over [`PlatformAdapter::kv_binding`].
    ///
    /// Fails with `NotImplemented` when the provider has no backend.
    fn kv_store(&self) -> Result<KeyValueStore> {
        let binding = self.kv_binding();
        if !binding.is_implemented() {
            return Err(PlatformError::not_implemented(self.provider(), "kv store"));
        }
        Ok(KeyValueStore::new(self.provider(), binding))
    }

    /// Look a secret up in the provider's secret store.
    fn secret(&self, name: &str) -> Option<String> {
        self.options()
            .secrets
            .as_ref()
            .and_then(|secrets| secrets.secret(name))
    }
}
