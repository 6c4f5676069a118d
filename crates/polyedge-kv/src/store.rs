//! Key-value store wrapper with JSON helpers.

use std::borrow::Cow;
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use polyedge_core::{PlatformError, Provider, Result};
use serde::{de::DeserializeOwned, Serialize};

/// Key-value backend of a provider.
///
/// Values are strings; an absent key is `Ok(None)`, never an error. Writes
/// are last-write-wins with no expiry.
#[async_trait]
pub trait KvBackend: Send + Sync {
    /// Get a value.
    async fn get(&self, key: &str) -> Result<Option<String>>;

    /// Store a value, replacing any previous one.
    async fn put(&self, key: &str, value: &str) -> Result<()>;

    /// Delete a value. Deleting a missing key succeeds.
    async fn delete(&self, key: &str) -> Result<()>;
}

/// What a provider offers for key-value storage.
#[derive(Clone)]
pub enum KvBinding {
    /// A working backend.
    Backend(Arc<dyn KvBackend>),
    /// The provider has no key-value implementation.
    Unimplemented,
}

impl KvBinding {
    /// Wrap a backend.
    pub fn backend<B: KvBackend + 'static>(backend: B) -> Self {
        Self::Backend(Arc::new(backend))
    }

    /// Whether operations can succeed.
    pub fn is_implemented(&self) -> bool {
        matches!(self, Self::Backend(_))
    }
}

impl fmt::Debug for KvBinding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Backend(_) => f.write_str("KvBinding::Backend(..)"),
            Self::Unimplemented => f.write_str("KvBinding::Unimplemented"),
        }
    }
}

/// Provider-neutral key-value store.
///
/// A thin pass-through: no caching, retries or TTL. Backend errors are
/// returned unchanged.
#[derive(Debug, Clone)]
pub struct KeyValueStore {
    provider: Provider,
    binding: KvBinding,
    namespace: Option<String>,
}

impl KeyValueStore {
    /// Wrap `binding` for `provider`.
    pub fn new(provider: Provider, binding: KvBinding) -> Self {
        Self {
            provider,
            binding,
            namespace: None,
        }
    }

    /// Prefix every key with `namespace:`.
    pub fn with_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = Some(namespace.into());
        self
    }

    fn key<'a>(&self, key: &'a str) -> Cow<'a, str> {
        match &self.namespace {
            Some(ns) => Cow::Owned(format!("{}:{}", ns, key)),
            None => Cow::Borrowed(key),
        }
    }

    /// Provider the store belongs to.
    pub fn provider(&self) -> Provider {
        self.provider
    }

    /// Whether the binding has a backend.
    pub fn is_implemented(&self) -> bool {
        self.binding.is_implemented()
    }

    fn backend(&self, operation: &'static str) -> Result<&dyn KvBackend> {
        match &self.binding {
            KvBinding::Backend(backend) => Ok(backend.as_ref()),
            KvBinding::Unimplemented => Err(PlatformError::not_implemented(self.provider, operation)),
        }
    }

    /// Get a value.
    pub async fn get(&self, key: &str) -> Result<Option<String>> {
        self.backend("kv get")?.get(&self.key(key)).await
    }

    /// Store a value.
    pub async fn put(&self, key: &str, value: &str) -> Result<()> {
        self.backend("kv put")?.put(&self.key(key), value).await
    }

    /// Delete a value.
    pub async fn delete(&self, key: &str) -> Result<()> {
        self.backend("kv delete")?.delete(&self.key(key)).await
    }

    /// Get and deserialize a JSON value.
    ///
    /// ```rust,ignore
    /// let cart: Option<Cart> = store.get_json(&kv_key!("cart", user_id)).await?;
    /// ```
    pub async fn get_json<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
        match self.get(key).await? {
            Some(raw) => Ok(Some(serde_json::from_str(&raw)?)),
            None => Ok(None),
        }
    }

    /// Serialize and store a JSON value.
    pub async fn put_json<T: Serialize>(&self, key: &str, value: &T) -> Result<()> {
        let raw = serde_json::to_string(value)?;
        self.put(key, &raw).await
    }
}

/// In-memory backend for development and tests.
#[derive(Debug, Clone, Default)]
pub struct MemoryKv {
    entries: Arc<RwLock<HashMap<String, String>>>,
}

impl MemoryKv {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored keys.
    pub fn len(&self) -> usize {
        self.entries.read().map(|e| e.len()).unwrap_or(0)
    }

    /// Whether the store is empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn poisoned() -> PlatformError {
    PlatformError::Kv("memory store lock poisoned".to_string())
}

#[async_trait]
impl KvBackend for MemoryKv {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        let entries = self.entries.read().map_err(|_| poisoned())?;
        Ok(entries.get(key).cloned())
    }

    async fn put(&self, key: &str, value: &str) -> Result<()> {
        let mut entries = self.entries.write().map_err(|_| poisoned())?;
        entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<()> {
        let mut entries = self.entries.write().map_err(|_| poisoned())?;
        entries.remove(key);
        Ok(())
    }
}
