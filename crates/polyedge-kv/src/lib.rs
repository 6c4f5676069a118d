//! Key-value storage for the polyedge platform abstraction layer.
//!
//! - `KvBackend` - What a provider's storage must offer
//! - `KvBinding` - A backend, or the marker for providers without one
//! - `KeyValueStore` - Provider-neutral pass-through wrapper
//! - `MemoryKv` - In-memory backend for development and tests

mod store;

pub use store::*;

/// Build a namespaced key.
///
/// ```rust,ignore
/// let key = kv_key!("cart", user_id);
/// // "cart:user123"
/// ```
#[macro_export]
macro_rules! kv_key {
    ($prefix:expr, $($part:expr),+) => {{
        let mut key = String::from($prefix);
        $(
            key.push(':');
            key.push_str(&$part.to_string());
        )+
        key
    }};
}

#[cfg(test)]
mod tests {
    #[test]
    fn test_kv_key() {
        let user = "user123";
        assert_eq!(kv_key!("cart", user), "cart:user123");
        assert_eq!(kv_key!("flags", "env", 3), "flags:env:3");
    }
}
