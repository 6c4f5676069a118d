//! Per-request entry point for application code.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use http::{HeaderName, HeaderValue, StatusCode};
use polyedge_core::{CookieOptions, Headers, PlatformError, Provider, RequestId, Result};
use polyedge_events::{EmitOutcome, Event, EventContext, EventPipeline};
use polyedge_http::{
    decode_body, BodyContent, NativeRequest, NativeResponse, NormalizedRequest, NormalizedResponse,
    ResponseInit,
};
use polyedge_kv::{KeyValueStore, KvBinding};
use polyedge_observability::StructuredLogger;
use serde_json::Value;

use crate::adapter::PlatformAdapter;
use crate::cache::CdnCachePolicy;
use crate::context::{BackgroundTask, Deferred, ExecutionContext, NativeContext};

/// One request's view of the platform.
///
/// Owns the normalized request, the execution context and the lazily built
/// key-value store. The event pipeline is shared with every other request.
pub struct AbstractionFacade {
    adapter: Arc<dyn PlatformAdapter>,
    request: NormalizedRequest,
    context: ExecutionContext,
    kv: Option<KeyValueStore>,
    kv_namespace: Option<String>,
    env: HashMap<String, String>,
    events: Arc<EventPipeline>,
    logger: StructuredLogger,
}

impl AbstractionFacade {
    /// Wrap the runtime's request and context objects.
    ///
    /// Fails when `native_request` does not have the adapter provider's
    /// native shape.
    pub fn new(
        adapter: Arc<dyn PlatformAdapter>,
        native_request: NativeRequest,
        native_context: NativeContext,
        events: Arc<EventPipeline>,
        logger: &StructuredLogger,
    ) -> Result<Self> {
        let provider = adapter.provider();
        let logger = logger
            .for_request(RequestId::generate())
            .with_provider(provider);
        let request = adapter.normalize_request(native_request)?;
        let context = adapter.execution_context(native_context, logger.clone());

        logger
            .debug_builder("request normalized")
            .field("method", request.method().as_str())
            .field("path", request.path())
            .emit();

        Ok(Self {
            adapter,
            request,
            context,
            kv: None,
            kv_namespace: None,
            env: HashMap::new(),
            events,
            logger,
        })
    }

    /// Static environment values consulted by [`AbstractionFacade::env_variable`].
    pub fn with_env(mut self, env: HashMap<String, String>) -> Self {
        self.env = env;
        self
    }

    /// Prefix every key-value key with `namespace`.
    pub fn with_kv_namespace(mut self, namespace: Option<String>) -> Self {
        self.kv_namespace = namespace;
        self
    }

    pub fn provider(&self) -> Provider {
        self.adapter.provider()
    }

    pub fn adapter(&self) -> &Arc<dyn PlatformAdapter> {
        &self.adapter
    }

    pub fn request(&self) -> &NormalizedRequest {
        &self.request
    }

    pub fn request_mut(&mut self) -> &mut NormalizedRequest {
        &mut self.request
    }

    pub fn context(&self) -> &ExecutionContext {
        &self.context
    }

    /// Request-scoped logger, tagged with the request id and provider.
    pub fn logger(&self) -> &StructuredLogger {
        &self.logger
    }

    pub fn events(&self) -> &Arc<EventPipeline> {
        &self.events
    }

    // --- Key-value ---

    /// Build the key-value store over `binding` on first use; later calls
    /// return the cached store and ignore `binding`.
    ///
    /// An unimplemented binding fails with `NotImplemented` right away.
    pub fn initialize_kv_store(&mut self, binding: KvBinding) -> Result<&KeyValueStore> {
        let store = match self.kv.take() {
            Some(store) => store,
            None => self.build_kv_store(binding)?,
        };
        Ok(self.kv.insert(store))
    }

    /// Key-value store over the adapter's default binding.
    pub fn kv_store(&mut self) -> Result<&KeyValueStore> {
        let binding = self.adapter.kv_binding();
        self.initialize_kv_store(binding)
    }

    fn build_kv_store(&self, binding: KvBinding) -> Result<KeyValueStore> {
        let provider = self.provider();
        if !binding.is_implemented() {
            self.logger
                .warn_builder("kv store unavailable")
                .field("provider", provider.as_str())
                .emit();
            return Err(PlatformError::not_implemented(provider, "kv store"));
        }

        let mut store = KeyValueStore::new(provider, binding);
        if let Some(namespace) = &self.kv_namespace {
            store = store.with_namespace(namespace.clone());
        }
        self.logger.debug("kv store initialized");
        Ok(store)
    }

    // --- Native responses ---

    fn check_response_shape(&self, response: &NativeResponse) -> Result<()> {
        let provider = self.provider();
        if response.shape() != provider.header_shape() {
            return Err(PlatformError::NativeShapeMismatch {
                provider,
                kind: "response",
            });
        }
        Ok(())
    }

    /// First value of a header on a native response, e.g. one returned by an
    /// origin fetch.
    pub fn header_value(&self, response: &NativeResponse, name: &str) -> Result<Option<String>> {
        self.check_response_shape(response)?;
        Ok(response.header(name))
    }

    /// Body of a native response, decoded by its `Content-Type`.
    pub fn response_content(&self, response: &NativeResponse) -> Result<Option<BodyContent>> {
        self.check_response_shape(response)?;
        let body = response.body()?;
        decode_body(response.header("content-type").as_deref(), &body)
    }

    // --- Environment ---

    /// Resolve an environment value.
    ///
    /// Lookup order: `env`, the facade's static environment, the process
    /// environment, the provider's secret store.
    pub fn env_variable(&self, name: &str, env: Option<&HashMap<String, String>>) -> Result<String> {
        env.and_then(|env| env.get(name).cloned())
            .or_else(|| self.env.get(name).cloned())
            .or_else(|| std::env::var(name).ok())
            .or_else(|| self.adapter.secret(name))
            .ok_or_else(|| PlatformError::MissingEnvVariable(name.to_string()))
    }

    /// Provider-specific cache headers for `policy`.
    pub fn cdn_headers(&self, policy: &CdnCachePolicy) -> Headers {
        self.adapter.cdn_cache_headers(policy)
    }

    // --- Cookies ---

    /// Read a request cookie.
    ///
    /// `BeforeReadingCookie` listeners see `{name}` and may rewrite it.
    /// `AfterReadingCookie` listeners see `{name, value}`; whatever `value`
    /// holds afterwards is returned, so setting it to null vetoes the cookie.
    pub async fn read_cookie(&self, name: &str) -> Option<String> {
        let mut ctx = EventContext::new().with("name", name);
        self.events.emit(Event::BeforeReadingCookie, &mut ctx).await;
        let name = ctx.get_str("name").unwrap_or(name).to_string();

        let value = self.adapter.cookie(&self.request, &name);
        let mut ctx = EventContext::new()
            .with("name", name)
            .with("value", value.map_or(Value::Null, Value::String));
        self.events.emit(Event::AfterReadingCookie, &mut ctx).await;
        ctx.get_str("value").map(String::from)
    }

    /// Queue a `Set-Cookie` for the response.
    ///
    /// `BeforeCreateCookie` listeners see `{name, value}` and may rewrite
    /// either; a null value vetoes the cookie and `Ok(false)` is returned.
    pub async fn set_cookie(&mut self, name: &str, value: &str, options: &CookieOptions) -> Result<bool> {
        let mut ctx = EventContext::new().with("name", name).with("value", value);
        self.events.emit(Event::BeforeCreateCookie, &mut ctx).await;
        let Some(value) = ctx.get_str("value").map(String::from) else {
            self.logger
                .debug_builder("cookie vetoed")
                .field("name", name)
                .emit();
            return Ok(false);
        };
        let name = ctx.get_str("name").unwrap_or(name).to_string();

        self.adapter
            .set_cookie(&mut self.request, &name, &value, options)?;

        let mut ctx = EventContext::new().with("name", name).with("value", value);
        self.events.emit(Event::AfterCreateCookie, &mut ctx).await;
        Ok(true)
    }

    // --- Response ---

    /// Build the native response for this request.
    ///
    /// `BeforeResponse` listeners see `{status, headers}` and may change the
    /// status or add headers. A status or header a listener leaves in an
    /// unusable state is logged and dropped. Cookies queued with
    /// [`AbstractionFacade::set_cookie`] are carried onto the response.
    /// `AfterResponse` listeners see `{status, headers}` of the final
    /// response, each header as an array of its values.
    pub async fn respond(&self, mut init: ResponseInit) -> Result<NativeResponse> {
        let mut ctx = EventContext::new()
            .with("status", init.status)
            .with("headers", Value::Object(Default::default()));
        self.events.emit(Event::BeforeResponse, &mut ctx).await;
        init.status = self.listener_status(&ctx, init.status);
        for (name, value) in self.listener_headers(&ctx) {
            init.headers.set(name, value);
        }

        for cookie in self.request.pending_set_cookies() {
            init.headers.append("Set-Cookie", cookie);
        }

        let response = NormalizedResponse::create(init)?;
        let status = response.status();
        let headers: BTreeMap<String, Vec<String>> = response
            .headers()
            .names()
            .into_iter()
            .filter_map(|name| {
                let values: Vec<String> = response
                    .headers()
                    .get_all(&name)
                    .into_iter()
                    .map(String::from)
                    .collect();
                (!values.is_empty()).then_some((name, values))
            })
            .collect();
        let native = response.into_native(self.provider())?;

        let mut ctx = EventContext::new().with("status", status);
        ctx.set_as("headers", &headers)?;
        self.events.emit(Event::AfterResponse, &mut ctx).await;

        self.logger
            .info_builder("response built")
            .field_i64("status", i64::from(status))
            .duration_ms("elapsed", std::time::Duration::from_micros(self.logger.elapsed_us()))
            .emit();
        Ok(native)
    }

    fn listener_status(&self, ctx: &EventContext, status: u16) -> u16 {
        let Some(value) = ctx.get("status").filter(|v| !v.is_null()) else {
            return status;
        };
        match serde_json::from_value::<u16>(value.clone()) {
            Ok(candidate) if StatusCode::from_u16(candidate).is_ok() => candidate,
            _ => {
                self.ignore_listener_value(Event::BeforeResponse, "status", value);
                status
            }
        }
    }

    fn listener_headers(&self, ctx: &EventContext) -> Vec<(String, String)> {
        let Some(value) = ctx.get("headers").filter(|v| !v.is_null()) else {
            return Vec::new();
        };
        let Ok(headers) = serde_json::from_value::<BTreeMap<String, String>>(value.clone()) else {
            self.ignore_listener_value(Event::BeforeResponse, "headers", value);
            return Vec::new();
        };
        headers
            .into_iter()
            .filter(|(name, value)| {
                let valid = HeaderName::from_bytes(name.as_bytes()).is_ok()
                    && HeaderValue::from_str(value).is_ok();
                if !valid {
                    self.ignore_listener_value(Event::BeforeResponse, name, &Value::from(value.as_str()));
                }
                valid
            })
            .collect()
    }

    fn ignore_listener_value(&self, event: Event, key: &str, value: &Value) {
        self.logger
            .warn_builder("listener value ignored")
            .field("event", event.as_str())
            .field("key", key)
            .field("value", value.to_string())
            .emit();
    }

    // --- Delegation ---

    /// Emit a lifecycle event on the shared pipeline.
    pub async fn emit(&self, event: Event, ctx: &mut EventContext) -> EmitOutcome {
        self.events.emit(event, ctx).await
    }

    /// See [`ExecutionContext::defer_background`].
    pub fn defer_background(&self, task: BackgroundTask) -> Deferred {
        self.context.defer_background(task)
    }

    /// See [`ExecutionContext::settle`].
    pub async fn settle(&self) -> usize {
        self.context.settle().await
    }
}

impl std::fmt::Debug for AbstractionFacade {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AbstractionFacade")
            .field("provider", &self.provider())
            .field("request", &self.request)
            .field("context", &self.context)
            .field("kv", &self.kv.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapter::{AdapterOptions, MapSecrets};
    use crate::providers::{CloudFrontAdapter, CloudflareAdapter, FastlyAdapter};
    use futures::FutureExt;
    use polyedge_events::sync_listener;
    use polyedge_http::{
        AkamaiResponse, CloudFrontRequest, FetchRequest, FetchResponse, NativeHeaders,
        ResponseBody,
    };
    use polyedge_kv::MemoryKv;
    use polyedge_observability::{LogLevel, MemorySink};
    use serde_json::json;

    fn logger() -> (StructuredLogger, MemorySink) {
        let sink = MemorySink::new();
        let logger = StructuredLogger::new()
            .with_min_level(LogLevel::Debug)
            .with_sink(Arc::new(sink.clone()));
        (logger, sink)
    }

    fn cloudflare_request() -> NativeRequest {
        NativeRequest::Fetch(
            FetchRequest::get("https://shop.example.com/anything?id=7")
                .with_header("Cookie", "session=abc; theme=dark")
                .unwrap(),
        )
    }

    fn facade_with(adapter: Arc<dyn PlatformAdapter>) -> (AbstractionFacade, Arc<EventPipeline>, MemorySink) {
        let (logger, sink) = logger();
        let events = Arc::new(EventPipeline::new(logger.clone()));
        let facade = AbstractionFacade::new(
            adapter,
            cloudflare_request(),
            NativeContext::None,
            Arc::clone(&events),
            &logger,
        )
        .unwrap();
        (facade, events, sink)
    }

    fn facade() -> (AbstractionFacade, Arc<EventPipeline>, MemorySink) {
        facade_with(Arc::new(CloudflareAdapter::default()))
    }

    // === Construction ===

    #[test]
    fn test_new_normalizes_request() {
        let (facade, _, _) = facade();
        assert_eq!(facade.provider(), Provider::Cloudflare);
        assert_eq!(facade.request().path(), "/anything");
        assert_eq!(facade.request().query_param("id"), Some("7"));
        assert!(facade.logger().request_id().is_some());
    }

    #[test]
    fn test_new_rejects_foreign_shape() {
        let (logger, _) = logger();
        let events = Arc::new(EventPipeline::new(logger.clone()));
        let err = AbstractionFacade::new(
            Arc::new(CloudFrontAdapter::default()),
            cloudflare_request(),
            NativeContext::None,
            events,
            &logger,
        )
        .unwrap_err();
        assert!(matches!(
            err,
            PlatformError::NativeShapeMismatch {
                provider: Provider::CloudFront,
                ..
            }
        ));
    }

    // === Key-value ===

    #[tokio::test]
    async fn test_kv_store_is_cached() {
        let adapter = FastlyAdapter::new(AdapterOptions::new().with_kv(MemoryKv::new()));
        let (facade, _, _) = facade_with(Arc::new(adapter));
        let mut facade = facade.with_kv_namespace(Some("shop".to_string()));

        facade.kv_store().unwrap().put("cart", "3").await.unwrap();
        // A later binding is ignored once the store exists.
        let store = facade.initialize_kv_store(KvBinding::Unimplemented).unwrap();
        assert_eq!(store.get("cart").await.unwrap().as_deref(), Some("3"));
    }

    #[test]
    fn test_kv_store_unimplemented_fails_immediately() {
        let (logger, sink) = logger();
        let events = Arc::new(EventPipeline::new(logger.clone()));
        let request = NativeRequest::CloudFront(
            CloudFrontRequest::new("GET", "/")
                .with_header("host", "example.com")
                .unwrap(),
        );
        let mut facade = AbstractionFacade::new(
            Arc::new(CloudFrontAdapter::new(AdapterOptions::new().with_kv(MemoryKv::new()))),
            request,
            NativeContext::None,
            events,
            &logger,
        )
        .unwrap();

        let err = facade.kv_store().unwrap_err();
        assert!(matches!(err, PlatformError::NotImplemented { .. }));
        assert_eq!(sink.messages_at(LogLevel::Warn), vec!["kv store unavailable"]);
    }

    // === Native responses ===

    #[test]
    fn test_header_value_and_content() {
        let (facade, _, _) = facade();
        let response = NativeResponse::Fetch(
            FetchResponse::new(200)
                .with_header("Content-Type", "application/json")
                .unwrap()
                .with_body(br#"{"ok":true}"#.to_vec()),
        );

        assert_eq!(
            facade.header_value(&response, "content-type").unwrap().as_deref(),
            Some("application/json")
        );
        assert_eq!(facade.header_value(&response, "x-missing").unwrap(), None);
        assert_eq!(
            facade.response_content(&response).unwrap(),
            Some(BodyContent::Json(json!({"ok": true})))
        );
    }

    #[test]
    fn test_response_shape_is_checked() {
        let (facade, _, _) = facade();
        let response = NativeResponse::Akamai(AkamaiResponse::new(200));
        assert!(matches!(
            facade.header_value(&response, "content-type"),
            Err(PlatformError::NativeShapeMismatch { .. })
        ));
    }

    // === Environment ===

    #[test]
    fn test_env_variable_lookup_order() {
        let adapter = CloudflareAdapter::new(
            AdapterOptions::new().with_secrets(MapSecrets::new().with("API_TOKEN", "secret")),
        );
        let (facade, _, _) = facade_with(Arc::new(adapter));
        let facade = facade.with_env(HashMap::from([
            ("REGION".to_string(), "eu".to_string()),
            ("API_TOKEN".to_string(), "from-env".to_string()),
        ]));

        let explicit = HashMap::from([("REGION".to_string(), "us".to_string())]);
        assert_eq!(facade.env_variable("REGION", Some(&explicit)).unwrap(), "us");
        assert_eq!(facade.env_variable("REGION", None).unwrap(), "eu");
        assert_eq!(facade.env_variable("API_TOKEN", None).unwrap(), "from-env");
    }

    #[test]
    fn test_env_variable_process_env_beats_secrets() {
        let path = std::env::var("PATH").unwrap();
        let adapter = CloudflareAdapter::new(
            AdapterOptions::new().with_secrets(MapSecrets::new().with("PATH", "from-secrets")),
        );
        let (facade, _, _) = facade_with(Arc::new(adapter));
        assert_eq!(facade.env_variable("PATH", None).unwrap(), path);
    }

    #[test]
    fn test_env_variable_falls_back_to_secrets() {
        let adapter = CloudflareAdapter::new(
            AdapterOptions::new()
                .with_secrets(MapSecrets::new().with("POLYEDGE_TEST_ONLY_SECRET", "s3cr3t")),
        );
        let (facade, _, _) = facade_with(Arc::new(adapter));
        assert_eq!(
            facade.env_variable("POLYEDGE_TEST_ONLY_SECRET", None).unwrap(),
            "s3cr3t"
        );
        assert!(matches!(
            facade.env_variable("POLYEDGE_TEST_ONLY_MISSING", None),
            Err(PlatformError::MissingEnvVariable(ref n)) if n == "POLYEDGE_TEST_ONLY_MISSING"
        ));
    }

    // === Cookies ===

    #[tokio::test]
    async fn test_read_cookie_without_listeners() {
        let (facade, _, _) = facade();
        assert_eq!(facade.read_cookie("session").await.as_deref(), Some("abc"));
        assert_eq!(facade.read_cookie("missing").await, None);
    }

    #[tokio::test]
    async fn test_read_cookie_listeners_rewrite_and_veto() {
        let (facade, events, _) = facade();
        events.on(
            Event::BeforeReadingCookie,
            sync_listener(|ctx| {
                if ctx.get_str("name") == Some("sid") {
                    ctx.set("name", "session");
                }
                Ok(())
            }),
        );
        events.on(
            Event::AfterReadingCookie,
            sync_listener(|ctx| {
                if ctx.get_str("name") == Some("theme") {
                    ctx.set("value", Value::Null);
                }
                Ok(())
            }),
        );

        assert_eq!(facade.read_cookie("sid").await.as_deref(), Some("abc"));
        assert_eq!(facade.read_cookie("theme").await, None);
    }

    #[tokio::test]
    async fn test_set_cookie_and_veto() {
        let (mut facade, events, _) = facade();
        events.on(
            Event::BeforeCreateCookie,
            sync_listener(|ctx| {
                if ctx.get_str("name") == Some("tracking") {
                    ctx.set("value", Value::Null);
                }
                Ok(())
            }),
        );

        let options = CookieOptions::new().path("/");
        assert!(facade.set_cookie("visited", "1", &options).await.unwrap());
        assert!(!facade.set_cookie("tracking", "x", &options).await.unwrap());
        assert_eq!(
            facade.request().pending_set_cookies(),
            vec!["visited=1; Path=/"]
        );
    }

    // === Response ===

    #[tokio::test]
    async fn test_respond_carries_cookies_and_listener_headers() {
        let (mut facade, events, sink) = facade();
        events.on(
            Event::BeforeResponse,
            sync_listener(|ctx| {
                let mut headers = ctx
                    .get_as::<BTreeMap<String, String>>("headers")
                    .unwrap_or_default();
                headers.insert("X-Served-By".to_string(), "edge".to_string());
                ctx.set_as("headers", &headers)?;
                Ok(())
            }),
        );
        events.on(
            Event::AfterResponse,
            sync_listener(|ctx| {
                anyhow::ensure!(ctx.get_as::<u16>("status") == Some(201), "unexpected status");
                Ok(())
            }),
        );

        facade
            .set_cookie("visited", "1", &CookieOptions::new())
            .await
            .unwrap();
        let native = facade
            .respond(ResponseInit::new(201).with_body(ResponseBody::from(json!({"id": 1}))))
            .await
            .unwrap();

        let NativeResponse::Fetch(response) = &native else {
            panic!("expected a fetch response");
        };
        assert_eq!(response.status, 201);
        assert_eq!(native.header("x-served-by").as_deref(), Some("edge"));
        assert_eq!(native.header("set-cookie").as_deref(), Some("visited=1"));
        assert_eq!(native.header("content-type").as_deref(), Some("application/json"));
        assert!(sink.messages_at(LogLevel::Warn).is_empty());
        assert_eq!(sink.messages_at(LogLevel::Info), vec!["response built"]);
    }

    #[tokio::test]
    async fn test_respond_ignores_inbound_set_cookie() {
        let (logger, _) = logger();
        let events = Arc::new(EventPipeline::new(logger.clone()));
        let request = NativeRequest::Fetch(
            FetchRequest::get("https://shop.example.com/")
                .with_header("Set-Cookie", "session=planted; Path=/")
                .unwrap(),
        );
        let facade = AbstractionFacade::new(
            Arc::new(CloudflareAdapter::default()),
            request,
            NativeContext::None,
            events,
            &logger,
        )
        .unwrap();

        let native = facade.respond(ResponseInit::new(200)).await.unwrap();
        assert!(native.headers().header_values("set-cookie").is_empty());
    }

    #[tokio::test]
    async fn test_respond_after_response_lists_every_cookie() {
        let (mut facade, events, _) = facade();
        let seen = Arc::new(std::sync::Mutex::new(Vec::<String>::new()));
        let recorded = Arc::clone(&seen);
        events.on(
            Event::AfterResponse,
            sync_listener(move |ctx| {
                let headers = ctx
                    .get_as::<BTreeMap<String, Vec<String>>>("headers")
                    .unwrap_or_default();
                *recorded.lock().unwrap() = headers.get("set-cookie").cloned().unwrap_or_default();
                Ok(())
            }),
        );

        let expiring = CookieOptions::new().attribute("Expires", "Wed, 21 Oct 2026 07:28:00 GMT");
        facade.set_cookie("a", "1", &expiring).await.unwrap();
        facade.set_cookie("b", "2", &CookieOptions::new()).await.unwrap();
        facade.respond(ResponseInit::new(200)).await.unwrap();

        assert_eq!(
            *seen.lock().unwrap(),
            vec!["a=1; Expires=Wed, 21 Oct 2026 07:28:00 GMT", "b=2"]
        );
    }

    #[tokio::test]
    async fn test_respond_drops_malformed_listener_values() {
        let (facade, events, sink) = facade();
        events.on(
            Event::BeforeResponse,
            sync_listener(|ctx| {
                ctx.set("status", 42);
                ctx.set("headers", json!({"X-Ok": "1", "Bad Name": "2"}));
                Ok(())
            }),
        );

        let native = facade.respond(ResponseInit::new(204)).await.unwrap();
        assert_eq!(native.status().unwrap(), 204);
        assert_eq!(native.header("x-ok").as_deref(), Some("1"));
        assert_eq!(
            sink.messages_at(LogLevel::Warn),
            vec!["listener value ignored", "listener value ignored"]
        );
    }

    #[tokio::test]
    async fn test_respond_invalid_status() {
        let (facade, _, _) = facade();
        let err = facade.respond(ResponseInit::new(42)).await.unwrap_err();
        assert!(matches!(err, PlatformError::InvalidStatus(42)));
    }

    // === Background work ===

    #[tokio::test]
    async fn test_defer_background_uses_fallback_without_hook() {
        let (facade, _, _) = facade();
        let deferred = facade.defer_background(async { Ok::<(), anyhow::Error>(()) }.boxed());
        assert!(matches!(deferred, Deferred::Spawned));
        assert_eq!(facade.settle().await, 1);
    }

    #[test]
    fn test_cdn_headers_follow_provider() {
        let (facade, _, _) = facade();
        let policy = CdnCachePolicy::public(
            std::time::Duration::from_secs(60),
            std::time::Duration::from_secs(300),
        );
        let headers = facade.cdn_headers(&policy);
        assert_eq!(headers.get("cloudflare-cdn-cache-control"), Some("max-age=300"));
    }
}
