//! Composition root.

use std::sync::Arc;

use polyedge_core::{PlatformConfig, Provider, Result};
use polyedge_events::EventPipeline;
use polyedge_http::NativeRequest;
use polyedge_observability::StructuredLogger;

use crate::adapter::{AdapterOptions, PlatformAdapter};
use crate::context::NativeContext;
use crate::facade::AbstractionFacade;
use crate::factory::AdapterFactory;

/// Process-wide services, built once at startup and shared by every
/// request: the logger, the event pipeline, the adapter factory and the
/// active adapter.
pub struct Platform {
    config: PlatformConfig,
    logger: StructuredLogger,
    events: Arc<EventPipeline>,
    factory: Arc<AdapterFactory>,
    adapter: Arc<dyn PlatformAdapter>,
}

impl Platform {
    /// Build the services for `config.provider` from the built-in adapters.
    pub fn from_config(config: PlatformConfig, options: AdapterOptions) -> Result<Self> {
        Self::with_factory(config, options, AdapterFactory::with_builtin())
    }

    /// Build the services with a caller-populated factory.
    ///
    /// Fails with `UnknownAdapter` when the factory has nothing registered
    /// under the provider's name.
    pub fn with_factory(
        config: PlatformConfig,
        options: AdapterOptions,
        factory: AdapterFactory,
    ) -> Result<Self> {
        let logger = StructuredLogger::from_config(&config.logging).with_provider(config.provider);
        Self::assemble(config, options, factory, logger)
    }

    /// Build the services around an existing logger.
    pub fn with_logger(
        config: PlatformConfig,
        options: AdapterOptions,
        logger: StructuredLogger,
    ) -> Result<Self> {
        let logger = logger.with_provider(config.provider);
        Self::assemble(config, options, AdapterFactory::with_builtin(), logger)
    }

    fn assemble(
        config: PlatformConfig,
        options: AdapterOptions,
        factory: AdapterFactory,
        logger: StructuredLogger,
    ) -> Result<Self> {
        let adapter = factory.create_for(config.provider, options)?;
        let events = Arc::new(EventPipeline::new(logger.clone()));

        logger
            .info_builder("platform initialized")
            .field("adapters", factory.list_registered().join(","))
            .emit();

        Ok(Self {
            config,
            logger,
            events,
            factory: Arc::new(factory),
            adapter,
        })
    }

    pub fn provider(&self) -> Provider {
        self.config.provider
    }

    pub fn config(&self) -> &PlatformConfig {
        &self.config
    }

    pub fn logger(&self) -> &StructuredLogger {
        &self.logger
    }

    /// The shared event pipeline. Register listeners here before serving.
    pub fn events(&self) -> &Arc<EventPipeline> {
        &self.events
    }

    pub fn factory(&self) -> &Arc<AdapterFactory> {
        &self.factory
    }

    pub fn adapter(&self) -> &Arc<dyn PlatformAdapter> {
        &self.adapter
    }

    /// Per-request facade carrying the configured environment and key-value
    /// namespace.
    pub fn facade(&self, request: NativeRequest, context: NativeContext) -> Result<AbstractionFacade> {
        let facade = AbstractionFacade::new(
            Arc::clone(&self.adapter),
            request,
            context,
            Arc::clone(&self.events),
            &self.logger,
        )?;
        Ok(facade
            .with_env(self.config.env.clone())
            .with_kv_namespace(self.config.kv.namespace.clone()))
    }
}

impl std::fmt::Debug for Platform {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Platform")
            .field("provider", &self.config.provider)
            .field("adapters", &self.factory.list_registered())
            .finish()
    }
}
