//! Listener contract and closure adapters.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use futures::future::BoxFuture;

use crate::context::EventContext;

/// Something attached to an [`Event`](crate::Event).
///
/// Errors are caught and logged by the pipeline; they never reach the
/// emitter or stop later listeners.
#[async_trait]
pub trait EventListener: Send + Sync {
    async fn handle(&self, ctx: &mut EventContext) -> anyhow::Result<()>;
}

/// Handle returned by registration, used to remove the listener again.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ListenerId(pub(crate) u64);

impl fmt::Display for ListenerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "listener-{}", self.0)
    }
}

struct AsyncFnListener<F>(F);

#[async_trait]
impl<F> EventListener for AsyncFnListener<F>
where
    F: for<'a> Fn(&'a mut EventContext) -> BoxFuture<'a, anyhow::Result<()>> + Send + Sync,
{
    async fn handle(&self, ctx: &mut EventContext) -> anyhow::Result<()> {
        (self.0)(ctx).await
    }
}

struct SyncFnListener<F>(F);

#[async_trait]
impl<F> EventListener for SyncFnListener<F>
where
    F: Fn(&mut EventContext) -> anyhow::Result<()> + Send + Sync,
{
    async fn handle(&self, ctx: &mut EventContext) -> anyhow::Result<()> {
        (self.0)(ctx)
    }
}

/// Wrap an async closure.
///
/// ```rust,ignore
/// pipeline.on(Event::AfterDecide, listener_fn(|ctx| Box::pin(async move {
///     ctx.set("logged", true);
///     Ok(())
/// })));
/// ```
pub fn listener_fn<F>(f: F) -> Arc<dyn EventListener>
where
    F: for<'a> Fn(&'a mut EventContext) -> BoxFuture<'a, anyhow::Result<()>>
        + Send
        + Sync
        + 'static,
{
    Arc::new(AsyncFnListener(f))
}

/// Wrap a closure that never awaits.
pub fn sync_listener<F>(f: F) -> Arc<dyn EventListener>
where
    F: Fn(&mut EventContext) -> anyhow::Result<()> + Send + Sync + 'static,
{
    Arc::new(SyncFnListener(f))
}
