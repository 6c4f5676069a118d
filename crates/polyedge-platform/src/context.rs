//! Background work beyond the lifetime of a request handler.

use std::fmt;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use futures::future::BoxFuture;
use futures::FutureExt;
use polyedge_core::{ContextPrimitive, Provider};
use polyedge_observability::StructuredLogger;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;

/// A unit of background work.
pub type BackgroundTask = BoxFuture<'static, anyhow::Result<()>>;

/// Runtime hook that keeps the invocation alive until a task settles
/// (`waitUntil` on Cloudflare and Fastly).
pub trait WaitUntil: Send + Sync {
    fn wait_until(&self, task: BackgroundTask);
}

/// The same hook under a different name (Vercel).
pub trait ExtendLifetime: Send + Sync {
    fn extend_lifetime(&self, task: BackgroundTask);
}

/// Lambda@Edge context: a flag telling the runtime whether to wait for the
/// event loop to drain before freezing.
#[derive(Debug)]
pub struct LambdaContext {
    callback_waits_for_empty_event_loop: AtomicBool,
}

impl LambdaContext {
    pub fn new() -> Self {
        Self {
            callback_waits_for_empty_event_loop: AtomicBool::new(true),
        }
    }

    pub fn callback_waits_for_empty_event_loop(&self) -> bool {
        self.callback_waits_for_empty_event_loop.load(Ordering::SeqCst)
    }

    pub fn set_callback_waits_for_empty_event_loop(&self, wait: bool) {
        self.callback_waits_for_empty_event_loop
            .store(wait, Ordering::SeqCst);
    }
}

impl Default for LambdaContext {
    fn default() -> Self {
        Self::new()
    }
}

/// The context object a runtime hands to the request handler.
#[derive(Clone)]
pub enum NativeContext {
    WaitUntil(Arc<dyn WaitUntil>),
    ExtendLifetime(Arc<dyn ExtendLifetime>),
    Lambda(Arc<LambdaContext>),
    /// No context object.
    None,
}

impl fmt::Debug for NativeContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::WaitUntil(_) => f.write_str("NativeContext::WaitUntil(..)"),
            Self::ExtendLifetime(_) => f.write_str("NativeContext::ExtendLifetime(..)"),
            Self::Lambda(ctx) => f.debug_tuple("NativeContext::Lambda").field(ctx).finish(),
            Self::None => f.write_str("NativeContext::None"),
        }
    }
}

/// What happened to a deferred task.
pub enum Deferred {
    /// Handed to the runtime's background hook.
    Delegated,
    /// The event-loop flag was flipped; the task is returned for the caller
    /// to await or drop.
    Returned(BackgroundTask),
    /// Spawned on the ambient tokio runtime.
    Spawned,
    /// No runtime available; queued until [`ExecutionContext::settle`].
    Queued,
}

impl fmt::Debug for Deferred {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Delegated => f.write_str("Delegated"),
            Self::Returned(_) => f.write_str("Returned(..)"),
            Self::Spawned => f.write_str("Spawned"),
            Self::Queued => f.write_str("Queued"),
        }
    }
}

enum Pending {
    Spawned(JoinHandle<()>),
    Queued(BoxFuture<'static, ()>),
}

/// One request's view of the runtime's background-work primitive.
///
/// Dispatch is by provider. When the provider has no primitive, or the
/// native context lacks it, tasks run through a fallback that catches and
/// logs failures so a background error never escapes.
pub struct ExecutionContext {
    provider: Provider,
    native: NativeContext,
    logger: StructuredLogger,
    pending: Mutex<Vec<Pending>>,
}

impl ExecutionContext {
    pub fn new(provider: Provider, native: NativeContext, logger: StructuredLogger) -> Self {
        Self {
            provider,
            native,
            logger,
            pending: Mutex::new(Vec::new()),
        }
    }

    pub fn provider(&self) -> Provider {
        self.provider
    }

    pub fn native(&self) -> &NativeContext {
        &self.native
    }

    /// Run `task` beyond the response.
    ///
    /// Completion is not guaranteed before the response is returned; the
    /// runtime's primitive governs that.
    pub fn defer_background(&self, task: BackgroundTask) -> Deferred {
        match (self.provider.context_primitive(), &self.native) {
            (ContextPrimitive::WaitUntil, NativeContext::WaitUntil(hook)) => {
                hook.wait_until(task);
                Deferred::Delegated
            }
            (ContextPrimitive::ExtendLifetime, NativeContext::ExtendLifetime(hook)) => {
                hook.extend_lifetime(task);
                Deferred::Delegated
            }
            (ContextPrimitive::EventLoopFlag, NativeContext::Lambda(ctx)) => {
                ctx.set_callback_waits_for_empty_event_loop(false);
                Deferred::Returned(task)
            }
            (ContextPrimitive::None, _) => self.fallback(task),
            (primitive, native) => {
                self.logger
                    .debug_builder("native background primitive missing, using fallback")
                    .field("expected", format!("{:?}", primitive))
                    .field("native", format!("{:?}", native))
                    .emit();
                self.fallback(task)
            }
        }
    }

    fn fallback(&self, task: BackgroundTask) -> Deferred {
        let logger = self.logger.clone();
        let guarded = async move {
            match AssertUnwindSafe(task).catch_unwind().await {
                Ok(Ok(())) => {}
                Ok(Err(e)) => logger
                    .error_builder("background task failed")
                    .field("error", format!("{:#}", e))
                    .emit(),
                Err(_) => logger.error("background task panicked"),
            }
        }
        .boxed();

        let mut pending = self.pending.lock().unwrap_or_else(PoisonError::into_inner);
        match Handle::try_current() {
            Ok(handle) => {
                pending.push(Pending::Spawned(handle.spawn(guarded)));
                Deferred::Spawned
            }
            Err(_) => {
                pending.push(Pending::Queued(guarded));
                Deferred::Queued
            }
        }
    }

    /// Number of fallback tasks not yet settled.
    pub fn pending(&self) -> usize {
        self.pending
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Await every fallback task. Returns how many were awaited.
    ///
    /// Tasks delegated to a native primitive are not tracked here.
    pub async fn settle(&self) -> usize {
        let pending: Vec<Pending> = std::mem::take(
            &mut *self.pending.lock().unwrap_or_else(PoisonError::into_inner),
        );
        let count = pending.len();
        for task in pending {
            match task {
                Pending::Spawned(handle) => {
                    if let Err(e) = handle.await {
                        self.logger
                            .error_builder("background task aborted")
                            .field("error", e.to_string())
                            .emit();
                    }
                }
                Pending::Queued(future) => future.await,
            }
        }
        count
    }
}

impl fmt::Debug for ExecutionContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExecutionContext")
            .field("provider", &self.provider)
            .field("native", &self.native)
            .field("pending", &self.pending())
            .finish()
    }
}
