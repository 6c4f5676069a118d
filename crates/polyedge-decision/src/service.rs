//! Hook-firing wrapper around a decision client.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use polyedge_events::{Event, EventContext, EventPipeline};
use polyedge_observability::StructuredLogger;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tokio::sync::OnceCell;

use crate::client::{Attributes, Decision, DecisionClient, DecisionContext};
use crate::error::Result;

/// Decides flags for one user, firing lifecycle events around the client.
///
/// Build one per request. The user context is created on first use and
/// decisions are memoized per flag for the lifetime of the instance.
///
/// Event payloads:
/// - `BeforeDetermineFlagsToDecide`: `{userId, attributes, flagKeys}`;
///   listeners may replace `flagKeys`.
/// - `AfterDetermineFlagsToDecide`: `{userId, flagKeys}`.
/// - `BeforeDecide`: `{userId, flagKeys}` with only the keys not yet
///   memoized. Not fired when every key is memoized.
/// - `AfterDecide`: `{userId, decisions}`; listeners may rewrite
///   `decisions`.
///
/// A rewritten value that does not deserialize is logged and the value from
/// before the event is kept.
pub struct DecisionService {
    client: Arc<dyn DecisionClient>,
    events: Arc<EventPipeline>,
    logger: StructuredLogger,
    user_id: String,
    attributes: Attributes,
    context: OnceCell<Arc<dyn DecisionContext>>,
    memo: Mutex<HashMap<String, Decision>>,
}

impl DecisionService {
    pub fn new(
        client: Arc<dyn DecisionClient>,
        events: Arc<EventPipeline>,
        logger: StructuredLogger,
        user_id: impl Into<String>,
    ) -> Self {
        Self {
            client,
            events,
            logger,
            user_id: user_id.into(),
            attributes: Attributes::new(),
            context: OnceCell::new(),
            memo: Mutex::new(HashMap::new()),
        }
    }

    pub fn with_attribute(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.attributes.insert(name.into(), value.into());
        self
    }

    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    /// Decide `flag_keys`, in the order the flag keys end up in after the
    /// `BeforeDetermineFlagsToDecide` listeners ran.
    pub async fn decide(&self, flag_keys: &[&str]) -> Result<Vec<Decision>> {
        let flag_keys = self.determine_flags(flag_keys).await?;

        let missing: Vec<String> = {
            let memo = self.memo.lock().unwrap_or_else(PoisonError::into_inner);
            let mut missing: Vec<String> = Vec::new();
            for key in &flag_keys {
                if !memo.contains_key(key) && !missing.contains(key) {
                    missing.push(key.clone());
                }
            }
            missing
        };

        if !missing.is_empty() {
            let decided = self.decide_with_client(missing).await?;
            let mut memo = self.memo.lock().unwrap_or_else(PoisonError::into_inner);
            for decision in decided {
                memo.insert(decision.flag_key.clone(), decision);
            }
        }

        let memo = self.memo.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(flag_keys
            .iter()
            .filter_map(|key| memo.get(key).cloned())
            .collect())
    }

    /// Decide a single flag. A flag the client did not answer decides to
    /// disabled.
    pub async fn decide_one(&self, flag_key: &str) -> Result<Decision> {
        Ok(self
            .decide(&[flag_key])
            .await?
            .into_iter()
            .next()
            .unwrap_or_else(|| Decision::disabled(flag_key)))
    }

    /// Number of memoized decisions.
    pub fn memoized(&self) -> usize {
        self.memo.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    async fn determine_flags(&self, flag_keys: &[&str]) -> Result<Vec<String>> {
        let mut ctx = EventContext::new()
            .with("userId", self.user_id.as_str())
            .with("attributes", Value::Object(self.attributes.clone()));
        ctx.set_as("flagKeys", &flag_keys)?;
        self.events
            .emit(Event::BeforeDetermineFlagsToDecide, &mut ctx)
            .await;

        let requested: Vec<String> = flag_keys.iter().map(|key| key.to_string()).collect();
        let flag_keys =
            self.listener_value(&ctx, Event::BeforeDetermineFlagsToDecide, "flagKeys", requested);

        let mut ctx = EventContext::new().with("userId", self.user_id.as_str());
        ctx.set_as("flagKeys", &flag_keys)?;
        self.events
            .emit(Event::AfterDetermineFlagsToDecide, &mut ctx)
            .await;
        Ok(flag_keys)
    }

    async fn decide_with_client(&self, flag_keys: Vec<String>) -> Result<Vec<Decision>> {
        let context = self
            .context
            .get_or_try_init(|| self.client.create_context(&self.user_id, &self.attributes))
            .await?;

        let mut ctx = EventContext::new().with("userId", self.user_id.as_str());
        ctx.set_as("flagKeys", &flag_keys)?;
        self.events.emit(Event::BeforeDecide, &mut ctx).await;

        let decisions = context.decide(&flag_keys).await.map_err(|e| {
            self.logger
                .error_builder("decision client failed")
                .field("error", e.to_string())
                .emit();
            e
        })?;

        let mut ctx = EventContext::new().with("userId", self.user_id.as_str());
        ctx.set_as("decisions", &decisions)?;
        self.events.emit(Event::AfterDecide, &mut ctx).await;
        let decisions = self.listener_value(&ctx, Event::AfterDecide, "decisions", decisions);

        self.logger
            .debug_builder("flags decided")
            .field("user_id", self.user_id.as_str())
            .field_i64("count", decisions.len() as i64)
            .emit();
        Ok(decisions)
    }

    fn listener_value<T: DeserializeOwned>(
        &self,
        ctx: &EventContext,
        event: Event,
        key: &str,
        fallback: T,
    ) -> T {
        let Some(value) = ctx.get(key) else {
            return fallback;
        };
        match serde_json::from_value(value.clone()) {
            Ok(rewritten) => rewritten,
            Err(e) => {
                self.logger
                    .warn_builder("listener value ignored")
                    .field("event", event.as_str())
                    .field("key", key)
                    .field("error", e.to_string())
                    .emit();
                fallback
            }
        }
    }
}

impl std::fmt::Debug for DecisionService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DecisionService")
            .field("user_id", &self.user_id)
            .field("memoized", &self.memoized())
            .finish()
    }
}
