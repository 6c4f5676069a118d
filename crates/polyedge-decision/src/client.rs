//! Decision client contract.
//!
//! The decision engine itself lives outside this workspace; these traits are
//! the surface the hooks are fired around.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::Result;

/// User attributes passed to the client.
pub type Attributes = Map<String, Value>;

/// The outcome for one flag.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Decision {
    pub flag_key: String,
    pub variation_key: Option<String>,
    pub enabled: bool,
    #[serde(default)]
    pub variables: Map<String, Value>,
    pub rule_key: Option<String>,
    #[serde(default)]
    pub reasons: Vec<String>,
}

impl Decision {
    /// A decision with the flag off and no variation.
    pub fn disabled(flag_key: impl Into<String>) -> Self {
        Self {
            flag_key: flag_key.into(),
            variation_key: None,
            enabled: false,
            variables: Map::new(),
            rule_key: None,
            reasons: Vec::new(),
        }
    }

    /// A decision with the flag on for `variation_key`.
    pub fn enabled(flag_key: impl Into<String>, variation_key: impl Into<String>) -> Self {
        Self {
            variation_key: Some(variation_key.into()),
            enabled: true,
            ..Self::disabled(flag_key)
        }
    }

    pub fn with_variable(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.variables.insert(name.into(), value.into());
        self
    }

    pub fn with_rule(mut self, rule_key: impl Into<String>) -> Self {
        self.rule_key = Some(rule_key.into());
        self
    }

    pub fn with_reason(mut self, reason: impl Into<String>) -> Self {
        self.reasons.push(reason.into());
        self
    }
}

/// Entry point of a decision engine.
#[async_trait]
pub trait DecisionClient: Send + Sync {
    /// Build the evaluation context for one user.
    async fn create_context(
        &self,
        user_id: &str,
        attributes: &Attributes,
    ) -> Result<Arc<dyn DecisionContext>>;
}

/// A user's evaluation context.
#[async_trait]
pub trait DecisionContext: Send + Sync {
    fn user_id(&self) -> &str;

    /// Decide every flag in `flag_keys`, one decision per key.
    async fn decide(&self, flag_keys: &[String]) -> Result<Vec<Decision>>;
}

/// Client answering from a fixed table. Unknown flags decide to disabled.
///
/// Intended for development and tests.
#[derive(Debug, Clone, Default)]
pub struct StaticDecisionClient {
    inner: Arc<StaticTable>,
}

#[derive(Debug, Default)]
struct StaticTable {
    decisions: HashMap<String, Decision>,
    decide_calls: AtomicUsize,
}

impl StaticDecisionClient {
    pub fn new(decisions: impl IntoIterator<Item = Decision>) -> Self {
        let decisions = decisions
            .into_iter()
            .map(|d| (d.flag_key.clone(), d))
            .collect();
        Self {
            inner: Arc::new(StaticTable {
                decisions,
                decide_calls: AtomicUsize::new(0),
            }),
        }
    }

    /// How many times any context of this client decided.
    pub fn decide_calls(&self) -> usize {
        self.inner.decide_calls.load(Ordering::SeqCst)
    }
}

struct StaticContext {
    user_id: String,
    table: Arc<StaticTable>,
}

#[async_trait]
impl DecisionClient for StaticDecisionClient {
    async fn create_context(
        &self,
        user_id: &str,
        _attributes: &Attributes,
    ) -> Result<Arc<dyn DecisionContext>> {
        Ok(Arc::new(StaticContext {
            user_id: user_id.to_string(),
            table: Arc::clone(&self.inner),
        }))
    }
}

#[async_trait]
impl DecisionContext for StaticContext {
    fn user_id(&self) -> &str {
        &self.user_id
    }

    async fn decide(&self, flag_keys: &[String]) -> Result<Vec<Decision>> {
        self.table.decide_calls.fetch_add(1, Ordering::SeqCst);
        Ok(flag_keys
            .iter()
            .map(|key| {
                self.table
                    .decisions
                    .get(key)
                    .cloned()
                    .unwrap_or_else(|| Decision::disabled(key).with_reason("flag not found"))
            })
            .collect())
    }
}
