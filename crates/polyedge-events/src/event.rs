//! The closed set of lifecycle events.

use std::fmt;
use std::str::FromStr;

use polyedge_core::PlatformError;
use serde::{Deserialize, Serialize};

/// A point in the request lifecycle listeners can attach to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Event {
    BeforeRequest,
    AfterRequest,
    BeforeResponse,
    AfterResponse,
    BeforeCreateCacheKey,
    AfterCreateCacheKey,
    BeforeCacheResponse,
    AfterCacheResponse,
    BeforeReadingCache,
    AfterReadingCache,
    BeforeDecide,
    AfterDecide,
    BeforeDetermineFlagsToDecide,
    AfterDetermineFlagsToDecide,
    BeforeReadingCookie,
    AfterReadingCookie,
    BeforeCreateCookie,
    AfterCreateCookie,
    BeforeReadingRequestConfig,
    AfterReadingRequestConfig,
    BeforeDispatchingEvents,
    AfterDispatchingEvents,
}

impl Event {
    /// Every event.
    pub const ALL: [Event; 22] = [
        Event::BeforeRequest,
        Event::AfterRequest,
        Event::BeforeResponse,
        Event::AfterResponse,
        Event::BeforeCreateCacheKey,
        Event::AfterCreateCacheKey,
        Event::BeforeCacheResponse,
        Event::AfterCacheResponse,
        Event::BeforeReadingCache,
        Event::AfterReadingCache,
        Event::BeforeDecide,
        Event::AfterDecide,
        Event::BeforeDetermineFlagsToDecide,
        Event::AfterDetermineFlagsToDecide,
        Event::BeforeReadingCookie,
        Event::AfterReadingCookie,
        Event::BeforeCreateCookie,
        Event::AfterCreateCookie,
        Event::BeforeReadingRequestConfig,
        Event::AfterReadingRequestConfig,
        Event::BeforeDispatchingEvents,
        Event::AfterDispatchingEvents,
    ];

    /// camelCase event name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::BeforeRequest => "beforeRequest",
            Self::AfterRequest => "afterRequest",
            Self::BeforeResponse => "beforeResponse",
            Self::AfterResponse => "afterResponse",
            Self::BeforeCreateCacheKey => "beforeCreateCacheKey",
            Self::AfterCreateCacheKey => "afterCreateCacheKey",
            Self::BeforeCacheResponse => "beforeCacheResponse",
            Self::AfterCacheResponse => "afterCacheResponse",
            Self::BeforeReadingCache => "beforeReadingCache",
            Self::AfterReadingCache => "afterReadingCache",
            Self::BeforeDecide => "beforeDecide",
            Self::AfterDecide => "afterDecide",
            Self::BeforeDetermineFlagsToDecide => "beforeDetermineFlagsToDecide",
            Self::AfterDetermineFlagsToDecide => "afterDetermineFlagsToDecide",
            Self::BeforeReadingCookie => "beforeReadingCookie",
            Self::AfterReadingCookie => "afterReadingCookie",
            Self::BeforeCreateCookie => "beforeCreateCookie",
            Self::AfterCreateCookie => "afterCreateCookie",
            Self::BeforeReadingRequestConfig => "beforeReadingRequestConfig",
            Self::AfterReadingRequestConfig => "afterReadingRequestConfig",
            Self::BeforeDispatchingEvents => "beforeDispatchingEvents",
            Self::AfterDispatchingEvents => "afterDispatchingEvents",
        }
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Event {
    type Err = PlatformError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|event| event.as_str() == s)
            .ok_or_else(|| PlatformError::UnknownEvent(s.to_string()))
    }
}

impl TryFrom<String> for Event {
    type Error = PlatformError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Event> for String {
    fn from(event: Event) -> Self {
        event.as_str().to_string()
    }
}
