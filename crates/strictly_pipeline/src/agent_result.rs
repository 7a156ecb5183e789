//! The uniform envelope every stage returns.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Duration;

/// Outcome of one stage invocation.
///
/// A failed result may still carry partial data, which the coordinator is
/// free to ignore.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentResult<T> {
    data: Option<T>,
    success: bool,
    error: Option<String>,
    elapsed_ms: u64,
    timestamp: DateTime<Utc>,
    #[serde(default)]
    metadata: BTreeMap<String, serde_json::Value>,
}

impl<T> AgentResult<T> {
    /// A successful result.
    pub fn ok(data: T, elapsed: Duration) -> Self {
        Self {
            data: Some(data),
            success: true,
            error: None,
            elapsed_ms: duration_ms(elapsed),
            timestamp: Utc::now(),
            metadata: BTreeMap::new(),
        }
    }

    /// A failed result, optionally carrying partial data.
    pub fn failed(error: impl Into<String>, partial: Option<T>, elapsed: Duration) -> Self {
        Self {
            data: partial,
            success: false,
            error: Some(error.into()),
            elapsed_ms: duration_ms(elapsed),
            timestamp: Utc::now(),
            metadata: BTreeMap::new(),
        }
    }

    /// Attaches a metadata entry.
    pub fn with_metadata(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.metadata.insert(key.into(), value);
        self
    }

    /// Whether the stage produced a usable answer.
    pub fn is_success(&self) -> bool {
        self.success && self.data.is_some()
    }

    /// The payload, if any.
    pub fn data(&self) -> Option<&T> {
        self.data.as_ref()
    }

    /// Consumes the result, returning the payload.
    pub fn into_data(self) -> Option<T> {
        self.data
    }

    /// Failure description.
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// Time the stage spent.
    pub fn elapsed(&self) -> Duration {
        Duration::from_millis(self.elapsed_ms)
    }

    /// When the result was produced.
    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    /// Stage annotations such as model usage.
    pub fn metadata(&self) -> &BTreeMap<String, serde_json::Value> {
        &self.metadata
    }

    /// Boolean metadata flag; absent reads as false.
    pub fn flag(&self, key: &str) -> bool {
        self.metadata
            .get(key)
            .and_then(serde_json::Value::as_bool)
            .unwrap_or(false)
    }
}

pub(crate) fn duration_ms(elapsed: Duration) -> u64 {
    u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX)
}
