//! Wait/assert engine
//!
//! Waits are level-triggered: they poll the capture store for the latest
//! message on a suffix and succeed as soon as one is present, including one
//! that arrived before the wait began. Clear the store first to wait for a
//! fresh message.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use serde_json::Value;
use tokio::time::Instant;
use tracing::{debug, warn};

use super::HarnessClient;
use crate::capture::CapturedMessage;
use crate::device::{
    ConfigState, DeviceState, CONFIG_REQUEST, CONFIG_STATE, STATE_JSON, TRIGGER_PAYLOAD,
};

/// Payloads longer than this are cut in diagnostics
const PAYLOAD_PREVIEW_CHARS: usize = 100;

/// Why a result failed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// Could not connect to the broker
    Connection,
    /// No message arrived in time
    Timeout,
    /// The message was not a JSON object
    Parse,
    /// The value differed from the expected one
    Mismatch,
    /// The test body errored or panicked
    Fault,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureKind::Connection => write!(f, "connection"),
            FailureKind::Timeout => write!(f, "timeout"),
            FailureKind::Parse => write!(f, "parse"),
            FailureKind::Mismatch => write!(f, "mismatch"),
            FailureKind::Fault => write!(f, "fault"),
        }
    }
}

/// Outcome of one check
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TestResult {
    pub passed: bool,
    pub message: String,
    pub expected: Value,
    pub actual: Value,
    /// Set on every failing result
    pub failure: Option<FailureKind>,
}

impl TestResult {
    pub fn pass(message: impl Into<String>) -> Self {
        Self {
            passed: true,
            message: message.into(),
            expected: Value::Null,
            actual: Value::Null,
            failure: None,
        }
    }

    pub fn fail(kind: FailureKind, message: impl Into<String>) -> Self {
        Self {
            passed: false,
            message: message.into(),
            expected: Value::Null,
            actual: Value::Null,
            failure: Some(kind),
        }
    }

    /// Compare two values; a difference is a `Mismatch`.
    pub fn check(
        message: impl Into<String>,
        expected: impl Into<Value>,
        actual: impl Into<Value>,
    ) -> Self {
        let expected = expected.into();
        let actual = actual.into();
        let passed = values_equal(&expected, &actual);
        Self {
            passed,
            message: message.into(),
            expected,
            actual,
            failure: (!passed).then_some(FailureKind::Mismatch),
        }
    }

    pub fn with_values(mut self, expected: impl Into<Value>, actual: impl Into<Value>) -> Self {
        self.expected = expected.into();
        self.actual = actual.into();
        self
    }
}

/// JSON equality without cross-type coercion, except that numbers compare
/// by value: `1 == 1.0`, but `1 != "1"` and `1 != true`.
pub fn values_equal(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => {
            if let (Some(x), Some(y)) = (x.as_i64(), y.as_i64()) {
                x == y
            } else if let (Some(x), Some(y)) = (x.as_u64(), y.as_u64()) {
                x == y
            } else {
                x.as_f64() == y.as_f64()
            }
        }
        (Value::Array(x), Value::Array(y)) => {
            x.len() == y.len() && x.iter().zip(y).all(|(x, y)| values_equal(x, y))
        }
        (Value::Object(x), Value::Object(y)) => {
            x.len() == y.len()
                && x.iter()
                    .all(|(key, x)| y.get(key).is_some_and(|y| values_equal(x, y)))
        }
        _ => a == b,
    }
}

fn preview(payload: &str) -> String {
    payload.chars().take(PAYLOAD_PREVIEW_CHARS).collect()
}

impl HarnessClient {
    /// Poll for the latest message on `suffix` until `timeout` has elapsed
    pub async fn wait_for_message(
        &self,
        suffix: &str,
        timeout: Duration,
    ) -> Option<Arc<CapturedMessage>> {
        let poll_interval = self.config().timing.poll_interval;
        let deadline = Instant::now() + timeout;

        loop {
            if let Some(msg) = self.store().last(suffix) {
                return Some(msg);
            }
            let now = Instant::now();
            if now >= deadline {
                debug!("No message on {} after {:?}", suffix, timeout);
                return None;
            }
            tokio::time::sleep(poll_interval.min(deadline - now)).await;
        }
    }

    /// Wait for a JSON object on `suffix` and compare one of its fields
    pub async fn assert_json_field(
        &self,
        suffix: &str,
        field: &str,
        expected: impl Into<Value>,
        timeout: Duration,
    ) -> TestResult {
        let expected = expected.into();

        let Some(msg) = self.wait_for_message(suffix, timeout).await else {
            let observed = self.observed_suffixes();
            let mut message = format!("No message received on {}", suffix);
            if !observed.is_empty() {
                message.push_str(&format!(". Topics available: {}", observed.join(", ")));
            }
            return TestResult::fail(FailureKind::Timeout, message)
                .with_values(expected, Value::Null);
        };

        let Some(body) = msg.json_object() else {
            return TestResult::fail(
                FailureKind::Parse,
                format!("Message is not JSON: {}", msg.payload),
            )
            .with_values(expected, msg.payload.clone());
        };

        let actual = body.get(field).cloned().unwrap_or(Value::Null);
        let mut message = format!("{}.{}", suffix, field);
        if !values_equal(&expected, &actual) {
            message.push_str(&format!(". Full message: {}", msg.payload));
        }
        TestResult::check(message, expected, actual)
    }

    /// Check that `state/json` reports `name` as the running animation
    pub async fn assert_animation_running(&self, name: &str, timeout: Duration) -> TestResult {
        self.assert_json_field(STATE_JSON, "anim", name, timeout).await
    }

    /// Request the device config and return the `config/state` body.
    ///
    /// Clears the store first. On timeout, logs what did arrive.
    pub async fn get_config_state(&self, timeout: Duration) -> Option<Value> {
        self.clear_messages();
        self.publish(CONFIG_REQUEST, TRIGGER_PAYLOAD);
        tokio::time::sleep(self.config().timing.settle_delay).await;

        let Some(msg) = self.wait_for_message(CONFIG_STATE, timeout).await else {
            warn!("No '{}' response received", CONFIG_STATE);
            warn!("Topics received during wait: {:?}", self.observed_suffixes());
            for recent in self.recent_messages(self.config().capture.recent_window) {
                warn!("  - {}: {}", recent.suffix, preview(&recent.payload));
            }
            return None;
        };

        if msg.json_object().is_none() {
            warn!(
                "'{}' payload is not a JSON object: {}",
                CONFIG_STATE,
                preview(&msg.payload)
            );
            return None;
        }
        msg.parsed_body.clone()
    }

    /// `get_config_state` decoded into a [`ConfigState`]
    pub async fn config_snapshot(&self, timeout: Duration) -> Option<ConfigState> {
        let body = self.get_config_state(timeout).await?;
        ConfigState::from_value(&body)
    }

    /// Latest `state/json`, decoded into a [`DeviceState`]
    pub async fn state_snapshot(&self, timeout: Duration) -> Option<DeviceState> {
        let msg = self.wait_for_message(STATE_JSON, timeout).await?;
        DeviceState::from_value(msg.parsed_body.as_ref()?)
    }
}
