//! Message Capture Store
//!
//! Holds everything the harness has seen on the device topic tree since the
//! last clear: an arrival-ordered history and the latest message per topic
//! suffix. The receive task writes while the test task reads, so both
//! structures live behind a single mutex and every operation, `clear()`
//! included, is atomic with respect to the others.

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

use chrono::{DateTime, Local};
use parking_lot::Mutex;
use serde_json::Value;
use tracing::trace;


/// A message received from the broker. Immutable once captured.
#[derive(Debug, Clone, PartialEq)]
pub struct CapturedMessage {
    /// Full topic as published
    pub topic: String,
    /// Topic with the device root prefix removed
    pub suffix: String,
    /// Raw payload (lossy UTF-8)
    pub payload: String,
    /// Local arrival time
    pub timestamp: DateTime<Local>,
    /// JSON body, when the payload parses as JSON
    pub parsed_body: Option<Value>,
}

impl CapturedMessage {
    /// The parsed body if it is a JSON object
    pub fn json_object(&self) -> Option<&serde_json::Map<String, Value>> {
        self.parsed_body.as_ref().and_then(Value::as_object)
    }
}

#[derive(Default)]
struct Captured {
    history: VecDeque<Arc<CapturedMessage>>,
    last_by_suffix: HashMap<String, Arc<CapturedMessage>>,
}

/// Thread-safe capture store shared by the receive task and the test task
pub struct CaptureStore {
    /// `"<root>/"`, stripped from topics to form suffixes
    root_prefix: String,
    /// Maximum history entries (0 = unbounded)
    max_history: usize,
    inner: Mutex<Captured>,
}

impl CaptureStore {
    pub fn new(device_topic: &str, max_history: usize) -> Self {
        Self {
            root_prefix: format!("{}/", device_topic),
            max_history,
            inner: Mutex::new(Captured::default()),
        }
    }

    /// Strip the device root from a topic. Topics outside the root are kept whole.
    pub fn suffix_of<'a>(&self, topic: &'a str) -> &'a str {
        topic.strip_prefix(self.root_prefix.as_str()).unwrap_or(topic)
    }

    /// Capture an incoming message.
    ///
    /// A payload that is not JSON is stored with no parsed body; that only
    /// becomes a failure when an assertion needs structured data. The entry for
    /// the suffix is overwritten unconditionally, so an unread older message
    /// for the same suffix is gone once a newer one arrives.
    pub fn record(&self, topic: &str, payload: &[u8]) -> Arc<CapturedMessage> {
        let payload = String::from_utf8_lossy(payload).into_owned();
        let parsed_body = serde_json::from_str::<Value>(&payload).ok();
        let message = Arc::new(CapturedMessage {
            topic: topic.to_string(),
            suffix: self.suffix_of(topic).to_string(),
            payload,
            timestamp: Local::now(),
            parsed_body,
        });

        let mut inner = self.inner.lock();
        inner.history.push_back(message.clone());
        if self.max_history > 0 {
            while inner.history.len() > self.max_history {
                inner.history.pop_front();
            }
        }
        inner
            .last_by_suffix
            .insert(message.suffix.clone(), message.clone());
        drop(inner);

        trace!(topic = %message.topic, "captured message");
        message
    }

    /// Drop all captured messages.
    ///
    /// A message arriving concurrently may land on either side of the clear.
    pub fn clear(&self) {
        let mut inner = self.inner.lock();
        inner.history.clear();
        inner.last_by_suffix.clear();
    }

    /// Latest message for a suffix
    pub fn last(&self, suffix: &str) -> Option<Arc<CapturedMessage>> {
        self.inner.lock().last_by_suffix.get(suffix).cloned()
    }

    /// Every suffix seen since the last clear, sorted
    pub fn observed_suffixes(&self) -> Vec<String> {
        let mut suffixes: Vec<String> = self.inner.lock().last_by_suffix.keys().cloned().collect();
        suffixes.sort();
        suffixes
    }

    /// Snapshot of the history in arrival order
    pub fn history(&self) -> Vec<Arc<CapturedMessage>> {
        self.inner.lock().history.iter().cloned().collect()
    }

    /// The last `limit` messages in arrival order
    pub fn recent(&self, limit: usize) -> Vec<Arc<CapturedMessage>> {
        let inner = self.inner.lock();
        let skip = inner.history.len().saturating_sub(limit);
        inner.history.iter().skip(skip).cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.inner.lock().history.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.lock().history.is_empty()
    }
}
