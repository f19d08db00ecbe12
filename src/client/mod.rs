//! Harness Client
//!
//! One client per device session. It owns the broker connection and the
//! capture store that the connection feeds, and exposes the command helpers
//! and the wait/assert engine used by test bodies.
//!
//! The client is cheap to clone. Dropping the last clone aborts a session
//! that was never disconnected.

mod assert;
mod connection;


use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;

use crate::capture::{CaptureStore, CapturedMessage};
use crate::config::HarnessConfig;
use crate::device::{
    AnimationCommand, ConfigField, PauseCommand, PowerCommand, Rgb, CMND_ANIMATION,
    CMND_APPLY_DEFAULTS, CMND_BRIGHTNESS, CMND_COLOR, CMND_PAUSE, CMND_POWER, CONFIG_RESET,
    CONFIG_SAVE, TRIGGER_PAYLOAD,
};

pub use assert::{values_equal, FailureKind, TestResult};
pub use connection::ConnectionStatus;

use connection::Connection;

struct ClientInner {
    config: HarnessConfig,
    store: Arc<CaptureStore>,
    connection: Connection,
}

/// MQTT client bound to one device topic root
#[derive(Clone)]
pub struct HarnessClient {
    inner: Arc<ClientInner>,
}

impl HarnessClient {
    pub fn new(config: HarnessConfig) -> Self {
        let root = config.device.topic.clone();
        let store = Arc::new(CaptureStore::new(&root, config.capture.max_history));
        let connection = Connection::new(
            config.broker.clone(),
            root,
            config.timing.poll_interval,
            store.clone(),
        );

        Self {
            inner: Arc::new(ClientInner {
                config,
                store,
                connection,
            }),
        }
    }

    pub fn config(&self) -> &HarnessConfig {
        &self.inner.config
    }

    pub fn store(&self) -> &CaptureStore {
        &self.inner.store
    }

    /// Connect and subscribe to the device tree. Never errors; see logs on `false`.
    pub async fn connect(&self) -> bool {
        self.inner.connection.connect().await
    }

    pub async fn disconnect(&self) {
        self.inner.connection.disconnect().await
    }

    pub fn is_connected(&self) -> bool {
        self.inner.connection.is_connected()
    }

    pub fn status(&self) -> ConnectionStatus {
        self.inner.connection.status()
    }

    /// Publish `payload` to `<root>/<subtopic>` at QoS 0
    pub fn publish(&self, subtopic: &str, payload: impl AsRef<[u8]>) {
        self.inner
            .connection
            .publish(subtopic, Bytes::copy_from_slice(payload.as_ref()))
    }

    pub fn power(&self, command: PowerCommand) {
        self.publish(CMND_POWER, command.to_string())
    }

    pub fn brightness(&self, percent: u8) {
        self.publish(CMND_BRIGHTNESS, percent.to_string())
    }

    pub fn color(&self, rgb: Rgb) {
        self.publish(CMND_COLOR, rgb.to_string())
    }

    pub fn animation(&self, command: &AnimationCommand) {
        self.publish(CMND_ANIMATION, command.to_string())
    }

    pub fn pause(&self, command: PauseCommand) {
        self.publish(CMND_PAUSE, command.to_string())
    }

    pub fn apply_defaults(&self) {
        self.publish(CMND_APPLY_DEFAULTS, TRIGGER_PAYLOAD)
    }

    pub fn set_config(&self, field: ConfigField, value: impl std::fmt::Display) {
        self.publish(&field.set_topic(), value.to_string())
    }

    pub fn save_config(&self) {
        self.publish(CONFIG_SAVE, TRIGGER_PAYLOAD)
    }

    pub fn reset_config(&self) {
        self.publish(CONFIG_RESET, TRIGGER_PAYLOAD)
    }

    pub fn clear_messages(&self) {
        self.inner.store.clear()
    }

    pub fn observed_suffixes(&self) -> Vec<String> {
        self.inner.store.observed_suffixes()
    }

    pub fn recent_messages(&self, limit: usize) -> Vec<Arc<CapturedMessage>> {
        self.inner.store.recent(limit)
    }

    /// Sleep for the configured delay between a command and its assertion
    pub async fn settle(&self) {
        tokio::time::sleep(self.inner.config.timing.command_delay).await
    }

    /// Default timeout for waits and assertions
    pub fn wait_timeout(&self) -> Duration {
        self.inner.config.timing.wait_timeout
    }
}
