//! lampcheck - MQTT integration test harness for network-controlled lamps
//!
//! Connects to a broker as an ordinary MQTT v3.1.1 client, subscribes to the
//! whole device topic tree, drives the device with commands and asserts on
//! the JSON state it publishes back.

pub mod capture;
pub mod client;
pub mod codec;
pub mod config;
pub mod device;
pub mod error;
pub mod orchestrator;
pub mod protocol;
pub mod report;
pub mod suites;

pub use capture::{CaptureStore, CapturedMessage};
pub use client::{ConnectionStatus, FailureKind, HarnessClient, TestResult};
pub use config::HarnessConfig;
pub use error::HarnessError;
pub use orchestrator::{run_suite, run_suites, RunSummary, Suite, SuiteReport};
pub use protocol::QoS;
