//! Device scenarios
//!
//! Each suite drives the lamp through a fixed sequence of commands and checks
//! the state it reports back. Every delay is a multiple of
//! `timing.command_delay`, so the same scenarios run against real hardware
//! (1s) or a simulated device (a few milliseconds).

mod animations;
mod basic;
mod configuration;
mod favorite;
mod pause;


use serde_json::Value;

use crate::client::{FailureKind, HarnessClient, TestResult};
use crate::device::PowerCommand;
use crate::orchestrator::Suite;
use crate::report::Recorder;

/// All suites, in run order
pub fn all() -> Vec<Suite> {
    vec![
        Suite {
            name: "basic",
            title: "Basic MQTT Commands Test",
            run: basic::suite,
        },
        Suite {
            name: "configuration",
            title: "Configuration Management Test",
            run: configuration::suite,
        },
        Suite {
            name: "animations",
            title: "Animation Test Suite",
            run: animations::suite,
        },
        Suite {
            name: "pause",
            title: "Animation Pause/Play Test",
            run: pause::suite,
        },
        Suite {
            name: "favorite",
            title: "Favorite Animation Feature Test",
            run: favorite::suite,
        },
    ]
}

/// Look up a suite by its short name
pub fn find(name: &str) -> Option<Suite> {
    all().into_iter().find(|suite| suite.name == name)
}

/// Sleep for `factor` command delays
async fn hold(client: &HarnessClient, factor: f32) {
    tokio::time::sleep(client.config().timing.command_delay.mul_f32(factor)).await
}

/// Step 0 of every scenario: power the lamp off and let it settle
async fn power_off(client: &HarnessClient, rec: &mut Recorder) {
    rec.step("Resetting state (power off)");
    client.clear_messages();
    client.power(PowerCommand::Off);
    hold(client, 1.5).await;
}

/// A field of a JSON document, `null` when absent
fn field(body: &Value, name: &str) -> Value {
    body.get(name).cloned().unwrap_or(Value::Null)
}

fn no_config(message: &str, expected: impl Into<Value>) -> TestResult {
    TestResult::fail(FailureKind::Timeout, message).with_values(expected, Value::Null)
}
