//! Power, brightness and color commands

use serde_json::Value;

use super::{hold, power_off};
use crate::client::{FailureKind, HarnessClient, TestResult};
use crate::device::{PowerCommand, Rgb, STATE_JSON};
use crate::error::HarnessError;
use crate::orchestrator::SuiteFuture;
use crate::report::Recorder;

pub(super) fn suite(client: HarnessClient) -> SuiteFuture {
    Box::pin(run(client))
}

async fn run(client: HarnessClient) -> Result<Vec<TestResult>, HarnessError> {
    let mut rec = Recorder::new();
    let timeout = client.wait_timeout();

    power_off(&client, &mut rec).await;

    let power_steps = [
        ("Power ON command", PowerCommand::On, 1),
        ("Power OFF command", PowerCommand::Off, 0),
        ("Power Toggle (should turn ON)", PowerCommand::Toggle, 1),
    ];
    for (description, command, pwr) in power_steps {
        rec.step(description);
        client.clear_messages();
        client.power(command);
        hold(&client, 1.0).await;
        rec.record(client.assert_json_field(STATE_JSON, "pwr", pwr, timeout).await);
    }

    brightness(&client, &mut rec, 50).await;

    for (description, rgb) in [
        ("Set color to warm white (255,147,41)", Rgb(255, 147, 41)),
        ("Set color to blue (0,100,255)", Rgb(0, 100, 255)),
    ] {
        rec.step(description);
        client.clear_messages();
        client.color(rgb);
        hold(&client, 1.0).await;
        let outcome = match client.wait_for_message(STATE_JSON, timeout).await {
            Some(msg) => match msg.json_object() {
                Some(body) => TestResult::check(
                    "Color RGB values",
                    rgb.to_json(),
                    body.get("rgb").cloned().unwrap_or(Value::Null),
                ),
                None => TestResult::fail(FailureKind::Parse, "State message is not JSON")
                    .with_values(rgb.to_json(), msg.payload.clone()),
            },
            None => TestResult::fail(FailureKind::Timeout, "No state message received")
                .with_values(rgb.to_json(), Value::Null),
        };
        rec.record(outcome);
    }

    brightness(&client, &mut rec, 100).await;
    brightness(&client, &mut rec, 10).await;

    rec.step("Apply default settings");
    client.clear_messages();
    client.apply_defaults();
    hold(&client, 1.0).await;
    rec.record(client.assert_json_field(STATE_JSON, "pwr", 1, timeout).await);

    Ok(rec.finish())
}

async fn brightness(client: &HarnessClient, rec: &mut Recorder, percent: u8) {
    rec.step(&format!("Set brightness to {}%", percent));
    client.clear_messages();
    client.brightness(percent);
    hold(client, 1.0).await;
    rec.record(
        client
            .assert_json_field(STATE_JSON, "bri", percent, client.wait_timeout())
            .await,
    );
}
