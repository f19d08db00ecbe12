//! The configurable favorite animation

use serde_json::Value;

use super::{field, hold, no_config, power_off};
use crate::client::{HarnessClient, TestResult};
use crate::device::{AnimationCommand, ConfigField, ConfigState};
use crate::error::HarnessError;
use crate::orchestrator::SuiteFuture;
use crate::report::{self, Recorder};

pub(super) fn suite(client: HarnessClient) -> SuiteFuture {
    Box::pin(run(client))
}

async fn run(client: HarnessClient) -> Result<Vec<TestResult>, HarnessError> {
    let mut rec = Recorder::new();
    let timeout = client.config().timing.config_timeout;

    power_off(&client, &mut rec).await;

    rec.step("Request config to see default favorite animation");
    match client.get_config_state(timeout).await {
        Some(config) => {
            report::config(&config, &["favorite_animation", "favorite_params"]);
            let present = config.get("favorite_animation").is_some();
            let keys: Vec<Value> = config
                .as_object()
                .map(|obj| obj.keys().cloned().map(Value::from).collect())
                .unwrap_or_default();
            let check = TestResult::check("Config contains favorite_animation field", true, present);
            rec.record(check.with_values("'favorite_animation' field present", keys));

            if present {
                rec.record(TestResult::check(
                    "Default favorite is 'fire'",
                    "fire",
                    field(&config, "favorite_animation"),
                ));
                rec.record(TestResult::check(
                    "Default fire intensity is 70",
                    70,
                    first_param(&config),
                ));
            }
        }
        None => rec.record(no_config("Failed to get config", Value::Null)),
    }
    hold(&client, 1.0).await;

    start_favorite(
        &client,
        &mut rec,
        "Start favorite animation (should trigger fire)",
        "fire",
    )
    .await;
    hold(&client, 4.0).await;

    rec.step("Change favorite animation to rainbow");
    client.clear_messages();
    client.set_config(
        ConfigField::FavoriteAnimation,
        AnimationCommand::start("rainbow"),
    );
    hold(&client, 1.0).await;

    rec.step("Verify config shows rainbow as favorite");
    match client.get_config_state(timeout).await {
        Some(config) => {
            report::config(&config, &["favorite_animation"]);
            rec.record(TestResult::check(
                "Favorite changed to 'rainbow'",
                "rainbow",
                field(&config, "favorite_animation"),
            ));
        }
        None => rec.record(no_config("Failed to get config", "rainbow")),
    }
    hold(&client, 1.0).await;

    rec.step("Save config to NVS flash");
    client.save_config();
    hold(&client, 2.0).await;

    start_favorite(
        &client,
        &mut rec,
        "Start favorite animation (should now trigger rainbow)",
        "rainbow",
    )
    .await;
    hold(&client, 5.0).await;

    rec.step("Change favorite to ocean with custom params (speed=8, brightness=50)");
    client.clear_messages();
    client.set_config(
        ConfigField::FavoriteAnimation,
        AnimationCommand::start("ocean")
            .param("speed", 8)
            .param("brightness", 50),
    );
    hold(&client, 1.0).await;

    rec.step("Verify config shows ocean with parameters");
    match client.get_config_state(timeout).await {
        Some(config) => {
            report::config(&config, &["favorite_animation", "favorite_params"]);
            rec.record(TestResult::check(
                "Favorite changed to 'ocean'",
                "ocean",
                field(&config, "favorite_animation"),
            ));

            // Ocean stores brightness first, then speed
            if let Some(state) = ConfigState::from_value(&config) {
                if let &[brightness, speed, ..] = state.favorite_params.as_slice() {
                    rec.record(TestResult::check("Ocean brightness parameter", 50, brightness));
                    rec.record(TestResult::check("Ocean speed parameter", 8, speed));
                }
            }
        }
        None => rec.record(no_config("Failed to get config", "ocean")),
    }
    hold(&client, 1.0).await;

    rec.step("Save config");
    client.save_config();
    hold(&client, 2.0).await;

    start_favorite(
        &client,
        &mut rec,
        "Start favorite animation (should trigger ocean)",
        "ocean",
    )
    .await;
    hold(&client, 4.0).await;

    Ok(rec.finish())
}

async fn start_favorite(
    client: &HarnessClient,
    rec: &mut Recorder,
    description: &str,
    expected: &str,
) {
    rec.step(description);
    client.clear_messages();
    client.animation(&AnimationCommand::Favorite);
    hold(client, 2.0).await;
    rec.record(
        client
            .assert_animation_running(expected, client.wait_timeout())
            .await,
    );
}

fn first_param(config: &Value) -> Value {
    config
        .get("favorite_params")
        .and_then(Value::as_array)
        .and_then(|params| params.first())
        .cloned()
        .unwrap_or(Value::Null)
}
