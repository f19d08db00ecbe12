//! Reading, writing, saving and resetting device config

use serde_json::{json, Value};

use super::{field, hold, no_config, power_off};
use crate::client::{HarnessClient, TestResult};
use crate::device::{ConfigField, Rgb};
use crate::error::HarnessError;
use crate::orchestrator::SuiteFuture;
use crate::report::{self, Recorder};

/// `default_brightness` after a config reset
const FACTORY_BRIGHTNESS: u8 = 70;

pub(super) fn suite(client: HarnessClient) -> SuiteFuture {
    Box::pin(run(client))
}

async fn run(client: HarnessClient) -> Result<Vec<TestResult>, HarnessError> {
    let mut rec = Recorder::new();
    let timeout = client.config().timing.config_timeout;

    power_off(&client, &mut rec).await;

    rec.step("Request current configuration");
    match client.get_config_state(timeout).await {
        Some(config) => {
            report::config(&config, &[]);
            let fields = config.as_object().map(|obj| obj.len()).unwrap_or(0);
            rec.record(
                TestResult::pass("Config received successfully")
                    .with_values("Valid JSON config", format!("{} fields", fields)),
            );
        }
        None => rec.record(no_config("Failed to get config", "Valid JSON config")),
    }
    hold(&client, 1.0).await;

    let cool_white = Rgb(200, 220, 255);
    let updates = [
        (
            "Set default brightness to 80",
            ConfigField::DefaultBrightness,
            "80".to_string(),
            "Default brightness updated",
            json!(80),
        ),
        (
            "Set default color to cool white (200,220,255)",
            ConfigField::DefaultColor,
            cool_white.to_string(),
            "Default color updated",
            cool_white.to_json(),
        ),
        (
            "Set sunrise duration to 15 minutes",
            ConfigField::SunriseMinutes,
            "15".to_string(),
            "Sunrise duration updated",
            json!(15),
        ),
    ];
    for (description, config_field, value, check, expected) in updates {
        rec.step(description);
        client.clear_messages();
        client.set_config(config_field, value);
        hold(&client, 1.0).await;
        match client.get_config_state(timeout).await {
            Some(config) => rec.record(TestResult::check(
                check,
                expected,
                field(&config, config_field.name()),
            )),
            None => rec.record(no_config("Failed to get config", expected)),
        }
    }

    rec.step("Save configuration to NVS");
    client.clear_messages();
    client.save_config();
    hold(&client, 2.0).await;
    rec.record(TestResult::pass("Config save command sent").with_values("Saved", "Sent"));

    rec.step("Verify config was saved");
    match client.get_config_state(timeout).await {
        Some(config) => {
            report::config(
                &config,
                &["default_brightness", "default_color", "sunrise_minutes"],
            );
            let expected = json!({
                "default_brightness": 80,
                "default_color": cool_white.to_json(),
                "sunrise_minutes": 15,
            });
            let actual = json!({
                "default_brightness": field(&config, "default_brightness"),
                "default_color": field(&config, "default_color"),
                "sunrise_minutes": field(&config, "sunrise_minutes"),
            });
            rec.record(TestResult::check(
                "All config values persisted",
                expected,
                actual,
            ));
        }
        None => rec.record(no_config("Failed to verify config", Value::Null)),
    }

    rec.step("Reset configuration to defaults");
    client.clear_messages();
    client.reset_config();
    hold(&client, 2.0).await;
    match client.get_config_state(timeout).await {
        Some(config) => {
            report::config(&config, &[]);
            rec.record(TestResult::check(
                "Config reset to defaults",
                FACTORY_BRIGHTNESS,
                field(&config, "default_brightness"),
            ));
        }
        None => rec.record(no_config(
            "Failed to get config after reset",
            FACTORY_BRIGHTNESS,
        )),
    }

    Ok(rec.finish())
}
