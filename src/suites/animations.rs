//! Built-in animations and their parameters

use super::{field, hold, power_off};
use crate::client::{HarnessClient, TestResult};
use crate::device::{AnimationCommand, Rgb, STATE_JSON};
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

    start(
        &client,
        &mut rec,
        "Fire animation (intensity=80, speed=6)",
        AnimationCommand::start("fire")
            .param("intensity", 80)
            .param("speed", 6),
    )
    .await;
    hold(&client, 8.0).await;

    start(
        &client,
        &mut rec,
        "Ocean animation (speed=6)",
        AnimationCommand::start("ocean").param("speed", 6),
    )
    .await;
    hold(&client, 8.0).await;

    let pink = Rgb(255, 50, 150);
    start(
        &client,
        &mut rec,
        "Breathe animation (duration=3s, pink color)",
        AnimationCommand::start("breathe")
            .param("duration", 3)
            .param("color", pink),
    )
    .await;
    if let Some(msg) = client.wait_for_message(STATE_JSON, timeout / 2).await {
        if let Some(body) = &msg.parsed_body {
            rec.record(TestResult::check(
                "Breathe color parameters",
                pink.to_json(),
                field(body, "final_rgb"),
            ));
        }
    }
    hold(&client, 8.0).await;

    start(
        &client,
        &mut rec,
        "Rainbow animation",
        AnimationCommand::start("rainbow"),
    )
    .await;
    hold(&client, 6.0).await;

    rec.step("Stop animation");
    client.clear_messages();
    client.animation(&AnimationCommand::Stop);
    hold(&client, 1.0).await;
    rec.record(client.assert_json_field(STATE_JSON, "anim", "", timeout).await);

    Ok(rec.finish())
}

async fn start(
    client: &HarnessClient,
    rec: &mut Recorder,
    description: &str,
    command: AnimationCommand,
) {
    rec.step(description);
    client.clear_messages();
    client.animation(&command);
    hold(client, 2.0).await;

    let name = match &command {
        AnimationCommand::Start { name, .. } => name.as_str(),
        _ => "",
    };
    rec.record(
        client
            .assert_animation_running(name, client.wait_timeout())
            .await,
    );
}
