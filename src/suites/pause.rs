//! Pausing and resuming a running animation

use super::{hold, power_off};
use crate::client::{HarnessClient, TestResult};
use crate::device::{AnimationCommand, PauseCommand, STATE_JSON};
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

    rec.step("Starting rainbow animation for testing");
    client.animation(&AnimationCommand::start("rainbow"));
    hold(&client, 2.0).await;
    rec.record(client.assert_animation_running("rainbow", timeout).await);

    let steps = [
        ("Pause the animation", PauseCommand::Pause, 1, 2.0),
        ("Unpause the animation", PauseCommand::Resume, 0, 2.0),
        ("Toggle pause (should pause)", PauseCommand::Toggle, 1, 2.0),
        ("Toggle pause again (should unpause)", PauseCommand::Toggle, 0, 2.0),
        ("Pause with \"1\"", PauseCommand::PauseNumeric, 1, 1.0),
        ("Unpause with \"0\"", PauseCommand::ResumeNumeric, 0, 0.0),
    ];
    for (description, command, paused, dwell) in steps {
        rec.step(description);
        client.clear_messages();
        client.pause(command);
        hold(&client, 1.0).await;
        rec.record(client.assert_json_field(STATE_JSON, "pause", paused, timeout).await);
        hold(&client, dwell).await;
    }

    client.animation(&AnimationCommand::Stop);
    hold(&client, 1.0).await;

    Ok(rec.finish())
}
