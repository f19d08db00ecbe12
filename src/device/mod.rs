//! Device Topic Vocabulary
//!
//! Topic suffixes, command payloads and state documents of the lamp firmware.
//! Suffixes are relative to the configured device topic root.

mod command;
mod state;


pub use command::{AnimationCommand, ConfigField, PauseCommand, PowerCommand, Rgb};
pub use state::{ConfigState, DeviceState};

/// Power command topic
pub const CMND_POWER: &str = "cmnd/power";
/// Brightness command topic (integer percent)
pub const CMND_BRIGHTNESS: &str = "cmnd/brightness";
/// Color command topic (`R,G,B`)
pub const CMND_COLOR: &str = "cmnd/color";
/// Animation command topic
pub const CMND_ANIMATION: &str = "cmnd/animation";
/// Pause command topic
pub const CMND_PAUSE: &str = "cmnd/pause";
/// Apply the configured power-on defaults
pub const CMND_APPLY_DEFAULTS: &str = "cmnd/apply_defaults";

/// Persist the current config to flash
pub const CONFIG_SAVE: &str = "config/save";
/// Restore built-in config defaults
pub const CONFIG_RESET: &str = "config/reset";
/// Ask the device to publish its config
pub const CONFIG_REQUEST: &str = "config/request";

/// Device state document
pub const STATE_JSON: &str = "state/json";
/// Device config document, published in reply to a config request
pub const CONFIG_STATE: &str = "config/state";

/// Payload sent with save/reset/request config commands
pub const TRIGGER_PAYLOAD: &str = "1";
