//! Command payloads
//!
//! `Display` renders each command exactly as the firmware expects it on the wire.

use std::fmt;

/// Payload for `cmnd/power`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PowerCommand {
    On,
    Off,
    Toggle,
}

impl fmt::Display for PowerCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PowerCommand::On => write!(f, "on"),
            PowerCommand::Off => write!(f, "off"),
            PowerCommand::Toggle => write!(f, "toggle"),
        }
    }
}

/// Payload for `cmnd/pause`
///
/// The firmware accepts both word and numeric forms; they are kept distinct so
/// tests can exercise each spelling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PauseCommand {
    /// `true`
    Pause,
    /// `false`
    Resume,
    /// `toggle`
    Toggle,
    /// `1`
    PauseNumeric,
    /// `0`
    ResumeNumeric,
}

impl fmt::Display for PauseCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PauseCommand::Pause => write!(f, "true"),
            PauseCommand::Resume => write!(f, "false"),
            PauseCommand::Toggle => write!(f, "toggle"),
            PauseCommand::PauseNumeric => write!(f, "1"),
            PauseCommand::ResumeNumeric => write!(f, "0"),
        }
    }
}

/// An RGB triple, rendered as `R,G,B`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Rgb(pub u8, pub u8, pub u8);

impl Rgb {
    /// The JSON form used in state documents: `[R, G, B]`
    pub fn to_json(self) -> serde_json::Value {
        serde_json::json!([self.0, self.1, self.2])
    }
}

impl fmt::Display for Rgb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{},{}", self.0, self.1, self.2)
    }
}

impl From<[u8; 3]> for Rgb {
    fn from(v: [u8; 3]) -> Self {
        Rgb(v[0], v[1], v[2])
    }
}

/// Payload for `cmnd/animation` and `config/favorite_animation/set`
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AnimationCommand {
    /// Start an animation, optionally with `key=value` parameters
    Start {
        name: String,
        params: Vec<(String, String)>,
    },
    /// Start the configured favorite
    Favorite,
    /// Stop the running animation
    Stop,
}

impl AnimationCommand {
    pub fn start(name: impl Into<String>) -> Self {
        AnimationCommand::Start {
            name: name.into(),
            params: Vec::new(),
        }
    }

    /// Append a parameter. No effect on `Favorite` or `Stop`.
    pub fn param(mut self, key: impl Into<String>, value: impl fmt::Display) -> Self {
        if let AnimationCommand::Start { ref mut params, .. } = self {
            params.push((key.into(), value.to_string()));
        }
        self
    }
}

impl fmt::Display for AnimationCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AnimationCommand::Start { name, params } => {
                write!(f, "{}", name)?;
                for (i, (key, value)) in params.iter().enumerate() {
                    let sep = if i == 0 { ':' } else { ',' };
                    write!(f, "{}{}={}", sep, key, value)?;
                }
                Ok(())
            }
            AnimationCommand::Favorite => write!(f, "favorite"),
            AnimationCommand::Stop => write!(f, "stop"),
        }
    }
}

/// Writable config fields, published to `config/<field>/set`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigField {
    DefaultBrightness,
    DefaultColor,
    SunriseMinutes,
    FavoriteAnimation,
}

impl ConfigField {
    pub fn name(self) -> &'static str {
        match self {
            ConfigField::DefaultBrightness => "default_brightness",
            ConfigField::DefaultColor => "default_color",
            ConfigField::SunriseMinutes => "sunrise_minutes",
            ConfigField::FavoriteAnimation => "favorite_animation",
        }
    }

    /// Topic suffix for setting this field
    pub fn set_topic(self) -> String {
        format!("config/{}/set", self.name())
    }
}
