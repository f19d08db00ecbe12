//! Simulated lamp firmware
//!
//! Mirrors the device's topic contract closely enough for the scenario
//! suites: every command answers with a `state/json` document and a
//! `config/request` answers with `config/state`.

use serde_json::{json, Value};

#[derive(Debug, Clone, PartialEq)]
pub struct LampConfig {
    pub default_brightness: u64,
    pub default_color: [u64; 3],
    pub sunrise_minutes: u64,
    pub favorite_animation: String,
    pub favorite_params: Vec<u64>,
}

impl Default for LampConfig {
    fn default() -> Self {
        Self {
            default_brightness: 70,
            default_color: [255, 147, 41],
            sunrise_minutes: 30,
            favorite_animation: "fire".to_string(),
            favorite_params: vec![70, 5, 0],
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct LampSim {
    pub pwr: u64,
    pub bri: u64,
    pub rgb: [u64; 3],
    pub anim: String,
    pub pause: u64,
    pub final_rgb: Option<[u64; 3]>,
    pub config: LampConfig,
    pub saved: LampConfig,
}

impl LampSim {
    /// Apply one message; returns `(subtopic, payload)` responses
    pub fn handle(
        &mut self,
        subtopic: &str,
        payload: &str,
        answer_config: bool,
    ) -> Vec<(String, String)> {
        match subtopic {
            "cmnd/power" => {
                self.pwr = match payload {
                    "on" => 1,
                    "off" => 0,
                    "toggle" => 1 - self.pwr,
                    _ => return Vec::new(),
                };
            }
            "cmnd/brightness" => match payload.parse::<u64>() {
                Ok(bri) if bri <= 100 => {
                    self.bri = bri;
                    self.pwr = 1;
                }
                _ => return Vec::new(),
            },
            "cmnd/color" => match parse_rgb(payload) {
                Some(rgb) => {
                    self.rgb = rgb;
                    self.anim.clear();
                }
                None => return Vec::new(),
            },
            "cmnd/animation" => self.animation(payload),
            "cmnd/pause" => {
                self.pause = match payload {
                    "true" | "1" => 1,
                    "false" | "0" => 0,
                    "toggle" => 1 - self.pause,
                    _ => return Vec::new(),
                };
            }
            "cmnd/apply_defaults" => {
                self.pwr = 1;
                self.bri = self.config.default_brightness;
                self.rgb = self.config.default_color;
            }
            "config/default_brightness/set" => {
                if let Ok(v) = payload.parse() {
                    self.config.default_brightness = v;
                }
                return Vec::new();
            }
            "config/default_color/set" => {
                if let Some(rgb) = parse_rgb(payload) {
                    self.config.default_color = rgb;
                }
                return Vec::new();
            }
            "config/sunrise_minutes/set" => {
                if let Ok(v) = payload.parse() {
                    self.config.sunrise_minutes = v;
                }
                return Vec::new();
            }
            "config/favorite_animation/set" => {
                let (name, params) = split_animation(payload);
                self.config.favorite_animation = name.to_string();
                self.config.favorite_params = favorite_params(name, &params);
                return Vec::new();
            }
            "config/save" => {
                self.saved = self.config.clone();
                return Vec::new();
            }
            "config/reset" => {
                self.config = LampConfig::default();
                return Vec::new();
            }
            "config/request" if answer_config => {
                return vec![("config/state".to_string(), self.config_json().to_string())];
            }
            _ => return Vec::new(),
        }
        vec![("state/json".to_string(), self.state_json().to_string())]
    }

    fn animation(&mut self, payload: &str) {
        match payload {
            "stop" => {
                self.anim.clear();
                self.final_rgb = None;
            }
            "favorite" => {
                self.anim = self.config.favorite_animation.clone();
                self.pwr = 1;
            }
            _ => {
                let (name, params) = split_animation(payload);
                self.anim = name.to_string();
                self.pwr = 1;
                self.final_rgb = params
                    .iter()
                    .find(|(key, _)| *key == "color")
                    .and_then(|(_, value)| parse_rgb(value));
            }
        }
    }

    pub fn state_json(&self) -> Value {
        let mut state = json!({
            "pwr": self.pwr,
            "bri": self.bri,
            "rgb": self.rgb,
            "anim": self.anim,
            "pause": self.pause,
        });
        if let Some(final_rgb) = self.final_rgb {
            state["final_rgb"] = json!(final_rgb);
        }
        state
    }

    pub fn config_json(&self) -> Value {
        json!({
            "default_brightness": self.config.default_brightness,
            "default_color": self.config.default_color,
            "sunrise_minutes": self.config.sunrise_minutes,
            "favorite_animation": self.config.favorite_animation,
            "favorite_params": self.config.favorite_params,
        })
    }
}

fn parse_rgb(value: &str) -> Option<[u64; 3]> {
    let parts: Vec<u64> = value
        .split(',')
        .map(|p| p.trim().parse().ok())
        .collect::<Option<_>>()?;
    match parts[..] {
        [r, g, b] if r <= 255 && g <= 255 && b <= 255 => Some([r, g, b]),
        _ => None,
    }
}

/// Split `name:k=v,k=v` into the name and its parameters. A `color` value
/// swallows the two bare numbers that follow it.
fn split_animation(payload: &str) -> (&str, Vec<(&str, String)>) {
    let Some((name, rest)) = payload.split_once(':') else {
        return (payload, Vec::new());
    };
    let mut params: Vec<(&str, String)> = Vec::new();
    for part in rest.split(',') {
        match part.split_once('=') {
            Some((key, value)) => params.push((key, value.to_string())),
            None => {
                if let Some((_, value)) = params.last_mut() {
                    value.push(',');
                    value.push_str(part);
                }
            }
        }
    }
    (name, params)
}

fn favorite_params(name: &str, params: &[(&str, String)]) -> Vec<u64> {
    let get = |key: &str| {
        params
            .iter()
            .find(|(k, _)| *k == key)
            .and_then(|(_, v)| v.parse::<u64>().ok())
            .unwrap_or(0)
    };
    match name {
        "ocean" => vec![get("brightness"), get("speed")],
        "fire" => vec![get("intensity"), get("speed")],
        _ => Vec::new(),
    }
}
