//! Typed views of the device's JSON documents
//!
//! Every field is optional on the wire. A missing or mistyped field decodes
//! to its documented default instead of failing the whole document.

use serde_json::Value;

use super::Rgb;

/// `state/json`
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct DeviceState {
    /// Power, 0 or 1 (default 0)
    pub pwr: u8,
    /// Brightness percent (default 0)
    pub bri: u8,
    /// Current color (default none)
    pub rgb: Option<[u8; 3]>,
    /// Running animation, empty when stopped (default "")
    pub anim: String,
    /// Pause flag, 0 or 1 (default 0)
    pub pause: u8,
    /// Target color of transition animations (default none)
    pub final_rgb: Option<[u8; 3]>,
}

impl DeviceState {
    /// Decode from a parsed body. Returns `None` if the body is not an object.
    pub fn from_value(body: &Value) -> Option<Self> {
        let obj = body.as_object()?;
        Some(Self {
            pwr: field_u8(obj.get("pwr")).unwrap_or(0),
            bri: field_u8(obj.get("bri")).unwrap_or(0),
            rgb: field_rgb(obj.get("rgb")),
            anim: obj
                .get("anim")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string(),
            pause: field_u8(obj.get("pause")).unwrap_or(0),
            final_rgb: field_rgb(obj.get("final_rgb")),
        })
    }

    pub fn is_on(&self) -> bool {
        self.pwr == 1
    }

    pub fn is_paused(&self) -> bool {
        self.pause == 1
    }

    pub fn color(&self) -> Option<Rgb> {
        self.rgb.map(Rgb::from)
    }
}

/// `config/state`
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ConfigState {
    /// Brightness applied at power-on (default none)
    pub default_brightness: Option<u8>,
    /// Color applied at power-on (default none)
    pub default_color: Option<[u8; 3]>,
    /// Sunrise animation length in minutes (default none)
    pub sunrise_minutes: Option<u16>,
    /// Favorite animation name (default "")
    pub favorite_animation: String,
    /// Favorite animation parameters; positional meaning depends on the animation (default empty)
    pub favorite_params: Vec<i64>,
}

impl ConfigState {
    /// Decode from a parsed body. Returns `None` if the body is not an object.
    pub fn from_value(body: &Value) -> Option<Self> {
        let obj = body.as_object()?;
        Some(Self {
            default_brightness: field_u8(obj.get("default_brightness")),
            default_color: field_rgb(obj.get("default_color")),
            sunrise_minutes: obj
                .get("sunrise_minutes")
                .and_then(Value::as_u64)
                .and_then(|v| u16::try_from(v).ok()),
            favorite_animation: obj
                .get("favorite_animation")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string(),
            favorite_params: obj
                .get("favorite_params")
                .and_then(Value::as_array)
                .map(|items| items.iter().filter_map(Value::as_i64).collect())
                .unwrap_or_default(),
        })
    }
}

fn field_u8(value: Option<&Value>) -> Option<u8> {
    value
        .and_then(Value::as_u64)
        .and_then(|v| u8::try_from(v).ok())
}

fn field_rgb(value: Option<&Value>) -> Option<[u8; 3]> {
    let items = value?.as_array()?;
    if items.len() != 3 {
        return None;
    }
    let mut rgb = [0u8; 3];
    for (slot, item) in rgb.iter_mut().zip(items) {
        *slot = field_u8(Some(item))?;
    }
    Some(rgb)
}
