use lightctl_core::{Directive, PowerTarget};
use serde::Deserialize;
use serde_json::{Map, Value};

/// Body of a plugin command: the command name plus its parameters inline.
#[derive(Debug, Deserialize)]
pub struct CommandRequest {
    pub command: String,
    #[serde(flatten)]
    pub params: Map<String, Value>,
}

impl CommandRequest {
    // Parameters each command must carry as keys (values may be null)
    pub fn required_params(&self) -> Option<&'static [&'static str]> {
        match self.command.as_str() {
            "toggle" => Some(&["target", "pwm"]),
            "set_state" => Some(&["state", "pwm"]),
            "query_status" => Some(&[]),
            _ => None,
        }
    }

    pub fn missing_param(&self, required: &[&'static str]) -> Option<&'static str> {
        required.iter().copied().find(|key| !self.params.contains_key(*key))
    }

    pub fn param(&self, key: &str) -> Option<&Value> {
        self.params.get(key)
    }
}

/// Toggle target exactly as sent; anything but "on", "off" or "toggle"
/// (including null and other casings) is rejected.
pub fn parse_target(value: Option<&Value>) -> Option<Directive> {
    match value?.as_str()? {
        "on" => Some(Directive::On),
        "off" => Some(Directive::Off),
        "toggle" => Some(Directive::Toggle),
        _ => None,
    }
}

/// `set_state` accepts "on"/"off" in any case.
pub fn parse_state(value: Option<&Value>) -> Option<PowerTarget> {
    match value?.as_str()?.to_lowercase().as_str() {
        "on" => Some(PowerTarget::On),
        "off" => Some(PowerTarget::Off),
        _ => None,
    }
}

/// PWM as sent by a client, or none when absent/invalid.
///
/// Integers and integer strings clamp into 0..=255, saturating on overflow.
/// Fractional numbers are truncated toward zero; booleans count as 0/1.
pub fn parse_pwm(value: Option<&Value>) -> Option<u8> {
    let n = match value? {
        Value::Number(n) => match n.as_i64() {
            Some(i) => i,
            // Float-to-int casts truncate and saturate
            None => n.as_f64().filter(|f| f.is_finite()).map(|f| f.trunc() as i64)?,
        },
        Value::String(s) => parse_int_saturating(s.trim())?,
        Value::Bool(b) => i64::from(*b),
        _ => return None,
    };
    Some(n.clamp(0, 255) as u8)
}

// Whole string must be an optional sign followed by digits
fn parse_int_saturating(s: &str) -> Option<i64> {
    let (negative, digits) = match s.as_bytes().first()? {
        b'-' => (true, &s[1..]),
        b'+' => (false, &s[1..]),
        _ => (false, s),
    };
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let value = digits
        .bytes()
        .fold(0i64, |acc, b| acc.saturating_mul(10).saturating_add(i64::from(b - b'0')));
    Some(if negative { -value } else { value })
}
