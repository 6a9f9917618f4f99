use std::sync::Arc;

use lightctl_core::{CommandResponse, Directive, PowerState, PowerTarget};
use tokio::sync::RwLock;
use tracing::{debug, error, info};

use crate::config::GcodeSettings;
use crate::gcode::GcodeSink;

/// Device side of the light plugin: turns commands into G-code and remembers
/// what it last did. The remembered state is what clients get back as
/// `is_on`; nothing reads the light back from the printer.
#[derive(Clone)]
pub struct LightService {
    settings: Arc<GcodeSettings>,
    sink: Arc<dyn GcodeSink>,
    power: Arc<RwLock<PowerState>>,
}

impl LightService {
    pub fn new(settings: GcodeSettings, sink: Arc<dyn GcodeSink>) -> Self {
        Self {
            settings: Arc::new(settings),
            sink,
            power: Arc::new(RwLock::new(PowerState::Unknown)),
        }
    }

    pub fn settings(&self) -> &GcodeSettings {
        &self.settings
    }

    pub async fn power_state(&self) -> PowerState {
        *self.power.read().await
    }

    /// `None` is a target the client sent that isn't "on", "off" or "toggle".
    pub async fn handle_toggle(&self, target: Option<Directive>, pwm: Option<u8>) -> CommandResponse {
        let Some(directive) = target else {
            return CommandResponse {
                ok: Some(false),
                error: Some("bad target".to_string()),
                ..Default::default()
            };
        };

        match directive {
            Directive::On => self.handle_set(PowerTarget::On, pwm).await,
            Directive::Off => self.handle_set(PowerTarget::Off, pwm).await,
            Directive::Toggle => {
                let toggle = self.settings.gcode_toggle.trim();
                if toggle.is_empty() {
                    let next = if self.power_state().await == PowerState::On { PowerTarget::Off } else { PowerTarget::On };
                    return self.handle_set(next, pwm).await;
                }

                self.send_gcode_lines(&[toggle]);
                let mut power = self.power.write().await;
                // An unknown state stays unknown; we can't tell what a blind toggle did
                *power = match *power {
                    PowerState::On => PowerState::Off,
                    PowerState::Off => PowerState::On,
                    PowerState::Unknown => PowerState::Unknown,
                };
                CommandResponse {
                    ok: Some(true),
                    assumed_is_on: power.as_bool(),
                    used: Some("toggle".to_string()),
                    ..Default::default()
                }
            }
        }
    }

    pub async fn handle_set(&self, state: PowerTarget, pwm: Option<u8>) -> CommandResponse {
        let cmd = match state {
            PowerTarget::On => {
                let base = self.settings.gcode_on.trim();
                match pwm {
                    Some(p) => inject_pwm(base, p),
                    None => base.to_string(),
                }
            }
            PowerTarget::Off => self.settings.gcode_off.trim().to_string(),
        };

        self.send_gcode_lines(&[cmd.as_str()]);
        let on = state == PowerTarget::On;
        *self.power.write().await = PowerState::from(on);
        CommandResponse {
            ok: Some(true),
            is_on: Some(on),
            used: Some(state.as_str().to_string()),
            sent: Some(cmd),
            ..Default::default()
        }
    }

    /// Returns whether a status query was actually sent, plus the remembered state.
    pub async fn query_status(&self) -> (bool, Option<bool>) {
        let query = self.settings.status_query.trim();
        if query.is_empty() {
            return (false, self.power_state().await.as_bool());
        }
        self.send_gcode_lines(&[query]);
        info!(
            query,
            parse_token = self.settings.status_parse_token.trim(),
            "Sent status query; replies are not parsed without a serial hook"
        );
        (true, self.power_state().await.as_bool())
    }

    fn send_gcode_lines(&self, lines: &[&str]) {
        for line in lines.iter().map(|l| l.trim()).filter(|l| !l.is_empty()) {
            debug!(line, "Sending G-code line");
            if let Err(err) = self.sink.send(line) {
                error!(line, %err, "G-code send failed");
            }
        }
    }
}

/// Put a PWM value into the "on" G-code.
///
/// A `{p}` token (any case) is replaced. Without a token, a bare `M355 S1`
/// gets ` P<pwm>` appended; anything else is sent unchanged.
pub fn inject_pwm(cmd: &str, pwm: u8) -> String {
    let value = pwm.to_string();
    if let Some(replaced) = replace_token(cmd, &value) {
        return replaced;
    }
    let up = cmd.to_ascii_uppercase();
    if up.contains("M355") && up.contains("S1") && !up.contains(" P") {
        return format!("{} P{}", cmd, value);
    }
    cmd.to_string()
}

fn replace_token(cmd: &str, value: &str) -> Option<String> {
    let bytes = cmd.as_bytes();
    let mut out = String::with_capacity(cmd.len() + value.len());
    let mut found = false;
    let (mut last, mut i) = (0, 0);
    while i + 3 <= bytes.len() {
        if bytes[i] == b'{' && bytes[i + 1].eq_ignore_ascii_case(&b'p') && bytes[i + 2] == b'}' {
            out.push_str(&cmd[last..i]);
            out.push_str(value);
            i += 3;
            last = i;
            found = true;
        } else {
            i += 1;
        }
    }
    if !found {
        return None;
    }
    out.push_str(&cmd[last..]);
    Some(out)
}

#[cfg(test)]
#[path = "tests/services_tests.rs"]
mod tests;
