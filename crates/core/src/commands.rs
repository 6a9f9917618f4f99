use serde::{Deserialize, Serialize};

use crate::state::{Directive, PowerTarget};

// Commands accepted by the plugin API. Serialized with the command name inline,
// e.g. {"command":"toggle","target":"off","pwm":null}.
// `pwm: None` is sent as an explicit null, meaning "leave the intensity alone".
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "command", rename_all = "snake_case")]
pub enum Command {
    Toggle { target: Directive, pwm: Option<u8> },
    SetState { state: PowerTarget, pwm: Option<u8> },
    QueryStatus,
}

impl Command {
    pub fn name(&self) -> &'static str {
        match self {
            Command::Toggle { .. } => "toggle",
            Command::SetState { .. } => "set_state",
            Command::QueryStatus => "query_status",
        }
    }

    pub fn pwm(&self) -> Option<u8> {
        match self {
            Command::Toggle { pwm, .. } | Command::SetState { pwm, .. } => *pwm,
            Command::QueryStatus => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn toggle_serializes_with_inline_command_name() {
        let cmd = Command::Toggle { target: Directive::Toggle, pwm: Some(255) };
        assert_eq!(
            serde_json::to_value(&cmd).unwrap(),
            json!({"command": "toggle", "target": "toggle", "pwm": 255})
        );
    }

    #[test]
    fn missing_pwm_is_explicit_null() {
        let cmd = Command::Toggle { target: Directive::Off, pwm: None };
        assert_eq!(
            serde_json::to_value(&cmd).unwrap(),
            json!({"command": "toggle", "target": "off", "pwm": null})
        );
    }

    #[test]
    fn query_status_has_empty_payload() {
        assert_eq!(
            serde_json::to_value(Command::QueryStatus).unwrap(),
            json!({"command": "query_status"})
        );
    }

    #[test]
    fn set_state_names() {
        let cmd = Command::SetState { state: PowerTarget::On, pwm: Some(10) };
        assert_eq!(cmd.name(), "set_state");
        assert_eq!(cmd.pwm(), Some(10));
        assert_eq!(
            serde_json::to_value(&cmd).unwrap(),
            json!({"command": "set_state", "state": "on", "pwm": 10})
        );
    }
}
