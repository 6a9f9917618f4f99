use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

use crate::state::PowerState;

/// Reply body of a plugin command.
///
/// The API is loosely typed, so every field is optional. Status fields that
/// are `null` or not booleans are treated as absent.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandResponse {
    #[serde(default, deserialize_with = "lenient_bool", skip_serializing_if = "Option::is_none")]
    pub ok: Option<bool>,
    /// Confirmed device state.
    #[serde(default, deserialize_with = "lenient_bool", skip_serializing_if = "Option::is_none")]
    pub is_on: Option<bool>,
    /// What the server believes happened after a fire-and-forget command.
    #[serde(default, deserialize_with = "lenient_bool", skip_serializing_if = "Option::is_none")]
    pub assumed_is_on: Option<bool>,
    #[serde(default, deserialize_with = "lenient_string", skip_serializing_if = "Option::is_none")]
    pub used: Option<String>,
    #[serde(default, deserialize_with = "lenient_string", skip_serializing_if = "Option::is_none")]
    pub sent: Option<String>,
    #[serde(default, deserialize_with = "lenient_string", skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Power status carried by a response, tagged with how much to trust it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportedState {
    Confirmed(PowerState),
    Assumed(PowerState),
}

impl ReportedState {
    pub fn power(self) -> PowerState {
        match self {
            ReportedState::Confirmed(s) | ReportedState::Assumed(s) => s,
        }
    }
}

impl CommandResponse {
    pub fn from_value(value: Value) -> Self {
        if !value.is_object() {
            debug!(?value, "Non-object command response; treating as empty");
            return Self::default();
        }
        // Every field is lenient, so an object always deserializes
        serde_json::from_value(value).unwrap_or_default()
    }

    /// `is_on` wins over `assumed_is_on`; neither means no update.
    pub fn reported_state(&self) -> Option<ReportedState> {
        if let Some(on) = self.is_on {
            return Some(ReportedState::Confirmed(on.into()));
        }
        self.assumed_is_on.map(|on| ReportedState::Assumed(on.into()))
    }
}

fn lenient_bool<'de, D>(deserializer: D) -> Result<Option<bool>, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::Bool(b) => Ok(Some(b)),
        Value::Null => Ok(None),
        other => {
            warn!(value = %other, "Ignoring non-boolean status field in response");
            Ok(None)
        }
    }
}

fn lenient_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::String(s) => Ok(Some(s)),
        Value::Null => Ok(None),
        other => Ok(Some(other.to_string())),
    }
}
