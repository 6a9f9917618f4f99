use std::fmt;

use serde::{Deserialize, Serialize};

/// Last known power status of the light.
///
/// `Unknown` until the device has reported something; nothing in the client
/// moves it away from `Unknown` except a server response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PowerState {
    On,
    Off,
    #[default]
    Unknown,
}

impl PowerState {
    pub fn as_bool(self) -> Option<bool> {
        match self {
            PowerState::On => Some(true),
            PowerState::Off => Some(false),
            PowerState::Unknown => None,
        }
    }
}

impl From<bool> for PowerState {
    fn from(on: bool) -> Self {
        if on { PowerState::On } else { PowerState::Off }
    }
}

impl fmt::Display for PowerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            PowerState::On => "on",
            PowerState::Off => "off",
            PowerState::Unknown => "unknown",
        };
        f.write_str(s)
    }
}

/// What a `toggle` command asks the device to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Directive {
    On,
    Off,
    /// Let the device decide; sent when the local state can't be trusted.
    Toggle,
}

impl Directive {
    pub fn for_state(state: PowerState) -> Self {
        match state {
            PowerState::On => Directive::Off,
            PowerState::Off => Directive::On,
            PowerState::Unknown => Directive::Toggle,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Directive::On => "on",
            Directive::Off => "off",
            Directive::Toggle => "toggle",
        }
    }
}

impl fmt::Display for Directive {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Explicit target of a `set_state` command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PowerTarget {
    On,
    Off,
}

impl PowerTarget {
    pub fn as_str(self) -> &'static str {
        match self {
            PowerTarget::On => "on",
            PowerTarget::Off => "off",
        }
    }
}

impl From<PowerTarget> for Directive {
    fn from(target: PowerTarget) -> Self {
        match target {
            PowerTarget::On => Directive::On,
            PowerTarget::Off => Directive::Off,
        }
    }
}

impl fmt::Display for PowerTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
