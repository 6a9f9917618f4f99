pub mod api;
pub mod commands;
pub mod intensity;
pub mod response;
pub mod state;

pub use api::*;
pub use commands::Command;
pub use intensity::{clamp, sanitize, DEFAULT_INTENSITY};
pub use response::{CommandResponse, ReportedState};
pub use state::{Directive, PowerState, PowerTarget};
