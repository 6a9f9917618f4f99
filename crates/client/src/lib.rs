pub mod config;
pub mod control;
pub mod error;
pub mod gateway;

pub use config::ClientConfig;
pub use control::{ControlEvent, LightControl};
pub use error::GatewayError;
pub use gateway::{CommandGateway, HttpGateway};
