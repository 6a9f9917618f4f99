use thiserror::Error;

#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("command rejected with status {status}: {message}")]
    Rejected { status: u16, message: String },
    #[error("invalid response body: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("invalid base url: {0}")]
    InvalidUrl(#[from] url::ParseError),
}
